use pretty_assertions::assert_eq;

use crate::chars::{BEGIN_MARK, END_MARK, EPSILON, MAX_CHAR_UNALIGNED};
use crate::errors::Error;
use crate::fsm::Fsm;
use crate::lexer::{Lexer, OptionFlag};
use crate::scanners::{
    CapturingScanner, NonrelocScanner, NonrelocScannerNoMask, RelocScanner,
    RelocScannerNoMask, Scanner, SimpleScanner, SlowScanner,
};

fn literal(s: &str) -> Fsm {
    let mut fsm = Fsm::new();
    fsm.append(s);
    fsm
}

fn scanner(fsm: &Fsm) -> RelocScanner {
    fsm.compile().unwrap()
}

macro_rules! assert_matches {
    (
        $fsm:expr,
        accepts: [$($yes:expr),* $(,)?],
        rejects: [$($no:expr),* $(,)?]
    ) => {{
        let scanner = scanner(&$fsm);
        $(
            assert!(scanner.matches($yes), "should match {:?}", $yes);
        )*
        $(
            assert!(!scanner.matches($no), "should not match {:?}", $no);
        )*
    }};
}

#[test]
fn new_and_false() {
    let fsm = Fsm::new();
    assert_eq!(fsm.size(), 1);
    assert_eq!(fsm.finals(), vec![0]);
    assert_matches!(fsm, accepts: [""], rejects: ["a"]);

    let fsm = Fsm::make_false();
    assert_eq!(fsm.size(), 1);
    assert!(fsm.finals().is_empty());
    assert_matches!(fsm, accepts: [], rejects: ["", "a"]);
}

#[test]
fn copies_are_independent() {
    let mut fsm = literal("ab");
    let copy = fsm.clone();
    fsm.append("c");

    assert_matches!(copy, accepts: ["ab"], rejects: ["abc"]);
    assert_matches!(fsm, accepts: ["abc"], rejects: ["ab"]);
}

#[test]
fn append_special() {
    let mut fsm = Fsm::new();
    fsm.append_special(BEGIN_MARK).unwrap();
    fsm.append("a");
    fsm.append_special(END_MARK).unwrap();

    let scanner = scanner(&fsm);
    let mut state = scanner.init_state();

    state.begin();
    assert!(!state.is_final());
    assert!(!state.is_dead());

    state.run("a");
    assert!(!state.is_final());
    assert!(!state.is_dead());

    state.step(END_MARK).unwrap();
    assert!(state.is_final());
}

#[test]
fn append_special_errors() {
    let mut fsm = Fsm::new();

    for symbol in [EPSILON, MAX_CHAR_UNALIGNED, MAX_CHAR_UNALIGNED + 2, 300] {
        assert!(matches!(
            fsm.append_special(symbol),
            Err(Error::InvalidInput(_))
        ));
    }

    assert!(matches!(
        fsm.append_special(b'a' as u16),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(fsm.append_special(-1), Err(Error::Overflow(_))));
    assert!(matches!(fsm.append_special(-42), Err(Error::Overflow(_))));
    assert!(matches!(fsm.append_special(1_i64 << 30), Err(Error::Overflow(_))));
    assert!(matches!(fsm.append_special(u128::MAX), Err(Error::Overflow(_))));

    // Failed operations leave the automaton untouched.
    assert_eq!(fsm, Fsm::new());
}

#[test]
fn append_strings() {
    let mut fsm = literal("-");
    fsm.append_strings(["abc", "de"]).unwrap();
    assert_matches!(
        fsm,
        accepts: ["-abc", "-de"],
        rejects: ["-", "abc", "", "-abcde"]
    );

    let generated = (1..=3).map(|i| "x".repeat(i));
    let mut fsm = Fsm::new();
    fsm.append_strings(generated).unwrap();
    assert_matches!(fsm, accepts: ["x", "xx", "xxx"], rejects: ["", "xxxx"]);
}

#[test]
fn append_strings_errors() {
    let mut fsm = literal("a");
    let before = fsm.clone();

    assert!(matches!(fsm.append_strings([""]), Err(Error::InvalidInput(_))));
    assert!(matches!(
        fsm.append_strings(["nonempty", ""]),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        fsm.append_strings(Vec::<&str>::new()),
        Err(Error::InvalidInput(_))
    ));

    assert_eq!(fsm, before);
}

#[test]
fn connect_errors() {
    let mut fsm = Fsm::new();
    let state = fsm.add_state();

    assert!(matches!(
        fsm.connect(0, 5, b'a' as u16),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        fsm.connect(0, state, MAX_CHAR_UNALIGNED),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(fsm.set_initial(7), Err(Error::InvalidInput(_))));
    assert!(matches!(fsm.set_final(7, true), Err(Error::InvalidInput(_))));

    fsm.connect(0, state, b'a' as u16).unwrap();
    fsm.set_final(0, false).unwrap().set_final(state, true).unwrap();
    assert_matches!(fsm, accepts: ["a"], rejects: ["", "aa"]);
}

#[test]
fn dot_and_anything() {
    let mut fsm = literal("a");
    fsm.append_dot();
    assert_matches!(fsm, accepts: ["ab", "a\0", "a\n"], rejects: ["a", "abc"]);

    let mut fsm = literal("a");
    fsm.append_anything();
    assert_matches!(fsm, accepts: ["a", "abc"], rejects: ["", "ba"]);

    let mut fsm = literal("a");
    fsm.prepend_anything();
    assert_matches!(fsm, accepts: ["a", "cba"], rejects: ["", "ab"]);

    assert_matches!(
        literal("b").surrounded(),
        accepts: ["b", "abc"],
        rejects: ["", "ac"]
    );
}

#[test]
fn iteration() {
    let mut fsm = literal("ab");
    fsm.iterate();
    assert_matches!(fsm, accepts: ["", "ab", "ababab"], rejects: ["a", "aba"]);

    let plus = literal("ab").iterated();
    assert_matches!(plus, accepts: ["ab", "ababab"], rejects: ["", "aba"]);

    let mut fsm = literal("d");
    fsm.repeat(3);
    assert_matches!(fsm, accepts: ["ddd"], rejects: ["", "dd", "dddd"]);

    assert_matches!(literal("d").repeated(0), accepts: [""], rejects: ["d"]);
}

#[test]
fn union_concatenation() {
    let fsm = literal("a")
        .concatenated(&literal("b").starred())
        .united(&literal("c"));
    assert_matches!(fsm, accepts: ["a", "abbb", "c"], rejects: ["", "b", "ac"]);

    // Union with the empty language is the identity.
    let fsm = literal("abc").united(&Fsm::make_false());
    assert_matches!(fsm, accepts: ["abc"], rejects: ["", "ab"]);
}

#[test]
fn complement_and_intersection() {
    let ab = literal("ab");

    let not_ab = ab.complemented().unwrap();
    assert_matches!(not_ab, accepts: ["", "a", "abc", "ba"], rejects: ["ab"]);

    // Double complement gives back the same language.
    let same = not_ab.complemented().unwrap();
    assert_matches!(same, accepts: ["ab"], rejects: ["", "a", "abc"]);

    let anything = Fsm::new().append_anything().clone();
    let a_any = literal("a").concatenated(&anything);
    let any_b = anything.concatenated(&literal("b"));

    let both = a_any.intersected(&any_b).unwrap();
    assert_matches!(
        both,
        accepts: ["ab", "axxb"],
        rejects: ["a", "b", "ba", "axx"]
    );

    let a_not_b = a_any.and_notted(&any_b).unwrap();
    assert_matches!(a_not_b, accepts: ["a", "axx"], rejects: ["ab", "b"]);

    // Intersecting with the complement is empty.
    let nothing = ab.intersected(&not_ab).unwrap();
    assert!(scanner(&nothing).is_empty());
}

#[test]
fn complement_in_place_is_transactional() {
    let mut fsm = literal("abcdefgh").surrounded();
    let before = fsm.clone();
    let config = crate::config::CompileConfig { max_states: 2, minimize: true };

    assert!(matches!(fsm.complement_with(&config), Err(Error::Overflow(_))));
    assert_eq!(fsm, before);
}

/// The same automaton compiled into every encoding.
struct Encodings {
    reloc: RelocScanner,
    reloc_nomask: RelocScannerNoMask,
    nonreloc: NonrelocScanner,
    nonreloc_nomask: NonrelocScannerNoMask,
    simple: SimpleScanner,
    slow: SlowScanner,
    capturing: CapturingScanner,
}

impl Encodings {
    fn new(fsm: &Fsm) -> Self {
        Self {
            reloc: fsm.compile().unwrap(),
            reloc_nomask: fsm.compile().unwrap(),
            nonreloc: fsm.compile().unwrap(),
            nonreloc_nomask: fsm.compile().unwrap(),
            simple: fsm.compile().unwrap(),
            slow: fsm.compile().unwrap(),
            capturing: fsm.compile().unwrap(),
        }
    }

    /// Returns whether `text` matches, after checking that every encoding
    /// gives the same answer.
    fn matches(&self, text: &str, name: &str) -> bool {
        let expected = self.reloc.matches(text);
        let results = [
            ("reloc_nomask", self.reloc_nomask.matches(text)),
            ("nonreloc", self.nonreloc.matches(text)),
            ("nonreloc_nomask", self.nonreloc_nomask.matches(text)),
            ("simple", self.simple.matches(text)),
            ("slow", self.slow.matches(text)),
            ("capturing", self.capturing.matches(text)),
        ];
        for (encoding, result) in results {
            assert_eq!(
                result, expected,
                "{} disagrees with reloc on {} for {:?}",
                encoding, name, text
            );
        }
        expected
    }
}

const ANCHORED_PATTERNS: &[&str] = &[
    "^$",
    "xy",
    "^c",
    "~(^c)",
    "(~(^c)){1,2}",
    "c$",
    "^a.*",
    "~(a.*)",
    "(a|^b)c",
    "x&~(^x)",
    "~($)",
    "^(ab)*$",
    "(~(.*b)){2}",
];

const CORPUS: &[&str] = &[
    "", "a", "b", "c", "x", "xy", "ab", "ac", "bc", "cc", "abab", "xyx",
    "cab", "ba",
];

#[test]
fn union_with_anchored_complement() {
    let not_empty = Lexer::new("^$").parse().unwrap().complemented().unwrap();
    let xy = literal("xy");
    let union = not_empty.united(&xy);

    assert_matches!(not_empty, accepts: ["a", "xy"], rejects: [""]);
    assert_matches!(union, accepts: ["a", "xy"], rejects: [""]);

    let slow: SlowScanner = union.compile().unwrap();
    assert!(!slow.matches(""));
}

#[test]
fn algebraic_laws_with_anchors() {
    let automata: Vec<(&str, Fsm)> = ANCHORED_PATTERNS
        .iter()
        .map(|&p| {
            (p, Lexer::with_options(p, OptionFlag::AndNot).parse().unwrap())
        })
        .collect();

    fn matches(name: &str, fsm: &Fsm) -> Vec<bool> {
        let encodings = Encodings::new(fsm);
        CORPUS.iter().map(|text| encodings.matches(text, name)).collect()
    }

    let languages: Vec<Vec<bool>> =
        automata.iter().map(|(name, fsm)| matches(name, fsm)).collect();

    for ((name, fsm), language) in automata.iter().zip(&languages) {
        let complement = matches(name, &fsm.complemented().unwrap());
        for (i, text) in CORPUS.iter().enumerate() {
            assert_eq!(
                complement[i], !language[i],
                "complement of {} on {:?}",
                name, text
            );
        }
    }

    for (i, (a_name, a)) in automata.iter().enumerate() {
        for (j, (b_name, b)) in automata.iter().enumerate() {
            let name = format!("{} and {}", a_name, b_name);
            let union = matches(&name, &a.united(b));
            let intersection = matches(&name, &a.intersected(b).unwrap());
            let difference = matches(&name, &a.and_notted(b).unwrap());

            for (k, text) in CORPUS.iter().enumerate() {
                let (x, y) = (languages[i][k], languages[j][k]);
                assert_eq!(
                    union[k],
                    x || y,
                    "{} | {} on {:?}",
                    a_name,
                    b_name,
                    text
                );
                assert_eq!(
                    intersection[k],
                    x && y,
                    "{} & {} on {:?}",
                    a_name,
                    b_name,
                    text
                );
                assert_eq!(
                    difference[k],
                    x && !y,
                    "{} & ~{} on {:?}",
                    a_name,
                    b_name,
                    text
                );
            }
        }
    }
}

#[test]
fn reverse() {
    let mut fsm = literal("abc");
    fsm.reverse();
    assert_matches!(fsm, accepts: ["cba"], rejects: ["abc", ""]);

    // Anchors swap their roles.
    let mut fsm = Fsm::new();
    fsm.append_special(BEGIN_MARK).unwrap().append("ab");
    let reversed = fsm.reversed();
    let scanner = scanner(&reversed);

    let mut state = scanner.init_state();
    state.begin().run("ba").end();
    assert!(state.is_final());

    let mut state = scanner.init_state();
    state.begin().run("ba");
    assert!(!state.is_final());
}

#[test]
fn determine() {
    let mut fsm = literal("ab").united(&literal("ac"));
    fsm.append_anything();
    let before = fsm.clone();
    fsm.determine().unwrap();

    for text in ["", "a", "ab", "ac", "abx", "ad"] {
        assert_eq!(scanner(&fsm).matches(text), scanner(&before).matches(text));
    }
}

#[test]
fn capture_preserves_language() {
    let mut fsm = literal("abc");
    fsm.capture();
    assert_matches!(fsm, accepts: ["abc"], rejects: ["ab", ""]);
}

#[test]
fn prefixes_and_suffixes() {
    let arrow = literal("-->");
    let any_occurrence =
        Fsm::make_false().complemented().unwrap().concatenated(&arrow);
    let first_occurrence =
        arrow.surrounded().complemented().unwrap().concatenated(&arrow);
    let reverse_occurrence = arrow.reversed();

    let text = "1234567890 --> middle --> end";

    fn check<S: Scanner>(any: &S, first: &S, reverse: &S, text: &str) {
        assert_eq!(first.longest_prefix(text), Some(14));
        assert_eq!(reverse.longest_suffix(&text[..14]), Some(11));

        assert_eq!(any.longest_prefix(text), Some(25));
        assert_eq!(reverse.longest_suffix(&text[..25]), Some(22));

        assert_eq!(first.shortest_prefix(text), Some(14));
        assert_eq!(reverse.shortest_suffix(&text[..14]), Some(11));

        assert_eq!(any.shortest_prefix(text), Some(14));
        assert_eq!(reverse.shortest_suffix(&text[..14]), Some(11));
    }

    check::<RelocScanner>(
        &any_occurrence.compile().unwrap(),
        &first_occurrence.compile().unwrap(),
        &reverse_occurrence.compile().unwrap(),
        text,
    );

    check::<SimpleScanner>(
        &any_occurrence.compile().unwrap(),
        &first_occurrence.compile().unwrap(),
        &reverse_occurrence.compile().unwrap(),
        text,
    );

    check::<SlowScanner>(
        &any_occurrence.compile().unwrap(),
        &first_occurrence.compile().unwrap(),
        &reverse_occurrence.compile().unwrap(),
        text,
    );
}

#[test]
fn no_prefixes_or_suffixes() {
    let scanner = scanner(&literal("text"));
    assert_eq!(scanner.longest_prefix("nonexistent"), None);
    assert_eq!(scanner.shortest_prefix("nonexistent"), None);
    assert_eq!(scanner.longest_suffix("nonexistent"), None);
    assert_eq!(scanner.shortest_suffix("nonexistent"), None);
}
