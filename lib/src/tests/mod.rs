/*! End-to-end tests. */
use std::thread;

use pretty_assertions::assert_eq;

use crate::config::{load_config_from_str, CompileConfig, Config};
use crate::{
    CapturingScanner, Error, Fsm, Lexer, NonrelocScanner,
    NonrelocScannerNoMask, OptionFlag, Options, Persist, Regexp, RelocScanner,
    RelocScannerNoMask, Scanner, SimpleScanner, SlowScanner,
};

fn options(flags: &[OptionFlag]) -> Options {
    flags.iter().copied().collect()
}

macro_rules! regexp_true {
    ($pattern:literal, $flags:expr, $text:expr) => {{
        let re = Regexp::new($pattern, options($flags)).unwrap();
        assert!(
            re.matches($text),
            "`{}` should match {:?}",
            $pattern,
            $text
        );
    }};
}

macro_rules! regexp_false {
    ($pattern:literal, $flags:expr, $text:expr) => {{
        let re = Regexp::new($pattern, options($flags)).unwrap();
        assert!(
            !re.matches($text),
            "`{}` should not match {:?}",
            $pattern,
            $text
        );
    }};
}

fn check_equivalence<S: Scanner>(expected: &S, actual: &S, examples: &[&str]) {
    for text in examples {
        assert_eq!(
            expected.matches(text),
            actual.matches(text),
            "disagreement on {:?}",
            text
        );
    }
}

/// Builds the same automaton through in-place operations and through a
/// regular expression, and checks that they match the same strings.
fn fluent_operations<S: Scanner + crate::FromFsm>() {
    let mut a = Fsm::new();
    a.append("a").append_dot();

    let mut b = Fsm::new();
    b.append("b");

    let mut d = Fsm::new();
    d.append("d").repeat(3);

    let mut c = Lexer::new("c").parse().unwrap();
    c.prepend_anything().complement().unwrap();

    let mut fsm = a;
    fsm.iterate();
    fsm.append_fsm(b.append_anything());
    fsm.union_with(&d);
    fsm.intersect_with(&c).unwrap();

    let expected: S = Lexer::with_options(
        "((a.)*(b.*)|(d{3}))&~(.*c)",
        OptionFlag::AndNot,
    )
    .parse()
    .unwrap()
    .compile()
    .unwrap();

    check_equivalence(
        &expected,
        &fsm.compile().unwrap(),
        &[
            "ddd", "dddc", "a-b--c", "a-a-b--", "bdddc", "bddd", "", "b", "bc",
            "c",
        ],
    );
}

fn nonmodifying_operations<S: Scanner + crate::FromFsm>() {
    let [a, b, c, d, e] =
        ["a", "b", "c", "d", "e"].map(|p| Lexer::new(p).parse().unwrap());

    let expression = a
        .concatenated(&b.starred())
        .united(&c.surrounded())
        .united(&d.repeated(2).repeated(2))
        .and_notted(&e)
        .unwrap();

    let expected: S =
        Lexer::with_options("((ab*)|(.*c.*)|(d{4}))&~e", OptionFlag::AndNot)
            .parse()
            .unwrap()
            .compile()
            .unwrap();

    check_equivalence(
        &expected,
        &expression.compile().unwrap(),
        &["a", "abbbb", "c", "--c-", "dddd", "--", "e", "-ee-", ""],
    );
}

macro_rules! operations_tests {
    ($($name:ident => $scanner:ty),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                fluent_operations::<$scanner>();
                nonmodifying_operations::<$scanner>();
            }
        )*
    };
}

operations_tests! {
    operations_reloc => RelocScanner,
    operations_reloc_nomask => RelocScannerNoMask,
    operations_nonreloc => NonrelocScanner,
    operations_nonreloc_nomask => NonrelocScannerNoMask,
    operations_simple => SimpleScanner,
    operations_slow => SlowScanner,
    operations_capturing => CapturingScanner,
}

#[test]
fn lexer_and_not() {
    let scanner: RelocScanner =
        Lexer::with_options("(2.*)&([0-9]*_1+)", OptionFlag::AndNot)
            .parse()
            .unwrap()
            .compile()
            .unwrap();

    for text in ["2123_1111", "2_1"] {
        assert!(scanner.matches(text), "should match {:?}", text);
    }
    for text in ["123_1111", "2123_1111$", "^_1"] {
        assert!(!scanner.matches(text), "should not match {:?}", text);
    }
}

#[test]
fn lexer_unicode() {
    let scanner: SimpleScanner =
        Lexer::with_options("юникод", OptionFlag::Utf8)
            .parse()
            .unwrap()
            .compile()
            .unwrap();

    assert!(scanner.matches(
        b"\xd1\x8e\xd0\xbd\xd0\xb8\xd0\xba\xd0\xbe\xd0\xb4"
    ));
    assert!(!scanner.matches(b"\xd1"));
    assert!(!scanner.matches(""));
}

#[test]
fn easy_regexp() {
    let i = &[OptionFlag::CaseInsensitive];
    regexp_true!("(foo|bar)+", i, "prefix fOoBaR suffix");
    regexp_true!("(foo|bar)+", i, "barfoo");
    regexp_false!("(foo|bar)+", i, "bla bla bla");

    let iu = &[OptionFlag::CaseInsensitive, OptionFlag::Utf8];
    regexp_true!("^.$", iu, "A");
    regexp_true!("^.$", iu, "Я");
    regexp_false!("^.$", iu, b"\x81");

    let ia = &[OptionFlag::CaseInsensitive, OptionFlag::AndNot];
    regexp_true!("^(a.c&.b.)$", ia, "abc");
    regexp_true!("^(a.c&.b.)$", ia, "ABC");
    regexp_false!("^(a.c&.b.)$", ia, "adc");
}

#[test]
fn easy_regexp_errors() {
    assert!(Regexp::new("[ab", Options::none()).is_err());
    assert!(Regexp::new("юникод", Options::none()).is_err());
}

#[test]
fn similar_glyphs() {
    let almost_regexp = "rеgехр";
    let exactly_regexp = "regexp";

    for pattern in [almost_regexp, exactly_regexp] {
        let scanner: RelocScanner = Lexer::with_options(
            pattern,
            options(&[OptionFlag::Utf8, OptionFlag::GlueSimilarGlyphs]),
        )
        .parse()
        .unwrap()
        .compile()
        .unwrap();

        assert!(scanner.matches(exactly_regexp));
        assert!(scanner.matches(almost_regexp));
    }
}

#[test]
fn config_drives_compilation() {
    let config = load_config_from_str(
        r#"
        [lexer]
        case_insensitive = true
        and_not = true

        [compile]
        max_states = 64
        "#,
    )
    .unwrap();

    let fsm = Lexer::with_config("(hello.*)&~(.*world)", &config.lexer)
        .parse()
        .unwrap();

    let scanner: RelocScanner = fsm.compile_with(&config.compile).unwrap();
    assert!(scanner.matches("HELLO there"));
    assert!(!scanner.matches("hello World"));

    // Too many states for the configured limit.
    let fsm = Lexer::new(".*a.{10}").parse().unwrap();
    assert!(fsm.compile_with::<RelocScanner>(&config.compile).is_err());
}

#[test]
fn regexp_with_config() {
    let config = load_config_from_str(
        r#"
        [lexer]
        case_insensitive = true
        and_not = true
        "#,
    )
    .unwrap();

    let re = Regexp::with_config("^((ab.*)&~(.*z))$", &config).unwrap();
    assert!(re.matches("ABcd"));
    assert!(!re.matches("abz"));
    assert!(!re.matches("xab"));

    // Without the option `&` and `~` are plain characters.
    let re = Regexp::with_config("a&~b", &Config::default()).unwrap();
    assert!(re.matches("xa&~by"));
    assert!(!re.matches("A&~B"));

    let config = Config {
        compile: CompileConfig { max_states: 16, ..Default::default() },
        ..Default::default()
    };
    assert!(matches!(
        Regexp::with_config("a.{10}", &config),
        Err(Error::Overflow(_))
    ));
}

#[test]
fn shared_between_threads() {
    let scanner: RelocScanner =
        Lexer::new("[0-9]+").parse().unwrap().surrounded().compile().unwrap();

    let results: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = ["abc 123", "no digits", "42", ""]
            .into_iter()
            .map(|text| {
                let scanner = &scanner;
                s.spawn(move || scanner.matches(text))
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, vec![true, false, true, false]);
}

#[test]
fn loaded_scanner_in_threads() {
    let scanner: SlowScanner =
        Lexer::new("a+b").parse().unwrap().surrounded().compile().unwrap();
    let saved = scanner.save().unwrap();

    thread::scope(|s| {
        for _ in 0..4 {
            let saved = &saved;
            s.spawn(move || {
                let loaded = SlowScanner::load(saved).unwrap();
                assert!(loaded.matches("xxaab"));
                assert!(!loaded.matches("xxbaa"));
            });
        }
    });
}
