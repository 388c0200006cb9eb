use pretty_assertions::assert_eq;

use crate::chars::{BEGIN_MARK, END_MARK, EPSILON, MAX_CHAR_UNALIGNED};
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::Fsm;
use crate::lexer::{Lexer, OptionFlag};
use crate::scanners::{
    CapturingScanner, CountingScanner, FromFsm, Glue, MultiScanner,
    NonrelocScanner, NonrelocScannerNoMask, Persist, RelocScanner,
    RelocScannerNoMask, Scanner, ScannerKind, SimpleScanner, SlowScanner,
};

fn parse<S: FromFsm>(pattern: &str) -> S {
    Lexer::new(pattern).parse().unwrap().compile().unwrap()
}

fn check_example<S: Scanner>(scanner: &S) {
    for text in ["se", "some", "somome"] {
        assert!(scanner.matches(text), "should match {:?}", text);
    }
    for text in ["", "s", "sme", "somom", "soe"] {
        assert!(!scanner.matches(text), "should not match {:?}", text);
    }
}

/// Tests that apply to every kind of scanner that can be built from an
/// automaton.
macro_rules! scanner_tests {
    ($($module:ident => $scanner:ty),* $(,)?) => {
        $(
            mod $module {
                use pretty_assertions::assert_eq;

                use super::*;

                #[test]
                fn example() {
                    check_example(&parse::<$scanner>("s(om)*e"));
                }

                #[test]
                fn default_is_empty() {
                    let scanner = <$scanner>::default();
                    assert!(scanner.is_empty());
                    assert!(!scanner.matches(""));
                    assert!(scanner.init_state().is_dead());
                }

                #[test]
                fn new_fsm_compiles() {
                    let scanner: $scanner = Fsm::new().compile().unwrap();
                    assert!(!scanner.is_empty());
                    assert!(scanner.matches(""));
                    assert!(!scanner.matches("a"));
                    assert_eq!(scanner.regexps_count(), 1);
                }

                #[test]
                fn special_symbols() {
                    let mut fsm = Fsm::new();
                    fsm.append_special(BEGIN_MARK).unwrap();
                    fsm.append("a");
                    fsm.append_special(END_MARK).unwrap();

                    let scanner: $scanner = fsm.compile().unwrap();
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
                fn step_rejects_non_input_symbols() {
                    let scanner = parse::<$scanner>("abc");
                    let mut state = scanner.init_state();
                    state.begin();

                    for symbol in [EPSILON, MAX_CHAR_UNALIGNED, 1000] {
                        assert!(matches!(
                            state.step(symbol),
                            Err(Error::TypeMismatch(_))
                        ));
                    }

                    // The state is still usable.
                    state.run("abc").end();
                    assert!(state.is_final());
                }

                #[test]
                fn state_reset() {
                    let scanner = parse::<$scanner>("s(om)*e");
                    let mut state = scanner.init_state();
                    state.begin().run("xyz");
                    assert!(state.is_dead());

                    state.reset().begin().run("sme").end();
                    assert!(!state.is_final());

                    state.reset().begin().run("somome").end();
                    assert!(state.is_final());
                }

                #[test]
                fn state_remembers_its_scanner() {
                    let scanner = <$scanner>::default();
                    let state = scanner.init_state();
                    assert!(std::ptr::eq(state.scanner(), &scanner));
                }

                #[test]
                fn save_and_load() {
                    let scanner = parse::<$scanner>("s(om)*e");
                    let saved = scanner.save().unwrap();
                    check_example(&<$scanner>::load(&saved).unwrap());

                    let mut buffer = Vec::new();
                    scanner.save_into(&mut buffer).unwrap();
                    assert_eq!(buffer, saved);
                    let loaded =
                        <$scanner>::load_from(buffer.as_slice()).unwrap();
                    check_example(&loaded);

                    let empty = <$scanner>::default().save().unwrap();
                    assert!(<$scanner>::load(&empty).unwrap().is_empty());
                }

                #[test]
                fn load_rejects_garbage() {
                    let saved = parse::<$scanner>("s(om)*e").save().unwrap();

                    assert!(matches!(
                        <$scanner>::load(b"invalid"),
                        Err(Error::DataFormat(DataFormatError::InvalidFormat))
                    ));
                    assert!(matches!(
                        <$scanner>::load(&saved[1..]),
                        Err(Error::DataFormat(DataFormatError::InvalidFormat))
                    ));
                    assert!(matches!(
                        <$scanner>::load(&saved[..saved.len() - 1]),
                        Err(Error::DataFormat(_))
                    ));

                    let mut trailing = saved.clone();
                    trailing.push(0);
                    assert!(<$scanner>::load(&trailing).is_err());

                    let mut version = saved.clone();
                    version[4] = 99;
                    assert!(matches!(
                        <$scanner>::load(&version),
                        Err(Error::DataFormat(
                            DataFormatError::UnsupportedVersion(99)
                        ))
                    ));
                }
            }
        )*
    };
}

scanner_tests! {
    reloc => RelocScanner,
    reloc_nomask => RelocScannerNoMask,
    nonreloc => NonrelocScanner,
    nonreloc_nomask => NonrelocScannerNoMask,
    simple => SimpleScanner,
    slow => SlowScanner,
    capturing => CapturingScanner,
}

/// Tests for the scanners that can be glued.
macro_rules! glue_tests {
    ($($module:ident => $scanner:ty),* $(,)?) => {
        $(
            mod $module {
                use pretty_assertions::assert_eq;

                use super::*;

                #[test]
                fn glue() {
                    let glued = parse::<$scanner>("ab")
                        .glued_with(&parse::<$scanner>("abcd$"))
                        .unwrap();

                    assert_eq!(glued.regexps_count(), 2);

                    let mut state = glued.init_state();
                    assert!(!state.is_final());
                    assert!(!state.is_dead());

                    state.run("ab");
                    assert!(state.is_final());
                    assert_eq!(state.accepted_regexps(), &[0]);

                    state.run("cd");
                    assert!(!state.is_final());
                    assert!(!state.is_dead());
                    assert!(state.accepted_regexps().is_empty());

                    state.end();
                    assert!(state.is_final());
                    assert_eq!(state.accepted_regexps(), &[1]);

                    state.run("-");
                    assert!(!state.is_final());
                    assert!(state.is_dead());

                    let doubled = glued.glued_with(&glued).unwrap();
                    assert_eq!(doubled.regexps_count(), 4);

                    let mut state = doubled.init_state();
                    state.run("ab");
                    assert_eq!(state.accepted_regexps(), &[0, 2]);
                    state.run("cd").end();
                    assert_eq!(state.accepted_regexps(), &[1, 3]);
                }

                #[test]
                fn glue_too_many() {
                    let patterns = [
                        "/product/",
                        "/catalog/",
                        "/?(\\?.*)?$",
                        "/.*/a",
                        "/.*/b",
                        "/.*/c",
                        "/.*/d",
                        "/.*/e",
                        "/.*/f",
                        "/.*/g",
                        "/.*/1234567891011",
                        "/.*/1234567891011/1234567891011",
                        "/.*/1234567891011/1234567891011/1234567891011",
                    ];

                    let mut scanner = <$scanner>::default();
                    let mut overflow = false;

                    for pattern in patterns {
                        let next =
                            parse::<$scanner>(&format!("^{}.*", pattern));
                        match scanner.glued_with(&next) {
                            Ok(glued) => {
                                assert!(!glued.is_empty());
                                scanner = glued;
                            }
                            Err(Error::Overflow(_)) => {
                                overflow = true;
                                break;
                            }
                            Err(err) => panic!("unexpected error: {}", err),
                        }
                    }

                    assert!(overflow);
                    assert!(scanner.regexps_count() < patterns.len());
                }

                #[test]
                fn glue_empty() {
                    let glued = <$scanner>::default()
                        .glued_with(&<$scanner>::default())
                        .unwrap();
                    assert!(glued.is_empty());
                    assert_eq!(glued.regexps_count(), 0);

                    // Gluing with an empty scanner keeps the other patterns.
                    let glued =
                        <$scanner>::default().glued_with(&parse("ab")).unwrap();
                    assert!(glued.matches("ab"));
                    assert_eq!(glued.regexps_count(), 1);
                }

                #[test]
                fn glue_state_limit() {
                    let config = CompileConfig {
                        max_states: 3,
                        ..Default::default()
                    };
                    let result = parse::<$scanner>("abcdef")
                        .glued_with_config(&parse("ghijkl"), &config);
                    assert!(matches!(result, Err(Error::Overflow(_))));
                }
            }
        )*
    };
}

glue_tests! {
    reloc_glue => RelocScanner,
    reloc_nomask_glue => RelocScannerNoMask,
    nonreloc_glue => NonrelocScanner,
    nonreloc_nomask_glue => NonrelocScannerNoMask,
}

#[test]
fn scanners_agree() {
    let fsm = Lexer::new("(ab|cd)*e?").parse().unwrap();

    let reloc: RelocScanner = fsm.compile().unwrap();
    let nonreloc: NonrelocScannerNoMask = fsm.compile().unwrap();
    let simple: SimpleScanner = fsm.compile().unwrap();
    let slow: SlowScanner = fsm.compile().unwrap();
    let capturing: CapturingScanner = fsm.compile().unwrap();

    for text in ["", "ab", "abcd", "abcde", "e", "ee", "abc", "cdab-"] {
        let expected = reloc.matches(text);
        assert_eq!(nonreloc.matches(text), expected, "{:?}", text);
        assert_eq!(simple.matches(text), expected, "{:?}", text);
        assert_eq!(slow.matches(text), expected, "{:?}", text);
        assert_eq!(capturing.matches(text), expected, "{:?}", text);
    }
}

#[test]
fn capturing_agrees_with_tables_on_anchors() {
    // The same NFA state is reached both by a thread that ignores the
    // anchor and by one that follows it. The latter must still follow its
    // empty transitions.
    let fsm = Lexer::with_options("(~(^c)){1,2}", OptionFlag::AndNot)
        .parse()
        .unwrap();

    let reloc: RelocScanner = fsm.compile().unwrap();
    let slow: SlowScanner = fsm.compile().unwrap();
    let capturing: CapturingScanner = fsm.compile().unwrap();

    assert!(reloc.matches("c"));
    for text in ["", "c", "cc", "ca", "a", "xc"] {
        let expected = reloc.matches(text);
        assert_eq!(slow.matches(text), expected, "{:?}", text);
        assert_eq!(capturing.matches(text), expected, "{:?}", text);
    }
}

#[test]
fn kind_mismatch() {
    let saved = parse::<RelocScanner>("abc").save().unwrap();

    match SimpleScanner::load(&saved) {
        Err(Error::DataFormat(DataFormatError::KindMismatch {
            expected,
            found,
        })) => {
            assert_eq!(expected, ScannerKind::Simple.name());
            assert_eq!(found, ScannerKind::Reloc.name());
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(matches!(
        RelocScannerNoMask::load(&saved),
        Err(Error::DataFormat(DataFormatError::KindMismatch { .. }))
    ));
}

#[test]
fn slow_scanner_does_not_blow_up() {
    // The deterministic version of this automaton has 2^20 states.
    let fsm = Lexer::new(".*a.{20}").parse().unwrap();
    let config = CompileConfig { max_states: 1000, ..Default::default() };

    assert!(matches!(
        fsm.compile_with::<RelocScanner>(&config),
        Err(Error::Overflow(_))
    ));

    let slow: SlowScanner = fsm.compile_with(&config).unwrap();
    assert!(slow.matches(format!("xxa{}", "b".repeat(20))));
    assert!(!slow.matches(format!("xxa{}", "b".repeat(21))));
}

#[test]
fn capturing() {
    let fsm = Lexer::with_options(
        r#"google_id\s*=\s*['"]([a-z0-9]+)['"]\s*;"#,
        OptionFlag::CaseInsensitive,
    )
    .add_capturing(1)
    .parse()
    .unwrap();

    let scanner: CapturingScanner = fsm.surrounded().compile().unwrap();

    let captured = |text: &str| {
        let mut state = scanner.init_state();
        state.begin().run(text).end();
        state.captured()
    };

    let text = "google_id = 'abcde';";
    assert_eq!(captured(text), Some((14, 19)));

    let text = "var google_id = 'abcde'; eval(google_id);";
    let (start, end) = captured(text).unwrap();
    assert_eq!(&text[start - 1..end - 1], "abcde");

    let text = "GOOGLE_ID = 'ABCDE';";
    let (start, end) = captured(text).unwrap();
    assert_eq!(&text[start - 1..end - 1], "ABCDE");

    assert_eq!(captured("google_id != 'abcde';"), None);
}

#[test]
fn capturing_takes_the_leftmost_group() {
    let fsm = Lexer::new("a([0-9]+)b").add_capturing(1).parse().unwrap();
    let scanner: CapturingScanner = fsm.surrounded().compile().unwrap();

    let text = "xa12b a345b";
    let mut state = scanner.init_state();
    state.begin().run(text).end();

    let (start, end) = state.captured().unwrap();
    assert_eq!(&text[start - 1..end - 1], "12");
}

#[test]
fn capturing_save_and_load() {
    let fsm = Lexer::new("<([a-z]+)>").add_capturing(1).parse().unwrap();
    let scanner: CapturingScanner = fsm.surrounded().compile().unwrap();
    let loaded = CapturingScanner::load(scanner.save().unwrap()).unwrap();

    let text = "123<tag>456";
    let mut state = loaded.init_state();
    state.begin().run(text).end();

    let (start, end) = state.captured().unwrap();
    assert_eq!(&text[start - 1..end - 1], "tag");
}

#[test]
fn counting() {
    let scanner = CountingScanner::new(
        &Lexer::new("[a-z]+").parse().unwrap(),
        &Lexer::new(r"\s").parse().unwrap(),
    )
    .unwrap();

    let mut state = scanner.init_state();
    state.begin().run("abc def, abc def ghi, abc").end();

    assert_eq!(state.result(0), 3);
    assert_eq!(state.results(), &[3]);
    assert_eq!(state.result(1), 0);
    assert!(!state.is_dead());
}

#[test]
fn counting_glued() {
    let separator = Lexer::new(".*").parse().unwrap();
    let letters =
        CountingScanner::new(&Lexer::new("[a-z]+").parse().unwrap(), &separator)
            .unwrap();
    let digits =
        CountingScanner::new(&Lexer::new("[0-9]+").parse().unwrap(), &separator)
            .unwrap();

    let glued = letters.glued_with(&digits).unwrap();
    assert_eq!(glued.regexps_count(), 2);

    let mut state = glued.init_state();
    state.begin().run("abc defg 123 jklmn 4567 opqrst").end();

    assert_eq!(state.result(0), 4);
    assert_eq!(state.result(1), 2);

    let loaded = CountingScanner::load(glued.save().unwrap()).unwrap();
    let mut state = loaded.init_state();
    state.begin().run("abc defg 123 jklmn 4567 opqrst").end();
    assert_eq!(state.results(), &[4, 2]);
}

#[test]
fn counting_builder() {
    let fsm = Fsm::new();

    assert!(matches!(
        CountingScanner::builder().pattern(fsm.clone()).build(),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        CountingScanner::builder().separator(fsm.clone()).build(),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        CountingScanner::builder().build(),
        Err(Error::InvalidInput(_))
    ));

    let scanner = CountingScanner::builder()
        .pattern(Lexer::new("[0-9]+").parse().unwrap())
        .separator(Lexer::new("[^0-9]+").parse().unwrap())
        .build()
        .unwrap();

    let mut state = scanner.init_state();
    state.begin().run(" 1 22 333").end();
    assert_eq!(state.result(0), 3);

    // Tokens count only after a separator.
    state.reset().begin().run("1 22 333").end();
    assert_eq!(state.result(0), 2);
}

#[test]
fn counting_default() {
    let scanner = CountingScanner::default();
    assert!(scanner.is_empty());
    assert_eq!(scanner.regexps_count(), 0);

    let mut state = scanner.init_state();
    state.begin().run("abc").end();
    assert!(state.results().is_empty());
    assert_eq!(state.result(0), 0);
}

#[test]
fn multi_scanner_accepted_regexps() {
    let scanner: RelocScanner = parse("abc");
    let mut state = scanner.initial_state();
    scanner.run(&mut state, b"abc");
    assert_eq!(scanner.accepted_regexps(&state), &[0]);
    scanner.step(&mut state, b'x' as u16);
    assert!(scanner.accepted_regexps(&state).is_empty());
}
