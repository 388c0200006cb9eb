/*! Regular expressions compiled into deterministic automata.

Patterns go through three stages. A [`Lexer`] parses a regular expression
and builds a non-deterministic automaton, an [`Fsm`]. Automata can be
combined and transformed with the operations of [`Fsm`] (concatenation,
union, intersection, complement, reversal and others), and finally compiled
into a scanner. Scanners are immutable, table-driven matchers that consume
text one byte at a time through a [`State`].

# Example

```rust
# use pire::{Lexer, RelocScanner, Scanner};
// Build an automaton from a regular expression.
let fsm = Lexer::new("(foo|bar)+").parse().unwrap();

// Compile it into a scanner that looks for the pattern anywhere in the text.
let scanner: RelocScanner = fsm.surrounded().compile().unwrap();

assert!(scanner.matches("prefix foobar suffix"));
assert!(!scanner.matches("bla bla bla"));
```

Several scanners can be glued into a single one that tells which patterns
match:

```rust
# use pire::{Glue, Lexer, RelocScanner, Scanner};
let ab: RelocScanner = Lexer::new("ab").parse().unwrap().compile().unwrap();
let abcd: RelocScanner = Lexer::new("abcd").parse().unwrap().compile().unwrap();
let glued = ab.glued_with(&abcd).unwrap();

let mut state = glued.init_state();
state.begin().run("ab");
assert_eq!(state.accepted_regexps(), &[0]);
state.run("cd");
assert_eq!(state.accepted_regexps(), &[1]);
```

For the simplest use cases see [`Regexp`].
*/

pub use errors::DataFormatError;
pub use errors::Error;

pub use fsm::Fsm;

pub use lexer::Lexer;
pub use lexer::OptionFlag;
pub use lexer::Options;

pub use scanners::CapturingScanner;
pub use scanners::CountingScanner;
pub use scanners::CountingScannerBuilder;
pub use scanners::FromFsm;
pub use scanners::Glue;
pub use scanners::Layout;
pub use scanners::MultiScanner;
pub use scanners::NonrelocScanner;
pub use scanners::NonrelocScannerNoMask;
pub use scanners::Persist;
pub use scanners::RelocScanner;
pub use scanners::RelocScannerNoMask;
pub use scanners::Scanner;
pub use scanners::ScannerKind;
pub use scanners::SimpleScanner;
pub use scanners::SlowScanner;
pub use scanners::State;
pub use scanners::TableScanner;

pub use easy::Regexp;

pub mod chars;
pub mod config;
pub mod scanners;

mod easy;
mod errors;
mod fsm;
mod lexer;

#[cfg(test)]
mod tests;
