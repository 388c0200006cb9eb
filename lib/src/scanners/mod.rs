/*! Scanners: compiled, immutable matchers driven by states.

A scanner is built from an [`Fsm`] (see [`Fsm::compile`]) and never changes
afterwards. Matching happens through a [`State`], a lightweight cursor that
borrows the scanner and is advanced one symbol at a time:

```
# use pire::{Lexer, RelocScanner, Scanner};
let scanner: RelocScanner =
    Lexer::new("ab+c").parse().unwrap().compile().unwrap();
let mut state = scanner.init_state();
state.begin().run("abbbc").end();
assert!(state.is_final());
```

Every scanner implements the [`Scanner`] trait. The different
implementations trade memory, speed and features:

* [`RelocScanner`], [`RelocScannerNoMask`], [`NonrelocScanner`] and
  [`NonrelocScannerNoMask`] are compact transition tables that can be glued
  together into multi-pattern scanners (see [`Glue`]).
* [`SimpleScanner`] is a plain table with one column per symbol.
* [`SlowScanner`] doesn't build any table, it walks the non-deterministic
  automaton directly.
* [`CapturingScanner`] reports where a group matched.
* [`CountingScanner`] counts the tokens that match a pattern.

Scanners are `Send + Sync` and can be shared among threads, each of them
driving its own [`State`].
*/

use std::fmt::Debug;

use crate::chars::{is_input, Char, BEGIN_MARK, END_MARK};
use crate::config::CompileConfig;
use crate::errors::Error;
use crate::fsm::Fsm;

mod capture;
mod count;
mod persist;
mod simple;
mod slow;
mod table;

pub use capture::{CaptureState, CapturingScanner};
pub use count::{CountState, CountingScanner, CountingScannerBuilder};
pub use persist::{Persist, ScannerKind};
pub use simple::SimpleScanner;
pub use slow::{SlowScanner, SlowState};
pub use table::{
    Layout, Nonreloc, NonrelocNoMask, NonrelocScanner, NonrelocScannerNoMask,
    Reloc, RelocNoMask, RelocScanner, RelocScannerNoMask, TableScanner,
};

#[cfg(test)]
mod tests;

/// Contract shared by every scanner.
///
/// The required methods operate on the scanner-specific state type. Most
/// users don't call them directly, they use [`Scanner::init_state`] and the
/// methods of [`State`], or one of the provided matching functions.
pub trait Scanner {
    /// Scanner-specific state.
    type State: Clone + Debug;

    /// Returns the state at the start of a match, before any symbol.
    fn initial_state(&self) -> Self::State;

    /// Advances `state` with a symbol. `symbol` is always a byte or an
    /// anchor.
    fn step(&self, state: &mut Self::State, symbol: Char);

    /// Advances `state` with every byte in `text`.
    fn run(&self, state: &mut Self::State, text: &[u8]) {
        for &byte in text {
            self.step(state, Char::from(byte));
        }
    }

    /// Returns true if `state` accepts.
    fn is_final(&self, state: &Self::State) -> bool;

    /// Returns true if no input can make `state` accept anymore.
    fn is_dead(&self, state: &Self::State) -> bool;

    /// Number of internal states.
    fn size(&self) -> usize;

    /// Returns true if the scanner accepts nothing at all.
    fn is_empty(&self) -> bool;

    /// Number of patterns the scanner recognizes.
    fn regexps_count(&self) -> usize;

    /// Returns a new [`State`] at the start of a match.
    fn init_state(&self) -> State<'_, Self>
    where
        Self: Sized,
    {
        State::new(self)
    }

    /// Returns true if the whole `text` matches.
    fn matches<T: AsRef<[u8]>>(&self, text: T) -> bool
    where
        Self: Sized,
    {
        let mut state = self.init_state();
        state.begin().run(text).end();
        state.is_final()
    }

    /// Length of the longest prefix of `text` that matches, if any.
    fn longest_prefix<T: AsRef<[u8]>>(&self, text: T) -> Option<usize>
    where
        Self: Sized,
    {
        scan_prefix(self, text.as_ref(), false)
    }

    /// Length of the shortest prefix of `text` that matches, if any.
    fn shortest_prefix<T: AsRef<[u8]>>(&self, text: T) -> Option<usize>
    where
        Self: Sized,
    {
        scan_prefix(self, text.as_ref(), true)
    }

    /// Scans `text` backwards, from its end, and returns the offset where
    /// the longest matching suffix starts.
    ///
    /// The scanner is expected to be built from a reversed automaton (see
    /// [`Fsm::reverse`]), as it sees the text from the last byte to the
    /// first.
    fn longest_suffix<T: AsRef<[u8]>>(&self, text: T) -> Option<usize>
    where
        Self: Sized,
    {
        scan_suffix(self, text.as_ref(), false)
    }

    /// Like [`Scanner::longest_suffix`], but returns the offset of the
    /// shortest matching suffix.
    fn shortest_suffix<T: AsRef<[u8]>>(&self, text: T) -> Option<usize>
    where
        Self: Sized,
    {
        scan_suffix(self, text.as_ref(), true)
    }
}

/// Scanners that recognize multiple patterns and can tell which ones
/// accept.
pub trait MultiScanner: Scanner {
    /// Sorted indexes of the patterns accepted in `state`.
    fn accepted_regexps<'a>(&'a self, state: &Self::State) -> &'a [u32];
}

/// Scanners that can be combined into a multi-pattern scanner.
pub trait Glue: Scanner + Sized {
    /// Combines two scanners into a new one that recognizes the patterns of
    /// both. The patterns of `other` are numbered after those of `self`.
    ///
    /// Fails with [`Error::Overflow`] if the result doesn't fit in the
    /// encoding.
    fn glued_with(&self, other: &Self) -> Result<Self, Error> {
        self.glued_with_config(other, &CompileConfig::default())
    }

    /// Same as [`Glue::glued_with`], with explicit limits.
    fn glued_with_config(
        &self,
        other: &Self,
        config: &CompileConfig,
    ) -> Result<Self, Error>;
}

/// Scanners that can be built from an [`Fsm`].
pub trait FromFsm: Sized {
    /// Builds the scanner with default limits.
    fn from_fsm(fsm: &Fsm) -> Result<Self, Error> {
        Self::from_fsm_with(fsm, &CompileConfig::default())
    }

    /// Builds the scanner with explicit limits.
    fn from_fsm_with(fsm: &Fsm, config: &CompileConfig) -> Result<Self, Error>;
}

/// A cursor over a scanner.
///
/// A state borrows its scanner, so it can't outlive it. States are cheap
/// to clone and to [`State::reset`].
pub struct State<'s, S: Scanner> {
    scanner: &'s S,
    inner: S::State,
}

impl<'s, S: Scanner> Clone for State<'s, S> {
    fn clone(&self) -> Self {
        Self { scanner: self.scanner, inner: self.inner.clone() }
    }
}

impl<'s, S: Scanner> Debug for State<'s, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State").field("inner", &self.inner).finish()
    }
}

impl<'s, S: Scanner> State<'s, S> {
    /// Creates a state positioned at the start of a match.
    pub fn new(scanner: &'s S) -> Self {
        Self { scanner, inner: scanner.initial_state() }
    }

    /// Scanner this state belongs to.
    #[inline]
    pub fn scanner(&self) -> &'s S {
        self.scanner
    }

    /// Scanner-specific state.
    #[inline]
    pub fn inner(&self) -> &S::State {
        &self.inner
    }

    /// Goes back to the start of a match.
    pub fn reset(&mut self) -> &mut Self {
        self.inner = self.scanner.initial_state();
        self
    }

    /// Feeds the begin-of-text anchor.
    pub fn begin(&mut self) -> &mut Self {
        self.scanner.step(&mut self.inner, BEGIN_MARK);
        self
    }

    /// Feeds every byte in `text`.
    pub fn run<T: AsRef<[u8]>>(&mut self, text: T) -> &mut Self {
        self.scanner.run(&mut self.inner, text.as_ref());
        self
    }

    /// Feeds a single symbol, which must be a byte or an anchor.
    pub fn step(&mut self, symbol: Char) -> Result<&mut Self, Error> {
        if !is_input(symbol) {
            return Err(Error::TypeMismatch(format!(
                "{} is neither a byte nor an anchor",
                symbol
            )));
        }
        self.scanner.step(&mut self.inner, symbol);
        Ok(self)
    }

    /// Feeds the end-of-text anchor.
    pub fn end(&mut self) -> &mut Self {
        self.scanner.step(&mut self.inner, END_MARK);
        self
    }

    /// Returns true if the state accepts.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.scanner.is_final(&self.inner)
    }

    /// Returns true if no input can make the state accept anymore.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.scanner.is_dead(&self.inner)
    }
}

impl<'s, S: MultiScanner> State<'s, S> {
    /// Sorted indexes of the patterns accepted by the state.
    pub fn accepted_regexps(&self) -> &'s [u32] {
        self.scanner.accepted_regexps(&self.inner)
    }
}

fn scan_prefix<S: Scanner>(
    scanner: &S,
    text: &[u8],
    shortest: bool,
) -> Option<usize> {
    let mut state = scanner.initial_state();
    let mut found = None;

    scanner.step(&mut state, BEGIN_MARK);
    if scanner.is_final(&state) {
        if shortest {
            return Some(0);
        }
        found = Some(0);
    }

    for (i, &byte) in text.iter().enumerate() {
        if scanner.is_dead(&state) {
            return found;
        }
        scanner.step(&mut state, Char::from(byte));
        if scanner.is_final(&state) {
            if shortest {
                return Some(i + 1);
            }
            found = Some(i + 1);
        }
    }

    if !scanner.is_dead(&state) {
        scanner.step(&mut state, END_MARK);
        if scanner.is_final(&state) {
            found = Some(text.len());
        }
    }

    found
}

fn scan_suffix<S: Scanner>(
    scanner: &S,
    text: &[u8],
    shortest: bool,
) -> Option<usize> {
    let mut state = scanner.initial_state();
    let mut found = None;

    // The scanner sees the text reversed, so it starts at the end of the
    // text.
    scanner.step(&mut state, BEGIN_MARK);
    if scanner.is_final(&state) {
        if shortest {
            return Some(text.len());
        }
        found = Some(text.len());
    }

    for (i, &byte) in text.iter().enumerate().rev() {
        if scanner.is_dead(&state) {
            return found;
        }
        scanner.step(&mut state, Char::from(byte));
        if scanner.is_final(&state) {
            if shortest {
                return Some(i);
            }
            found = Some(i);
        }
    }

    if !scanner.is_dead(&state) {
        scanner.step(&mut state, END_MARK);
        if scanner.is_final(&state) {
            found = Some(0);
        }
    }

    found
}
