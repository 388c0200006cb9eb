/*! Symbols consumed by automata and scanners.

Input bytes are symbols `0..=255`. Right after them come two zero-width
anchors, [`BEGIN_MARK`] and [`END_MARK`], that scanners receive when the
caller invokes `begin()` and `end()` on a state. [`EPSILON`] labels the
empty transitions of non-deterministic automata and is never fed to a
scanner.
*/

/// A symbol: either a byte, an anchor, or epsilon.
pub type Char = u16;

/// Anchor fed at the start of the text (`^`).
pub const BEGIN_MARK: Char = 256;

/// Anchor fed at the end of the text (`$`).
pub const END_MARK: Char = 257;

/// Label of empty transitions.
pub const EPSILON: Char = 258;

/// Upper bound (exclusive) of every symbol that an automaton can hold.
pub const MAX_CHAR_UNALIGNED: Char = 259;

/// Number of symbols a scanner can be driven with: every byte plus the two
/// anchors.
pub const ALPHABET_SIZE: usize = END_MARK as usize + 1;

/// Returns true if `c` is one of the zero-width anchors.
#[inline]
pub fn is_anchor(c: Char) -> bool {
    c == BEGIN_MARK || c == END_MARK
}

/// Returns true if `c` can be fed to a scanner.
#[inline]
pub fn is_input(c: Char) -> bool {
    (c as usize) < ALPHABET_SIZE
}
