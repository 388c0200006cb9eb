/*! Abstract Syntax Tree (AST) for regular expressions.

The AST is the output of [`crate::Parser`]. Repetitions, character classes
and groups keep only the information needed for building an automaton:
Perl classes like `\d` or `\w` are already expanded into ranges, escapes are
already resolved into the characters they stand for, and every group knows
its 1-based index.
 */

/// A node in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// Matches the empty string, as in `()` or in `a|`.
    Empty,
    /// A single literal character.
    Literal(char),
    /// The `.` wildcard.
    Dot,
    /// A character class like `[a-z]`, `[^\s]` or `\d`.
    Class(Class),
    /// The `^` anchor.
    Begin,
    /// The `$` anchor.
    End,
    /// A parenthesized group.
    Group(Box<Group>),
    Concat(Vec<Ast>),
    Alternation(Vec<Ast>),
    /// `a&b`, only produced when the `&` and `~` operators are enabled.
    Intersection(Vec<Ast>),
    /// `~a`, only produced when the `&` and `~` operators are enabled.
    Complement(Box<Ast>),
    Repetition(Box<Repetition>),
}

/// A parenthesized group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Index of the group, groups are numbered from 1 in the order in which
    /// their opening parenthesis appears in the pattern.
    pub index: u32,
    pub ast: Ast,
}

/// A repetition like `a*`, `a+`, `a?`, `a{2}`, `a{2,}` or `a{2,4}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repetition {
    pub ast: Ast,
    pub min: u32,
    /// Maximum number of repetitions, `None` means unbounded.
    pub max: Option<u32>,
}

/// A set of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// If true, the class matches any character not in `ranges`.
    pub negated: bool,
    pub ranges: Vec<ClassRange>,
}

/// An inclusive range of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassRange {
    pub start: char,
    pub end: char,
}

impl ClassRange {
    pub fn new(start: char, end: char) -> Self {
        Self { start, end }
    }

    pub fn single(c: char) -> Self {
        Self { start: c, end: c }
    }
}

/// Which one of the Perl character classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PerlClass {
    Digit,
    Word,
    Space,
}

impl PerlClass {
    pub(crate) fn ranges(&self) -> Vec<ClassRange> {
        match self {
            PerlClass::Digit => vec![ClassRange::new('0', '9')],
            PerlClass::Word => vec![
                ClassRange::new('0', '9'),
                ClassRange::new('A', 'Z'),
                ClassRange::single('_'),
                ClassRange::new('a', 'z'),
            ],
            PerlClass::Space => vec![
                ClassRange::new('\t', '\r'),
                ClassRange::single(' '),
            ],
        }
    }
}
