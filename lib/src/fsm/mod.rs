/*! Non-deterministic finite state machines and their algebra.

An [`Fsm`] is a graph of states connected by transitions labelled with
symbols (see [`crate::chars`]). Automata are built either by hand, with
operations like [`Fsm::append`] or [`Fsm::union_with`], or by the
[`crate::Lexer`] from a regular expression, and are later compiled into
one of the scanners in [`crate::scanners`].

Every operation comes in two flavours: a mutating one that changes the
automaton in place and returns `&mut Self`, so that calls can be chained,
and a pure one that leaves the receiver untouched and returns a new
automaton.

```
# use pire::{Fsm, RelocScanner, Scanner};
let mut fsm = Fsm::new();
fsm.append("ab").iterate().append("c");
let scanner = fsm.compile::<RelocScanner>().unwrap();
assert!(scanner.matches("ababc"));
assert!(!scanner.matches("aba"));
```

# Anchors

States react to [`BEGIN_MARK`] and [`END_MARK`] only if they have an explicit
transition on them. A state without such a transition ignores the anchor and
stays where it is. This way `abc` matches the same texts regardless of
whether the caller feeds the anchors or not, while `^abc$` requires them.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::chars::{
    is_anchor, Char, ALPHABET_SIZE, BEGIN_MARK, END_MARK, EPSILON,
    MAX_CHAR_UNALIGNED,
};
use crate::config::CompileConfig;
use crate::errors::Error;
use crate::scanners::FromFsm;

mod dfa;
mod letters;

pub(crate) use dfa::{intern, Dfa, DEAD};
pub(crate) use letters::Letters;

#[cfg(test)]
mod tests;

/// Tag attached to an empty transition, marking the boundaries of a
/// capturing group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Tag {
    Open,
    Close,
}

impl Tag {
    fn flipped(self) -> Self {
        match self {
            Tag::Open => Tag::Close,
            Tag::Close => Tag::Open,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Node {
    pub accepting: bool,
    pub edges: BTreeMap<Char, BTreeSet<usize>>,
    /// Tags of empty transitions, indexed by target state.
    pub tags: BTreeMap<usize, Tag>,
}

impl Node {
    fn accepting() -> Self {
        Self { accepting: true, ..Default::default() }
    }

    /// Targets of empty transitions leaving this state.
    pub fn epsilon_targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.edges.get(&EPSILON).into_iter().flatten().copied()
    }
}

/// A non-deterministic finite state machine.
///
/// An automaton always has at least one state and exactly one initial
/// state. Cloning produces a completely independent copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fsm {
    nodes: Vec<Node>,
    initial: usize,
}

impl Default for Fsm {
    fn default() -> Self {
        Self::new()
    }
}

impl Fsm {
    /// Creates an automaton that accepts only the empty string.
    pub fn new() -> Self {
        Self { nodes: vec![Node::accepting()], initial: 0 }
    }

    /// Creates an automaton that accepts nothing at all.
    pub fn make_false() -> Self {
        Self { nodes: vec![Node::default()], initial: 0 }
    }

    /// Number of states.
    #[inline]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Index of the initial state.
    #[inline]
    pub fn initial(&self) -> usize {
        self.initial
    }

    /// Returns true if `state` exists and is final.
    pub fn is_final(&self, state: usize) -> bool {
        self.nodes.get(state).is_some_and(|node| node.accepting)
    }

    /// Returns the final states in increasing order.
    pub fn finals(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.accepting)
            .map(|(state, _)| state)
            .collect()
    }

    /// Adds a new state without transitions and returns its index.
    pub fn add_state(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    /// Makes `state` the initial state.
    pub fn set_initial(&mut self, state: usize) -> Result<&mut Self, Error> {
        self.check_state(state)?;
        self.initial = state;
        Ok(self)
    }

    /// Changes whether `state` is final.
    pub fn set_final(
        &mut self,
        state: usize,
        accepting: bool,
    ) -> Result<&mut Self, Error> {
        self.check_state(state)?;
        self.nodes[state].accepting = accepting;
        Ok(self)
    }

    /// Adds a transition from `from` to `to` labelled with `symbol`, which
    /// can be a byte, an anchor or [`EPSILON`].
    pub fn connect(
        &mut self,
        from: usize,
        to: usize,
        symbol: Char,
    ) -> Result<&mut Self, Error> {
        self.check_state(from)?;
        self.check_state(to)?;
        if symbol >= MAX_CHAR_UNALIGNED {
            return Err(Error::InvalidInput(format!(
                "{} is not a valid symbol",
                symbol
            )));
        }
        self.link(from, to, symbol);
        Ok(self)
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

// Construction.
impl Fsm {
    /// Appends a literal: from every final state a chain of transitions
    /// that spells `literal` leads to the new final state. An empty literal
    /// leaves the automaton unchanged.
    pub fn append<B: AsRef<[u8]>>(&mut self, literal: B) -> &mut Self {
        for &byte in literal.as_ref() {
            self.append_symbol(Char::from(byte));
        }
        self
    }

    /// Appends an alternative of literals.
    ///
    /// Fails with [`Error::InvalidInput`] if there are no strings or any of
    /// them is empty, in which case the automaton is not modified.
    pub fn append_strings<I, S>(
        &mut self,
        strings: I,
    ) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let strings: Vec<S> = strings.into_iter().collect();
        if strings.is_empty() {
            return Err(Error::InvalidInput(
                "at least one string is required".to_string(),
            ));
        }
        if strings.iter().any(|s| s.as_ref().is_empty()) {
            return Err(Error::InvalidInput(
                "empty strings are not allowed".to_string(),
            ));
        }

        let finals = self.finals();
        let end = self.add_state();

        for s in &strings {
            let bytes = s.as_ref();
            let mut from = finals.clone();
            for (i, &byte) in bytes.iter().enumerate() {
                let to =
                    if i == bytes.len() - 1 { end } else { self.add_state() };
                for &f in &from {
                    self.link(f, to, Char::from(byte));
                }
                from = vec![to];
            }
        }

        for f in finals {
            self.nodes[f].accepting = false;
        }
        self.nodes[end].accepting = true;
        Ok(self)
    }

    /// Appends a transition on an anchor.
    ///
    /// `symbol` must be [`BEGIN_MARK`] or [`END_MARK`]. Values that don't fit
    /// in a [`Char`] produce [`Error::Overflow`], any other symbol produces
    /// [`Error::InvalidInput`].
    pub fn append_special<C>(&mut self, symbol: C) -> Result<&mut Self, Error>
    where
        C: TryInto<Char>,
    {
        let symbol: Char = symbol.try_into().map_err(|_| {
            Error::Overflow("symbol doesn't fit in a character".to_string())
        })?;
        if !is_anchor(symbol) {
            return Err(Error::InvalidInput(format!(
                "{} is not a special symbol",
                symbol
            )));
        }
        self.append_symbol(symbol);
        Ok(self)
    }

    /// Appends a transition on any byte.
    pub fn append_dot(&mut self) -> &mut Self {
        let finals = self.finals();
        let end = self.add_state();
        for f in finals {
            self.nodes[f].accepting = false;
            for byte in 0..=255u8 {
                self.link(f, end, Char::from(byte));
            }
        }
        self.nodes[end].accepting = true;
        self
    }

    /// Appends `.*`.
    pub fn append_anything(&mut self) -> &mut Self {
        let finals = self.finals();
        let end = self.add_state();
        for byte in 0..=255u8 {
            self.link(end, end, Char::from(byte));
        }
        for f in finals {
            self.nodes[f].accepting = false;
            self.link(f, end, EPSILON);
        }
        self.nodes[end].accepting = true;
        self
    }

    /// Prepends `.*`.
    pub fn prepend_anything(&mut self) -> &mut Self {
        let start = self.add_state();
        for byte in 0..=255u8 {
            self.link(start, start, Char::from(byte));
        }
        self.link(start, self.initial, EPSILON);
        self.initial = start;
        self
    }

    /// Wraps the automaton between `.*` on both sides, turning an exact
    /// matcher into a "contains" matcher.
    pub fn surround(&mut self) -> &mut Self {
        self.prepend_anything().append_anything()
    }

    /// Same as [`Fsm::surround`], but returns a new automaton.
    pub fn surrounded(&self) -> Fsm {
        let mut fsm = self.clone();
        fsm.surround();
        fsm
    }

    /// Concatenates `other` after this automaton.
    pub fn append_fsm(&mut self, other: &Fsm) -> &mut Self {
        let finals = self.finals();
        let offset = self.import(other);
        for f in finals {
            self.nodes[f].accepting = false;
            self.link(f, offset + other.initial, EPSILON);
        }
        self
    }

    /// Same as [`Fsm::append_fsm`], but returns a new automaton.
    pub fn concatenated(&self, other: &Fsm) -> Fsm {
        let mut fsm = self.clone();
        fsm.append_fsm(other);
        fsm
    }

    /// Makes the automaton accept the strings accepted by `other` too.
    pub fn union_with(&mut self, other: &Fsm) -> &mut Self {
        let offset = self.import(other);
        let start = self.add_state();
        self.link(start, self.initial, EPSILON);
        self.link(start, offset + other.initial, EPSILON);
        self.initial = start;
        self
    }

    /// Same as [`Fsm::union_with`], but returns a new automaton.
    pub fn united(&self, other: &Fsm) -> Fsm {
        let mut fsm = self.clone();
        fsm.union_with(other);
        fsm
    }

    /// Kleene star: zero or more repetitions.
    pub fn iterate(&mut self) -> &mut Self {
        let finals = self.finals();
        let start = self.add_state();
        self.link(start, self.initial, EPSILON);
        for f in finals {
            self.link(f, start, EPSILON);
        }
        self.nodes[start].accepting = true;
        self.initial = start;
        self
    }

    /// Same as [`Fsm::iterate`], but returns a new automaton.
    pub fn starred(&self) -> Fsm {
        let mut fsm = self.clone();
        fsm.iterate();
        fsm
    }

    /// One or more repetitions.
    pub fn iterate_plus(&mut self) -> &mut Self {
        let initial = self.initial;
        for f in self.finals() {
            self.link(f, initial, EPSILON);
        }
        self
    }

    /// Returns a new automaton that accepts one or more repetitions of the
    /// strings accepted by this one.
    pub fn iterated(&self) -> Fsm {
        let mut fsm = self.clone();
        fsm.iterate_plus();
        fsm
    }

    /// Exactly `n` repetitions. `repeat(0)` accepts only the empty string.
    pub fn repeat(&mut self, n: usize) -> &mut Self {
        let base = self.clone();
        *self = Fsm::new();
        for _ in 0..n {
            self.append_fsm(&base);
        }
        self
    }

    /// Same as [`Fsm::repeat`], but returns a new automaton.
    pub fn repeated(&self, n: usize) -> Fsm {
        let mut fsm = self.clone();
        fsm.repeat(n);
        fsm
    }

    /// Reverses the automaton: it accepts the reversal of every string it
    /// accepted before. Anchors swap their roles, so `^ab` becomes `ba$`.
    pub fn reverse(&mut self) -> &mut Self {
        let n = self.nodes.len();
        let mut nodes = vec![Node::default(); n + 1];

        for (from, node) in self.nodes.iter().enumerate() {
            for (&symbol, targets) in &node.edges {
                let symbol = match symbol {
                    BEGIN_MARK => END_MARK,
                    END_MARK => BEGIN_MARK,
                    symbol => symbol,
                };
                for &to in targets {
                    nodes[to].edges.entry(symbol).or_default().insert(from);
                }
            }
            for (&to, &tag) in &node.tags {
                nodes[to].tags.insert(from, tag.flipped());
            }
        }

        let start = n;
        for f in self.finals() {
            nodes[start].edges.entry(EPSILON).or_default().insert(f);
        }
        nodes[self.initial].accepting = true;

        self.nodes = nodes;
        self.initial = start;
        self
    }

    /// Same as [`Fsm::reverse`], but returns a new automaton.
    pub fn reversed(&self) -> Fsm {
        let mut fsm = self.clone();
        fsm.reverse();
        fsm
    }

    /// Marks the whole automaton as a capturing group: the positions where
    /// a match starts and ends are recorded by a
    /// [`crate::CapturingScanner`].
    pub fn capture(&mut self) -> &mut Self {
        let finals = self.finals();
        let open = self.add_state();
        let close = self.add_state();
        self.link_tagged(open, self.initial, Tag::Open);
        for f in finals {
            self.nodes[f].accepting = false;
            self.link_tagged(f, close, Tag::Close);
        }
        self.nodes[close].accepting = true;
        self.initial = open;
        self
    }
}

// Operations that go through a deterministic automaton.
impl Fsm {
    /// Complements the automaton: it accepts every string it rejected
    /// before, and vice versa. The complement is taken over the whole
    /// alphabet, anchors included.
    pub fn complement(&mut self) -> Result<&mut Self, Error> {
        self.complement_with(&CompileConfig::default())
    }

    /// Same as [`Fsm::complement`], with explicit limits.
    pub fn complement_with(
        &mut self,
        config: &CompileConfig,
    ) -> Result<&mut Self, Error> {
        let dfa = Dfa::from_fsm(self, config)?.complement();
        *self = Fsm::from_dfa(&dfa);
        Ok(self)
    }

    /// Same as [`Fsm::complement`], but returns a new automaton.
    pub fn complemented(&self) -> Result<Fsm, Error> {
        let mut fsm = self.clone();
        fsm.complement()?;
        Ok(fsm)
    }

    /// Makes the automaton accept only strings accepted by both this
    /// automaton and `other`.
    pub fn intersect_with(&mut self, other: &Fsm) -> Result<&mut Self, Error> {
        self.combine(other, &CompileConfig::default(), |a, b| {
            !a.is_empty() && !b.is_empty()
        })
    }

    /// Same as [`Fsm::intersect_with`], but returns a new automaton.
    pub fn intersected(&self, other: &Fsm) -> Result<Fsm, Error> {
        let mut fsm = self.clone();
        fsm.intersect_with(other)?;
        Ok(fsm)
    }

    /// Makes the automaton accept only strings accepted by this automaton
    /// and rejected by `other`.
    pub fn and_not(&mut self, other: &Fsm) -> Result<&mut Self, Error> {
        self.and_not_with(other, &CompileConfig::default())
    }

    /// Same as [`Fsm::and_not`], with explicit limits.
    pub fn and_not_with(
        &mut self,
        other: &Fsm,
        config: &CompileConfig,
    ) -> Result<&mut Self, Error> {
        self.combine(other, config, |a, b| !a.is_empty() && b.is_empty())
    }

    /// Same as [`Fsm::and_not`], but returns a new automaton.
    pub fn and_notted(&self, other: &Fsm) -> Result<Fsm, Error> {
        let mut fsm = self.clone();
        fsm.and_not(other)?;
        Ok(fsm)
    }

    /// Replaces the automaton with the minimal deterministic automaton that
    /// accepts the same strings.
    pub fn determine(&mut self) -> Result<&mut Self, Error> {
        let dfa = Dfa::from_fsm(self, &CompileConfig::default())?;
        *self = Fsm::from_dfa(&dfa);
        Ok(self)
    }

    /// Compiles the automaton into a scanner.
    ///
    /// ```
    /// # use pire::{Fsm, Scanner, SimpleScanner};
    /// let mut fsm = Fsm::new();
    /// fsm.append("abc");
    /// let scanner = fsm.compile::<SimpleScanner>().unwrap();
    /// assert!(scanner.matches("abc"));
    /// ```
    pub fn compile<S: FromFsm>(&self) -> Result<S, Error> {
        S::from_fsm(self)
    }

    /// Same as [`Fsm::compile`], with explicit limits.
    pub fn compile_with<S: FromFsm>(
        &self,
        config: &CompileConfig,
    ) -> Result<S, Error> {
        S::from_fsm_with(self, config)
    }

    fn combine(
        &mut self,
        other: &Fsm,
        config: &CompileConfig,
        accept: impl Fn(&[u32], &[u32]) -> bool,
    ) -> Result<&mut Self, Error> {
        let left = Dfa::from_fsm(self, config)?;
        let right = Dfa::from_fsm(other, config)?;
        let mut product =
            Dfa::product(&left, &right, config.max_states, |a, b| {
                if accept(a, b) {
                    vec![0]
                } else {
                    vec![]
                }
            })?;
        if config.minimize {
            product = product.minimize();
        }
        *self = Fsm::from_dfa(&product.compact_letters());
        Ok(self)
    }

    /// Builds an automaton with the same states and transitions as a
    /// deterministic one. Anchor transitions are always explicit, while
    /// byte transitions into the dead state are left out.
    pub(crate) fn from_dfa(dfa: &Dfa) -> Fsm {
        let mut nodes = vec![Node::default(); dfa.size()];
        for (state, node) in nodes.iter_mut().enumerate() {
            node.accepting = dfa.is_final(state as u32);
            for symbol in 0..ALPHABET_SIZE as Char {
                let target = dfa.next_state(state as u32, symbol);
                if target == DEAD && !is_anchor(symbol) {
                    continue;
                }
                node.edges
                    .entry(symbol)
                    .or_default()
                    .insert(target as usize);
            }
        }
        Fsm { nodes, initial: dfa.initial as usize }
    }
}

// Private helpers.
impl Fsm {
    fn check_state(&self, state: usize) -> Result<(), Error> {
        if state >= self.nodes.len() {
            return Err(Error::InvalidInput(format!(
                "state {} doesn't exist, the automaton has {} states",
                state,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn link(&mut self, from: usize, to: usize, symbol: Char) {
        self.nodes[from].edges.entry(symbol).or_default().insert(to);
    }

    fn link_tagged(&mut self, from: usize, to: usize, tag: Tag) {
        self.link(from, to, EPSILON);
        self.nodes[from].tags.insert(to, tag);
    }

    /// Appends a single transition on `symbol` from every final state.
    fn append_symbol(&mut self, symbol: Char) {
        let finals = self.finals();
        let end = self.add_state();
        for f in finals {
            self.nodes[f].accepting = false;
            self.link(f, end, symbol);
        }
        self.nodes[end].accepting = true;
    }

    /// Copies the states of `other` into this automaton, and returns the
    /// offset that must be added to the indexes of `other`'s states.
    fn import(&mut self, other: &Fsm) -> usize {
        let offset = self.nodes.len();
        self.nodes.extend(other.nodes.iter().map(|node| Node {
            accepting: node.accepting,
            edges: node
                .edges
                .iter()
                .map(|(&symbol, targets)| {
                    (symbol, targets.iter().map(|t| t + offset).collect())
                })
                .collect(),
            tags: node
                .tags
                .iter()
                .map(|(&target, &tag)| (target + offset, tag))
                .collect(),
        }));
        offset
    }
}
