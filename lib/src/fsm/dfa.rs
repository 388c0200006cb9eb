use std::hash::Hash;
#[cfg(feature = "logging")]
use std::time::Instant;

use bitvec::prelude::*;
#[cfg(feature = "logging")]
use log::*;
use rustc_hash::FxHashMap;

use crate::chars::{is_anchor, Char, EPSILON};
use crate::config::CompileConfig;
use crate::errors::Error;
use crate::fsm::{Fsm, Letters};

/// Index of the dead state in every [`Dfa`].
pub(crate) const DEAD: u32 = 0;

/// A total deterministic automaton over letter classes.
///
/// This is the intermediate form between an [`Fsm`] and the scanners.
/// State [`DEAD`] is always present, it is not final and all its
/// transitions go back to itself. After [`Dfa::trim`] it is also the only
/// state from where no final state can be reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Dfa {
    pub letters: Letters,
    /// Transition table, `next[state * stride + class]`.
    pub next: Vec<u32>,
    /// Sorted indexes of the regexps accepted in each state, empty for
    /// non-final states.
    pub accepts: Vec<Vec<u32>>,
    pub initial: u32,
}

impl Dfa {
    #[inline]
    pub fn size(&self) -> usize {
        self.accepts.len()
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.letters.count()
    }

    #[inline]
    pub fn is_final(&self, state: u32) -> bool {
        !self.accepts[state as usize].is_empty()
    }

    #[inline]
    pub fn next_state(&self, state: u32, symbol: Char) -> u32 {
        self.next[state as usize * self.stride() + self.letters.class(symbol)]
    }

    /// Determinizes an automaton by subset construction.
    ///
    /// Each state of the result is a set of states of `fsm`, closed under
    /// empty transitions when it is entered. States of `fsm` without a
    /// transition on an anchor stay in the set when the anchor is consumed,
    /// without following their empty transitions again. Every final state
    /// accepts regexp 0.
    pub fn from_fsm(fsm: &Fsm, config: &CompileConfig) -> Result<Dfa, Error> {
        #[cfg(feature = "logging")]
        let start = Instant::now();

        let letters = Letters::for_fsm(fsm);
        let representatives = letters.representatives();

        let mut closure = Closure::new(fsm.size());
        let mut ids: FxHashMap<Vec<u32>, u32> = FxHashMap::default();
        let mut sets: Vec<Vec<u32>> = Vec::new();

        // The empty set is the dead state.
        intern(&mut ids, &mut sets, Vec::new(), config.max_states)?;

        let initial_set = closure.expand(fsm, &[fsm.initial() as u32]);
        let initial =
            intern(&mut ids, &mut sets, initial_set, config.max_states)?;

        let mut next = Vec::new();
        let mut moved = Vec::new();
        let mut stayed = Vec::new();
        let mut i = 0;

        while i < sets.len() {
            let current = sets[i].clone();
            for &symbol in &representatives {
                moved.clear();
                stayed.clear();
                for &state in &current {
                    match fsm.nodes()[state as usize].edges.get(&symbol) {
                        Some(targets) => {
                            moved.extend(targets.iter().map(|&t| t as u32))
                        }
                        None if is_anchor(symbol) => stayed.push(state),
                        None => {}
                    }
                }
                // A state that ignores an anchor is kept as it is. Its
                // empty transitions were already followed when it entered
                // the set, and the states they lead to consumed the anchor
                // on their own.
                let mut set = closure.expand(fsm, &moved);
                set.extend_from_slice(&stayed);
                set.sort_unstable();
                set.dedup();
                next.push(intern(&mut ids, &mut sets, set, config.max_states)?);
            }
            i += 1;
        }

        let accepts = sets
            .iter()
            .map(|set| {
                if set.iter().any(|&s| fsm.nodes()[s as usize].accepting) {
                    vec![0]
                } else {
                    vec![]
                }
            })
            .collect();

        let mut dfa = Dfa { letters, next, accepts, initial }.trim();

        if config.minimize {
            dfa = dfa.minimize();
        }

        let dfa = dfa.compact_letters();

        #[cfg(feature = "logging")]
        {
            info!("Determinization time: {:?}", Instant::elapsed(&start));
            debug!(
                "Determinized {} NFA states into {} DFA states, {} classes",
                fsm.size(),
                dfa.size(),
                dfa.stride()
            );
        }

        Ok(dfa)
    }

    /// Product of two automata. The accepted regexps of each pair of states
    /// are computed by `accept`.
    pub fn product(
        a: &Dfa,
        b: &Dfa,
        max_states: usize,
        accept: impl Fn(&[u32], &[u32]) -> Vec<u32>,
    ) -> Result<Dfa, Error> {
        let (letters, pairs) = a.letters.refine(&b.letters);
        let (a_stride, b_stride) = (a.stride(), b.stride());

        let mut ids: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut states: Vec<(u32, u32)> = Vec::new();

        intern(&mut ids, &mut states, (DEAD, DEAD), max_states)?;

        let initial =
            intern(&mut ids, &mut states, (a.initial, b.initial), max_states)?;

        let mut next = Vec::new();
        let mut i = 0;

        while i < states.len() {
            let (p, q) = states[i];
            for &(class_a, class_b) in &pairs {
                let target = (
                    a.next[p as usize * a_stride + class_a],
                    b.next[q as usize * b_stride + class_b],
                );
                next.push(intern(&mut ids, &mut states, target, max_states)?);
            }
            i += 1;
        }

        let accepts = states
            .iter()
            .map(|&(p, q)| {
                accept(&a.accepts[p as usize], &b.accepts[q as usize])
            })
            .collect();

        Ok(Dfa { letters, next, accepts, initial }.trim())
    }

    /// Collapses every state that can't reach a final state into
    /// [`DEAD`], drops unreachable states, and numbers the rest in
    /// breadth-first order from the initial state.
    pub fn trim(self) -> Dfa {
        let stride = self.stride();
        let live = live_states(&self.next, stride, |s| {
            !self.accepts[s].is_empty()
        });

        let mut map = vec![DEAD; self.size()];
        // Old indexes of the surviving states, state `order[i]` becomes
        // `i + 1`.
        let mut order = Vec::new();
        let initial = self.initial as usize;

        if live[initial] {
            map[initial] = 1;
            order.push(initial);
        }

        let mut i = 0;
        while i < order.len() {
            let row = order[i] * stride;
            for &target in &self.next[row..row + stride] {
                let target = target as usize;
                if live[target] && map[target] == DEAD {
                    order.push(target);
                    map[target] = order.len() as u32;
                }
            }
            i += 1;
        }

        let mut next = vec![DEAD; (order.len() + 1) * stride];
        let mut accepts = vec![Vec::new(); order.len() + 1];

        for (i, &state) in order.iter().enumerate() {
            let old_row = state * stride;
            let new_row = (i + 1) * stride;
            for c in 0..stride {
                next[new_row + c] = map[self.next[old_row + c] as usize];
            }
            accepts[i + 1] = self.accepts[state].clone();
        }

        Dfa {
            letters: self.letters,
            next,
            accepts,
            initial: map[initial],
        }
    }

    /// Merges equivalent states (Moore's algorithm).
    pub fn minimize(self) -> Dfa {
        let n = self.size();
        let stride = self.stride();

        // Initial partition: states with the same accepted regexps.
        let mut block = vec![0_u32; n];
        let mut count = {
            let mut ids: FxHashMap<&[u32], u32> = FxHashMap::default();
            for (state, accepts) in self.accepts.iter().enumerate() {
                let next_id = ids.len() as u32;
                block[state] =
                    *ids.entry(accepts.as_slice()).or_insert(next_id);
            }
            ids.len()
        };

        let mut key = Vec::with_capacity(stride + 1);

        loop {
            let mut ids: FxHashMap<Vec<u32>, u32> = FxHashMap::default();
            let mut refined = vec![0_u32; n];
            for state in 0..n {
                key.clear();
                key.push(block[state]);
                key.extend(
                    self.next[state * stride..(state + 1) * stride]
                        .iter()
                        .map(|&t| block[t as usize]),
                );
                let next_id = ids.len() as u32;
                refined[state] = *ids.entry(key.clone()).or_insert(next_id);
            }
            block = refined;
            if ids.len() == count {
                break;
            }
            count = ids.len();
        }

        // The first state of each block represents it.
        let mut representative = vec![0_usize; count];
        for state in (0..n).rev() {
            representative[block[state] as usize] = state;
        }

        let mut next = Vec::with_capacity(count * stride);
        for &state in &representative {
            next.extend(
                self.next[state * stride..(state + 1) * stride]
                    .iter()
                    .map(|&t| block[t as usize]),
            );
        }

        let accepts = representative
            .iter()
            .map(|&state| self.accepts[state].clone())
            .collect();

        Dfa {
            initial: block[self.initial as usize],
            letters: self.letters,
            next,
            accepts,
        }
        .trim()
    }

    /// Merges letter classes whose columns are identical.
    pub fn compact_letters(self) -> Dfa {
        let n = self.size();
        let stride = self.stride();

        let mut ids: FxHashMap<Vec<u32>, usize> = FxHashMap::default();
        let mut remap = vec![0; stride];
        let mut kept = Vec::new();

        for (class, new_class) in remap.iter_mut().enumerate() {
            let column: Vec<u32> =
                (0..n).map(|s| self.next[s * stride + class]).collect();
            let next_id = ids.len();
            *new_class = *ids.entry(column).or_insert(next_id);
            if *new_class == next_id {
                kept.push(class);
            }
        }

        if kept.len() == stride {
            return self;
        }

        let mut next = Vec::with_capacity(n * kept.len());
        for state in 0..n {
            next.extend(
                kept.iter().map(|&class| self.next[state * stride + class]),
            );
        }

        Dfa {
            letters: self.letters.remap(&remap, kept.len()),
            next,
            accepts: self.accepts,
            initial: self.initial,
        }
    }

    /// Swaps final and non-final states.
    pub fn complement(mut self) -> Dfa {
        for accepts in self.accepts.iter_mut() {
            *accepts = if accepts.is_empty() { vec![0] } else { Vec::new() };
        }
        self.trim().compact_letters()
    }
}

/// Computes the empty-transition closure of sets of states.
struct Closure {
    seen: BitVec,
    stack: Vec<u32>,
}

impl Closure {
    fn new(size: usize) -> Self {
        Self { seen: bitvec![0; size], stack: Vec::new() }
    }

    /// Returns the sorted set of states reachable from `seeds` through
    /// empty transitions, seeds included.
    fn expand(&mut self, fsm: &Fsm, seeds: &[u32]) -> Vec<u32> {
        let mut result = Vec::new();
        for &state in seeds {
            if !self.seen[state as usize] {
                self.seen.set(state as usize, true);
                self.stack.push(state);
            }
        }
        while let Some(state) = self.stack.pop() {
            result.push(state);
            let node = &fsm.nodes()[state as usize];
            if let Some(targets) = node.edges.get(&EPSILON) {
                for &target in targets {
                    if !self.seen[target] {
                        self.seen.set(target, true);
                        self.stack.push(target as u32);
                    }
                }
            }
        }
        for &state in &result {
            self.seen.set(state as usize, false);
        }
        result.sort_unstable();
        result
    }
}

/// Returns the index of `key` in `items`, appending it if not present.
pub(crate) fn intern<K: Hash + Eq + Clone>(
    ids: &mut FxHashMap<K, u32>,
    items: &mut Vec<K>,
    key: K,
    limit: usize,
) -> Result<u32, Error> {
    if let Some(&id) = ids.get(&key) {
        return Ok(id);
    }
    if items.len() >= limit {
        return Err(Error::too_many_states(limit));
    }
    let id = items.len() as u32;
    ids.insert(key.clone(), id);
    items.push(key);
    Ok(id)
}

/// Returns the states of a transition table from where some final state
/// can be reached.
fn live_states(
    next: &[u32],
    stride: usize,
    is_final: impl Fn(usize) -> bool,
) -> BitVec {
    let n = next.len() / stride;
    let mut predecessors: Vec<Vec<u32>> = vec![Vec::new(); n];
    for (i, &target) in next.iter().enumerate() {
        predecessors[target as usize].push((i / stride) as u32);
    }

    let mut live = bitvec![0; n];
    let mut stack = Vec::new();

    for state in 0..n {
        if is_final(state) {
            live.set(state, true);
            stack.push(state);
        }
    }

    while let Some(state) = stack.pop() {
        for &p in &predecessors[state] {
            if !live[p as usize] {
                live.set(p as usize, true);
                stack.push(p as usize);
            }
        }
    }

    live
}
