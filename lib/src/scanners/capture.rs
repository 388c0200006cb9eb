/*! Scanner that reports the boundaries of a capturing group.

The automaton is determinized keeping track of *threads*: an NFA state
together with the registers holding the positions where the group was
opened and closed. A state of the deterministic automaton is a set of
threads, at most one per NFA state, and each transition carries a short
list of register operations that tells how to compute the new registers
from the old ones.

Registers in every state are numbered by age, register 0 holds the
oldest position. Operations only keep a subset of the old registers, in
order, and optionally append the current position, so they can be
applied in place.

When two threads reach the same NFA state, the one that opened the group
earlier wins, and among those the one that closed it later. Positions
count every symbol fed to the scanner, anchors included.
*/

use std::cmp::Reverse;
use std::collections::BTreeSet;
#[cfg(feature = "logging")]
use std::time::Instant;

use bitvec::prelude::*;
#[cfg(feature = "logging")]
use log::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::chars::{is_anchor, Char};
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::{intern, Fsm, Letters, Tag, DEAD};
use crate::scanners::persist::Persist;
use crate::scanners::{FromFsm, Scanner, ScannerKind, State};

/// Register operation meaning "the current position".
const NOW: u16 = u16::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Thread {
    state: u32,
    open: Option<u16>,
    close: Option<u16>,
}

impl Thread {
    /// Lower is better.
    fn rank(&self) -> (bool, Option<u16>, Reverse<Option<u16>>) {
        (self.open.is_none(), self.open, Reverse(self.close))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct Transition {
    target: u32,
    ops: u32,
}

/// A scanner that tracks the position of a capturing group.
///
/// It's built from an automaton where [`Fsm::capture`] was called,
/// usually through [`crate::Lexer::add_capturing`].
///
/// ```
/// # use pire::{CapturingScanner, Lexer, Scanner};
/// let mut lexer = Lexer::new("google_id\\s*=\\s*'([^']*)'");
/// lexer.add_capturing(1);
/// let scanner: CapturingScanner =
///     lexer.parse().unwrap().surrounded().compile().unwrap();
///
/// let mut state = scanner.init_state();
/// state.begin().run("google_id = 'abcde';").end();
/// assert_eq!(state.captured(), Some((14, 19)));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapturingScanner {
    letters: Letters,
    stride: usize,
    next: Vec<Transition>,
    /// Interned register operations, list 0 is always empty.
    ops: Vec<Vec<u16>>,
    /// Number of registers of each state.
    registers: Vec<u16>,
    /// For final states, the registers with the group boundaries.
    captures: Vec<Option<(Option<u16>, Option<u16>)>>,
    initial: u32,
}

/// State of a [`CapturingScanner`].
#[derive(Clone, Debug)]
pub struct CaptureState {
    state: u32,
    position: usize,
    registers: SmallVec<[usize; 4]>,
}

impl Default for CapturingScanner {
    /// A scanner that matches nothing.
    fn default() -> Self {
        Self {
            letters: Letters::single(),
            stride: 1,
            next: vec![Transition { target: DEAD, ops: 0 }],
            ops: vec![Vec::new()],
            registers: vec![0],
            captures: vec![None],
            initial: DEAD,
        }
    }
}

/// Determinization with threads.
struct Builder<'a> {
    fsm: &'a Fsm,
    /// NFA states from where a final state can be reached.
    useful: BitVec,
}

impl<'a> Builder<'a> {
    fn new(fsm: &'a Fsm) -> Self {
        let nodes = fsm.nodes();
        let mut predecessors = vec![Vec::new(); nodes.len()];
        for (from, node) in nodes.iter().enumerate() {
            for to in node.edges.values().flatten() {
                predecessors[*to].push(from);
            }
        }
        let mut useful = bitvec![0; nodes.len()];
        let mut stack = fsm.finals();
        for &state in &stack {
            useful.set(state, true);
        }
        while let Some(state) = stack.pop() {
            for &p in &predecessors[state] {
                if !useful[p] {
                    useful.set(p, true);
                    stack.push(p);
                }
            }
        }
        Self { fsm, useful }
    }

    /// Closes `seeds` under empty transitions. Seeds flagged with `false`
    /// are kept as they are, without following their empty transitions.
    /// Returns the surviving threads and the operations that compute their
    /// registers.
    ///
    /// The best thread in each NFA state survives, but the empty
    /// transitions of a state are followed whenever some expanding thread
    /// reaches it, using the best of those threads.
    fn close(&self, seeds: &[(Thread, bool)]) -> (Vec<Thread>, Vec<u16>) {
        let mut best: FxHashMap<u32, Thread> = FxHashMap::default();
        let mut expanded: FxHashMap<u32, Thread> = FxHashMap::default();
        let mut stack = Vec::new();

        let mut offer = |thread: Thread, stack: &mut Vec<Thread>, expand| {
            let improves = |map: &FxHashMap<u32, Thread>| {
                map.get(&thread.state)
                    .map_or(true, |current| thread.rank() < current.rank())
            };
            if improves(&best) {
                best.insert(thread.state, thread);
            }
            if expand && improves(&expanded) {
                expanded.insert(thread.state, thread);
                stack.push(thread);
            }
        };

        for &(thread, expand) in seeds {
            offer(thread, &mut stack, expand);
        }

        while let Some(thread) = stack.pop() {
            let node = &self.fsm.nodes()[thread.state as usize];
            for target in node.epsilon_targets() {
                let state = target as u32;
                let next = match node.tags.get(&target) {
                    Some(Tag::Open) => {
                        Thread { state, open: Some(NOW), close: None }
                    }
                    Some(Tag::Close) => {
                        Thread { state, close: Some(NOW), ..thread }
                    }
                    None => Thread { state, ..thread },
                };
                offer(next, &mut stack, true);
            }
        }

        let mut threads: Vec<Thread> = best
            .into_values()
            .filter(|thread| self.useful[thread.state as usize])
            .collect();
        threads.sort_unstable_by_key(|thread| thread.state);

        // Renumber the registers by age. Sources are either old registers
        // or NOW, which is the newest and sorts last.
        let sources: Vec<u16> = threads
            .iter()
            .flat_map(|thread| thread.open.into_iter().chain(thread.close))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let renumber = |reg: Option<u16>| {
            reg.map(|reg| sources.partition_point(|&s| s < reg) as u16)
        };

        for thread in threads.iter_mut() {
            thread.open = renumber(thread.open);
            thread.close = renumber(thread.close);
        }

        (threads, sources)
    }

    fn capture(
        &self,
        threads: &[Thread],
    ) -> Option<(Option<u16>, Option<u16>)> {
        threads
            .iter()
            .filter(|thread| self.fsm.is_final(thread.state as usize))
            .min_by_key(|thread| thread.rank())
            .map(|thread| (thread.open, thread.close))
    }
}

impl FromFsm for CapturingScanner {
    fn from_fsm_with(fsm: &Fsm, config: &CompileConfig) -> Result<Self, Error> {
        #[cfg(feature = "logging")]
        let start = Instant::now();

        let builder = Builder::new(fsm);
        let letters = Letters::for_fsm(fsm);
        let representatives = letters.representatives();

        let mut ids: FxHashMap<Vec<Thread>, u32> = FxHashMap::default();
        let mut states: Vec<Vec<Thread>> = Vec::new();
        let mut op_ids: FxHashMap<Vec<u16>, u32> = FxHashMap::default();
        let mut ops: Vec<Vec<u16>> = Vec::new();

        intern(&mut ids, &mut states, Vec::new(), config.max_states)?;
        intern(&mut op_ids, &mut ops, Vec::new(), usize::MAX)?;

        let initial_thread =
            Thread { state: fsm.initial() as u32, open: None, close: None };
        let (initial_threads, _) = builder.close(&[(initial_thread, true)]);
        let initial =
            intern(&mut ids, &mut states, initial_threads, config.max_states)?;

        let mut next = Vec::new();
        let mut seeds = Vec::new();
        let mut i = 0;

        while i < states.len() {
            let current = states[i].clone();
            for &symbol in &representatives {
                seeds.clear();
                for thread in &current {
                    let node = &fsm.nodes()[thread.state as usize];
                    match node.edges.get(&symbol) {
                        Some(targets) => seeds.extend(targets.iter().map(|&t| {
                            (Thread { state: t as u32, ..*thread }, true)
                        })),
                        None if is_anchor(symbol) => {
                            seeds.push((*thread, false))
                        }
                        None => {}
                    }
                }
                let (threads, sources) = builder.close(&seeds);
                let target =
                    intern(&mut ids, &mut states, threads, config.max_states)?;
                let op_list =
                    intern(&mut op_ids, &mut ops, sources, usize::MAX)?;
                next.push(Transition { target, ops: op_list });
            }
            i += 1;
        }

        let registers = states
            .iter()
            .map(|threads| {
                threads
                    .iter()
                    .flat_map(|t| t.open.into_iter().chain(t.close))
                    .max()
                    .map_or(0, |reg| reg + 1)
            })
            .collect();

        let captures =
            states.iter().map(|threads| builder.capture(threads)).collect();

        #[cfg(feature = "logging")]
        info!(
            "Capturing scanner built in {:?}: {} states, {} operation lists",
            Instant::elapsed(&start),
            states.len(),
            ops.len()
        );

        Ok(Self {
            stride: letters.count(),
            letters,
            next,
            ops,
            registers,
            captures,
            initial,
        })
    }
}

impl Scanner for CapturingScanner {
    type State = CaptureState;

    fn initial_state(&self) -> CaptureState {
        CaptureState {
            state: self.initial,
            position: 0,
            registers: SmallVec::from_elem(
                0,
                self.registers[self.initial as usize] as usize,
            ),
        }
    }

    fn step(&self, state: &mut CaptureState, symbol: Char) {
        state.position += 1;
        let transition = self.next
            [state.state as usize * self.stride + self.letters.class(symbol)];
        let ops = &self.ops[transition.ops as usize];
        let registers = &mut state.registers;
        for (j, &source) in ops.iter().enumerate() {
            let value = if source == NOW {
                state.position
            } else {
                registers[source as usize]
            };
            if j < registers.len() {
                registers[j] = value;
            } else {
                registers.push(value);
            }
        }
        registers.truncate(ops.len());
        state.state = transition.target;
    }

    fn is_final(&self, state: &CaptureState) -> bool {
        self.captures[state.state as usize].is_some()
    }

    fn is_dead(&self, state: &CaptureState) -> bool {
        state.state == DEAD
    }

    fn size(&self) -> usize {
        self.captures.len()
    }

    fn is_empty(&self) -> bool {
        self.initial == DEAD
    }

    fn regexps_count(&self) -> usize {
        1
    }
}

impl<'s> State<'s, CapturingScanner> {
    /// Returns the boundaries of the capturing group, if the state accepts
    /// and the group matched. Boundaries are positions in the sequence of
    /// symbols fed to the state: when the caller feeds the begin anchor,
    /// they are text offsets plus one.
    pub fn captured(&self) -> Option<(usize, usize)> {
        let inner = self.inner();
        match self.scanner().captures[inner.state as usize] {
            Some((Some(open), Some(close))) => Some((
                inner.registers[open as usize],
                inner.registers[close as usize],
            )),
            _ => None,
        }
    }
}

impl Persist for CapturingScanner {
    const KIND: ScannerKind = ScannerKind::Capturing;

    fn validate(&self) -> Result<(), DataFormatError> {
        let states = self.captures.len();
        if !self.letters.is_valid() || self.stride != self.letters.count() {
            return Err(DataFormatError::Inconsistent("invalid letter classes"));
        }
        if states == 0
            || self.registers.len() != states
            || self.next.len() != states * self.stride
            || self.initial as usize >= states
        {
            return Err(DataFormatError::Inconsistent("wrong table size"));
        }
        if self.ops.first().map_or(true, |ops| !ops.is_empty()) {
            return Err(DataFormatError::Inconsistent("invalid operations"));
        }
        for (i, transition) in self.next.iter().enumerate() {
            let from = self.registers[i / self.stride];
            let target = transition.target as usize;
            let ops = self
                .ops
                .get(transition.ops as usize)
                .filter(|_| target < states)
                .ok_or(DataFormatError::Inconsistent("invalid transition"))?;
            // Sources must be strictly increasing old registers, optionally
            // followed by NOW.
            let valid = ops.len() == self.registers[target] as usize
                && ops.windows(2).all(|w| w[0] < w[1])
                && ops.iter().all(|&s| s == NOW || s < from);
            if !valid {
                return Err(DataFormatError::Inconsistent("invalid operations"));
            }
        }
        for (capture, &registers) in self.captures.iter().zip(&self.registers) {
            if let Some((open, close)) = capture {
                if open.iter().chain(close).any(|&r| r >= registers) {
                    return Err(DataFormatError::Inconsistent(
                        "invalid capture registers",
                    ));
                }
            }
        }
        Ok(())
    }
}
