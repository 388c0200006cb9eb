use bitvec::prelude::*;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::chars::{is_anchor, Char, ALPHABET_SIZE, EPSILON};
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::Fsm;
use crate::scanners::persist::Persist;
use crate::scanners::{FromFsm, Scanner, ScannerKind};

/// Transitions of a state on the symbols `lo..=hi`. Targets are closed
/// under empty transitions.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Move {
    lo: Char,
    hi: Char,
    targets: Vec<u32>,
}

/// A scanner that simulates the non-deterministic automaton directly.
///
/// Building it is cheap and it never blows up in size, no matter how
/// complex the pattern is, but each step costs time proportional to the
/// number of active states.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlowScanner {
    /// Moves of each state, sorted by symbol and non-overlapping.
    moves: Vec<Vec<Move>>,
    finals: Vec<bool>,
    initial: Vec<u32>,
    empty: bool,
}

impl Default for SlowScanner {
    /// A scanner without states, it matches nothing.
    fn default() -> Self {
        Self {
            moves: Vec::new(),
            finals: Vec::new(),
            initial: Vec::new(),
            empty: true,
        }
    }
}

/// Set of active states of a [`SlowScanner`].
#[derive(Clone, Debug)]
pub struct SlowState {
    current: Vec<u32>,
    next: Vec<u32>,
    seen: BitVec,
}

impl FromFsm for SlowScanner {
    fn from_fsm_with(fsm: &Fsm, _: &CompileConfig) -> Result<Self, Error> {
        let nodes = fsm.nodes();
        let closures: Vec<Vec<u32>> =
            (0..nodes.len()).map(|state| closure(fsm, state)).collect();

        // Consecutive symbols with the same targets share a move. Anchors
        // never share a move with bytes.
        let moves = nodes
            .iter()
            .map(|node| {
                node.edges
                    .iter()
                    .filter(|(&symbol, _)| symbol != EPSILON)
                    .map(|(&symbol, targets)| {
                        let mut targets: Vec<u32> = targets
                            .iter()
                            .flat_map(|&t| closures[t].iter().copied())
                            .collect();
                        targets.sort_unstable();
                        targets.dedup();
                        Move { lo: symbol, hi: symbol, targets }
                    })
                    .coalesce(|a, b| {
                        if a.hi + 1 == b.lo
                            && a.targets == b.targets
                            && is_anchor(a.hi) == is_anchor(b.lo)
                        {
                            Ok(Move { hi: b.hi, ..a })
                        } else {
                            Err((a, b))
                        }
                    })
                    .collect()
            })
            .collect();

        let finals: Vec<bool> =
            nodes.iter().map(|node| node.accepting).collect();
        let initial = closures[fsm.initial()].clone();

        let mut scanner = Self { moves, finals, initial, empty: true };
        scanner.empty = !scanner.can_accept();
        Ok(scanner)
    }
}

impl SlowScanner {
    /// Returns true if some final state is reachable from the initial
    /// states.
    fn can_accept(&self) -> bool {
        let mut seen = bitvec![0; self.finals.len()];
        let mut stack = self.initial.clone();
        for &state in &stack {
            seen.set(state as usize, true);
        }
        while let Some(state) = stack.pop() {
            if self.finals[state as usize] {
                return true;
            }
            for target in self.moves[state as usize]
                .iter()
                .flat_map(|m| m.targets.iter())
            {
                if !seen[*target as usize] {
                    seen.set(*target as usize, true);
                    stack.push(*target);
                }
            }
        }
        false
    }

    fn find_move(&self, state: u32, symbol: Char) -> Option<&Move> {
        let moves = &self.moves[state as usize];
        let i = moves.partition_point(|m| m.hi < symbol);
        moves.get(i).filter(|m| m.lo <= symbol)
    }
}

/// States reachable from `state` through empty transitions, sorted.
fn closure(fsm: &Fsm, state: usize) -> Vec<u32> {
    let mut seen = bitvec![0; fsm.size()];
    let mut stack = vec![state];
    seen.set(state, true);
    let mut result = Vec::new();
    while let Some(s) = stack.pop() {
        result.push(s as u32);
        for target in fsm.nodes()[s].epsilon_targets() {
            if !seen[target] {
                seen.set(target, true);
                stack.push(target);
            }
        }
    }
    result.sort_unstable();
    result
}

impl Scanner for SlowScanner {
    type State = SlowState;

    fn initial_state(&self) -> SlowState {
        SlowState {
            current: self.initial.clone(),
            next: Vec::with_capacity(self.initial.len()),
            seen: bitvec![0; self.finals.len()],
        }
    }

    fn step(&self, state: &mut SlowState, symbol: Char) {
        let SlowState { current, next, seen } = state;
        next.clear();
        for &s in current.iter() {
            match self.find_move(s, symbol) {
                Some(m) => {
                    for &t in &m.targets {
                        if !seen[t as usize] {
                            seen.set(t as usize, true);
                            next.push(t);
                        }
                    }
                }
                // States without a transition on an anchor stay where they
                // are.
                None if is_anchor(symbol) => {
                    if !seen[s as usize] {
                        seen.set(s as usize, true);
                        next.push(s);
                    }
                }
                None => {}
            }
        }
        for &t in next.iter() {
            seen.set(t as usize, false);
        }
        std::mem::swap(current, next);
    }

    fn is_final(&self, state: &SlowState) -> bool {
        state.current.iter().any(|&s| self.finals[s as usize])
    }

    fn is_dead(&self, state: &SlowState) -> bool {
        state.current.is_empty()
    }

    fn size(&self) -> usize {
        self.finals.len()
    }

    fn is_empty(&self) -> bool {
        self.empty
    }

    fn regexps_count(&self) -> usize {
        1
    }
}

impl Persist for SlowScanner {
    const KIND: ScannerKind = ScannerKind::Slow;

    fn validate(&self) -> Result<(), DataFormatError> {
        let states = self.finals.len();
        if self.moves.len() != states {
            return Err(DataFormatError::Inconsistent("wrong number of states"));
        }
        let valid = |targets: &[u32]| {
            targets.iter().all(|&t| (t as usize) < states)
        };
        if !valid(&self.initial) {
            return Err(DataFormatError::Inconsistent("invalid initial state"));
        }
        for moves in &self.moves {
            let mut previous: Option<Char> = None;
            for m in moves {
                if m.lo > m.hi
                    || m.hi as usize >= ALPHABET_SIZE
                    || previous.is_some_and(|p| p >= m.lo)
                    || !valid(&m.targets)
                {
                    return Err(DataFormatError::Inconsistent("invalid move"));
                }
                previous = Some(m.hi);
            }
        }
        Ok(())
    }
}
