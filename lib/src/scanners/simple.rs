use serde::{Deserialize, Serialize};

use crate::chars::{Char, ALPHABET_SIZE};
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::{Dfa, Fsm, DEAD};
use crate::scanners::persist::Persist;
use crate::scanners::{FromFsm, Scanner, ScannerKind};

/// A single-pattern scanner with a plain transition table.
///
/// Rows have a column for every byte and anchor, so stepping doesn't need
/// to look up letter classes. This makes the table larger than the one of
/// a [`crate::RelocScanner`], and rules out gluing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimpleScanner {
    table: Vec<u32>,
    finals: Vec<bool>,
    initial: u32,
}

impl Default for SimpleScanner {
    /// A scanner that matches nothing.
    fn default() -> Self {
        Self {
            table: vec![DEAD; ALPHABET_SIZE],
            finals: vec![false],
            initial: DEAD,
        }
    }
}

impl FromFsm for SimpleScanner {
    fn from_fsm_with(fsm: &Fsm, config: &CompileConfig) -> Result<Self, Error> {
        let dfa = Dfa::from_fsm(fsm, config)?;
        let mut table = Vec::with_capacity(dfa.size() * ALPHABET_SIZE);
        for state in 0..dfa.size() as u32 {
            table.extend(
                (0..ALPHABET_SIZE as Char).map(|c| dfa.next_state(state, c)),
            );
        }
        Ok(Self {
            table,
            finals: (0..dfa.size() as u32).map(|s| dfa.is_final(s)).collect(),
            initial: dfa.initial,
        })
    }
}

impl Scanner for SimpleScanner {
    type State = u32;

    fn initial_state(&self) -> u32 {
        self.initial
    }

    #[inline(always)]
    fn step(&self, state: &mut u32, symbol: Char) {
        *state = self.table[*state as usize * ALPHABET_SIZE + symbol as usize];
    }

    fn is_final(&self, state: &u32) -> bool {
        self.finals[*state as usize]
    }

    fn is_dead(&self, state: &u32) -> bool {
        *state == DEAD
    }

    fn size(&self) -> usize {
        self.finals.len()
    }

    fn is_empty(&self) -> bool {
        self.initial == DEAD
    }

    fn regexps_count(&self) -> usize {
        1
    }
}

impl Persist for SimpleScanner {
    const KIND: ScannerKind = ScannerKind::Simple;

    fn validate(&self) -> Result<(), DataFormatError> {
        let states = self.finals.len();
        if states == 0 || self.table.len() != states * ALPHABET_SIZE {
            return Err(DataFormatError::Inconsistent("wrong table size"));
        }
        if self.initial as usize >= states
            || self.table.iter().any(|&t| t as usize >= states)
        {
            return Err(DataFormatError::Inconsistent("invalid transition"));
        }
        Ok(())
    }
}
