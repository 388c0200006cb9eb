/*! Compact transition tables.

A [`TableScanner`] stores one 32-bit word per transition. The word tells
where the transition goes, and it comes in two flavours depending on the
[`Layout`]:

* Relocatable layouts store the index of the target state. Stepping needs
  a multiplication by the number of letter classes to find the row.
* Non-relocatable layouts store the offset of the target row within the
  table, so stepping is a single addition.

Masked layouts use the 8 most significant bits of each word for the set of
patterns accepted by the target state, which leaves 24 bits for the index.
No-mask layouts use the whole word for the index and keep the accepted
patterns of each state in a separate table, so they can hold much larger
automata at the cost of an extra lookup in `is_final`. Either way a scanner
recognizes at most 8 patterns.

State 0 is the dead state in every layout, so a word is dead when its
index bits are zero.
*/

use std::fmt::Debug;
use std::marker::PhantomData;
#[cfg(feature = "logging")]
use std::time::Instant;

#[cfg(feature = "logging")]
use log::*;
use serde::{Deserialize, Serialize};

use crate::chars::Char;
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::{Dfa, Fsm, Letters, DEAD};
use crate::scanners::persist::Persist;
use crate::scanners::{FromFsm, Glue, MultiScanner, Scanner, ScannerKind};

mod private {
    pub trait Sealed {}
}

/// Describes how a [`TableScanner`] encodes its transitions.
pub trait Layout:
    private::Sealed + Clone + Debug + Default + Send + Sync + 'static
{
    /// Accepted patterns are packed in the transition words.
    const MASKED: bool;
    /// Transition words hold state indexes instead of row offsets.
    const RELOCATABLE: bool;
    /// Kind written in saved scanners.
    const KIND: ScannerKind;
}

/// State indexes, accept mask packed in each word.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reloc;

/// State indexes, accept masks in a side table.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelocNoMask;

/// Row offsets, accept mask packed in each word.
#[derive(Clone, Copy, Debug, Default)]
pub struct Nonreloc;

/// Row offsets, accept masks in a side table.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonrelocNoMask;

macro_rules! layout {
    ($name:ident, $masked:expr, $relocatable:expr, $kind:expr) => {
        impl private::Sealed for $name {}
        impl Layout for $name {
            const MASKED: bool = $masked;
            const RELOCATABLE: bool = $relocatable;
            const KIND: ScannerKind = $kind;
        }
    };
}

layout!(Reloc, true, true, ScannerKind::Reloc);
layout!(RelocNoMask, false, true, ScannerKind::RelocNoMask);
layout!(Nonreloc, true, false, ScannerKind::Nonreloc);
layout!(NonrelocNoMask, false, false, ScannerKind::NonrelocNoMask);

/// The default scanner.
pub type RelocScanner = TableScanner<Reloc>;
pub type RelocScannerNoMask = TableScanner<RelocNoMask>;
pub type NonrelocScanner = TableScanner<Nonreloc>;
pub type NonrelocScannerNoMask = TableScanner<NonrelocNoMask>;

const MASK_SHIFT: u32 = 24;
const MASKED_INDEX_BITS: u32 = (1 << MASK_SHIFT) - 1;

/// A multi-pattern scanner backed by a compact transition table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TableScanner<L: Layout> {
    letters: Letters,
    /// Number of letter classes, the length of each row.
    stride: usize,
    table: Vec<u32>,
    /// Word of the initial state.
    initial: u32,
    /// Accept mask of each state, only used by no-mask layouts.
    masks: Vec<u8>,
    /// Accepted patterns of state `s` are
    /// `accept_list[accept_offsets[s]..accept_offsets[s + 1]]`.
    accept_offsets: Vec<u32>,
    accept_list: Vec<u32>,
    regexps: usize,
    #[serde(skip)]
    layout: PhantomData<L>,
}

impl<L: Layout> TableScanner<L> {
    /// Maximum number of patterns a scanner can recognize.
    pub const MAX_REGEXPS: usize = u8::BITS as usize;

    const INDEX_BITS: u32 =
        if L::MASKED { MASKED_INDEX_BITS } else { u32::MAX };

    /// Packs a deterministic automaton. State `DEAD` of the automaton must
    /// be its dead state.
    fn from_dfa(dfa: &Dfa, regexps: usize) -> Result<Self, Error> {
        if regexps > Self::MAX_REGEXPS {
            return Err(Error::Overflow(format!(
                "this scanner can't recognize more than {} patterns",
                Self::MAX_REGEXPS
            )));
        }

        let stride = dfa.stride();
        let size = dfa.size();
        let largest = if L::RELOCATABLE {
            (size - 1) as u64
        } else {
            ((size - 1) * stride) as u64
        };

        if largest > Self::INDEX_BITS as u64 {
            return Err(Error::Overflow(format!(
                "{} states don't fit in this scanner",
                size
            )));
        }

        let masks: Vec<u8> = dfa
            .accepts
            .iter()
            .map(|accepts| accepts.iter().fold(0, |mask, &r| mask | (1 << r)))
            .collect();

        let word = |state: u32| -> u32 {
            let index = if L::RELOCATABLE {
                state
            } else {
                state * stride as u32
            };
            if L::MASKED {
                index | (masks[state as usize] as u32) << MASK_SHIFT
            } else {
                index
            }
        };

        let mut accept_offsets = Vec::with_capacity(size + 1);
        let mut accept_list = Vec::new();
        accept_offsets.push(0);
        for accepts in &dfa.accepts {
            accept_list.extend_from_slice(accepts);
            accept_offsets.push(accept_list.len() as u32);
        }

        Ok(Self {
            letters: dfa.letters.clone(),
            stride,
            table: dfa.next.iter().map(|&target| word(target)).collect(),
            initial: word(dfa.initial),
            masks: if L::MASKED { Vec::new() } else { masks },
            accept_offsets,
            accept_list,
            regexps,
            layout: PhantomData,
        })
    }

    /// Unpacks the table into a deterministic automaton.
    fn to_dfa(&self) -> Dfa {
        Dfa {
            letters: self.letters.clone(),
            next: self
                .table
                .iter()
                .map(|&word| self.state_index(word))
                .collect(),
            accepts: (0..self.states())
                .map(|state| self.accepted(state as u32).to_vec())
                .collect(),
            initial: self.state_index(self.initial),
        }
    }

    #[inline]
    fn states(&self) -> usize {
        self.accept_offsets.len() - 1
    }

    #[inline(always)]
    fn state_index(&self, word: u32) -> u32 {
        let index = word & Self::INDEX_BITS;
        if L::RELOCATABLE {
            index
        } else {
            index / self.stride as u32
        }
    }

    #[inline(always)]
    fn row(&self, word: u32) -> usize {
        let index = (word & Self::INDEX_BITS) as usize;
        if L::RELOCATABLE {
            index * self.stride
        } else {
            index
        }
    }

    #[inline]
    fn accepted(&self, state: u32) -> &[u32] {
        let state = state as usize;
        let start = self.accept_offsets[state] as usize;
        let end = self.accept_offsets[state + 1] as usize;
        &self.accept_list[start..end]
    }
}

impl<L: Layout> Default for TableScanner<L> {
    /// Creates an empty scanner: it has a single state, the dead one, and
    /// recognizes no patterns.
    fn default() -> Self {
        let mut scanner = Self {
            letters: Letters::single(),
            stride: 1,
            table: vec![DEAD],
            initial: DEAD,
            masks: Vec::new(),
            accept_offsets: vec![0, 0],
            accept_list: Vec::new(),
            regexps: 0,
            layout: PhantomData,
        };
        if !L::MASKED {
            scanner.masks.push(0);
        }
        scanner
    }
}

impl<L: Layout> Scanner for TableScanner<L> {
    type State = u32;

    #[inline]
    fn initial_state(&self) -> u32 {
        self.initial
    }

    #[inline(always)]
    fn step(&self, state: &mut u32, symbol: Char) {
        *state = self.table[self.row(*state) + self.letters.class(symbol)];
    }

    fn run(&self, state: &mut u32, text: &[u8]) {
        let mut current = *state;
        for &byte in text {
            let class = self.letters.class(byte as Char);
            current = self.table[self.row(current) + class];
            if current & Self::INDEX_BITS == DEAD {
                break;
            }
        }
        *state = current;
    }

    #[inline]
    fn is_final(&self, state: &u32) -> bool {
        if L::MASKED {
            *state >> MASK_SHIFT != 0
        } else {
            self.masks[self.state_index(*state) as usize] != 0
        }
    }

    #[inline]
    fn is_dead(&self, state: &u32) -> bool {
        *state & Self::INDEX_BITS == DEAD
    }

    fn size(&self) -> usize {
        self.states()
    }

    fn is_empty(&self) -> bool {
        self.is_dead(&self.initial)
    }

    fn regexps_count(&self) -> usize {
        self.regexps
    }
}

impl<L: Layout> MultiScanner for TableScanner<L> {
    fn accepted_regexps<'a>(&'a self, state: &u32) -> &'a [u32] {
        self.accepted(self.state_index(*state))
    }
}

impl<L: Layout> FromFsm for TableScanner<L> {
    fn from_fsm_with(fsm: &Fsm, config: &CompileConfig) -> Result<Self, Error> {
        Self::from_dfa(&Dfa::from_fsm(fsm, config)?, 1)
    }
}

impl<L: Layout> Glue for TableScanner<L> {
    fn glued_with_config(
        &self,
        other: &Self,
        config: &CompileConfig,
    ) -> Result<Self, Error> {
        let regexps = self.regexps + other.regexps;
        if regexps > Self::MAX_REGEXPS {
            return Err(Error::Overflow(format!(
                "can't glue {} patterns, this scanner supports up to {}",
                regexps,
                Self::MAX_REGEXPS
            )));
        }

        #[cfg(feature = "logging")]
        let start = Instant::now();

        let offset = self.regexps as u32;
        let mut dfa = Dfa::product(
            &self.to_dfa(),
            &other.to_dfa(),
            config.max_states,
            |a, b| {
                a.iter().copied().chain(b.iter().map(|r| r + offset)).collect()
            },
        )?;

        if config.minimize {
            dfa = dfa.minimize();
        }

        let glued = Self::from_dfa(&dfa.compact_letters(), regexps)?;

        #[cfg(feature = "logging")]
        info!(
            "Glue time: {:?} ({} + {} states into {})",
            Instant::elapsed(&start),
            self.size(),
            other.size(),
            glued.size()
        );

        Ok(glued)
    }
}

impl<L: Layout> Persist for TableScanner<L> {
    const KIND: ScannerKind = L::KIND;

    fn validate(&self) -> Result<(), DataFormatError> {
        let states = self
            .accept_offsets
            .len()
            .checked_sub(1)
            .filter(|&states| states > 0)
            .ok_or(DataFormatError::Inconsistent("scanner without states"))?;

        if !self.letters.is_valid() || self.stride != self.letters.count() {
            return Err(DataFormatError::Inconsistent("invalid letter classes"));
        }
        if self.table.len() != states * self.stride {
            return Err(DataFormatError::Inconsistent("wrong table size"));
        }
        if !L::MASKED && self.masks.len() != states {
            return Err(DataFormatError::Inconsistent("wrong mask table size"));
        }
        if self.regexps > Self::MAX_REGEXPS {
            return Err(DataFormatError::Inconsistent("too many patterns"));
        }
        if self.accept_offsets[0] != 0
            || self.accept_offsets.windows(2).any(|w| w[0] > w[1])
            || self.accept_offsets[states] as usize != self.accept_list.len()
            || self.accept_list.iter().any(|&r| r as usize >= self.regexps)
        {
            return Err(DataFormatError::Inconsistent("invalid accept lists"));
        }

        let valid_word = |word: u32| {
            let index = (word & Self::INDEX_BITS) as usize;
            if L::RELOCATABLE {
                index < states
            } else {
                index % self.stride == 0 && index / self.stride < states
            }
        };

        if !valid_word(self.initial)
            || !self.table.iter().all(|&w| valid_word(w))
        {
            return Err(DataFormatError::Inconsistent("invalid transition"));
        }

        Ok(())
    }
}
