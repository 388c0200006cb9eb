/*! Scanner that counts the tokens matching a pattern.

Given a pattern `re` and a separator `sep`, the scanner walks the text as
a sequence of `sep re sep re ...` chunks and counts the occurrences of
`re` that are followed either by the next separator or by the end of the
text. Separators never contain an occurrence of the pattern themselves,
so occurrences are maximal.

The automaton behind the scanner recognizes `(sep & ~(.*re.*)) re`. When
it can't go any further it restarts from its initial state, counting one
occurrence if it was in a final state and the restart succeeds. The end
anchor counts the pending occurrence, if any, and goes back to the
initial state.

Counting scanners can be glued, each of the original scanners keeps its
own counter.
*/

#[cfg(feature = "logging")]
use std::time::Instant;

#[cfg(feature = "logging")]
use log::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::chars::{Char, END_MARK};
use crate::config::CompileConfig;
use crate::errors::{DataFormatError, Error};
use crate::fsm::{intern, Dfa, Fsm, Letters, DEAD};
use crate::scanners::persist::Persist;
use crate::scanners::{Glue, Scanner, ScannerKind, State};

/// Maximum number of counters in a scanner, one per glued pattern.
const MAX_COUNTERS: usize = u64::BITS as usize;

/// A scanner that counts the occurrences of patterns.
///
/// ```
/// # use pire::{CountingScanner, Lexer, Scanner};
/// let scanner = CountingScanner::new(
///     &Lexer::new("[a-z]+").parse().unwrap(),
///     &Lexer::new("\\s").parse().unwrap(),
/// )
/// .unwrap();
///
/// let mut state = scanner.init_state();
/// state.begin().run("abc def, abc def ghi, abc").end();
/// assert_eq!(state.result(0), 3);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CountingScanner {
    letters: Letters,
    stride: usize,
    next: Vec<u32>,
    /// Counters incremented by each transition, as a bit mask.
    actions: Vec<u64>,
    finals: Vec<bool>,
    initial: u32,
    counters: usize,
}

/// State of a [`CountingScanner`].
#[derive(Clone, Debug)]
pub struct CountState {
    state: u32,
    counters: SmallVec<[usize; 4]>,
}

/// Builds a [`CountingScanner`] from its parts.
///
/// Both the pattern and the separator are required.
#[derive(Debug, Default)]
pub struct CountingScannerBuilder {
    pattern: Option<Fsm>,
    separator: Option<Fsm>,
    config: CompileConfig,
}

impl CountingScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Automaton that recognizes the tokens to count.
    pub fn pattern(mut self, pattern: Fsm) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Automaton that recognizes what separates tokens.
    pub fn separator(mut self, separator: Fsm) -> Self {
        self.separator = Some(separator);
        self
    }

    pub fn config(mut self, config: CompileConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the scanner. Fails with [`Error::InvalidInput`] if the
    /// pattern or the separator are missing.
    pub fn build(self) -> Result<CountingScanner, Error> {
        match (self.pattern, self.separator) {
            (Some(pattern), Some(separator)) => {
                CountingScanner::with_config(&pattern, &separator, &self.config)
            }
            (None, _) => Err(Error::InvalidInput(
                "a counting scanner requires a pattern".to_string(),
            )),
            (_, None) => Err(Error::InvalidInput(
                "a counting scanner requires a separator".to_string(),
            )),
        }
    }
}

impl Default for CountingScanner {
    /// A scanner without counters.
    fn default() -> Self {
        Self {
            letters: Letters::single(),
            stride: 1,
            next: vec![DEAD],
            actions: vec![0],
            finals: vec![false],
            initial: DEAD,
            counters: 0,
        }
    }
}

impl CountingScanner {
    /// Creates a scanner that counts the occurrences of `pattern` separated
    /// by `separator`.
    pub fn new(pattern: &Fsm, separator: &Fsm) -> Result<Self, Error> {
        Self::with_config(pattern, separator, &CompileConfig::default())
    }

    pub fn builder() -> CountingScannerBuilder {
        CountingScannerBuilder::new()
    }

    /// Same as [`CountingScanner::new`], with explicit limits.
    pub fn with_config(
        pattern: &Fsm,
        separator: &Fsm,
        config: &CompileConfig,
    ) -> Result<Self, Error> {
        let mut tokens = separator.clone();
        tokens.and_not_with(&pattern.surrounded(), config)?;
        tokens.append_fsm(pattern);

        let dfa = Dfa::from_fsm(&tokens, config)?;
        let (letters, origins) = dfa.letters.isolate(END_MARK);
        let old_stride = dfa.stride();
        let stride = letters.count();
        let end = letters.class(END_MARK);
        let init = dfa.initial as usize;

        let delta = |state: usize, class: usize| {
            dfa.next[state * old_stride + origins[class]]
        };

        let mut next = Vec::with_capacity(dfa.size() * stride);
        let mut actions = Vec::with_capacity(dfa.size() * stride);

        for state in 0..dfa.size() {
            for class in 0..stride {
                let target = delta(state, class);
                let (target, action) = if class == end {
                    (dfa.initial, dfa.is_final(target) as u64)
                } else if target != DEAD {
                    (target, 0)
                } else {
                    let restart = delta(init, class);
                    match (dfa.is_final(state as u32), restart != DEAD) {
                        (true, true) => (restart, 1),
                        (false, true) => (restart, 0),
                        (_, false) => (dfa.initial, 0),
                    }
                };
                next.push(target);
                actions.push(action);
            }
        }

        Ok(Self {
            letters,
            stride,
            next,
            actions,
            finals: (0..dfa.size() as u32).map(|s| dfa.is_final(s)).collect(),
            initial: dfa.initial,
            counters: 1,
        })
    }
}

impl Scanner for CountingScanner {
    type State = CountState;

    fn initial_state(&self) -> CountState {
        CountState {
            state: self.initial,
            counters: SmallVec::from_elem(0, self.counters),
        }
    }

    #[inline]
    fn step(&self, state: &mut CountState, symbol: Char) {
        let i = state.state as usize * self.stride + self.letters.class(symbol);
        let mut action = self.actions[i];
        while action != 0 {
            state.counters[action.trailing_zeros() as usize] += 1;
            action &= action - 1;
        }
        state.state = self.next[i];
    }

    fn is_final(&self, state: &CountState) -> bool {
        self.finals[state.state as usize]
    }

    /// Counting never stops, a state is never dead.
    fn is_dead(&self, _: &CountState) -> bool {
        false
    }

    fn size(&self) -> usize {
        self.finals.len()
    }

    fn is_empty(&self) -> bool {
        !self.finals.iter().any(|&f| f)
    }

    fn regexps_count(&self) -> usize {
        self.counters
    }
}

impl<'s> State<'s, CountingScanner> {
    /// Number of occurrences counted so far for the pattern with the given
    /// index. Unknown indexes count zero.
    pub fn result(&self, index: usize) -> usize {
        self.inner().counters.get(index).copied().unwrap_or(0)
    }

    /// Counters of every pattern.
    pub fn results(&self) -> &[usize] {
        &self.inner().counters
    }
}

impl Glue for CountingScanner {
    fn glued_with_config(
        &self,
        other: &Self,
        config: &CompileConfig,
    ) -> Result<Self, Error> {
        let counters = self.counters + other.counters;
        if counters > MAX_COUNTERS {
            return Err(Error::Overflow(format!(
                "can't glue {} counters, the limit is {}",
                counters, MAX_COUNTERS
            )));
        }

        #[cfg(feature = "logging")]
        let start = Instant::now();

        let (letters, pairs) = self.letters.refine(&other.letters);
        let shift = self.counters as u32;

        let mut ids: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        let mut states: Vec<(u32, u32)> = Vec::new();
        let initial = intern(
            &mut ids,
            &mut states,
            (self.initial, other.initial),
            config.max_states,
        )?;

        let mut next = Vec::new();
        let mut actions = Vec::new();
        let mut i = 0;

        while i < states.len() {
            let (p, q) = states[i];
            for &(class_a, class_b) in &pairs {
                let a = p as usize * self.stride + class_a;
                let b = q as usize * other.stride + class_b;
                let target = (self.next[a], other.next[b]);
                next.push(intern(
                    &mut ids,
                    &mut states,
                    target,
                    config.max_states,
                )?);
                actions.push(
                    self.actions[a]
                        | other.actions[b].checked_shl(shift).unwrap_or(0),
                );
            }
            i += 1;
        }

        let finals = states
            .iter()
            .map(|&(p, q)| self.finals[p as usize] || other.finals[q as usize])
            .collect();

        #[cfg(feature = "logging")]
        info!(
            "Glue time: {:?} ({} counters, {} states)",
            Instant::elapsed(&start),
            counters,
            states.len()
        );

        Ok(Self {
            stride: letters.count(),
            letters,
            next,
            actions,
            finals,
            initial,
            counters,
        })
    }
}

impl Persist for CountingScanner {
    const KIND: ScannerKind = ScannerKind::Counting;

    fn validate(&self) -> Result<(), DataFormatError> {
        let states = self.finals.len();
        if !self.letters.is_valid() || self.stride != self.letters.count() {
            return Err(DataFormatError::Inconsistent("invalid letter classes"));
        }
        if states == 0
            || self.next.len() != states * self.stride
            || self.actions.len() != self.next.len()
        {
            return Err(DataFormatError::Inconsistent("wrong table size"));
        }
        if self.counters > MAX_COUNTERS {
            return Err(DataFormatError::Inconsistent("too many counters"));
        }
        let valid_actions = if self.counters == MAX_COUNTERS {
            u64::MAX
        } else {
            (1 << self.counters) - 1
        };
        if self.initial as usize >= states
            || self.next.iter().any(|&t| t as usize >= states)
            || self.actions.iter().any(|&a| a & !valid_actions != 0)
        {
            return Err(DataFormatError::Inconsistent("invalid transition"));
        }
        Ok(())
    }
}
