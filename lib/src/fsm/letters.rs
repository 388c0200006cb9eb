use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::chars::{is_anchor, Char, ALPHABET_SIZE, EPSILON};
use crate::fsm::Fsm;

/// Partition of the input alphabet into letter classes.
///
/// Symbols in the same class are indistinguishable for an automaton: every
/// state goes to the same place with any of them. Transition tables have a
/// column per class instead of a column per symbol.
///
/// Classes are numbered in order of their smallest symbol, which keeps the
/// partition deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Letters {
    classes: Vec<u16>,
    count: usize,
}

impl Letters {
    /// All symbols in a single class.
    pub fn single() -> Self {
        Self { classes: vec![0; ALPHABET_SIZE], count: 1 }
    }

    /// Computes the letter classes of a non-deterministic automaton.
    ///
    /// Two symbols share a class when every state has exactly the same
    /// targets for both. Anchors never share a class with bytes because a
    /// missing anchor transition means "stay", while a missing byte
    /// transition means "fail".
    pub fn for_fsm(fsm: &Fsm) -> Self {
        let mut set_ids = FxHashMap::default();
        let mut signatures: Vec<Vec<(u32, u32)>> =
            vec![Vec::new(); ALPHABET_SIZE];

        for (state, node) in fsm.nodes().iter().enumerate() {
            for (&symbol, targets) in &node.edges {
                if symbol == EPSILON {
                    continue;
                }
                let next_id = set_ids.len() as u32;
                let set_id = *set_ids.entry(targets).or_insert(next_id);
                signatures[symbol as usize].push((state as u32, set_id));
            }
        }

        Self::from_keys(
            (0..ALPHABET_SIZE)
                .map(|c| (is_anchor(c as Char), &signatures[c])),
        )
    }

    /// Builds a partition where symbols with equal keys share a class. The
    /// iterator must yield one key per symbol.
    fn from_keys<K: Hash + Eq>(keys: impl Iterator<Item = K>) -> Self {
        let mut ids: FxHashMap<K, u16> = FxHashMap::default();
        let classes: Vec<u16> = keys
            .map(|key| {
                let next_id = ids.len() as u16;
                *ids.entry(key).or_insert(next_id)
            })
            .collect();
        debug_assert_eq!(classes.len(), ALPHABET_SIZE);
        Self { classes, count: ids.len() }
    }

    /// Class of a symbol.
    #[inline(always)]
    pub fn class(&self, c: Char) -> usize {
        self.classes[c as usize] as usize
    }

    /// Number of classes.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Smallest symbol of each class.
    pub fn representatives(&self) -> Vec<Char> {
        let mut result = vec![Char::MAX; self.count];
        for (symbol, &class) in self.classes.iter().enumerate().rev() {
            result[class as usize] = symbol as Char;
        }
        result
    }

    /// Returns the coarsest partition that refines both `self` and `other`,
    /// together with the pair of original classes behind each new class.
    pub fn refine(&self, other: &Letters) -> (Letters, Vec<(usize, usize)>) {
        let letters = Self::from_keys(
            self.classes.iter().zip(other.classes.iter()),
        );
        let mut pairs = vec![(0, 0); letters.count];
        for c in 0..ALPHABET_SIZE {
            pairs[letters.classes[c] as usize] =
                (self.classes[c] as usize, other.classes[c] as usize);
        }
        (letters, pairs)
    }

    /// Moves `c` to a class of its own. Returns the new partition and, for
    /// each new class, the class it comes from.
    pub fn isolate(&self, c: Char) -> (Letters, Vec<usize>) {
        let class = self.class(c);
        let mut origins: Vec<usize> = (0..self.count).collect();
        let shared = self
            .classes
            .iter()
            .enumerate()
            .any(|(symbol, &other)| {
                symbol != c as usize && other as usize == class
            });
        if !shared {
            return (self.clone(), origins);
        }
        let mut letters = self.clone();
        letters.classes[c as usize] = self.count as u16;
        letters.count += 1;
        origins.push(class);
        (letters, origins)
    }

    /// Renumbers classes, `remap[old]` is the new class of `old`.
    pub fn remap(&self, remap: &[usize], count: usize) -> Letters {
        Letters {
            classes: self
                .classes
                .iter()
                .map(|&class| remap[class as usize] as u16)
                .collect(),
            count,
        }
    }

    /// Checks the invariants of a partition loaded from untrusted data.
    pub fn is_valid(&self) -> bool {
        self.count >= 1
            && self.count <= ALPHABET_SIZE
            && self.classes.len() == ALPHABET_SIZE
            && self.classes.iter().all(|&class| (class as usize) < self.count)
    }
}
