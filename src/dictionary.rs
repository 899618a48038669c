use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::{fmt, sync::Arc};

use crate::order::seeded_rank;

/// Letters known in a slot, `None` for unknown cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern(Vec<Option<char>>);

impl Pattern {
    pub fn new(letters: Vec<Option<char>>) -> Pattern {
        Pattern(letters)
    }

    pub fn unknown(length: usize) -> Pattern {
        Pattern(vec![None; length])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.0.get(index).copied().flatten()
    }

    pub fn letters(&self) -> &[Option<char>] {
        &self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn known_count(&self) -> usize {
        self.0.iter().filter(|c| c.is_some()).count()
    }

    pub fn matches(&self, word: &str) -> bool {
        let mut chars = word.chars();
        for expected in &self.0 {
            match (chars.next(), expected) {
                (None, _) => return false,
                (Some(c), Some(e)) if c != *e => return false,
                _ => {}
            }
        }
        chars.next().is_none()
    }

    /// The word spelled by a complete pattern.
    pub fn to_word(&self) -> Option<String> {
        self.0.iter().copied().collect()
    }

    pub fn with(&self, index: usize, letter: char) -> Pattern {
        let mut result = self.clone();
        result.0[index] = Some(letter);
        result
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{}", c.unwrap_or(' '))?;
        }
        Ok(())
    }
}

impl From<&str> for Pattern {
    /// Spaces are unknown cells.
    fn from(value: &str) -> Self {
        Pattern(
            value
                .chars()
                .map(|c| if c == ' ' { None } else { Some(c) })
                .collect(),
        )
    }
}

/// Word source consulted by every backend.
///
/// Implementations must be safe to query from several threads and must return the same
/// words, in the same order, for the same pattern.
pub trait Dictionary: Send + Sync {
    fn contains(&self, word: &str) -> bool;

    /// Words matching `pattern`, lazily, in the dictionary's preferred order.
    fn matching<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = String> + 'a>;

    /// Exact number of matching words, when the dictionary can count without enumerating.
    fn count_matching(&self, _pattern: &Pattern) -> Option<usize> {
        None
    }

    /// Preference weight of a word. Higher is preferred.
    fn frequency(&self, _word: &str) -> Option<u32> {
        None
    }
}

impl<D: Dictionary + ?Sized> Dictionary for Arc<D> {
    fn contains(&self, word: &str) -> bool {
        (**self).contains(word)
    }

    fn matching<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = String> + 'a> {
        (**self).matching(pattern)
    }

    fn count_matching(&self, pattern: &Pattern) -> Option<usize> {
        (**self).count_matching(pattern)
    }

    fn frequency(&self, word: &str) -> Option<u32> {
        (**self).frequency(word)
    }
}

/// Wraps a dictionary and shuffles the matches of each lookup with a seeded generator.
///
/// The shuffle depends only on the seed and the pattern, so repeated lookups agree.
pub struct ShuffledDictionary<D> {
    inner: D,
    seed: u64,
}

impl<D: Dictionary> ShuffledDictionary<D> {
    pub fn new(inner: D, seed: u64) -> ShuffledDictionary<D> {
        ShuffledDictionary { inner, seed }
    }
}

impl<D: Dictionary> Dictionary for ShuffledDictionary<D> {
    fn contains(&self, word: &str) -> bool {
        self.inner.contains(word)
    }

    fn matching<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = String> + 'a> {
        let mut words: Vec<String> = self.inner.matching(pattern).collect();
        let mut rng = Pcg64Mcg::seed_from_u64(seeded_rank(self.seed, pattern));
        words.shuffle(&mut rng);
        Box::new(words.into_iter())
    }

    fn count_matching(&self, pattern: &Pattern) -> Option<usize> {
        self.inner.count_matching(pattern)
    }

    fn frequency(&self, word: &str) -> Option<u32> {
        self.inner.frequency(word)
    }
}
