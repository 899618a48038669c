use core::cmp::Ordering;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::{config::TieBreak, dictionary::Pattern, ngram::Bigrams};

/// Seeded, deterministic rank of a value. Used to break ties between slots and words.
pub fn seeded_rank<T: Hash + ?Sized>(seed: u64, value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

/// Ordering key of an unassigned slot for the backtracking search. Smaller is picked first.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SlotScore {
    candidate_count: usize,
    length: usize,
    rank: u64,
}

impl SlotScore {
    pub fn new(candidate_count: usize, length: usize, rank: u64, tie_break: TieBreak) -> SlotScore {
        SlotScore {
            candidate_count,
            length: match tie_break {
                TieBreak::LongestFirst => length,
                TieBreak::SeedOnly => 0,
            },
            rank,
        }
    }
}

impl PartialOrd for SlotScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SlotScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // most constrained first
        if self.candidate_count != other.candidate_count {
            return self.candidate_count.cmp(&other.candidate_count);
        }
        // longer slots first
        if self.length != other.length {
            return other.length.cmp(&self.length);
        }
        self.rank.cmp(&other.rank)
    }
}

/// Ordering key of a candidate word. Smaller is tried first.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct WordPreference {
    weight: u32,
    rank: u64,
}

impl WordPreference {
    pub fn new(weight: u32, rank: u64) -> WordPreference {
        WordPreference { weight, rank }
    }
}

impl PartialOrd for WordPreference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WordPreference {
    fn cmp(&self, other: &Self) -> Ordering {
        // heavier words first
        if self.weight != other.weight {
            return other.weight.cmp(&self.weight);
        }
        self.rank.cmp(&other.rank)
    }
}

/// A partially filled text grid ordered for a best-first search: fewer blanks first, then
/// higher fillability.
#[derive(Eq, PartialEq, Debug)]
pub struct FrequencyOrderableGrid {
    pub(crate) contents: Vec<char>,
    space_count: usize,
    pub(crate) fillability_score: usize,
}

impl FrequencyOrderableGrid {
    pub(crate) fn new(
        contents: Vec<char>,
        width: usize,
        height: usize,
        bigrams: &Bigrams,
    ) -> FrequencyOrderableGrid {
        FrequencyOrderableGrid {
            space_count: contents.iter().filter(|c| **c == ' ').count(),
            fillability_score: score_grid(bigrams, &contents, width, height),
            contents,
        }
    }
}

impl PartialOrd for FrequencyOrderableGrid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrequencyOrderableGrid {
    fn cmp(&self, other: &Self) -> Ordering {
        // fewer spaces wins
        if self.space_count != other.space_count {
            return other.space_count.cmp(&self.space_count);
        }
        // higher fillability wins
        if self.fillability_score != other.fillability_score {
            return self.fillability_score.cmp(&other.fillability_score);
        }
        // deterministic among equals
        other.contents.cmp(&self.contents)
    }
}

fn pair_score(bigrams: &Bigrams, prev: char, current: char) -> usize {
    if prev == ' ' || current == ' ' || prev == '*' || current == '*' {
        usize::MAX
    } else {
        *bigrams.get(&(prev, current)).unwrap_or(&usize::MIN)
    }
}

/// Lowest bigram count among adjacent filled letter pairs of the grid.
pub(crate) fn score_grid(bigrams: &Bigrams, contents: &[char], width: usize, height: usize) -> usize {
    let mut result = usize::MAX;
    for row in 0..height {
        for col in 1..width {
            let score = pair_score(
                bigrams,
                contents[row * width + col - 1],
                contents[row * width + col],
            );
            result = result.min(score);
        }
    }
    for row in 1..height {
        for col in 0..width {
            let score = pair_score(
                bigrams,
                contents[(row - 1) * width + col],
                contents[row * width + col],
            );
            result = result.min(score);
        }
    }

    result
}

/// Fill priority of a slot pattern for the best-first search. The minimum is filled next.
#[derive(Eq, PartialEq, Debug)]
pub(crate) struct PatternScore {
    length: usize,
    space_count: usize,
    fillability_score: usize,
}

impl PartialOrd for PatternScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatternScore {
    fn cmp(&self, other: &Self) -> Ordering {
        // longer words are filled first
        if self.length != other.length {
            return other.length.cmp(&self.length);
        }

        // fewer blanks first
        if self.space_count != other.space_count {
            return self.space_count.cmp(&other.space_count);
        }
        // least fillable first
        self.fillability_score.cmp(&other.fillability_score)
    }
}

pub(crate) fn score_pattern(pattern: &Pattern, bigrams: &Bigrams) -> PatternScore {
    let letters = pattern.letters();
    let mut fillability_score = usize::MAX;
    for pair in letters.windows(2) {
        if let [Some(prev), Some(current)] = pair {
            fillability_score = fillability_score.min(pair_score(bigrams, *prev, *current));
        }
    }

    PatternScore {
        length: letters.len(),
        space_count: pattern.len() - pattern.known_count(),
        fillability_score,
    }
}
