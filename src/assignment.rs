use crate::{error::BackendError, parse::SlotId, Crossword};
use std::time::Duration;

/// Partial or complete mapping from slots to words.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    words: Vec<Option<String>>,
}

impl Assignment {
    pub fn empty(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, id: SlotId) -> Option<&str> {
        self.words.get(id)?.as_deref()
    }

    pub fn set(&mut self, id: SlotId, word: String) {
        self.words[id] = Some(word);
    }

    pub fn clear(&mut self, id: SlotId) {
        self.words[id] = None;
    }

    pub fn assigned_count(&self) -> usize {
        self.words.iter().filter(|word| word.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.words.iter().all(Option::is_some)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &str)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(id, word)| Some((id, word.as_deref()?)))
    }

    /// Checks that every assigned word fits its slot, agrees with prefilled cells and with every
    /// assigned crossing slot.
    pub fn satisfies_crossings(&self, crossword: &Crossword) -> bool {
        if self.words.len() != crossword.slots().len() {
            return false;
        }
        self.iter().all(|(id, word)| {
            let letters: Vec<char> = word.chars().collect();
            if letters.len() != crossword.slot(id).length() {
                return false;
            }
            if !crossword.initial_pattern(id).matches(word) {
                return false;
            }
            crossword.crossings(id).iter().all(|crossing| {
                match self.get(crossing.other) {
                    Some(other) => {
                        other.chars().nth(crossing.other_index) == Some(letters[crossing.index])
                    }
                    None => true,
                }
            })
        })
    }
}

/// Terminal result of a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillResult {
    Solved(Assignment),
    /// No assignment exists. Only meaningful for exhaustive backends.
    Infeasible,
    TimedOut,
    Cancelled,
    BackendError(BackendError),
}

impl FillResult {
    pub fn is_solved(&self) -> bool {
        matches!(self, FillResult::Solved(_))
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            FillResult::Solved(assignment) => Some(assignment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FillStats {
    /// Name of the backend that produced the result.
    pub backend: String,
    pub steps: u64,
    pub backtracks: u64,
    pub elapsed: Duration,
    /// Slots found to have no candidate at all, when the backend can tell.
    pub unfillable_slots: Vec<SlotId>,
}

impl FillStats {
    pub fn new(backend: &str) -> FillStats {
        FillStats {
            backend: backend.to_owned(),
            ..FillStats::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOutcome {
    pub result: FillResult,
    pub stats: FillStats,
}

impl FillOutcome {
    pub fn new(result: FillResult, stats: FillStats) -> FillOutcome {
        FillOutcome { result, stats }
    }
}
