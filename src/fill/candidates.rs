use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    crossword::Alphabet,
    dictionary::{Dictionary, Pattern},
    fill::cache::PatternCache,
    order::{seeded_rank, WordPreference},
    parse::SlotId,
    Crossword,
};

pub type WordId = u32;

/// Upper bound of words enumerated to count a pattern when the dictionary cannot count.
pub const COUNT_LIMIT: usize = 10_000;

const CACHE_SIZE: usize = 4_096;

/// Interned words seen during one fill.
struct WordTable {
    words: Vec<String>,
    letters: Vec<Vec<char>>,
    preferences: Vec<WordPreference>,
    ids: FxHashMap<String, WordId>,
}

impl WordTable {
    fn new() -> WordTable {
        WordTable {
            words: vec![],
            letters: vec![],
            preferences: vec![],
            ids: FxHashMap::default(),
        }
    }

    fn intern(&mut self, word: String, dictionary: &dyn Dictionary, seed: u64) -> WordId {
        if let Some(id) = self.ids.get(&word) {
            return *id;
        }
        let id = self.words.len() as WordId;
        let weight = dictionary.frequency(&word).unwrap_or(0);
        self.preferences
            .push(WordPreference::new(weight, seeded_rank(seed, word.as_str())));
        self.letters.push(word.chars().collect());
        self.ids.insert(word.clone(), id);
        self.words.push(word);
        id
    }
}

enum SlotCandidates {
    /// Not enumerated yet; matches the slot's initial pattern.
    Lazy { count: Option<usize> },
    /// Candidates are `words[..len]`.
    Active { words: Vec<WordId>, len: usize },
}

/// Per-slot candidate sets for one fill, narrowed in place and restored on backtrack.
pub struct CandidateIndex<'d> {
    dictionary: &'d dyn Dictionary,
    alphabet: Alphabet,
    seed: u64,
    table: WordTable,
    initial_patterns: Vec<Pattern>,
    slots: Vec<SlotCandidates>,
    trail: Vec<(SlotId, usize)>,
    matches: PatternCache<Rc<[WordId]>>,
}

impl<'d> CandidateIndex<'d> {
    pub fn new(grid: &Crossword, dictionary: &'d dyn Dictionary, seed: u64) -> CandidateIndex<'d> {
        let initial_patterns: Vec<Pattern> = grid
            .slots()
            .iter()
            .map(|slot| grid.initial_pattern(slot.id()))
            .collect();
        CandidateIndex {
            dictionary,
            alphabet: grid.alphabet().clone(),
            seed,
            table: WordTable::new(),
            slots: initial_patterns
                .iter()
                .map(|_| SlotCandidates::Lazy { count: None })
                .collect(),
            initial_patterns,
            trail: vec![],
            matches: PatternCache::with_size(CACHE_SIZE),
        }
    }

    /// Ids of the dictionary words matching `pattern` and spelled with the grid alphabet.
    pub fn matching(&mut self, pattern: &Pattern) -> Rc<[WordId]> {
        let CandidateIndex {
            dictionary,
            alphabet,
            seed,
            table,
            matches,
            ..
        } = self;
        matches
            .get_or_insert_with(pattern, || {
                dictionary
                    .matching(pattern)
                    .filter(|word| alphabet.accepts(word))
                    .map(|word| table.intern(word, *dictionary, *seed))
                    .collect()
            })
            .clone()
    }

    /// Current number of candidates of a slot. Enumerates at most [`COUNT_LIMIT`] words.
    pub fn count(&mut self, slot: SlotId) -> usize {
        match &self.slots[slot] {
            SlotCandidates::Active { len, .. } => *len,
            SlotCandidates::Lazy { count: Some(count) } => *count,
            SlotCandidates::Lazy { count: None } => {
                let count = self.count_spelled(slot);
                self.slots[slot] = SlotCandidates::Lazy { count: Some(count) };
                count
            }
        }
    }

    /// Dictionary counts ignore the alphabet, so they are only trusted for large sets that keep
    /// at least one spellable word.
    fn count_spelled(&self, slot: SlotId) -> usize {
        let pattern = &self.initial_patterns[slot];
        let mut spelled = self
            .dictionary
            .matching(pattern)
            .filter(|word| self.alphabet.accepts(word));
        match self.dictionary.count_matching(pattern) {
            Some(0) => 0,
            Some(count) if count > COUNT_LIMIT => {
                if spelled.next().is_some() {
                    count
                } else {
                    0
                }
            }
            _ => spelled.take(COUNT_LIMIT).count(),
        }
    }

    fn activate(&mut self, slot: SlotId) {
        if let SlotCandidates::Lazy { .. } = self.slots[slot] {
            let pattern = self.initial_patterns[slot].clone();
            let words = self.matching(&pattern).to_vec();
            debug!("slot {} activated with {} candidates", slot, words.len());
            let len = words.len();
            self.slots[slot] = SlotCandidates::Active { words, len };
        }
    }

    /// Current candidates of a slot, enumerating them if needed.
    pub fn candidates(&mut self, slot: SlotId) -> &[WordId] {
        self.activate(slot);
        match &self.slots[slot] {
            SlotCandidates::Active { words, len } => &words[..*len],
            SlotCandidates::Lazy { .. } => &[],
        }
    }

    /// Current candidates of a slot, most preferred first.
    pub fn ordered_candidates(&mut self, slot: SlotId) -> Vec<WordId> {
        let mut result = self.candidates(slot).to_vec();
        result.sort_by_key(|id| self.table.preferences[*id as usize]);
        result
    }

    /// Keeps only the candidates with `letter` at `index`. Returns the remaining count.
    pub fn narrow(&mut self, slot: SlotId, index: usize, letter: char) -> usize {
        self.activate(slot);
        let letters = &self.table.letters;
        match &mut self.slots[slot] {
            SlotCandidates::Active { words, len } => {
                let mut kept = 0;
                for k in 0..*len {
                    if letters[words[k] as usize].get(index) == Some(&letter) {
                        words.swap(k, kept);
                        kept += 1;
                    }
                }
                if kept != *len {
                    self.trail.push((slot, *len));
                    *len = kept;
                }
                kept
            }
            SlotCandidates::Lazy { .. } => 0,
        }
    }

    /// Position in the undo trail, to pass to [`CandidateIndex::restore`].
    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Undoes every narrowing made since `mark`.
    pub fn restore(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((slot, old_len)) = self.trail.pop() {
                if let SlotCandidates::Active { len, .. } = &mut self.slots[slot] {
                    *len = old_len;
                }
            }
        }
    }

    pub fn word(&self, id: WordId) -> &str {
        &self.table.words[id as usize]
    }

    pub fn letter(&self, id: WordId, index: usize) -> char {
        self.table.letters[id as usize][index]
    }

    pub fn interned(&self) -> usize {
        self.table.words.len()
    }
}
