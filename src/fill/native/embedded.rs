//! The built-in native module: a best-first search over partially filled text grids.
//!
//! It only ever sees the wire format, exactly like an external module would.

use std::collections::BinaryHeap;

use log::debug;
use rustc_hash::FxHashSet;

use crate::{
    crossword::{Alphabet, Layout},
    dictionary::{Dictionary, Pattern, ShuffledDictionary},
    fill::{
        cache::PatternCache,
        native::{
            module::{NativeFault, NativeModule},
            wire::{NativeRequest, NativeResponse, WIRE_VERSION},
        },
    },
    ngram::bigrams,
    order::{score_pattern, FrequencyOrderableGrid},
    parse::Slot,
    trie::WordList,
    Crossword,
};

const CACHE_SIZE: usize = 4096;

/// In-process module backed by [`solve`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedModule;

impl NativeModule for EmbeddedModule {
    fn call(&mut self, input: &[u8]) -> Result<Vec<u8>, NativeFault> {
        Ok(solve_bytes(input))
    }
}

pub(crate) fn solve_bytes(input: &[u8]) -> Vec<u8> {
    let response = match NativeRequest::decode(input) {
        Ok(request) => solve(&request),
        Err(e) => NativeResponse::Error {
            message: format!("bad request: {}", e),
        },
    };
    response
        .encode()
        .unwrap_or_else(|_| br#"{"status":"error","message":"cannot encode response"}"#.to_vec())
}

fn error(message: String) -> NativeResponse {
    NativeResponse::Error { message }
}

fn pattern_of(contents: &[char], slot: &Slot, width: usize) -> Pattern {
    Pattern::new(
        slot.cells()
            .map(|(row, column)| match contents[row * width + column] {
                ' ' => None,
                c => Some(c),
            })
            .collect(),
    )
}

fn fill_one_word(contents: &[char], slot: &Slot, width: usize, word: &str) -> Vec<char> {
    let mut result = contents.to_vec();
    for ((row, column), c) in slot.cells().zip(word.chars()) {
        result[row * width + column] = c;
    }
    result
}

struct Search<'a> {
    grid: &'a Crossword,
    words: &'a WordList,
    prefilled_words: FxHashSet<String>,
    allow_duplicates: bool,
    viable: PatternCache<bool>,
}

impl<'a> Search<'a> {
    /// Complete slots must be distinct dictionary words, incomplete ones must still have a match.
    fn is_viable(&mut self, contents: &[char]) -> bool {
        let width = self.grid.width();
        let mut seen = self.prefilled_words.clone();
        for slot in self.grid.slots() {
            let pattern = pattern_of(contents, slot, width);
            match pattern.to_word() {
                Some(word) => {
                    if self.grid.is_prefilled(slot.id()) {
                        continue;
                    }
                    if !self.words.contains(&word) {
                        return false;
                    }
                    if !self.allow_duplicates && !seen.insert(word) {
                        return false;
                    }
                }
                None => {
                    let words = self.words;
                    if !*self
                        .viable
                        .get_or_insert_with(&pattern, || words.is_viable(&pattern))
                    {
                        return false;
                    }
                }
            }
        }
        true
    }
}

fn rows_of(contents: &[char], width: usize) -> Vec<String> {
    contents
        .chunks(width)
        .map(|row| row.iter().collect())
        .collect()
}

/// Runs the best-first search for one decoded request.
pub fn solve(request: &NativeRequest) -> NativeResponse {
    if request.version != WIRE_VERSION {
        return error(format!("unsupported wire version {}", request.version));
    }
    let alphabet = match Alphabet::new(request.alphabet.chars()) {
        Ok(alphabet) => alphabet,
        Err(e) => return error(e.to_string()),
    };
    let grid = match Crossword::build(Layout::parse(&request.rows.join("\n"), alphabet)) {
        Ok(grid) => grid,
        Err(e) => return error(e.to_string()),
    };
    if grid.width() != request.width || grid.height() != request.height {
        return error(format!(
            "rows describe a {}x{} grid, header says {}x{}",
            grid.width(),
            grid.height(),
            request.width,
            request.height
        ));
    }
    let width = grid.width();

    let words = WordList::build(
        request
            .words
            .iter()
            .filter(|word| grid.alphabet().accepts(word))
            .cloned()
            .collect(),
    );
    let prefilled_words: FxHashSet<String> = grid
        .slots()
        .iter()
        .filter_map(|slot| grid.initial_pattern(slot.id()).to_word())
        .collect();
    let mut corpus = request.words.clone();
    corpus.extend(prefilled_words.iter().cloned());
    let bigrams = bigrams(&corpus);
    let shuffled = ShuffledDictionary::new(words.clone(), request.seed);

    let contents: Vec<char> = request.rows.iter().flat_map(|row| row.chars()).collect();
    let mut search = Search {
        grid: &grid,
        words: &words,
        prefilled_words,
        allow_duplicates: request.allow_duplicates,
        viable: PatternCache::with_size(CACHE_SIZE),
    };
    if !search.is_viable(&contents) {
        return NativeResponse::Infeasible;
    }

    let mut fills: PatternCache<Vec<String>> = PatternCache::with_size(CACHE_SIZE);
    let mut queue = BinaryHeap::new();
    queue.push(FrequencyOrderableGrid::new(
        contents,
        width,
        grid.height(),
        &bigrams,
    ));
    let mut candidate_count: u64 = 0;

    loop {
        let candidate = match queue.pop() {
            Some(candidate) => candidate,
            None => return NativeResponse::Infeasible,
        };
        if request.max_steps.map_or(false, |max| candidate_count >= max) {
            return NativeResponse::TimedOut;
        }
        candidate_count += 1;
        if candidate_count % 10_000 == 0 {
            debug!(
                "{} candidates, {} queued",
                candidate_count,
                queue.len()
            );
        }

        let to_fill = grid
            .slots()
            .iter()
            .map(|slot| (slot, pattern_of(&candidate.contents, slot, width)))
            .filter(|(_, pattern)| !pattern.is_complete())
            .min_by_key(|(_, pattern)| score_pattern(pattern, &bigrams));
        let (slot, pattern) = match to_fill {
            Some(to_fill) => to_fill,
            None => return NativeResponse::Solved {
                rows: rows_of(&candidate.contents, width),
            },
        };

        let potential_fills = fills
            .get_or_insert_with(&pattern, || shuffled.matching(&pattern).collect())
            .clone();
        for potential_fill in potential_fills {
            let new_contents = fill_one_word(&candidate.contents, slot, width, &potential_fill);
            if !search.is_viable(&new_contents) {
                continue;
            }
            if !new_contents.contains(&' ') {
                return NativeResponse::Solved {
                    rows: rows_of(&new_contents, width),
                };
            }
            let orderable =
                FrequencyOrderableGrid::new(new_contents, width, grid.height(), &bigrams);
            if orderable.fillability_score > 0 {
                queue.push(orderable);
            }
        }
    }
}
