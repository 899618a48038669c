//! Byte format exchanged with native modules: JSON documents, one per call.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    assignment::{Assignment, FillResult},
    config::SolverConfig,
    crossword::Cell,
    dictionary::Dictionary,
    error::BackendError,
    Crossword,
};

pub const WIRE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRequest {
    pub version: u32,
    pub width: usize,
    pub height: usize,
    /// One string per row: `*` for a block, a space for an open cell, else the prefilled letter.
    pub rows: Vec<String>,
    /// Letters an open cell may take.
    pub alphabet: String,
    /// Only the dictionary words that fit some open slot.
    pub words: Vec<String>,
    pub max_steps: Option<u64>,
    pub seed: u64,
    pub allow_duplicates: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NativeResponse {
    Solved { rows: Vec<String> },
    Infeasible,
    TimedOut,
    Error { message: String },
}

impl NativeRequest {
    pub fn new(grid: &Crossword, dictionary: &dyn Dictionary, config: &SolverConfig) -> NativeRequest {
        let rows = (0..grid.height())
            .map(|row| {
                (0..grid.width())
                    .map(|column| grid.cell(row, column).to_char())
                    .collect()
            })
            .collect();

        let mut seen = FxHashSet::default();
        let mut words = BTreeSet::new();
        for slot in grid.slots() {
            let pattern = grid.initial_pattern(slot.id());
            if pattern.is_complete() || !seen.insert(pattern.clone()) {
                continue;
            }
            words.extend(
                dictionary
                    .matching(&pattern)
                    .filter(|word| grid.alphabet().accepts(word)),
            );
        }

        NativeRequest {
            version: WIRE_VERSION,
            width: grid.width(),
            height: grid.height(),
            rows,
            alphabet: grid.alphabet().letters().iter().collect(),
            words: words.into_iter().collect(),
            max_steps: config.max_steps,
            seed: config.seed(),
            allow_duplicates: config.heuristics.allows_duplicates(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BackendError> {
        serde_json::to_vec(self)
            .map_err(|e| BackendError::MalformedOutput(format!("cannot encode request: {}", e)))
    }

    pub fn decode(bytes: &[u8]) -> Result<NativeRequest, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl NativeResponse {
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<NativeResponse, BackendError> {
        serde_json::from_slice(bytes).map_err(|e| {
            BackendError::MalformedOutput(format!(
                "{} in {:?}",
                e,
                String::from_utf8_lossy(&bytes[..bytes.len().min(64)])
            ))
        })
    }

    /// Maps the response to a fill result. Solved rows are checked against the grid, the
    /// dictionary and the reuse rule before they are trusted.
    pub fn into_result(
        self,
        grid: &Crossword,
        dictionary: &dyn Dictionary,
        allow_duplicates: bool,
    ) -> FillResult {
        match self {
            NativeResponse::Solved { rows } => {
                match decode_rows(&rows, grid, dictionary, allow_duplicates) {
                    Ok(assignment) => FillResult::Solved(assignment),
                    Err(e) => FillResult::BackendError(e),
                }
            }
            NativeResponse::Infeasible => FillResult::Infeasible,
            NativeResponse::TimedOut => FillResult::TimedOut,
            NativeResponse::Error { message } => {
                FillResult::BackendError(BackendError::NativeFault(message))
            }
        }
    }
}

fn decode_rows(
    rows: &[String],
    grid: &Crossword,
    dictionary: &dyn Dictionary,
    allow_duplicates: bool,
) -> Result<Assignment, BackendError> {
    if rows.len() != grid.height() {
        return Err(BackendError::MalformedOutput(format!(
            "expected {} rows, got {}",
            grid.height(),
            rows.len()
        )));
    }
    let cells: Vec<Vec<char>> = rows.iter().map(|row| row.chars().collect()).collect();
    for (row, letters) in cells.iter().enumerate() {
        if letters.len() != grid.width() {
            return Err(BackendError::MalformedOutput(format!(
                "row {} has {} cells",
                row,
                letters.len()
            )));
        }
        for (column, letter) in letters.iter().enumerate() {
            let valid = match grid.cell(row, column) {
                Cell::Block => *letter == '*',
                Cell::Prefilled(expected) => *letter == expected,
                Cell::Open => grid.alphabet().contains(*letter),
            };
            if !valid {
                return Err(BackendError::MalformedOutput(format!(
                    "unexpected {:?} at row {}, column {}",
                    letter, row, column
                )));
            }
        }
    }

    let mut assignment = Assignment::empty(grid.slots().len());
    for slot in grid.slots() {
        let word: String = slot.cells().map(|(row, column)| cells[row][column]).collect();
        if !grid.is_prefilled(slot.id()) && !dictionary.contains(&word) {
            return Err(BackendError::MalformedOutput(format!(
                "{:?} is not a dictionary word",
                word
            )));
        }
        assignment.set(slot.id(), word);
    }

    if !allow_duplicates {
        // prefilled words may repeat among themselves but never in a filled slot
        let mut used: FxHashSet<&str> = grid
            .slots()
            .iter()
            .filter(|slot| grid.is_prefilled(slot.id()))
            .filter_map(|slot| assignment.get(slot.id()))
            .collect();
        for slot in grid.slots().iter().filter(|slot| !grid.is_prefilled(slot.id())) {
            if let Some(word) = assignment.get(slot.id()) {
                if !used.insert(word) {
                    return Err(BackendError::MalformedOutput(format!(
                        "{:?} is used twice",
                        word
                    )));
                }
            }
        }
    }
    Ok(assignment)
}
