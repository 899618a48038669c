//! Fixtures shared by the unit tests.

use proptest::prelude::*;

use crate::{
    assignment::{Assignment, FillOutcome},
    config::{SolverConfig, WordReuse},
    crossword::Cell,
    dictionary::{Dictionary, Pattern},
    error::BackendError,
    fill::{Budget, CancelToken, FillControl, FillRequest, Filler},
    parse::SlotId,
    presenter::{Presenter, Progress},
    registry::BackendDescription,
    trie::WordList,
    Crossword,
};

pub fn words(words: &[&str]) -> Vec<String> {
    words.iter().map(|word| word.to_string()).collect()
}

pub fn allow_reuse() -> SolverConfig {
    SolverConfig::default().with_word_reuse(WordReuse::Allowed)
}

/// Runs a backend directly, with the config's budget and no progress channel.
pub fn run(
    filler: &dyn Filler,
    grid: &Crossword,
    dictionary: &dyn Dictionary,
    config: &SolverConfig,
) -> FillOutcome {
    let control = FillControl::new(CancelToken::new(), Budget::from_config(config));
    filler.fill(FillRequest {
        grid,
        dictionary,
        config,
        control: &control,
    })
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 3x3 open grid whose only fill is CAT / ARE / TEN.
pub fn word_square() -> (Crossword, WordList) {
    let grid = Crossword::square("         ").unwrap();
    (grid, WordList::build(words(&["CAT", "ARE", "TEN"])))
}

/// 5x5 open grid with a known fill and a few words that fit nowhere.
pub fn heart_square() -> (Crossword, WordList) {
    let grid = Crossword::square(&" ".repeat(25)).unwrap();
    let list = WordList::build(words(&[
        "HEART", "EMBER", "ABUSE", "RESIN", "TREND", "HOUSE", "APPLE", "QUICK", "MONEY", "TRAIN",
    ]));
    (grid, list)
}

/// Twelve independent three-letter slots above an unfillable 2x2 corner. Chronological
/// backtracking tries every combination of the former before giving up.
pub fn slow_grid() -> (Crossword, WordList) {
    let mut rows = vec![];
    for _ in 0..12 {
        rows.push("   ");
        rows.push("***");
    }
    rows.push("  *");
    rows.push("  *");
    let grid = Crossword::rectangle(&rows.join("\n"), 3, rows.len()).unwrap();
    let list = WordList::build(words(&[
        "ACE", "BAD", "CAB", "DAB", "AB", "CD", "EF", "GH", "IJ",
    ]));
    (grid, list)
}

/// Every word of length 2 to 4 over {A, B}.
pub fn binary_words() -> WordList {
    let mut result = vec![];
    for length in 2..=4 {
        for bits in 0..(1u32 << length) {
            let word: String = (0..length)
                .map(|i| if bits & (1 << i) == 0 { 'A' } else { 'B' })
                .collect();
            result.push(word);
        }
    }
    WordList::build(result)
}

/// Turns open cells that belong to no slot into blocks until none is left.
fn close_isolated_cells(cells: &mut [Cell], width: usize, height: usize) {
    let is_letter = |cells: &[Cell], row: usize, column: usize| !cells[row * width + column].is_block();
    loop {
        let mut changed = false;
        for row in 0..height {
            for column in 0..width {
                if !is_letter(cells, row, column) {
                    continue;
                }
                let across = (column > 0 && is_letter(cells, row, column - 1))
                    || (column + 1 < width && is_letter(cells, row, column + 1));
                let down = (row > 0 && is_letter(cells, row - 1, column))
                    || (row + 1 < height && is_letter(cells, row + 1, column));
                if !across && !down {
                    cells[row * width + column] = Cell::Block;
                    changed = true;
                }
            }
        }
        if !changed {
            return;
        }
    }
}

/// Random 4x4 block masks, repaired so that every open cell is in a slot.
pub fn arb_grid() -> impl Strategy<Value = Crossword> {
    prop::collection::vec(prop::bool::weighted(0.25), 16).prop_map(|blocks| {
        let mut cells: Vec<Cell> = blocks
            .into_iter()
            .map(|block| if block { Cell::Block } else { Cell::Open })
            .collect();
        close_isolated_cells(&mut cells, 4, 4);
        let text: String = cells.iter().map(|cell| cell.to_char()).collect();
        Crossword::square(&text).unwrap()
    })
}

/// Dictionary that cannot count matches without enumerating them.
pub struct CountlessDictionary(pub WordList);

impl Dictionary for CountlessDictionary {
    fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    fn matching<'a>(&'a self, pattern: &Pattern) -> Box<dyn Iterator<Item = String> + 'a> {
        self.0.matching(pattern)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    Progress(u8),
    Solved(Assignment),
    Infeasible(Vec<SlotId>),
    TimedOut,
    Cancelled,
    BackendError(BackendError),
}

/// Presenter that remembers every call. Started backends are kept apart from the events.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub started: Vec<String>,
    pub events: Vec<Presented>,
    pub backends: Vec<BackendDescription>,
}

impl Presenter for RecordingPresenter {
    fn on_started(&mut self, _grid: &Crossword, backend: &str) {
        self.started.push(backend.to_owned());
    }

    fn on_progress(&mut self, _grid: &Crossword, progress: &Progress) {
        self.events.push(Presented::Progress(progress.completion));
    }

    fn on_solved(&mut self, _grid: &Crossword, assignment: &Assignment) {
        self.events.push(Presented::Solved(assignment.clone()));
    }

    fn on_infeasible(&mut self, _grid: &Crossword, unfillable: &[SlotId]) {
        self.events.push(Presented::Infeasible(unfillable.to_vec()));
    }

    fn on_timed_out(&mut self, _grid: &Crossword) {
        self.events.push(Presented::TimedOut);
    }

    fn on_cancelled(&mut self, _grid: &Crossword) {
        self.events.push(Presented::Cancelled);
    }

    fn on_backend_error(&mut self, _grid: &Crossword, error: &BackendError) {
        self.events.push(Presented::BackendError(error.clone()));
    }

    fn on_available_backends(&mut self, backends: &[BackendDescription]) {
        self.backends = backends.to_vec();
    }
}
