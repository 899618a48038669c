//! Fill as boolean satisfiability: one variable per (open cell, letter) and one per
//! (slot, candidate word).

use std::time::Instant;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver};

use crate::{
    assignment::{Assignment, FillOutcome, FillResult, FillStats},
    crossword::Cell,
    error::BackendError,
    fill::{
        prefilled_assignment,
        worker::{run_bounded, WorkerOutcome},
        Capabilities, FillRequest, Filler,
    },
    parse::SlotId,
    Crossword,
};

pub const NAME: &str = "sat";

/// Below this many members an at-most-one constraint is encoded pairwise.
const PAIRWISE_LIMIT: usize = 8;

/// Encodes the fill as CNF and hands it to varisat. Complete: `Infeasible` is a proof.
#[derive(Debug, Default, Clone, Copy)]
pub struct SatFiller;

impl SatFiller {
    pub fn new() -> SatFiller {
        SatFiller
    }
}

/// CNF under construction, with a hard cap on its clause count.
struct Encoder {
    formula: CnfFormula,
    clauses: usize,
    limit: usize,
}

impl Encoder {
    fn new(limit: usize) -> Encoder {
        Encoder {
            formula: CnfFormula::new(),
            clauses: 0,
            limit,
        }
    }

    fn new_lit(&mut self) -> Lit {
        self.formula.new_lit()
    }

    fn add(&mut self, clause: &[Lit]) -> Result<(), BackendError> {
        self.clauses += 1;
        if self.clauses > self.limit {
            return Err(BackendError::EncodingTooLarge {
                clauses: self.clauses,
                limit: self.limit,
            });
        }
        self.formula.add_clause(clause);
        Ok(())
    }

    fn at_least_one(&mut self, lits: &[Lit]) -> Result<(), BackendError> {
        self.add(lits)
    }

    fn at_most_one(&mut self, lits: &[Lit]) -> Result<(), BackendError> {
        if lits.len() <= PAIRWISE_LIMIT {
            for i in 0..lits.len() {
                for j in i + 1..lits.len() {
                    self.add(&[!lits[i], !lits[j]])?;
                }
            }
            return Ok(());
        }

        // sequential counter: counters[i] holds when one of lits[..=i] does
        let counters: Vec<Lit> = (0..lits.len() - 1).map(|_| self.new_lit()).collect();
        self.add(&[!lits[0], counters[0]])?;
        for i in 1..lits.len() - 1 {
            self.add(&[!lits[i], counters[i]])?;
            self.add(&[!counters[i - 1], counters[i]])?;
            self.add(&[!lits[i], !counters[i - 1]])?;
        }
        self.add(&[!lits[lits.len() - 1], !counters[lits.len() - 2]])
    }

    fn exactly_one(&mut self, lits: &[Lit]) -> Result<(), BackendError> {
        self.at_least_one(lits)?;
        self.at_most_one(lits)
    }
}

/// Variables of the encoding, kept to decode the model.
struct Encoding {
    /// Letter literals per open cell, in alphabet order. Empty for other cells.
    cells: Vec<Vec<Lit>>,
}

enum Encoded {
    Ready(Encoder, Encoding),
    Infeasible(Vec<SlotId>),
}

fn encode(request: &FillRequest<'_>) -> Result<Encoded, BackendError> {
    let FillRequest {
        grid,
        dictionary,
        config,
        ..
    } = *request;
    let alphabet = grid.alphabet();
    let allow_duplicates = config.heuristics.allows_duplicates();
    let mut encoder = Encoder::new(config.max_clauses);

    let mut cells = vec![vec![]; grid.width() * grid.height()];
    for row in 0..grid.height() {
        for column in 0..grid.width() {
            if grid.cell(row, column) == Cell::Open {
                let lits: Vec<Lit> = alphabet.letters().iter().map(|_| encoder.new_lit()).collect();
                encoder.exactly_one(&lits)?;
                cells[row * grid.width() + column] = lits;
            }
        }
    }

    let prefilled = prefilled_assignment(grid);
    let prefilled_words: FxHashSet<&str> = prefilled.iter().map(|(_, word)| word).collect();
    let mut by_word: FxHashMap<String, Vec<Lit>> = FxHashMap::default();
    let mut unfillable = vec![];

    for slot in grid.slots() {
        if prefilled.get(slot.id()).is_some() {
            continue;
        }
        let pattern = grid.initial_pattern(slot.id());
        let mut seen = FxHashSet::default();
        let mut indicators = vec![];
        for word in dictionary.matching(&pattern) {
            if !alphabet.accepts(&word) || !seen.insert(word.clone()) {
                continue;
            }
            let indicator = encoder.new_lit();
            for ((row, column), letter) in slot.cells().zip(word.chars()) {
                let lits = &cells[row * grid.width() + column];
                if let Some(index) = alphabet.index_of(letter) {
                    if !lits.is_empty() {
                        let letter = lits[index];
                        encoder.add(&[!indicator, letter])?;
                    }
                }
            }
            if !allow_duplicates && prefilled_words.contains(word.as_str()) {
                encoder.add(&[!indicator])?;
            }
            if !allow_duplicates {
                by_word.entry(word).or_default().push(indicator);
            }
            indicators.push(indicator);
        }

        if indicators.is_empty() {
            unfillable.push(slot.id());
            continue;
        }
        encoder.at_least_one(&indicators)?;
    }

    if !unfillable.is_empty() {
        return Ok(Encoded::Infeasible(unfillable));
    }

    let mut words: Vec<(String, Vec<Lit>)> = by_word.into_iter().collect();
    words.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    for (_, indicators) in &words {
        if indicators.len() > 1 {
            encoder.at_most_one(indicators)?;
        }
    }

    Ok(Encoded::Ready(encoder, Encoding { cells }))
}

fn decode(grid: &Crossword, encoding: &Encoding, model: &[Lit]) -> Result<Assignment, BackendError> {
    let mut values: FxHashMap<usize, bool> = FxHashMap::default();
    for lit in model {
        values.insert(lit.var().index(), lit.is_positive());
    }
    let is_true = |lit: Lit| values.get(&lit.var().index()).copied() == Some(lit.is_positive());

    let letters = grid.alphabet().letters();
    let mut contents = Vec::with_capacity(grid.width() * grid.height());
    for row in 0..grid.height() {
        for column in 0..grid.width() {
            let letter = match grid.cell(row, column) {
                Cell::Block => '*',
                Cell::Prefilled(letter) => letter,
                Cell::Open => {
                    let lits = &encoding.cells[row * grid.width() + column];
                    match lits.iter().position(|lit| is_true(*lit)) {
                        Some(index) => letters[index],
                        None => {
                            return Err(BackendError::MalformedOutput(format!(
                                "model leaves row {}, column {} empty",
                                row, column
                            )))
                        }
                    }
                }
            };
            contents.push(letter);
        }
    }

    let mut assignment = Assignment::empty(grid.slots().len());
    for slot in grid.slots() {
        let word = slot
            .cells()
            .map(|(row, column)| contents[row * grid.width() + column])
            .collect();
        assignment.set(slot.id(), word);
    }
    Ok(assignment)
}

impl Filler for SatFiller {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "CNF encoding solved by varisat; proves infeasibility"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            progress: false,
            cancel: false,
            exhaustive: true,
        }
    }

    fn fill(&self, request: FillRequest<'_>) -> FillOutcome {
        let started = Instant::now();
        let mut stats = FillStats::new(NAME);
        let result = solve(&request, &mut stats);
        stats.elapsed = started.elapsed();
        info!("{} finished in {:?}", NAME, stats.elapsed);
        FillOutcome::new(result, stats)
    }
}

fn solve(request: &FillRequest<'_>, stats: &mut FillStats) -> FillResult {
    let grid = request.grid;
    let control = request.control;

    if control.is_cancelled() {
        return FillResult::Cancelled;
    }
    let prefilled = prefilled_assignment(grid);
    if prefilled.is_complete() {
        return FillResult::Solved(prefilled);
    }

    let (encoder, encoding) = match encode(request) {
        Ok(Encoded::Ready(encoder, encoding)) => (encoder, encoding),
        Ok(Encoded::Infeasible(unfillable)) => {
            info!("slots {:?} have no candidate", unfillable);
            stats.unfillable_slots = unfillable;
            return FillResult::Infeasible;
        }
        Err(e) => return FillResult::BackendError(e),
    };
    info!(
        "{}: {} variables, {} clauses",
        NAME,
        encoder.formula.var_count(),
        encoder.clauses
    );

    if control.is_cancelled() {
        return FillResult::Cancelled;
    }

    let formula = encoder.formula;
    let outcome = run_bounded("xfill-sat", control.budget.deadline, move || {
        let mut solver = Solver::new();
        solver.add_formula(&formula);
        match solver.solve() {
            Ok(true) => Ok(solver.model()),
            Ok(false) => Ok(None),
            Err(e) => Err(e.to_string()),
        }
    });

    let model = match outcome {
        Ok(WorkerOutcome::Finished(Ok(model))) => model,
        Ok(WorkerOutcome::Finished(Err(message))) => {
            return FillResult::BackendError(BackendError::Engine(message))
        }
        Ok(WorkerOutcome::Panicked(message)) => {
            return FillResult::BackendError(BackendError::Panicked(message))
        }
        Ok(WorkerOutcome::Abandoned) => return FillResult::TimedOut,
        Err(e) => return FillResult::BackendError(e),
    };

    if control.is_cancelled() {
        return FillResult::Cancelled;
    }
    match model {
        Some(model) => {
            debug!("model has {} literals", model.len());
            match decode(grid, &encoding, &model) {
                Ok(assignment) => FillResult::Solved(assignment),
                Err(e) => FillResult::BackendError(e),
            }
        }
        None => FillResult::Infeasible,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use proptest::prelude::*;

    use super::SatFiller;
    use crate::{
        assignment::FillResult,
        config::SolverConfig,
        error::BackendError,
        fill::{backtrack::BacktrackFiller, Filler},
        testing::{allow_reuse, arb_grid, binary_words, heart_square, run, word_square, words},
        trie::WordList,
        Crossword,
    };

    #[test]
    fn fills_unique_word_square() {
        let (grid, list) = word_square();
        let outcome = run(&SatFiller, &grid, &list, &allow_reuse());

        let assignment = outcome.result.assignment().unwrap();
        assert_eq!("CAT\nARE\nTEN", grid.render(Some(assignment)));
        assert_eq!("sat", outcome.stats.backend);
        assert!(SatFiller.capabilities().exhaustive);
    }

    #[test]
    fn proves_infeasibility() {
        let grid = Crossword::square("    ").unwrap();
        let list = WordList::build(words(&["AB", "CD"]));
        let outcome = run(&SatFiller, &grid, &list, &allow_reuse());
        assert_eq!(FillResult::Infeasible, outcome.result);
        assert!(outcome.stats.unfillable_slots.is_empty());

        let grid = Crossword::square("Q   ").unwrap();
        let outcome = run(&SatFiller, &grid, &list, &allow_reuse());
        assert_eq!(FillResult::Infeasible, outcome.result);
        assert_eq!(vec![0, 2], outcome.stats.unfillable_slots);
    }

    #[test]
    fn clause_limit_is_enforced() {
        let (grid, list) = word_square();
        let mut config = allow_reuse();
        config.max_clauses = 10;

        let outcome = run(&SatFiller, &grid, &list, &config);
        assert!(matches!(
            outcome.result,
            FillResult::BackendError(BackendError::EncodingTooLarge { limit: 10, .. })
        ));
    }

    #[test]
    fn duplicates_follow_the_config() {
        let grid = Crossword::square("    ").unwrap();
        let list = WordList::build(words(&["AA"]));

        let outcome = run(&SatFiller, &grid, &list, &allow_reuse());
        let assignment = outcome.result.assignment().unwrap();
        assert_eq!("AA\nAA", grid.render(Some(assignment)));

        let outcome = run(&SatFiller, &grid, &list, &SolverConfig::default());
        assert_eq!(FillResult::Infeasible, outcome.result);

        // the only fill repeats the prefilled word
        let grid = Crossword::square("AB  ").unwrap();
        let list = WordList::build(words(&["AB", "AA", "BB"]));
        let outcome = run(&SatFiller, &grid, &list, &SolverConfig::default());
        assert_eq!(FillResult::Infeasible, outcome.result);
    }

    #[test]
    fn many_slots_share_a_word() {
        // ten across slots of length 2 with a single word; reuse forbidden
        let rows = vec!["  "; 10].join("\n");
        let grid = Crossword::rectangle(&rows, 2, 10).unwrap();
        let list = WordList::build(words(&["AB", "CD", "AAAAAAAAAA", "BBBBBBBBBB"]));

        let outcome = run(&SatFiller, &grid, &list, &SolverConfig::default());
        assert_eq!(FillResult::Infeasible, outcome.result);

        let outcome = run(&SatFiller, &grid, &list, &allow_reuse());
        let assignment = outcome.result.assignment().unwrap();
        assert!(assignment.satisfies_crossings(&grid));
    }

    #[test]
    fn deadline_abandons_the_engine() {
        // thirteen separate slots and twelve words with reuse forbidden: a pigeonhole instance
        let rows = vec!["  "; 13].join("\n**\n");
        let grid = Crossword::rectangle(&rows, 2, 25).unwrap();
        let list = WordList::build(words(&[
            "AB", "CD", "EF", "GH", "IJ", "KL", "MN", "OP", "QR", "ST", "UV", "WX",
        ]));
        let config = SolverConfig::default().with_timeout(Duration::from_millis(100));

        let started = Instant::now();
        let outcome = run(&SatFiller, &grid, &list, &config);
        assert_eq!(FillResult::TimedOut, outcome.result);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn agrees_with_backtracking() {
        let (grid, list) = heart_square();
        let config = allow_reuse();

        let sat = run(&SatFiller, &grid, &list, &config);
        let backtrack = run(&BacktrackFiller, &grid, &list, &config);
        for outcome in [sat, backtrack] {
            let assignment = outcome.result.assignment().unwrap();
            assert!(assignment.is_complete());
            assert!(assignment.satisfies_crossings(&grid));
        }
    }

    #[test]
    fn no_open_cells_is_identity() {
        let grid = Crossword::square("AB\nCD").unwrap();
        let list = WordList::build(words(&["XY"]));
        let outcome = run(&SatFiller, &grid, &list, &SolverConfig::default());

        let assignment = outcome.result.assignment().unwrap();
        assert_eq!("AB\nCD", grid.render(Some(assignment)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn feasibility_matches_backtracking(grid in arb_grid()) {
            let list = binary_words();
            let config = SolverConfig::default();
            let sat = run(&SatFiller, &grid, &list, &config);
            let backtrack = run(&BacktrackFiller, &grid, &list, &config);

            prop_assert_eq!(sat.result.is_solved(), backtrack.result.is_solved());
            for outcome in [sat, backtrack] {
                match outcome.result.assignment() {
                    Some(assignment) => prop_assert!(assignment.satisfies_crossings(&grid)),
                    None => prop_assert_eq!(&FillResult::Infeasible, &outcome.result),
                }
            }
        }
    }
}
