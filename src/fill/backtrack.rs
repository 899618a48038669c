use std::time::Instant;

use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::{
    assignment::{FillOutcome, FillResult, FillStats},
    fill::{
        candidates::{CandidateIndex, WordId},
        prefilled_assignment, Capabilities, FillRequest, Filler,
    },
    order::{seeded_rank, SlotScore},
    parse::SlotId,
    presenter::Progress,
};

pub const NAME: &str = "backtrack";

/// Chronological backtracking with forward checking over the candidate index.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktrackFiller;

impl BacktrackFiller {
    pub fn new() -> BacktrackFiller {
        BacktrackFiller
    }
}

/// One level of the search: a slot and the words left to try for it.
struct Frame {
    slot: SlotId,
    order: Vec<WordId>,
    next: usize,
    mark: usize,
}

impl Filler for BacktrackFiller {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Most-constrained-slot backtracking with forward checking"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            progress: true,
            cancel: true,
            exhaustive: false,
        }
    }

    fn fill(&self, request: FillRequest<'_>) -> FillOutcome {
        let started = Instant::now();
        let mut stats = FillStats::new(NAME);
        let result = search(&request, &mut stats);
        stats.elapsed = started.elapsed();
        info!(
            "{} finished in {:?}: {} steps, {} backtracks",
            NAME, stats.elapsed, stats.steps, stats.backtracks
        );
        FillOutcome::new(result, stats)
    }
}

fn search(request: &FillRequest<'_>, stats: &mut FillStats) -> FillResult {
    let FillRequest {
        grid,
        dictionary,
        config,
        control,
    } = *request;
    let allow_duplicates = config.heuristics.allows_duplicates();
    let tie_break = config.heuristics.tie_break;
    let seed = config.seed();

    let mut assignment = prefilled_assignment(grid);
    let mut used: FxHashSet<String> = assignment.iter().map(|(_, word)| word.to_owned()).collect();
    let open: Vec<SlotId> = grid
        .slots()
        .iter()
        .map(|slot| slot.id())
        .filter(|id| assignment.get(*id).is_none())
        .collect();

    if open.is_empty() {
        return FillResult::Solved(assignment);
    }
    if control.is_cancelled() {
        return FillResult::Cancelled;
    }

    let mut index = CandidateIndex::new(grid, dictionary, seed);
    let ranks: Vec<u64> = grid
        .slots()
        .iter()
        .map(|slot| seeded_rank(seed, &slot.id()))
        .collect();

    let unfillable: Vec<SlotId> = open
        .iter()
        .copied()
        .filter(|id| index.count(*id) == 0)
        .collect();
    if !unfillable.is_empty() {
        info!("slots {:?} have no candidate", unfillable);
        stats.unfillable_slots = unfillable;
        return FillResult::Infeasible;
    }
    info!("{}: {} open slots", NAME, open.len());

    let mut frames: Vec<Frame> = Vec::with_capacity(open.len());
    let mut assigned = 0;

    loop {
        let next_slot = open
            .iter()
            .copied()
            .filter(|id| assignment.get(*id).is_none())
            .min_by_key(|id| {
                SlotScore::new(
                    index.count(*id),
                    grid.slot(*id).length(),
                    ranks[*id],
                    tie_break,
                )
            });
        let slot = match next_slot {
            Some(slot) => slot,
            None => return FillResult::Solved(assignment),
        };
        frames.push(Frame {
            slot,
            order: index.ordered_candidates(slot),
            next: 0,
            mark: index.mark(),
        });

        loop {
            let frame = match frames.last_mut() {
                Some(frame) => frame,
                None => return FillResult::Infeasible,
            };

            // undo the previous attempt at this level
            if let Some(word) = assignment.get(frame.slot) {
                if !allow_duplicates {
                    used.remove(word);
                }
                assignment.clear(frame.slot);
                index.restore(frame.mark);
                assigned -= 1;
            }

            if control.is_cancelled() {
                return FillResult::Cancelled;
            }
            if control.budget.is_exhausted(stats.steps) {
                return FillResult::TimedOut;
            }

            if frame.next >= frame.order.len() {
                frames.pop();
                stats.backtracks += 1;
                continue;
            }
            let id = frame.order[frame.next];
            frame.next += 1;
            let slot = frame.slot;

            let word = index.word(id).to_owned();
            if !allow_duplicates && used.contains(&word) {
                continue;
            }

            stats.steps += 1;
            if stats.steps % 10_000 == 0 {
                debug!(
                    "{} steps, {} backtracks, depth {}",
                    stats.steps,
                    stats.backtracks,
                    frames.len()
                );
            }

            if !allow_duplicates {
                used.insert(word.clone());
            }
            assignment.set(slot, word);
            assigned += 1;

            let mut consistent = true;
            for crossing in grid.crossings(slot) {
                if assignment.get(crossing.other).is_some() {
                    continue;
                }
                let letter = index.letter(id, crossing.index);
                if index.narrow(crossing.other, crossing.other_index, letter) == 0 {
                    consistent = false;
                    break;
                }
            }
            if !consistent {
                continue;
            }

            if control.wants_progress() {
                control.report(Progress::new(assignment.clone(), assigned, open.len()));
            }
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc::sync_channel, time::Duration};

    use proptest::prelude::*;

    use super::BacktrackFiller;
    use crate::{
        assignment::FillResult,
        config::{SolverConfig, TieBreak},
        fill::{Budget, CancelToken, FillControl, FillRequest, Filler, ProgressSink},
        presenter::FillEvent,
        testing::{
            allow_reuse, arb_grid, binary_words, heart_square, run, slow_grid, word_square, words,
        },
        trie::WordList,
        Crossword, Direction,
    };

    #[test]
    fn fills_unique_word_square() {
        let (grid, list) = word_square();
        let outcome = run(&BacktrackFiller, &grid, &list, &allow_reuse());

        let assignment = outcome.result.assignment().unwrap();
        assert!(assignment.is_complete());
        assert!(assignment.satisfies_crossings(&grid));
        assert_eq!("CAT\nARE\nTEN", grid.render(Some(assignment)));
        assert_eq!("backtrack", outcome.stats.backend);
    }

    #[test]
    fn no_open_cells_is_identity() {
        let grid = Crossword::square("XYZ\nQQQ\nZZZ").unwrap();
        let list = WordList::build(words(&["CAT"]));
        let outcome = run(&BacktrackFiller, &grid, &list, &SolverConfig::default());

        let assignment = outcome.result.assignment().unwrap();
        assert_eq!("XYZ\nQQQ\nZZZ", grid.render(Some(assignment)));
        assert_eq!(0, outcome.stats.steps);
    }

    #[test]
    fn empty_candidate_set_is_infeasible_not_timed_out() {
        let grid = Crossword::square("Q   ").unwrap();
        let list = WordList::build(words(&["AB", "CD"]));
        let config = SolverConfig::default().with_max_steps(1);
        let outcome = run(&BacktrackFiller, &grid, &list, &config);

        assert_eq!(FillResult::Infeasible, outcome.result);
        assert_eq!(vec![0, 2], outcome.stats.unfillable_slots);
    }

    #[test]
    fn words_outside_the_alphabet_leave_a_slot_unfillable() {
        let grid = Crossword::square("  ****   ").unwrap();
        let list = WordList::build(words(&["AB", "BA", "ÉTÉ", "ÉPÉ", "ÉMU"]));
        let bottom = grid.slot_at(2, 0, Direction::Across).unwrap();

        let outcome = run(&BacktrackFiller, &grid, &list, &allow_reuse());
        assert_eq!(FillResult::Infeasible, outcome.result);
        assert_eq!(vec![bottom], outcome.stats.unfillable_slots);

        let config = allow_reuse().with_max_steps(1);
        let outcome = run(&BacktrackFiller, &grid, &list, &config);
        assert_eq!(FillResult::Infeasible, outcome.result);
        assert_eq!(vec![bottom], outcome.stats.unfillable_slots);
    }

    #[test]
    fn exhausted_search_is_infeasible() {
        let grid = Crossword::square("    ").unwrap();
        let list = WordList::build(words(&["AB", "CD"]));
        let outcome = run(&BacktrackFiller, &grid, &list, &allow_reuse());

        assert_eq!(FillResult::Infeasible, outcome.result);
        assert!(outcome.stats.backtracks > 0);
    }

    #[test]
    fn word_reuse_is_configurable() {
        let grid = Crossword::square("    ").unwrap();
        let list = WordList::build(words(&["AA"]));

        let outcome = run(&BacktrackFiller, &grid, &list, &allow_reuse());
        assert!(outcome.result.is_solved());

        let outcome = run(&BacktrackFiller, &grid, &list, &SolverConfig::default());
        assert_eq!(FillResult::Infeasible, outcome.result);

        let list = WordList::build(words(&["AB", "CD", "AC", "BD"]));
        let outcome = run(&BacktrackFiller, &grid, &list, &SolverConfig::default());
        let assignment = outcome.result.assignment().unwrap();
        assert!(assignment.is_complete());
        assert!(assignment.satisfies_crossings(&grid));
        let mut used: Vec<&str> = assignment.iter().map(|(_, word)| word).collect();
        used.sort();
        assert_eq!(vec!["AB", "AC", "BD", "CD"], used);
    }

    #[test]
    fn prefilled_words_count_as_used() {
        let grid = Crossword::square("AB  ").unwrap();
        let list = WordList::build(words(&["AB", "AC", "BD", "CD"]));

        let outcome = run(&BacktrackFiller, &grid, &list, &SolverConfig::default());
        let assignment = outcome.result.assignment().unwrap();
        assert_eq!("AB\nCD", grid.render(Some(assignment)));

        // the only fill repeats the prefilled word
        let list = WordList::build(words(&["AB", "AA", "BB"]));
        let grid = Crossword::square("AB  ").unwrap();
        let outcome = run(&BacktrackFiller, &grid, &list, &SolverConfig::default());
        assert_eq!(FillResult::Infeasible, outcome.result);
        let outcome = run(&BacktrackFiller, &grid, &list, &allow_reuse());
        let assignment = outcome.result.assignment().unwrap();
        assert!(assignment.is_complete());
        assert!(assignment.satisfies_crossings(&grid));
    }

    #[test]
    fn same_seed_same_fill() {
        let (grid, list) = heart_square();
        for tie_break in [TieBreak::LongestFirst, TieBreak::SeedOnly] {
            let mut config = allow_reuse().with_seed(42);
            config.heuristics.tie_break = tie_break;

            let first = run(&BacktrackFiller, &grid, &list, &config);
            let second = run(&BacktrackFiller, &grid, &list, &config);
            assert!(first.result.is_solved());
            assert_eq!(first.result, second.result);
            assert_eq!(first.stats.steps, second.stats.steps);
        }
    }

    #[test]
    fn step_budget_times_out() {
        let (grid, list) = word_square();
        let config = allow_reuse().with_max_steps(2);
        let outcome = run(&BacktrackFiller, &grid, &list, &config);

        assert_eq!(FillResult::TimedOut, outcome.result);
        assert_eq!(2, outcome.stats.steps);
    }

    #[test]
    fn deadline_times_out() {
        let (grid, list) = slow_grid();
        let config = allow_reuse().with_timeout(Duration::from_millis(20));
        let outcome = run(&BacktrackFiller, &grid, &list, &config);

        assert_eq!(FillResult::TimedOut, outcome.result);
        assert!(outcome.stats.elapsed < Duration::from_secs(2));
    }

    #[test]
    fn cancelled_before_start() {
        let (grid, list) = slow_grid();
        let cancel = CancelToken::new();
        cancel.cancel();
        let control = FillControl::new(cancel, Budget::unbounded());
        let config = allow_reuse();

        let outcome = BacktrackFiller.fill(FillRequest {
            grid: &grid,
            dictionary: &list,
            config: &config,
            control: &control,
        });
        assert_eq!(FillResult::Cancelled, outcome.result);
    }

    #[test]
    fn slow_grid_hits_the_step_budget() {
        let (grid, list) = slow_grid();
        let config = allow_reuse().with_max_steps(5_000);
        let outcome = run(&BacktrackFiller, &grid, &list, &config);

        assert_eq!(FillResult::TimedOut, outcome.result);
        assert!(outcome.stats.backtracks > 0);
    }

    #[test]
    fn progress_is_reported_in_order() {
        let (grid, list) = word_square();
        let (sender, receiver) = sync_channel(64);
        let control =
            FillControl::new(CancelToken::new(), Budget::unbounded()).with_progress(ProgressSink::new(sender));
        let config = allow_reuse();

        let outcome = BacktrackFiller.fill(FillRequest {
            grid: &grid,
            dictionary: &list,
            config: &config,
            control: &control,
        });
        assert!(outcome.result.is_solved());
        drop(control);

        let completions: Vec<u8> = receiver
            .iter()
            .map(|event| match event {
                FillEvent::Progress(progress) => progress.completion,
                FillEvent::Finished(_) => panic!("backends never send the final event"),
                FillEvent::Started(_) => panic!("backends never announce themselves"),
            })
            .collect();
        assert!(!completions.is_empty());
        assert_eq!(Some(&100), completions.last());
        assert!(completions.iter().all(|completion| *completion <= 100));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn fills_satisfy_crossings(grid in arb_grid(), seed in 0u64..1000) {
            let list = binary_words();
            let config = allow_reuse().with_seed(seed);
            let first = run(&BacktrackFiller, &grid, &list, &config);
            let assignment = first.result.assignment().unwrap();
            prop_assert!(assignment.is_complete());
            prop_assert!(assignment.satisfies_crossings(&grid));

            let second = run(&BacktrackFiller, &grid, &list, &config);
            prop_assert_eq!(first.result, second.result);
        }
    }
}
