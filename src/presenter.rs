use crate::{
    assignment::{Assignment, FillOutcome, FillResult},
    error::BackendError,
    parse::SlotId,
    registry::BackendDescription,
    Crossword,
};

/// Snapshot of a running fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub assignment: Assignment,
    /// Assigned open slots over open slots, in percent.
    pub completion: u8,
}

impl Progress {
    pub fn new(assignment: Assignment, assigned: usize, total: usize) -> Progress {
        let completion = if total == 0 {
            100
        } else {
            (assigned.min(total) * 100 / total) as u8
        };
        Progress {
            assignment,
            completion,
        }
    }
}

/// Events of one fill, in production order. `Finished` is always the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillEvent {
    /// A backend is about to run, named here. Sent again when the fallback takes over.
    Started(String),
    Progress(Progress),
    Finished(FillOutcome),
}

/// Receives the events of a fill. Exactly one terminal method is called per fill.
pub trait Presenter {
    fn on_started(&mut self, _grid: &Crossword, _backend: &str) {}

    fn on_progress(&mut self, _grid: &Crossword, _progress: &Progress) {}

    fn on_solved(&mut self, grid: &Crossword, assignment: &Assignment);

    /// `unfillable` holds the slots known to have no candidate at all. It may be empty even
    /// when such slots exist, if the backend did not look for them.
    fn on_infeasible(&mut self, grid: &Crossword, unfillable: &[SlotId]);

    fn on_timed_out(&mut self, grid: &Crossword);

    fn on_cancelled(&mut self, grid: &Crossword);

    fn on_backend_error(&mut self, grid: &Crossword, error: &BackendError);

    /// Lists the registered backends.
    fn on_available_backends(&mut self, _backends: &[BackendDescription]) {}
}

/// Routes a terminal outcome to the matching presenter method.
pub fn present_result<P: Presenter + ?Sized>(
    presenter: &mut P,
    grid: &Crossword,
    outcome: &FillOutcome,
) {
    match &outcome.result {
        FillResult::Solved(assignment) => presenter.on_solved(grid, assignment),
        FillResult::Infeasible => presenter.on_infeasible(grid, &outcome.stats.unfillable_slots),
        FillResult::TimedOut => presenter.on_timed_out(grid),
        FillResult::Cancelled => presenter.on_cancelled(grid),
        FillResult::BackendError(error) => presenter.on_backend_error(grid, error),
    }
}

/// Presenter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn on_solved(&mut self, _grid: &Crossword, _assignment: &Assignment) {}

    fn on_infeasible(&mut self, _grid: &Crossword, _unfillable: &[SlotId]) {}

    fn on_timed_out(&mut self, _grid: &Crossword) {}

    fn on_cancelled(&mut self, _grid: &Crossword) {}

    fn on_backend_error(&mut self, _grid: &Crossword, _error: &BackendError) {}
}
