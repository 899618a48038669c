use serde::Serialize;

use crate::{
    assignment::{Assignment, FillOutcome},
    config::SolverConfig,
    dictionary::Dictionary,
    Crossword,
};

pub mod backtrack;
pub mod cache;
pub mod candidates;
pub mod control;
pub mod native;
pub mod sat;
pub(crate) mod worker;

pub use control::{Budget, CancelToken, FillControl, ProgressSink};

/// What a backend can do beyond filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// Streams partial assignments while it runs.
    pub progress: bool,
    /// Observes cancellation while it runs, not only before it starts.
    pub cancel: bool,
    /// A reported `Infeasible` is a proof.
    pub exhaustive: bool,
}

/// Everything one backend run gets. Borrowed for the duration of the run.
pub struct FillRequest<'a> {
    pub grid: &'a Crossword,
    pub dictionary: &'a dyn Dictionary,
    pub config: &'a SolverConfig,
    pub control: &'a FillControl,
}

/// One interchangeable solving backend.
pub trait Filler: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn fill(&self, request: FillRequest<'_>) -> FillOutcome;
}

/// Assignment holding the words of the fully prefilled slots, which need no search.
pub(crate) fn prefilled_assignment(grid: &Crossword) -> Assignment {
    let mut assignment = Assignment::empty(grid.slots().len());
    for slot in grid.slots() {
        if let Some(word) = grid.initial_pattern(slot.id()).to_word() {
            assignment.set(slot.id(), word);
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::prefilled_assignment;
    use crate::Crossword;

    #[test]
    fn prefilled_assignment_works() {
        let c = Crossword::square("CAT\nA  \nR  ").unwrap();

        let assignment = prefilled_assignment(&c);
        assert_eq!(2, assignment.assigned_count());
        assert_eq!(Some("CAT"), assignment.get(0));
        assert_eq!(Some("CAR"), assignment.get(3));
    }
}
