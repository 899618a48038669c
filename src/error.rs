use thiserror::Error;

use crate::orchestrator::FillState;

/// Raised synchronously while building a [`Crossword`](crate::Crossword), never during a fill.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("grid has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("contents are not a square ({0} cells)")]
    NotSquare(usize),
    #[error("expected {expected} cells for a {width}x{height} grid, found {found}")]
    Dimensions {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid letter {letter:?} at row {row}, column {column}")]
    InvalidLetter {
        row: usize,
        column: usize,
        letter: char,
    },
    #[error("open cell at row {row}, column {column} belongs to no slot")]
    IsolatedCell { row: usize, column: usize },
    #[error("alphabet is empty")]
    EmptyAlphabet,
    #[error("alphabet letter {0:?} is not an uppercase letter")]
    InvalidAlphabetLetter(char),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no backend named {0:?} is registered")]
    UnknownBackend(String),
    #[error("a backend named {0:?} is already registered")]
    DuplicateBackend(String),
    #[error("no backend is registered")]
    NoBackend,
    #[error("no registered backend is exhaustive")]
    NoExhaustiveBackend,
    #[error("{0} budget must be positive")]
    ZeroBudget(&'static str),
}

/// Why an [`Orchestrator`](crate::Orchestrator) refused to start a fill.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("orchestrator is not idle (state: {0})")]
    NotIdle(FillState),
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to spawn fill worker: {0}")]
    Spawn(String),
}

/// Internal failure of a backend. Delivered as a fill outcome, never thrown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("encoding too large: {clauses} clauses exceed the limit of {limit}")]
    EncodingTooLarge { clauses: usize, limit: usize },
    #[error("SAT engine failure: {0}")]
    Engine(String),
    #[error("native module fault: {0}")]
    NativeFault(String),
    #[error("malformed backend output: {0}")]
    MalformedOutput(String),
    #[error("backend panicked: {0}")]
    Panicked(String),
    #[error("no worker available: {0}")]
    WorkerUnavailable(String),
    #[error("fill worker disconnected")]
    Disconnected,
}
