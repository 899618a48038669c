//! Crossword grid filling with interchangeable backends.
//!
//! A [`Crossword`] is built once from a [`Layout`]. An [`Orchestrator`] picks a backend from its
//! [`Registry`], runs it on a worker thread and reports progress and the final result to a
//! [`Presenter`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use xfill::{Alphabet, Layout, NullPresenter, Orchestrator, SolverConfig, WordList};
//!
//! let layout = Layout::parse("   \n   \n   ", Alphabet::latin());
//! let words = WordList::parse("CAT\nARE\nTEN");
//! let outcome = Orchestrator::default()
//!     .solve(layout, Arc::new(words), SolverConfig::default(), &mut NullPresenter)
//!     .unwrap();
//! println!("{:?}", outcome.result);
//! ```

pub mod assignment;
pub mod config;
pub mod crossword;
pub mod dictionary;
pub mod error;
pub mod fill;
pub mod ngram;
pub mod order;
pub mod orchestrator;
pub mod parse;
pub mod presenter;
pub mod registry;
pub mod trie;

#[cfg(test)]
pub(crate) mod testing;

pub use assignment::{Assignment, FillOutcome, FillResult, FillStats};
pub use config::{Heuristics, SolverConfig, TieBreak, WordReuse};
pub use crossword::{Alphabet, Cell, Crossword, Direction, Layout};
pub use dictionary::{Dictionary, Pattern, ShuffledDictionary};
pub use error::{BackendError, ConfigError, LayoutError, StartError};
pub use fill::{Capabilities, Filler};
pub use orchestrator::{FillState, Orchestrator, SolveHandle};
pub use parse::{Slot, SlotId};
pub use presenter::{NullPresenter, Presenter, Progress};
pub use registry::{BackendDescription, Registry};
pub use trie::WordList;
