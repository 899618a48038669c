use std::{
    fs,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use log::info;
use xfill::{
    Alphabet, Assignment, BackendDescription, BackendError, Crossword, Layout, Orchestrator,
    Presenter, Progress, SlotId, SolverConfig, WordList, WordReuse,
};

#[derive(Parser)]
#[command(name = "xfill")]
#[command(author, version, about = "Fill a crossword grid from a word list", long_about = None)]
struct Cli {
    /// Grid file: one row per line, `*` or `#` for blocks, space or `.` for open cells
    #[arg(short, long, value_name = "FILE", required_unless_present = "list_backends")]
    input: Option<PathBuf>,

    /// Word list: one `WORD` or `WORD;score` per line, or a JSON array of words
    #[arg(short, long, value_name = "FILE", required_unless_present = "list_backends")]
    words: Option<PathBuf>,

    /// Solver configuration as JSON; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, env = "XFILL_BACKEND")]
    backend: Option<String>,

    #[arg(long, env = "XFILL_SEED")]
    seed: Option<u64>,

    #[arg(long, env = "XFILL_MAX_STEPS")]
    max_steps: Option<u64>,

    #[arg(long, env = "XFILL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Backend to try once if the first one times out
    #[arg(long)]
    fallback: Option<String>,

    /// Letters allowed in the grid, defaults to A-Z
    #[arg(long)]
    alphabet: Option<String>,

    /// Let the same word fill several slots
    #[arg(long)]
    allow_reuse: bool,

    /// Pick a backend that can prove a grid unfillable
    #[arg(long)]
    exhaustive: bool,

    /// Print partial fills while solving
    #[arg(short, long)]
    progress: bool,

    /// Print the registered backends and exit
    #[arg(long)]
    list_backends: bool,
}

impl Cli {
    fn solver_config(&self) -> Result<SolverConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
                serde_json::from_reader(file).map_err(|e| format!("{}: {}", path.display(), e))?
            }
            None => SolverConfig::default(),
        };
        if let Some(backend) = &self.backend {
            config = config.with_backend(backend);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(max_steps) = self.max_steps {
            config = config.with_max_steps(max_steps);
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(fallback) = &self.fallback {
            config = config.with_fallback(fallback);
        }
        if self.allow_reuse {
            config = config.with_word_reuse(WordReuse::Allowed);
        }
        if self.exhaustive {
            config.exhaustive = true;
        }
        if self.progress {
            config = config.with_progress(true);
        }
        Ok(config)
    }
}

/// Prints everything to stdout.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn on_progress(&mut self, grid: &Crossword, progress: &Progress) {
        println!("{}% filled", progress.completion);
        println!("{}\n", grid.render(Some(&progress.assignment)));
    }

    fn on_solved(&mut self, grid: &Crossword, assignment: &Assignment) {
        println!("{}", grid.render(Some(assignment)));
    }

    fn on_started(&mut self, grid: &Crossword, backend: &str) {
        println!("Filling {} slots with {}", grid.slots().len(), backend);
    }

    fn on_infeasible(&mut self, grid: &Crossword, unfillable: &[SlotId]) {
        println!("No fill exists.");
        for id in unfillable {
            let slot = grid.slot(*id);
            let (row, column) = slot.start();
            println!(
                "  no word fits the {:?} slot at row {}, column {}",
                slot.direction(),
                row,
                column
            );
        }
    }

    fn on_timed_out(&mut self, _grid: &Crossword) {
        println!("Gave up: budget exhausted.");
    }

    fn on_cancelled(&mut self, _grid: &Crossword) {
        println!("Cancelled.");
    }

    fn on_backend_error(&mut self, _grid: &Crossword, error: &BackendError) {
        println!("Backend failed: {}", error);
    }

    fn on_available_backends(&mut self, backends: &[BackendDescription]) {
        for backend in backends {
            println!(
                "{:<10} {} (progress: {}, cancel: {}, exhaustive: {})",
                backend.name,
                backend.description,
                backend.capabilities.progress,
                backend.capabilities.cancel,
                backend.capabilities.exhaustive
            );
        }
    }
}

fn load_words(path: &Path) -> Result<WordList, String> {
    if path.extension().map_or(false, |extension| extension == "json") {
        let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        WordList::from_json(file).map_err(|e| format!("{}: {}", path.display(), e))
    } else {
        let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        Ok(WordList::parse(&text))
    }
}

fn main() -> Result<(), String> {
    env_logger::init();
    let cli = Cli::parse();
    let orchestrator = Orchestrator::default();
    let mut presenter = ConsolePresenter;

    if cli.list_backends {
        orchestrator.list_backends(&mut presenter);
        return Ok(());
    }

    let (input, words) = match (&cli.input, &cli.words) {
        (Some(input), Some(words)) => (input, words),
        _ => return Err(String::from("--input and --words are required")),
    };
    let alphabet = match &cli.alphabet {
        Some(letters) => Alphabet::new(letters.chars()).map_err(|e| e.to_string())?,
        None => Alphabet::latin(),
    };
    let text = fs::read_to_string(input).map_err(|e| format!("{}: {}", input.display(), e))?;
    let layout = Layout::parse(&text, alphabet);
    let dictionary = load_words(words)?;
    info!("loaded {} words", dictionary.len());

    let config = cli.solver_config()?;
    let outcome = orchestrator
        .solve(layout, Arc::new(dictionary), config, &mut presenter)
        .map_err(|e| e.to_string())?;

    let stats = outcome.stats;
    info!(
        "{}: {} steps, {} backtracks in {:?}",
        stats.backend, stats.steps, stats.backtracks, stats.elapsed
    );
    if outcome.result.is_solved() {
        Ok(())
    } else {
        Err(String::from("Failed to fill crossword"))
    }
}
