//! Runs one fill on a dedicated worker thread and forwards its events to a [`Presenter`].

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, SyncSender, TryRecvError},
        Arc, Mutex, PoisonError,
    },
    thread,
};

use log::{info, warn};

use crate::{
    assignment::{FillOutcome, FillResult, FillStats},
    config::SolverConfig,
    crossword::{Crossword, Layout},
    dictionary::Dictionary,
    error::{BackendError, ConfigError, StartError},
    fill::{worker::panic_message, Budget, CancelToken, FillControl, FillRequest, Filler, ProgressSink},
    presenter::{present_result, FillEvent, Presenter},
    registry::Registry,
};

/// Progress events buffered between the worker and the handle before new ones are dropped.
const EVENT_QUEUE_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Idle,
    Running,
    Solved,
    Infeasible,
    TimedOut,
    Cancelled,
    BackendError,
}

impl FillState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FillState::Idle | FillState::Running)
    }

    fn of(result: &FillResult) -> FillState {
        match result {
            FillResult::Solved(_) => FillState::Solved,
            FillResult::Infeasible => FillState::Infeasible,
            FillResult::TimedOut => FillState::TimedOut,
            FillResult::Cancelled => FillState::Cancelled,
            FillResult::BackendError(_) => FillState::BackendError,
        }
    }
}

impl fmt::Display for FillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillState::Idle => "idle",
            FillState::Running => "running",
            FillState::Solved => "solved",
            FillState::Infeasible => "infeasible",
            FillState::TimedOut => "timed out",
            FillState::Cancelled => "cancelled",
            FillState::BackendError => "backend error",
        };
        f.write_str(name)
    }
}

/// Drives a single fill: `Idle → Running → terminal`. An orchestrator is not reused.
pub struct Orchestrator {
    registry: Arc<Registry>,
    state: Arc<Mutex<FillState>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Orchestrator::new(Arc::new(Registry::with_defaults()))
    }
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>) -> Orchestrator {
        Orchestrator {
            registry,
            state: Arc::new(Mutex::new(FillState::Idle)),
        }
    }

    pub fn state(&self) -> FillState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn list_backends(&self, presenter: &mut dyn Presenter) {
        presenter.on_available_backends(&self.registry.descriptions());
    }

    /// Validates the request and starts the fill on a worker thread.
    ///
    /// Layout and configuration errors are returned here and leave the orchestrator idle.
    pub fn start(
        &self,
        layout: Layout,
        dictionary: Arc<dyn Dictionary>,
        config: SolverConfig,
    ) -> Result<SolveHandle, StartError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != FillState::Idle {
            return Err(StartError::NotIdle(*state));
        }

        config.validate()?;
        let filler = self.registry.select(&config)?;
        let fallback = match &config.fallback {
            Some(name) => Some(
                self.registry
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownBackend(name.clone()))?,
            ),
            None => None,
        };
        let grid = Arc::new(Crossword::build(layout)?);

        let (sender, receiver) = mpsc::sync_channel(EVENT_QUEUE_SIZE);
        let cancel = CancelToken::new();
        let progress = if config.progress && filler.capabilities().progress {
            Some(ProgressSink::new(sender.clone()))
        } else {
            None
        };

        let worker = Worker {
            filler,
            fallback,
            grid: Arc::clone(&grid),
            dictionary,
            config,
            cancel: cancel.clone(),
            progress,
            events: sender.clone(),
            state: Arc::clone(&self.state),
        };
        thread::Builder::new()
            .name(String::from("xfill-solve"))
            .spawn(move || {
                let outcome = worker.run();
                // the handle may be gone; the state is already final
                let _ = sender.send(FillEvent::Finished(outcome));
            })
            .map_err(|e| StartError::Spawn(e.to_string()))?;

        *state = FillState::Running;
        Ok(SolveHandle {
            grid,
            receiver,
            cancel,
            finished: false,
        })
    }

    /// Starts a fill and blocks until the presenter has received its result.
    pub fn solve(
        &self,
        layout: Layout,
        dictionary: Arc<dyn Dictionary>,
        config: SolverConfig,
        presenter: &mut dyn Presenter,
    ) -> Result<FillOutcome, StartError> {
        let handle = self.start(layout, dictionary, config)?;
        Ok(handle.wait(presenter))
    }
}

/// Everything the worker thread owns for one fill.
struct Worker {
    filler: Arc<dyn Filler>,
    fallback: Option<Arc<dyn Filler>>,
    grid: Arc<Crossword>,
    dictionary: Arc<dyn Dictionary>,
    config: SolverConfig,
    cancel: CancelToken,
    progress: Option<ProgressSink>,
    events: SyncSender<FillEvent>,
    state: Arc<Mutex<FillState>>,
}

impl Worker {
    fn run(self) -> FillOutcome {
        info!(
            "filling a {}x{} grid with {}",
            self.grid.width(),
            self.grid.height(),
            self.filler.name()
        );
        let mut outcome = self.fill_with(self.filler.as_ref());

        if outcome.result == FillResult::TimedOut {
            if let Some(fallback) = &self.fallback {
                info!(
                    "{} timed out, falling back to {}",
                    self.filler.name(),
                    fallback.name()
                );
                outcome = self.fill_with(fallback.as_ref());
            }
        }

        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = FillState::of(&outcome.result);
        outcome
    }

    fn fill_with(&self, filler: &dyn Filler) -> FillOutcome {
        // the handle may be gone already
        let _ = self.events.send(FillEvent::Started(filler.name().to_owned()));
        let mut control = FillControl::new(self.cancel.clone(), Budget::from_config(&self.config));
        if let Some(sink) = &self.progress {
            control = control.with_progress(sink.clone());
        }
        let request = FillRequest {
            grid: &self.grid,
            dictionary: self.dictionary.as_ref(),
            config: &self.config,
            control: &control,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| filler.fill(request))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!("{} panicked: {}", filler.name(), message);
                FillOutcome::new(
                    FillResult::BackendError(BackendError::Panicked(message)),
                    FillStats::new(filler.name()),
                )
            }
        }
    }
}

/// The caller's side of a running fill.
pub struct SolveHandle {
    grid: Arc<Crossword>,
    receiver: Receiver<FillEvent>,
    cancel: CancelToken,
    finished: bool,
}

impl SolveHandle {
    pub fn grid(&self) -> &Crossword {
        &self.grid
    }

    /// Asks the fill to stop. Backends that only check between calls stop after the current one.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Forwards the events produced so far without blocking. Returns the outcome once, when the
    /// fill has finished.
    pub fn poll(&mut self, presenter: &mut dyn Presenter) -> Option<FillOutcome> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(outcome) = self.forward(event, presenter) {
                        return Some(outcome);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(self.disconnected(presenter)),
            }
        }
    }

    /// Blocks until the fill finishes, forwarding every event.
    pub fn wait(mut self, presenter: &mut dyn Presenter) -> FillOutcome {
        loop {
            match self.receiver.recv() {
                Ok(event) => {
                    if let Some(outcome) = self.forward(event, presenter) {
                        return outcome;
                    }
                }
                Err(_) => return self.disconnected(presenter),
            }
        }
    }

    fn forward(&mut self, event: FillEvent, presenter: &mut dyn Presenter) -> Option<FillOutcome> {
        match event {
            FillEvent::Started(backend) => {
                presenter.on_started(&self.grid, &backend);
                None
            }
            FillEvent::Progress(progress) => {
                presenter.on_progress(&self.grid, &progress);
                None
            }
            FillEvent::Finished(outcome) => {
                self.finished = true;
                present_result(presenter, &self.grid, &outcome);
                Some(outcome)
            }
        }
    }

    fn disconnected(&mut self, presenter: &mut dyn Presenter) -> FillOutcome {
        warn!("fill worker went away without a result");
        self.finished = true;
        let outcome = FillOutcome::new(
            FillResult::BackendError(BackendError::Disconnected),
            FillStats::default(),
        );
        present_result(presenter, &self.grid, &outcome);
        outcome
    }
}
