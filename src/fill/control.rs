use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{SyncSender, TrySendError},
        Arc,
    },
    time::{Duration, Instant},
};

use log::warn;

use crate::{
    config::SolverConfig,
    presenter::{FillEvent, Progress},
};

/// Cooperative cancellation flag shared between a caller and a running fill.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Step and wall-clock limits of one backend run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    pub max_steps: Option<u64>,
    pub deadline: Option<Instant>,
}

impl Budget {
    pub fn unbounded() -> Budget {
        Budget::default()
    }

    /// Budget of a run starting now.
    pub fn from_config(config: &SolverConfig) -> Budget {
        Budget {
            max_steps: config.max_steps,
            deadline: config.timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    pub fn is_exhausted(&self, steps: u64) -> bool {
        if let Some(max_steps) = self.max_steps {
            if steps >= max_steps {
                return true;
            }
        }
        self.is_past_deadline()
    }

    pub fn is_past_deadline(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline, `None` if unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Best-effort progress channel. Never blocks: events that do not fit in the queue are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    sender: SyncSender<FillEvent>,
    dropped: Arc<AtomicU64>,
}

impl ProgressSink {
    pub fn new(sender: SyncSender<FillEvent>) -> ProgressSink {
        ProgressSink {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn report(&self, progress: Progress) {
        match self.sender.try_send(FillEvent::Progress(progress)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!("progress queue full, {} events dropped so far", dropped);
                }
            }
            // nobody listens anymore
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// What a backend consults while it runs.
#[derive(Debug, Clone, Default)]
pub struct FillControl {
    pub cancel: CancelToken,
    pub budget: Budget,
    pub progress: Option<ProgressSink>,
}

impl FillControl {
    pub fn new(cancel: CancelToken, budget: Budget) -> FillControl {
        FillControl {
            cancel,
            budget,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> FillControl {
        self.progress = Some(sink);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, progress: Progress) {
        if let Some(sink) = &self.progress {
            sink.report(progress);
        }
    }

    pub fn wants_progress(&self) -> bool {
        self.progress.is_some()
    }
}
