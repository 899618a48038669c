use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::Instant,
};

use log::warn;

use crate::error::BackendError;

/// Most calls allowed to run at once, abandoned ones included.
pub(crate) const MAX_LIVE_WORKERS: usize = 64;

static LIVE_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Decrements the live worker count when the worker thread ends, however it ends.
struct LiveGuard;

impl Drop for LiveGuard {
    fn drop(&mut self) {
        LIVE_WORKERS.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub(crate) enum WorkerOutcome<T> {
    Finished(T),
    Panicked(String),
    /// The deadline passed first. The call keeps running detached and its result is dropped.
    Abandoned,
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    match payload.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_owned(),
        None => match payload.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => String::from("unknown panic payload"),
        },
    }
}

/// Runs `job` on its own thread and waits for it until `deadline`.
pub(crate) fn run_bounded<T, F>(
    name: &str,
    deadline: Option<Instant>,
    job: F,
) -> Result<WorkerOutcome<T>, BackendError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    if LIVE_WORKERS.fetch_add(1, Ordering::SeqCst) >= MAX_LIVE_WORKERS {
        LIVE_WORKERS.fetch_sub(1, Ordering::SeqCst);
        return Err(BackendError::WorkerUnavailable(format!(
            "{} calls still running",
            MAX_LIVE_WORKERS
        )));
    }

    let (sender, receiver) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let _guard = LiveGuard;
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            // the caller may have given up already
            let _ = sender.send(result);
        });
    if let Err(e) = spawned {
        LIVE_WORKERS.fetch_sub(1, Ordering::SeqCst);
        return Err(BackendError::WorkerUnavailable(e.to_string()));
    }

    let received = match deadline {
        Some(deadline) => {
            receiver.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        }
        None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
    };

    match received {
        Ok(Ok(value)) => Ok(WorkerOutcome::Finished(value)),
        Ok(Err(payload)) => Ok(WorkerOutcome::Panicked(panic_message(payload.as_ref()))),
        Err(RecvTimeoutError::Timeout) => {
            warn!("{}: deadline passed, abandoning the running call", name);
            Ok(WorkerOutcome::Abandoned)
        }
        Err(RecvTimeoutError::Disconnected) => Err(BackendError::Disconnected),
    }
}
