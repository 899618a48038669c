//! Adapter for precompiled solvers reached through a byte-level call boundary.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, OnceLock, PoisonError},
    time::Instant,
};

use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::{
    assignment::{FillOutcome, FillResult, FillStats},
    error::BackendError,
    fill::{
        prefilled_assignment,
        worker::{panic_message, run_bounded, WorkerOutcome},
        Capabilities, FillRequest, Filler,
    },
};

pub mod embedded;
pub mod module;
pub mod wire;

pub use module::{CAbiModule, NativeBuffer, NativeFault, NativeLoader, NativeModule};
pub use wire::{NativeRequest, NativeResponse};

pub const NAME: &str = "native";

type SharedModule = Arc<Mutex<Option<Box<dyn NativeModule>>>>;

// Loaded modules shared by every adapter of the same name in this process.
static MODULES: OnceLock<Mutex<FxHashMap<String, SharedModule>>> = OnceLock::new();

fn shared_module(name: &str) -> SharedModule {
    let mut modules = MODULES
        .get_or_init(|| Mutex::new(FxHashMap::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        modules
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(None))),
    )
}

/// Failure of one call, before the response is decoded.
enum CallError {
    Load(NativeFault),
    Fault(NativeFault),
    Panicked(String),
}

/// Runs a [`NativeModule`] on a worker thread, one call at a time.
///
/// The module is loaded on first use and loaded again after it panics or reports a sticky fault.
/// Adapters with the same name share one module and one lock per process; the first adapter to
/// call loads it with its own loader.
pub struct NativeFiller {
    name: String,
    description: String,
    loader: Arc<dyn NativeLoader>,
    module: SharedModule,
}

impl NativeFiller {
    pub fn new<L: NativeLoader + 'static>(name: &str, description: &str, loader: L) -> NativeFiller {
        NativeFiller {
            name: name.to_owned(),
            description: description.to_owned(),
            loader: Arc::new(loader),
            module: shared_module(name),
        }
    }

    /// The built-in best-first module.
    pub fn embedded() -> NativeFiller {
        NativeFiller::new(
            NAME,
            "Best-first search over partial grids, called through the native boundary",
            || -> Result<Box<dyn NativeModule>, NativeFault> { Ok(Box::new(embedded::EmbeddedModule)) },
        )
    }
}

fn call_module(
    loader: &dyn NativeLoader,
    module: &SharedModule,
    input: &[u8],
) -> Result<Vec<u8>, CallError> {
    let mut slot = module.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        info!("loading native module");
        *slot = Some(loader.load().map_err(CallError::Load)?);
    }
    let loaded = match slot.as_mut() {
        Some(loaded) => loaded,
        None => return Err(CallError::Load(NativeFault(String::from("module missing")))),
    };

    match panic::catch_unwind(AssertUnwindSafe(|| loaded.call(input))) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(fault)) => {
            if loaded.faults_are_sticky() {
                *slot = None;
            }
            Err(CallError::Fault(fault))
        }
        Err(payload) => {
            *slot = None;
            Err(CallError::Panicked(panic_message(payload.as_ref())))
        }
    }
}

impl Filler for NativeFiller {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    fn fill(&self, request: FillRequest<'_>) -> FillOutcome {
        let started = Instant::now();
        let mut stats = FillStats::new(&self.name);
        let result = self.call(&request);
        stats.elapsed = started.elapsed();
        info!("{} finished in {:?}", self.name, stats.elapsed);
        FillOutcome::new(result, stats)
    }
}

impl NativeFiller {
    fn call(&self, request: &FillRequest<'_>) -> FillResult {
        let FillRequest {
            grid,
            dictionary,
            config,
            control,
        } = *request;

        if control.is_cancelled() {
            return FillResult::Cancelled;
        }
        let prefilled = prefilled_assignment(grid);
        if prefilled.is_complete() {
            return FillResult::Solved(prefilled);
        }

        let input = match NativeRequest::new(grid, dictionary, config).encode() {
            Ok(input) => input,
            Err(e) => return FillResult::BackendError(e),
        };

        let loader = Arc::clone(&self.loader);
        let module = Arc::clone(&self.module);
        let outcome = run_bounded("xfill-native", control.budget.deadline, move || {
            call_module(loader.as_ref(), &module, &input)
        });

        let bytes = match outcome {
            Ok(WorkerOutcome::Finished(Ok(bytes))) => bytes,
            Ok(WorkerOutcome::Finished(Err(CallError::Load(fault)))) => {
                return FillResult::BackendError(BackendError::WorkerUnavailable(format!(
                    "cannot load native module: {}",
                    fault
                )))
            }
            Ok(WorkerOutcome::Finished(Err(CallError::Fault(fault)))) => {
                warn!("{}: native fault: {}", self.name, fault);
                return FillResult::BackendError(BackendError::NativeFault(fault.0));
            }
            Ok(WorkerOutcome::Finished(Err(CallError::Panicked(message))))
            | Ok(WorkerOutcome::Panicked(message)) => {
                warn!("{}: native module panicked: {}", self.name, message);
                return FillResult::BackendError(BackendError::Panicked(message));
            }
            Ok(WorkerOutcome::Abandoned) => return FillResult::TimedOut,
            Err(e) => return FillResult::BackendError(e),
        };

        if control.is_cancelled() {
            return FillResult::Cancelled;
        }
        match NativeResponse::decode(&bytes) {
            Ok(response) => {
                response.into_result(grid, dictionary, config.heuristics.allows_duplicates())
            }
            Err(e) => FillResult::BackendError(e),
        }
    }
}
