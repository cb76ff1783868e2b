use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

use super::{CombineStatistic, CosmicRayParams, FileList, ReductionEngine, ScratchSpace};

const STAGED_PREFIX: &str = ".oes-staged-";

/// Wraps an engine with a per-call deadline.
///
/// Each call runs on its own worker thread and writes to staged files next to
/// its real outputs. The staged files are moved into place only when the call
/// succeeds within the deadline. When the deadline passes the call is reported
/// as a `ReductionEngineFailure`; the worker finishes in the background and its
/// staged outputs are discarded, so nothing appears under the real output
/// names after the caller has given up.
pub struct TimeoutEngine {
    inner: Arc<dyn ReductionEngine>,
    timeout: Duration,
    scratch: ScratchSpace,
    name: String,
}

impl TimeoutEngine {
    pub fn new(inner: Arc<dyn ReductionEngine>, timeout: Duration) -> Self {
        let name = format!("{} (timeout {:?})", inner.name(), timeout);
        Self {
            inner,
            timeout,
            scratch: ScratchSpace::default(),
            name,
        }
    }

    /// Where the staged output lists are written.
    pub fn with_scratch(mut self, scratch: ScratchSpace) -> Self {
        self.scratch = scratch;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run<F>(&self, operation: &'static str, staged: StagedOutputs, call: F) -> Result<()>
    where
        F: FnOnce(&dyn ReductionEngine) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let abandoned = Arc::new(Mutex::new(false));
        let worker_abandoned = Arc::clone(&abandoned);
        let inner = Arc::clone(&self.inner);

        thread::Builder::new()
            .name(format!("oes-{operation}"))
            .spawn(move || {
                let result = call(inner.as_ref());
                // Commit under the lock: the caller sees a result or an
                // abandoned call, never a half-committed one.
                let abandoned = worker_abandoned
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if *abandoned {
                    debug!(operation, "Discarding outputs of abandoned call");
                    return;
                }
                let result = result.and_then(|()| staged.commit());
                let _ = tx.send(result);
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                let mut flag = abandoned.lock().unwrap_or_else(PoisonError::into_inner);
                // The worker may have committed while we waited for the lock.
                if let Ok(result) = rx.try_recv() {
                    return result;
                }
                *flag = true;
                warn!(operation, timeout = ?self.timeout, "Reduction engine call timed out");
                Err(PipelineError::engine(
                    operation,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PipelineError::engine(
                operation,
                "worker thread exited without a result",
            )),
        }
    }
}

impl ReductionEngine for TimeoutEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn combine(
        &self,
        inputs: &FileList,
        output: &Path,
        statistic: CombineStatistic,
    ) -> Result<()> {
        let staged = StagedOutputs::new(&[output.to_path_buf()])?;
        let inputs = inputs.clone();
        let output = staged.paths().remove(0);
        self.run("combine", staged, move |engine| {
            engine.combine(&inputs, &output, statistic)
        })
    }

    fn subtract(&self, inputs: &FileList, reference: &Path, outputs: &FileList) -> Result<()> {
        let staged = StagedOutputs::new(outputs.entries())?;
        let outputs = self.scratch.list(&staged.paths())?;
        let inputs = inputs.clone();
        let reference = reference.to_path_buf();
        self.run("subtract", staged, move |engine| {
            engine.subtract(&inputs, &reference, &outputs)
        })
    }

    fn reject_cosmic_rays(
        &self,
        inputs: &FileList,
        outputs: &FileList,
        params: &CosmicRayParams,
    ) -> Result<()> {
        let staged = StagedOutputs::new(outputs.entries())?;
        let outputs = self.scratch.list(&staged.paths())?;
        let inputs = inputs.clone();
        let params = params.clone();
        self.run("reject-cosmic-rays", staged, move |engine| {
            engine.reject_cosmic_rays(&inputs, &outputs, &params)
        })
    }
}

/// Placeholder files an engine call writes to instead of its real outputs.
///
/// Dropping without [`commit`](Self::commit) deletes every staged file.
struct StagedOutputs {
    staged: Vec<(TempPath, PathBuf)>,
}

impl StagedOutputs {
    /// Reserve one staged file per target, in the target's directory so the
    /// final rename never crosses filesystems.
    fn new(targets: &[PathBuf]) -> Result<Self> {
        let mut staged = Vec::with_capacity(targets.len());
        for target in targets {
            let dir = match target.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let suffix = target
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let temp = Builder::new()
                .prefix(STAGED_PREFIX)
                .suffix(&suffix)
                .tempfile_in(dir)?
                .into_temp_path();
            staged.push((temp, target.clone()));
        }
        Ok(Self { staged })
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.staged.iter().map(|(temp, _)| temp.to_path_buf()).collect()
    }

    fn commit(self) -> Result<()> {
        for (temp, target) in self.staged {
            temp.persist(&target).map_err(|e| e.error)?;
        }
        Ok(())
    }
}
