//! Analysis jobs and the executors that run them
//!
//! A job is one extractor invocation for one channel and one round. It never
//! fails outward: errors and panics from the extractor become
//! [`Outcome::Failure`]. The finished [`Completion`] is sent back over a
//! channel to the UI context, which is the only way a worker communicates.
//! Submitted work cannot be cancelled; a superseded job runs to the end and
//! its completion is dropped by the staleness check.

use crate::channel::{Channel, Ticket};
use crate::store::Outcome;
use beatlens_analysis::{
    AnalysisError, ChordAnalysis, ChordParams, Extractor, KeyAnalysis, TempoAnalysis, TempoParams,
};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// Channel specific input of a job
#[derive(Debug, Clone)]
pub enum JobRequest {
    Tempo(TempoParams),
    Key,
    /// `ticks` present means beat-synchronized detection
    Chords {
        params: ChordParams,
        ticks: Option<Arc<[f32]>>,
    },
}

/// Channel specific outcome of a job
#[derive(Debug, Clone)]
pub enum JobResult {
    Tempo(Outcome<TempoAnalysis>),
    Key(Outcome<KeyAnalysis>),
    Chords(Outcome<ChordAnalysis>),
}

impl JobResult {
    pub fn channel(&self) -> Channel {
        match self {
            JobResult::Tempo(_) => Channel::Tempo,
            JobResult::Key(_) => Channel::Key,
            JobResult::Chords(_) => Channel::Chords,
        }
    }

    /// Failure message, if the job failed
    pub fn error(&self) -> Option<&str> {
        match self {
            JobResult::Tempo(Outcome::Failure(m))
            | JobResult::Key(Outcome::Failure(m))
            | JobResult::Chords(Outcome::Failure(m)) => Some(m),
            _ => None,
        }
    }
}

/// A finished job, tagged with the round it was launched for
#[derive(Debug, Clone)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: JobResult,
}

impl Completion {
    pub fn channel(&self) -> Channel {
        self.result.channel()
    }
}

/// One extractor invocation against one source
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub ticket: Ticket,
    pub path: PathBuf,
    pub request: JobRequest,
}

impl AnalysisJob {
    pub fn channel(&self) -> Channel {
        match self.request {
            JobRequest::Tempo(_) => Channel::Tempo,
            JobRequest::Key => Channel::Key,
            JobRequest::Chords { .. } => Channel::Chords,
        }
    }

    /// Run the extractor to completion on the current thread
    pub fn run(self, extractor: &dyn Extractor) -> Completion {
        let AnalysisJob {
            ticket,
            path,
            request,
        } = self;

        let result = match request {
            JobRequest::Tempo(params) => {
                JobResult::Tempo(guarded(|| extractor.tempo(&path, &params)))
            }
            JobRequest::Key => JobResult::Key(guarded(|| extractor.key(&path))),
            JobRequest::Chords { params, ticks } => JobResult::Chords(guarded(|| {
                extractor.chords(&path, &params, ticks.as_deref())
            })),
        };

        Completion { ticket, result }
    }
}

/// Turn an extractor call into an outcome, containing panics
fn guarded<T>(call: impl FnOnce() -> Result<T, AnalysisError>) -> Outcome<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Outcome::Success(Arc::new(value)),
        Ok(Err(e)) => Outcome::Failure(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "extractor panicked".to_string());
            Outcome::Failure(message)
        }
    }
}

/// Unit of work handed to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// One-way task submission; no handle is returned
pub trait Executor: Send + Sync {
    fn submit(&self, name: &str, task: Task);
}

/// Runs every task on its own detached OS thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn submit(&self, name: &str, task: Task) {
        // Kept reachable so the task still runs if the thread cannot start
        let slot = Arc::new(Mutex::new(Some(task)));
        let worker_slot = Arc::clone(&slot);

        let spawned = std::thread::Builder::new()
            .name(format!("beatlens-{}", name))
            .spawn(move || {
                if let Some(task) = worker_slot.lock().take() {
                    task();
                }
            });

        if let Err(e) = spawned {
            tracing::error!("failed to spawn {} worker, running inline: {}", name, e);
            let task = slot.lock().take();
            if let Some(task) = task {
                task();
            }
        }
    }
}

/// Runs every task immediately on the submitting thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn submit(&self, _name: &str, task: Task) {
        task();
    }
}

/// Create the channel completions travel back to the UI context on
pub fn completion_channel() -> (Sender<Completion>, Receiver<Completion>) {
    crossbeam_channel::unbounded()
}

/// Submit a job whose completion is delivered to `completions`
pub fn dispatch(
    executor: &dyn Executor,
    extractor: Arc<dyn Extractor>,
    job: AnalysisJob,
    completions: Sender<Completion>,
) {
    let name = job.channel().name();
    executor.submit(
        name,
        Box::new(move || {
            let completion = job.run(extractor.as_ref());
            if completions.send(completion).is_err() {
                tracing::trace!("completion dropped, UI context is gone");
            }
        }),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted extractor and deferred executor for session tests

    use super::*;
    use beatlens_analysis::TempoMethod;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Holds submitted tasks until the test releases them
    #[derive(Default)]
    pub struct ManualExecutor {
        queue: Mutex<VecDeque<(String, Task)>>,
    }

    impl ManualExecutor {
        pub fn pending(&self) -> Vec<String> {
            self.queue.lock().iter().map(|(n, _)| n.clone()).collect()
        }

        /// Run the oldest queued task with the given name
        pub fn run(&self, name: &str) -> bool {
            let task = {
                let mut queue = self.queue.lock();
                let idx = queue.iter().position(|(n, _)| n == name);
                idx.and_then(|i| queue.remove(i))
            };
            match task {
                Some((_, task)) => {
                    task();
                    true
                }
                None => false,
            }
        }
    }

    impl Executor for ManualExecutor {
        fn submit(&self, name: &str, task: Task) {
            self.queue.lock().push_back((name.to_string(), task));
        }
    }

    /// Extractor returning canned results; a path containing "bad" fails
    #[derive(Default)]
    pub struct FakeExtractor {
        pub chord_calls: AtomicUsize,
        pub beat_synced_calls: AtomicUsize,
    }

    pub fn tempo(ticks: &[f32]) -> TempoAnalysis {
        TempoAnalysis {
            bpm: 120,
            confidence: 3.5,
            ticks: ticks.to_vec(),
            intervals: ticks.windows(2).map(|w| w[1] - w[0]).collect(),
            estimates: vec![120.0],
            method: TempoMethod::MultiFeature,
        }
    }

    fn fails(path: &Path) -> bool {
        path.to_string_lossy().contains("bad")
    }

    impl Extractor for FakeExtractor {
        fn tempo(&self, path: &Path, _: &TempoParams) -> Result<TempoAnalysis, AnalysisError> {
            if fails(path) {
                return Err(AnalysisError::Extraction("no beats".into()));
            }
            Ok(tempo(&[0.5, 1.0, 1.5, 2.0]))
        }

        fn key(&self, path: &Path) -> Result<KeyAnalysis, AnalysisError> {
            if fails(path) {
                return Err(AnalysisError::NoAudioTrack);
            }
            Ok(KeyAnalysis {
                key: path.file_stem().unwrap().to_string_lossy().to_uppercase(),
                scale: "major".into(),
                strength: 0.912345,
            })
        }

        fn chords(
            &self,
            path: &Path,
            _: &ChordParams,
            ticks: Option<&[f32]>,
        ) -> Result<ChordAnalysis, AnalysisError> {
            self.chord_calls.fetch_add(1, Ordering::SeqCst);
            if ticks.is_some() {
                self.beat_synced_calls.fetch_add(1, Ordering::SeqCst);
            }
            if fails(path) {
                return Err(AnalysisError::Decode("corrupt".into()));
            }
            let n = ticks.map_or(5, |t| t.len());
            Ok(ChordAnalysis {
                chords: (0..n).map(|i| format!("C{}", i)).collect(),
                strengths: vec![0.5; n],
                delay: if ticks.is_some() { 0.0 } else { 2.0 },
                beat_synced: ticks.is_some(),
            })
        }
    }
}
