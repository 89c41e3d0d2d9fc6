//! Bounded concurrent executor with first-failure cancellation.
//!
//! # Responsibility
//! - Apply one `NoteWriter` across a note set with at most
//!   `max_in_flight` operations running at once.
//! - Stop dispatching on the first failure (or an elapsed deadline) and
//!   report that failure as the run's terminal error.
//!
//! # Invariants
//! - Notes are admitted in input order; completion order is unspecified.
//! - The cancellation flag is checked before every admission and again by
//!   each task before it starts; in-flight operations are never interrupted.
//! - Only the first reported failure is kept; later outcomes are drained and
//!   counted but never replace it.
//! - `run` returns only after every admitted task has finished, so callers
//!   can roll back the output root without racing writers.

use crate::config::ExecutorConfig;
use crate::model::note::Note;
use crate::pipeline::writer::NoteWriter;
use crate::pipeline::{PipelineError, RunAborted};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Terminal state of one job.
#[derive(Debug)]
enum JobState {
    Succeeded,
    Failed(PipelineError),
    /// Cancellation was observed before the operation started.
    Skipped,
}

/// Single result aggregator for one run.
struct Tally {
    total: usize,
    completed: usize,
    first_error: Option<PipelineError>,
    cancelled: Arc<AtomicBool>,
}

impl Tally {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            first_error: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn fail(&mut self, err: PipelineError) {
        self.cancelled.store(true, Ordering::SeqCst);
        if self.first_error.is_none() {
            self.first_error = Some(err);
        } else {
            debug!(
                "event=pipeline_failure module=pipeline status=ignored error={}",
                err
            );
        }
    }

    fn observe(&mut self, joined: Result<JobState, JoinError>) {
        match joined {
            Ok(JobState::Succeeded) => {
                self.completed += 1;
                debug!(
                    "event=note_write module=pipeline status=ok completed={}/{}",
                    self.completed, self.total
                );
            }
            Ok(JobState::Failed(err)) => self.fail(err),
            Ok(JobState::Skipped) => {}
            Err(err) => self.fail(PipelineError::WorkerPanicked {
                message: err.to_string(),
            }),
        }
    }
}

/// Bounded executor for bulk per-note operations.
#[derive(Debug, Clone, Default)]
pub struct PipelineExecutor {
    config: ExecutorConfig,
}

impl PipelineExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Runs `writer` over `notes`.
    ///
    /// Returns the number of completed operations (always `notes.len()`) on
    /// success, or the completed count together with the first failure.
    pub async fn run(
        &self,
        notes: Vec<Note>,
        writer: Arc<dyn NoteWriter>,
    ) -> Result<usize, RunAborted> {
        let total = notes.len();
        if total == 0 {
            return Ok(0);
        }

        let started_at = Instant::now();
        let deadline = self
            .config
            .deadline
            .map(|limit| tokio::time::Instant::from_std(started_at + limit));
        let max_in_flight = self.config.normalized_max_in_flight();
        info!(
            "event=pipeline_run module=pipeline status=start total={} max_in_flight={}",
            total, max_in_flight
        );

        let semaphore = Arc::new(Semaphore::new(max_in_flight));
        let mut workers: JoinSet<JobState> = JoinSet::new();
        let mut tally = Tally::new(total);
        let mut dispatched = 0usize;

        for (ordinal, note) in notes.into_iter().enumerate() {
            while let Some(joined) = workers.try_join_next() {
                tally.observe(joined);
            }
            if tally.is_cancelled() {
                break;
            }

            let acquire = Arc::clone(&semaphore).acquire_owned();
            let acquired = match deadline {
                Some(at) => tokio::time::timeout_at(at, acquire).await.ok(),
                None => Some(acquire.await),
            };
            let Some(permit) = acquired else {
                tally.fail(PipelineError::DeadlineExceeded {
                    elapsed_ms: started_at.elapsed().as_millis(),
                });
                break;
            };
            let Ok(permit) = permit else {
                // The semaphore is owned by this run and never closed.
                break;
            };
            if deadline.is_some_and(|at| tokio::time::Instant::now() >= at) {
                tally.fail(PipelineError::DeadlineExceeded {
                    elapsed_ms: started_at.elapsed().as_millis(),
                });
                break;
            }
            // The freed slot may belong to a task that just failed.
            if tally.is_cancelled() {
                break;
            }

            let cancelled = Arc::clone(&tally.cancelled);
            let task_writer = Arc::clone(&writer);
            workers.spawn_blocking(move || {
                let _permit = permit;
                if cancelled.load(Ordering::SeqCst) {
                    return JobState::Skipped;
                }
                match task_writer.write(&note, ordinal) {
                    Ok(()) => JobState::Succeeded,
                    Err(err) => {
                        cancelled.store(true, Ordering::SeqCst);
                        error!(
                            "event=note_write module=pipeline status=error note_id={} key={} ordinal={} error={}",
                            note.id,
                            note.key(),
                            ordinal,
                            err
                        );
                        JobState::Failed(PipelineError::Operation {
                            note_id: note.id.clone(),
                            key: note.key(),
                            source: err,
                        })
                    }
                }
            });
            dispatched += 1;
        }

        while let Some(joined) = workers.join_next().await {
            tally.observe(joined);
        }

        let duration_ms = started_at.elapsed().as_millis();
        let completed = tally.completed;
        match tally.first_error {
            None if completed == total => {
                info!(
                    "event=pipeline_run module=pipeline status=ok completed={} duration_ms={}",
                    completed, duration_ms
                );
                Ok(completed)
            }
            None => Err(RunAborted {
                completed,
                error: PipelineError::Incomplete {
                    completed,
                    dispatched,
                    total,
                },
            }),
            Some(error) => {
                warn!(
                    "event=pipeline_run module=pipeline status=aborted completed={} dispatched={} total={} duration_ms={} error={}",
                    completed, dispatched, total, duration_ms, error
                );
                Err(RunAborted { completed, error })
            }
        }
    }
}
