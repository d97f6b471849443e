//! Run on a worker thread, streaming snapshots over a bounded channel.
//!
//! The worker sends every snapshot through a `crossbeam-channel` with
//! bounded capacity, so a slow consumer applies backpressure at emission
//! boundaries. Dropping the [`RunHandle`], or any failed send, clears the
//! running flag; the worker notices at the next batch boundary.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

use super::report::{FinalResult, ProgressSnapshot};
use super::state::StopHandle;
use super::SimulationRun;
use crate::domains::Estimator;
use crate::error::{SimError, SimResult};

impl<E> SimulationRun<E>
where
    E: Estimator + Send + 'static,
{
    /// Move the run onto a worker thread.
    ///
    /// At most `capacity` snapshots wait in the channel; a capacity of zero
    /// makes every send a rendezvous with the consumer.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Io`] if the thread cannot be spawned.
    pub fn spawn(self, capacity: usize) -> SimResult<RunHandle> {
        let (sender, receiver) = bounded(capacity);
        let stop = self.stop_handle();
        let worker_stop = stop.clone();

        let worker = std::thread::Builder::new()
            .name("montesim-run".to_string())
            .spawn(move || {
                let mut run = self;
                while let Some(item) = run.next() {
                    let failed = item.is_err();
                    if sender.send(item).is_err() {
                        debug!("snapshot receiver closed, stopping run");
                        worker_stop.stop();
                    }
                    if failed {
                        break;
                    }
                }
                run.final_result()
            })?;

        Ok(RunHandle {
            receiver,
            stop,
            worker: Some(worker),
        })
    }
}

/// Consumer side of a streamed run.
#[derive(Debug)]
pub struct RunHandle {
    receiver: Receiver<SimResult<ProgressSnapshot>>,
    stop: StopHandle,
    worker: Option<JoinHandle<SimResult<FinalResult>>>,
}

impl RunHandle {
    /// Block for the next snapshot; `None` once the run has ended.
    #[must_use]
    pub fn recv(&self) -> Option<SimResult<ProgressSnapshot>> {
        self.receiver.recv().ok()
    }

    /// Block for the next snapshot for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RecvTimeoutError::Timeout`] if nothing arrived in time and
    /// [`RecvTimeoutError::Disconnected`] once the run has ended.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<SimResult<ProgressSnapshot>, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator over the remaining snapshots.
    pub fn iter(&self) -> impl Iterator<Item = SimResult<ProgressSnapshot>> + '_ {
        self.receiver.iter()
    }

    /// Ask the worker to stop at the next batch boundary.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle sharing the run's running flag.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the worker and return the final result.
    ///
    /// Snapshots not yet received are drained and discarded so the worker
    /// can run to its end.
    ///
    /// # Errors
    ///
    /// - [`SimError::RunFailed`] if the run aborted
    /// - [`SimError::Disconnected`] if the worker thread panicked
    pub fn join(mut self) -> SimResult<FinalResult> {
        for _ in self.receiver.iter() {}
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| SimError::Disconnected("run worker panicked".to_string()))?,
            None => Err(SimError::Disconnected("run worker already joined".to_string())),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop.stop();
        }
    }
}
