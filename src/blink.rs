/*!
 # Blink effects

 Runs one toggle loop per blinking lamp. Each loop alternates the lamp between
 off and on every half period, starting with off, until it is cancelled.

 A lamp never has more than one loop: starting a blink on a lamp that is
 already blinking cancels the old loop, and the new loop waits for the old one
 to exit before its first cycle.
*/

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::light::LightStateApplier;
use crate::types::{Credential, Hue, LampId, LightState};
use crate::{Error, Result};

/// Full on+off cycle used when no period is given
pub const DEFAULT_BLINK_PERIOD: Duration = Duration::from_millis(500);

/// A running blink loop
struct BlinkJob {
    hue: Hue,
    period: Duration,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BlinkJob {
    fn cancel(&self) {
        self.cancel.send_replace(true);
    }
}

/// Everything a toggle loop needs, moved into its task
struct ToggleLoop {
    applier: Arc<LightStateApplier>,
    credential: Credential,
    lamp: LampId,
    hue: Hue,
    period: Duration,
}

impl ToggleLoop {
    async fn run(self, previous: Option<JoinHandle<()>>, mut cancelled: watch::Receiver<bool>) {
        if let Some(previous) = previous {
            trace!("Waiting for superseded blink loop on lamp {}", self.lamp);
            let _ = previous.await;
        }

        let half_period = self.period / 2;
        let mut on = false;

        loop {
            if *cancelled.borrow() {
                break;
            }

            let state = LightState::new(on, self.hue);
            // Best effort: a failed cycle never ends the loop
            if let Err(e) = self
                .applier
                .apply_state(&self.credential, self.lamp, state)
                .await
            {
                warn!("Blink cycle on lamp {} failed: {}", self.lamp, e);
            }
            on = !on;

            tokio::select! {
                _ = tokio::time::sleep(half_period) => {}
                // Either cancelled or the job was dropped
                _ = cancelled.changed() => break,
            }
        }

        debug!("Blink loop on lamp {} stopped", self.lamp);
    }
}

/// Keeps at most one blink loop per lamp.
///
/// Dropping the scheduler drops every job's cancel sender, which ends all
/// loops at their next suspension point.
pub struct BlinkScheduler {
    applier: Arc<LightStateApplier>,
    /// `None` once shut down; no job is accepted after that
    jobs: Mutex<Option<HashMap<LampId, BlinkJob>>>,
}

impl BlinkScheduler {
    /// Creates a scheduler with no active jobs
    pub fn new(applier: Arc<LightStateApplier>) -> Self {
        Self {
            applier,
            jobs: Mutex::new(Some(HashMap::new())),
        }
    }

    /// Starts blinking `lamp`, replacing any loop already running on it.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`Error::Shutdown`] after [`BlinkScheduler::shutdown`].
    #[instrument(skip(self, credential))]
    pub fn start_blink(
        &self,
        credential: Credential,
        lamp: LampId,
        hue: Hue,
        period: Duration,
    ) -> Result<()> {
        if period.is_zero() {
            return Err(Error::InvalidPeriod(period));
        }

        let (cancel, cancelled) = watch::channel(false);

        // Hold the lock across cancel + spawn + insert so two callers cannot
        // both register a loop for the same lamp
        let mut guard = self.jobs.lock();
        let jobs = guard.as_mut().ok_or(Error::Shutdown)?;
        let previous = jobs.remove(&lamp).map(|job| {
            debug!("Replacing blink loop on lamp {}", lamp);
            job.cancel();
            job.handle
        });

        let toggle = ToggleLoop {
            applier: Arc::clone(&self.applier),
            credential,
            lamp,
            hue,
            period,
        };
        let handle = tokio::spawn(toggle.run(previous, cancelled));

        jobs.insert(
            lamp,
            BlinkJob {
                hue,
                period,
                cancel,
                handle,
            },
        );

        info!(
            "Lamp {} blinking with hue {} every {:?}",
            lamp,
            hue.value(),
            period
        );
        Ok(())
    }

    /// Stops blinking `lamp`. Returns whether a loop was running.
    #[instrument(skip(self))]
    pub fn stop_blink(&self, lamp: LampId) -> bool {
        let removed = self.jobs.lock().as_mut().and_then(|jobs| jobs.remove(&lamp));
        match removed {
            Some(job) => {
                job.cancel();
                info!("Stopped blinking lamp {}", lamp);
                true
            }
            None => {
                trace!("Lamp {} was not blinking", lamp);
                false
            }
        }
    }

    /// Whether `lamp` currently has a blink loop
    pub fn is_blinking(&self, lamp: LampId) -> bool {
        self.jobs
            .lock()
            .as_ref()
            .is_some_and(|jobs| jobs.contains_key(&lamp))
    }

    /// Hue and period of the loop running on `lamp`
    pub fn blink_settings(&self, lamp: LampId) -> Option<(Hue, Duration)> {
        self.jobs
            .lock()
            .as_ref()
            .and_then(|jobs| jobs.get(&lamp))
            .map(|job| (job.hue, job.period))
    }

    /// Lamps with an active blink loop, in ascending order
    pub fn blinking_lamps(&self) -> Vec<LampId> {
        let mut lamps: Vec<LampId> = self
            .jobs
            .lock()
            .as_ref()
            .map(|jobs| jobs.keys().copied().collect())
            .unwrap_or_default();
        lamps.sort_unstable();
        lamps
    }

    /// Cancels every loop, refuses new ones and waits until all of them have
    /// exited
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let jobs: Vec<BlinkJob> = self
            .jobs
            .lock()
            .take()
            .map(|jobs| jobs.into_values().collect())
            .unwrap_or_default();
        if jobs.is_empty() {
            return;
        }

        debug!("Cancelling {} blink loop(s)", jobs.len());
        let handles: Vec<JoinHandle<()>> = jobs
            .into_iter()
            .map(|job| {
                job.cancel();
                job.handle
            })
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Blink loop ended abnormally: {}", e);
            }
        }
    }
}
