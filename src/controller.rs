//! Load profiles and requester lifecycle.
//!
//! The controller decides how many requesters exist at any moment. It spawns
//! them according to the selected [`LoadProfile`] and then supervises them:
//! the first requester that fails ends the run, and dropping the controller
//! aborts every requester it still owns.

use crate::config::RunConfig;
use crate::requester::{Requester, RequesterContext, RequesterExit};
use crate::EngineError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, info};

/// How requesters are started over the course of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProfile {
    /// A fixed number of requesters for the whole run.
    Steady { requesters: usize },
    /// Start with `start`, add `step` every step period while the total stays
    /// within `target`.
    Progressive {
        start: usize,
        step: usize,
        target: usize,
    },
    /// A few requesters draining a tailed trace as fast as it grows.
    RealTime { requesters: usize },
}

impl LoadProfile {
    /// Pick the profile for `config`.
    ///
    /// Real-time mode wins over progressive, progressive (non-zero progress
    /// rate) over steady. Steady and progressive need a positive target, and
    /// progressive a non-zero step duration.
    pub fn select(config: &RunConfig) -> Result<Self, EngineError> {
        if config.realtime {
            return Ok(LoadProfile::RealTime {
                requesters: config.realtime_requesters,
            });
        }

        let target = usize::try_from(config.tps_target)
            .ok()
            .filter(|target| *target > 0)
            .ok_or(EngineError::InvalidTarget(config.tps_target))?;

        if config.progress_rate != 0 {
            if config.step_duration.is_zero() {
                return Err(EngineError::ZeroStepDuration);
            }
            let start = if config.start_tps == 0 {
                config.progress_rate
            } else {
                config.start_tps
            };
            Ok(LoadProfile::Progressive {
                start,
                step: config.progress_rate,
                target,
            })
        } else {
            Ok(LoadProfile::Steady { requesters: target })
        }
    }
}

/// Requester counts a ramp passes through: `start`, then `start + step`, ...
/// up to the last value not above `target`.
pub fn ramp_levels(start: usize, step: usize, target: usize) -> Vec<usize> {
    let mut levels = vec![start];
    if step == 0 {
        return levels;
    }
    let mut rate = start + step;
    while rate <= target {
        levels.push(rate);
        rate += step;
    }
    levels
}

pub struct LoadController {
    profile: LoadProfile,
    ctx: RequesterContext,
    rng: StdRng,
    requesters: JoinSet<Result<RequesterExit, EngineError>>,
    active: watch::Sender<usize>,
}

impl LoadController {
    /// `active` is updated with the number of requesters started so far.
    pub fn new(profile: LoadProfile, ctx: RequesterContext, active: watch::Sender<usize>) -> Self {
        let rng = StdRng::seed_from_u64(ctx.config.seed);
        Self {
            profile,
            ctx,
            rng,
            requesters: JoinSet::new(),
            active,
        }
    }

    /// Start requesters per the profile, then supervise them until they have
    /// all stopped.
    pub async fn run(mut self) -> Result<(), EngineError> {
        match self.profile {
            LoadProfile::Steady { requesters } => {
                info!("starting, at {} requests/second", requesters);
                self.spawn(requesters);
            }
            LoadProfile::RealTime { requesters } => {
                info!("starting to read the input continuously, ^C to stop");
                self.spawn(requesters);
            }
            LoadProfile::Progressive {
                start,
                step,
                target,
            } => self.ramp(start, step, target).await?,
        }

        while let Some(result) = self.requesters.join_next().await {
            check(result)?;
        }
        debug!("all requesters have stopped");
        Ok(())
    }

    /// Walk the ramp levels, one per step period. One step after the last
    /// level the load settles, then shutdown is raised.
    async fn ramp(&mut self, start: usize, step: usize, target: usize) -> Result<(), EngineError> {
        let config = self.ctx.config.clone();
        let mut steps = interval_at(Instant::now() + config.step_duration, config.step_duration);

        for (i, level) in ramp_levels(start, step, target).into_iter().enumerate() {
            if i > 0 {
                self.next_step(&mut steps).await?;
            }
            let running = *self.active.borrow();
            self.spawn(level - running);
            info!("now at {} requests/second", level);
        }

        self.next_step(&mut steps).await?;
        info!(
            "completed maximum rate, starting {} sec cleanup timer",
            config.settle.as_secs()
        );

        let settle = tokio::time::sleep(config.settle);
        tokio::pin!(settle);
        loop {
            tokio::select! {
                _ = &mut settle => break,
                Some(result) = self.requesters.join_next() => check(result)?,
            }
        }

        info!("ramp finished, stopping requesters");
        self.ctx.shutdown.cancel();
        Ok(())
    }

    /// Wait for the next step tick, reaping requesters that stop meanwhile.
    async fn next_step(&mut self, steps: &mut Interval) -> Result<(), EngineError> {
        loop {
            tokio::select! {
                _ = steps.tick() => return Ok(()),
                Some(result) = self.requesters.join_next() => check(result)?,
            }
        }
    }

    fn spawn(&mut self, count: usize) {
        let first = *self.active.borrow();
        for id in first..first + count {
            let jitter = self.jitter();
            let requester = Requester::new(id, jitter, self.ctx.clone());
            self.requesters.spawn(requester.run());
        }
        self.active.send_replace(first + count);
    }

    /// Start-up delay for the next requester, uniform in [0, 1s).
    fn jitter(&mut self) -> Duration {
        Duration::from_secs_f64(self.rng.random::<f64>())
    }
}

fn check(result: Result<Result<RequesterExit, EngineError>, JoinError>) -> Result<(), EngineError> {
    match result {
        Ok(Ok(exit)) => {
            debug!("requester stopped: {:?}", exit);
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) => Err(EngineError::task("requester", e)),
    }
}
