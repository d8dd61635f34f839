use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

use tokio::time::MissedTickBehavior;

use crate::http::HttpClient;

use super::config::LoadConfig;
use super::error::Result;
use super::metrics::{MetricsCollector, Statistics};
use super::progress::{ProgressEvent, ProgressFn, RunPhase};
use super::report::ReportGenerator;
use super::scenario::ScenarioEngine;
use super::vu::{StopSignal, VuContext, simulate_user};

/// Top-level orchestration: ramp-up, steady state, drain, reporting.
///
/// Phases advance strictly in order — draining cannot begin before the
/// configured duration elapses, and reporting cannot begin before every user
/// task has exited.
pub struct LoadTestRunner {
    config: Arc<LoadConfig>,
    collector: Arc<MetricsCollector>,
    progress: Option<ProgressFn>,
}

impl LoadTestRunner {
    /// Validates the configuration up front; no user is spawned when the
    /// config is rejected.
    pub fn new(config: LoadConfig) -> Result<Self> {
        config.validate()?;
        let collector = Arc::new(MetricsCollector::new(config.thresholds));

        Ok(Self {
            config: Arc::new(config),
            collector,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn collector(&self) -> &Arc<MetricsCollector> {
        &self.collector
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    fn set_phase(&self, phase: RunPhase) {
        if let Some(progress) = &self.progress {
            (progress)(ProgressEvent::Phase(phase));
        }
    }

    /// Runs the whole test and writes the report artifacts. Returns the
    /// terminal statistics snapshot for the caller's console summary and
    /// exit-code policy.
    pub async fn run(&self) -> Result<Statistics> {
        self.set_phase(RunPhase::Idle);

        let client = HttpClient::new(self.config.request_timeout())?;
        let engine = Arc::new(ScenarioEngine::new(
            self.config.clone(),
            client,
            self.collector.clone(),
        ));

        let stop = Arc::new(StopSignal::new());
        let active_users = Arc::new(AtomicU64::new(0));
        let users = self.config.concurrent_users;
        let ramp_up_delay = self.config.ramp_up_delay();

        self.collector.start();
        self.set_phase(RunPhase::RampingUp);

        // Staggered launch: load rises linearly over the ramp-up window
        // instead of arriving as a step function. No delay after the last
        // user.
        let mut handles = Vec::with_capacity(users as usize);
        for vu_id in 1..=users {
            let ctx = VuContext {
                vu_id,
                engine: engine.clone(),
                collector: self.collector.clone(),
                stop: stop.clone(),
                active_users: active_users.clone(),
                seed: self.config.seed,
            };
            handles.push(tokio::spawn(simulate_user(ctx)));

            if vu_id < users && !ramp_up_delay.is_zero() {
                tokio::time::sleep(ramp_up_delay).await;
            }
        }

        self.set_phase(RunPhase::Running);
        let monitor = self.spawn_monitor();

        tokio::time::sleep(self.config.test_duration()).await;

        // Cooperative stop: users finish their in-flight scenario, so total
        // wall clock may overrun the configured duration by up to one
        // scenario's worth of latency.
        self.set_phase(RunPhase::Draining);
        stop.stop();
        for handle in handles {
            handle.await?;
        }

        if let Some(monitor) = monitor {
            monitor.abort();
            let _ = monitor.await;
        }

        self.collector.stop();
        self.set_phase(RunPhase::Reporting);

        let stats = self.collector.statistics();
        let csv = self.collector.to_csv();
        ReportGenerator::new(&self.config).write_all(&stats, &csv)?;

        self.set_phase(RunPhase::Done);
        Ok(stats)
    }

    /// Periodic tick emitter for live output. Aborted before reporting.
    fn spawn_monitor(&self) -> Option<tokio::task::JoinHandle<()>> {
        let progress = self.progress.clone()?;
        let collector = self.collector.clone();
        let interval = self.config.monitor_interval();

        Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;

            let mut last_at = Instant::now();
            let mut last_total = collector.total_requests();

            loop {
                ticker.tick().await;

                let now = Instant::now();
                let dt = now.duration_since(last_at);
                last_at = now;

                let total = collector.total_requests();
                let delta = total.saturating_sub(last_total);
                last_total = total;
                let rps_now = delta as f64 / dt.as_secs_f64().max(1e-9);

                (progress)(ProgressEvent::Tick {
                    elapsed: started.elapsed(),
                    active_users: collector.active_users(),
                    total_requests: total,
                    failed_requests: collector.failed_requests(),
                    rps_now,
                });
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::error::Error;

    #[test]
    fn invalid_config_fails_before_spawning() {
        let config = LoadConfig {
            concurrent_users: 0,
            ..LoadConfig::default()
        };
        assert!(matches!(
            LoadTestRunner::new(config),
            Err(Error::InvalidUsers)
        ));
    }
}
