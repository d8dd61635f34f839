use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::metrics::MetricsCollector;
use super::scenario::{ScenarioEngine, pick_scenario, think_duration};

/// Cooperative stop flag, checked by every user between scenario
/// iterations. In-flight scenarios are allowed to finish.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Everything one virtual-user task needs, shared by reference with the
/// runner and its siblings.
#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    pub engine: Arc<ScenarioEngine>,
    pub collector: Arc<MetricsCollector>,
    pub stop: Arc<StopSignal>,
    pub active_users: Arc<AtomicU64>,
    pub seed: Option<u64>,
}

/// Drives one simulated user: weighted scenario selection, execution,
/// think-time, repeat until stopped. Scenario-level failures are absorbed
/// into the metrics; nothing here unwinds the loop.
pub async fn simulate_user(ctx: VuContext) {
    // A derived per-user stream keeps seeded runs reproducible without the
    // users contending over one RNG.
    let mut rng = match ctx.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(ctx.vu_id)),
        None => StdRng::from_entropy(),
    };

    let count = ctx.active_users.fetch_add(1, Ordering::AcqRel) + 1;
    ctx.collector.update_active_users(count);

    let config = ctx.engine.config();
    let total_weight = config.total_weight() as f64;

    while !ctx.stop.is_stopped() {
        let draw = rng.gen_range(0.0..total_weight);
        let scenario = pick_scenario(&config.scenarios, draw);
        ctx.engine.execute(scenario.flow, &mut rng).await;

        if ctx.stop.is_stopped() {
            break;
        }
        tokio::time::sleep(think_duration(&mut rng, &config.think_time)).await;
    }

    let count = ctx.active_users.fetch_sub(1, Ordering::AcqRel) - 1;
    ctx.collector.update_active_users(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_signal_is_sticky() {
        let signal = StopSignal::new();
        assert!(!signal.is_stopped());
        signal.stop();
        assert!(signal.is_stopped());
        signal.stop();
        assert!(signal.is_stopped());
    }

    #[test]
    fn seeded_users_get_distinct_streams() {
        let mut a = StdRng::seed_from_u64(10u64.wrapping_add(1));
        let mut b = StdRng::seed_from_u64(10u64.wrapping_add(2));
        let first_a: f64 = a.gen_range(0.0..100.0);
        let first_b: f64 = b.gen_range(0.0..100.0);
        assert_ne!(first_a, first_b);
    }
}
