use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{DashboardSource, Direction, Snapshot};
use crate::error::Error;

const EFFICIENCY_MIN: f64 = 85.0;
const EFFICIENCY_MAX: f64 = 98.0;
const EFFICIENCY_STEP: f64 = 3.0;
const NUDGE_PROBABILITY: f64 = 0.3;

/// Demo source that wanders around plausible values without a backend
pub struct SimulatedSource {
    rng: StdRng,
    current: Snapshot,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            current: Snapshot::default(),
        }
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    fn step(&mut self) -> Snapshot {
        let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
        if let Some(light) = self.current.lights.get_mut(&direction) {
            *light = light.next();
        }

        if self.rng.gen_bool(NUDGE_PROBABILITY) {
            let delta = self.rng.gen_range(-EFFICIENCY_STEP..=EFFICIENCY_STEP);
            self.current.efficiency =
                (self.current.efficiency + delta).clamp(EFFICIENCY_MIN, EFFICIENCY_MAX);
        }

        self.current.taken_at = Utc::now();
        self.current.clone()
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DashboardSource for SimulatedSource {
    async fn snapshot(&mut self) -> Result<Snapshot, Error> {
        Ok(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::LightState;

    #[test]
    fn starts_from_dashboard_defaults() {
        let source = SimulatedSource::seeded(1);
        let snapshot = source.current();
        assert_eq!(snapshot.efficiency, 92.0);
        assert_eq!(snapshot.active_nodes, 4);
        assert_eq!(snapshot.lights[&Direction::North], LightState::Red);
        assert_eq!(snapshot.lights[&Direction::East], LightState::Green);
        assert_eq!(snapshot.lights[&Direction::South], LightState::Red);
        assert_eq!(snapshot.lights[&Direction::West], LightState::Green);
    }

    #[tokio::test]
    async fn efficiency_stays_in_range() {
        let mut source = SimulatedSource::seeded(42);
        for _ in 0..2_000 {
            let snapshot = source.snapshot().await.unwrap();
            assert!(
                (EFFICIENCY_MIN..=EFFICIENCY_MAX).contains(&snapshot.efficiency),
                "efficiency {} out of range",
                snapshot.efficiency
            );
        }
    }

    #[tokio::test]
    async fn each_tick_advances_exactly_one_light() {
        let mut source = SimulatedSource::seeded(9);
        let mut previous = source.current().clone();
        for _ in 0..200 {
            let snapshot = source.snapshot().await.unwrap();
            let changed: Vec<_> = Direction::ALL
                .iter()
                .filter(|d| snapshot.lights[d] != previous.lights[d])
                .collect();
            assert_eq!(changed.len(), 1);
            let direction = changed[0];
            assert_eq!(snapshot.lights[direction], previous.lights[direction].next());
            previous = snapshot;
        }
    }

    #[tokio::test]
    async fn same_seed_same_sequence() {
        let mut a = SimulatedSource::seeded(3);
        let mut b = SimulatedSource::seeded(3);
        for _ in 0..20 {
            let (x, y) = (a.snapshot().await.unwrap(), b.snapshot().await.unwrap());
            assert_eq!(x.lights, y.lights);
            assert_eq!(x.efficiency, y.efficiency);
        }
    }
}
