//! Dashboard data feed
//!
//! The dashboard shows a system-efficiency figure and the light state of one
//! demo intersection. Where those values come from is behind
//! [`DashboardSource`]: [`SimulatedSource`] perturbs them randomly,
//! [`BackendSource`] reads them from `/api/traffic/status`. [`spawn_feed`]
//! polls either one on a timer.

mod simulator;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::TrafficApi;
use crate::error::Error;

pub use simulator::SimulatedSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

impl LightState {
    /// Red, then yellow, then green, then red again
    pub fn next(self) -> Self {
        match self {
            LightState::Red => LightState::Yellow,
            LightState::Yellow => LightState::Green,
            LightState::Green => LightState::Red,
        }
    }
}

/// One reading of the dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// System efficiency in percent
    pub efficiency: f64,
    pub active_nodes: u32,
    pub lights: BTreeMap<Direction, LightState>,
    /// Raw backend payload, when the snapshot came from the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
    pub taken_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            efficiency: 92.0,
            active_nodes: 4,
            lights: BTreeMap::from([
                (Direction::North, LightState::Red),
                (Direction::East, LightState::Green),
                (Direction::South, LightState::Red),
                (Direction::West, LightState::Green),
            ]),
            metrics: None,
            taken_at: Utc::now(),
        }
    }
}

/// Produces dashboard snapshots
#[async_trait]
pub trait DashboardSource: Send {
    async fn snapshot(&mut self) -> Result<Snapshot, Error>;
}

/// Reads the dashboard figures from the traffic status endpoint
pub struct BackendSource {
    api: TrafficApi,
    last: Snapshot,
}

impl BackendSource {
    pub fn new(api: TrafficApi) -> Self {
        Self {
            api,
            last: Snapshot::default(),
        }
    }
}

#[async_trait]
impl DashboardSource for BackendSource {
    async fn snapshot(&mut self) -> Result<Snapshot, Error> {
        let response = self.api.status().await?;
        let data = response
            .data
            .data
            .ok_or_else(|| Error::invalid_response("Traffic status without data"))?;
        self.last = snapshot_from_status(data, &self.last);
        Ok(self.last.clone())
    }
}

/// Map a traffic status payload onto a snapshot, keeping `previous` values
/// for anything the payload lacks
fn snapshot_from_status(data: Value, previous: &Snapshot) -> Snapshot {
    let stats = &data["system_stats"];
    let efficiency = stats["average_efficiency"]
        .as_f64()
        .unwrap_or(previous.efficiency);
    let active_nodes = stats["active_intersections"]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(previous.active_nodes);

    // Intersections are keyed by id; show the first one
    let lights = data["intersections"]
        .as_object()
        .and_then(|intersections| {
            let mut ids: Vec<&String> = intersections.keys().collect();
            ids.sort();
            let first = ids.first()?;
            intersections[first.as_str()]["current_phase"].as_str()
        })
        .and_then(lights_for_phase)
        .unwrap_or_else(|| previous.lights.clone());

    Snapshot {
        efficiency,
        active_nodes,
        lights,
        metrics: Some(data),
        taken_at: Utc::now(),
    }
}

/// Light states for a phase name such as `north_south_green`
fn lights_for_phase(phase: &str) -> Option<BTreeMap<Direction, LightState>> {
    let (axis, state) = phase.rsplit_once('_')?;
    let state = match state {
        "green" => LightState::Green,
        "yellow" => LightState::Yellow,
        "red" => LightState::Red,
        _ => return None,
    };
    let (active, crossing) = match axis {
        "north_south" => (
            [Direction::North, Direction::South],
            [Direction::East, Direction::West],
        ),
        "east_west" => (
            [Direction::East, Direction::West],
            [Direction::North, Direction::South],
        ),
        _ => return None,
    };

    let mut lights = BTreeMap::new();
    for direction in active {
        lights.insert(direction, state);
    }
    for direction in crossing {
        lights.insert(direction, LightState::Red);
    }
    Some(lights)
}

/// A running feed; dropping it stops the polling task
pub struct FeedHandle {
    updates: watch::Receiver<Snapshot>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Snapshot {
        self.updates.borrow().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Publish `initial`, then a fresh snapshot from `source` every `period`.
///
/// A failing source is logged and the previous snapshot stays published.
pub fn spawn_feed<S>(mut source: S, initial: Snapshot, period: Duration) -> FeedHandle
where
    S: DashboardSource + 'static,
{
    let (tx, updates) = watch::channel(initial);
    let task = tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            match source.snapshot().await {
                Ok(snapshot) => {
                    if tx.send(snapshot).is_err() {
                        debug!("Dashboard feed has no subscribers left");
                        break;
                    }
                }
                Err(e) => warn!("Dashboard source failed, keeping last snapshot: {}", e),
            }
        }
    });
    FeedHandle { updates, task }
}
