use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use chrono::{DateTime, Utc};
use price_forecast::metrics::HoldoutReport;
use price_forecast::models::additive::TrainedAdditiveModel;
use price_forecast::models::arima::TrainedArimaModel;
use price_forecast::TimeSeriesData;
use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Loading,
    Ready,
    Failed,
}

/// Where the additive model of a snapshot came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelOrigin {
    Downloaded { url: String },
    FittedLocally,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventEntry {
    pub ts: String,
    pub kind: String,
    pub detail: String,
}

/// Dataset and models loaded together; replaced as a whole on reload
#[derive(Debug)]
pub struct Snapshot {
    pub data: TimeSeriesData,
    pub additive: TrainedAdditiveModel,
    pub origin: ModelOrigin,
    /// `None` when the series is too short for the configured order
    pub arima: Option<TrainedArimaModel>,
    pub validation: Vec<HoldoutReport>,
    pub loaded_at: DateTime<Utc>,
}

/// Served snapshot together with the state of the latest load
#[derive(Debug, Clone)]
pub struct LoadStatus {
    pub snapshot: Option<Arc<Snapshot>>,
    pub phase: LoadPhase,
    pub last_error: Option<String>,
}

pub struct AppState {
    pub config: Config,
    status: RwLock<LoadStatus>,
    events: Mutex<VecDeque<EventEntry>>,
    /// Serialises reloads
    pub(crate) reload_lock: tokio::sync::Mutex<()>,
}

const MAX_EVENTS: usize = 200;

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            status: RwLock::new(LoadStatus {
                snapshot: None,
                phase: LoadPhase::Loading,
                last_error: None,
            }),
            events: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            reload_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn push_event(&self, kind: &str, detail: &str) {
        let entry = EventEntry {
            ts: Utc::now().format("%H:%M:%S").to_string(),
            kind: kind.to_string(),
            detail: detail.to_string(),
        };
        let mut events = lock(&self.events);
        if events.len() >= MAX_EVENTS {
            events.pop_front();
        }
        events.push_back(entry);
    }

    pub fn events(&self) -> Vec<EventEntry> {
        lock(&self.events).iter().cloned().collect()
    }

    /// Snapshot, phase and last error read together
    pub fn status(&self) -> LoadStatus {
        self.read_status().clone()
    }

    /// Currently served snapshot; survives a failed reload
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.read_status().snapshot.clone()
    }

    pub fn phase(&self) -> LoadPhase {
        self.read_status().phase
    }

    pub fn last_error(&self) -> Option<String> {
        self.read_status().last_error.clone()
    }

    pub fn begin_load(&self) {
        self.write_status().phase = LoadPhase::Loading;
    }

    pub fn install(&self, snapshot: Snapshot) {
        let mut status = self.write_status();
        status.snapshot = Some(Arc::new(snapshot));
        status.last_error = None;
        status.phase = LoadPhase::Ready;
    }

    pub fn fail(&self, error: String) {
        let mut status = self.write_status();
        status.last_error = Some(error);
        status.phase = LoadPhase::Failed;
    }

    fn read_status(&self) -> RwLockReadGuard<'_, LoadStatus> {
        self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_status(&self) -> RwLockWriteGuard<'_, LoadStatus> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        let config = Config::from_lookup(|_| None).unwrap();
        AppState::new(config)
    }

    #[test]
    fn failure_updates_phase_and_error_together() {
        let state = state();
        let status = state.status();
        assert_eq!(status.phase, LoadPhase::Loading);
        assert!(status.snapshot.is_none());
        assert!(status.last_error.is_none());

        state.fail("dataset missing".to_string());
        let status = state.status();
        assert_eq!(status.phase, LoadPhase::Failed);
        assert_eq!(status.last_error.as_deref(), Some("dataset missing"));

        state.begin_load();
        let status = state.status();
        assert_eq!(status.phase, LoadPhase::Loading);
        assert_eq!(status.last_error.as_deref(), Some("dataset missing"));
    }

    #[test]
    fn event_log_is_bounded() {
        let state = state();
        for i in 0..MAX_EVENTS + 5 {
            state.push_event("forecast", &i.to_string());
        }
        let events = state.events();
        assert_eq!(events.len(), MAX_EVENTS);
        assert_eq!(events[0].detail, "5");
    }
}
