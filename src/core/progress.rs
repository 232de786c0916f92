//! Progress of one analysis run.
//!
//! The run only holds a [`ProgressReporter`] and sends [`ProgressEvent`]s. The caller owns
//! the [`ProgressTracker`], which applies them to a [`ProgressState`] and publishes every
//! new snapshot on a watch channel for concurrent readers.

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::merge::Merge;
use crate::error::{CloudReadyError, Result};

/// Phases of an analysis run, in order
pub const ANALYSIS_PHASES: [&str; 7] = [
    "setup",
    "signal_scanning",
    "batch_merge",
    "architecture_analysis",
    "llm_analysis",
    "score_calculation",
    "recommendation_generation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressState {
    pub phases: Vec<String>,
    pub current_phase: Option<String>,
    pub phase_progress: u64,
    pub phase_total: u64,
    pub overall_progress: f64,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub detailed_status: Map<String, Value>,
}

impl ProgressState {
    pub fn new<S: AsRef<str>>(phases: &[S]) -> Self {
        Self {
            phases: phases.iter().map(|p| p.as_ref().to_string()).collect(),
            current_phase: None,
            phase_progress: 0,
            phase_total: 0,
            overall_progress: 0.0,
            status: RunStatus::Running,
            error: None,
            detailed_status: Map::new(),
        }
    }

    /// Move to a named phase and reset in-phase progress. Earlier phases may be re-entered.
    pub fn advance(&mut self, phase: &str) -> Result<()> {
        if !self.phases.iter().any(|p| p == phase) {
            return Err(CloudReadyError::UnknownPhase(phase.to_string()));
        }
        self.current_phase = Some(phase.to_string());
        self.phase_progress = 0;
        self.phase_total = 0;
        self.recompute();
        Ok(())
    }

    pub fn set_item_total(&mut self, total: u64) {
        self.phase_total = total;
        self.recompute();
    }

    pub fn increment(&mut self, by: u64) {
        self.phase_progress += by;
        self.recompute();
    }

    /// Replace one detail entry
    pub fn set_detail(&mut self, key: &str, value: Value) {
        self.detailed_status.insert(key.to_string(), value);
    }

    /// Fold a value into one detail entry using the batch merge rules
    pub fn merge_detail(&mut self, key: &str, value: Value) {
        self.detailed_status
            .entry(key.to_string())
            .or_insert(Value::Null)
            .merge(value);
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.overall_progress = 100.0;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(message.into());
    }

    fn phase_index(&self) -> Option<usize> {
        let current = self.current_phase.as_deref()?;
        self.phases.iter().position(|p| p == current)
    }

    fn recompute(&mut self) {
        let (Some(index), false) = (self.phase_index(), self.phases.is_empty()) else {
            self.overall_progress = 0.0;
            return;
        };

        let phase_count = self.phases.len() as f64;
        let within = if self.phase_total > 0 {
            (self.phase_progress as f64 / self.phase_total as f64).min(1.0)
        } else {
            0.0
        };

        let overall = index as f64 / phase_count * 100.0 + within * (1.0 / phase_count) * 100.0;
        self.overall_progress = overall.clamp(0.0, 100.0);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Phase(String),
    ItemTotal(u64),
    Increment(u64),
    Detail { key: String, value: Value },
    MergeDetail { key: String, value: Value },
    Completed,
    Failed(String),
}

/// Sending half, held by the analysis run
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// A reporter that drops every event
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A dropped tracker only means nobody is watching
            let _ = tx.send(event);
        }
    }

    pub fn phase(&self, phase: &str) {
        debug!("Entering phase {}", phase);
        self.send(ProgressEvent::Phase(phase.to_string()));
    }

    pub fn item_total(&self, total: u64) {
        self.send(ProgressEvent::ItemTotal(total));
    }

    pub fn increment(&self, by: u64) {
        self.send(ProgressEvent::Increment(by));
    }

    pub fn detail(&self, key: &str, value: Value) {
        self.send(ProgressEvent::Detail {
            key: key.to_string(),
            value,
        });
    }

    pub fn merge_detail(&self, key: &str, value: Value) {
        self.send(ProgressEvent::MergeDetail {
            key: key.to_string(),
            value,
        });
    }

    pub fn completed(&self) {
        self.send(ProgressEvent::Completed);
    }

    pub fn failed(&self, message: impl Into<String>) {
        self.send(ProgressEvent::Failed(message.into()));
    }
}

/// Receiving half, owned by the caller of the run
pub struct ProgressTracker {
    state: ProgressState,
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    snapshots: watch::Sender<ProgressState>,
}

/// Create a connected reporter and tracker for the given phase list
pub fn progress_channel<S: AsRef<str>>(phases: &[S]) -> (ProgressReporter, ProgressTracker) {
    let (tx, events) = mpsc::unbounded_channel();
    let state = ProgressState::new(phases);
    let (snapshots, _) = watch::channel(state.clone());

    (
        ProgressReporter { tx: Some(tx) },
        ProgressTracker {
            state,
            events,
            snapshots,
        },
    )
}

impl ProgressTracker {
    pub fn subscribe(&self) -> watch::Receiver<ProgressState> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn apply(&mut self, event: ProgressEvent) -> Result<()> {
        match event {
            ProgressEvent::Phase(phase) => self.state.advance(&phase)?,
            ProgressEvent::ItemTotal(total) => self.state.set_item_total(total),
            ProgressEvent::Increment(by) => self.state.increment(by),
            ProgressEvent::Detail { key, value } => self.state.set_detail(&key, value),
            ProgressEvent::MergeDetail { key, value } => self.state.merge_detail(&key, value),
            ProgressEvent::Completed => self.state.complete(),
            ProgressEvent::Failed(message) => self.state.fail(message),
        }
        self.snapshots.send_replace(self.state.clone());
        Ok(())
    }

    /// Apply events until every reporter is dropped, then return the final state
    pub async fn run(mut self) -> ProgressState {
        while let Some(event) = self.events.recv().await {
            if let Err(e) = self.apply(event) {
                warn!("Ignoring progress event: {}", e);
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overall_progress_formula() {
        let mut state = ProgressState::new(&["a", "b", "c", "d"]);
        state.advance("b").unwrap();
        assert_eq!(state.overall_progress, 25.0);

        state.set_item_total(4);
        state.increment(2);
        assert_eq!(state.overall_progress, 37.5);

        state.advance("a").unwrap();
        assert_eq!(state.phase_progress, 0);
        assert_eq!(state.overall_progress, 0.0);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        let mut state = ProgressState::new(&ANALYSIS_PHASES);
        assert!(matches!(state.advance("deploy"), Err(CloudReadyError::UnknownPhase(_))));
        assert_eq!(state.current_phase, None);
    }

    #[test]
    fn test_terminal_states() {
        let mut state = ProgressState::new(&ANALYSIS_PHASES);
        state.advance("setup").unwrap();
        state.complete();
        assert_eq!(state.status, RunStatus::Completed);
        assert_eq!(state.overall_progress, 100.0);

        let mut state = ProgressState::new(&ANALYSIS_PHASES);
        state.fail("no files");
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("no files"));
    }

    #[test]
    fn test_merge_detail_accumulates() {
        let mut state = ProgressState::new(&ANALYSIS_PHASES);
        state.merge_detail("scanned", json!({"files": 3, "languages": ["python"]}));
        state.merge_detail("scanned", json!({"files": 2, "languages": ["go"]}));

        assert_eq!(
            state.detailed_status["scanned"],
            json!({"files": 5, "languages": ["python", "go"]})
        );
    }

    #[tokio::test]
    async fn test_tracker_publishes_snapshots() {
        let (reporter, tracker) = progress_channel(&ANALYSIS_PHASES);
        let mut snapshots = tracker.subscribe();
        let handle = tokio::spawn(tracker.run());

        reporter.phase("signal_scanning");
        reporter.item_total(2);
        reporter.increment(1);
        reporter.phase("not_a_phase");
        reporter.completed();
        drop(reporter);

        let final_state = handle.await.unwrap();
        assert_eq!(final_state.current_phase.as_deref(), Some("signal_scanning"));
        assert_eq!(final_state.phase_progress, 1);
        assert_eq!(final_state.status, RunStatus::Completed);

        assert_eq!(snapshots.borrow_and_update().status, RunStatus::Completed);
    }
}
