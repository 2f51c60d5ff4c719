//! Batch job events, in delivery order: zero or more `Progress`, then exactly
//! one terminal event.

use serde::Serialize;

/// Event names for a GUI bridge
pub mod names {
    pub const PROGRESS: &str = "training:progress";
    pub const COMPLETED: &str = "training:completed";
    pub const CANCELLED: &str = "training:cancelled";
    pub const FAILED: &str = "training:failed";
}

/// What happened to one crop type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Trained,
    /// Artifact already present
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Progress {
        index: usize,
        total: usize,
        /// (index + 1) / total
        fraction: f64,
        crop_type: String,
        outcome: ItemOutcome,
    },
    Completed {
        trained: usize,
        skipped: usize,
    },
    Cancelled {
        processed: usize,
    },
    Failed {
        crop_type: String,
        message: String,
    },
}

impl BatchEvent {
    pub fn progress(index: usize, total: usize, crop_type: &str, outcome: ItemOutcome) -> Self {
        BatchEvent::Progress {
            index,
            total,
            fraction: (index + 1) as f64 / total as f64,
            crop_type: crop_type.to_string(),
            outcome,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::Progress { .. } => names::PROGRESS,
            BatchEvent::Completed { .. } => names::COMPLETED,
            BatchEvent::Cancelled { .. } => names::CANCELLED,
            BatchEvent::Failed { .. } => names::FAILED,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchEvent::Progress { .. })
    }

    /// Whole-percent progress as the desktop progress bar shows it
    pub fn percent(&self) -> Option<u8> {
        match self {
            BatchEvent::Progress { index, total, .. } => Some(((index + 1) * 100 / total) as u8),
            _ => None,
        }
    }
}
