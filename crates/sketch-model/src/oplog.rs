//! Usage log: click and execution timestamps per user-facing operation.
//!
//! Serialized flat, one array per series:
//! `{"penClicks": [..], "penExecuted": [..], "snapshotSwitches": [..], ...}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// User-facing operations tracked by the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Pen,
    Lasso,
    Undo,
    Redo,
    Clear,
    Save,
    Export,
    Import,
    ToggleSelected,
    ToggleStrokeList,
    ShowInactive,
    // Executed-only series.
    SnapshotSwitch,
    ToggleActive,
    StrokeDrawn,
}

impl Operation {
    pub const ALL: [Operation; 14] = [
        Operation::Pen,
        Operation::Lasso,
        Operation::Undo,
        Operation::Redo,
        Operation::Clear,
        Operation::Save,
        Operation::Export,
        Operation::Import,
        Operation::ToggleSelected,
        Operation::ToggleStrokeList,
        Operation::ShowInactive,
        Operation::SnapshotSwitch,
        Operation::ToggleActive,
        Operation::StrokeDrawn,
    ];

    fn stem(self) -> &'static str {
        match self {
            Operation::Pen => "pen",
            Operation::Lasso => "lasso",
            Operation::Undo => "undo",
            Operation::Redo => "redo",
            Operation::Clear => "clear",
            Operation::Save => "save",
            Operation::Export => "export",
            Operation::Import => "import",
            Operation::ToggleSelected => "toggleSelected",
            Operation::ToggleStrokeList => "toggleStrokeList",
            Operation::ShowInactive => "showInactive",
            Operation::SnapshotSwitch => "snapshotSwitches",
            Operation::ToggleActive => "toggleActiveHistory",
            Operation::StrokeDrawn => "strokesDrawn",
        }
    }

    /// Whether the operation records clicks separately from executions.
    pub fn has_clicks(self) -> bool {
        !matches!(
            self,
            Operation::SnapshotSwitch | Operation::ToggleActive | Operation::StrokeDrawn
        )
    }

    fn clicks_key(self) -> Option<String> {
        self.has_clicks().then(|| format!("{}Clicks", self.stem()))
    }

    fn executed_key(self) -> String {
        if self.has_clicks() {
            format!("{}Executed", self.stem())
        } else {
            self.stem().to_string()
        }
    }
}

/// Timestamped operation counts, in wall-clock ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    series: BTreeMap<String, Vec<i64>>,
}

impl Default for OperationLog {
    fn default() -> Self {
        let mut series = BTreeMap::new();
        for op in Operation::ALL {
            if let Some(key) = op.clicks_key() {
                series.insert(key, Vec::new());
            }
            series.insert(op.executed_key(), Vec::new());
        }
        Self { series }
    }
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the control for `op` was activated.
    pub fn record_click(&mut self, op: Operation, wall_ms: i64) {
        if let Some(key) = op.clicks_key() {
            self.series.entry(key).or_default().push(wall_ms);
        }
    }

    /// Record that `op` actually ran.
    pub fn record_executed(&mut self, op: Operation, wall_ms: i64) {
        self.series.entry(op.executed_key()).or_default().push(wall_ms);
    }

    /// Record a click immediately followed by its execution.
    pub fn record(&mut self, op: Operation, wall_ms: i64) {
        self.record_click(op, wall_ms);
        self.record_executed(op, wall_ms);
    }

    pub fn clicks(&self, op: Operation) -> &[i64] {
        op.clicks_key()
            .and_then(|key| self.series.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn executed(&self, op: Operation) -> &[i64] {
        self.series
            .get(&op.executed_key())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
