use crate::error::{Result, SpecmapError};
use crate::paths;
use crate::timestamp;
use crate::plan::{PlanMilestone, TechnicalDecision};
use crate::types::{FeatureStatus, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// TrackingIds
// ---------------------------------------------------------------------------

/// Seed tracking ids handed out when a feature is specified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingIds {
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

impl TrackingIds {
    pub fn seed(feature_num: &str) -> Self {
        Self {
            requirements: vec![format!("{feature_num}-R-001")],
            questions: vec![format!("{feature_num}-Q-001")],
            decisions: vec![format!("{feature_num}-D-001")],
            milestones: vec![format!("{feature_num}-M-001")],
            tasks: vec![format!("{feature_num}-T-001")],
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureRecord
// ---------------------------------------------------------------------------

/// Status fields kept for one feature. Keys this crate does not know about
/// are preserved in `extra` so other tools can annotate features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub status: FeatureStatus,
    #[serde(deserialize_with = "timestamp::lenient")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tracking_ids: TrackingIds,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub clarifications_count: u32,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_clarification: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub plan_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<TechnicalDecision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<PlanMilestone>,
    #[serde(
        default,
        deserialize_with = "timestamp::lenient_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tasks_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tasks: Option<usize>,
    /// Days; set by planning, refined by task generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl FeatureRecord {
    pub fn new(description: impl Into<String>, tracking_ids: TrackingIds) -> Self {
        Self {
            status: FeatureStatus::Specified,
            created: Utc::now(),
            description: description.into(),
            tracking_ids,
            clarifications_count: 0,
            last_clarification: None,
            plan_created: None,
            decisions: Vec::new(),
            milestones: Vec::new(),
            tasks_created: None,
            total_tasks: None,
            estimated_duration: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Move the status forward. Returns false (and leaves the status alone)
    /// when `to` is not ahead of the current status.
    pub fn advance(&mut self, to: FeatureStatus) -> bool {
        if to > self.status {
            self.status = to;
            true
        } else {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub current_phase: WorkflowPhase,
    #[serde(default)]
    pub active_agent: Option<String>,
    /// `None` until the first save.
    #[serde(default, deserialize_with = "timestamp::lenient_option")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub features: BTreeMap<String, FeatureRecord>,
    #[serde(default)]
    pub milestones: Vec<serde_json::Value>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            current_phase: WorkflowPhase::Initialization,
            active_agent: None,
            last_updated: Some(Utc::now()),
            features: BTreeMap::new(),
            milestones: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        if !paths::specmap_dir(root).is_dir() {
            return Err(SpecmapError::NotAProject(root.display().to_string()));
        }
        let path = paths::state_path(root);
        if !path.exists() {
            return Ok(Self::new());
        }
        let data = std::fs::read_to_string(&path)?;
        let state: WorkflowState = serde_json::from_str(&data)?;
        Ok(state)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::state_path(root);
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Load, apply `f`, stamp `last_updated` and write back. Nothing is
    /// written if `f` fails.
    pub fn update<T>(root: &Path, f: impl FnOnce(&mut WorkflowState) -> Result<T>) -> Result<T> {
        let mut state = Self::load(root)?;
        let out = f(&mut state)?;
        state.last_updated = Some(Utc::now());
        state.save(root)?;
        Ok(out)
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn add_feature(&mut self, id: &str, record: FeatureRecord) {
        self.features.insert(id.to_string(), record);
        self.last_updated = Some(Utc::now());
    }

    pub fn feature(&self, id: &str) -> Option<&FeatureRecord> {
        self.features.get(id)
    }

    /// Record for `id`, created as `specified` if the feature folder was
    /// made by hand and never registered.
    pub fn feature_mut(&mut self, id: &str) -> &mut FeatureRecord {
        self.features
            .entry(id.to_string())
            .or_insert_with(|| FeatureRecord::new("", TrackingIds::default()))
    }

    pub fn set_phase(&mut self, phase: WorkflowPhase) {
        self.current_phase = phase;
        self.last_updated = Some(Utc::now());
    }

    pub fn set_active_agent(&mut self, agent: Option<String>) {
        self.active_agent = agent;
        self.last_updated = Some(Utc::now());
    }

    pub fn count_with_status(&self, status: FeatureStatus) -> usize {
        self.features.values().filter(|f| f.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
