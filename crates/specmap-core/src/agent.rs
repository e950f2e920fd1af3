use crate::error::Result;
use crate::io;
use crate::project::Project;
use crate::state::WorkflowState;
use crate::types::{AgentRole, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const AGENT_CONFIG_DIR: &str = "04-agents/agent-configurations/rulemap";
pub const SESSION_SUMMARIES_DIR: &str = "04-agents/session-summaries";

/// Where a role's work lands in the project tree.
pub fn output_location(role: AgentRole) -> &'static str {
    match role {
        AgentRole::PrdGenerator => "01-specifications/",
        AgentRole::TaskPlanner => "02-planning/",
        AgentRole::DevGuide => "03-implementation/",
        AgentRole::QaMonitor => "05-quality-assurance/",
    }
}

/// Per-role profile written to `agent-configurations/rulemap/<role>.yaml`
/// the first time the role is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent_id: String,
    pub role: AgentRole,
    pub specialization: String,
    pub output_location: String,
    pub session_tracking: String,
    pub behaviors: Vec<String>,
}

impl AgentProfile {
    pub fn for_role(role: AgentRole) -> Self {
        Self {
            agent_id: format!("{}-v1", role.as_str()),
            role,
            specialization: role.description().to_string(),
            output_location: output_location(role).to_string(),
            session_tracking: format!("{SESSION_SUMMARIES_DIR}/"),
            behaviors: vec![
                "Explain reasoning".to_string(),
                "Ask clarifying questions".to_string(),
                "Document decisions".to_string(),
                "Keep specifications at RULEMAP score >= 8.0".to_string(),
            ],
        }
    }
}

pub fn profile_path(root: &Path, role: AgentRole) -> PathBuf {
    root.join(AGENT_CONFIG_DIR).join(format!("{}.yaml", role.as_str()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    pub role: AgentRole,
    pub previous: Option<String>,
    pub profile_path: PathBuf,
    pub profile_created: bool,
    pub activated_at: DateTime<Utc>,
}

/// Make `role` the project's active agent.
pub fn activate(project: &Project, role: AgentRole) -> Result<Activation> {
    let root = project.root();
    io::ensure_dir(&root.join(SESSION_SUMMARIES_DIR))?;

    let path = profile_path(root, role);
    let yaml = serde_yaml::to_string(&AgentProfile::for_role(role))?;
    let profile_created = io::write_if_missing(&path, yaml.as_bytes())?;

    let previous = WorkflowState::update(root, |state| {
        let previous = state.active_agent.clone();
        state.set_active_agent(Some(role.as_str().to_string()));
        Ok(previous)
    })?;
    tracing::info!(role = role.as_str(), previous = ?previous, "agent activated");

    Ok(Activation {
        role,
        previous,
        profile_path: path,
        profile_created,
        activated_at: Utc::now(),
    })
}

/// Clear the active agent. Returns the one that was active.
pub fn deactivate(project: &Project) -> Result<Option<String>> {
    WorkflowState::update(project.root(), |state| {
        let previous = state.active_agent.take();
        state.set_active_agent(None);
        Ok(previous)
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub role: AgentRole,
    pub description: String,
    pub active: bool,
    /// The project phase the active agent is working in.
    pub focus: Option<WorkflowPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOverview {
    pub base_agent: String,
    pub active_agent: Option<String>,
    pub agents: Vec<AgentStatus>,
}

pub fn agent_status(project: &Project) -> Result<AgentOverview> {
    let state = project.state()?;
    let agents = AgentRole::all()
        .iter()
        .map(|role| {
            let active = state.active_agent.as_deref() == Some(role.as_str());
            AgentStatus {
                role: *role,
                description: role.description().to_string(),
                active,
                focus: active.then_some(state.current_phase),
            }
        })
        .collect();
    Ok(AgentOverview {
        base_agent: project.config().agents.base_agent.clone(),
        active_agent: state.active_agent,
        agents,
    })
}
