use crate::error::SpecmapError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// WorkflowPhase
// ---------------------------------------------------------------------------

/// Project-wide phase recorded in the workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initialization,
    Specification,
    Planning,
    TaskGeneration,
}

impl WorkflowPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowPhase::Initialization => "initialization",
            WorkflowPhase::Specification => "specification",
            WorkflowPhase::Planning => "planning",
            WorkflowPhase::TaskGeneration => "task_generation",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FeatureStatus
// ---------------------------------------------------------------------------

/// Per-feature status. Ordered: a feature only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[serde(alias = "specification")]
    Specified,
    Planning,
    Planned,
    TasksGenerated,
}

impl FeatureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureStatus::Specified => "specified",
            FeatureStatus::Planning => "planning",
            FeatureStatus::Planned => "planned",
            FeatureStatus::TasksGenerated => "tasks_generated",
        }
    }
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProjectType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    WebApp,
    MobileApp,
    #[serde(alias = "api-service")]
    Api,
    DesktopApp,
    DataPipeline,
    MlModel,
    Library,
}

impl ProjectType {
    pub fn all() -> &'static [ProjectType] {
        &[
            ProjectType::WebApp,
            ProjectType::MobileApp,
            ProjectType::Api,
            ProjectType::DesktopApp,
            ProjectType::DataPipeline,
            ProjectType::MlModel,
            ProjectType::Library,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::WebApp => "web-app",
            ProjectType::MobileApp => "mobile-app",
            ProjectType::Api => "api",
            ProjectType::DesktopApp => "desktop-app",
            ProjectType::DataPipeline => "data-pipeline",
            ProjectType::MlModel => "ml-model",
            ProjectType::Library => "library",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectType {
    type Err = SpecmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web-app" => Ok(ProjectType::WebApp),
            "mobile-app" => Ok(ProjectType::MobileApp),
            "api" | "api-service" => Ok(ProjectType::Api),
            "desktop-app" => Ok(ProjectType::DesktopApp),
            "data-pipeline" => Ok(ProjectType::DataPipeline),
            "ml-model" => Ok(ProjectType::MlModel),
            "library" => Ok(ProjectType::Library),
            _ => Err(SpecmapError::UnknownProjectType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// AI assistants a project can be scaffolded for.
pub const SUPPORTED_AGENTS: &[&str] = &[
    "claude", "gemini", "copilot", "cursor", "qwen", "opencode", "windsurf", "codex", "kilocode",
    "auggie", "roo",
];

pub fn validate_agent(agent: &str) -> Result<(), SpecmapError> {
    if SUPPORTED_AGENTS.contains(&agent) {
        Ok(())
    } else {
        Err(SpecmapError::UnknownAgent(agent.to_string()))
    }
}

/// Workflow roles an agent can be activated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    PrdGenerator,
    TaskPlanner,
    DevGuide,
    QaMonitor,
}

impl AgentRole {
    pub fn all() -> &'static [AgentRole] {
        &[
            AgentRole::PrdGenerator,
            AgentRole::TaskPlanner,
            AgentRole::DevGuide,
            AgentRole::QaMonitor,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentRole::PrdGenerator => "prd-generator",
            AgentRole::TaskPlanner => "task-planner",
            AgentRole::DevGuide => "dev-guide",
            AgentRole::QaMonitor => "qa-monitor",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentRole::PrdGenerator => "Drafts and refines RULEMAP specifications",
            AgentRole::TaskPlanner => "Turns approved plans into task breakdowns",
            AgentRole::DevGuide => "Guides implementation through the TDD phases",
            AgentRole::QaMonitor => "Tracks quality gates and validation results",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentRole {
    type Err = SpecmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| SpecmapError::UnknownAgentRole(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_status_is_ordered() {
        assert!(FeatureStatus::Specified < FeatureStatus::Planning);
        assert!(FeatureStatus::Planned < FeatureStatus::TasksGenerated);
    }

    #[test]
    fn project_type_accepts_api_alias() {
        assert_eq!("api-service".parse::<ProjectType>().unwrap(), ProjectType::Api);
        assert_eq!("api".parse::<ProjectType>().unwrap(), ProjectType::Api);
        assert!("spaceship".parse::<ProjectType>().is_err());
    }

    #[test]
    fn project_type_roundtrip() {
        for t in ProjectType::all() {
            assert_eq!(t.as_str().parse::<ProjectType>().unwrap(), *t);
        }
    }

    #[test]
    fn agent_validation() {
        assert!(validate_agent("claude").is_ok());
        assert!(validate_agent("clippy").is_err());
    }

    #[test]
    fn agent_role_from_str() {
        assert_eq!(
            "task-planner".parse::<AgentRole>().unwrap(),
            AgentRole::TaskPlanner
        );
        assert!("planner".parse::<AgentRole>().is_err());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let s = serde_json::to_string(&WorkflowPhase::TaskGeneration).unwrap();
        assert_eq!(s, "\"task_generation\"");
    }
}
