use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecmapError {
    #[error("not a specmap project: no .specmap directory in {0} (run 'specmap init')")]
    NotAProject(String),

    #[error("project directory already initialized: {0}")]
    ProjectExists(String),

    #[error("feature not found: {id} (known features: {})", format_known(.known))]
    FeatureNotFound { id: String, known: Vec<String> },

    #[error("feature id required: more than one feature or none exists (known features: {})", format_known(.0))]
    FeatureRequired(Vec<String>),

    #[error("feature already exists: {0}")]
    FeatureExists(String),

    #[error("invalid feature id '{0}': expected NNN-slug (e.g. 001-user-auth)")]
    InvalidFeatureId(String),

    #[error("specification not found: {0}")]
    SpecNotFound(String),

    #[error(
        "RULEMAP score {score:.1} for {feature} is below the planning threshold {threshold:.1}: run 'specmap clarify {feature}' and improve the specification"
    )]
    ThresholdNotMet {
        feature: String,
        score: f64,
        threshold: f64,
    },

    #[error("plan not found for {0}: run 'specmap plan {0}' first")]
    PlanNotFound(String),

    #[error("plan already exists for {0}: pass --force to regenerate")]
    PlanExists(String),

    #[error("template not found: {0}")]
    MissingTemplate(String),

    #[error("unknown project type '{0}'")]
    UnknownProjectType(String),

    #[error("unknown agent '{0}'")]
    UnknownAgent(String),

    #[error("unknown agent role '{0}'")]
    UnknownAgentRole(String),

    #[error("unknown validation type '{0}' (expected rulemap, constitution or both)")]
    UnknownValidationKind(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("no active session")]
    NoActiveSession,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn format_known(known: &[String]) -> String {
    if known.is_empty() {
        "none".to_string()
    } else {
        known.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, SpecmapError>;
