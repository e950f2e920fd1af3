use crate::error::{Result, SpecmapError};
use crate::io;
use crate::paths;
use crate::project::Project;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.yaml";
pub const SUMMARY_FILE: &str = "summary.md";
pub const SESSION_SUBDIRS: &[&str] = &["artifacts", "notes", "decisions", "snapshots"];

const MAX_FOCUS_LEN: usize = 30;

// ---------------------------------------------------------------------------
// Session record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactAction {
    Created,
    Modified,
}

impl ArtifactAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactAction::Created => "created",
            ArtifactAction::Modified => "modified",
        }
    }
}

impl fmt::Display for ArtifactAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(ArtifactAction::Created),
            "modified" => Ok(ArtifactAction::Modified),
            other => Err(format!("unknown artifact action '{other}' (expected created or modified)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub date: NaiveDate,
    pub started: DateTime<Utc>,
    #[serde(default)]
    pub ended: Option<DateTime<Utc>>,
    #[serde(default)]
    pub focus: Option<String>,
    pub agent: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionArtifacts {
    #[serde(default)]
    pub created: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: String,
    pub time: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub duration_minutes: i64,
    pub files_created: usize,
    pub files_modified: usize,
    pub checkpoints: usize,
}

/// Contents of `session.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: SessionInfo,
    #[serde(default)]
    pub artifacts: SessionArtifacts,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub metrics: SessionMetrics,
}

impl SessionRecord {
    pub fn load(dir: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(dir.join(SESSION_FILE))?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&dir.join(SESSION_FILE), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// `{date}-session-NNN[-focus]`. The focus is lowercased, anything other
/// than ascii alphanumerics becomes `-`, and it is cut to 30 characters.
pub fn session_id(date: NaiveDate, seq: u32, focus: Option<&str>) -> String {
    let mut id = format!("{}-session-{seq:03}", date.format("%Y-%m-%d"));
    if let Some(focus) = focus.map(str::trim).filter(|f| !f.is_empty()) {
        let safe: String = focus
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .take(MAX_FOCUS_LEN)
            .collect();
        id.push('-');
        id.push_str(&safe);
    }
    id
}

fn dir_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    out.sort();
    Ok(out)
}

/// Next per-day sequence number, counting active and archived sessions.
fn next_sequence(root: &Path, date: NaiveDate) -> Result<u32> {
    let prefix = format!("{}-session-", date.format("%Y-%m-%d"));
    let mut names = dir_names(&paths::active_sessions_dir(root))?;
    names.extend(dir_names(&paths::archived_sessions_dir(root))?);
    let max = names
        .iter()
        .filter_map(|n| n.strip_prefix(&prefix))
        .filter_map(|rest| rest.get(..3))
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    Ok(max + 1)
}

/// The named active session, or the most recent one when no id is given.
pub fn resolve_session(project: &Project, id: Option<&str>) -> Result<String> {
    let active = paths::active_sessions_dir(project.root());
    match id {
        Some(id) => {
            if active.join(id).join(SESSION_FILE).is_file() {
                Ok(id.to_string())
            } else {
                Err(SpecmapError::SessionNotFound(id.to_string()))
            }
        }
        None => dir_names(&active)?
            .pop()
            .ok_or(SpecmapError::NoActiveSession),
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStarted {
    pub id: String,
    pub path: PathBuf,
    pub record: SessionRecord,
}

pub fn start_session(project: &Project, focus: Option<&str>, now: DateTime<Utc>) -> Result<SessionStarted> {
    let root = project.root();
    let date = now.date_naive();
    let id = session_id(date, next_sequence(root, date)?, focus);
    let dir = paths::active_sessions_dir(root).join(&id);
    for sub in SESSION_SUBDIRS {
        io::ensure_dir(&dir.join(sub))?;
    }

    let record = SessionRecord {
        session: SessionInfo {
            id: id.clone(),
            date,
            started: now,
            ended: None,
            focus: focus.map(str::to_string),
            agent: project.config().agents.base_agent.clone(),
            status: SessionStatus::Active,
        },
        artifacts: SessionArtifacts::default(),
        checkpoints: Vec::new(),
        metrics: SessionMetrics::default(),
    };
    record.save(&dir)?;
    io::atomic_write(&dir.join(SUMMARY_FILE), summary_template(&record).as_bytes())?;
    tracing::info!(session = %id, "session started");

    Ok(SessionStarted { id, path: dir, record })
}

fn summary_template(record: &SessionRecord) -> String {
    let s = &record.session;
    format!(
        "# Session Summary: {}\n\n**Date**: {}\n**Focus**: {}\n**Agent**: {}\n**Status**: In Progress\n\n## Goals\n\n- [ ] \n\n## Accomplishments\n\n## Decisions\n\n## Next Steps\n\n- [ ] \n",
        s.id,
        s.date,
        s.focus.as_deref().unwrap_or("general"),
        s.agent,
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointOutcome {
    pub session_id: String,
    pub checkpoint: Checkpoint,
    pub path: PathBuf,
}

/// Snapshot every feature's spec.md and plan.md into
/// `snapshots/checkpoint-NNN-HH-MM-SS/<feature>/`.
pub fn checkpoint(
    project: &Project,
    session: Option<&str>,
    description: &str,
    now: DateTime<Utc>,
) -> Result<CheckpointOutcome> {
    let root = project.root();
    let id = resolve_session(project, session)?;
    let dir = paths::active_sessions_dir(root).join(&id);
    let mut record = SessionRecord::load(&dir)?;

    let cp_id = format!(
        "checkpoint-{:03}-{}",
        record.checkpoints.len() + 1,
        now.format("%H-%M-%S")
    );
    let cp_dir = dir.join("snapshots").join(&cp_id);
    io::ensure_dir(&cp_dir)?;

    let mut files = Vec::new();
    for feature in project.feature_ids()? {
        let dst = cp_dir.join(&feature);
        for src in [paths::spec_file(root, &feature), paths::plan_file(root, &feature)] {
            if io::copy_into(&src, &dst)? {
                if let Ok(rel) = src.strip_prefix(root) {
                    files.push(rel.to_string_lossy().into_owned());
                }
            }
        }
    }

    let cp = Checkpoint {
        id: cp_id,
        time: now,
        description: description.to_string(),
        files,
    };
    record.checkpoints.push(cp.clone());
    record.metrics.checkpoints = record.checkpoints.len();
    record.save(&dir)?;
    tracing::info!(session = %id, checkpoint = %cp.id, files = cp.files.len(), "checkpoint recorded");

    Ok(CheckpointOutcome {
        session_id: id,
        checkpoint: cp,
        path: cp_dir,
    })
}

/// Record a file touched during the session. Returns false when it was
/// already tracked under that action.
pub fn track_artifact(
    project: &Project,
    session: Option<&str>,
    path: &str,
    action: ArtifactAction,
) -> Result<bool> {
    let id = resolve_session(project, session)?;
    let dir = paths::active_sessions_dir(project.root()).join(&id);
    let mut record = SessionRecord::load(&dir)?;

    let list = match action {
        ArtifactAction::Created => &mut record.artifacts.created,
        ArtifactAction::Modified => &mut record.artifacts.modified,
    };
    if list.iter().any(|p| p == path) {
        return Ok(false);
    }
    list.push(path.to_string());
    record.metrics.files_created = record.artifacts.created.len();
    record.metrics.files_modified = record.artifacts.modified.len();
    record.save(&dir)?;
    tracing::debug!(session = %id, path, action = action.as_str(), "artifact tracked");
    Ok(true)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEnded {
    pub session_id: String,
    pub archive_path: PathBuf,
    pub metrics: SessionMetrics,
}

/// Close the session, append the closing summary and move it to the
/// archive.
pub fn end_session(
    project: &Project,
    session: Option<&str>,
    summary: Option<&str>,
    now: DateTime<Utc>,
) -> Result<SessionEnded> {
    let root = project.root();
    let id = resolve_session(project, session)?;
    let dir = paths::active_sessions_dir(root).join(&id);
    let mut record = SessionRecord::load(&dir)?;

    record.session.ended = Some(now);
    record.session.status = SessionStatus::Completed;
    record.metrics.duration_minutes = (now - record.session.started).num_minutes().max(0);
    record.save(&dir)?;

    if let Some(text) = summary.map(str::trim).filter(|s| !s.is_empty()) {
        let path = dir.join(SUMMARY_FILE);
        let mut body = io::read_or_empty(&path)?;
        body = body.replace("**Status**: In Progress", "**Status**: Completed");
        body.push_str(&format!("\n## Closing Summary\n\n{text}\n"));
        io::atomic_write(&path, body.as_bytes())?;
    }

    let archive = paths::archived_sessions_dir(root);
    io::ensure_dir(&archive)?;
    let archive_path = archive.join(&id);
    std::fs::rename(&dir, &archive_path)?;
    tracing::info!(
        session = %id,
        minutes = record.metrics.duration_minutes,
        "session archived"
    );

    Ok(SessionEnded {
        session_id: id,
        archive_path,
        metrics: record.metrics,
    })
}

/// Active sessions, oldest first. Folders without a readable session.yaml
/// are skipped.
pub fn list_sessions(project: &Project) -> Result<Vec<SessionRecord>> {
    let active = paths::active_sessions_dir(project.root());
    let mut out = Vec::new();
    for name in dir_names(&active)? {
        match SessionRecord::load(&active.join(&name)) {
            Ok(r) => out.push(r),
            Err(e) => tracing::warn!(session = %name, error = %e, "skipping unreadable session"),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::ProjectType;
    use tempfile::TempDir;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn setup(dir: &TempDir) -> Project {
        std::fs::create_dir_all(dir.path().join(paths::SPECMAP_DIR)).unwrap();
        Config::new("demo", ProjectType::Api, "claude").save(dir.path()).unwrap();
        Project::open(dir.path()).unwrap()
    }

    #[test]
    fn ids_are_sanitized() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(session_id(d, 1, None), "2026-03-02-session-001");
        assert_eq!(session_id(d, 2, Some("OAuth Login!")), "2026-03-02-session-002-oauth-login-");
        assert_eq!(session_id(d, 3, Some("  ")), "2026-03-02-session-003");
        let long = "a".repeat(50);
        assert_eq!(session_id(d, 1, Some(&long)).len(), "2026-03-02-session-001-".len() + 30);
    }

    #[test]
    fn start_creates_workspace() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        let s = start_session(&project, Some("auth"), at("2026-03-02T09:00:00Z")).unwrap();
        assert_eq!(s.id, "2026-03-02-session-001-auth");
        for sub in SESSION_SUBDIRS {
            assert!(s.path.join(sub).is_dir());
        }
        assert!(s.path.join(SUMMARY_FILE).is_file());
        let rec = SessionRecord::load(&s.path).unwrap();
        assert_eq!(rec.session.status, SessionStatus::Active);
        assert_eq!(rec.session.agent, "claude");

        let s2 = start_session(&project, None, at("2026-03-02T10:00:00Z")).unwrap();
        assert_eq!(s2.id, "2026-03-02-session-002");
        assert_eq!(list_sessions(&project).unwrap().len(), 2);
    }

    #[test]
    fn checkpoint_snapshots_feature_documents() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        let root = dir.path();
        std::fs::create_dir_all(paths::spec_dir(root, "001-auth")).unwrap();
        std::fs::write(paths::spec_file(root, "001-auth"), "# spec\n").unwrap();

        start_session(&project, None, at("2026-03-02T09:00:00Z")).unwrap();
        let cp = checkpoint(&project, None, "first draft", at("2026-03-02T09:15:30Z")).unwrap();
        assert_eq!(cp.checkpoint.id, "checkpoint-001-09-15-30");
        assert_eq!(cp.checkpoint.files, vec!["01-specifications/features/001-auth/spec.md"]);
        assert!(cp.path.join("001-auth").join("spec.md").is_file());

        let rec = list_sessions(&project).unwrap().remove(0);
        assert_eq!(rec.metrics.checkpoints, 1);
        assert_eq!(rec.checkpoints[0].description, "first draft");
    }

    #[test]
    fn track_dedupes() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        start_session(&project, None, at("2026-03-02T09:00:00Z")).unwrap();
        assert!(track_artifact(&project, None, "src/lib.rs", ArtifactAction::Created).unwrap());
        assert!(!track_artifact(&project, None, "src/lib.rs", ArtifactAction::Created).unwrap());
        assert!(track_artifact(&project, None, "src/lib.rs", ArtifactAction::Modified).unwrap());
        let rec = list_sessions(&project).unwrap().remove(0);
        assert_eq!(rec.metrics.files_created, 1);
        assert_eq!(rec.metrics.files_modified, 1);
    }

    #[test]
    fn end_archives_with_duration() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        let s = start_session(&project, None, at("2026-03-02T09:00:00Z")).unwrap();
        let ended = end_session(&project, Some(&s.id), Some("Shipped the gate"), at("2026-03-02T10:30:00Z")).unwrap();
        assert_eq!(ended.metrics.duration_minutes, 90);
        assert!(!s.path.exists());
        assert!(ended.archive_path.join(SESSION_FILE).is_file());

        let rec = SessionRecord::load(&ended.archive_path).unwrap();
        assert_eq!(rec.session.status, SessionStatus::Completed);
        let summary = std::fs::read_to_string(ended.archive_path.join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("## Closing Summary\n\nShipped the gate"));
        assert!(summary.contains("**Status**: Completed"));

        assert!(list_sessions(&project).unwrap().is_empty());
        // Archived sessions still count toward the day's sequence.
        let next = start_session(&project, None, at("2026-03-02T11:00:00Z")).unwrap();
        assert_eq!(next.id, "2026-03-02-session-002");
    }

    #[test]
    fn missing_sessions_are_errors() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir);
        assert!(matches!(
            checkpoint(&project, None, "x", at("2026-03-02T09:00:00Z")),
            Err(SpecmapError::NoActiveSession)
        ));
        assert!(matches!(
            end_session(&project, Some("2026-01-01-session-001"), None, at("2026-03-02T09:00:00Z")),
            Err(SpecmapError::SessionNotFound(_))
        ));
    }
}
