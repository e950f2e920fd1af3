use crate::error::Result;
use crate::extract::{self, OpenQuestion, QuestionKind};
use crate::io;
use crate::paths;
use crate::project::Project;
use crate::rulemap::{self, RulemapScore};
use crate::state::WorkflowState;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

const OUTSTANDING_HEADING: &str = "#### Outstanding Questions";

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"(?i)\[[^\]]*?(?:to be determined|to be clarified|tbd)[^\]]*\]").unwrap()
    })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextPhase {
    Planning,
    SpecificationImprovement,
}

impl NextPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            NextPhase::Planning => "planning",
            NextPhase::SpecificationImprovement => "specification_improvement",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarifyReport {
    pub feature_id: String,
    pub questions: Vec<OpenQuestion>,
    pub score: RulemapScore,
    pub next_phase: NextPhase,
}

/// Collect open questions and the current score. Read-only: clarification
/// never changes the feature's status.
pub fn run_clarification(project: &Project, feature_id: &str) -> Result<ClarifyReport> {
    project.require_feature(feature_id)?;
    let questions = extract::find_open_questions(
        &paths::spec_dir(project.root(), feature_id),
        project.config().specmap.dedupe_questions,
    )?;
    let score = rulemap::calculate_rulemap_score(project, feature_id);
    let next_phase = if score.meets_threshold {
        NextPhase::Planning
    } else {
        NextPhase::SpecificationImprovement
    };
    Ok(ClarifyReport {
        feature_id: feature_id.to_string(),
        questions,
        score,
        next_phase,
    })
}

// ---------------------------------------------------------------------------
// Answers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub answer: String,
}

impl Answer {
    pub fn new(id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub feature_id: String,
    pub session_date: String,
    pub resolved: usize,
    /// Answer ids that matched no open question. They are still written to
    /// the session log.
    pub unmatched: Vec<String>,
    pub spec_updates: Vec<String>,
    pub clarifications_count: u32,
    pub clarifications_file: PathBuf,
}

/// Record answers as a clarification session and fold them back into the
/// documents:
///
/// - clarifications.md gets a dated session before the outstanding
///   questions heading, and answered outstanding checkboxes are ticked;
/// - in spec.md, a matching `[NEEDS CLARIFICATION: …]` marker is replaced
///   by the answer, as is a "to be determined" placeholder on an answered
///   question's line.
pub fn apply_answers(
    project: &Project,
    feature_id: &str,
    answers: &[Answer],
    now: DateTime<Utc>,
) -> Result<ApplyOutcome> {
    project.require_feature(feature_id)?;
    let root = project.root();
    let spec_dir = paths::spec_dir(root, feature_id);
    let questions = extract::find_open_questions(&spec_dir, false)?;

    let matched: Vec<(&Answer, Option<&OpenQuestion>)> = answers
        .iter()
        .map(|a| (a, questions.iter().find(|q| q.is_keyed_by(&a.id))))
        .collect();
    let unmatched: Vec<String> = matched
        .iter()
        .filter(|(_, q)| q.is_none())
        .map(|(a, _)| a.id.clone())
        .collect();
    if !unmatched.is_empty() {
        tracing::warn!(feature = feature_id, ids = ?unmatched, "answers without a matching question");
    }

    let session_date = now.format("%Y-%m-%d %H:%M").to_string();

    // clarifications.md
    let clarifications_file = paths::clarifications_file(root, feature_id);
    let mut log = io::read_or_empty(&clarifications_file)?;
    if log.is_empty() {
        log = format!(
            "# Clarifications: {feature_id}\n\n**Feature**: {feature_id}\n**Created**: {}\n**Status**: Active\n\n---\n\n## Clarification Sessions\n",
            now.format("%Y-%m-%d")
        );
    }
    // Tick answered plain checkboxes first: their line numbers refer to the
    // log as scanned.
    let answered_lines: Vec<usize> = matched
        .iter()
        .filter_map(|(_, q)| *q)
        .filter(|q| q.source == paths::CLARIFICATIONS_MD && q.kind == QuestionKind::UncheckedItem)
        .map(|q| q.line)
        .collect();
    if !answered_lines.is_empty() {
        log = tick_lines(&log, &answered_lines);
    }
    let session = session_block(&session_date, &matched);
    log = if log.contains(OUTSTANDING_HEADING) {
        log.replacen(
            OUTSTANDING_HEADING,
            &format!("{session}\n{OUTSTANDING_HEADING}"),
            1,
        )
    } else {
        format!("{log}{session}")
    };
    for (_, q) in &matched {
        if let Some(q) = (*q).filter(|q| q.kind == QuestionKind::OutstandingQuestion) {
            log = log.replace(
                &format!("- [ ] **{}**", q.id),
                &format!("- [x] **{}**", q.id),
            );
        }
    }
    io::atomic_write(&clarifications_file, log.as_bytes())?;

    // spec.md
    let spec_file = paths::spec_file(root, feature_id);
    let mut spec = io::read_or_empty(&spec_file)?;
    let mut spec_updates = Vec::new();
    for (a, q) in &matched {
        let Some(q) = q else { continue };
        if q.source != paths::SPEC_MD {
            continue;
        }
        match q.kind {
            QuestionKind::ClarificationNeeded => {
                if let Some(updated) = replace_marker(&spec, &q.question, &a.answer) {
                    spec = updated;
                    spec_updates.push(format!("resolved clarification: {}", q.question));
                }
            }
            _ => {
                if let Some(updated) = replace_placeholder_on_line(&spec, q.line, &a.answer) {
                    spec = updated;
                    spec_updates.push(format!("updated: {}", q.context));
                }
            }
        }
    }
    if !spec_updates.is_empty() {
        io::atomic_write(&spec_file, spec.as_bytes())?;
    }

    let clarifications_count = WorkflowState::update(root, |state| {
        let rec = state.feature_mut(feature_id);
        rec.clarifications_count += answers.len() as u32;
        rec.last_clarification = Some(now);
        Ok(rec.clarifications_count)
    })?;

    tracing::info!(
        feature = feature_id,
        answers = answers.len(),
        spec_updates = spec_updates.len(),
        "clarification session recorded"
    );

    Ok(ApplyOutcome {
        feature_id: feature_id.to_string(),
        session_date,
        resolved: answers.len() - unmatched.len(),
        unmatched,
        spec_updates,
        clarifications_count,
        clarifications_file,
    })
}

fn session_block(date: &str, matched: &[(&Answer, Option<&OpenQuestion>)]) -> String {
    let mut out = format!(
        "\n### Session {date}\n*Interactive clarification session*\n\n#### Resolved Questions\n"
    );
    for (a, q) in matched {
        let question = q.map(|q| q.question.as_str()).unwrap_or("");
        out.push_str(&format!(
            "\n- [x] **{}**: {}\n  **Answer**: {}\n",
            a.id, question, a.answer
        ));
    }
    out
}

/// Turn `- [ ]` into `- [x]` on the given 1-based lines.
fn tick_lines(text: &str, lines: &[usize]) -> String {
    let mut out = text
        .lines()
        .enumerate()
        .map(|(idx, l)| {
            if lines.contains(&(idx + 1)) {
                l.replacen("- [ ]", "- [x]", 1)
            } else {
                l.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Replace every `[NEEDS CLARIFICATION: <question>]` whose inner text
/// matches `question`. `None` when nothing matched.
fn replace_marker(spec: &str, question: &str, answer: &str) -> Option<String> {
    let pattern = format!(
        r"\[NEEDS CLARIFICATION:\s*{}\s*\]",
        regex::escape(question)
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(spec) {
        return None;
    }
    Some(re.replace_all(spec, regex::NoExpand(answer)).into_owned())
}

/// Replace a "to be determined" style placeholder on 1-based `line`.
fn replace_placeholder_on_line(spec: &str, line: usize, answer: &str) -> Option<String> {
    let mut changed = false;
    let lines: Vec<String> = spec
        .lines()
        .enumerate()
        .map(|(idx, l)| {
            if idx + 1 == line && placeholder_re().is_match(l) {
                changed = true;
                placeholder_re().replace_all(l, regex::NoExpand(answer)).into_owned()
            } else {
                l.to_string()
            }
        })
        .collect();
    if !changed {
        return None;
    }
    let mut out = lines.join("\n");
    if spec.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::feature;
    use crate::rulemap::tests::FULL_SPEC;
    use crate::templates;
    use crate::types::{FeatureStatus, ProjectType};
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Project, String) {
        std::fs::create_dir_all(dir.path().join(paths::TEMPLATES_DIR)).unwrap();
        Config::new("demo", ProjectType::Api, "claude").save(dir.path()).unwrap();
        for (name, body) in templates::defaults() {
            std::fs::write(paths::template_path(dir.path(), name), body).unwrap();
        }
        let project = Project::open(dir.path()).unwrap();
        let out = feature::specify(
            &project,
            "Add OAuth login",
            None,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        )
        .unwrap();
        (project, out.feature_id)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, 9, 30, 0).unwrap()
    }

    #[test]
    fn fresh_spec_needs_improvement() {
        let dir = TempDir::new().unwrap();
        let (project, id) = setup(&dir);
        let report = run_clarification(&project, &id).unwrap();
        assert_eq!(report.next_phase, NextPhase::SpecificationImprovement);
        assert!(!report.score.meets_threshold);
        assert!(report
            .questions
            .iter()
            .any(|q| q.kind == QuestionKind::ClarificationNeeded));
        assert!(report.questions.iter().any(|q| q.id == "001-Q-001"));
    }

    #[test]
    fn complete_spec_is_ready_for_planning() {
        let dir = TempDir::new().unwrap();
        let (project, id) = setup(&dir);
        std::fs::write(paths::spec_file(dir.path(), &id), FULL_SPEC).unwrap();
        let report = run_clarification(&project, &id).unwrap();
        assert_eq!(report.next_phase, NextPhase::Planning);
        assert_eq!(report.score.score, 10.0);
    }

    #[test]
    fn clarification_does_not_change_status() {
        let dir = TempDir::new().unwrap();
        let (project, id) = setup(&dir);
        run_clarification(&project, &id).unwrap();
        apply_answers(&project, &id, &[Answer::new("001-Q-001", "Yes")], now()).unwrap();
        let state = project.state().unwrap();
        assert_eq!(state.feature(&id).unwrap().status, FeatureStatus::Specified);
    }

    #[test]
    fn answers_marker_and_outstanding_question() {
        let dir = TempDir::new().unwrap();
        let (project, id) = setup(&dir);
        let marker = run_clarification(&project, &id)
            .unwrap()
            .questions
            .into_iter()
            .find(|q| q.kind == QuestionKind::ClarificationNeeded && q.question.starts_with("who owns"))
            .unwrap();

        let out = apply_answers(
            &project,
            &id,
            &[
                Answer::new(marker.id.clone(), "The identity team"),
                Answer::new("001-Q-002", "Use PKCE"),
                Answer::new("999-Q-999", "stray"),
            ],
            now(),
        )
        .unwrap();
        assert_eq!(out.resolved, 2);
        assert_eq!(out.unmatched, vec!["999-Q-999"]);
        assert_eq!(out.clarifications_count, 3);
        assert_eq!(out.spec_updates.len(), 1);

        let spec = std::fs::read_to_string(paths::spec_file(dir.path(), &id)).unwrap();
        assert!(spec.contains("**Specification Owner**: The identity team"));
        assert!(!spec.contains("who owns this specification"));

        let log = std::fs::read_to_string(paths::clarifications_file(dir.path(), &id)).unwrap();
        assert!(log.contains("- [x] **001-Q-002**"));
        assert!(log.contains("- [ ] **001-Q-001**"));
        assert!(log.contains("### Session 2026-03-03 09:30"));
        assert!(log.contains("**Answer**: Use PKCE"));
        let session_at = log.find("### Session 2026-03-03 09:30").unwrap();
        let outstanding_at = log.find(OUTSTANDING_HEADING).unwrap();
        assert!(session_at < outstanding_at);

        let state = project.state().unwrap();
        let rec = state.feature(&id).unwrap();
        assert_eq!(rec.clarifications_count, 3);
        assert_eq!(rec.last_clarification, Some(now()));
    }

    #[test]
    fn placeholder_on_answered_line_is_replaced() {
        let spec = "a\n- [ ] Retention period [to be determined]?\nb [TBD]\n";
        let out = replace_placeholder_on_line(spec, 2, "30 days").unwrap();
        assert_eq!(out, "a\n- [ ] Retention period 30 days?\nb [TBD]\n");
        assert!(replace_placeholder_on_line(spec, 1, "x").is_none());
    }

    #[test]
    fn marker_answer_with_dollar_is_literal() {
        let out = replace_marker("[NEEDS CLARIFICATION: price]", "price", "$5").unwrap();
        assert_eq!(out, "$5");
    }

    #[test]
    fn qualified_id_targets_clarifications_log() {
        let dir = TempDir::new().unwrap();
        let (project, id) = setup(&dir);
        std::fs::write(
            paths::spec_file(dir.path(), &id),
            "# Spec\n**Owner**: [NEEDS CLARIFICATION: who owns this]\n",
        )
        .unwrap();
        std::fs::write(
            paths::clarifications_file(dir.path(), &id),
            "# Clarifications\n\n#### Outstanding Questions\n- [ ] Which regions need data residency?\n",
        )
        .unwrap();

        let out = apply_answers(
            &project,
            &id,
            &[Answer::new("clarifications.md#auto-001", "EU only")],
            now(),
        )
        .unwrap();
        assert_eq!(out.resolved, 1);
        assert!(out.unmatched.is_empty());
        assert!(out.spec_updates.is_empty());

        let spec = std::fs::read_to_string(paths::spec_file(dir.path(), &id)).unwrap();
        assert!(spec.contains("[NEEDS CLARIFICATION: who owns this]"));
        let log = std::fs::read_to_string(paths::clarifications_file(dir.path(), &id)).unwrap();
        assert!(log.contains("- [x] Which regions need data residency?"));
        assert!(log.contains("**Answer**: EU only"));

        // A bare auto id still means the first match, in spec.md.
        let out = apply_answers(&project, &id, &[Answer::new("auto-001", "Dana")], now()).unwrap();
        assert_eq!(out.spec_updates.len(), 1);
    }

    #[test]
    fn path_like_feature_id_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (project, _) = setup(&dir);
        let err = apply_answers(&project, "..", &[Answer::new("auto-001", "x")], now()).unwrap_err();
        assert!(matches!(err, crate::error::SpecmapError::InvalidFeatureId(_)));
        assert!(!dir.path().join("01-specifications/clarifications.md").exists());
        assert!(!dir.path().join("01-specifications/spec.md").exists());
    }
}
