//! Regex scanners over specification and plan markdown.
//!
//! Each pattern family is its own function. None of them fail: text that
//! does not match yields an empty collection or empty fields.

use crate::error::Result;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

macro_rules! static_regex {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pat).unwrap())
        }
    };
}

static_regex!(clarification_re, r"\[NEEDS CLARIFICATION:\s*([^\]]+)\]");
static_regex!(outstanding_q_re, r"\*\*(\d{3}-Q-\d{3})\*\*:\s*([^\n]+)");
static_regex!(fr_re, r"\*\*FR-(\d{3})\*\*:\s*(.+)");
static_regex!(acceptance_re, r"(?s)```yaml\s*ACCEPTANCE_TEST_(\d+):(.*?)```");
static_regex!(scenario_re, r#"scenario:\s*"([^"]+)""#);
static_regex!(given_re, r#"given:\s*"([^"]+)""#);
static_regex!(when_re, r#"when:\s*"([^"]+)""#);
static_regex!(then_re, r#"then:\s*"([^"]+)""#);
static_regex!(
    user_story_re,
    r"(?s)```\s*As\s+a\s+([^,]+),\s*I\s+want\s+to\s+([^,]+),\s*So\s+that\s+([^`]+)```"
);
static_regex!(entity_re, r"\*\*[A-Z][a-zA-Z\s]+\*\*:");
static_regex!(fr_count_re, r"\*\*FR-\d{3}\*\*:");
static_regex!(
    plan_decision_re,
    r"(?s)### (\d{3}-D-\d{3}): (.+?)\n\n\*\*Category\*\*: (.+?)\n\*\*Decision\*\*: (.+?)\n\*\*Rationale\*\*: (.+?)\n"
);
static_regex!(
    plan_milestone_re,
    r"(?s)### (\d{3}-M-\d{3}): (.+?)\n\n\*\*Target Date\*\*: (.+?)\n\*\*Phase\*\*: (.+?)\n"
);
static_regex!(requirement_ref_re, r"\d{3}-R-\d{3}");
static_regex!(decision_ref_re, r"\d{3}-D-\d{3}");
static_regex!(milestone_ref_re, r"\d{3}-M-\d{3}");

fn performance_value_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"<(\d+(?:\.\d+)?\s*(?:ms|s))",
            r"(\d+(?:\.\d+)?%)",
            r"(\d+(?:\.\d+)?\s*(?:req/s|rps|requests/s))",
            r"(\d+(?:\.\d+)?[kK]\s*(?:users|concurrent))",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn integration_point_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)integrate with (.+?)(?:\n|$)",
            r"(?i)external (.+?) integration",
            r"(?i)(\w+) service integration",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Open questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    ClarificationNeeded,
    OutstandingQuestion,
    UncheckedItem,
    QuestionLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub id: String,
    pub question: String,
    pub source: String,
    pub line: usize,
    pub context: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
}

impl OpenQuestion {
    /// `<source>#<id>`. Auto ids restart in every file, so this is the
    /// unambiguous way to name a question.
    pub fn qualified_id(&self) -> String {
        format!("{}#{}", self.source, self.id)
    }

    /// Whether an answer keyed by `key` (bare or qualified id) targets this
    /// question.
    pub fn is_keyed_by(&self, key: &str) -> bool {
        match key.split_once('#') {
            Some((source, id)) => source == self.source && id == self.id,
            None => key == self.id,
        }
    }
}

/// Scan one document for open questions. A line can match several
/// families and is then reported once per family.
pub fn scan_questions(content: &str, source: &str) -> Vec<OpenQuestion> {
    let mut out: Vec<OpenQuestion> = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        let push = |out: &mut Vec<OpenQuestion>, id: Option<String>, q: String, kind: QuestionKind| {
            let id = id.unwrap_or_else(|| format!("auto-{:03}", out.len() + 1));
            out.push(OpenQuestion {
                id,
                question: q,
                source: source.to_string(),
                line: line_no,
                context: trimmed.to_string(),
                kind,
            });
        };

        if line.contains("NEEDS CLARIFICATION") {
            if let Some(c) = clarification_re().captures(line) {
                push(
                    &mut out,
                    None,
                    c[1].trim().to_string(),
                    QuestionKind::ClarificationNeeded,
                );
            }
        }

        if line.contains("- [ ]")
            && (line.contains("Q-") || line.contains("question") || line.contains('?'))
        {
            if let Some(c) = outstanding_q_re().captures(line) {
                push(
                    &mut out,
                    Some(c[1].to_string()),
                    c[2].trim().to_string(),
                    QuestionKind::OutstandingQuestion,
                );
            } else {
                let text = line.replace("- [ ]", "");
                let text = text.trim();
                if !text.is_empty() {
                    push(&mut out, None, text.to_string(), QuestionKind::UncheckedItem);
                }
            }
        }

        if trimmed.ends_with('?') && trimmed.chars().count() > 5 {
            push(
                &mut out,
                None,
                trimmed.to_string(),
                QuestionKind::QuestionLine,
            );
        }
    }

    out
}

/// Open questions in a feature's spec.md then clarifications.md. Missing
/// files contribute nothing. With `dedupe`, only the first question found
/// on any given line is kept.
pub fn find_open_questions(spec_dir: &Path, dedupe: bool) -> Result<Vec<OpenQuestion>> {
    let mut questions = Vec::new();
    for name in [paths::SPEC_MD, paths::CLARIFICATIONS_MD] {
        let content = crate::io::read_or_empty(&spec_dir.join(name))?;
        questions.extend(scan_questions(&content, name));
    }
    if dedupe {
        let mut seen = BTreeSet::new();
        questions.retain(|q| seen.insert((q.source.clone(), q.line)));
    }
    Ok(questions)
}

// ---------------------------------------------------------------------------
// Requirements and acceptance tests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalRequirement {
    pub id: String,
    pub text: String,
}

pub fn extract_functional_requirements(md: &str) -> Vec<FunctionalRequirement> {
    let mut out = Vec::new();
    let mut in_section = false;

    for line in md.lines() {
        let lower = line.to_lowercase();
        if lower.contains("functional requirements") && line.contains('#') {
            in_section = true;
            continue;
        } else if in_section && line.trim_start().starts_with('#') {
            in_section = false;
        }

        if in_section {
            if let Some(c) = fr_re().captures(line) {
                out.push(FunctionalRequirement {
                    id: format!("FR-{}", &c[1]),
                    text: c[2].trim().to_string(),
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceTest {
    pub id: String,
    pub scenario: String,
    pub given: String,
    pub when: String,
    pub then: String,
}

pub fn extract_acceptance_criteria(md: &str) -> Vec<AcceptanceTest> {
    let field = |re: &Regex, body: &str| {
        re.captures(body)
            .map(|c| c[1].to_string())
            .unwrap_or_default()
    };

    acceptance_re()
        .captures_iter(md)
        .map(|c| {
            let n: u32 = c[1].parse().unwrap_or(0);
            let body = &c[2];
            AcceptanceTest {
                id: format!("A-{n:03}"),
                scenario: field(scenario_re(), body),
                given: field(given_re(), body),
                when: field(when_re(), body),
                then: field(then_re(), body),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Constraints, stories, performance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalConstraints {
    pub platform: String,
    pub performance: String,
    pub security: String,
    pub integration: String,
    pub scalability: String,
}

fn after_colon(line: &str) -> String {
    line.split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default()
}

pub fn extract_technical_constraints(md: &str) -> TechnicalConstraints {
    let mut c = TechnicalConstraints::default();
    let mut in_section = false;

    for line in md.lines() {
        let lower = line.to_lowercase();
        if lower.contains("technical constraints") && line.contains('#') {
            in_section = true;
            continue;
        } else if in_section && line.trim().starts_with('#') {
            in_section = false;
        }
        if !in_section {
            continue;
        }

        let value = || after_colon(line);
        if lower.contains("**platform**:") {
            c.platform = value();
        } else if lower.contains("**performance**:") {
            c.performance = value();
        } else if lower.contains("**security**:") {
            c.security = value();
        } else if lower.contains("**integration**:") {
            c.integration = value();
        } else if lower.contains("**scalability**:") {
            c.scalability = value();
        }
    }
    c
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStory {
    pub id: String,
    pub role: String,
    pub action: String,
    pub benefit: String,
}

pub fn extract_user_stories(md: &str) -> Vec<UserStory> {
    user_story_re()
        .captures_iter(md)
        .enumerate()
        .map(|(i, c)| UserStory {
            id: format!("US-{:03}", i + 1),
            role: c[1].trim().to_string(),
            action: c[2].trim().to_string(),
            benefit: c[3].trim().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRequirements {
    pub response_time: String,
    pub throughput: String,
    pub concurrent_users: String,
    pub availability: String,
}

impl PerformanceRequirements {
    pub fn has_load_targets(&self) -> bool {
        !self.response_time.is_empty() || !self.throughput.is_empty()
    }
}

/// First performance figure in `line`: a duration bound (`<200ms`), a
/// percentage, a rate (`1000 req/s`) or a concurrency (`10k users`).
pub fn match_performance_value(line: &str) -> Option<String> {
    performance_value_res()
        .iter()
        .find_map(|re| re.captures(line).map(|c| c[1].to_string()))
}

/// Like [`match_performance_value`] but falls back to the text after the
/// first colon.
pub fn extract_performance_value(line: &str) -> String {
    match_performance_value(line).unwrap_or_else(|| after_colon(line))
}

fn classify_performance_line(perf: &mut PerformanceRequirements, line: &str, value: String) {
    let lower = line.to_lowercase();
    if lower.contains("response") || lower.contains("latency") {
        perf.response_time = value;
    } else if lower.contains("throughput") || lower.contains("req/s") {
        perf.throughput = value;
    } else if lower.contains("concurrent") || lower.contains("users") {
        perf.concurrent_users = value;
    } else if lower.contains("uptime") || lower.contains("reliability") || lower.contains("availability") {
        perf.availability = value;
    }
}

/// Performance targets from a specification's performance section.
pub fn extract_performance_requirements(md: &str) -> PerformanceRequirements {
    let mut perf = PerformanceRequirements::default();
    let mut in_section = false;

    for line in md.lines() {
        let lower = line.to_lowercase();
        if lower.contains("technical performance")
            || (lower.contains("performance") && line.contains('#'))
        {
            in_section = true;
            continue;
        } else if in_section && line.trim().starts_with('#') {
            in_section = false;
        }
        if in_section {
            classify_performance_line(&mut perf, line, extract_performance_value(line));
        }
    }
    perf
}

/// Performance targets restated in a plan. Only lines carrying a
/// recognisable figure count.
pub fn extract_plan_performance(md: &str) -> PerformanceRequirements {
    let mut perf = PerformanceRequirements::default();
    let mut in_section = false;

    for line in md.lines() {
        let lower = line.to_lowercase();
        if lower.contains("performance") && line.contains(':') {
            in_section = true;
            continue;
        } else if in_section && line.trim().starts_with('#') {
            in_section = false;
        }
        if in_section {
            if let Some(v) = match_performance_value(line) {
                classify_performance_line(&mut perf, line, v);
            }
        }
    }
    perf
}

// ---------------------------------------------------------------------------
// Dependencies and business context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

pub fn extract_dependencies(md: &str) -> Vec<Dependency> {
    let mut out = Vec::new();
    let mut in_section = false;

    for line in md.lines() {
        let trimmed = line.trim();
        if line.to_lowercase().contains("dependencies") && line.contains('#') {
            in_section = true;
            continue;
        } else if in_section && trimmed.starts_with('#') {
            in_section = false;
        }

        if in_section && (trimmed.starts_with('-') || trimmed.starts_with('*')) {
            let text = trimmed.trim_start_matches(['-', '*']).trim();
            if !text.is_empty() {
                out.push(Dependency {
                    kind: "external".to_string(),
                    description: text.to_string(),
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub strategic_alignment: String,
    pub business_objectives: String,
    pub user_impact: String,
    pub timeline_pressure: String,
}

pub fn extract_business_context(md: &str) -> BusinessContext {
    let mut ctx = BusinessContext::default();
    for line in md.lines() {
        let lower = line.to_lowercase();
        if !line.contains(':') {
            continue;
        }
        let slot = if lower.contains("strategic alignment") {
            &mut ctx.strategic_alignment
        } else if lower.contains("business objectives") {
            &mut ctx.business_objectives
        } else if lower.contains("user impact") {
            &mut ctx.user_impact
        } else if lower.contains("timeline") || lower.contains("urgency") {
            &mut ctx.timeline_pressure
        } else {
            continue;
        };
        *slot = after_colon(line);
    }
    ctx
}

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityIndicators {
    pub entities_count: usize,
    pub requirements_count: usize,
    pub integrations_count: usize,
    pub has_auth: bool,
    pub has_database: bool,
    pub has_api: bool,
    pub complexity_score: f64,
}

/// Size proxy for a specification: bold `**Name**:` fields, `**FR-NNN**:`
/// requirements and integration mentions, plus fixed weights for auth,
/// storage and API surface.
pub fn analyze_complexity(md: &str) -> ComplexityIndicators {
    let lower = md.to_lowercase();
    let mut c = ComplexityIndicators {
        entities_count: entity_re().find_iter(md).count(),
        requirements_count: fr_count_re().find_iter(md).count(),
        integrations_count: lower.matches("integration").count() + lower.matches("external").count(),
        has_auth: lower.contains("auth") || lower.contains("login"),
        has_database: lower.contains("database") || lower.contains("persist"),
        has_api: lower.contains("api") || lower.contains("endpoint"),
        complexity_score: 0.0,
    };

    let mut score = c.entities_count as f64 * 0.5
        + c.requirements_count as f64 * 0.3
        + c.integrations_count as f64 * 1.0;
    if c.has_auth {
        score += 2.0;
    }
    if c.has_database {
        score += 1.0;
    }
    if c.has_api {
        score += 1.0;
    }
    c.complexity_score = round1(score);
    c
}

// ---------------------------------------------------------------------------
// Plan re-parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDecisionRef {
    pub id: String,
    pub title: String,
    pub category: String,
    pub decision: String,
    pub rationale: String,
}

pub fn extract_plan_decisions(md: &str) -> Vec<PlanDecisionRef> {
    plan_decision_re()
        .captures_iter(md)
        .map(|c| PlanDecisionRef {
            id: c[1].to_string(),
            title: c[2].trim().to_string(),
            category: c[3].trim().to_string(),
            decision: c[4].trim().to_string(),
            rationale: c[5].trim().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMilestoneRef {
    pub id: String,
    pub title: String,
    pub date: String,
    pub phase: String,
}

pub fn extract_plan_milestones(md: &str) -> Vec<PlanMilestoneRef> {
    plan_milestone_re()
        .captures_iter(md)
        .map(|c| PlanMilestoneRef {
            id: c[1].to_string(),
            title: c[2].trim().to_string(),
            date: c[3].trim().to_string(),
            phase: c[4].trim().to_string(),
        })
        .collect()
}

/// Distinct `NNN-R-NNN` references, sorted.
pub fn extract_requirement_refs(md: &str) -> Vec<String> {
    requirement_ref_re()
        .find_iter(md)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub language: String,
    pub framework: String,
    pub database: String,
    pub testing: String,
    pub deployment: String,
}

/// `key: value` lines following a `technology_stack:` line, up to the first
/// line that is not a known key.
pub fn extract_technology_stack(md: &str) -> TechnologyStack {
    let mut stack = TechnologyStack::default();
    let mut in_section = false;

    for line in md.lines() {
        if !in_section {
            in_section = line.to_lowercase().contains("technology_stack:");
            continue;
        }
        let trimmed = line.trim();
        let value = || after_colon(trimmed).trim_matches('"').to_string();
        if trimmed.starts_with("language:") {
            stack.language = value();
        } else if trimmed.starts_with("framework:") {
            stack.framework = value();
        } else if trimmed.starts_with("database:") {
            stack.database = value();
        } else if trimmed.starts_with("testing:") {
            stack.testing = value();
        } else if trimmed.starts_with("deployment:") || trimmed.starts_with("platform:") {
            stack.deployment = value();
        } else if !trimmed.is_empty() {
            break;
        }
    }
    stack
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanComplexity {
    pub has_database: bool,
    pub has_api: bool,
    pub has_auth: bool,
    pub has_external_integrations: bool,
    pub entity_count: usize,
    pub endpoint_count: usize,
    pub decision_count: usize,
    pub milestone_count: usize,
    pub complexity_score: f64,
}

pub fn analyze_plan_complexity(md: &str) -> PlanComplexity {
    let lower = md.to_lowercase();
    let mut c = PlanComplexity {
        has_database: lower.contains("database") || lower.contains("model"),
        has_api: lower.contains("api") || lower.contains("endpoint"),
        has_auth: lower.contains("auth") || lower.contains("login"),
        has_external_integrations: lower.contains("integration") || lower.contains("external"),
        entity_count: lower.matches("entity").count(),
        endpoint_count: lower.matches("endpoint").count() + lower.matches("api").count(),
        decision_count: decision_ref_re().find_iter(md).count(),
        milestone_count: milestone_ref_re().find_iter(md).count(),
        complexity_score: 0.0,
    };

    let mut score = 0.0;
    if c.has_database {
        score += 2.0;
    }
    if c.has_api {
        score += 2.0;
    }
    if c.has_auth {
        score += 3.0;
    }
    if c.has_external_integrations {
        score += 2.0;
    }
    score += c.entity_count as f64 * 0.5 + c.endpoint_count as f64 * 0.3;
    c.complexity_score = round1(score);
    c
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationPoint {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

pub fn extract_integration_points(md: &str) -> Vec<IntegrationPoint> {
    let mut out = Vec::new();
    for re in integration_point_res() {
        for c in re.captures_iter(md) {
            out.push(IntegrationPoint {
                name: c[1].trim().to_string(),
                kind: "external_service".to_string(),
            });
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn marker_becomes_clarification_needed() {
        let qs = scan_questions(
            "intro\n**Owner**: [NEEDS CLARIFICATION: who signs off]\n",
            "spec.md",
        );
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].kind, QuestionKind::ClarificationNeeded);
        assert_eq!(qs[0].question, "who signs off");
        assert_eq!(qs[0].line, 2);
        assert_eq!(qs[0].id, "auto-001");
    }

    #[test]
    fn outstanding_question_keeps_embedded_id() {
        let qs = scan_questions(
            "- [ ] **001-Q-002**: [Question requiring stakeholder input]\n",
            "clarifications.md",
        );
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].id, "001-Q-002");
        assert_eq!(qs[0].kind, QuestionKind::OutstandingQuestion);
        assert_eq!(qs[0].question, "[Question requiring stakeholder input]");
    }

    #[test]
    fn unchecked_question_line_double_counts() {
        let qs = scan_questions("- [ ] Should sessions expire?\n", "spec.md");
        let kinds: Vec<_> = qs.iter().map(|q| q.kind).collect();
        assert_eq!(
            kinds,
            vec![QuestionKind::UncheckedItem, QuestionKind::QuestionLine]
        );
        assert_eq!(qs[0].question, "Should sessions expire?");
        assert_eq!(qs[1].id, "auto-002");
    }

    #[test]
    fn qualified_ids_name_the_source() {
        let spec = scan_questions("Owner: [NEEDS CLARIFICATION: who]\n", "spec.md");
        let log = scan_questions("- [ ] Which regions need residency?\n", "clarifications.md");
        assert_eq!(spec[0].id, log[0].id);
        assert_eq!(log[0].qualified_id(), "clarifications.md#auto-001");
        assert!(log[0].is_keyed_by("clarifications.md#auto-001"));
        assert!(!spec[0].is_keyed_by("clarifications.md#auto-001"));
        assert!(spec[0].is_keyed_by("auto-001"));
    }

    #[test]
    fn plain_checkbox_is_not_a_question() {
        assert!(scan_questions("- [ ] Write the docs\n", "spec.md").is_empty());
    }

    #[test]
    fn short_question_lines_ignored() {
        assert!(scan_questions("Why?\n", "spec.md").is_empty());
    }

    #[test]
    fn find_open_questions_orders_files_and_dedupes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("spec.md"), "Is this ready?\n").unwrap();
        std::fs::write(
            dir.path().join("clarifications.md"),
            "- [ ] Is the budget approved?\n",
        )
        .unwrap();

        let all = find_open_questions(dir.path(), false).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].source, "spec.md");
        assert_eq!(all[1].source, "clarifications.md");

        let deduped = find_open_questions(dir.path(), true).unwrap();
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn find_open_questions_missing_files() {
        let dir = TempDir::new().unwrap();
        assert!(find_open_questions(dir.path(), false).unwrap().is_empty());
    }

    #[test]
    fn functional_requirements_limited_to_section() {
        let md = "\
## Overview
- **FR-009**: outside
### Functional Requirements
- **FR-001**: Users can log in
- **FR-002**: Sessions expire
### Non-Functional
- **FR-003**: also outside
";
        let reqs = extract_functional_requirements(md);
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].id, "FR-001");
        assert_eq!(reqs[1].text, "Sessions expire");
    }

    #[test]
    fn acceptance_tests_default_missing_fields() {
        let md = "```yaml\nACCEPTANCE_TEST_2:\n  scenario: \"Login\"\n  given: \"a user\"\n```\n";
        let tests = extract_acceptance_criteria(md);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, "A-002");
        assert_eq!(tests[0].scenario, "Login");
        assert_eq!(tests[0].given, "a user");
        assert_eq!(tests[0].when, "");
        assert_eq!(tests[0].then, "");
    }

    #[test]
    fn performance_value_patterns_in_order() {
        assert_eq!(extract_performance_value("- Response time: <200ms p95"), "200ms");
        assert_eq!(extract_performance_value("- Uptime: 99.9%"), "99.9%");
        assert_eq!(extract_performance_value("- Throughput: 1000 req/s"), "1000 req/s");
        assert_eq!(extract_performance_value("- Concurrency: 10k users"), "10k users");
        assert_eq!(extract_performance_value("- Latency: fast enough"), "fast enough");
        assert_eq!(extract_performance_value("no figures here"), "");
    }

    #[test]
    fn performance_requirements_from_section() {
        let md = "\
### Technical Performance
- Response time: <150ms
- Throughput: 500 rps
- 5k concurrent sessions
## Next
- Response time: <1s
";
        let perf = extract_performance_requirements(md);
        assert_eq!(perf.response_time, "150ms");
        assert_eq!(perf.throughput, "500 rps");
        assert_eq!(perf.concurrent_users, "5k concurrent");
        assert!(perf.has_load_targets());
    }

    #[test]
    fn constraints_and_stories() {
        let md = "\
### Technical Constraints
**Platform**: Linux containers
**Security**: OWASP top 10
```
As a shopper, I want to save my cart, So that I can buy later
```
";
        let c = extract_technical_constraints(md);
        assert_eq!(c.platform, "Linux containers");
        assert_eq!(c.security, "OWASP top 10");

        let stories = extract_user_stories(md);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].role, "shopper");
        assert_eq!(stories[0].action, "save my cart");
        assert_eq!(stories[0].benefit, "I can buy later");
    }

    #[test]
    fn dependencies_and_business_context() {
        let md = "\
## Dependencies
- Payment gateway
* Email provider
## Context
**Strategic Alignment**: growth
Timeline: Q3
";
        let deps = extract_dependencies(md);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[1].description, "Email provider");

        let ctx = extract_business_context(md);
        assert_eq!(ctx.strategic_alignment, "growth");
        assert_eq!(ctx.timeline_pressure, "Q3");
    }

    #[test]
    fn complexity_weights() {
        let md = "\
**Owner**: a
**FR-001**: login with password
**FR-002**: store in database
external integration
";
        let c = analyze_complexity(md);
        // entities: Owner only; FR-NNN starts with F but contains '-'
        assert_eq!(c.entities_count, 1);
        assert_eq!(c.requirements_count, 2);
        assert_eq!(c.integrations_count, 2);
        assert!(c.has_auth);
        assert!(c.has_database);
        assert!(!c.has_api);
        // 0.5 + 0.6 + 2.0 + 2 + 1
        assert_eq!(c.complexity_score, 6.1);
    }

    #[test]
    fn plan_blocks_reparse() {
        let md = "\
### 001-D-001: Testing Strategy

**Category**: Testing
**Decision**: TDD
**Rationale**: quality
**Status**: Approved

### 001-M-001: Research Complete

**Target Date**: 2026-01-03
**Phase**: Research

Refs 001-R-002 and 001-R-001 and 001-R-002.
technology_stack:
  framework: \"axum\"
  testing: \"cargo test\"
```
";
        let d = extract_plan_decisions(md);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].category, "Testing");
        let m = extract_plan_milestones(md);
        assert_eq!(m[0].date, "2026-01-03");
        assert_eq!(
            extract_requirement_refs(md),
            vec!["001-R-001".to_string(), "001-R-002".to_string()]
        );
        let stack = extract_technology_stack(md);
        assert_eq!(stack.framework, "axum");
        assert_eq!(stack.testing, "cargo test");
    }

    #[test]
    fn integration_points_all_patterns() {
        let md = "We integrate with Stripe\nexternal billing integration\nemail service integration\n";
        let names: Vec<String> = extract_integration_points(md)
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Stripe", "billing", "email"]);
    }

    #[test]
    fn plan_complexity_flags() {
        let c = analyze_plan_complexity("Entity User. Entity Session. API endpoint with login.");
        assert!(c.has_api);
        assert!(c.has_auth);
        assert!(!c.has_database);
        assert_eq!(c.entity_count, 2);
    }
}
