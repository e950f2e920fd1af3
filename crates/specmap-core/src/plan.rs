use crate::error::{Result, SpecmapError};
use crate::extract::{
    self, AcceptanceTest, BusinessContext, ComplexityIndicators, Dependency, FunctionalRequirement,
    PerformanceRequirements, TechnicalConstraints, UserStory,
};
use crate::feature::display_name;
use crate::gate::{self, GateDecision};
use crate::io;
use crate::paths;
use crate::project::Project;
use crate::rulemap::RulemapScore;
use crate::state::WorkflowState;
use crate::templates;
use crate::types::{FeatureStatus, WorkflowPhase};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Rough calendar days per milestone used for the plan-level estimate.
pub const DAYS_PER_MILESTONE: u32 = 7;

// ---------------------------------------------------------------------------
// TechnicalDecision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionCategory {
    Architecture,
    Security,
    Data,
    Api,
    Testing,
}

impl DecisionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionCategory::Architecture => "architecture",
            DecisionCategory::Security => "security",
            DecisionCategory::Data => "data",
            DecisionCategory::Api => "api",
            DecisionCategory::Testing => "testing",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            DecisionCategory::Architecture => "Architecture",
            DecisionCategory::Security => "Security",
            DecisionCategory::Data => "Data",
            DecisionCategory::Api => "Api",
            DecisionCategory::Testing => "Testing",
        }
    }
}

impl fmt::Display for DecisionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Proposed,
    Approved,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionStatus::Proposed => "proposed",
            DecisionStatus::Approved => "approved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDecision {
    pub id: String,
    pub title: String,
    pub category: DecisionCategory,
    pub decision: String,
    pub rationale: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    pub status: DecisionStatus,
}

// ---------------------------------------------------------------------------
// PlanMilestone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestonePhase {
    Research,
    Design,
    Implementation,
    Integration,
    Testing,
}

impl MilestonePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MilestonePhase::Research => "research",
            MilestonePhase::Design => "design",
            MilestonePhase::Implementation => "implementation",
            MilestonePhase::Integration => "integration",
            MilestonePhase::Testing => "testing",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            MilestonePhase::Research => "Research",
            MilestonePhase::Design => "Design",
            MilestonePhase::Implementation => "Implementation",
            MilestonePhase::Integration => "Integration",
            MilestonePhase::Testing => "Testing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMilestone {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub deliverables: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    pub phase: MilestonePhase,
}

// ---------------------------------------------------------------------------
// Specification analysis
// ---------------------------------------------------------------------------

/// Everything the planner pulls out of spec.md.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecAnalysis {
    pub feature_id: String,
    pub functional_requirements: Vec<FunctionalRequirement>,
    pub acceptance_criteria: Vec<AcceptanceTest>,
    pub technical_constraints: TechnicalConstraints,
    pub user_stories: Vec<UserStory>,
    pub performance_requirements: PerformanceRequirements,
    pub dependencies: Vec<Dependency>,
    pub business_context: BusinessContext,
    pub complexity: ComplexityIndicators,
    pub requirement_refs: Vec<String>,
}

impl SpecAnalysis {
    pub fn from_markdown(feature_id: &str, md: &str) -> Self {
        Self {
            feature_id: feature_id.to_string(),
            functional_requirements: extract::extract_functional_requirements(md),
            acceptance_criteria: extract::extract_acceptance_criteria(md),
            technical_constraints: extract::extract_technical_constraints(md),
            user_stories: extract::extract_user_stories(md),
            performance_requirements: extract::extract_performance_requirements(md),
            dependencies: extract::extract_dependencies(md),
            business_context: extract::extract_business_context(md),
            complexity: extract::analyze_complexity(md),
            requirement_refs: extract::extract_requirement_refs(md),
        }
    }
}

pub fn analyze_specification(project: &Project, feature_id: &str) -> Result<SpecAnalysis> {
    let path = paths::spec_file(project.root(), feature_id);
    let md = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpecmapError::SpecNotFound(feature_id.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(SpecAnalysis::from_markdown(feature_id, &md))
}

// ---------------------------------------------------------------------------
// Decisions and milestones
// ---------------------------------------------------------------------------

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Architecture (complex features only), then auth, data and API decisions
/// where the indicators call for them, then the testing strategy.
pub fn generate_decisions(feature_num: &str, c: &ComplexityIndicators) -> Vec<TechnicalDecision> {
    let mut out: Vec<TechnicalDecision> = Vec::new();
    let mut push = |title: &str,
                    category: DecisionCategory,
                    decision: &str,
                    rationale: &str,
                    alternatives: &[&str],
                    status: DecisionStatus| {
        let id = format!("{feature_num}-D-{:03}", out.len() + 1);
        out.push(TechnicalDecision {
            id,
            title: title.to_string(),
            category,
            decision: decision.to_string(),
            rationale: rationale.to_string(),
            alternatives: strings(alternatives),
            status,
        });
    };

    if c.complexity_score > 5.0 {
        push(
            "Architecture Pattern Selection",
            DecisionCategory::Architecture,
            "Layered architecture with explicit module boundaries",
            "Complexity score indicates need for clear separation of concerns",
            &["Microservices", "Hexagonal architecture"],
            DecisionStatus::Proposed,
        );
    }
    if c.has_auth {
        push(
            "Authentication Method",
            DecisionCategory::Security,
            "Token-based authentication (JWT) with email/password",
            "Standard approach for user authentication features",
            &["OAuth2", "Session-based auth", "API keys"],
            DecisionStatus::Proposed,
        );
    }
    if c.has_database {
        push(
            "Database Technology",
            DecisionCategory::Data,
            "PostgreSQL relational database",
            "Relational data model with ACID compliance needs",
            &["MongoDB", "MySQL", "SQLite"],
            DecisionStatus::Proposed,
        );
    }
    if c.has_api {
        push(
            "API Framework",
            DecisionCategory::Api,
            "REST API with an OpenAPI contract",
            "Contract-first endpoints with generated documentation",
            &["GraphQL", "gRPC"],
            DecisionStatus::Proposed,
        );
    }
    push(
        "Testing Strategy",
        DecisionCategory::Testing,
        "TDD with unit, contract and integration tests",
        "Ensures quality and maintainability as per constitution",
        &["BDD scenarios", "Unit tests only"],
        DecisionStatus::Approved,
    );
    out
}

/// Milestone durations in days, scaled by complexity `c`, requirement
/// count `r` and integration count `i`.
struct MilestoneDays {
    research: i64,
    design: i64,
    implementation: i64,
    integration: Option<i64>,
    production: i64,
}

impl MilestoneDays {
    fn from_complexity(ci: &ComplexityIndicators) -> Self {
        let c = ci.complexity_score;
        let r = ci.requirements_count as f64;
        let i = ci.integrations_count as i64;
        Self {
            research: ((c * 0.5) as i64).max(2),
            design: ((r * 0.5) as i64).max(3),
            implementation: ((r * 1.5 + c * 0.5) as i64).max(5),
            integration: (i > 0).then(|| (2 * i).max(2)),
            production: ((r * 0.3 + c * 0.2) as i64).max(3),
        }
    }
}

struct Step {
    days: i64,
    title: &'static str,
    phase: MilestonePhase,
    deliverables: &'static [&'static str],
    criteria: &'static [&'static str],
}

pub fn generate_milestones(
    feature_num: &str,
    c: &ComplexityIndicators,
    today: NaiveDate,
) -> Vec<PlanMilestone> {
    let days = MilestoneDays::from_complexity(c);
    let mut steps = vec![
        Step {
            days: days.research,
            title: "Research Complete",
            phase: MilestonePhase::Research,
            deliverables: &["Research document", "Technical decisions", "Architecture selected"],
            criteria: &["All technical unknowns resolved", "Technology stack decided"],
        },
        Step {
            days: days.design,
            title: "Design & Contracts Complete",
            phase: MilestonePhase::Design,
            deliverables: &["Data models defined", "Contracts specified", "All tests written and failing"],
            criteria: &["TDD Red phase achieved", "All contracts documented"],
        },
        Step {
            days: days.implementation,
            title: "Core Implementation Complete",
            phase: MilestonePhase::Implementation,
            deliverables: &["All core features implemented", "All contract tests passing"],
            criteria: &["TDD Green phase achieved", "Core functionality working"],
        },
    ];
    if let Some(d) = days.integration {
        steps.push(Step {
            days: d,
            title: "Integration Complete",
            phase: MilestonePhase::Integration,
            deliverables: &["External systems integrated", "End-to-end functionality"],
            criteria: &["All integrations working", "System fully connected"],
        });
    }
    steps.push(Step {
        days: days.production,
        title: "Production Ready",
        phase: MilestonePhase::Testing,
        deliverables: &["All tests passing", "Documentation complete", "Deployment ready"],
        criteria: &["RULEMAP score at or above threshold", "All quality gates passed", "Stakeholder approval"],
    });

    let mut date = today;
    steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            date += Duration::days(step.days);
            PlanMilestone {
                id: format!("{feature_num}-M-{:03}", idx + 1),
                title: step.title.to_string(),
                date,
                deliverables: strings(step.deliverables),
                success_criteria: strings(step.criteria),
                phase: step.phase,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Decision blocks in the shape `extract::extract_plan_decisions` reads.
pub fn format_decisions(decisions: &[TechnicalDecision]) -> String {
    let mut out = String::new();
    for d in decisions {
        out.push_str(&format!(
            "### {}: {}\n\n**Category**: {}\n**Decision**: {}\n**Rationale**: {}\n**Status**: {}\n",
            d.id,
            d.title,
            d.category.heading(),
            d.decision,
            d.rationale,
            d.status.as_str(),
        ));
        if !d.alternatives.is_empty() {
            out.push_str(&format!("**Alternatives**: {}\n", d.alternatives.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Milestone blocks in the shape `extract::extract_plan_milestones` reads.
pub fn format_milestones(milestones: &[PlanMilestone]) -> String {
    let mut out = String::new();
    for m in milestones {
        out.push_str(&format!(
            "### {}: {}\n\n**Target Date**: {}\n**Phase**: {}\n\n**Deliverables**:\n",
            m.id,
            m.title,
            m.date.format("%Y-%m-%d"),
            m.phase.heading(),
        ));
        for d in &m.deliverables {
            out.push_str(&format!("- {d}\n"));
        }
        out.push_str("\n**Success Criteria**:\n");
        for c in &m.success_criteria {
            out.push_str(&format!("- {c}\n"));
        }
        out.push('\n');
    }
    out
}

fn format_requirements(analysis: &SpecAnalysis) -> String {
    let mut out = String::new();
    for r in &analysis.functional_requirements {
        out.push_str(&format!("- **{}**: {}\n", r.id, r.text));
    }
    for r in &analysis.requirement_refs {
        out.push_str(&format!("- **{r}**: tracked in specification\n"));
    }
    if out.is_empty() {
        out.push_str("*No functional requirements found in the specification*\n");
    }
    out
}

fn format_technology_stack(analysis: &SpecAnalysis, decisions: &[TechnicalDecision]) -> String {
    let decided = |cat: DecisionCategory| {
        decisions
            .iter()
            .find(|d| d.category == cat)
            .map(|d| d.decision.clone())
    };
    let platform = &analysis.technical_constraints.platform;
    format!(
        "```yaml\ntechnology_stack:\n  language: \"[To be confirmed]\"\n  framework: \"{}\"\n  database: \"{}\"\n  testing: \"{}\"\n  deployment: \"{}\"\n```\n",
        decided(DecisionCategory::Api).unwrap_or_else(|| "none".to_string()),
        decided(DecisionCategory::Data).unwrap_or_else(|| "none".to_string()),
        "unit, contract and integration",
        if platform.is_empty() { "[To be confirmed]" } else { platform.as_str() },
    )
}

fn format_overview(
    analysis: &SpecAnalysis,
    milestones: &[PlanMilestone],
) -> String {
    let mut out = format!(
        "**Requirements**: {} functional requirements\n**Acceptance Criteria**: {} test scenarios\n**User Stories**: {}\n**Complexity Score**: {}\n**Estimated Duration**: {} days\n",
        analysis.functional_requirements.len(),
        analysis.acceptance_criteria.len(),
        analysis.user_stories.len(),
        analysis.complexity.complexity_score,
        milestones.len() as u32 * DAYS_PER_MILESTONE,
    );
    let perf = &analysis.performance_requirements;
    let targets: Vec<(&str, &String)> = [
        ("Response time", &perf.response_time),
        ("Throughput", &perf.throughput),
        ("Concurrent users", &perf.concurrent_users),
        ("Availability", &perf.availability),
    ]
    .into_iter()
    .filter(|(_, v)| !v.is_empty())
    .collect();
    if !targets.is_empty() {
        out.push_str("\n**Performance Targets**:\n");
        for (label, value) in targets {
            out.push_str(&format!("- {label}: {value}\n"));
        }
    }
    if !analysis.dependencies.is_empty() {
        out.push_str("\n**Dependencies**:\n");
        for d in &analysis.dependencies {
            out.push_str(&format!("- {}\n", d.description));
        }
    }
    out
}

struct PlanDocs<'a> {
    feature_id: &'a str,
    date: String,
    analysis: &'a SpecAnalysis,
    score: &'a RulemapScore,
    decisions: &'a [TechnicalDecision],
    milestones: &'a [PlanMilestone],
}

impl PlanDocs<'_> {
    fn vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("feature name", display_name(self.feature_id)),
            ("feature-name", self.feature_id.to_string()),
            ("###", paths::feature_num(self.feature_id).to_string()),
            ("date", self.date.clone()),
            ("spec score", format!("{:.1}", self.score.score)),
            ("planning overview", format_overview(self.analysis, self.milestones)),
            (
                "technology stack",
                format_technology_stack(self.analysis, self.decisions),
            ),
            ("technical decisions", format_decisions(self.decisions)),
            ("milestones", format_milestones(self.milestones)),
            ("requirements mapping", format_requirements(self.analysis)),
        ]
    }

    fn basic_plan(&self) -> String {
        let vars = self.vars();
        let get = |k: &str| {
            vars.iter()
                .find(|(key, _)| *key == k)
                .map(|(_, v)| v.as_str())
                .unwrap_or("")
        };
        format!(
            "# Implementation Plan: {}\n\n**Feature ID**: {}\n**Plan ID**: {}-P\n**Date**: {}\n**RULEMAP Score**: {}/10.0\n**Status**: Draft\n\n---\n\n## Planning Overview\n\n{}\n---\n\n## Technology Stack\n\n{}\n---\n\n## Technical Decisions\n\n{}---\n\n## Implementation Phases\n\n{}---\n\n## Requirements Mapping\n\n{}\n---\n\n**Next Phase**: Task Generation (run: specmap tasks {})\n",
            get("feature name"),
            self.feature_id,
            get("###"),
            self.date,
            get("spec score"),
            get("planning overview"),
            get("technology stack"),
            get("technical decisions"),
            get("milestones"),
            get("requirements mapping"),
            self.feature_id,
        )
    }

    fn contracts(&self) -> String {
        let num = paths::feature_num(self.feature_id);
        let c = &self.analysis.complexity;
        let mut out = format!(
            "# Contracts: {id}\n\n**Feature**: {id}\n**Created**: {date}\n**Status**: Draft\n\n---\n\n## Data Contracts\n",
            id = self.feature_id,
            date = self.date,
        );
        if c.has_database {
            out.push_str(&format!(
                "\n### {num}-Entity-001: User\n\n```yaml\nattributes:\n  - id: UUID (Primary Key)\n  - email: String (Unique, Required)\n  - created_at: DateTime\n  - updated_at: DateTime\nrelationships:\n  - sessions: One-to-Many with UserSession\n```\n"
            ));
        } else {
            out.push_str("\n*No persistent entities required*\n");
        }
        if c.has_api {
            let implements: Vec<&str> = self
                .analysis
                .functional_requirements
                .iter()
                .take(2)
                .map(|r| r.id.as_str())
                .collect();
            out.push_str(&format!(
                "\n---\n\n## API Endpoints\n\n### POST /api/resource\n\n```yaml\npurpose: \"Create the primary resource\"\nimplements: [{}]\nrequest_schema:\n  type: object\nresponse_schema:\n  success:\n    type: object\n  error:\n    type: object\n    properties:\n      error:\n        type: string\nerror_codes:\n  - 400: Invalid request format\n  - 401: Unauthorized\n  - 429: Too many requests\n```\n",
                implements.join(", ")
            ));
        }
        out.push_str("\n---\n\n## Contract Tests\n\n");
        for (i, r) in self.analysis.functional_requirements.iter().take(3).enumerate() {
            let summary: String = r.text.chars().take(50).collect();
            out.push_str(&format!(
                "- **{num}-CT-{:03}**: Contract test for {summary}\n  - **Validates**: {}\n",
                i + 1,
                r.id
            ));
        }
        out.push_str("\n---\n\n**Contract Status**: Draft\n");
        out
    }

    fn data_models(&self) -> String {
        let num = paths::feature_num(self.feature_id);
        let mut out = format!(
            "# Data Models: {id}\n\n**Feature**: {id}\n**Created**: {date}\n**Status**: Draft\n\n---\n\n## Model Definitions\n",
            id = self.feature_id,
            date = self.date,
        );
        let user_requirement = self
            .analysis
            .functional_requirements
            .iter()
            .any(|r| r.text.to_lowercase().contains("user"));
        if user_requirement {
            out.push_str(&format!(
                "\n### {num}-Model-001: User\n\n**Purpose**: Represents system users\n\n```sql\nCREATE TABLE users (\n    id UUID PRIMARY KEY,\n    email VARCHAR(255) UNIQUE NOT NULL,\n    is_active BOOLEAN DEFAULT true,\n    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),\n    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()\n);\n\nCREATE INDEX idx_users_email ON users(email);\n```\n"
            ));
        } else {
            out.push_str("\n*Models are derived during the design milestone*\n");
        }
        if self.analysis.complexity.has_database {
            out.push_str(&format!(
                "\n---\n\n## Migration Strategy\n\n1. **{num}-Migration-001**: Create initial schema\n2. **{num}-Migration-002**: Create indexes\n"
            ));
        }
        out.push_str("\n---\n\n**Model Status**: Draft\n");
        out
    }
}

// ---------------------------------------------------------------------------
// generate_plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub feature_id: String,
    pub gate: GateDecision,
    pub plan_file: PathBuf,
    pub contracts_file: PathBuf,
    pub data_models_file: PathBuf,
    pub decisions: Vec<TechnicalDecision>,
    pub milestones: Vec<PlanMilestone>,
    pub analysis: SpecAnalysis,
    pub estimated_duration: u32,
    pub used_fallback: bool,
}

/// Gate the feature, then write plan.md, contracts.md and data-models.md.
///
/// An existing plan.md is kept unless `force` is set. A rejected gate
/// leaves state and files untouched.
pub fn generate_plan(
    project: &Project,
    feature_id: &str,
    today: NaiveDate,
    force: bool,
) -> Result<PlanOutcome> {
    let root = project.root();
    let gate = gate::check_planning_gate(project, feature_id)?;

    let plan_file = paths::plan_file(root, feature_id);
    if plan_file.exists() && !force {
        return Err(SpecmapError::PlanExists(feature_id.to_string()));
    }

    let analysis = analyze_specification(project, feature_id)?;
    let num = paths::feature_num(feature_id);
    let decisions = generate_decisions(num, &analysis.complexity);
    let milestones = generate_milestones(num, &analysis.complexity, today);
    let estimated_duration = milestones.len() as u32 * DAYS_PER_MILESTONE;

    WorkflowState::update(root, |state| {
        state.feature_mut(feature_id).advance(FeatureStatus::Planning);
        Ok(())
    })?;
    tracing::info!(feature = feature_id, reason = ?gate.reason, "planning started");

    let docs = PlanDocs {
        feature_id,
        date: today.format("%Y-%m-%d").to_string(),
        analysis: &analysis,
        score: &gate.score,
        decisions: &decisions,
        milestones: &milestones,
    };

    let (plan, used_fallback) = match templates::render(root, templates::PLAN_TEMPLATE, &docs.vars()) {
        Ok(rendered) => (rendered, false),
        Err(SpecmapError::MissingTemplate(t)) => {
            tracing::debug!(template = %t, "plan template missing, using built-in");
            (docs.basic_plan(), true)
        }
        Err(e) => return Err(e),
    };

    let plan_dir = paths::plan_dir(root, feature_id);
    io::ensure_dir(&plan_dir)?;
    io::atomic_write(&plan_file, plan.as_bytes())?;
    let contracts_file = plan_dir.join(paths::CONTRACTS_MD);
    io::atomic_write(&contracts_file, docs.contracts().as_bytes())?;
    let data_models_file = plan_dir.join(paths::DATA_MODELS_MD);
    io::atomic_write(&data_models_file, docs.data_models().as_bytes())?;

    WorkflowState::update(root, |state| {
        let rec = state.feature_mut(feature_id);
        rec.advance(FeatureStatus::Planned);
        rec.plan_created = Some(Utc::now());
        rec.decisions = decisions.clone();
        rec.milestones = milestones.clone();
        rec.estimated_duration = Some(estimated_duration);
        state.set_phase(WorkflowPhase::Planning);
        Ok(())
    })?;
    tracing::info!(
        feature = feature_id,
        decisions = decisions.len(),
        milestones = milestones.len(),
        "plan generated"
    );

    Ok(PlanOutcome {
        feature_id: feature_id.to_string(),
        gate,
        plan_file,
        contracts_file,
        data_models_file,
        decisions,
        milestones,
        analysis,
        estimated_duration,
        used_fallback,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rulemap::tests::FULL_SPEC;
    use crate::types::ProjectType;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn setup(dir: &TempDir, spec: &str, with_templates: bool) -> Project {
        std::fs::create_dir_all(dir.path().join(paths::TEMPLATES_DIR)).unwrap();
        Config::new("demo", ProjectType::Api, "claude").save(dir.path()).unwrap();
        if with_templates {
            for (name, body) in templates::defaults() {
                std::fs::write(paths::template_path(dir.path(), name), body).unwrap();
            }
        }
        let fdir = paths::spec_dir(dir.path(), "001-auth");
        std::fs::create_dir_all(&fdir).unwrap();
        std::fs::write(fdir.join("spec.md"), spec).unwrap();
        let project = Project::open(dir.path()).unwrap();
        WorkflowState::update(dir.path(), |s| {
            s.add_feature(
                "001-auth",
                crate::state::FeatureRecord::new("auth", crate::state::TrackingIds::seed("001")),
            );
            Ok(())
        })
        .unwrap();
        project
    }

    fn indicators(score: f64, reqs: usize, integrations: usize) -> ComplexityIndicators {
        ComplexityIndicators {
            requirements_count: reqs,
            integrations_count: integrations,
            complexity_score: score,
            ..Default::default()
        }
    }

    #[test]
    fn decisions_follow_indicators() {
        let mut c = indicators(2.0, 0, 0);
        let d = generate_decisions("001", &c);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].category, DecisionCategory::Testing);
        assert_eq!(d[0].status, DecisionStatus::Approved);
        assert_eq!(d[0].id, "001-D-001");

        c.complexity_score = 6.0;
        c.has_auth = true;
        c.has_database = true;
        c.has_api = true;
        let d = generate_decisions("001", &c);
        let cats: Vec<_> = d.iter().map(|d| d.category).collect();
        assert_eq!(
            cats,
            vec![
                DecisionCategory::Architecture,
                DecisionCategory::Security,
                DecisionCategory::Data,
                DecisionCategory::Api,
                DecisionCategory::Testing,
            ]
        );
        assert!(d[..4].iter().all(|d| d.status == DecisionStatus::Proposed));
        assert_eq!(d[4].id, "001-D-005");
    }

    #[test]
    fn milestones_without_integrations() {
        let ms = generate_milestones("001", &indicators(0.0, 0, 0), today());
        assert_eq!(ms.len(), 4);
        let ids: Vec<_> = ms.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["001-M-001", "001-M-002", "001-M-003", "001-M-004"]);
        // 2 + 3 + 5 + 3 days
        assert_eq!(ms[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(ms[3].date, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
        assert_eq!(ms[3].phase, MilestonePhase::Testing);
    }

    #[test]
    fn milestones_scale_with_complexity() {
        // c=10, r=10, i=3: research 5, design 5, impl 20, integration 6, prod 5
        let ms = generate_milestones("002", &indicators(10.0, 10, 3), today());
        assert_eq!(ms.len(), 5);
        assert_eq!(ms[3].phase, MilestonePhase::Integration);
        assert_eq!(ms[3].id, "002-M-004");
        assert_eq!(ms[4].date, today() + Duration::days(41));
    }

    #[test]
    fn formatted_blocks_reparse() {
        let c = ComplexityIndicators {
            has_auth: true,
            has_api: true,
            ..indicators(6.0, 2, 1)
        };
        let decisions = generate_decisions("001", &c);
        let milestones = generate_milestones("001", &c, today());
        let md = format!(
            "{}\n{}",
            format_decisions(&decisions),
            format_milestones(&milestones)
        );

        let parsed = extract::extract_plan_decisions(&md);
        assert_eq!(parsed.len(), decisions.len());
        assert_eq!(parsed[1].id, "001-D-002");
        assert_eq!(parsed[1].category, "Security");

        let parsed = extract::extract_plan_milestones(&md);
        assert_eq!(parsed.len(), milestones.len());
        assert_eq!(parsed[0].date, "2026-03-05");
        assert_eq!(parsed[0].phase, "Research");
    }

    #[test]
    fn gate_rejection_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, "# draft\n[NEEDS CLARIFICATION: x]\n", true);
        let before = project.state().unwrap();

        let err = generate_plan(&project, "001-auth", today(), false).unwrap_err();
        assert!(matches!(err, SpecmapError::ThresholdNotMet { .. }));
        assert!(!paths::plan_file(dir.path(), "001-auth").exists());
        assert_eq!(project.state().unwrap(), before);
    }

    #[test]
    fn plan_from_template() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, true);
        let out = generate_plan(&project, "001-auth", today(), false).unwrap();
        assert!(!out.used_fallback);

        let plan = std::fs::read_to_string(&out.plan_file).unwrap();
        assert!(plan.contains("# Implementation Plan: 001 Auth"));
        assert!(plan.contains("**RULEMAP Score**: 10.0/10.0"));
        assert!(plan.contains("technology_stack:"));
        assert!(plan.contains("- **FR-001**: Users can sign in with an OAuth provider"));
        assert_eq!(
            extract::extract_plan_decisions(&plan).len(),
            out.decisions.len()
        );
        assert_eq!(
            extract::extract_plan_milestones(&plan).len(),
            out.milestones.len()
        );
        assert!(out.contracts_file.exists());
        assert!(out.data_models_file.exists());

        let state = project.state().unwrap();
        let rec = state.feature("001-auth").unwrap();
        assert_eq!(rec.status, FeatureStatus::Planned);
        assert_eq!(rec.decisions, out.decisions);
        assert_eq!(rec.estimated_duration, Some(out.milestones.len() as u32 * 7));
        assert!(rec.plan_created.is_some());
        assert_eq!(state.current_phase, WorkflowPhase::Planning);
    }

    #[test]
    fn plan_without_template_falls_back() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, false);
        let out = generate_plan(&project, "001-auth", today(), false).unwrap();
        assert!(out.used_fallback);
        let plan = std::fs::read_to_string(&out.plan_file).unwrap();
        assert!(plan.contains("technology_stack:"));
        assert!(!extract::extract_plan_decisions(&plan).is_empty());
    }

    #[test]
    fn existing_plan_needs_force_and_never_regresses() {
        let dir = TempDir::new().unwrap();
        let project = setup(&dir, FULL_SPEC, true);
        generate_plan(&project, "001-auth", today(), false).unwrap();
        assert!(matches!(
            generate_plan(&project, "001-auth", today(), false),
            Err(SpecmapError::PlanExists(_))
        ));

        WorkflowState::update(dir.path(), |s| {
            s.feature_mut("001-auth").advance(FeatureStatus::TasksGenerated);
            Ok(())
        })
        .unwrap();
        generate_plan(&project, "001-auth", today(), true).unwrap();
        let state = project.state().unwrap();
        assert_eq!(
            state.feature("001-auth").unwrap().status,
            FeatureStatus::TasksGenerated
        );
    }

    #[test]
    fn data_models_follow_user_requirements() {
        let analysis = SpecAnalysis::from_markdown("001-auth", FULL_SPEC);
        let score = crate::rulemap::score_content(FULL_SPEC, 8.0);
        let docs = PlanDocs {
            feature_id: "001-auth",
            date: "2026-03-02".to_string(),
            analysis: &analysis,
            score: &score,
            decisions: &[],
            milestones: &[],
        };
        let models = docs.data_models();
        assert!(models.contains("### 001-Model-001: User"));
        assert!(models.contains("001-Migration-001"));
        let contracts = docs.contracts();
        assert!(contracts.contains("**001-CT-001**"));
        assert!(contracts.contains("**Validates**: FR-001"));
    }
}
