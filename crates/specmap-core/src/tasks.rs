use crate::error::{Result, SpecmapError};
use crate::extract::{
    self, IntegrationPoint, PerformanceRequirements, PlanComplexity, PlanDecisionRef,
    PlanMilestoneRef, TechnologyStack,
};
use crate::feature::display_name;
use crate::io;
use crate::paths;
use crate::project::Project;
use crate::state::WorkflowState;
use crate::templates;
use crate::types::{FeatureStatus, WorkflowPhase};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const HOURS_PER_DAY: f64 = 8.0;

static HOURS_RE: OnceLock<Regex> = OnceLock::new();
static DAYS_RE: OnceLock<Regex> = OnceLock::new();

fn hours_re() -> &'static Regex {
    HOURS_RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*hour").unwrap())
}

fn days_re() -> &'static Regex {
    DAYS_RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*day").unwrap())
}

// ---------------------------------------------------------------------------
// TaskKind / TaskPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Setup,
    ContractTest,
    IntegrationTest,
    ModelTest,
    ModelImplementation,
    ServiceImplementation,
    Middleware,
    ApiEndpoint,
    Database,
    DatabaseIntegration,
    ExternalIntegration,
    PerformanceTest,
    SecurityTest,
    ManualTesting,
    Documentation,
}

impl TaskKind {
    pub fn label(self) -> &'static str {
        match self {
            TaskKind::Setup => "Setup",
            TaskKind::ContractTest => "Contract Test",
            TaskKind::IntegrationTest => "Integration Test",
            TaskKind::ModelTest => "Model Test",
            TaskKind::ModelImplementation => "Model Implementation",
            TaskKind::ServiceImplementation => "Service Implementation",
            TaskKind::Middleware => "Middleware",
            TaskKind::ApiEndpoint => "API Endpoint",
            TaskKind::Database => "Database",
            TaskKind::DatabaseIntegration => "Database Integration",
            TaskKind::ExternalIntegration => "External Integration",
            TaskKind::PerformanceTest => "Performance Test",
            TaskKind::SecurityTest => "Security Test",
            TaskKind::ManualTesting => "Manual Testing",
            TaskKind::Documentation => "Documentation",
        }
    }

    pub fn is_test(self) -> bool {
        matches!(
            self,
            TaskKind::ContractTest
                | TaskKind::IntegrationTest
                | TaskKind::ModelTest
                | TaskKind::PerformanceTest
                | TaskKind::SecurityTest
        )
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Setup,
    TddRed,
    TddGreen,
    Integration,
    Qa,
    DocsDeploy,
}

impl TaskPhase {
    pub fn all() -> &'static [TaskPhase] {
        &[
            TaskPhase::Setup,
            TaskPhase::TddRed,
            TaskPhase::TddGreen,
            TaskPhase::Integration,
            TaskPhase::Qa,
            TaskPhase::DocsDeploy,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPhase::Setup => "setup",
            TaskPhase::TddRed => "tdd_red",
            TaskPhase::TddGreen => "tdd_green",
            TaskPhase::Integration => "integration",
            TaskPhase::Qa => "qa",
            TaskPhase::DocsDeploy => "docs_deploy",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            TaskPhase::Setup => "Setup",
            TaskPhase::TddRed => "TDD Red",
            TaskPhase::TddGreen => "TDD Green",
            TaskPhase::Integration => "Integration",
            TaskPhase::Qa => "QA",
            TaskPhase::DocsDeploy => "Docs & Deploy",
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub file: String,
    pub description: String,
    pub estimated: String,
    pub parallel: bool,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validates: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub makes_pass: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub must_fail: bool,
    pub phase: TaskPhase,
}

impl Task {
    /// Estimate in hours: `N hours`, or `N days` at eight hours a day.
    /// Anything else counts as one hour.
    pub fn hours(&self) -> f64 {
        parse_estimate(&self.estimated)
    }
}

pub fn parse_estimate(estimate: &str) -> f64 {
    let lower = estimate.to_lowercase();
    if lower.contains("hour") {
        return hours_re()
            .captures(&lower)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1.0);
    }
    if lower.contains("day") {
        return days_re()
            .captures(&lower)
            .and_then(|c| c[1].parse::<f64>().ok())
            .map(|d| d * HOURS_PER_DAY)
            .unwrap_or(HOURS_PER_DAY);
    }
    1.0
}

// ---------------------------------------------------------------------------
// Plan analysis
// ---------------------------------------------------------------------------

/// What task generation reads back out of plan.md.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanAnalysis {
    pub decisions: Vec<PlanDecisionRef>,
    pub milestones: Vec<PlanMilestoneRef>,
    pub requirement_refs: Vec<String>,
    pub technology_stack: TechnologyStack,
    pub complexity: PlanComplexity,
    pub performance: PerformanceRequirements,
    pub integration_points: Vec<IntegrationPoint>,
}

impl PlanAnalysis {
    pub fn from_markdown(md: &str) -> Self {
        Self {
            decisions: extract::extract_plan_decisions(md),
            milestones: extract::extract_plan_milestones(md),
            requirement_refs: extract::extract_requirement_refs(md),
            technology_stack: extract::extract_technology_stack(md),
            complexity: extract::analyze_plan_complexity(md),
            performance: extract::extract_plan_performance(md),
            integration_points: extract::extract_integration_points(md),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Accumulates tasks with sequential `{num}-T-NNN` ids.
///
/// Dependencies in the catalog are positional: a task points at "the task
/// before this phase" or "the previous task" by sequence number. This is a
/// heuristic. It does not look at what the tasks actually produce, and
/// references that land outside the generated set are dropped afterwards.
struct Catalog<'a> {
    num: &'a str,
    tasks: Vec<Task>,
    phase: TaskPhase,
    /// Sequence number of the first task in the current phase.
    start: i64,
}

struct Spec<'s> {
    title: String,
    kind: TaskKind,
    file: String,
    description: &'s str,
    estimated: &'s str,
    parallel: bool,
    depends_on: Vec<i64>,
    implements: Option<String>,
    validates: Option<String>,
    makes_pass: Vec<i64>,
    must_fail: bool,
}

impl<'s> Spec<'s> {
    fn new(title: impl Into<String>, kind: TaskKind, file: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            file: file.into(),
            description: "",
            estimated: "1 hour",
            parallel: false,
            depends_on: Vec::new(),
            implements: None,
            validates: None,
            makes_pass: Vec::new(),
            must_fail: false,
        }
    }

    fn describe(mut self, description: &'s str, estimated: &'s str) -> Self {
        self.description = description;
        self.estimated = estimated;
        self
    }

    fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    fn after(mut self, seq: i64) -> Self {
        self.depends_on.push(seq);
        self
    }

    fn implements(mut self, r: impl Into<String>) -> Self {
        self.implements = Some(r.into());
        self
    }

    fn validates(mut self, r: impl Into<String>) -> Self {
        self.validates = Some(r.into());
        self
    }

    fn makes_pass(mut self, seq: i64) -> Self {
        self.makes_pass.push(seq);
        self
    }

    fn must_fail(mut self) -> Self {
        self.must_fail = true;
        self
    }
}

impl<'a> Catalog<'a> {
    fn new(num: &'a str) -> Self {
        Self {
            num,
            tasks: Vec::new(),
            phase: TaskPhase::Setup,
            start: 1,
        }
    }

    fn begin(&mut self, phase: TaskPhase) {
        self.phase = phase;
        self.start = self.next();
    }

    /// Sequence number the next task will get.
    fn next(&self) -> i64 {
        self.tasks.len() as i64 + 1
    }

    /// Sequence number of the most recent task.
    fn last(&self) -> i64 {
        self.next() - 1
    }

    fn tid(&self, seq: i64) -> String {
        format!("{}-T-{:03}", self.num, seq)
    }

    fn req(&self, n: u32) -> String {
        format!("{}-R-{:03}", self.num, n)
    }

    fn acc(&self, n: u32) -> String {
        format!("{}-A-{:03}", self.num, n)
    }

    fn push(&mut self, spec: Spec<'_>) {
        let task = Task {
            id: self.tid(self.next()),
            title: spec.title,
            kind: spec.kind,
            file: spec.file,
            description: spec.description.to_string(),
            estimated: spec.estimated.to_string(),
            parallel: spec.parallel,
            depends_on: spec.depends_on.iter().map(|s| self.tid(*s)).collect(),
            blocks: Vec::new(),
            implements: spec.implements,
            validates: spec.validates,
            makes_pass: spec.makes_pass.iter().map(|s| self.tid(*s)).collect(),
            must_fail: spec.must_fail,
            phase: self.phase,
        };
        self.tasks.push(task);
    }
}

fn setup_tasks(cat: &mut Catalog<'_>, plan: &PlanAnalysis) {
    cat.begin(TaskPhase::Setup);
    let stack = &plan.technology_stack;

    cat.push(
        Spec::new("Initialize project structure", TaskKind::Setup, "Project root")
            .describe("Set up initial project structure and configuration", "0.5 hours"),
    );
    let framework = if stack.framework.is_empty() || stack.framework == "none" {
        "framework".to_string()
    } else {
        stack.framework.clone()
    };
    let deps_title = format!("Install {framework} and other dependencies");
    cat.push(
        Spec::new("Install and configure dependencies", TaskKind::Setup, "Dependency manifest")
            .describe(&deps_title, "1 hour")
            .after(cat.last()),
    );
    cat.push(
        Spec::new("Configure development tools", TaskKind::Setup, "Lint and format config")
            .describe("Set up linting, formatting, and code quality tools", "1 hour")
            .parallel()
            .after(cat.last()),
    );
    cat.push(
        Spec::new("Setup testing framework", TaskKind::Setup, "Test configuration")
            .describe("Configure the testing framework and test layout", "1 hour")
            .parallel()
            .after(cat.last()),
    );
}

fn tdd_red_tasks(cat: &mut Catalog<'_>, plan: &PlanAnalysis) {
    cat.begin(TaskPhase::TddRed);
    let s = cat.start;
    let c = &plan.complexity;

    if c.has_api {
        cat.push(
            Spec::new("Contract test POST /api/resource", TaskKind::ContractTest, "tests/contract/resource_post")
                .describe("Test API contract for POST endpoint - MUST FAIL initially", "2 hours")
                .parallel()
                .after(s - 1)
                .implements(cat.req(1))
                .validates(cat.acc(1))
                .must_fail(),
        );
        cat.push(
            Spec::new("Contract test GET /api/resource/{id}", TaskKind::ContractTest, "tests/contract/resource_get")
                .describe("Test API contract for GET endpoint - MUST FAIL initially", "2 hours")
                .parallel()
                .after(s - 1)
                .implements(cat.req(2))
                .validates(cat.acc(2))
                .must_fail(),
        );
    }

    cat.push(
        Spec::new("Integration test for primary user story", TaskKind::IntegrationTest, "tests/integration/user_story_1")
            .describe("End-to-end test for main user workflow - MUST FAIL initially", "3 hours")
            .parallel()
            .after(s - 1)
            .implements(cat.req(3))
            .validates(cat.acc(3))
            .must_fail(),
    );

    if c.has_database {
        cat.push(
            Spec::new("Tests for User model", TaskKind::ModelTest, "tests/models/user")
                .describe("Test User entity creation and validation - MUST FAIL initially", "2 hours")
                .parallel()
                .after(s - 1)
                .implements(cat.req(4))
                .must_fail(),
        );
        if c.entity_count > 1 {
            cat.push(
                Spec::new("Tests for Session model", TaskKind::ModelTest, "tests/models/session")
                    .describe("Test Session entity and relationships - MUST FAIL initially", "2 hours")
                    .parallel()
                    .after(s - 1)
                    .implements(cat.req(5))
                    .must_fail(),
            );
        }
    }
}

fn tdd_green_tasks(cat: &mut Catalog<'_>, plan: &PlanAnalysis) {
    cat.begin(TaskPhase::TddGreen);
    let s = cat.start;
    let c = &plan.complexity;

    if c.has_database {
        cat.push(
            Spec::new("Implement User model", TaskKind::ModelImplementation, "src/models/user")
                .describe("Implement User entity to make model tests pass", "3 hours")
                .parallel()
                .after(s - 1)
                .implements(cat.req(4))
                .makes_pass(s - 1),
        );
        if c.entity_count > 1 {
            cat.push(
                Spec::new("Implement Session model", TaskKind::ModelImplementation, "src/models/session")
                    .describe("Implement Session entity to make tests pass", "3 hours")
                    .parallel()
                    .after(s)
                    .implements(cat.req(5))
                    .makes_pass(s),
            );
        }
    }

    let service_dep = if c.has_database { cat.last() } else { s - 1 };
    cat.push(
        Spec::new("Implement core service", TaskKind::ServiceImplementation, "src/services/core")
            .describe("Implement the feature's business logic", "4 hours")
            .parallel()
            .after(service_dep)
            .implements(cat.req(1))
            .makes_pass(s - 2),
    );
    cat.push(
        Spec::new("Implement validation middleware", TaskKind::Middleware, "src/middleware/validation")
            .describe("Implement request validation middleware", "3 hours")
            .after(cat.last())
            .implements(cat.req(2)),
    );

    if c.has_api {
        cat.push(
            Spec::new("Implement POST /api/resource", TaskKind::ApiEndpoint, "src/api/endpoints")
                .describe("Implement create endpoint to make contract tests pass", "3 hours")
                .after(cat.last())
                .implements(cat.req(1))
                .makes_pass(s - 3),
        );
        cat.push(
            Spec::new("Implement GET /api/resource/{id}", TaskKind::ApiEndpoint, "src/api/endpoints")
                .describe("Implement read endpoint", "2 hours")
                .after(cat.last())
                .implements(cat.req(2))
                .makes_pass(s - 2),
        );
    }
}

fn integration_tasks(cat: &mut Catalog<'_>, plan: &PlanAnalysis) {
    cat.begin(TaskPhase::Integration);
    let s = cat.start;
    let c = &plan.complexity;

    if c.has_database {
        cat.push(
            Spec::new("Create database migration scripts", TaskKind::Database, "migrations/001_initial_schema.sql")
                .describe("Create database schema migration", "3 hours")
                .after(s - 1)
                .implements("Data model from plan"),
        );
        cat.push(
            Spec::new("Connect models to database", TaskKind::DatabaseIntegration, "src/database/connection")
                .describe("Set up database access and connection pooling", "2 hours")
                .after(cat.last()),
        );
    }

    if c.has_auth {
        cat.push(
            Spec::new("Implement authentication middleware", TaskKind::Middleware, "src/middleware/auth")
                .describe("Implement token authentication middleware", "5 hours")
                .parallel()
                .after(s - 1)
                .implements(cat.req(6)),
        );
    }

    if let Some(point) = plan.integration_points.first() {
        let description = format!("Implement {} integration", point.name);
        cat.push(
            Spec::new(
                format!("Integrate with {}", point.name),
                TaskKind::ExternalIntegration,
                format!("src/integrations/{}", point.name.to_lowercase()),
            )
            .describe(&description, "4 hours")
            .parallel()
            .after(s - 1)
            .implements(cat.req(7)),
        );
    }

    cat.push(
        Spec::new("Implement error handling middleware", TaskKind::Middleware, "src/middleware/error_handler")
            .describe("Global error handling and logging", "3 hours")
            .parallel()
            .after(cat.last()),
    );
}

fn qa_tasks(cat: &mut Catalog<'_>, plan: &PlanAnalysis) {
    cat.begin(TaskPhase::Qa);
    let s = cat.start;

    if plan.performance.has_load_targets() {
        cat.push(
            Spec::new("Load testing", TaskKind::PerformanceTest, "tests/performance/load")
                .describe("Test system performance under load", "4 hours")
                .parallel()
                .after(s - 1)
                .validates(cat.req(8)),
        );
    }
    if plan.complexity.has_auth {
        cat.push(
            Spec::new("Security audit", TaskKind::SecurityTest, "tests/security/audit")
                .describe("Comprehensive security testing", "5 hours")
                .parallel()
                .after(s - 1)
                .validates(cat.req(9)),
        );
    }
    cat.push(
        Spec::new("Execute quickstart validation scenarios", TaskKind::ManualTesting, "Manual test scenarios")
            .describe("Manual validation of all acceptance criteria", "4 hours")
            .after(cat.last())
            .validates("All acceptance criteria"),
    );
}

fn docs_deploy_tasks(cat: &mut Catalog<'_>) {
    cat.begin(TaskPhase::DocsDeploy);
    let s = cat.start;

    cat.push(
        Spec::new("Write user documentation", TaskKind::Documentation, "06-documentation/user-guides/feature.md")
            .describe("Create user guides", "4 hours")
            .parallel()
            .after(s - 1),
    );
    cat.push(
        Spec::new("Write technical documentation", TaskKind::Documentation, "06-documentation/technical-docs/feature.md")
            .describe("Create technical documentation and API reference", "3 hours")
            .parallel()
            .after(s - 1),
    );
    cat.push(
        Spec::new("Create deployment checklist", TaskKind::Documentation, "08-deliverables/deployment-checklist.md")
            .describe("Prepare deployment procedures and checklist", "2 hours")
            .after(cat.last()),
    );
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBreakdown {
    pub feature_id: String,
    pub tasks_by_phase: BTreeMap<TaskPhase, Vec<Task>>,
    pub all_tasks: Vec<Task>,
    pub total_tasks: usize,
    pub total_hours: f64,
    /// Working days at eight hours a day, at least one.
    pub estimated_duration: u32,
    pub parallel_groups: Vec<Vec<String>>,
}

/// Build the full breakdown for a feature from its parsed plan.
pub fn build_breakdown(feature_id: &str, plan: &PlanAnalysis) -> TaskBreakdown {
    let num = paths::feature_num(feature_id);
    let mut cat = Catalog::new(num);
    setup_tasks(&mut cat, plan);
    tdd_red_tasks(&mut cat, plan);
    tdd_green_tasks(&mut cat, plan);
    integration_tasks(&mut cat, plan);
    qa_tasks(&mut cat, plan);
    docs_deploy_tasks(&mut cat);

    let mut tasks = cat.tasks;
    resolve_dependencies(&mut tasks);
    mark_parallel(&mut tasks);

    let total_hours: f64 = tasks.iter().map(Task::hours).sum();
    let estimated_duration = ((total_hours / HOURS_PER_DAY).ceil() as u32).max(1);
    let parallel_groups = parallel_groups(&tasks);

    let mut tasks_by_phase: BTreeMap<TaskPhase, Vec<Task>> =
        TaskPhase::all().iter().map(|p| (*p, Vec::new())).collect();
    for t in &tasks {
        tasks_by_phase.entry(t.phase).or_default().push(t.clone());
    }

    TaskBreakdown {
        feature_id: feature_id.to_string(),
        tasks_by_phase,
        total_tasks: tasks.len(),
        all_tasks: tasks,
        total_hours,
        estimated_duration,
        parallel_groups,
    }
}

/// Drop references to tasks that were not generated, then fill `blocks`.
fn resolve_dependencies(tasks: &mut [Task]) {
    let ids: HashSet<String> = tasks.iter().map(|t| t.id.clone()).collect();
    for t in tasks.iter_mut() {
        t.depends_on.retain(|d| ids.contains(d));
        t.makes_pass.retain(|d| ids.contains(d));
    }

    let mut blocks: HashMap<String, Vec<String>> = HashMap::new();
    for t in tasks.iter() {
        for dep in &t.depends_on {
            blocks.entry(dep.clone()).or_default().push(t.id.clone());
        }
    }
    for t in tasks.iter_mut() {
        t.blocks = blocks.remove(&t.id).unwrap_or_default();
    }
}

/// A task flagged parallel stays parallel if it is a test, docs or setup
/// task, or if no other task touches its file.
fn mark_parallel(tasks: &mut [Task]) {
    let mut per_file: HashMap<String, usize> = HashMap::new();
    for t in tasks.iter() {
        *per_file.entry(t.file.clone()).or_default() += 1;
    }
    for t in tasks.iter_mut() {
        let kind_ok = t.kind.is_test()
            || matches!(t.kind, TaskKind::Documentation | TaskKind::Setup);
        let sole_on_file = per_file.get(&t.file).copied().unwrap_or(0) == 1;
        t.parallel = t.parallel && (kind_ok || sole_on_file);
    }
}

/// Contiguous runs of parallel tasks, in order.
fn parallel_groups(tasks: &[Task]) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    for t in tasks {
        if t.parallel {
            current.push(t.id.clone());
        } else if !current.is_empty() {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn format_breakdown(b: &TaskBreakdown) -> String {
    let mut out = String::new();
    for (phase, tasks) in &b.tasks_by_phase {
        if tasks.is_empty() {
            continue;
        }
        out.push_str(&format!("### {} ({} tasks)\n\n", phase.heading(), tasks.len()));
        for t in tasks {
            let marker = if t.parallel { "[P] " } else { "" };
            out.push_str(&format!("- **{}**: {marker}{}\n", t.id, t.title));
            out.push_str(&format!("  - Type: {}\n", t.kind));
            out.push_str(&format!("  - File: {}\n", t.file));
            out.push_str(&format!("  - Estimated: {}\n", t.estimated));
            if let Some(r) = &t.implements {
                out.push_str(&format!("  - Implements: {r}\n"));
            }
            if let Some(v) = &t.validates {
                out.push_str(&format!("  - Validates: {v}\n"));
            }
            if !t.depends_on.is_empty() {
                out.push_str(&format!("  - Depends on: {}\n", t.depends_on.join(", ")));
            }
            out.push('\n');
        }
    }
    out
}

fn format_parallel_groups(b: &TaskBreakdown) -> String {
    if b.parallel_groups.is_empty() {
        return "*No parallel groups*\n".to_string();
    }
    b.parallel_groups
        .iter()
        .enumerate()
        .map(|(i, g)| format!("- **Group {}**: {}\n", i + 1, g.join(", ")))
        .collect()
}

fn tasks_vars(b: &TaskBreakdown, date: &str) -> Vec<(&'static str, String)> {
    vec![
        ("feature name", display_name(&b.feature_id)),
        ("feature-name", b.feature_id.clone()),
        ("date", date.to_string()),
        ("total tasks", b.total_tasks.to_string()),
        ("duration", b.estimated_duration.to_string()),
        ("task breakdown", format_breakdown(b)),
        ("parallel groups", format_parallel_groups(b)),
    ]
}

fn basic_tasks_doc(b: &TaskBreakdown, date: &str) -> String {
    format!(
        "# Tasks: {}\n\n**Feature ID**: {}\n**Generated**: {date}\n**Total Tasks**: {}\n**Estimated Duration**: {} days\n\n---\n\n## Task Breakdown by Phase\n\n{}---\n\n## Summary\n\n- **Total Tasks**: {}\n- **Estimated Duration**: {} days\n- **Parallel Groups**: {}\n\n**Status**: Ready for implementation\n",
        display_name(&b.feature_id),
        b.feature_id,
        b.total_tasks,
        b.estimated_duration,
        format_breakdown(b),
        b.total_tasks,
        b.estimated_duration,
        b.parallel_groups.len(),
    )
}

// ---------------------------------------------------------------------------
// generate_tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksOutcome {
    pub breakdown: TaskBreakdown,
    pub analysis: PlanAnalysis,
    pub tasks_file: PathBuf,
    pub used_fallback: bool,
}

/// Re-parse plan.md, build the task breakdown and write tasks.md.
pub fn generate_tasks(project: &Project, feature_id: &str, today: NaiveDate) -> Result<TasksOutcome> {
    project.require_feature(feature_id)?;
    let root = project.root();
    let plan_file = paths::plan_file(root, feature_id);
    let plan_md = match std::fs::read_to_string(&plan_file) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpecmapError::PlanNotFound(feature_id.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let analysis = PlanAnalysis::from_markdown(&plan_md);
    let breakdown = build_breakdown(feature_id, &analysis);
    let date = today.format("%Y-%m-%d").to_string();

    let (doc, used_fallback) =
        match templates::render(root, templates::TASKS_TEMPLATE, &tasks_vars(&breakdown, &date)) {
            Ok(rendered) => (rendered, false),
            Err(SpecmapError::MissingTemplate(t)) => {
                tracing::debug!(template = %t, "tasks template missing, using built-in");
                (basic_tasks_doc(&breakdown, &date), true)
            }
            Err(e) => return Err(e),
        };
    let tasks_file = paths::tasks_file(root, feature_id);
    io::atomic_write(&tasks_file, doc.as_bytes())?;

    WorkflowState::update(root, |state| {
        let rec = state.feature_mut(feature_id);
        rec.advance(FeatureStatus::TasksGenerated);
        rec.tasks_created = Some(Utc::now());
        rec.total_tasks = Some(breakdown.total_tasks);
        rec.estimated_duration = Some(breakdown.estimated_duration);
        rec.tracking_ids.tasks = breakdown.all_tasks.iter().map(|t| t.id.clone()).collect();
        state.set_phase(WorkflowPhase::TaskGeneration);
        Ok(())
    })?;
    tracing::info!(
        feature = feature_id,
        total = breakdown.total_tasks,
        days = breakdown.estimated_duration,
        "tasks generated"
    );

    Ok(TasksOutcome {
        breakdown,
        analysis,
        tasks_file,
        used_fallback,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
