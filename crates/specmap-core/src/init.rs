use crate::config::Config;
use crate::error::{Result, SpecmapError};
use crate::io;
use crate::paths;
use crate::state::WorkflowState;
use crate::templates;
use crate::types::{validate_agent, AgentRole, ProjectType, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONSTITUTION_FILE: &str = "00-governance/constitution.md";
pub const CHARTER_FILE: &str = "00-governance/project-charter.md";
pub const AGENT_ASSIGNMENTS_FILE: &str = "04-agents/agent-assignments.md";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitOutcome {
    pub path: PathBuf,
    pub name: String,
    pub project_type: ProjectType,
    pub agent: String,
    pub folders_created: usize,
    /// Files written, relative to the project root.
    pub files: Vec<String>,
}

/// Scaffold a new project.
///
/// The project lands in `base/name`, or in `base` itself when `here` is
/// set. A directory that already holds `.specmap/` is refused with
/// `ProjectExists`; nothing is touched in that case.
pub fn init_project(
    base: &Path,
    name: &str,
    project_type: ProjectType,
    agent: &str,
    here: bool,
    now: DateTime<Utc>,
) -> Result<InitOutcome> {
    validate_agent(agent)?;
    let root = if here { base.to_path_buf() } else { base.join(name) };
    if paths::specmap_dir(&root).exists() {
        return Err(SpecmapError::ProjectExists(root.display().to_string()));
    }

    let mut folders_created = 0;
    for dir in paths::FOLDER_STRUCTURE {
        let p = root.join(dir);
        if !p.is_dir() {
            io::ensure_dir(&p)?;
            folders_created += 1;
        }
    }

    let mut files = Vec::new();

    let mut config = Config::new(name, project_type, agent);
    config.project.created = Some(now);
    config.save(&root)?;
    files.push(paths::CONFIG_FILE.to_string());

    let mut state = WorkflowState::new();
    state.set_phase(WorkflowPhase::Initialization);
    state.save(&root)?;
    files.push(paths::STATE_FILE.to_string());

    let date = now.format("%Y-%m-%d").to_string();
    let stamp = now.format("%Y-%m-%d %H:%M").to_string();
    let docs = [
        (CONSTITUTION_FILE, constitution(name, project_type, &stamp, &date)),
        (CHARTER_FILE, charter(name, project_type, &stamp)),
        ("README.md", readme(name, project_type, agent, &date)),
        (".gitignore", GITIGNORE.to_string()),
        (AGENT_ASSIGNMENTS_FILE, agent_assignments(agent, &date)),
    ];
    for (rel, body) in docs {
        io::atomic_write(&root.join(rel), body.as_bytes())?;
        files.push(rel.to_string());
    }

    for (tname, body) in templates::defaults() {
        io::atomic_write(&paths::template_path(&root, tname), body.as_bytes())?;
        files.push(format!("{}/{tname}", paths::TEMPLATES_DIR));
    }

    tracing::info!(
        path = %root.display(),
        project_type = project_type.as_str(),
        agent,
        folders = folders_created,
        "project initialized"
    );

    Ok(InitOutcome {
        path: root,
        name: name.to_string(),
        project_type,
        agent: agent.to_string(),
        folders_created,
        files,
    })
}

// ---------------------------------------------------------------------------
// Governance documents
// ---------------------------------------------------------------------------

const ARTICLES: &[(&str, &str, &[&str])] = &[
    (
        "Modularity",
        "Every feature is designed with clear boundaries and minimal dependencies.",
        &[
            "Features are independently testable",
            "Components expose well-defined interfaces",
            "Coupling is kept to a minimum",
        ],
    ),
    (
        "Simplicity First",
        "Complexity must be justified. Start simple and add complexity only when needed.",
        &[
            "Prefer simple solutions over clever ones",
            "Document every complexity justification",
        ],
    ),
    (
        "Test-First Development",
        "All implementation follows test-driven development.",
        &[
            "Tests are written before implementation",
            "New tests fail first (Red)",
            "Implementation makes them pass (Green)",
            "Refactoring keeps them passing",
        ],
    ),
    (
        "Documentation Standards",
        "Code and design decisions are documented.",
        &[
            "Public interfaces carry documentation",
            "Architectural decisions are recorded",
            "API specifications stay current",
        ],
    ),
    (
        "Quality Gates",
        "Quality thresholds are met before a phase advances.",
        &[
            "RULEMAP score >= 8.0 for specifications",
            "Constitution compliance for every implementation",
            "Performance requirements are validated",
        ],
    ),
    (
        "Stakeholder Alignment",
        "Development stays aligned with business objectives.",
        &[
            "Regular stakeholder reviews",
            "Clear success criteria for every feature",
        ],
    ),
];

const NUMERALS: &[&str] = &["I", "II", "III", "IV", "V", "VI"];

fn constitution(name: &str, project_type: ProjectType, stamp: &str, date: &str) -> String {
    let mut out = format!(
        "# Project Constitution: {name}\n\n**Created**: {stamp}\n**Type**: {project_type}\n\n---\n\n## Preamble\n\nThese principles govern development decisions, architecture and implementation for {name}.\n\n---\n\n"
    );
    for (i, (title, principle, rules)) in ARTICLES.iter().enumerate() {
        out.push_str(&format!("## Article {}: {title}\n\n{principle}\n\n**Requirements:**\n", NUMERALS[i]));
        for r in *rules {
            out.push_str(&format!("- {r}\n"));
        }
        out.push_str("\n---\n\n");
    }
    out.push_str(
        "## Constitution Compliance\n\nEvery specification closes with a Constitution Compliance section that checks it against the articles above.\n\n## Amendment Process\n\n1. Documented proposal with rationale\n2. Stakeholder review and approval\n3. Impact assessment on existing work\n\n---\n\n",
    );
    out.push_str(&format!("**Status**: Active\n**Version**: 1.0\n**Last Updated**: {date}\n"));
    out
}

fn charter(name: &str, project_type: ProjectType, stamp: &str) -> String {
    format!(
        r#"# Project Charter: {name}

**Project Type**: {project_type}
**Created**: {stamp}
**Status**: Initiated

---

## R - ROLE & AUTHORITY

**Primary Stakeholder**: [To be defined]
**Decision Authority**: [To be defined]
**Team Lead**: [To be assigned]

---

## U - UNDERSTANDING & OBJECTIVES

**Problem Statement**: [Define the core problem this project solves]
**Primary Objective**: [Main goal or outcome desired]
**Success Definition**: [How will we know we've succeeded?]

---

## L - LOGIC & APPROACH

1. **Requirements & Planning** (Estimated: [Duration])
2. **Design & Architecture** (Estimated: [Duration])
3. **Development & Testing** (Estimated: [Duration])
4. **Deployment & Launch** (Estimated: [Duration])

---

## E - ELEMENTS & CONSTRAINTS

**Platform**: {project_type}
**Technology Stack**: [To be determined]
**Integration Requirements**: [Systems to connect with]
**Performance Requirements**: [Speed, scale, reliability needs]

---

## M - MOOD & EXPERIENCE

**Emotional Target**: [How should users feel when using this?]

---

## A - AUDIENCE & STAKEHOLDERS

| Role | Interest Level | Influence | Engagement Strategy |
|------|---------------|-----------|-------------------|
| [Stakeholder] | [High/Med/Low] | [High/Med/Low] | [How to involve] |

---

## P - PERFORMANCE & SUCCESS

**Business Metrics**: [ROI, revenue impact, cost savings]
**User Metrics**: [Adoption, satisfaction, usage]
**Technical Metrics**: [Performance, reliability, quality]

---

## Next Steps

1. Complete stakeholder identification
2. Run: specmap specify "<description>" to create the first feature
"#
    )
}

fn readme(name: &str, project_type: ProjectType, agent: &str, date: &str) -> String {
    let roles: String = AgentRole::all()
        .iter()
        .map(|r| format!("- **{}**: {}\n", r.as_str(), r.description()))
        .collect();
    format!(
        r#"# {name}

*{project_type} project managed with specmap*

## Workflow

```
specify -> clarify -> plan -> tasks -> implement
```

Planning starts only once a specification reaches a RULEMAP score of 8.0.

```bash
specmap specify "Your feature description"
specmap clarify
specmap plan
specmap tasks
specmap status
```

## Project Structure

```
{name}/
├── .specmap/                 # Configuration, workflow state, templates
├── 00-governance/            # Constitution and charter
├── 01-specifications/        # RULEMAP specifications
├── 02-planning/              # Plans and task breakdowns
├── 03-implementation/        # Development tracking
├── 04-agents/                # Agent sessions and assignments
├── 05-quality-assurance/     # Validation reports
├── 06-documentation/         # Project docs
├── 07-project-tracking/      # Progress tracking
└── 08-deliverables/          # Final outputs
```

## Agents

**Base agent**: {agent}

{roles}
---

**Created**: {date}
"#
    )
}

fn agent_assignments(agent: &str, date: &str) -> String {
    let mut out = format!(
        "# Agent Assignments - {date}\n\n## Base AI Agent\n\n**Agent**: {agent}\n**Status**: Configured\n\n---\n\n## Workflow Agents\n\n"
    );
    for (i, role) in AgentRole::all().iter().enumerate() {
        let status = if i == 0 { "Ready for activation" } else { "Standby" };
        out.push_str(&format!(
            "### {}\n- **Purpose**: {}\n- **Status**: {status}\n\n",
            role.as_str(),
            role.description()
        ));
    }
    out.push_str(
        "---\n\n## Handoff Protocols\n\n- **Specification -> Planning**: RULEMAP score >= 8.0\n- **Planning -> Development**: plan approved\n- **Development -> QA**: implementation complete\n\n",
    );
    out.push_str(&format!("**Last Updated**: {date}\n"));
    out
}

const GITIGNORE: &str = "# specmap project

*.tmp
*~
.DS_Store
Thumbs.db

04-agents/session-summaries/.working/
04-agents/agent-performance/.cache/

.specmap/local-config.yaml
.specmap/.env

*.bak
*.log
logs/

.vscode/
.idea/
*.swp
";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        "2026-03-02T10:30:00Z".parse().unwrap()
    }

    #[test]
    fn init_creates_structure_and_documents() {
        let dir = TempDir::new().unwrap();
        let out = init_project(dir.path(), "demo", ProjectType::Api, "claude", false, now()).unwrap();
        let root = dir.path().join("demo");
        assert_eq!(out.path, root);
        assert_eq!(out.folders_created, paths::FOLDER_STRUCTURE.len());

        for dir in paths::FOLDER_STRUCTURE {
            assert!(root.join(dir).is_dir(), "missing {dir}");
        }
        for f in &out.files {
            assert!(root.join(f).is_file(), "missing {f}");
        }
        assert!(root.join(".specmap/templates/plan-template.md").is_file());

        let constitution = std::fs::read_to_string(root.join(CONSTITUTION_FILE)).unwrap();
        assert!(constitution.contains("## Article III: Test-First Development"));
        assert!(constitution.contains("## Constitution Compliance"));
    }

    #[test]
    fn init_writes_config_and_state() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), "demo", ProjectType::Api, "gemini", false, now()).unwrap();
        let project = Project::open(&dir.path().join("demo")).unwrap();
        assert_eq!(project.config().project.name, "demo");
        assert_eq!(project.config().project.project_type, ProjectType::Api);
        assert_eq!(project.config().agents.base_agent, "gemini");
        assert_eq!(project.config().threshold(), 8.0);

        let state = project.state().unwrap();
        assert_eq!(state.current_phase, WorkflowPhase::Initialization);
        assert!(state.features.is_empty());
    }

    #[test]
    fn init_here_uses_base_dir() {
        let dir = TempDir::new().unwrap();
        let out = init_project(dir.path(), "demo", ProjectType::Library, "claude", true, now()).unwrap();
        assert_eq!(out.path, dir.path());
        assert!(dir.path().join(".specmap/config.yaml").is_file());
    }

    #[test]
    fn init_refuses_existing_project() {
        let dir = TempDir::new().unwrap();
        init_project(dir.path(), "demo", ProjectType::Api, "claude", false, now()).unwrap();
        let err = init_project(dir.path(), "demo", ProjectType::Api, "claude", false, now()).unwrap_err();
        assert!(matches!(err, SpecmapError::ProjectExists(_)));
    }

    #[test]
    fn init_rejects_unknown_agent() {
        let dir = TempDir::new().unwrap();
        let err = init_project(dir.path(), "demo", ProjectType::Api, "hal9000", false, now()).unwrap_err();
        assert!(matches!(err, SpecmapError::UnknownAgent(_)));
        assert!(!dir.path().join("demo").exists());
    }
}
