use crate::error::{Result, SpecmapError};
use crate::io;
use crate::paths;
use crate::project::{self, Project};
use crate::state::{FeatureRecord, TrackingIds, WorkflowState};
use crate::templates;
use crate::types::WorkflowPhase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CORE_PROBLEM_PLACEHOLDER: &str = "**Core Problem**: [What needs solving]";

// ---------------------------------------------------------------------------
// Feature ids
// ---------------------------------------------------------------------------

/// Folder-safe slug from the first three words of a description.
///
/// `"Add OAuth login for admins"` → `"add-oauth-login"`.
pub fn slugify(description: &str) -> String {
    let words: Vec<&str> = description.split_whitespace().take(3).collect();
    let raw: String = words
        .join("-")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    let mut slug = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "feature".to_string()
    } else {
        slug.to_string()
    }
}

/// Next id after the highest existing sequence number. Gaps are never
/// refilled.
pub fn next_feature_id(existing: &[String], description: &str) -> String {
    let next = project::max_sequence(existing) + 1;
    format!("{next:03}-{}", slugify(description))
}

/// `"001-user-auth"` → `"001 User Auth"`.
pub fn display_name(feature_id: &str) -> String {
    feature_id
        .split('-')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Specify
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecifyOutcome {
    pub feature_id: String,
    pub spec_file: PathBuf,
    pub clarifications_file: PathBuf,
    pub research_file: PathBuf,
    pub tracking_ids: TrackingIds,
    /// True when the spec template was missing and the built-in document
    /// was written instead.
    pub used_fallback: bool,
}

/// Create a feature: its spec, planning and implementation folders, an
/// initial spec.md, clarifications.md and research.md, and a state record.
pub fn specify(
    project: &Project,
    description: &str,
    explicit_id: Option<&str>,
    today: NaiveDate,
) -> Result<SpecifyOutcome> {
    let root = project.root();
    let existing = project.feature_ids()?;

    let feature_id = match explicit_id {
        Some(id) => {
            paths::validate_feature_id(id)?;
            if existing.iter().any(|e| e == id) {
                return Err(SpecmapError::FeatureExists(id.to_string()));
            }
            id.to_string()
        }
        None => next_feature_id(&existing, description),
    };
    let num = paths::feature_num(&feature_id).to_string();
    let date = today.format("%Y-%m-%d").to_string();

    let spec_dir = paths::spec_dir(root, &feature_id);
    io::ensure_dir(&spec_dir)?;
    io::ensure_dir(&paths::plan_dir(root, &feature_id))?;
    io::ensure_dir(&paths::impl_dir(root, &feature_id))?;

    let name = display_name(&feature_id);
    let vars = [
        ("feature name", name.clone()),
        ("###", num.clone()),
        ("feature-name", feature_id.clone()),
        ("date", date.clone()),
    ];
    let (spec, used_fallback) = match templates::render(root, templates::SPEC_TEMPLATE, &vars) {
        Ok(rendered) => (
            rendered.replace(
                CORE_PROBLEM_PLACEHOLDER,
                &format!("**Core Problem**: {description}"),
            ),
            false,
        ),
        Err(SpecmapError::MissingTemplate(t)) => {
            tracing::debug!(template = %t, "spec template missing, using built-in");
            (basic_spec(&feature_id, &name, description, &date), true)
        }
        Err(e) => return Err(e),
    };

    let spec_file = spec_dir.join(paths::SPEC_MD);
    io::atomic_write(&spec_file, spec.as_bytes())?;
    let clarifications_file = spec_dir.join(paths::CLARIFICATIONS_MD);
    io::atomic_write(
        &clarifications_file,
        clarifications_doc(&feature_id, &num, &date).as_bytes(),
    )?;
    let research_file = spec_dir.join(paths::RESEARCH_MD);
    io::atomic_write(&research_file, research_doc(&feature_id, &num, &date).as_bytes())?;

    let tracking_ids = TrackingIds::seed(&num);
    WorkflowState::update(root, |state| {
        state.add_feature(&feature_id, FeatureRecord::new(description, tracking_ids.clone()));
        if state.current_phase == WorkflowPhase::Initialization {
            state.set_phase(WorkflowPhase::Specification);
        }
        Ok(())
    })?;

    tracing::info!(feature = %feature_id, "specification created");

    Ok(SpecifyOutcome {
        feature_id,
        spec_file,
        clarifications_file,
        research_file,
        tracking_ids,
        used_fallback,
    })
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

fn basic_spec(feature_id: &str, name: &str, description: &str, date: &str) -> String {
    let num = paths::feature_num(feature_id);
    let action = description.to_lowercase();
    format!(
        "# Feature Specification: {name}

**Feature ID**: `{feature_id}`
**Created**: {date}
**Status**: Draft
**RULEMAP Score**: Pending

---

## R - ROLE & AUTHORITY

**Specification Owner**: [NEEDS CLARIFICATION: who owns this specification?]

---

## U - UNDERSTANDING & OBJECTIVES

### Problem Statement

**Core Problem**: {description}

### User Story

```
As a [user type],
I want to {action},
So that [value to be clarified]
```

---

## L - LOGIC & STRUCTURE

- **{num}-R-001**: System MUST [NEEDS CLARIFICATION: primary capability]
- **{num}-R-002**: Users MUST be able to [key interaction]

---

## E - ELEMENTS & SPECIFICATIONS

[NEEDS CLARIFICATION: technical constraints]

---

## M - MOOD & EXPERIENCE

## A - AUDIENCE & STAKEHOLDERS

## P - PERFORMANCE & METRICS

[NEEDS CLARIFICATION: success metrics]

---

**Next Phase**: Clarification (run: specmap clarify {feature_id})
"
    )
}

fn clarifications_doc(feature_id: &str, num: &str, date: &str) -> String {
    format!(
        "# Clarifications: {feature_id}

**Feature**: {feature_id}
**Created**: {date}
**Status**: Active

---

## Clarification Sessions

### Session {date}
*Initial specification clarifications*

#### Outstanding Questions
- [ ] **{num}-Q-001**: [Question requiring stakeholder input]
- [ ] **{num}-Q-002**: [Question requiring technical investigation]
- [ ] **{num}-Q-003**: [Question requiring user research]

#### Resolved Questions
*None yet*

---

## Question Categories

### Functional Requirements
### Non-Functional Requirements
### User Experience
### Technical Constraints
### Business Rules

---

**Next Steps**: run `specmap clarify {feature_id}`
"
    )
}

fn research_doc(feature_id: &str, num: &str, date: &str) -> String {
    let areas: [(&str, [&str; 3]); 3] = [
        (
            "User Research",
            [
                "User interviews and feedback",
                "Competitive analysis",
                "User journey mapping",
            ],
        ),
        (
            "Technical Research",
            [
                "Technology stack evaluation",
                "Performance requirements analysis",
                "Security considerations",
            ],
        ),
        (
            "Business Research",
            [
                "Market analysis",
                "Business impact assessment",
                "Cost-benefit analysis",
            ],
        ),
    ];

    let mut out = format!(
        "# Research: {feature_id}\n\n**Feature**: {feature_id}\n**Created**: {date}\n**Status**: Active\n\n---\n\n## Research Areas\n"
    );
    let mut seq = 0;
    for (heading, items) in areas {
        out.push_str(&format!("\n### {heading}\n"));
        for item in items {
            seq += 1;
            out.push_str(&format!("- [ ] **{num}-R-{seq:03}**: {item}\n"));
        }
    }
    out.push_str(
        "\n---\n\n## Research Findings\n\n### Key Insights\n\n### Assumptions Validated\n\n### Assumptions Invalidated\n\n### New Requirements Discovered\n\n---\n\n**Research Status**: In Progress\n",
    );
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
