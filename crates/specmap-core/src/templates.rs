use crate::error::{Result, SpecmapError};
use crate::paths;
use std::path::Path;

// ---------------------------------------------------------------------------
// Template names
// ---------------------------------------------------------------------------

pub const SPEC_TEMPLATE: &str = "spec-template";
pub const PLAN_TEMPLATE: &str = "plan-template";
pub const TASKS_TEMPLATE: &str = "tasks-template";

/// Load `.specmap/templates/<name>.md` and substitute `[KEY]` placeholders.
///
/// Keys are upper-cased before lookup, so `("feature-name", id)` replaces
/// `[FEATURE-NAME]`. Returns `MissingTemplate` when the file is absent;
/// callers fall back to their built-in document.
pub fn render(root: &Path, name: &str, vars: &[(&str, String)]) -> Result<String> {
    let path = paths::template_path(root, name);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpecmapError::MissingTemplate(name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(substitute(&content, vars))
}

pub fn substitute(content: &str, vars: &[(&str, String)]) -> String {
    let mut out = content.to_string();
    for (key, value) in vars {
        let placeholder = format!("[{}]", key.to_uppercase());
        out = out.replace(&placeholder, value);
    }
    out
}

/// Templates written by `init`. Each pairs with a built-in fallback in the
/// module that renders it.
pub fn defaults() -> [(&'static str, &'static str); 3] {
    [
        (SPEC_TEMPLATE, SPEC_TEMPLATE_BODY),
        (PLAN_TEMPLATE, PLAN_TEMPLATE_BODY),
        (TASKS_TEMPLATE, TASKS_TEMPLATE_BODY),
    ]
}

// ---------------------------------------------------------------------------
// Template bodies
// ---------------------------------------------------------------------------

const SPEC_TEMPLATE_BODY: &str = r#"# Feature Specification: [FEATURE NAME]

**Feature ID**: [FEATURE-NAME]
**Created**: [DATE]
**Status**: Draft
**RULEMAP Score**: Pending

---

## R - ROLE & AUTHORITY

**Specification Owner**: [NEEDS CLARIFICATION: who owns this specification?]
**Decision Makers**: [Who approves scope changes]

---

## U - UNDERSTANDING & OBJECTIVES

### Problem Statement

**Core Problem**: [What needs solving]
**Business Impact**: [NEEDS CLARIFICATION: what measurable impact is expected?]

### User Scenarios

[Describe the primary user journeys]

### Acceptance Scenarios

```yaml
ACCEPTANCE_TEST_1:
  scenario: "[Scenario name]"
  given: "[Initial context]"
  when: "[Action taken]"
  then: "[Expected outcome]"
```

---

## L - LOGIC & STRUCTURE

### Functional Requirements

- **FR-001**: [NEEDS CLARIFICATION: primary capability the feature must provide]
- **[###]-R-001**: [Requirement to be refined during clarification]

### Implementation Sequence

1. [First deliverable]
2. [Second deliverable]

---

## E - ELEMENTS & SPECIFICATIONS

### Constraints

**Platform**: [Target platform]
**Performance**: [NEEDS CLARIFICATION: latency and throughput targets]

---

## M - MOOD & EXPERIENCE

[NEEDS CLARIFICATION: how should users feel when using this feature?]

---

## A - AUDIENCE & STAKEHOLDERS

**Users**: [Who uses this feature]

---

## P - PERFORMANCE & METRICS

**Success Metrics**: [NEEDS CLARIFICATION: how will success be measured?]

---

## Constitution Compliance

- [ ] Library-first: the feature is usable as a standalone library
- [ ] Test-first: tests are written and failing before implementation
- [ ] Simplicity: no speculative abstractions

---

**Next Step**: run `specmap clarify [FEATURE-NAME]`
"#;

const PLAN_TEMPLATE_BODY: &str = r#"# Implementation Plan: [FEATURE NAME]

**Feature ID**: [FEATURE-NAME]
**Plan ID**: [###]-P
**Date**: [DATE]
**RULEMAP Score**: [SPEC SCORE]/10.0
**Status**: Draft

---

## Planning Overview

[PLANNING OVERVIEW]

---

## Technology Stack

[TECHNOLOGY STACK]

---

## Technical Decisions

[TECHNICAL DECISIONS]

---

## Implementation Phases

[MILESTONES]

---

## Requirements Mapping

[REQUIREMENTS MAPPING]

---

## Quality Gates

- [ ] All technical decisions approved
- [ ] Data models designed and reviewed
- [ ] Contracts defined
- [ ] All tests written (TDD Red phase)
- [ ] Implementation complete (TDD Green phase)
- [ ] RULEMAP score maintained at or above threshold
- [ ] Stakeholder approval obtained

---

**Next Phase**: Task Generation (run: specmap tasks [FEATURE-NAME])
"#;

const TASKS_TEMPLATE_BODY: &str = r#"# Tasks: [FEATURE NAME]

**Feature ID**: [FEATURE-NAME]
**Generated**: [DATE]
**Total Tasks**: [TOTAL TASKS]
**Estimated Duration**: [DURATION] days

---

## Task Breakdown by Phase

[TASK BREAKDOWN]

---

## Parallel Execution

[PARALLEL GROUPS]

---

**Status**: Ready for implementation
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_template_is_typed_error() {
        let dir = TempDir::new().unwrap();
        let err = render(dir.path(), SPEC_TEMPLATE, &[]).unwrap_err();
        assert!(matches!(err, SpecmapError::MissingTemplate(ref n) if n == "spec-template"));
    }

    #[test]
    fn render_substitutes_uppercased_keys() {
        let dir = TempDir::new().unwrap();
        let path = paths::template_path(dir.path(), "t");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "# [FEATURE NAME] ([FEATURE-NAME]) [###]-R-001").unwrap();

        let out = render(
            dir.path(),
            "t",
            &[
                ("feature name", "User Auth".to_string()),
                ("feature-name", "001-user-auth".to_string()),
                ("###", "001".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(out, "# User Auth (001-user-auth) 001-R-001");
    }

    #[test]
    fn default_spec_template_has_all_sections() {
        for heading in [
            "## R - ROLE & AUTHORITY",
            "## U - UNDERSTANDING & OBJECTIVES",
            "## L - LOGIC & STRUCTURE",
            "## E - ELEMENTS & SPECIFICATIONS",
            "## M - MOOD & EXPERIENCE",
            "## A - AUDIENCE & STAKEHOLDERS",
            "## P - PERFORMANCE & METRICS",
            "## Constitution Compliance",
        ] {
            assert!(SPEC_TEMPLATE_BODY.contains(heading), "missing {heading}");
        }
    }
}
