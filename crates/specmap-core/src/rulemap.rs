use crate::error::{Result, SpecmapError};
use crate::paths;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fraction of a section's keyword phrases that must be present for the
/// section to count as complete.
pub const SECTION_COMPLETION_RATIO: f64 = 0.8;

/// Points deducted per "needs clarification" occurrence.
pub const MARKER_PENALTY: f64 = 0.1;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

pub struct RulemapSection {
    pub title: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SECTIONS: &[RulemapSection] = &[
    RulemapSection {
        title: "R - ROLE & AUTHORITY",
        keywords: &["specification owner", "technical authority"],
    },
    RulemapSection {
        title: "U - UNDERSTANDING & OBJECTIVES",
        keywords: &["problem statement", "user scenarios", "acceptance scenarios"],
    },
    RulemapSection {
        title: "L - LOGIC & STRUCTURE",
        keywords: &["functional requirements", "implementation sequence"],
    },
    RulemapSection {
        title: "E - ELEMENTS & SPECIFICATIONS",
        keywords: &["technical constraints", "acceptance criteria"],
    },
    RulemapSection {
        title: "M - MOOD & EXPERIENCE",
        keywords: &["user experience goals", "emotional journey"],
    },
    RulemapSection {
        title: "A - AUDIENCE & STAKEHOLDERS",
        keywords: &["primary users", "stakeholder matrix"],
    },
    RulemapSection {
        title: "P - PERFORMANCE & METRICS",
        keywords: &["business kpis", "technical performance"],
    },
];

// ---------------------------------------------------------------------------
// RulemapScore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    /// Fraction of keyword phrases found, 0.0-1.0.
    pub completion: f64,
    pub score: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulemapScore {
    pub score: f64,
    pub completed_sections: usize,
    pub total_sections: usize,
    pub section_scores: BTreeMap<String, SectionScore>,
    pub clarification_markers: usize,
    pub meets_threshold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RulemapScore {
    fn unavailable(error: String) -> Self {
        Self {
            score: 0.0,
            completed_sections: 0,
            total_sections: SECTIONS.len(),
            section_scores: BTreeMap::new(),
            clarification_markers: 0,
            meets_threshold: false,
            error: Some(error),
        }
    }
}

/// Text from the first occurrence of `title` up to the next `## ` heading.
fn section_span<'a>(lower: &'a str, title: &str) -> Option<&'a str> {
    let start = lower.find(title)?;
    let end = lower[start + 1..]
        .find("\n## ")
        .map(|off| start + 1 + off)
        .unwrap_or(lower.len());
    Some(&lower[start..end])
}

/// Score specification markdown against the seven RULEMAP sections.
pub fn score_content(content: &str, threshold: f64) -> RulemapScore {
    let lower = content.to_lowercase();
    let mut section_scores = BTreeMap::new();
    let mut completed = 0;

    for section in SECTIONS {
        let title = section.title.to_lowercase();
        let total = section.keywords.len();
        let found = section_span(&lower, &title)
            .map(|span| section.keywords.iter().filter(|k| span.contains(*k)).count())
            .unwrap_or(0);
        let completion = found as f64 / total as f64;
        if completion >= SECTION_COMPLETION_RATIO {
            completed += 1;
        }
        section_scores.insert(
            section.title.to_string(),
            SectionScore {
                completion,
                score: found,
                total,
            },
        );
    }

    let markers = lower.matches("needs clarification").count();
    let base = completed as f64 / SECTIONS.len() as f64 * 10.0;
    let final_score = (base - markers as f64 * MARKER_PENALTY).max(0.0);

    RulemapScore {
        score: (final_score * 10.0).round() / 10.0,
        completed_sections: completed,
        total_sections: SECTIONS.len(),
        section_scores,
        clarification_markers: markers,
        meets_threshold: final_score >= threshold,
        error: None,
    }
}

/// Score a feature's spec.md, failing with `SpecNotFound` when it is absent.
pub fn try_score_feature(project: &Project, feature_id: &str) -> Result<RulemapScore> {
    let path = paths::spec_file(project.root(), feature_id);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpecmapError::SpecNotFound(feature_id.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(score_content(&content, project.config().threshold()))
}

/// Score a feature's spec.md. A missing or unreadable spec yields a zero
/// score with `error` set instead of failing.
pub fn calculate_rulemap_score(project: &Project, feature_id: &str) -> RulemapScore {
    match try_score_feature(project, feature_id) {
        Ok(score) => score,
        Err(e) => {
            tracing::debug!(feature = feature_id, error = %e, "rulemap score unavailable");
            RulemapScore::unavailable(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DEFAULT_SCORE_THRESHOLD;

    /// A specification that completes every section.
    pub(crate) const FULL_SPEC: &str = "\
# Feature Specification: Add Oauth Login

## R - ROLE & AUTHORITY
**Specification Owner**: Dana
**Technical Authority**: Platform team

## U - UNDERSTANDING & OBJECTIVES
### Problem Statement
Users cannot sign in with their existing accounts.
### User Scenarios
A returning user signs in with a provider.
### Acceptance Scenarios
Sign-in succeeds with a valid provider token.

## L - LOGIC & STRUCTURE
### Functional Requirements
- **FR-001**: Users can sign in with an OAuth provider
- **FR-002**: Sessions persist in the database
### Implementation Sequence
1. Provider registration

## E - ELEMENTS & SPECIFICATIONS
### Technical Constraints
**Platform**: Linux
### Acceptance Criteria
Tokens are validated on every request.

## M - MOOD & EXPERIENCE
User experience goals: effortless. Emotional journey: relief.

## A - AUDIENCE & STAKEHOLDERS
Primary users: customers. Stakeholder matrix: product, security.

## P - PERFORMANCE & METRICS
### Business KPIs
Sign-in conversion up 10%.
### Technical Performance
- Response time: <200ms

## Constitution Compliance
- [x] Test-first
";

    #[test]
    fn full_spec_scores_ten() {
        let s = score_content(FULL_SPEC, DEFAULT_SCORE_THRESHOLD);
        assert_eq!(s.score, 10.0);
        assert_eq!(s.completed_sections, 7);
        assert_eq!(s.clarification_markers, 0);
        assert!(s.meets_threshold);
    }

    #[test]
    fn empty_spec_scores_zero() {
        let s = score_content("# Nothing here\n", DEFAULT_SCORE_THRESHOLD);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.completed_sections, 0);
        assert!(!s.meets_threshold);
        assert_eq!(s.total_sections, 7);
    }

    #[test]
    fn markers_deduct_and_floor_at_zero() {
        let with_marker = format!("{FULL_SPEC}\n[NEEDS CLARIFICATION: token lifetime]\n");
        let s = score_content(&with_marker, DEFAULT_SCORE_THRESHOLD);
        assert_eq!(s.clarification_markers, 1);
        assert_eq!(s.score, 9.9);

        let only_markers = "needs clarification ".repeat(5);
        assert_eq!(score_content(&only_markers, 8.0).score, 0.0);
    }

    #[test]
    fn keywords_outside_section_span_do_not_count() {
        let md = "\
## R - ROLE & AUTHORITY
nothing
## Notes
specification owner, technical authority
";
        let s = score_content(md, 8.0);
        assert_eq!(s.section_scores["R - ROLE & AUTHORITY"].score, 0);
        assert_eq!(s.completed_sections, 0);
    }

    #[test]
    fn partial_section_below_ratio() {
        let md = "## U - UNDERSTANDING & OBJECTIVES\nproblem statement, user scenarios\n";
        let s = score_content(md, 8.0);
        let u = &s.section_scores["U - UNDERSTANDING & OBJECTIVES"];
        assert_eq!(u.score, 2);
        assert_eq!(u.total, 3);
        assert_eq!(s.completed_sections, 0);
    }

    #[test]
    fn scoring_is_idempotent() {
        let a = score_content(FULL_SPEC, 8.0);
        let b = score_content(FULL_SPEC, 8.0);
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_is_configurable() {
        let md = "## R - ROLE & AUTHORITY\nspecification owner technical authority\n";
        // 1/7 * 10 = 1.43
        assert!(score_content(md, 1.0).meets_threshold);
        assert!(!score_content(md, DEFAULT_SCORE_THRESHOLD).meets_threshold);
    }
}
