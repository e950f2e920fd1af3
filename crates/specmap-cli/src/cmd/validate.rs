use crate::cmd::open_project;
use crate::output::{print_json, yes_no};
use anyhow::Context;
use specmap_core::validate::{validate_feature, ValidationKind};
use std::path::Path;

pub fn run(root: &Path, feature: Option<&str>, kind: &str, json: bool) -> anyhow::Result<()> {
    let kind: ValidationKind = kind.parse()?;
    let project = open_project(root)?;
    let feature_id = project.resolve_feature(feature)?;
    let report = validate_feature(&project, &feature_id, kind)
        .with_context(|| format!("failed to validate {feature_id}"))?;

    if json {
        let value = serde_json::json!({
            "feature_id": report.feature_id,
            "validation_type": report.kind,
            "passed": report.passed(),
            "meets_threshold": report.meets_threshold(),
            "rulemap_score": report.rulemap.as_ref().map(|s| s.score),
            "constitution_compliant": report.constitution_compliant,
            "config_warnings": report.config_warnings,
            "issues": report.issues,
            "recommendations": report.recommendations,
        });
        return print_json(&value);
    }

    println!("Validation ({}): {}", report.kind, report.feature_id);
    if let Some(score) = &report.rulemap {
        println!(
            "  RULEMAP score:   {:.1}/10.0 ({}/{} sections, {} marker(s))",
            score.score, score.completed_sections, score.total_sections, score.clarification_markers
        );
    }
    if let Some(ok) = report.constitution_compliant {
        println!("  constitution:    {}", yes_no(ok));
    }

    if !report.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for rec in &report.recommendations {
            println!("  - {rec}");
        }
    }

    println!();
    if report.passed() {
        println!("PASSED");
        Ok(())
    } else {
        anyhow::bail!("validation failed for {} ({} issue(s))", report.feature_id, report.issues.len())
    }
}
