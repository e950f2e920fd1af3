use crate::cmd::open_project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use specmap_core::clarify::{self, Answer, ClarifyReport, NextPhase};
use specmap_core::extract::OpenQuestion;
use specmap_core::Project;
use std::io::{BufRead, Write};
use std::path::Path;

pub fn run(
    root: &Path,
    feature: Option<&str>,
    answers: &[String],
    interactive: bool,
    json: bool,
) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let feature_id = project.resolve_feature(feature)?;

    let mut parsed = answers
        .iter()
        .map(|a| parse_answer(a))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if interactive {
        let report = clarify::run_clarification(&project, &feature_id)?;
        parsed.extend(prompt_answers(&report)?);
    }

    if parsed.is_empty() {
        let report = clarify::run_clarification(&project, &feature_id)
            .context("failed to run clarification")?;
        return show_report(&report, json);
    }

    apply(&project, &feature_id, &parsed, json)
}

/// `ID=TEXT`, split at the first `=`.
fn parse_answer(raw: &str) -> anyhow::Result<Answer> {
    let (id, text) = raw
        .split_once('=')
        .with_context(|| format!("invalid answer '{raw}': expected ID=TEXT"))?;
    let (id, text) = (id.trim(), text.trim());
    if id.is_empty() || text.is_empty() {
        anyhow::bail!("invalid answer '{raw}': expected ID=TEXT");
    }
    Ok(Answer::new(id, text))
}

fn prompt_answers(report: &ClarifyReport) -> anyhow::Result<Vec<Answer>> {
    if report.questions.is_empty() {
        eprintln!("No open questions for {}.", report.feature_id);
        return Ok(Vec::new());
    }
    eprintln!("Answer each question; leave blank to skip.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut out = Vec::new();
    for q in &report.questions {
        eprint!("\n[{}] {}\n> ", q.id, q.question);
        std::io::stderr().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let text = line.trim();
        if !text.is_empty() {
            out.push(Answer::new(q.qualified_id(), text));
        }
    }
    Ok(out)
}

fn show_report(report: &ClarifyReport, json: bool) -> anyhow::Result<()> {
    if json {
        let value = serde_json::json!({
            "feature_id": report.feature_id,
            "questions_found": report.questions.len(),
            "questions": report.questions,
            "rulemap_score": report.score.score,
            "meets_threshold": report.score.meets_threshold,
            "section_scores": report.score.section_scores,
            "next_phase": report.next_phase.as_str(),
        });
        return print_json(&value);
    }

    println!("Clarification: {}", report.feature_id);
    println!(
        "RULEMAP score: {:.1}/10.0 ({}/{} sections complete)",
        report.score.score, report.score.completed_sections, report.score.total_sections
    );
    println!();

    if report.questions.is_empty() {
        println!("No open questions.");
    } else {
        let rows = report
            .questions
            .iter()
            .map(|q| {
                vec![
                    display_id(q, &report.questions),
                    format!("{}:{}", q.source, q.line),
                    truncate(&q.question, 70),
                ]
            })
            .collect();
        print_table(&["ID", "SOURCE", "QUESTION"], rows);
    }

    println!();
    match report.next_phase {
        NextPhase::Planning => println!("Next: specmap plan {}", report.feature_id),
        NextPhase::SpecificationImprovement => println!(
            "Next: resolve the questions above, e.g. specmap clarify {} --answer ID=TEXT",
            report.feature_id
        ),
    }
    Ok(())
}

fn apply(project: &Project, feature_id: &str, answers: &[Answer], json: bool) -> anyhow::Result<()> {
    let out = clarify::apply_answers(project, feature_id, answers, chrono::Utc::now())
        .context("failed to record answers")?;
    let score = specmap_core::rulemap::calculate_rulemap_score(project, feature_id);

    if json {
        let value = serde_json::json!({
            "feature_id": out.feature_id,
            "session": out.session_date,
            "resolved": out.resolved,
            "unmatched": out.unmatched,
            "spec_updates": out.spec_updates,
            "clarifications_count": out.clarifications_count,
            "rulemap_score": score.score,
            "meets_threshold": score.meets_threshold,
        });
        return print_json(&value);
    }

    println!("Recorded {} answer(s) for {} (session {})", answers.len(), out.feature_id, out.session_date);
    println!("  resolved:      {}", out.resolved);
    for id in &out.unmatched {
        println!("  no open question with id {id} (logged in the session anyway)");
    }
    for u in &out.spec_updates {
        println!("  spec.md:       {u}");
    }
    println!("RULEMAP score: {:.1}/10.0", score.score);
    Ok(())
}

/// The bare id, or `<source>#<id>` when another file reuses it.
fn display_id(q: &OpenQuestion, all: &[OpenQuestion]) -> String {
    if all.iter().any(|o| o.id == q.id && o.source != q.source) {
        q.qualified_id()
    } else {
        q.id.clone()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_splits_at_first_equals() {
        let a = parse_answer("001-Q-001=Owner is Dana = PM").unwrap();
        assert_eq!(a.id, "001-Q-001");
        assert_eq!(a.answer, "Owner is Dana = PM");
    }

    #[test]
    fn answer_requires_both_parts() {
        assert!(parse_answer("no-equals").is_err());
        assert!(parse_answer("=text").is_err());
        assert!(parse_answer("id=  ").is_err());
    }

    #[test]
    fn ids_reused_across_files_are_qualified() {
        let qs: Vec<OpenQuestion> = [
            ("spec.md", "auto-001"),
            ("clarifications.md", "auto-001"),
            ("spec.md", "001-Q-001"),
        ]
        .into_iter()
        .map(|(source, id)| OpenQuestion {
            id: id.to_string(),
            question: "Who?".into(),
            source: source.to_string(),
            line: 1,
            context: String::new(),
            kind: specmap_core::extract::QuestionKind::QuestionLine,
        })
        .collect();
        assert_eq!(display_id(&qs[0], &qs), "spec.md#auto-001");
        assert_eq!(display_id(&qs[1], &qs), "clarifications.md#auto-001");
        assert_eq!(display_id(&qs[2], &qs), "001-Q-001");
    }

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
