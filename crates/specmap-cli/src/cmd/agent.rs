use crate::cmd::open_project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use specmap_core::agent;
use specmap_core::types::AgentRole;
use std::path::Path;

#[derive(Subcommand)]
pub enum AgentSubcommand {
    /// Activate a workflow agent (prd-generator, task-planner, dev-guide, qa-monitor)
    Activate { role: String },
    /// Clear the active agent
    Deactivate,
    /// Show every agent and which one is active
    Status,
}

pub fn run(root: &Path, subcmd: AgentSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AgentSubcommand::Activate { role } => activate(root, &role, json),
        AgentSubcommand::Deactivate => deactivate(root, json),
        AgentSubcommand::Status => status(root, json),
    }
}

fn activate(root: &Path, role: &str, json: bool) -> anyhow::Result<()> {
    let role: AgentRole = role.parse()?;
    let project = open_project(root)?;
    let act = agent::activate(&project, role).with_context(|| format!("failed to activate {role}"))?;

    if json {
        return print_json(&act);
    }

    println!("Activated agent: {}", act.role);
    println!("  {}", act.role.description());
    if let Some(prev) = &act.previous {
        println!("  replaced:  {prev}");
    }
    println!("  profile:   {}", act.profile_path.display());
    println!("  output:    {}", agent::output_location(act.role));
    Ok(())
}

fn deactivate(root: &Path, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let previous = agent::deactivate(&project).context("failed to deactivate agent")?;

    if json {
        return print_json(&serde_json::json!({ "deactivated": previous }));
    }

    match previous {
        Some(role) => println!("Deactivated agent: {role}"),
        None => println!("No agent was active."),
    }
    Ok(())
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    let overview = agent::agent_status(&project).context("failed to read agent status")?;

    if json {
        return print_json(&overview);
    }

    println!("Base agent:   {}", overview.base_agent);
    println!("Active agent: {}", overview.active_agent.as_deref().unwrap_or("none"));
    println!();
    let rows = overview
        .agents
        .iter()
        .map(|a| {
            vec![
                a.role.to_string(),
                if a.active { "*".to_string() } else { String::new() },
                a.focus.map(|p| p.to_string()).unwrap_or_default(),
                a.description.clone(),
            ]
        })
        .collect();
    print_table(&["ROLE", "ACTIVE", "PHASE", "DESCRIPTION"], rows);
    Ok(())
}
