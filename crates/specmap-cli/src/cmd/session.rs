use crate::cmd::open_project;
use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use specmap_core::session::{self, ArtifactAction, SessionStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Start a new working session
    Start {
        /// What the session is about; becomes part of the session id
        focus: Option<String>,
    },
    /// Snapshot every feature's spec and plan into the session
    Checkpoint {
        description: String,
        /// Session id (default: the latest active session)
        #[arg(long)]
        session: Option<String>,
    },
    /// Record a file created or modified during the session
    Track {
        path: String,
        /// created or modified
        #[arg(long, default_value = "created")]
        action: String,
        #[arg(long)]
        session: Option<String>,
    },
    /// Close a session and move it to the archive
    End {
        /// Closing summary appended to the session notes
        summary: Option<String>,
        #[arg(long)]
        session: Option<String>,
    },
    /// List active sessions
    List,
}

pub fn run(root: &Path, subcmd: SessionSubcommand, json: bool) -> anyhow::Result<()> {
    let project = open_project(root)?;
    match subcmd {
        SessionSubcommand::Start { focus } => {
            let out = session::start_session(&project, focus.as_deref(), Utc::now())
                .context("failed to start session")?;
            if json {
                return print_json(&out);
            }
            println!("Started session: {}", out.id);
            println!("  path:  {}", out.path.display());
            println!("  agent: {}", out.record.session.agent);
        }
        SessionSubcommand::Checkpoint {
            description,
            session: sid,
        } => {
            let out = session::checkpoint(&project, sid.as_deref(), &description, Utc::now())
                .context("failed to record checkpoint")?;
            if json {
                return print_json(&out);
            }
            println!("Checkpoint {} in {}", out.checkpoint.id, out.session_id);
            println!("  {} file(s) snapshotted to {}", out.checkpoint.files.len(), out.path.display());
        }
        SessionSubcommand::Track {
            path,
            action,
            session: sid,
        } => {
            let action: ArtifactAction = action.parse().map_err(anyhow::Error::msg)?;
            let added = session::track_artifact(&project, sid.as_deref(), &path, action)
                .context("failed to track artifact")?;
            if json {
                return print_json(&serde_json::json!({
                    "path": path,
                    "action": action,
                    "added": added,
                }));
            }
            if added {
                println!("Tracked {path} ({action})");
            } else {
                println!("{path} is already tracked as {action}");
            }
        }
        SessionSubcommand::End { summary, session: sid } => {
            let out = session::end_session(&project, sid.as_deref(), summary.as_deref(), Utc::now())
                .context("failed to end session")?;
            if json {
                return print_json(&out);
            }
            println!("Ended session: {}", out.session_id);
            println!("  duration:    {} min", out.metrics.duration_minutes);
            println!(
                "  files:       {} created, {} modified",
                out.metrics.files_created, out.metrics.files_modified
            );
            println!("  checkpoints: {}", out.metrics.checkpoints);
            println!("  archived to: {}", out.archive_path.display());
        }
        SessionSubcommand::List => {
            let records = session::list_sessions(&project).context("failed to list sessions")?;
            if json {
                return print_json(&records);
            }
            if records.is_empty() {
                println!("No sessions.");
                return Ok(());
            }
            let rows = records
                .iter()
                .map(|r| {
                    vec![
                        r.session.id.clone(),
                        match r.session.status {
                            SessionStatus::Active => "active",
                            SessionStatus::Completed => "completed",
                        }
                        .to_string(),
                        r.session.focus.clone().unwrap_or_default(),
                        r.checkpoints.len().to_string(),
                    ]
                })
                .collect();
            print_table(&["SESSION", "STATUS", "FOCUS", "CHECKPOINTS"], rows);
        }
    }
    Ok(())
}
