mod cmd;
mod output;
mod root;
mod tools;

use clap::{Parser, Subcommand};
use cmd::{agent::AgentSubcommand, session::SessionSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specmap",
    about = "Specification-driven project scaffolding: specify, clarify, plan and break down features behind a RULEMAP quality gate",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .specmap/)
    #[arg(long, global = true, env = "SPECMAP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project with the full folder structure
    Init {
        /// Project name; the project is created in ./<name> unless --here is set
        name: Option<String>,

        /// Project type (web-app, mobile-app, api, desktop-app, data-pipeline, ml-model, library)
        #[arg(long = "type", default_value = "web-app")]
        project_type: String,

        /// Base AI agent
        #[arg(long, default_value = "claude")]
        agent: String,

        /// Initialize in the current directory
        #[arg(long)]
        here: bool,
    },

    /// Create a feature specification from a description
    Specify {
        /// What the feature should do
        description: String,

        /// Use this feature id instead of the next free one (NNN-slug)
        #[arg(long)]
        id: Option<String>,
    },

    /// List open questions for a feature, or record answers to them
    Clarify {
        /// Feature id (default: the only feature)
        feature: Option<String>,

        /// Answer a question: ID=TEXT, where ID may be FILE#ID (repeatable)
        #[arg(long = "answer", short = 'a', value_name = "ID=TEXT")]
        answers: Vec<String>,

        /// Prompt for an answer to each open question
        #[arg(long, short = 'i')]
        interactive: bool,
    },

    /// Generate the implementation plan (requires a passing RULEMAP score)
    Plan {
        /// Feature id (default: the only feature)
        feature: Option<String>,

        /// Regenerate an existing plan
        #[arg(long)]
        force: bool,
    },

    /// Generate the task breakdown from the plan
    Tasks {
        /// Feature id (default: the only feature)
        feature: Option<String>,
    },

    /// Show project and feature progress
    Status {
        /// Include per-feature detail
        #[arg(long, short = 'd')]
        detailed: bool,
    },

    /// Validate a feature against RULEMAP scoring and the constitution
    Validate {
        /// Feature id (default: the only feature)
        feature: Option<String>,

        /// rulemap, constitution or both
        #[arg(long = "type", default_value = "both")]
        kind: String,
    },

    /// Show the RULEMAP score of one or all features
    Score {
        /// Feature id (default: every feature)
        feature: Option<String>,
    },

    /// Activate workflow agents and show their status
    Agent {
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },

    /// Track working sessions
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Run as an MCP stdio server
    Mcp,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Mcp => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root_path = cli.root.as_deref();
    let root = root::resolve_root(root_path);

    let result = match cli.command {
        Commands::Init {
            name,
            project_type,
            agent,
            here,
        } => cmd::init::run(
            &root::resolve_base(root_path),
            name.as_deref(),
            &project_type,
            &agent,
            here,
            cli.json,
        ),
        Commands::Specify { description, id } => {
            cmd::specify::run(&root, &description, id.as_deref(), cli.json)
        }
        Commands::Clarify {
            feature,
            answers,
            interactive,
        } => cmd::clarify::run(&root, feature.as_deref(), &answers, interactive, cli.json),
        Commands::Plan { feature, force } => cmd::plan::run(&root, feature.as_deref(), force, cli.json),
        Commands::Tasks { feature } => cmd::tasks::run(&root, feature.as_deref(), cli.json),
        Commands::Status { detailed } => cmd::status::run(&root, detailed, cli.json),
        Commands::Validate { feature, kind } => {
            cmd::validate::run(&root, feature.as_deref(), &kind, cli.json)
        }
        Commands::Score { feature } => cmd::score::run(&root, feature.as_deref(), cli.json),
        Commands::Agent { subcommand } => cmd::agent::run(&root, subcommand, cli.json),
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand, cli.json),
        Commands::Mcp => cmd::mcp::run(&root),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
