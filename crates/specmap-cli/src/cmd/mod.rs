use anyhow::Context;
use specmap_core::Project;
use std::path::Path;

pub mod agent;
pub mod clarify;
pub mod init;
pub mod mcp;
pub mod plan;
pub mod score;
pub mod session;
pub mod specify;
pub mod status;
pub mod tasks;
pub mod validate;

pub(crate) fn open_project(root: &Path) -> anyhow::Result<Project> {
    Project::open(root).with_context(|| format!("failed to open project at {}", root.display()))
}

pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
