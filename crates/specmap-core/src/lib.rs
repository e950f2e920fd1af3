pub mod agent;
pub mod clarify;
pub mod config;
pub mod error;
pub mod extract;
pub mod feature;
pub mod gate;
pub mod init;
pub mod io;
pub mod paths;
pub mod plan;
pub mod project;
pub mod rulemap;
pub mod session;
pub mod state;
pub mod status;
pub mod tasks;
pub mod templates;
pub mod timestamp;
pub mod types;
pub mod validate;

pub use error::{Result, SpecmapError};
pub use project::Project;
