use crate::config::Config;
use crate::error::{Result, SpecmapError};
use crate::paths;
use crate::state::WorkflowState;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static NUMBERED_RE: OnceLock<Regex> = OnceLock::new();

fn numbered_re() -> &'static Regex {
    NUMBERED_RE.get_or_init(|| Regex::new(r"^(\d{3})-").unwrap())
}

/// An opened specmap project: its root and loaded configuration. Every
/// pipeline operation takes one of these.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Open the project at `root`. Fails with `NotAProject` when there is
    /// no `.specmap` directory.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> Result<WorkflowState> {
        WorkflowState::load(&self.root)
    }

    /// Feature folders under `01-specifications/features`, sorted.
    pub fn feature_ids(&self) -> Result<Vec<String>> {
        numbered_dirs(&paths::spec_features_dir(&self.root))
    }

    /// Ensure `id` is well formed and its feature folder exists, listing
    /// known ids otherwise.
    pub fn require_feature(&self, id: &str) -> Result<()> {
        paths::validate_feature_id(id)?;
        if paths::spec_dir(&self.root, id).is_dir() {
            return Ok(());
        }
        Err(SpecmapError::FeatureNotFound {
            id: id.to_string(),
            known: self.feature_ids()?,
        })
    }

    /// The given feature id, or the only feature when none is given.
    pub fn resolve_feature(&self, id: Option<&str>) -> Result<String> {
        if let Some(id) = id {
            self.require_feature(id)?;
            return Ok(id.to_string());
        }
        let mut known = self.feature_ids()?;
        if known.len() == 1 {
            return Ok(known.remove(0));
        }
        Err(SpecmapError::FeatureRequired(known))
    }
}

/// Names of `NNN-…` directories in `dir`, sorted. A missing directory has
/// no entries.
pub fn numbered_dirs(dir: &Path) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if numbered_re().is_match(&name) {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

/// Highest three-digit prefix among `names`, or 0.
pub fn max_sequence(names: &[String]) -> u32 {
    names
        .iter()
        .filter_map(|n| numbered_re().captures(n))
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
