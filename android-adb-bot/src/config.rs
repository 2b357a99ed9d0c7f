//! Process configuration: environment first, command line flags on top.
//! Built once at startup and never changed afterwards.
//!
//! Variables may also come from a `.env` file in the working directory or
//! one of its parents; variables set in the process environment win.

use crate::adb::BackendKind;
use crate::args::Args;
use crate::game_automation::{AutomationError, AutomationResult, PlaybookKind, Timings};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const DEFAULT_RES_DIR: &str = "actions";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Android package of the app being driven
    pub package: Option<String>,
    /// Device serials or `host:port` addresses; empty means every attached
    /// device
    pub devices: Vec<String>,
    pub playbook: PlaybookKind,
    pub backend: BackendKind,
    pub res_dir: PathBuf,
    pub max_iterations: Option<u64>,
    pub timings: Timings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            package: None,
            devices: Vec::new(),
            playbook: PlaybookKind::BasicPlay,
            backend: BackendKind::Rust,
            res_dir: PathBuf::from(DEFAULT_RES_DIR),
            max_iterations: None,
            timings: Timings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AutomationResult<Self> {
        let file = match dotenvy::dotenv_iter() {
            Ok(iter) => collect_env_file(iter),
            Err(_) => HashMap::new(),
        };
        if !file.is_empty() {
            log::debug!("📄 Read {} variables from .env", file.len());
        }
        Self::from_lookup(layered(|key| std::env::var(key).ok(), file))
    }

    /// Build from a variable lookup. Recognised variables: `APP_PACKAGE`,
    /// `IP_LIST` (comma separated), `TOOL_TYPE` (playbook), `ADB_IMPL`,
    /// `RES_DIR` and `MAX_ITERATIONS`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AutomationResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = AppConfig::default();

        if let Some(package) = var("APP_PACKAGE") {
            config.package = Some(package.trim().to_string());
        }
        if let Some(list) = var("IP_LIST") {
            config.devices = split_list(&list);
        }
        if let Some(tool) = var("TOOL_TYPE") {
            config.playbook = tool.parse()?;
        }
        if let Some(backend) = var("ADB_IMPL") {
            config.backend = backend.parse().map_err(AutomationError::Config)?;
        }
        if let Some(dir) = var("RES_DIR") {
            config.res_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = var("MAX_ITERATIONS") {
            config.max_iterations = Some(parse_count("MAX_ITERATIONS", &raw)?);
        }
        Ok(config)
    }

    /// Command line flags win over the environment.
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(package) = &args.package {
            self.package = Some(package.clone());
        }
        if let Some(devices) = &args.devices {
            self.devices = devices.clone();
        }
        if let Some(playbook) = args.playbook {
            self.playbook = playbook;
        }
        if let Some(backend) = args.backend {
            self.backend = backend;
        }
        if let Some(dir) = &args.res_dir {
            self.res_dir = dir.clone();
        }
        if let Some(iterations) = args.iterations {
            self.max_iterations = Some(iterations);
        }
        self
    }

    pub fn validate(&self) -> AutomationResult<()> {
        if self.playbook.needs_package() && self.package.is_none() {
            return Err(AutomationError::Config(format!(
                "playbook {} needs APP_PACKAGE or --package",
                self.playbook
            )));
        }
        Ok(())
    }

    pub fn package_or_empty(&self) -> &str {
        self.package.as_deref().unwrap_or_default()
    }
}

/// Variables of a dotenv file. A missing file gives none; malformed lines
/// are skipped with a warning.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => collect_env_file(iter),
        Err(_) => HashMap::new(),
    }
}

fn collect_env_file<R: Read>(iter: dotenvy::Iter<R>) -> HashMap<String, String> {
    iter.filter_map(|item| match item {
        Ok(pair) => Some(pair),
        Err(e) => {
            log::warn!("⚠️ Skipping .env line: {e}");
            None
        }
    })
    .collect()
}

/// Lookup that tries `primary` first and falls back to `file`.
pub fn layered(
    primary: impl Fn(&str) -> Option<String>,
    file: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> {
    move |key: &str| primary(key).or_else(|| file.get(key).cloned())
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_count(name: &str, raw: &str) -> AutomationResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| AutomationError::Config(format!("{name} must be a number, got '{raw}'")))
}
