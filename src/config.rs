use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use crate::{compiler::ParenPolicy, Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcConfig {
    /// Ticks a session may run before it is reported as timed out.
    #[serde(default = "default_tick_budget")]
    pub tick_budget: u64,

    #[serde(default)]
    pub parentheses: ParenPolicy,

    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Mirror every trace record into the log at debug level.
    #[serde(default = "default_true")]
    pub log_events: bool,

    /// Append trace records as JSON lines to this file.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            log_events: default_true(),
            file: None,
        }
    }
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            tick_budget: default_tick_budget(),
            parentheses: ParenPolicy::default(),
            trace: TraceConfig::default(),
        }
    }
}

impl CalcConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        from_str(s)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("failed to open {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    serde_json::from_str(s).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
}

fn default_tick_budget() -> u64 {
    200
}

fn default_true() -> bool {
    true
}
