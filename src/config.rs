use std::{env, fmt};

use inkwell::OptimizationLevel;
use tracing::warn;

const LINKER_ENV: &str = "ARITHC_LINKER";
const OPT_LEVEL_ENV: &str = "ARITHC_OPT_LEVEL";
const KEEP_OBJECT_ENV: &str = "ARITHC_KEEP_OBJECT";
const LOG_FORMAT_ENV: &str = "ARITHC_LOG_FORMAT";

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Env => write!(f, "environment"),
            Source::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    None,
    Less,
    Default,
    Aggressive,
}

impl OptLevel {
    pub fn from_digit(raw: &str) -> Option<Self> {
        match raw.trim() {
            "0" => Some(OptLevel::None),
            "1" => Some(OptLevel::Less),
            "2" => Some(OptLevel::Default),
            "3" => Some(OptLevel::Aggressive),
            _ => None,
        }
    }
}

impl From<OptLevel> for OptimizationLevel {
    fn from(level: OptLevel) -> Self {
        match level {
            OptLevel::None => OptimizationLevel::None,
            OptLevel::Less => OptimizationLevel::Less,
            OptLevel::Default => OptimizationLevel::Default,
            OptLevel::Aggressive => OptimizationLevel::Aggressive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" => Some(LogFormat::Text),
            _ => None,
        }
    }

    /// Read `ARITHC_LOG_FORMAT`. Runs before a subscriber exists, so an
    /// invalid value is handed back for the caller to report.
    pub fn from_env() -> Result<Self, String> {
        match non_empty_var(LOG_FORMAT_ENV) {
            Some(raw) => Self::parse(&raw).ok_or(raw),
            None => Ok(Self::default()),
        }
    }
}

/// Settings for one compilation.
///
/// Resolution order for each field:
///  1. `ARITHC_*` environment variable, if set and valid
///  2. Built-in default (an invalid value logs a warning and falls back here)
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Linker executable; `None` means search `PATH`.
    pub linker: Option<String>,
    pub opt_level: OptLevel,
    /// Keep `<name>.o` next to the executable after a successful link.
    pub keep_object: bool,
    pub opt_level_source: Source,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            linker: None,
            opt_level: OptLevel::None,
            keep_object: true,
            opt_level_source: Source::Default,
        }
    }
}

impl CompilerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.linker = non_empty_var(LINKER_ENV);

        if let Some(raw) = non_empty_var(OPT_LEVEL_ENV) {
            match OptLevel::from_digit(&raw) {
                Some(level) => {
                    config.opt_level = level;
                    config.opt_level_source = Source::Env;
                }
                None => warn!(variable = OPT_LEVEL_ENV, value = %raw, "expected 0-3, using default"),
            }
        }

        if let Some(raw) = non_empty_var(KEEP_OBJECT_ENV) {
            match parse_flag(&raw) {
                Some(keep) => config.keep_object = keep,
                None => warn!(variable = KEEP_OBJECT_ENV, value = %raw, "expected a boolean, using default"),
            }
        }

        config
    }

    pub fn with_linker(mut self, linker: impl Into<String>) -> Self {
        self.linker = Some(linker.into());
        self
    }

    pub fn with_opt_level(mut self, level: OptLevel) -> Self {
        self.opt_level = level;
        self
    }

    pub fn with_keep_object(mut self, keep: bool) -> Self {
        self.keep_object = keep;
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
