use std::{
    path::Path,
    process::{Command, ExitStatus},
};

use anyhow::{anyhow, Result};
use arithc::{link::Linker, CompilerConfig};
use tempfile::TempDir;

/// Scratch directory plus config for end-to-end builds.
///
/// Returns `None` when no system linker is available so callers can skip.
pub fn setup_environment() -> Option<(TempDir, CompilerConfig)> {
    if Linker::resolve(None).is_err() {
        eprintln!("skipping: no system linker on PATH");
        return None;
    }
    let dir = tempfile::tempdir().ok()?;
    Some((dir, CompilerConfig::default()))
}

/// Compile `source` into `dir/name` and run it.
pub fn build_and_wait(dir: &Path, name: &str, source: &str, config: &CompilerConfig) -> Result<ExitStatus> {
    let artifacts = arithc::compile(source, &dir.join(name), config)?;
    Ok(Command::new(&artifacts.executable).status()?)
}

/// Compile `source` into `dir/name`, run it and return its exit status.
pub fn build_and_run(dir: &Path, name: &str, source: &str, config: &CompilerConfig) -> Result<i32> {
    let status = build_and_wait(dir, name, source, config)?;
    status
        .code()
        .ok_or_else(|| anyhow!("{name} terminated by a signal"))
}

#[allow(dead_code)]
pub fn dir_is_empty(dir: &Path) -> Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}
