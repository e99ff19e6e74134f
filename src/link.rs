use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Command,
};

use tracing::{debug, info};

use crate::{
    emit::remove_if_present,
    error::{CompileError, CompileResult},
};

/// Command-line conventions of a linker driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// `cc`, `gcc`, `clang`: `<obj> -o <exe>`
    Cc,
    /// MSVC `link.exe`: `<obj> /OUT:<exe>`
    Msvc,
}

#[derive(Debug, Clone)]
pub struct Linker {
    pub program: PathBuf,
    pub flavor: Flavor,
}

impl Linker {
    /// Use `configured` when given, otherwise the first driver found on `PATH`.
    pub fn resolve(configured: Option<&str>) -> CompileResult<Self> {
        if let Some(program) = configured {
            let program = PathBuf::from(program);
            let flavor = flavor_of(&program);
            return Ok(Self { program, flavor });
        }

        let candidates: &[&str] = if cfg!(windows) {
            &["link.exe", "clang", "gcc"]
        } else {
            &["cc", "gcc", "clang"]
        };
        for name in candidates {
            if let Ok(program) = which::which(name) {
                let flavor = flavor_of(&program);
                debug!(linker = %program.display(), "found linker on PATH");
                return Ok(Self { program, flavor });
            }
        }
        Err(CompileError::LinkerNotFound)
    }

    fn args(&self, obj: &Path, out_exe: &Path) -> Vec<OsString> {
        match self.flavor {
            Flavor::Cc => vec![obj.into(), "-o".into(), out_exe.into()],
            Flavor::Msvc => {
                let mut out = OsString::from("/OUT:");
                out.push(out_exe);
                vec![obj.into(), out, "/SUBSYSTEM:CONSOLE".into(), "msvcrt.lib".into()]
            }
        }
    }

    /// Link `obj` into `out_exe`. A partial executable is removed on failure.
    pub fn link(&self, obj: &Path, out_exe: &Path) -> CompileResult<()> {
        let linker = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(self.args(obj, out_exe))
            .output()
            .map_err(|source| CompileError::Io { path: self.program.clone(), source })?;

        if !output.status.success() {
            remove_if_present(out_exe);
            return Err(CompileError::LinkError {
                linker,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        info!(%linker, executable = %out_exe.display(), "linked executable");
        Ok(())
    }
}

fn flavor_of(program: &Path) -> Flavor {
    let stem = program
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if stem == "link" || stem == "lld-link" {
        Flavor::Msvc
    } else {
        Flavor::Cc
    }
}

/// `<output>` plus the platform executable extension, if it has one.
pub fn executable_path(output: &Path) -> PathBuf {
    let ext = std::env::consts::EXE_EXTENSION;
    if ext.is_empty() {
        return output.to_path_buf();
    }
    let mut raw = OsString::from(output.as_os_str());
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Exit status observed when the produced program returns `value`.
///
/// Unix keeps only the low 8 bits of the status passed to `exit`, so the
/// value is reduced modulo 256: `-1` shows up as 255 and `256` as 0.
pub fn exit_code_for(value: i32) -> u8 {
    value as u8
}
