//! Lowers a verified module to a relocatable object file for the host.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use inkwell::{
    module::Module,
    targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple},
};
use tracing::{debug, warn};

use crate::{
    config::OptLevel,
    error::{CompileError, CompileResult},
};

#[cfg(windows)]
const OBJECT_EXTENSION: &str = "obj";
#[cfg(not(windows))]
const OBJECT_EXTENSION: &str = "o";

/// `<output>.o` (`.obj` on Windows). The extension is appended, never swapped,
/// so `out.v1` becomes `out.v1.o`.
pub fn object_path(output: &Path) -> PathBuf {
    let mut raw = OsString::from(output.as_os_str());
    raw.push(".");
    raw.push(OBJECT_EXTENSION);
    PathBuf::from(raw)
}

/// Create a target machine for `triple` using the native backend only.
pub fn host_target_machine(triple: &TargetTriple, opt: OptLevel) -> CompileResult<TargetMachine> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(CompileError::UnsupportedTarget)?;
    let target = Target::from_triple(triple).map_err(|e| CompileError::UnsupportedTarget(e.to_string()))?;
    target
        .create_target_machine(
            triple,
            "generic",
            "",
            opt.into(),
            // position independent so default PIE linkers accept the object
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| {
            CompileError::UnsupportedTarget(format!(
                "could not create a target machine for {}",
                triple.as_str().to_string_lossy()
            ))
        })
}

/// Write `module` as an object file at `out_obj`.
///
/// A partially written file is removed before the error is returned.
pub fn write_object(module: &Module<'_>, machine: &TargetMachine, out_obj: &Path) -> CompileResult<()> {
    if let Err(e) = machine.write_to_file(module, FileType::Object, out_obj) {
        remove_if_present(out_obj);
        return Err(CompileError::ObjectWrite {
            path: out_obj.to_path_buf(),
            message: e.to_string(),
        });
    }
    debug!(path = %out_obj.display(), "wrote object file");
    Ok(())
}

/// Best-effort cleanup; a missing file is not an error.
pub(crate) fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed incomplete output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove incomplete output"),
    }
}
