//! Locating the documents the design tool exported.
//!
//! Each format is checked on its own, so a single missing export does not
//! hide the others.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use kitforge_core::production::ExportFormat;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("{0} export was not produced")]
    Missing(ExportFormat),

    #[error("{0} export is empty")]
    Empty(ExportFormat),
}

/// `<output_base>.<ext>` for `format`.
pub fn export_path(output_base: &Path, format: ExportFormat) -> PathBuf {
    let mut name = OsString::from(output_base.as_os_str());
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Check every format, in format order.
pub async fn collect_exports(
    output_base: &Path,
) -> Vec<(ExportFormat, Result<PathBuf, ExportError>)> {
    let mut exports = Vec::with_capacity(ExportFormat::ALL.len());
    for format in ExportFormat::ALL {
        let path = export_path(output_base, format);
        let result = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(path),
            Ok(meta) if meta.is_file() => Err(ExportError::Empty(format)),
            _ => Err(ExportError::Missing(format)),
        };
        exports.push((format, result));
    }
    exports
}

/// Delete whatever exports exist for `output_base`.
pub async fn remove_exports(output_base: &Path) {
    for format in ExportFormat::ALL {
        let path = export_path(output_base, format);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove export");
            }
        }
    }
}
