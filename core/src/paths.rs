//! Pre-flight filesystem checks shared by every backend.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ConvertError;
use crate::format::{extension_of, SourceFormat};

/// Check that `path` exists and carries an allowed extension.
pub fn validate_source(path: &Path) -> Result<SourceFormat, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::NotFound {
            path: path.to_path_buf(),
        });
    }

    SourceFormat::from_path(path).ok_or_else(|| ConvertError::UnsupportedExtension {
        path: path.to_path_buf(),
        extension: extension_of(path),
    })
}

/// Make `destination` ready for a converter: its folder exists and any file
/// already sitting at the path has been removed.
///
/// With `sandbox` set, missing folders are only created below that directory.
pub fn prepare_destination(destination: &Path, sandbox: Option<&Path>) -> Result<(), ConvertError> {
    let folder = parent_folder(destination);

    if !folder.exists() {
        if let Some(base) = sandbox {
            ensure_inside(&folder, base)?;
        }
        create_writable_folder(&folder)?;
    } else if fs::metadata(&folder)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
    {
        return Err(ConvertError::Permission { path: folder });
    }

    if let Ok(meta) = fs::symlink_metadata(destination) {
        if meta.permissions().readonly() {
            return Err(ConvertError::Permission {
                path: destination.to_path_buf(),
            });
        }
        fs::remove_file(destination).map_err(|e| ConvertError::FileRemoval {
            path: destination.to_path_buf(),
            source: e,
        })?;
        log::debug!("Removed existing destination {}", destination.display());
    }

    Ok(())
}

/// Create `folder` and its missing ancestors. Every created directory gets
/// the permission bits of the closest directory that already existed.
///
/// Returns the created directories, top-down.
pub fn create_writable_folder(folder: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut missing = Vec::new();
    let mut ancestor = folder;
    while !ancestor.exists() {
        missing.push(ancestor.to_path_buf());
        ancestor = match ancestor.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
    }
    missing.reverse();

    fs::create_dir_all(folder).map_err(|e| ConvertError::FolderCreation {
        path: folder.to_path_buf(),
        reason: e.to_string(),
    })?;

    inherit_permissions(ancestor, &missing)?;

    log::debug!(
        "Created {} folder(s) for {}",
        missing.len(),
        folder.display()
    );
    Ok(missing)
}

#[cfg(unix)]
fn inherit_permissions(ancestor: &Path, created: &[PathBuf]) -> Result<(), ConvertError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(ancestor)
        .map_err(|e| ConvertError::FolderCreation {
            path: ancestor.to_path_buf(),
            reason: e.to_string(),
        })?
        .permissions()
        .mode()
        & 0o777;

    for dir in created {
        fs::set_permissions(dir, fs::Permissions::from_mode(mode)).map_err(|e| {
            ConvertError::FolderCreation {
                path: dir.clone(),
                reason: format!("failed to set permissions: {e}"),
            }
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn inherit_permissions(_ancestor: &Path, _created: &[PathBuf]) -> Result<(), ConvertError> {
    Ok(())
}

fn parent_folder(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn ensure_inside(folder: &Path, base: &Path) -> Result<(), ConvertError> {
    let outside = || ConvertError::FolderCreation {
        path: folder.to_path_buf(),
        reason: format!("outside of the allowed base directory {}", base.display()),
    };
    let folder_abs = normalize(folder).map_err(|_| outside())?;
    let base_abs = normalize(base).map_err(|_| outside())?;
    if folder_abs.starts_with(&base_abs) {
        Ok(())
    } else {
        Err(outside())
    }
}

/// Absolute, lexically normalized form of `path`. Works for paths that do
/// not exist yet.
fn normalize(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    Ok(out)
}
