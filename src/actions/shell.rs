//! Handing paths to the platform file browser and default applications.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::ActionError;

/// Command that opens a path with its default handler on this platform.
fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    }
}

fn launch(program: &str, args: &[&std::ffi::OsStr]) -> Result<(), ActionError> {
    log::debug!("Launching {} {:?}", program, args);
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| ActionError::Launch {
            program: program.to_string(),
            source,
        })?;

    // explorer.exe reports failure codes even when it succeeds.
    if status.success() || cfg!(target_os = "windows") {
        Ok(())
    } else {
        Err(ActionError::LaunchFailed {
            program: program.to_string(),
            code: status.code(),
        })
    }
}

/// Folders to show for `paths`: each file's parent, deduplicated in order.
#[must_use]
pub fn reveal_targets(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = Vec::new();
    for path in paths {
        let folder = if path.is_dir() {
            path.clone()
        } else {
            match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        if !targets.contains(&folder) {
            targets.push(folder);
        }
    }
    targets
}

/// Show `paths` in the platform file browser.
///
/// On macOS and Windows the files are selected in their folder; elsewhere
/// the containing folders are opened. Best-effort: returns `false` if any
/// launch failed or `paths` is empty.
#[must_use]
pub fn reveal_in_folder(paths: &[PathBuf]) -> bool {
    if paths.is_empty() {
        return false;
    }

    let mut ok = true;
    if cfg!(target_os = "macos") {
        let mut args: Vec<&std::ffi::OsStr> = vec!["-R".as_ref()];
        args.extend(paths.iter().map(|p| p.as_os_str()));
        if let Err(e) = launch("open", &args) {
            log::warn!("{}", e);
            ok = false;
        }
    } else if cfg!(target_os = "windows") {
        for path in paths {
            let select = format!("/select,{}", path.display());
            if let Err(e) = launch("explorer", &[select.as_ref()]) {
                log::warn!("{}", e);
                ok = false;
            }
        }
    } else {
        for folder in reveal_targets(paths) {
            if let Err(e) = launch(opener(), &[folder.as_os_str()]) {
                log::warn!("{}", e);
                ok = false;
            }
        }
    }
    ok
}

/// Open `path` with the platform's default application. Best-effort.
#[must_use]
pub fn open_path(path: &Path) -> bool {
    if !path.exists() {
        log::warn!("{}", ActionError::NotFound(path.to_path_buf()));
        return false;
    }
    match launch(opener(), &[path.as_os_str()]) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{}", e);
            false
        }
    }
}
