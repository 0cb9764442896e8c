//! Native-module rebuild.
//!
//! After a version change the installed native modules have to be rebuilt
//! against the new runtime. This is delegated to an external tool (`apm` by
//! default) invoked as `<tool> rebuild` in the current working directory.
//!
//! The default tool is located in the following priority order:
//!
//! 1. A project-local install at `apm/node_modules/atom-package-manager/bin/apm`
//! 2. System PATH via `which::which("apm")`
//! 3. The bare command name `apm`
//!
//! On Windows the project-local and bare names get a `.cmd` suffix.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error};

use crate::errors::InstallError;

/// Name of the default rebuild tool.
const APM: &str = "apm";

/// Argument passed to the rebuild tool.
pub const REBUILD_ARG: &str = "rebuild";

/// Location of a project-local `apm`, relative to the project root.
fn local_apm(base_dir: &Path) -> PathBuf {
    base_dir
        .join("apm")
        .join("node_modules")
        .join("atom-package-manager")
        .join("bin")
        .join(APM)
}

fn with_cmd_suffix(path: PathBuf) -> PathBuf {
    if cfg!(windows) {
        let mut name = path.into_os_string();
        name.push(".cmd");
        PathBuf::from(name)
    } else {
        path
    }
}

/// Resolves the rebuild tool used when none is configured.
///
/// `base_dir` is the directory the project-local install is probed in;
/// callers pass the current working directory.
#[must_use]
pub fn default_rebuild_tool(base_dir: &Path) -> PathBuf {
    let local = local_apm(base_dir);
    let tool = if local.is_file() {
        with_cmd_suffix(local)
    } else if let Ok(path) = which::which(APM) {
        path
    } else {
        with_cmd_suffix(PathBuf::from(APM))
    };
    debug!("Rebuild tool resolved to {}", tool.display());
    tool
}

/// Runs `<tool> rebuild` and waits for it to finish.
///
/// The tool's stderr is logged when it exits unsuccessfully.
///
/// # Errors
///
/// Returns [`InstallError::Rebuild`] if the tool cannot be started or exits
/// with a non-zero status.
pub async fn run_rebuild(tool: &Path) -> Result<(), InstallError> {
    debug!("Running {} {REBUILD_ARG}", tool.display());

    let output = Command::new(tool)
        .arg(REBUILD_ARG)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| InstallError::Rebuild {
            tool: tool.to_path_buf(),
            message: "cannot start rebuild tool".to_string(),
            source: Some(e),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        error!("{}", stderr.trim_end());
    }

    let message = match output.status.code() {
        Some(code) => format!("exited with code {code}"),
        None => "terminated by signal".to_string(),
    };
    Err(InstallError::Rebuild {
        tool: tool.to_path_buf(),
        message,
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    #[test]
    fn local_install_is_preferred() {
        let temp = TempDir::new().unwrap();
        let local = local_apm(temp.path());
        std::fs::create_dir_all(local.parent().unwrap()).unwrap();
        std::fs::write(&local, b"").unwrap();

        let tool = default_rebuild_tool(temp.path());
        assert_eq!(tool, with_cmd_suffix(local));
    }

    #[test]
    fn local_directory_is_not_a_tool() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(local_apm(temp.path())).unwrap();

        let tool = default_rebuild_tool(temp.path());
        assert_ne!(tool, with_cmd_suffix(local_apm(temp.path())));
    }

    #[test]
    fn falls_back_to_path_or_bare_name() {
        let temp = TempDir::new().unwrap();
        let tool = default_rebuild_tool(temp.path());

        match which::which(APM) {
            Ok(found) => assert_eq!(tool, found),
            Err(_) => assert_eq!(tool, with_cmd_suffix(PathBuf::from("apm"))),
        }
    }

    #[cfg(unix)]
    #[test]
    fn suffix_only_on_windows() {
        assert_eq!(with_cmd_suffix(PathBuf::from("apm")), PathBuf::from("apm"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_tool_is_ok() {
        let tool = which::which("true").expect("true should be on PATH");
        run_rebuild(&tool).await.expect("Should succeed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_reports_exit_code() {
        let tool = which::which("false").expect("false should be on PATH");
        let err = run_rebuild(&tool).await.unwrap_err();

        match err {
            InstallError::Rebuild { message, source, .. } => {
                assert_eq!(message, "exited with code 1");
                assert!(source.is_none());
            }
            other => panic!("Expected Rebuild, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_tool_cannot_start() {
        let temp = TempDir::new().unwrap();
        let err = run_rebuild(&temp.path().join("no-such-apm")).await.unwrap_err();

        assert!(matches!(
            err,
            InstallError::Rebuild {
                source: Some(_),
                ..
            }
        ));
        assert!(err.to_string().contains("cannot start rebuild tool"));
    }
}
