//! Repository acquisition
//!
//! An existing local directory is analyzed in place. Anything that looks
//! like a git URL is cloned shallowly into a temporary directory that lives
//! as long as the returned [`AcquiredRepository`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::TempDir;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AcquisitionError;

/// Where the repository comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource {
    /// Directory on this machine
    Local(PathBuf),
    /// Remote git repository
    Remote {
        /// Clone URL
        url: String,
        /// Branch or tag to check out
        revision: Option<String>,
    },
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositorySource::Local(path) => write!(f, "{}", path.display()),
            RepositorySource::Remote { url, revision: None } => f.write_str(url),
            RepositorySource::Remote {
                url,
                revision: Some(revision),
            } => write!(f, "{url}@{revision}"),
        }
    }
}

fn looks_remote(reference: &str) -> bool {
    reference.contains("://")
        || reference.starts_with("git@")
        || reference.starts_with("file:")
        || reference.ends_with(".git")
}

impl RepositorySource {
    /// Interpret a command-line repository reference
    ///
    /// # Errors
    /// [`AcquisitionError::NotFound`] when the reference is neither an
    /// existing directory nor a git URL
    pub fn parse(reference: &str, revision: Option<String>) -> Result<Self, AcquisitionError> {
        let path = Path::new(reference);
        if path.is_dir() {
            return Ok(RepositorySource::Local(path.to_path_buf()));
        }
        if looks_remote(reference) {
            return Ok(RepositorySource::Remote {
                url: reference.to_string(),
                revision,
            });
        }
        Err(AcquisitionError::NotFound(path.to_path_buf()))
    }
}

/// A repository available on disk for the rest of the run
#[derive(Debug)]
pub struct AcquiredRepository {
    source: RepositorySource,
    root: PathBuf,
    checkout: Option<TempDir>,
}

impl AcquiredRepository {
    /// Repository root on disk
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where it came from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &RepositorySource {
        &self.source
    }

    /// Whether the checkout is temporary
    #[inline]
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.checkout.is_some()
    }
}

/// Make `source` available locally
///
/// # Errors
/// [`AcquisitionError`] when the directory is missing, `git` cannot run, the
/// clone fails, or `cancel` fires first
pub async fn acquire(source: RepositorySource, cancel: &CancellationToken) -> Result<AcquiredRepository, AcquisitionError> {
    if cancel.is_cancelled() {
        return Err(AcquisitionError::Cancelled);
    }
    match source {
        RepositorySource::Local(path) => {
            if !path.is_dir() {
                return Err(AcquisitionError::NotFound(path));
            }
            info!(path = %path.display(), "using local repository");
            Ok(AcquiredRepository {
                root: path.clone(),
                source: RepositorySource::Local(path),
                checkout: None,
            })
        }
        RepositorySource::Remote { url, revision } => {
            let checkout = tempfile::Builder::new()
                .prefix("scaffold-repo-")
                .tempdir()
                .map_err(AcquisitionError::Workspace)?;
            let target = checkout.path().join("repo");
            clone(&url, revision.as_deref(), &target, cancel).await?;
            info!(url = %url, path = %target.display(), "repository cloned");
            Ok(AcquiredRepository {
                root: target,
                source: RepositorySource::Remote { url, revision },
                checkout: Some(checkout),
            })
        }
    }
}

async fn clone(url: &str, revision: Option<&str>, target: &Path, cancel: &CancellationToken) -> Result<(), AcquisitionError> {
    let mut command = Command::new("git");
    command.args(["clone", "--depth", "1"]);
    if let Some(revision) = revision {
        command.args(["--branch", revision]);
    }
    command
        .arg(url)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(url, ?revision, "spawning git clone");

    let child = command.spawn().map_err(AcquisitionError::Spawn)?;
    let output = tokio::select! {
        output = child.wait_with_output() => output.map_err(AcquisitionError::Spawn)?,
        () = cancel.cancelled() => return Err(AcquisitionError::Cancelled),
    };
    if output.status.success() {
        Ok(())
    } else {
        Err(AcquisitionError::Clone {
            url: url.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
