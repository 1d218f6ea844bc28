//! Per-process scratch area.
//!
//! Every server instance gets `base/<token>` where the token is 8 random hex
//! chars drawn once at startup. It must be created before anything else looks
//! at `base`, so that instances started together never negotiate a shared
//! location.

use crate::error::{Result, StratumError};
use once_cell::sync::OnceCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

pub const TOKEN_BYTES: usize = 4;
pub const MAX_CREATE_ATTEMPTS: usize = 4;
pub const PROJECTS_DIR: &str = "projects";

static PROCESS_SESSION: OnceCell<Arc<SessionWorkspace>> = OnceCell::new();

#[derive(Debug)]
pub struct SessionWorkspace {
    token: String,
    path: PathBuf,
    torn_down: AtomicBool,
}

impl SessionWorkspace {
    /// Creates a fresh workspace under `base_dir`. A token collision with a
    /// directory that already exists draws a new token; any other failure is
    /// returned as is.
    pub fn create(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir).map_err(|e| {
            StratumError::Session(format!(
                "cannot create workspace base {}: {}",
                base_dir.display(),
                e
            ))
        })?;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let token = generate_token()?;
            let path = base_dir.join(&token);
            match fs::create_dir(&path) {
                Ok(()) => {
                    tracing::info!("Session workspace created at {}", path.display());
                    return Ok(Self {
                        token,
                        path,
                        torn_down: AtomicBool::new(false),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!("Session token {} already in use, drawing another", token);
                }
                Err(e) => {
                    return Err(StratumError::Session(format!(
                        "cannot create {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(StratumError::Session(format!(
            "no free session token under {} after {} attempts",
            base_dir.display(),
            MAX_CREATE_ATTEMPTS
        )))
    }

    /// The process-wide workspace, created on first use. Later calls return the
    /// same instance regardless of `base_dir`.
    pub fn process(base_dir: &Path) -> Result<Arc<Self>> {
        let session = PROCESS_SESSION.get_or_try_init(|| Self::create(base_dir).map(Arc::new))?;
        if !session.path.starts_with(base_dir) {
            tracing::debug!(
                "Process session already lives at {}, ignoring base {}",
                session.path.display(),
                base_dir.display()
            );
        }
        Ok(Arc::clone(session))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of one logical project.
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.path.join(PROJECTS_DIR).join(name)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Recursively deletes the workspace, deepest entries first. Never fails and
    /// never follows links: a link is removed, its target is left alone.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        remove_tree(&self.path);
        tracing::info!("Session workspace {} removed", self.path.display());
    }
}

/// Best-effort recursive removal that does not traverse symlinks.
pub(crate) fn remove_tree(root: &Path) {
    for entry in WalkDir::new(root)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry during teardown: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = entry.file_type();
        let result = if file_type.is_dir() {
            fs::remove_dir(path)
        } else if file_type.is_symlink() {
            // Directory links on Windows need remove_dir
            fs::remove_file(path).or_else(|_| fs::remove_dir(path))
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = result {
            tracing::debug!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| StratumError::Session(format!("random source unavailable: {}", e)))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}
