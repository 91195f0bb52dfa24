use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::UserId;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("recipient file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {value:?} is not a numeric identifier")]
    Parse { line: usize, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    SaveFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// Requester tried to remove themselves as the sole recipient.
    LastRecipient,
    SaveFailed,
}

/// File-backed set of report recipients, who are also the only admins.
///
/// Reads hit the file every time so edits from other sessions are visible
/// immediately. Mutations run load-modify-save under one lock.
#[derive(Debug)]
pub struct RecipientRegistry {
    path: PathBuf,
    defaults: Vec<UserId>,
    write_lock: Mutex<()>,
}

impl RecipientRegistry {
    pub fn new(path: impl Into<PathBuf>, defaults: Vec<UserId>) -> Self {
        Self {
            path: path.into(),
            defaults,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current recipients. A missing or unreadable file yields the defaults.
    pub async fn load(&self) -> Vec<UserId> {
        match self.read_file().await {
            Ok(ids) => {
                info!(count = ids.len(), "loaded recipients from {}", self.path.display());
                ids
            }
            Err(RegistryError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found, using built-in recipients", self.path.display());
                self.defaults.clone()
            }
            Err(e) => {
                error!("failed to load recipients: {}", e);
                self.defaults.clone()
            }
        }
    }

    /// Overwrites the file, one identifier per line. Never fails loudly.
    pub async fn save(&self, ids: &[UserId]) -> bool {
        match self.write_file(ids).await {
            Ok(()) => {
                info!(count = ids.len(), "saved recipients to {}", self.path.display());
                true
            }
            Err(e) => {
                error!("failed to save recipients: {}", e);
                false
            }
        }
    }

    pub async fn is_recipient(&self, id: UserId) -> bool {
        self.load().await.contains(&id)
    }

    pub async fn add(&self, id: UserId) -> AddOutcome {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.load().await;
        if ids.contains(&id) {
            warn!(recipient = id, "recipient already registered");
            return AddOutcome::AlreadyPresent;
        }
        ids.push(id);
        if self.save(&ids).await {
            info!(recipient = id, "recipient added");
            AddOutcome::Added
        } else {
            AddOutcome::SaveFailed
        }
    }

    /// Removes `id` unless that would lock `requester` out as the last recipient.
    pub async fn remove(&self, id: UserId, requester: UserId) -> RemoveOutcome {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.load().await;
        let Some(pos) = ids.iter().position(|x| *x == id) else {
            warn!(recipient = id, "recipient not found");
            return RemoveOutcome::NotFound;
        };
        if id == requester && ids.len() == 1 {
            warn!(recipient = id, "refusing to remove the last recipient");
            return RemoveOutcome::LastRecipient;
        }
        ids.remove(pos);
        if self.save(&ids).await {
            info!(recipient = id, "recipient removed");
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::SaveFailed
        }
    }

    async fn read_file(&self) -> Result<Vec<UserId>, RegistryError> {
        let content = fs::read_to_string(&self.path).await?;
        parse_ids(&content)
    }

    async fn write_file(&self, ids: &[UserId]) -> Result<(), RegistryError> {
        let content: String = ids.iter().map(|id| format!("{}\n", id)).collect();
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

/// One identifier per non-blank line; any bad line rejects the whole file.
fn parse_ids(content: &str) -> Result<Vec<UserId>, RegistryError> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, value)| {
            value.parse::<UserId>().map_err(|_| RegistryError::Parse {
                line,
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_blank_lines() {
        assert_eq!(parse_ids("1\n\n  2 \n").unwrap(), vec![1, 2]);
    }

    #[test]
    fn parse_rejects_whole_file_on_bad_line() {
        match parse_ids("1\nabc\n3\n") {
            Err(RegistryError::Parse { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
