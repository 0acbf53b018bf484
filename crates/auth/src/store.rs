use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use {anyhow::Result, tracing::warn};

use crate::types::Credential;

/// Key the access credential is stored under.
const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Holder of the current access credential.
///
/// Writes come from login, logout and settled refresh cycles only, so
/// implementations need no coordination beyond interior mutability.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential);
    fn clear(&self);
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    current: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: Credential) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// File-backed store at `~/.config/triage/credentials.json`.
///
/// The file is a flat JSON object; the credential lives under `accessToken`
/// and its absence means logged out. Reads are served from memory, every
/// write is persisted immediately.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    current: RwLock<Option<Credential>>,
}

impl FileCredentialStore {
    /// Open the store, loading whatever credential the file holds.
    pub fn open(path: PathBuf) -> Self {
        let current = match read_entries(&path) {
            Ok(mut entries) => entries.remove(ACCESS_TOKEN_KEY).map(Credential::new),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable credential file");
                None
            },
        };
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, credential: Option<&Credential>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = read_entries(&self.path).unwrap_or_default();
        match credential {
            Some(credential) => {
                entries.insert(ACCESS_TOKEN_KEY.to_string(), credential.expose().to_string());
            },
            None => {
                entries.remove(ACCESS_TOKEN_KEY);
            },
        }

        let data = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: Credential) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.persist(Some(&credential)) {
            warn!(path = %self.path.display(), error = %e, "failed to persist credential");
        }
        *current = Some(credential);
    }

    fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = self.persist(None) {
            warn!(path = %self.path.display(), error = %e, "failed to remove persisted credential");
        }
        *current = None;
    }
}

fn read_entries(path: &Path) -> Result<HashMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}
