//! Session state: who is logged in.
//!
//! A single `SessionStore` holds the raw credential and its decoded claims. The
//! credential is persisted through a [`CredentialStorage`] so a session survives
//! restarts. Subscribers are notified through a `watch` channel whenever the
//! claims change.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::jwt::{SessionClaims, TokenCodec};

/// Name of the persisted credential entry.
pub const CREDENTIAL_KEY: &str = "token";

/// Persistent storage for the raw credential.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> std::io::Result<Option<String>>;
    fn store(&self, credential: &str) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Stores the credential in a file named [`CREDENTIAL_KEY`] inside a state directory.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CREDENTIAL_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let credential = content.trim();
                if credential.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(credential.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write the credential readable by the owner only.
    fn store(&self, credential: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file left by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(credential.as_bytes())
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// In-memory storage, for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStorage {
    value: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(credential.into())),
        }
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> std::io::Result<Option<String>> {
        Ok(self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone())
    }

    fn store(&self, credential: &str) -> std::io::Result<()> {
        let mut value = self
            .value
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *value = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Single source of truth for the current session.
pub struct SessionStore {
    storage: Box<dyn CredentialStorage>,
    codec: TokenCodec,
    credential: Mutex<Option<String>>,
    claims: watch::Sender<Option<SessionClaims>>,
    initialized: AtomicBool,
}

impl SessionStore {
    /// Create an empty (anonymous) store. Call [`SessionStore::initialize`] to
    /// pick up a persisted credential.
    pub fn new(storage: impl CredentialStorage + 'static, codec: TokenCodec) -> Self {
        let (claims, _) = watch::channel(None);
        Self {
            storage: Box::new(storage),
            codec,
            credential: Mutex::new(None),
            claims,
            initialized: AtomicBool::new(false),
        }
    }

    /// Restore the persisted session. Runs once; later calls return the current claims.
    ///
    /// A credential that fails to decode is removed from storage and the session
    /// stays anonymous.
    pub fn initialize(&self) -> Option<SessionClaims> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.current_claims();
        }

        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                return None;
            }
        };

        let Some(credential) = stored else {
            debug!("No stored credential");
            return None;
        };

        match self.codec.decode(&credential) {
            Ok(claims) => {
                info!(subject = %claims.subject_id, role = %claims.role, "Session restored");
                self.set(Some(credential), Some(claims.clone()));
                Some(claims)
            }
            Err(e) => {
                warn!(error = %e, "Discarding stored credential");
                if let Err(e) = self.storage.clear() {
                    warn!(error = %e, "Failed to remove stored credential");
                }
                None
            }
        }
    }

    /// Replace the session with the one carried by `credential`.
    ///
    /// A credential that cannot be decoded is a backend contract violation: the
    /// error is returned and the store ends logged out.
    pub fn login(&self, credential: &str) -> Result<SessionClaims, ClientError> {
        let claims = match self.codec.decode(credential) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Backend issued an unusable credential");
                self.clear_all();
                return Err(e.into());
            }
        };

        if let Err(e) = self.storage.store(credential) {
            self.clear_all();
            return Err(e.into());
        }

        info!(subject = %claims.subject_id, role = %claims.role, "Logged in");
        self.set(Some(credential.to_string()), Some(claims.clone()));
        Ok(claims)
    }

    /// Clear the session. Calling it while logged out changes nothing.
    pub fn logout(&self) {
        if self.clear_all() {
            info!("Logged out");
        }
    }

    pub fn current_claims(&self) -> Option<SessionClaims> {
        self.claims.borrow().clone()
    }

    pub fn current_credential(&self) -> Option<String> {
        self.credential.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.claims.borrow().is_some()
    }

    /// Receive the claims every time the session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionClaims>> {
        self.claims.subscribe()
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Returns true if there was a session to clear.
    fn clear_all(&self) -> bool {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to remove stored credential");
        }
        self.set(None, None)
    }

    /// Swap credential and claims together. Subscribers are only notified on change.
    fn set(&self, credential: Option<String>, claims: Option<SessionClaims>) -> bool {
        let mut current = self.credential.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let credential_changed = *current != credential;
        *current = credential;

        let claims_changed = self.claims.send_if_modified(|value| {
            if *value == claims {
                false
            } else {
                *value = claims;
                true
            }
        });

        credential_changed || claims_changed
    }
}
