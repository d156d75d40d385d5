pub mod cli;
pub mod error;
pub mod gateway;
pub mod inflight;
pub mod jwt;
pub mod models;
pub mod policy;
pub mod router;
pub mod session;
pub mod shell;
pub mod views;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use url::Url;

pub use error::ClientError;
pub use gateway::Gateway;
pub use jwt::{SessionClaims, TokenCodec};
pub use models::Role;
pub use session::{FileStorage, SessionStore};
pub use shell::Shell;

pub struct ClientConfig {
    /// Base URL of the backend API
    pub api_url: Url,
    /// Directory where the credential is persisted
    pub state_dir: PathBuf,
    /// Shared secret for verifying credentials; None trusts them unverified
    pub jwt_secret: Option<Vec<u8>>,
    /// Timeout for each backend request
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn codec(&self) -> TokenCodec {
        match &self.jwt_secret {
            Some(secret) => TokenCodec::verified(secret),
            None => TokenCodec::Unverified,
        }
    }
}

/// Create the shell with a file-backed session restored from `state_dir`.
pub fn create_shell(config: &ClientConfig) -> Result<Shell, ClientError> {
    let codec = config.codec();
    if !codec.is_verified() {
        warn!(
            "Credentials are decoded without signature or expiry checks. Set SKILLSHARE_JWT_SECRET to verify them"
        );
    }

    let session = Arc::new(SessionStore::new(
        FileStorage::in_dir(&config.state_dir),
        codec,
    ));
    let gateway = Gateway::with_timeout(config.api_url.clone(), config.timeout)?;
    Ok(Shell::new(session, gateway))
}
