use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::core::errors::{MailsealError, Result};

/// Directory name under the user's home that holds keyrings and logs.
const AGENT_DIR: &str = ".mailseal";
const PUBLIC_KEYRING_FILE: &str = "keys.pub";
const SECRET_KEYRING_FILE: &str = "keys.sec";
const LOG_FILE: &str = "log";

/// Filesystem layout of the agent's state directory.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    pub home: PathBuf,
    pub public_keyring: PathBuf,
    pub secret_keyring: PathBuf,
    pub log_file: PathBuf,
}

impl AgentPaths {
    /// Resolve the agent directory, honoring an explicit override.
    pub fn resolve(home_override: Option<&Path>) -> Result<Self> {
        let home = match home_override {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .ok_or(MailsealError::NoHomeDir)?
                .join(AGENT_DIR),
        };
        Ok(Self {
            public_keyring: home.join(PUBLIC_KEYRING_FILE),
            secret_keyring: home.join(SECRET_KEYRING_FILE),
            log_file: home.join(LOG_FILE),
            home,
        })
    }

    /// Create the agent directory and empty keyring files when absent.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.home)?;
        for path in [&self.public_keyring, &self.secret_keyring] {
            if !path.exists() {
                OpenOptions::new().create(true).append(true).open(path)?;
            }
        }
        Ok(())
    }
}
