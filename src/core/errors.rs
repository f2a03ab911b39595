use std::path::PathBuf;

/// All domain errors for mailseal.
///
/// Cryptographic outcomes that a mail client must present to the user
/// (wrong passphrase, missing recipient keys, bad signatures) are NOT
/// errors. They travel as status variants in `core::models::status`.
/// This enum covers the cases where an operation cannot produce a status
/// at all.
#[derive(Debug, thiserror::Error)]
pub enum MailsealError {
    #[error("Failed to load keyring {path}: {detail}")]
    KeyringLoad { path: PathBuf, detail: String },

    #[error("Failed to append to keyring {path}: {detail}")]
    KeyringWrite { path: PathBuf, detail: String },

    #[error("Malformed message: {detail}")]
    MalformedMessage { detail: String },

    #[error("Key generation failed: {detail}")]
    KeyGeneration { detail: String },

    #[error("Failed to armor key material: {detail}")]
    Armor { detail: String },

    #[error("Entity has no private key")]
    NoPrivateKey,

    #[error("No key found for key id {key_id}")]
    KeyNotFound { key_id: String },

    #[error("Invalid key id '{key_id}': expected 16 hex characters")]
    InvalidKeyId { key_id: String },

    #[error("Could not determine the agent home directory")]
    NoHomeDir,

    #[error("Protocol error: {detail}")]
    Protocol { detail: String },

    #[error("Internal fault in {operation}: {detail}")]
    Internal { operation: String, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MailsealError>;
