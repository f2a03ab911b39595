use serde::{Deserialize, Serialize};

use crate::core::models::message::MailMessage;

/// Closed outcome set for the decrypt half of incoming processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecryptOutcome {
    NotEncrypted,
    Success,
    Failed,
    PassphraseNeeded,
}

/// Closed outcome set for the verify half of incoming processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyOutcome {
    NotSigned,
    Success,
    Failed,
}

/// Closed outcome set for outgoing processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutgoingOutcome {
    Success,
    Failed,
    MissingPubkeys,
}

/// Result of a decrypt attempt, with the verify outcome bundled when the
/// plaintext turned out to carry a signature inside the encryption.
#[derive(Debug, Clone)]
pub struct DecryptionStatus {
    pub outcome: DecryptOutcome,
    pub failure_message: Option<String>,
    /// Hex ids of secret keys that could decrypt, for PassphraseNeeded.
    pub candidate_key_ids: Vec<String>,
    pub verify: VerificationStatus,
    /// Rewritten message, only on Success.
    pub message: Option<MailMessage>,
}

impl DecryptionStatus {
    pub fn not_encrypted() -> Self {
        Self {
            outcome: DecryptOutcome::NotEncrypted,
            failure_message: None,
            candidate_key_ids: Vec::new(),
            verify: VerificationStatus::not_signed(),
            message: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            outcome: DecryptOutcome::Failed,
            failure_message: Some(detail.into()),
            candidate_key_ids: Vec::new(),
            verify: VerificationStatus::not_signed(),
            message: None,
        }
    }

    pub fn passphrase_needed(candidate_key_ids: Vec<String>) -> Self {
        Self {
            outcome: DecryptOutcome::PassphraseNeeded,
            failure_message: None,
            candidate_key_ids,
            verify: VerificationStatus::not_signed(),
            message: None,
        }
    }
}

/// Result of a signature verification.
#[derive(Debug, Clone)]
pub struct VerificationStatus {
    pub outcome: VerifyOutcome,
    /// Hex id of the signing key, when the signature names one.
    pub signer_key_id: Option<String>,
    pub failure_message: Option<String>,
}

impl VerificationStatus {
    pub fn not_signed() -> Self {
        Self {
            outcome: VerifyOutcome::NotSigned,
            signer_key_id: None,
            failure_message: None,
        }
    }

    pub fn success(signer_key_id: Option<String>) -> Self {
        Self {
            outcome: VerifyOutcome::Success,
            signer_key_id,
            failure_message: None,
        }
    }

    pub fn failed(signer_key_id: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            outcome: VerifyOutcome::Failed,
            signer_key_id,
            failure_message: Some(detail.into()),
        }
    }
}

/// Result of an outgoing sign and/or encrypt operation.
#[derive(Debug, Clone)]
pub struct EncryptStatus {
    pub outcome: OutgoingOutcome,
    pub failure_message: Option<String>,
    /// Recipient addresses lacking a public key, for MissingPubkeys.
    pub missing_key_addresses: Vec<String>,
    /// Rewritten message, only on Success.
    pub message: Option<MailMessage>,
}

impl EncryptStatus {
    pub fn success(message: MailMessage) -> Self {
        Self {
            outcome: OutgoingOutcome::Success,
            failure_message: None,
            missing_key_addresses: Vec::new(),
            message: Some(message),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            outcome: OutgoingOutcome::Failed,
            failure_message: Some(detail.into()),
            missing_key_addresses: Vec::new(),
            message: None,
        }
    }

    pub fn missing_pubkeys(addresses: Vec<String>) -> Self {
        Self {
            outcome: OutgoingOutcome::MissingPubkeys,
            failure_message: Some(format!(
                "no public key for: {}",
                addresses.join(", ")
            )),
            missing_key_addresses: addresses,
            message: None,
        }
    }
}
