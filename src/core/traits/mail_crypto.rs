use crate::core::errors::Result;
use crate::core::models::message::MailMessage;
use crate::core::models::status::{DecryptionStatus, EncryptStatus, VerificationStatus};

/// Port for per-message cryptographic operations.
///
/// The implementation lives in `adapters::pgp`. Cryptographic failures
/// (wrong passphrase, missing keys, bad signatures) come back as status
/// values; `Err` is reserved for faults that preclude a status at all.
pub trait MailCrypto: Send + Sync {
    /// Decrypt an encrypted message. `passphrase = None` means "try only
    /// already-unlocked keys". A signature found inside the encryption is
    /// verified in the same pass and reported in the bundled slot.
    fn decrypt(&self, msg: &MailMessage, passphrase: Option<&str>) -> Result<DecryptionStatus>;

    /// Verify the signature on a signed message.
    fn verify(&self, msg: &MailMessage) -> Result<VerificationStatus>;

    /// Sign with the sender's secret key.
    fn sign(&self, msg: &MailMessage, passphrase: Option<&str>) -> Result<EncryptStatus>;

    /// Encrypt to all recipient public keys.
    fn encrypt(&self, msg: &MailMessage) -> Result<EncryptStatus>;

    /// Sign with the sender's key, then encrypt to all recipients.
    fn encrypt_and_sign(
        &self,
        msg: &MailMessage,
        passphrase: Option<&str>,
    ) -> Result<EncryptStatus>;
}
