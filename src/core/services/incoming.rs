use serde::Serialize;

use crate::core::errors::Result;
use crate::core::models::message::MailMessage;
use crate::core::models::status::{DecryptOutcome, VerifyOutcome};
use crate::core::services::classifier;
use crate::core::traits::mail_crypto::MailCrypto;

/// What the mail client learns about one incoming message.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingReport {
    pub decrypt_result: DecryptOutcome,
    pub verify_result: VerifyOutcome,
    /// Rewritten (decrypted) raw message, only when decryption succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    /// Hex key ids that could decrypt, when a passphrase is needed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub encrypted_key_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_key_id: Option<String>,
}

impl IncomingReport {
    fn untouched() -> Self {
        Self {
            decrypt_result: DecryptOutcome::NotEncrypted,
            verify_result: VerifyOutcome::NotSigned,
            email_body: None,
            failure_message: None,
            encrypted_key_ids: Vec::new(),
            signer_key_id: None,
        }
    }
}

/// Incoming pipeline: decrypt first when the message is encrypted, then
/// verify on whatever the message looks like afterwards. A decrypt
/// failure stops processing; no signature check runs on ciphertext.
pub fn process_incoming<C: MailCrypto>(
    crypto: &C,
    raw_body: &str,
    passphrase: Option<&str>,
) -> Result<IncomingReport> {
    let message = MailMessage::parse(raw_body)?;
    let mut report = IncomingReport::untouched();

    if !classifier::needs_incoming_processing(&message) {
        return Ok(report);
    }

    let mut current = message;

    let ct = classifier::content_type(&current);
    if ct == classifier::MULTIPART_ENCRYPTED || classifier::is_inline_encrypted(&current) {
        let status = crypto.decrypt(&current, passphrase)?;
        report.decrypt_result = status.outcome;
        report.verify_result = status.verify.outcome;
        report.signer_key_id = status.verify.signer_key_id.clone();
        match status.outcome {
            DecryptOutcome::Success => {
                if status.verify.outcome == VerifyOutcome::Failed {
                    report.failure_message = status.verify.failure_message.clone();
                }
                if let Some(rewritten) = status.message {
                    report.email_body = Some(rewritten.to_raw());
                    current = rewritten;
                }
            }
            DecryptOutcome::PassphraseNeeded => {
                report.encrypted_key_ids = status.candidate_key_ids;
                return Ok(report);
            }
            _ => {
                report.failure_message = status.failure_message;
                return Ok(report);
            }
        }
    }

    // Re-evaluate on the possibly-decrypted body.
    let ct = classifier::content_type(&current);
    if ct == classifier::MULTIPART_SIGNED || classifier::is_inline_signed(&current) {
        let status = crypto.verify(&current)?;
        report.verify_result = status.outcome;
        report.signer_key_id = status.signer_key_id;
        if status.outcome == VerifyOutcome::Failed {
            report.failure_message = status.failure_message;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::status::{DecryptionStatus, EncryptStatus, VerificationStatus};

    /// Canned crypto backend for pipeline wiring tests.
    struct Stub {
        decrypt: DecryptionStatus,
        verify: VerificationStatus,
    }

    impl MailCrypto for Stub {
        fn decrypt(&self, _: &MailMessage, _: Option<&str>) -> Result<DecryptionStatus> {
            Ok(self.decrypt.clone())
        }

        fn verify(&self, _: &MailMessage) -> Result<VerificationStatus> {
            Ok(self.verify.clone())
        }

        fn sign(&self, _: &MailMessage, _: Option<&str>) -> Result<EncryptStatus> {
            unreachable!()
        }

        fn encrypt(&self, _: &MailMessage) -> Result<EncryptStatus> {
            unreachable!()
        }

        fn encrypt_and_sign(&self, _: &MailMessage, _: Option<&str>) -> Result<EncryptStatus> {
            unreachable!()
        }
    }

    #[test]
    fn plain_message_passes_through() {
        let stub = Stub {
            decrypt: DecryptionStatus::failed("should not run"),
            verify: VerificationStatus::failed(None, "should not run"),
        };
        let report = process_incoming(&stub, "Subject: hi\n\nplain text\n", None).unwrap();
        assert_eq!(report.decrypt_result, DecryptOutcome::NotEncrypted);
        assert_eq!(report.verify_result, VerifyOutcome::NotSigned);
        assert!(report.email_body.is_none());
    }

    #[test]
    fn decrypt_failure_skips_verify() {
        let stub = Stub {
            decrypt: DecryptionStatus::failed("bad ciphertext"),
            verify: VerificationStatus::success(Some("feedbeef00000000".into())),
        };
        let raw = "Subject: x\n\n-----BEGIN PGP MESSAGE-----\nzz\n-----END PGP MESSAGE-----\n\
                   -----BEGIN PGP SIGNED MESSAGE-----\n";
        let report = process_incoming(&stub, raw, None).unwrap();
        assert_eq!(report.decrypt_result, DecryptOutcome::Failed);
        // Verify must not run on ciphertext even with a signed marker present.
        assert_eq!(report.verify_result, VerifyOutcome::NotSigned);
        assert_eq!(report.failure_message.as_deref(), Some("bad ciphertext"));
    }

    #[test]
    fn passphrase_needed_reports_candidates() {
        let stub = Stub {
            decrypt: DecryptionStatus::passphrase_needed(vec!["aabbccdd00112233".into()]),
            verify: VerificationStatus::not_signed(),
        };
        let raw = "Subject: x\n\n-----BEGIN PGP MESSAGE-----\nzz\n-----END PGP MESSAGE-----\n";
        let report = process_incoming(&stub, raw, None).unwrap();
        assert_eq!(report.decrypt_result, DecryptOutcome::PassphraseNeeded);
        assert_eq!(report.encrypted_key_ids, vec!["aabbccdd00112233".to_string()]);
    }

    #[test]
    fn malformed_message_propagates_error() {
        let stub = Stub {
            decrypt: DecryptionStatus::not_encrypted(),
            verify: VerificationStatus::not_signed(),
        };
        assert!(process_incoming(&stub, "no header colon\n\nx", None).is_err());
    }
}
