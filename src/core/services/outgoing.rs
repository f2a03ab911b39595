use serde::Serialize;

use crate::core::errors::Result;
use crate::core::models::message::MailMessage;
use crate::core::models::status::{EncryptStatus, OutgoingOutcome};
use crate::core::traits::mail_crypto::MailCrypto;

/// What the mail client learns about one outgoing message.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingReport {
    pub result: OutgoingOutcome,
    /// Rewritten (signed/encrypted) raw message, only on success with
    /// work done; absent for the flagless no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_key_addresses: Vec<String>,
}

/// Outgoing pipeline: the sign/encrypt flags fully determine behavior,
/// there is no classification gate.
pub fn process_outgoing<C: MailCrypto>(
    crypto: &C,
    raw_body: &str,
    sign: bool,
    encrypt: bool,
    passphrase: Option<&str>,
) -> Result<OutgoingReport> {
    let message = MailMessage::parse(raw_body)?;

    let status = match (sign, encrypt) {
        (false, false) => {
            return Ok(OutgoingReport {
                result: OutgoingOutcome::Success,
                email_body: None,
                failure_message: None,
                missing_key_addresses: Vec::new(),
            })
        }
        (true, false) => crypto.sign(&message, passphrase)?,
        (false, true) => crypto.encrypt(&message)?,
        (true, true) => crypto.encrypt_and_sign(&message, passphrase)?,
    };

    Ok(report_from_status(status))
}

fn report_from_status(status: EncryptStatus) -> OutgoingReport {
    OutgoingReport {
        result: status.outcome,
        email_body: status.message.map(|m| m.to_raw()),
        failure_message: status.failure_message,
        missing_key_addresses: status.missing_key_addresses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::status::{DecryptionStatus, VerificationStatus};

    struct Stub {
        next: EncryptStatus,
    }

    impl MailCrypto for Stub {
        fn decrypt(&self, _: &MailMessage, _: Option<&str>) -> Result<DecryptionStatus> {
            unreachable!()
        }

        fn verify(&self, _: &MailMessage) -> Result<VerificationStatus> {
            unreachable!()
        }

        fn sign(&self, _: &MailMessage, _: Option<&str>) -> Result<EncryptStatus> {
            Ok(self.next.clone())
        }

        fn encrypt(&self, _: &MailMessage) -> Result<EncryptStatus> {
            Ok(self.next.clone())
        }

        fn encrypt_and_sign(&self, _: &MailMessage, _: Option<&str>) -> Result<EncryptStatus> {
            Ok(self.next.clone())
        }
    }

    #[test]
    fn flagless_is_a_noop_success() {
        let stub = Stub {
            next: EncryptStatus::failed("should not run"),
        };
        let report =
            process_outgoing(&stub, "From: a@x\nTo: b@y\n\nhello\n", false, false, None).unwrap();
        assert_eq!(report.result, OutgoingOutcome::Success);
        assert!(report.email_body.is_none());
    }

    #[test]
    fn missing_pubkeys_carries_addresses() {
        let stub = Stub {
            next: EncryptStatus::missing_pubkeys(vec!["b@y".into()]),
        };
        let report =
            process_outgoing(&stub, "From: a@x\nTo: b@y\n\nhello\n", false, true, None).unwrap();
        assert_eq!(report.result, OutgoingOutcome::MissingPubkeys);
        assert_eq!(report.missing_key_addresses, vec!["b@y".to_string()]);
        assert!(report.failure_message.is_some());
    }
}
