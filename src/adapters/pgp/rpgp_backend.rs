use pgp::composed::cleartext::CleartextSignedMessage;
use pgp::composed::message::Esk;
use pgp::composed::{Deserializable, Message, SignedPublicSubKey, StandaloneSignature};
use pgp::crypto::hash::HashAlgorithm;
use pgp::crypto::sym::SymmetricKeyAlgorithm;
use pgp::packet::{LiteralData, Signature};
use pgp::ArmorOptions;

use crate::core::errors::Result;
use crate::core::models::entity::KeyEntity;
use crate::core::models::message::{multipart_encrypted_body, MailMessage};
use crate::core::models::status::{DecryptionStatus, EncryptStatus, VerificationStatus};
use crate::core::services::classifier;
use crate::core::traits::key_source::KeySource;
use crate::core::traits::mail_crypto::MailCrypto;

const PGP_MESSAGE_BEGIN: &str = "-----BEGIN PGP MESSAGE-----";
const PGP_MESSAGE_END: &str = "-----END PGP MESSAGE-----";
const PGP_SIGNATURE_BEGIN: &str = "-----BEGIN PGP SIGNATURE-----";
const PGP_SIGNATURE_END: &str = "-----END PGP SIGNATURE-----";

/// `MailCrypto` over rPGP, resolving keys through a `KeySource`.
///
/// The pipelines never reach around this type to touch key material;
/// every lookup and unlock check goes through the key source.
pub struct RpgpMailCrypto<K: KeySource> {
    keys: K,
}

impl<K: KeySource> RpgpMailCrypto<K> {
    pub fn new(keys: K) -> Self {
        Self { keys }
    }

    /// Locate the armored ciphertext: second part of a
    /// multipart/encrypted message, or the inline block in the body.
    fn armored_ciphertext(&self, msg: &MailMessage) -> Option<String> {
        if classifier::content_type(msg) == classifier::MULTIPART_ENCRYPTED {
            for part in msg.multipart_parts() {
                if let Some(block) =
                    extract_armored_block(&part, PGP_MESSAGE_BEGIN, PGP_MESSAGE_END)
                {
                    return Some(block);
                }
            }
        }
        extract_armored_block(msg.body(), PGP_MESSAGE_BEGIN, PGP_MESSAGE_END)
    }

    fn find_verification_key(&self, hex_id: &str) -> Option<KeyEntity> {
        self.keys
            .public_key_by_id(hex_id)
            .or_else(|| self.keys.secret_key_by_id(hex_id))
    }

    /// Verify a one-pass signature found inside an encrypted message.
    fn verify_inner_signature(&self, decrypted: &Message) -> VerificationStatus {
        let Message::Signed { signature, .. } = decrypted else {
            return VerificationStatus::not_signed();
        };
        let Some(signer) = signature_issuer(signature) else {
            return VerificationStatus::failed(None, "signature does not name a signing key");
        };
        let Some(entity) = self.find_verification_key(&signer) else {
            return VerificationStatus::failed(
                Some(signer.clone()),
                format!("no key available for signer {signer}"),
            );
        };
        match decrypted.verify(entity.public()) {
            Ok(()) => VerificationStatus::success(Some(signer)),
            Err(e) => VerificationStatus::failed(
                Some(signer),
                format!("signature verification failed: {e}"),
            ),
        }
    }

    fn verify_cleartext(&self, body: &str) -> VerificationStatus {
        let Some(block) = extract_armored_block(
            body,
            classifier::INLINE_SIGNED_MARKER,
            PGP_SIGNATURE_END,
        ) else {
            return VerificationStatus::not_signed();
        };
        let (csm, _) = match CleartextSignedMessage::from_string(&block) {
            Ok(parsed) => parsed,
            Err(e) => {
                return VerificationStatus::failed(
                    None,
                    format!("could not parse signed message: {e}"),
                )
            }
        };
        let signer = csm
            .signatures()
            .first()
            .and_then(|s| signature_issuer(&s.signature));
        let Some(signer) = signer else {
            return VerificationStatus::failed(None, "signature does not name a signing key");
        };
        let Some(entity) = self.find_verification_key(&signer) else {
            return VerificationStatus::failed(
                Some(signer.clone()),
                format!("no key available for signer {signer}"),
            );
        };
        match csm.verify(entity.public()) {
            Ok(_) => VerificationStatus::success(Some(signer)),
            Err(e) => VerificationStatus::failed(
                Some(signer),
                format!("signature verification failed: {e}"),
            ),
        }
    }

    fn verify_multipart(&self, msg: &MailMessage) -> VerificationStatus {
        let parts = msg.multipart_parts();
        if parts.len() < 2 {
            return VerificationStatus::failed(None, "signed message is missing parts");
        }
        let Some(armored) =
            extract_armored_block(&parts[1], PGP_SIGNATURE_BEGIN, PGP_SIGNATURE_END)
        else {
            return VerificationStatus::failed(None, "no detached signature part found");
        };
        let (standalone, _) = match StandaloneSignature::from_string(&armored) {
            Ok(parsed) => parsed,
            Err(e) => {
                return VerificationStatus::failed(None, format!("could not parse signature: {e}"))
            }
        };
        let Some(signer) = signature_issuer(&standalone.signature) else {
            return VerificationStatus::failed(None, "signature does not name a signing key");
        };
        let Some(entity) = self.find_verification_key(&signer) else {
            return VerificationStatus::failed(
                Some(signer.clone()),
                format!("no key available for signer {signer}"),
            );
        };
        match standalone.verify(entity.public(), parts[0].as_bytes()) {
            Ok(()) => VerificationStatus::success(Some(signer)),
            Err(e) => VerificationStatus::failed(
                Some(signer),
                format!("signature verification failed: {e}"),
            ),
        }
    }

    /// Resolve one public key per recipient, or the list of addresses
    /// that have none.
    fn resolve_recipients(
        &self,
        msg: &MailMessage,
    ) -> std::result::Result<Vec<(String, KeyEntity)>, Vec<String>> {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for addr in msg.recipients() {
            match self.keys.best_public_key(&addr) {
                Some(entity) => found.push((addr, entity)),
                None => missing.push(addr),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(missing)
        }
    }

    /// The signing entity and a usable passphrase for the sender, or a
    /// failure status explaining what is missing.
    fn resolve_signer(
        &self,
        msg: &MailMessage,
        passphrase: Option<&str>,
    ) -> std::result::Result<(KeyEntity, String), EncryptStatus> {
        let Some(sender) = msg.sender() else {
            return Err(EncryptStatus::failed("message has no From address"));
        };
        let Some(entity) = self.keys.best_secret_key(&sender) else {
            return Err(EncryptStatus::failed(format!(
                "no secret key for {sender}"
            )));
        };
        let pw = entity
            .usable_passphrase()
            .or_else(|| passphrase.map(str::to_string));
        match pw {
            Some(pw) => Ok((entity, pw)),
            None => Err(EncryptStatus::failed(format!(
                "passphrase required for key {}",
                entity.key_id_hex()
            ))),
        }
    }

    fn encrypt_message(
        &self,
        msg: &MailMessage,
        plaintext: Message,
        recipients: &[(String, KeyEntity)],
    ) -> EncryptStatus {
        let mut subkeys: Vec<SignedPublicSubKey> = Vec::new();
        for (addr, entity) in recipients {
            match entity.public().public_subkeys.first() {
                Some(sub) => subkeys.push(sub.clone()),
                None => {
                    return EncryptStatus::failed(format!(
                        "key for {addr} has no encryption subkey"
                    ))
                }
            }
        }
        let key_refs: Vec<&SignedPublicSubKey> = subkeys.iter().collect();

        let mut rng = rand::thread_rng();
        let encrypted = match plaintext.encrypt_to_keys_seipdv1(
            &mut rng,
            SymmetricKeyAlgorithm::AES128,
            &key_refs,
        ) {
            Ok(m) => m,
            Err(e) => return EncryptStatus::failed(format!("encryption failed: {e}")),
        };
        let armored = match encrypted.to_armored_string(ArmorOptions::default()) {
            Ok(a) => a,
            Err(e) => return EncryptStatus::failed(format!("armoring failed: {e}")),
        };

        let boundary = random_boundary();
        let rewritten = msg
            .with_header(
                "Content-Type",
                &format!(
                    "multipart/encrypted; protocol=\"application/pgp-encrypted\"; boundary=\"{boundary}\""
                ),
            )
            .with_header("MIME-Version", "1.0")
            .with_body(multipart_encrypted_body(&boundary, armored.trim_end()));
        EncryptStatus::success(rewritten)
    }
}

impl<K: KeySource> MailCrypto for RpgpMailCrypto<K> {
    fn decrypt(&self, msg: &MailMessage, passphrase: Option<&str>) -> Result<DecryptionStatus> {
        let Some(armored) = self.armored_ciphertext(msg) else {
            return Ok(DecryptionStatus::not_encrypted());
        };
        let (message, _) = match Message::from_string(&armored) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(DecryptionStatus::failed(format!(
                    "could not parse PGP message: {e}"
                )))
            }
        };

        let recipient_ids = esk_key_ids(&message);
        let candidates: Vec<(String, KeyEntity)> = recipient_ids
            .iter()
            .filter_map(|id| self.keys.secret_key_by_id(id).map(|e| (id.clone(), e)))
            .collect();
        if candidates.is_empty() {
            return Ok(DecryptionStatus::failed(
                "no secret key available for this message",
            ));
        }
        if passphrase.is_none() && candidates.iter().all(|(_, e)| e.is_locked()) {
            let ids = candidates.into_iter().map(|(id, _)| id).collect();
            return Ok(DecryptionStatus::passphrase_needed(ids));
        }

        let mut last_error = String::new();
        for (_, entity) in &candidates {
            let Some(secret) = entity.secret() else {
                continue;
            };
            let Some(pw) = entity
                .usable_passphrase()
                .or_else(|| passphrase.map(str::to_string))
            else {
                continue;
            };
            match message.decrypt(|| pw.clone(), &[secret]) {
                Ok((decrypted, _)) => {
                    return Ok(self.finish_decrypt(msg, decrypted));
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Ok(DecryptionStatus::failed(format!(
            "decryption failed: {last_error}"
        )))
    }

    fn verify(&self, msg: &MailMessage) -> Result<VerificationStatus> {
        if classifier::content_type(msg) == classifier::MULTIPART_SIGNED {
            return Ok(self.verify_multipart(msg));
        }
        if classifier::is_inline_signed(msg) {
            return Ok(self.verify_cleartext(msg.body()));
        }
        Ok(VerificationStatus::not_signed())
    }

    fn sign(&self, msg: &MailMessage, passphrase: Option<&str>) -> Result<EncryptStatus> {
        let (entity, pw) = match self.resolve_signer(msg, passphrase) {
            Ok(found) => found,
            Err(status) => return Ok(status),
        };
        let Some(secret) = entity.secret() else {
            return Ok(EncryptStatus::failed("entity has no private key"));
        };

        let mut rng = rand::thread_rng();
        let signed =
            match CleartextSignedMessage::sign(&mut rng, msg.body(), secret, || pw.clone()) {
                Ok(s) => s,
                Err(e) => return Ok(EncryptStatus::failed(format!("signing failed: {e}"))),
            };
        let armored = match signed.to_armored_string(ArmorOptions::default()) {
            Ok(a) => a,
            Err(e) => return Ok(EncryptStatus::failed(format!("armoring failed: {e}"))),
        };
        Ok(EncryptStatus::success(msg.with_body(armored)))
    }

    fn encrypt(&self, msg: &MailMessage) -> Result<EncryptStatus> {
        let recipients = match self.resolve_recipients(msg) {
            Ok(found) if found.is_empty() => {
                return Ok(EncryptStatus::failed("message has no recipients"))
            }
            Ok(found) => found,
            Err(missing) => return Ok(EncryptStatus::missing_pubkeys(missing)),
        };
        let literal = Message::Literal(LiteralData::from_bytes(
            (&[]).into(),
            msg.body().as_bytes(),
        ));
        Ok(self.encrypt_message(msg, literal, &recipients))
    }

    fn encrypt_and_sign(
        &self,
        msg: &MailMessage,
        passphrase: Option<&str>,
    ) -> Result<EncryptStatus> {
        // Recipient keys are resolved before the signing key is touched,
        // so a missing public key always wins over a signing problem.
        let recipients = match self.resolve_recipients(msg) {
            Ok(found) if found.is_empty() => {
                return Ok(EncryptStatus::failed("message has no recipients"))
            }
            Ok(found) => found,
            Err(missing) => return Ok(EncryptStatus::missing_pubkeys(missing)),
        };
        let (entity, pw) = match self.resolve_signer(msg, passphrase) {
            Ok(found) => found,
            Err(status) => return Ok(status),
        };
        let Some(secret) = entity.secret() else {
            return Ok(EncryptStatus::failed("entity has no private key"));
        };

        let literal = Message::Literal(LiteralData::from_bytes(
            (&[]).into(),
            msg.body().as_bytes(),
        ));
        let mut rng = rand::thread_rng();
        let signed = match literal.sign(&mut rng, secret, || pw.clone(), HashAlgorithm::default())
        {
            Ok(s) => s,
            Err(e) => return Ok(EncryptStatus::failed(format!("signing failed: {e}"))),
        };
        Ok(self.encrypt_message(msg, signed, &recipients))
    }
}

impl<K: KeySource> RpgpMailCrypto<K> {
    fn finish_decrypt(&self, original: &MailMessage, decrypted: Message) -> DecryptionStatus {
        let decrypted = if let Message::Compressed(_) = decrypted {
            match decrypted.decompress() {
                Ok(m) => m,
                Err(e) => {
                    return DecryptionStatus::failed(format!("decompression failed: {e}"))
                }
            }
        } else {
            decrypted
        };

        let verify = self.verify_inner_signature(&decrypted);

        let content = match decrypted.get_content() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return DecryptionStatus::failed("message carries no literal data"),
            Err(e) => return DecryptionStatus::failed(format!("could not read plaintext: {e}")),
        };
        let plaintext = String::from_utf8_lossy(&content).into_owned();

        // The encrypted envelope's MIME headers describe the ciphertext;
        // drop them so the verify stage classifies the plaintext itself.
        let rewritten = original
            .without_header("Content-Type")
            .without_header("MIME-Version")
            .with_body(plaintext);

        DecryptionStatus {
            outcome: crate::core::models::status::DecryptOutcome::Success,
            failure_message: None,
            candidate_key_ids: Vec::new(),
            verify,
            message: Some(rewritten),
        }
    }
}

/// Hex ids of the keys an encrypted message is addressed to.
fn esk_key_ids(message: &Message) -> Vec<String> {
    let Message::Encrypted { esk, .. } = message else {
        return Vec::new();
    };
    esk.iter()
        .filter_map(|e| match e {
            // v6 PKESK packets carry no key id; skip them.
            Esk::PublicKeyEncryptedSessionKey(pkesk) => {
                pkesk.id().ok().map(|id| hex::encode(id.as_ref()))
            }
            _ => None,
        })
        .collect()
}

fn signature_issuer(signature: &Signature) -> Option<String> {
    signature
        .issuer()
        .first()
        .map(|id| hex::encode(id.as_ref()))
}

fn extract_armored_block(text: &str, begin: &str, end: &str) -> Option<String> {
    let start = text.find(begin)?;
    let stop = text[start..].find(end)? + start + end.len();
    Some(text[start..stop].to_string())
}

fn random_boundary() -> String {
    format!("pgp-{}", hex::encode(rand::random::<[u8; 12]>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_block_inclusive() {
        let text = "preamble\n-----BEGIN PGP MESSAGE-----\nabc\n-----END PGP MESSAGE-----\ntrailer";
        let block = extract_armored_block(text, PGP_MESSAGE_BEGIN, PGP_MESSAGE_END).unwrap();
        assert!(block.starts_with(PGP_MESSAGE_BEGIN));
        assert!(block.ends_with(PGP_MESSAGE_END));
    }

    #[test]
    fn extract_block_missing_end() {
        let text = "-----BEGIN PGP MESSAGE-----\nabc";
        assert!(extract_armored_block(text, PGP_MESSAGE_BEGIN, PGP_MESSAGE_END).is_none());
    }

    #[test]
    fn boundaries_are_unique() {
        assert_ne!(random_boundary(), random_boundary());
    }
}
