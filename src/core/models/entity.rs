use pgp::composed::{SignedPublicKey, SignedSecretKey};
use pgp::types::{PublicKeyTrait, SecretKeyTrait};
use pgp::ArmorOptions;
use regex::Regex;
use std::sync::OnceLock;

use crate::core::errors::{MailsealError, Result};

/// Which of the directory's two collections a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRingKind {
    Public,
    Secret,
}

/// A declared identity on a key: display name plus email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: String,
    pub email: String,
}

/// An OpenPGP key identity: primary key, subkeys, declared identities.
///
/// Public-only entities carry just the certificate; secret entities carry
/// the key pair. rPGP keeps private material sealed and takes the
/// passphrase at each use, so "unlocked" means a passphrase verified
/// against the primary key and cached here. The cache lives in memory
/// only and is never written back to the keyring files.
#[derive(Debug, Clone)]
pub struct KeyEntity {
    public: SignedPublicKey,
    secret: Option<SignedSecretKey>,
    passphrase: Option<String>,
}

impl KeyEntity {
    pub fn from_public(public: SignedPublicKey) -> Self {
        Self {
            public,
            secret: None,
            passphrase: None,
        }
    }

    pub fn from_secret(secret: SignedSecretKey) -> Self {
        let public: SignedPublicKey = secret.clone().into();
        Self {
            public,
            secret: Some(secret),
            passphrase: None,
        }
    }

    pub fn public(&self) -> &SignedPublicKey {
        &self.public
    }

    pub fn secret(&self) -> Option<&SignedSecretKey> {
        self.secret.as_ref()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Hex-encoded 8-byte id of the primary key.
    pub fn key_id_hex(&self) -> String {
        hex::encode(self.public.key_id().as_ref())
    }

    /// Hex-encoded fingerprint of the primary key.
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.public.fingerprint().as_bytes())
    }

    /// Hex ids of the primary key and every subkey, primary first.
    pub fn all_key_ids_hex(&self) -> Vec<String> {
        let mut ids = vec![self.key_id_hex()];
        for sub in &self.public.public_subkeys {
            ids.push(hex::encode(sub.key_id().as_ref()));
        }
        ids
    }

    /// True when `hex_id` names the primary key or any subkey.
    pub fn matches_key_id(&self, hex_id: &str) -> bool {
        let wanted = hex_id.to_ascii_lowercase();
        self.all_key_ids_hex().iter().any(|id| *id == wanted)
    }

    /// Declared identities, parsed from the OpenPGP user-id strings.
    pub fn identities(&self) -> Vec<UserIdentity> {
        self.public
            .details
            .users
            .iter()
            .map(|u| parse_user_id(&u.id.id().to_string()))
            .collect()
    }

    /// Raw user-id strings as stored on the key.
    pub fn user_id_strings(&self) -> Vec<String> {
        self.public
            .details
            .users
            .iter()
            .map(|u| u.id.id().to_string())
            .collect()
    }

    /// True when ANY declared identity carries exactly this email.
    pub fn matches_email(&self, email: &str) -> bool {
        self.identities().iter().any(|id| id.email == email)
    }

    /// True when private material is present and passphrase-protected.
    pub fn is_secret_protected(&self) -> bool {
        match &self.secret {
            Some(sk) => sk.primary_key.secret_params().is_encrypted(),
            None => false,
        }
    }

    /// True when the private material cannot currently sign or decrypt.
    pub fn is_locked(&self) -> bool {
        self.has_secret() && self.is_secret_protected() && self.passphrase.is_none()
    }

    /// The passphrase to hand to rPGP for sign/decrypt calls, if the
    /// entity is usable: empty for unprotected keys, the cached value
    /// after a successful unlock, `None` while locked.
    pub fn usable_passphrase(&self) -> Option<String> {
        self.secret.as_ref()?;
        if !self.is_secret_protected() {
            return Some(String::new());
        }
        self.passphrase.clone()
    }

    /// Unlock the private material with `passphrase`.
    ///
    /// Fails only when there is no private material. Returns true
    /// without touching the passphrase when the key is unprotected.
    /// Returns false (not an error) on a wrong passphrase. Subkeys are
    /// unlocked best-effort with the same passphrase; a subkey failure
    /// does not roll back the primary unlock.
    pub fn unlock(&mut self, passphrase: &str) -> Result<bool> {
        let secret = self.secret.as_ref().ok_or(MailsealError::NoPrivateKey)?;
        if !secret.primary_key.secret_params().is_encrypted() {
            return Ok(true);
        }
        let pw = passphrase.to_string();
        if secret.unlock(|| pw.clone(), |_| Ok(())).is_err() {
            return Ok(false);
        }
        for sub in &secret.secret_subkeys {
            if let Err(err) = sub.unlock(|| pw.clone(), |_| Ok(())) {
                tracing::debug!(
                    subkey = %hex::encode(sub.key_id().as_ref()),
                    "subkey stays locked: {err}"
                );
            }
        }
        self.passphrase = Some(pw);
        Ok(true)
    }

    /// Armored public key block.
    pub fn armored_public(&self) -> Result<String> {
        self.public
            .to_armored_string(ArmorOptions::default())
            .map_err(|e| MailsealError::Armor {
                detail: e.to_string(),
            })
    }

    /// Armored private key block, in whatever form the keyring holds.
    /// Callers are responsible for only exporting unprotected material.
    pub fn armored_secret(&self) -> Result<String> {
        let secret = self.secret.as_ref().ok_or(MailsealError::NoPrivateKey)?;
        secret
            .to_armored_string(ArmorOptions::default())
            .map_err(|e| MailsealError::Armor {
                detail: e.to_string(),
            })
    }
}

/// Split `Name (comment) <email>` into its parts. Comment is dropped;
/// a bare address is treated as both missing name and the email itself.
fn parse_user_id(raw: &str) -> UserIdentity {
    static ANGLE: OnceLock<Regex> = OnceLock::new();
    let angle = ANGLE.get_or_init(|| Regex::new(r"<([^<>]+)>").unwrap());

    if let Some(caps) = angle.captures(raw) {
        let email = caps[1].trim().to_string();
        let mut name = raw[..caps.get(0).unwrap().start()].trim().to_string();
        if let Some(open) = name.find('(') {
            name = name[..open].trim().to_string();
        }
        return UserIdentity { name, email };
    }

    let trimmed = raw.trim().to_string();
    if trimmed.contains('@') {
        UserIdentity {
            name: String::new(),
            email: trimmed,
        }
    } else {
        UserIdentity {
            name: trimmed,
            email: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_user_id() {
        let id = parse_user_id("Alice Example (work) <alice@example.com>");
        assert_eq!(id.name, "Alice Example");
        assert_eq!(id.email, "alice@example.com");
    }

    #[test]
    fn parse_user_id_without_comment() {
        let id = parse_user_id("Bob <bob@example.com>");
        assert_eq!(id.name, "Bob");
        assert_eq!(id.email, "bob@example.com");
    }

    #[test]
    fn parse_bare_address() {
        let id = parse_user_id("carol@example.com");
        assert_eq!(id.name, "");
        assert_eq!(id.email, "carol@example.com");
    }

    #[test]
    fn parse_name_only() {
        let id = parse_user_id("Dave Noaddress");
        assert_eq!(id.name, "Dave Noaddress");
        assert_eq!(id.email, "");
    }
}
