use serde::Serialize;

use crate::adapters::keyring::render::render_entity;
use crate::core::errors::Result;
use crate::core::models::entity::KeyEntity;

/// Wire description of a key, or of its absence.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfo {
    pub has_key: bool,
    pub has_secret_key: bool,
    /// True when the private material is passphrase protected and not
    /// yet unlocked this session.
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fingerprint: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key_data: String,
}

impl KeyInfo {
    /// The answer when no matching key exists.
    pub fn absent() -> Self {
        Self {
            has_key: false,
            has_secret_key: false,
            is_encrypted: false,
            fingerprint: String::new(),
            key_id: String::new(),
            summary: String::new(),
            user_ids: Vec::new(),
            key_data: String::new(),
            secret_key_data: String::new(),
        }
    }

    pub fn from_entity(entity: &KeyEntity) -> Result<Self> {
        let has_secret = entity.secret().is_some();
        // Private material goes on the wire only once its passphrase has
        // been presented, or when it never had one.
        let secret_key_data = if has_secret && !entity.is_locked() {
            entity.armored_secret()?
        } else {
            String::new()
        };
        Ok(Self {
            has_key: true,
            has_secret_key: has_secret,
            is_encrypted: entity.is_locked(),
            fingerprint: entity.fingerprint_hex(),
            key_id: entity.key_id_hex(),
            summary: render_entity(entity),
            user_ids: entity.user_id_strings(),
            key_data: entity.armored_public()?,
            secret_key_data,
        })
    }
}
