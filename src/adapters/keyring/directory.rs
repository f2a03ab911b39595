use std::fs::OpenOptions;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use pgp::composed::signed_key::PublicOrSecret;
use pgp::composed::{
    from_bytes_many, KeyType, SecretKeyParamsBuilder, SignedSecretKey, SubkeyParamsBuilder,
};
use pgp::ser::Serialize as PgpSerialize;

use crate::config::AgentPaths;
use crate::core::errors::{MailsealError, Result};
use crate::core::models::entity::{KeyEntity, KeyRingKind};
use crate::core::traits::key_source::KeySource;

/// Owns the two key collections and their on-disk keyring files.
///
/// Constructed once at startup and shared behind an `Arc`. The files
/// hold the native binary keyring format (concatenated transferable
/// keys) and are append-only; `load()` replaces the in-memory
/// collections wholesale. New keys from `generate`/`add_public_key` are
/// appended to disk and inserted into the in-memory collection in the
/// same call, so subsequent lookups in the running process see them.
pub struct KeyDirectory {
    public_path: PathBuf,
    secret_path: PathBuf,
    public: RwLock<Vec<KeyEntity>>,
    secret: RwLock<Vec<KeyEntity>>,
    // One lock per target file; held for the duration of each append.
    public_file_lock: Mutex<()>,
    secret_file_lock: Mutex<()>,
}

impl KeyDirectory {
    pub fn new(paths: &AgentPaths) -> Self {
        Self {
            public_path: paths.public_keyring.clone(),
            secret_path: paths.secret_keyring.clone(),
            public: RwLock::new(Vec::new()),
            secret: RwLock::new(Vec::new()),
            public_file_lock: Mutex::new(()),
            secret_file_lock: Mutex::new(()),
        }
    }

    /// Read both keyring files and replace the in-memory collections.
    /// Fails if either file is unreadable or malformed.
    pub fn load(&self) -> Result<()> {
        let public = read_keyring(&self.public_path)?;
        let secret = read_keyring(&self.secret_path)?;
        tracing::info!(
            public = public.len(),
            secret = secret.len(),
            "keyrings loaded"
        );
        *self.public.write().unwrap_or_else(|e| e.into_inner()) = public;
        *self.secret.write().unwrap_or_else(|e| e.into_inner()) = secret;
        Ok(())
    }

    /// All entities of `kind` with ANY declared identity exactly
    /// matching `email`, in load order. Empty on a miss, never an error.
    pub fn lookup_by_email(&self, email: &str, kind: KeyRingKind) -> Vec<KeyEntity> {
        let guard = self.collection(kind).read().unwrap_or_else(|e| e.into_inner());
        guard
            .iter()
            .filter(|e| e.matches_email(email))
            .cloned()
            .collect()
    }

    /// The entity whose primary key OR any subkey has this hex id.
    /// A subkey match returns the owning entity. First found wins.
    pub fn lookup_by_key_id(&self, hex_id: &str, kind: KeyRingKind) -> Option<KeyEntity> {
        let guard = self.collection(kind).read().unwrap_or_else(|e| e.into_inner());
        guard.iter().find(|e| e.matches_key_id(hex_id)).cloned()
    }

    /// Unlock the secret entity with this key id and keep the unlocked
    /// state in the collection for later lookups. Fails with
    /// `KeyNotFound` when no secret entity matches; returns false on a
    /// wrong passphrase.
    pub fn unlock_by_key_id(&self, hex_id: &str, passphrase: &str) -> Result<bool> {
        let hex_id = decode_key_id(hex_id)?;
        let mut guard = self.secret.write().unwrap_or_else(|e| e.into_inner());
        let entity = guard
            .iter_mut()
            .find(|e| e.matches_key_id(&hex_id))
            .ok_or(MailsealError::KeyNotFound { key_id: hex_id })?;
        entity.unlock(passphrase)
    }

    /// Generate a new RSA key pair for `Name (comment) <email>`, append
    /// its secret form to the secret keyring, insert it into the
    /// in-memory collection, and return it. Fresh keys start unlocked.
    pub fn generate(&self, name: &str, comment: &str, email: &str) -> Result<KeyEntity> {
        let signed = generate_key_pair(name, comment, email)?;
        let bytes = signed.to_bytes().map_err(|e| MailsealError::KeyGeneration {
            detail: e.to_string(),
        })?;
        self.append(&self.secret_path, &self.secret_file_lock, &bytes)?;

        let entity = KeyEntity::from_secret(signed);
        tracing::info!(key_id = %entity.key_id_hex(), "generated key pair");
        self.secret
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entity.clone());
        Ok(entity)
    }

    /// Append an entity's public form to the public keyring and insert
    /// it into the in-memory collection. Duplicates are tolerated.
    pub fn add_public_key(&self, entity: &KeyEntity) -> Result<()> {
        let bytes = entity
            .public()
            .to_bytes()
            .map_err(|e| MailsealError::KeyringWrite {
                path: self.public_path.clone(),
                detail: e.to_string(),
            })?;
        self.append(&self.public_path, &self.public_file_lock, &bytes)?;
        self.public
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(KeyEntity::from_public(entity.public().clone()));
        Ok(())
    }

    /// Armored export of an entity, public or secret form.
    pub fn armor(&self, entity: &KeyEntity, kind: KeyRingKind) -> Result<String> {
        match kind {
            KeyRingKind::Public => entity.armored_public(),
            KeyRingKind::Secret => entity.armored_secret(),
        }
    }

    fn collection(&self, kind: KeyRingKind) -> &RwLock<Vec<KeyEntity>> {
        match kind {
            KeyRingKind::Public => &self.public,
            KeyRingKind::Secret => &self.secret,
        }
    }

    fn append(&self, path: &Path, lock: &Mutex<()>, bytes: &[u8]) -> Result<()> {
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| MailsealError::KeyringWrite {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        file.write_all(bytes).map_err(|e| MailsealError::KeyringWrite {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

// Public-key resolution falls back to the secret collection: every
// secret entity carries its public half, and generated keys are
// persisted on the secret ring only.
impl KeySource for KeyDirectory {
    fn best_public_key(&self, email: &str) -> Option<KeyEntity> {
        self.lookup_by_email(email, KeyRingKind::Public)
            .into_iter()
            .next()
            .or_else(|| {
                self.lookup_by_email(email, KeyRingKind::Secret)
                    .into_iter()
                    .next()
            })
    }

    fn all_public_keys(&self, email: &str) -> Vec<KeyEntity> {
        let found = self.lookup_by_email(email, KeyRingKind::Public);
        if found.is_empty() {
            self.lookup_by_email(email, KeyRingKind::Secret)
        } else {
            found
        }
    }

    fn best_secret_key(&self, email: &str) -> Option<KeyEntity> {
        self.lookup_by_email(email, KeyRingKind::Secret)
            .into_iter()
            .next()
    }

    fn public_key_by_id(&self, hex_id: &str) -> Option<KeyEntity> {
        self.lookup_by_key_id(hex_id, KeyRingKind::Public)
            .or_else(|| self.lookup_by_key_id(hex_id, KeyRingKind::Secret))
    }

    fn secret_key_by_id(&self, hex_id: &str) -> Option<KeyEntity> {
        self.lookup_by_key_id(hex_id, KeyRingKind::Secret)
    }
}

/// Normalize a caller-supplied key id: exactly 16 hex characters,
/// lowercased. Anything else is rejected before it reaches a lookup.
pub fn decode_key_id(hex_id: &str) -> Result<String> {
    if hex_id.len() == 16 && hex_id.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hex_id.to_ascii_lowercase())
    } else {
        Err(MailsealError::InvalidKeyId {
            key_id: hex_id.to_string(),
        })
    }
}

fn read_keyring(path: &Path) -> Result<Vec<KeyEntity>> {
    let bytes = std::fs::read(path).map_err(|e| MailsealError::KeyringLoad {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let mut entities = Vec::new();
    for item in from_bytes_many(Cursor::new(bytes)) {
        let key = item.map_err(|e| MailsealError::KeyringLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        match key {
            PublicOrSecret::Public(pk) => entities.push(KeyEntity::from_public(pk)),
            PublicOrSecret::Secret(sk) => entities.push(KeyEntity::from_secret(sk)),
        }
    }
    Ok(entities)
}

/// RSA-2048 primary (certify+sign) with an RSA-2048 encryption subkey.
/// Fresh keys carry no passphrase protection.
fn generate_key_pair(name: &str, comment: &str, email: &str) -> Result<SignedSecretKey> {
    let user_id = if comment.is_empty() {
        format!("{name} <{email}>")
    } else {
        format!("{name} ({comment}) <{email}>")
    };

    let mut rng = rand::thread_rng();
    let params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::Rsa(2048))
        .can_certify(true)
        .can_sign(true)
        .primary_user_id(user_id)
        .passphrase(None)
        .subkey(
            SubkeyParamsBuilder::default()
                .key_type(KeyType::Rsa(2048))
                .can_encrypt(true)
                .passphrase(None)
                .build()
                .map_err(|e| MailsealError::KeyGeneration {
                    detail: e.to_string(),
                })?,
        )
        .build()
        .map_err(|e| MailsealError::KeyGeneration {
            detail: e.to_string(),
        })?;

    let secret_key = params
        .generate(&mut rng)
        .map_err(|e| MailsealError::KeyGeneration {
            detail: e.to_string(),
        })?;
    secret_key
        .sign(&mut rng, String::new)
        .map_err(|e| MailsealError::KeyGeneration {
            detail: e.to_string(),
        })
}
