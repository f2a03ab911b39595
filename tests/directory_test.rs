use std::fs;
use std::sync::Arc;

use pgp::composed::{
    Deserializable, KeyType, SecretKeyParamsBuilder, SignedPublicKey, SubkeyParamsBuilder,
};
use pgp::ser::Serialize as PgpSerialize;
use tempfile::tempdir;

use mailseal::adapters::keyring::directory::KeyDirectory;
use mailseal::config::AgentPaths;
use mailseal::core::models::entity::{KeyEntity, KeyRingKind};
use mailseal::core::traits::key_source::KeySource;

fn open_directory(dir: &std::path::Path) -> (AgentPaths, Arc<KeyDirectory>) {
    let paths = AgentPaths::resolve(Some(dir)).unwrap();
    paths.ensure().unwrap();
    let directory = Arc::new(KeyDirectory::new(&paths));
    directory.load().unwrap();
    (paths, directory)
}

/// A transferable key pair whose secret half is passphrase protected.
fn protected_key(email: &str, passphrase: &str) -> pgp::composed::SignedSecretKey {
    let mut rng = rand::thread_rng();
    let params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::Rsa(2048))
        .can_certify(true)
        .can_sign(true)
        .primary_user_id(format!("Locked <{email}>"))
        .passphrase(Some(passphrase.to_string()))
        .subkey(
            SubkeyParamsBuilder::default()
                .key_type(KeyType::Rsa(2048))
                .can_encrypt(true)
                .passphrase(Some(passphrase.to_string()))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let pw = passphrase.to_string();
    params.generate(&mut rng).unwrap().sign(&mut rng, || pw).unwrap()
}

#[test]
fn generate_then_lookup_by_email_and_id() {
    let dir = tempdir().unwrap();
    let (_, directory) = open_directory(dir.path());

    let entity = directory
        .generate("Alice", "test", "alice@example.com")
        .unwrap();
    let key_id = entity.key_id_hex();

    let found = directory
        .lookup_by_email("alice@example.com", KeyRingKind::Secret)
        .into_iter()
        .next()
        .expect("generated key visible without a reload");
    assert_eq!(found.key_id_hex(), key_id);
    assert!(!found.is_locked());

    let by_id = directory
        .public_key_by_id(&key_id)
        .expect("public half resolvable by id");
    assert_eq!(by_id.fingerprint_hex(), entity.fingerprint_hex());
}

#[test]
fn generated_keys_survive_a_reload() {
    let dir = tempdir().unwrap();
    let (paths, directory) = open_directory(dir.path());
    let entity = directory
        .generate("Bob", "", "bob@example.com")
        .unwrap();

    let reopened = KeyDirectory::new(&paths);
    reopened.load().unwrap();
    let found = reopened
        .lookup_by_key_id(&entity.key_id_hex(), KeyRingKind::Secret)
        .expect("key persisted to the secret keyring");
    assert_eq!(
        found.user_id_strings(),
        vec!["Bob <bob@example.com>".to_string()]
    );
}

#[test]
fn unlock_wrong_then_right_passphrase() {
    let dir = tempdir().unwrap();
    let paths = AgentPaths::resolve(Some(dir.path())).unwrap();
    paths.ensure().unwrap();

    let secret = protected_key("locked@example.com", "letmein");
    let public = SignedPublicKey::from(secret.clone());
    fs::write(&paths.secret_keyring, secret.to_bytes().unwrap()).unwrap();
    fs::write(&paths.public_keyring, public.to_bytes().unwrap()).unwrap();

    let directory = KeyDirectory::new(&paths);
    directory.load().unwrap();

    let entity = directory
        .lookup_by_email("locked@example.com", KeyRingKind::Secret)
        .into_iter()
        .next()
        .unwrap();
    let key_id = entity.key_id_hex();
    assert!(entity.is_locked());

    assert!(!directory.unlock_by_key_id(&key_id, "wrong").unwrap());
    assert!(directory.unlock_by_key_id(&key_id, "letmein").unwrap());

    let unlocked = directory
        .lookup_by_key_id(&key_id, KeyRingKind::Secret)
        .unwrap();
    assert!(!unlocked.is_locked());
}

#[test]
fn unlock_unknown_key_id_is_an_error() {
    let dir = tempdir().unwrap();
    let (_, directory) = open_directory(dir.path());
    assert!(directory
        .unlock_by_key_id("00112233aabbccdd", "pw")
        .is_err());
}

#[test]
fn unlock_rejects_malformed_key_ids() {
    let dir = tempdir().unwrap();
    let (_, directory) = open_directory(dir.path());
    for bad in ["", "xyz", "00112233aabbccd", "00112233aabbccddee", "0011g233aabbccdd"] {
        let err = directory.unlock_by_key_id(bad, "pw").unwrap_err();
        assert!(
            err.to_string().contains("expected 16 hex"),
            "{bad:?} should be rejected as malformed, got: {err}"
        );
    }
}

#[test]
fn armor_round_trips_through_add_public_key() {
    let dir = tempdir().unwrap();
    let (_, directory) = open_directory(dir.path());
    let entity = directory
        .generate("Carol", "", "carol@example.com")
        .unwrap();

    let armored = directory.armor(&entity, KeyRingKind::Public).unwrap();
    assert!(armored.contains("-----BEGIN PGP PUBLIC KEY BLOCK-----"));

    // A second directory imports the armored key as a correspondent's.
    let other = tempdir().unwrap();
    let (_, importer) = open_directory(other.path());
    let (public, _) = SignedPublicKey::from_string(&armored).unwrap();
    importer
        .add_public_key(&KeyEntity::from_public(public))
        .unwrap();

    let imported = importer
        .best_public_key("carol@example.com")
        .expect("imported key found by address");
    assert_eq!(imported.fingerprint_hex(), entity.fingerprint_hex());
    assert!(imported.secret().is_none());
}
