use std::sync::Arc;

use crate::core::models::entity::KeyEntity;

/// Port for key lookups consumed by the mail crypto backend.
///
/// "Best" key selection is defined as the first match in load order;
/// callers needing a different tie-break ask for the full list.
pub trait KeySource: Send + Sync {
    fn best_public_key(&self, email: &str) -> Option<KeyEntity>;

    fn all_public_keys(&self, email: &str) -> Vec<KeyEntity>;

    fn best_secret_key(&self, email: &str) -> Option<KeyEntity>;

    fn public_key_by_id(&self, hex_id: &str) -> Option<KeyEntity>;

    fn secret_key_by_id(&self, hex_id: &str) -> Option<KeyEntity>;
}

impl<K: KeySource + ?Sized> KeySource for Arc<K> {
    fn best_public_key(&self, email: &str) -> Option<KeyEntity> {
        (**self).best_public_key(email)
    }

    fn all_public_keys(&self, email: &str) -> Vec<KeyEntity> {
        (**self).all_public_keys(email)
    }

    fn best_secret_key(&self, email: &str) -> Option<KeyEntity> {
        (**self).best_secret_key(email)
    }

    fn public_key_by_id(&self, hex_id: &str) -> Option<KeyEntity> {
        (**self).public_key_by_id(hex_id)
    }

    fn secret_key_by_id(&self, hex_id: &str) -> Option<KeyEntity> {
        (**self).secret_key_by_id(hex_id)
    }
}
