pub mod keyring;
pub mod pgp;
