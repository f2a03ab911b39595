pub mod key_source;
pub mod mail_crypto;
