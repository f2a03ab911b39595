use crate::core::models::message::MailMessage;

pub const MULTIPART_ENCRYPTED: &str = "multipart/encrypted";
pub const MULTIPART_SIGNED: &str = "multipart/signed";

pub const INLINE_ENCRYPTED_MARKER: &str = "-----BEGIN PGP MESSAGE-----";
pub const INLINE_SIGNED_MARKER: &str = "-----BEGIN PGP SIGNED MESSAGE-----";

/// The media type of the Content-Type header: case-folded, parameters
/// stripped. Empty string when the header is absent or unparsable.
pub fn content_type(msg: &MailMessage) -> String {
    let Some(value) = msg.header("Content-Type") else {
        return String::new();
    };
    let media = value.split(';').next().unwrap_or("").trim();
    if media.contains('/') {
        media.to_ascii_lowercase()
    } else {
        String::new()
    }
}

/// Body carries an inline armored PGP message.
pub fn is_inline_encrypted(msg: &MailMessage) -> bool {
    msg.body().contains(INLINE_ENCRYPTED_MARKER)
}

/// Body carries an inline cleartext-signed block.
pub fn is_inline_signed(msg: &MailMessage) -> bool {
    msg.body().contains(INLINE_SIGNED_MARKER)
}

/// Incoming gate: anything multipart-protected or inline-marked gets
/// processed; everything else passes through untouched.
pub fn needs_incoming_processing(msg: &MailMessage) -> bool {
    let ct = content_type(msg);
    ct == MULTIPART_ENCRYPTED
        || ct == MULTIPART_SIGNED
        || is_inline_encrypted(msg)
        || is_inline_signed(msg)
}
