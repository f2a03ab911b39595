use pgp::types::{PublicKeyTrait, PublicParams};

use crate::core::models::entity::KeyEntity;

/// gpg-style one-screen summary of a key: `pub   2048R/1A2B3C4D`
/// followed by one `uid` line per declared identity.
pub fn render_entity(entity: &KeyEntity) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "pub   {}/{}",
        key_tag(entity.public().primary_key.public_params()),
        short_id(&entity.key_id_hex())
    ));
    for uid in entity.user_id_strings() {
        lines.push(format!("uid     {uid}"));
    }
    lines.join("\n")
}

/// Algorithm tag in the classic `<bits><letter>` form.
fn key_tag(params: &PublicParams) -> String {
    match params {
        PublicParams::RSA { n, .. } => format!("{}R", n.as_bytes().len() * 8),
        PublicParams::DSA { p, .. } => format!("{}D", p.as_bytes().len() * 8),
        _ => "??".to_string(),
    }
}

/// Lower 32 bits of the key id, upper-cased, as gpg prints it.
fn short_id(hex_id: &str) -> String {
    let tail = if hex_id.len() >= 8 {
        &hex_id[hex_id.len() - 8..]
    } else {
        hex_id
    };
    tail.to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_takes_low_bits() {
        assert_eq!(short_id("aabbccdd00112233"), "00112233");
    }

    #[test]
    fn short_id_handles_short_input() {
        assert_eq!(short_id("abcd"), "ABCD");
    }
}
