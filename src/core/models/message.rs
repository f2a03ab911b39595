use crate::core::errors::{MailsealError, Result};

/// One message header, name and value as parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A parsed email: ordered header list plus body text.
///
/// Never mutated in place by the pipelines; processing produces a
/// rewritten copy and the caller decides whether to adopt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    headers: Vec<Header>,
    body: String,
}

impl MailMessage {
    /// Parse raw message text: headers up to the first blank line,
    /// continuation lines folded into the previous header, everything
    /// after the blank line is the body.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut headers: Vec<Header> = Vec::new();
        let mut lines = raw.split_inclusive('\n');
        let mut consumed = 0usize;

        for line in &mut lines {
            let len = line.len();
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                consumed += len;
                break;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                match headers.last_mut() {
                    Some(h) => {
                        h.value.push(' ');
                        h.value.push_str(trimmed.trim_start());
                    }
                    None => {
                        return Err(MailsealError::MalformedMessage {
                            detail: "continuation line before any header".into(),
                        })
                    }
                }
            } else {
                let (name, value) =
                    trimmed
                        .split_once(':')
                        .ok_or_else(|| MailsealError::MalformedMessage {
                            detail: format!("header line without colon: {trimmed:?}"),
                        })?;
                headers.push(Header {
                    name: name.trim().to_string(),
                    value: value.trim().to_string(),
                });
            }
            consumed += len;
        }

        Ok(Self {
            headers,
            body: raw[consumed..].to_string(),
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// First header with this name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Copy of this message with a different body.
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            headers: self.headers.clone(),
            body: body.into(),
        }
    }

    /// Copy with `name` set to `value`, replacing any existing instance.
    pub fn with_header(&self, name: &str, value: &str) -> Self {
        let mut headers: Vec<Header> = self
            .headers
            .iter()
            .filter(|h| !h.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect();
        headers.push(Header {
            name: name.to_string(),
            value: value.to_string(),
        });
        Self {
            headers,
            body: self.body.clone(),
        }
    }

    /// Copy without any instance of `name`.
    pub fn without_header(&self, name: &str) -> Self {
        Self {
            headers: self
                .headers
                .iter()
                .filter(|h| !h.name.eq_ignore_ascii_case(name))
                .cloned()
                .collect(),
            body: self.body.clone(),
        }
    }

    /// Serialize back to raw message text.
    pub fn to_raw(&self) -> String {
        let mut out = String::new();
        for h in &self.headers {
            out.push_str(&h.name);
            out.push_str(": ");
            out.push_str(&h.value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    /// Sender address from the From header.
    pub fn sender(&self) -> Option<String> {
        self.header("From").map(extract_address)
    }

    /// Recipient addresses from To and Cc, in header order.
    pub fn recipients(&self) -> Vec<String> {
        let mut out = Vec::new();
        for name in ["To", "Cc"] {
            if let Some(value) = self.header(name) {
                for part in value.split(',') {
                    let addr = extract_address(part);
                    if !addr.is_empty() {
                        out.push(addr);
                    }
                }
            }
        }
        out
    }

    /// The boundary parameter of the Content-Type header, if any.
    pub fn boundary(&self) -> Option<String> {
        let ct = self.header("Content-Type")?;
        for param in ct.split(';').skip(1) {
            let param = param.trim();
            if let Some(rest) = param
                .strip_prefix("boundary=")
                .or_else(|| param.strip_prefix("BOUNDARY="))
            {
                return Some(rest.trim_matches('"').to_string());
            }
        }
        None
    }

    /// Split a multipart body on its boundary. Returns the raw part
    /// texts between delimiters, preamble and epilogue excluded.
    pub fn multipart_parts(&self) -> Vec<String> {
        let Some(boundary) = self.boundary() else {
            return Vec::new();
        };
        let delim = format!("--{boundary}");
        let mut parts = Vec::new();
        let mut current: Option<String> = None;
        for line in self.body.lines() {
            if line == delim || line == format!("{delim}--") {
                if let Some(part) = current.take() {
                    parts.push(part.trim_end_matches('\n').to_string());
                }
                if line.ends_with("--") {
                    break;
                }
                current = Some(String::new());
            } else if let Some(part) = current.as_mut() {
                part.push_str(line);
                part.push('\n');
            }
        }
        parts
    }
}

/// Pull the address out of `Display Name <addr>`, or trim a bare one.
fn extract_address(field: &str) -> String {
    let field = field.trim();
    if let (Some(open), Some(close)) = (field.rfind('<'), field.rfind('>')) {
        if open < close {
            return field[open + 1..close].trim().to_string();
        }
    }
    field.to_string()
}

/// Assemble an RFC 3156 multipart/encrypted body from an armored
/// PGP message.
pub fn multipart_encrypted_body(boundary: &str, armored: &str) -> String {
    format!(
        "--{boundary}\n\
         Content-Type: application/pgp-encrypted\n\
         \n\
         Version: 1\n\
         --{boundary}\n\
         Content-Type: application/octet-stream\n\
         \n\
         {armored}\n\
         --{boundary}--\n"
    )
}
