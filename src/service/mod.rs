pub mod facade;
pub mod keyinfo;
pub mod server;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request line on the pipe.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// One response line, carrying either a result or an error.
#[derive(Debug, Serialize)]
pub struct Response {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: u64, detail: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(detail.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct KeyInfoParams {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnlockParams {
    pub key_id: String,
    pub passphrase: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateParams {
    pub real_name: String,
    pub email: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingParams {
    pub email_body: String,
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutgoingParams {
    pub email_body: String,
    pub sign: bool,
    pub encrypt: bool,
    #[serde(default)]
    pub passphrase: Option<String>,
}
