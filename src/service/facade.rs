use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::adapters::keyring::directory::{decode_key_id, KeyDirectory};
use crate::adapters::pgp::rpgp_backend::RpgpMailCrypto;
use crate::core::errors::{MailsealError, Result};
use crate::core::models::entity::KeyRingKind;
use crate::core::services::incoming::process_incoming;
use crate::core::services::outgoing::process_outgoing;
use crate::service::keyinfo::KeyInfo;
use crate::service::{
    GenerateParams, IncomingParams, KeyInfoParams, OutgoingParams, Request, Response,
    UnlockParams,
};

/// Bumped when the request or response shapes change incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Request dispatcher tying the key directory and the mail pipelines
/// to the wire protocol.
pub struct Facade {
    directory: Arc<KeyDirectory>,
    crypto: RpgpMailCrypto<Arc<KeyDirectory>>,
}

impl Facade {
    pub fn new(directory: Arc<KeyDirectory>) -> Self {
        let crypto = RpgpMailCrypto::new(Arc::clone(&directory));
        Self { directory, crypto }
    }

    /// Run one request to completion. A panic in a handler is contained
    /// here and surfaces as an error response for that request only.
    pub fn dispatch(&self, req: Request) -> Response {
        let id = req.id;
        let method = req.method.clone();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.route(req)));
        match outcome {
            Ok(Ok(result)) => Response::ok(id, result),
            Ok(Err(e)) => {
                tracing::warn!(method = %method, error = %e, "request failed");
                Response::err(id, e.to_string())
            }
            Err(panic) => {
                let detail = panic_detail(&panic);
                tracing::error!(method = %method, detail = %detail, "handler panicked");
                let fault = MailsealError::Internal {
                    operation: method,
                    detail,
                };
                Response::err(id, fault.to_string())
            }
        }
    }

    fn route(&self, req: Request) -> Result<Value> {
        match req.method.as_str() {
            "Version" => Ok(json!({ "version": PROTOCOL_VERSION })),
            "GetKeyInfo" => {
                let params: KeyInfoParams = parse_params(req.params)?;
                self.get_key_info(&params)
            }
            "UnlockPrivateKey" => {
                let params: UnlockParams = parse_params(req.params)?;
                let unlocked = self
                    .directory
                    .unlock_by_key_id(&params.key_id, &params.passphrase)?;
                Ok(json!({ "unlocked": unlocked }))
            }
            "GenerateKeys" => {
                let params: GenerateParams = parse_params(req.params)?;
                let entity = self.directory.generate(
                    &params.real_name,
                    params.comment.as_deref().unwrap_or(""),
                    &params.email,
                )?;
                let info = KeyInfo::from_entity(&entity)?;
                Ok(serde_json::to_value(info)?)
            }
            "ProcessIncoming" => {
                let params: IncomingParams = parse_params(req.params)?;
                let report = process_incoming(
                    &self.crypto,
                    &params.email_body,
                    supplied_passphrase(&params.passphrase),
                )?;
                Ok(serde_json::to_value(report)?)
            }
            "ProcessOutgoing" => {
                let params: OutgoingParams = parse_params(req.params)?;
                let report = process_outgoing(
                    &self.crypto,
                    &params.email_body,
                    params.sign,
                    params.encrypt,
                    supplied_passphrase(&params.passphrase),
                )?;
                Ok(serde_json::to_value(report)?)
            }
            other => Err(MailsealError::Protocol {
                detail: format!("unknown method: {other}"),
            }),
        }
    }

    /// Key lookup by id or address. A secret-ring match wins over a
    /// public-ring one so callers see unlock state and private material.
    fn get_key_info(&self, params: &KeyInfoParams) -> Result<Value> {
        let entity = if let Some(raw_id) = params.key_id.as_deref().filter(|s| !s.is_empty()) {
            let hex_id = decode_key_id(raw_id)?;
            self.directory
                .lookup_by_key_id(&hex_id, KeyRingKind::Secret)
                .or_else(|| self.directory.lookup_by_key_id(&hex_id, KeyRingKind::Public))
        } else if let Some(addr) = params.address.as_deref().filter(|s| !s.is_empty()) {
            self.directory
                .lookup_by_email(addr, KeyRingKind::Secret)
                .into_iter()
                .next()
                .or_else(|| {
                    self.directory
                        .lookup_by_email(addr, KeyRingKind::Public)
                        .into_iter()
                        .next()
                })
        } else {
            None
        };
        let info = match entity {
            Some(e) => KeyInfo::from_entity(&e)?,
            None => KeyInfo::absent(),
        };
        Ok(serde_json::to_value(info)?)
    }
}

/// An empty passphrase string means no passphrase was supplied.
fn supplied_passphrase(passphrase: &Option<String>) -> Option<&str> {
    passphrase.as_deref().filter(|s| !s.is_empty())
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| MailsealError::Protocol {
        detail: format!("bad params: {e}"),
    })
}

fn panic_detail(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
