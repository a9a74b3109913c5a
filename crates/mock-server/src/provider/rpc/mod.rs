//! RPC mock provider over pluggable wire codecs.
//!
//! # Module Structure
//!
//! - `xmlrpc` - XML-RPC (`text/xml`)
//! - `jsonrpc` - JSON-RPC 2.0 (`application/json`)
//! - `frpc` - FastRPC 2.0 binary (`application/x-frpc`)

mod frpc;
mod jsonrpc;
mod xmlrpc;

pub use frpc::FastRpcCodec;
pub use jsonrpc::JsonRpcCodec;
pub use xmlrpc::XmlRpcCodec;

use super::{Response, Served};
use crate::error::ResolveError;
use crate::store::{RpcStore, LIST_METHODS};
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Wire encoding of one RPC protocol.
pub trait RpcCodec: Send + Sync {
    /// `Content-Type` of encoded responses.
    fn content_type(&self) -> &'static str;

    /// Method name of a request body, if the body is a well-formed call.
    fn method_name(&self, body: &[u8]) -> Option<String>;

    /// Request id echoed in responses. Only JSON-RPC carries one.
    fn request_id(&self, _body: &[u8]) -> Value {
        Value::from(1)
    }

    fn encode_result(&self, payload: &Value, id: &Value) -> Bytes;

    fn encode_fault(&self, code: i32, message: &str, id: &Value) -> Bytes;
}

/// Supported RPC protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcProtocol {
    XmlRpc,
    JsonRpc,
    FastRpc,
}

static XML_RPC: XmlRpcCodec = XmlRpcCodec;
static JSON_RPC: JsonRpcCodec = JsonRpcCodec;
static FAST_RPC: FastRpcCodec = FastRpcCodec;

impl RpcProtocol {
    /// Pick the protocol from the exact request `Content-Type`. Disabled
    /// protocols and anything unrecognised fall back to XML-RPC.
    pub fn select(content_type: Option<&str>, jsonrpc: bool, fastrpc: bool) -> Self {
        match content_type {
            Some("application/json") if jsonrpc => RpcProtocol::JsonRpc,
            Some("application/x-frpc") if fastrpc => RpcProtocol::FastRpc,
            _ => RpcProtocol::XmlRpc,
        }
    }

    pub fn codec(&self) -> &'static dyn RpcCodec {
        match self {
            RpcProtocol::XmlRpc => &XML_RPC,
            RpcProtocol::JsonRpc => &JSON_RPC,
            RpcProtocol::FastRpc => &FAST_RPC,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcProtocol::XmlRpc => "xmlrpc",
            RpcProtocol::JsonRpc => "jsonrpc",
            RpcProtocol::FastRpc => "frpc",
        }
    }
}

impl fmt::Display for RpcProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serves stored RPC methods from `RPC2/`.
#[derive(Debug, Clone)]
pub struct RpcMockProvider {
    store: RpcStore,
}

impl RpcMockProvider {
    pub fn new(api_dir: &Path) -> Self {
        Self {
            store: RpcStore::new(api_dir),
        }
    }

    pub fn store(&self) -> &RpcStore {
        &self.store
    }

    /// Answer an RPC request body.
    pub fn serve(&self, protocol: RpcProtocol, body: &[u8]) -> Served {
        let codec = protocol.codec();
        let id = codec.request_id(body);

        let Some(method_name) = codec.method_name(body) else {
            debug!("Unparseable {} request", protocol);
            return Served::failed(
                fault_response(protocol, &ResolveError::MalformedRpcPayload, &id),
                ResolveError::MalformedRpcPayload,
            );
        };

        match self.payload(&method_name) {
            Some(payload) => {
                debug!("RPC hit for {} ({})", method_name, protocol);
                Served::ok(rpc_response(codec, codec.encode_result(&payload, &id)))
            }
            None => {
                debug!("RPC method {} not found ({})", method_name, protocol);
                Served::failed(
                    fault_response(protocol, &ResolveError::MethodNotFound, &id),
                    ResolveError::MethodNotFound,
                )
            }
        }
    }

    fn payload(&self, method_name: &str) -> Option<Value> {
        if method_name == LIST_METHODS {
            return Some(Value::from(self.store.available_methods()));
        }
        self.store.read(method_name)
    }
}

/// Encoded fault for `error` in the given protocol.
pub fn fault_response(protocol: RpcProtocol, error: &ResolveError, id: &Value) -> Response {
    let codec = protocol.codec();
    let (code, message) = error.fault();
    rpc_response(codec, codec.encode_fault(code, message, id))
}

fn rpc_response(codec: &dyn RpcCodec, content: Bytes) -> Response {
    Response::new(
        content,
        vec![("Content-Type".to_string(), codec.content_type().to_string())],
        200,
    )
}
