//! FastRPC binary codec (protocol version 2.0).
//!
//! Every value starts with a type byte: the high five bits carry the type,
//! the low three bits carry type-specific data, usually the number of length
//! octets minus one. Multi-byte quantities are little-endian and use the
//! fewest octets that hold the value.

use super::RpcCodec;
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

const MAGIC: [u8; 2] = [0xCA, 0x11];
const VERSION: [u8; 2] = [0x02, 0x00];

const BOOL: u8 = 0x10;
const DOUBLE: u8 = 0x18;
const STRING: u8 = 0x20;
const INT8P: u8 = 0x38;
const INT8N: u8 = 0x40;
const STRUCT: u8 = 0x50;
const ARRAY: u8 = 0x58;
const NULL: u8 = 0x60;
const METHOD_CALL: u8 = 0x68;
const METHOD_RESPONSE: u8 = 0x70;
const FAULT: u8 = 0x78;

const TYPE_MASK: u8 = 0xF8;

pub struct FastRpcCodec;

impl RpcCodec for FastRpcCodec {
    fn content_type(&self) -> &'static str {
        "application/x-frpc"
    }

    fn method_name(&self, body: &[u8]) -> Option<String> {
        let (magic, rest) = body.split_first_chunk::<2>()?;
        if *magic != MAGIC {
            return None;
        }
        let ([major, _minor], rest) = rest.split_first_chunk::<2>()?;
        if !(1..=3).contains(major) {
            return None;
        }

        let (&kind, rest) = rest.split_first()?;
        if kind & TYPE_MASK != METHOD_CALL {
            return None;
        }
        let (&len, rest) = rest.split_first()?;
        let name = rest.get(..usize::from(len))?;
        let name = std::str::from_utf8(name).ok()?;
        (!name.is_empty()).then(|| name.to_string())
    }

    fn encode_result(&self, payload: &Value, _id: &Value) -> Bytes {
        let mut out = header();
        out.put_u8(METHOD_RESPONSE);
        write_value(&mut out, payload);
        out.freeze()
    }

    fn encode_fault(&self, code: i32, message: &str, _id: &Value) -> Bytes {
        let mut out = header();
        out.put_u8(FAULT);
        write_int(&mut out, i64::from(code));
        write_string(&mut out, message);
        out.freeze()
    }
}

fn header() -> BytesMut {
    let mut out = BytesMut::with_capacity(64);
    out.put_slice(&MAGIC);
    out.put_slice(&VERSION);
    out
}

/// Number of octets needed for `value`, at least one.
fn octets(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn write_sized(out: &mut BytesMut, kind: u8, value: u64) {
    let len = octets(value);
    out.put_u8(kind | (len as u8 - 1));
    out.put_slice(&value.to_le_bytes()[..len]);
}

fn write_int(out: &mut BytesMut, value: i64) {
    if value >= 0 {
        write_sized(out, INT8P, value.unsigned_abs());
    } else {
        write_sized(out, INT8N, value.unsigned_abs());
    }
}

fn write_string(out: &mut BytesMut, value: &str) {
    write_sized(out, STRING, value.len() as u64);
    out.put_slice(value.as_bytes());
}

fn write_value(out: &mut BytesMut, value: &Value) {
    match value {
        Value::Null => out.put_u8(NULL),
        Value::Bool(b) => out.put_u8(BOOL | u8::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => write_int(out, i),
            (None, Some(u)) => write_sized(out, INT8P, u),
            (None, None) => {
                out.put_u8(DOUBLE);
                out.put_f64_le(n.as_f64().unwrap_or_default());
            }
        },
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            write_sized(out, ARRAY, items.len() as u64);
            for item in items {
                write_value(out, item);
            }
        }
        Value::Object(members) => {
            write_sized(out, STRUCT, members.len() as u64);
            for (name, member) in members {
                // Member names carry a one-byte length.
                let name = &name.as_bytes()[..name.len().min(255)];
                out.put_u8(name.len() as u8);
                out.put_slice(name);
                write_value(out, member);
            }
        }
    }
}
