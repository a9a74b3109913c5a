//! XML-RPC codec.
//!
//! Responses follow the layout of Python's `xmlrpclib.dumps`: one value
//! element per line, integers outside the 32-bit range as `<i8>`.

use super::RpcCodec;
use bytes::Bytes;
use serde_json::Value;
use sxd_document::parser;
use sxd_xpath::{evaluate_xpath, Value as XPathValue};

const XML_DECLARATION: &str = "<?xml version='1.0'?>\n";

pub struct XmlRpcCodec;

impl RpcCodec for XmlRpcCodec {
    fn content_type(&self) -> &'static str {
        "text/xml"
    }

    fn method_name(&self, body: &[u8]) -> Option<String> {
        let text = std::str::from_utf8(body).ok()?;
        let package = parser::parse(text).ok()?;
        let document = package.as_document();

        let name = match evaluate_xpath(&document, "/methodCall/methodName") {
            Ok(XPathValue::Nodeset(nodes)) => nodes.iter().next()?.string_value(),
            _ => return None,
        };
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    fn encode_result(&self, payload: &Value, _id: &Value) -> Bytes {
        let mut out = String::from(XML_DECLARATION);
        out.push_str("<methodResponse>\n<params>\n<param>\n");
        write_value(&mut out, payload);
        out.push_str("</param>\n</params>\n</methodResponse>\n");
        Bytes::from(out)
    }

    fn encode_fault(&self, code: i32, message: &str, _id: &Value) -> Bytes {
        let mut out = String::from(XML_DECLARATION);
        out.push_str("<methodResponse>\n<fault>\n<value><struct>\n");
        write_member(&mut out, "faultCode", &Value::from(code));
        write_member(&mut out, "faultString", &Value::from(message));
        out.push_str("</struct></value>\n</fault>\n</methodResponse>\n");
        Bytes::from(out)
    }
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("<value><nil/></value>\n"),
        Value::Bool(b) => {
            out.push_str("<value><boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean></value>\n");
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => {
                out.push_str(&format!("<value><int>{i}</int></value>\n"));
            }
            Some(i) => out.push_str(&format!("<value><i8>{i}</i8></value>\n")),
            None => {
                let f = n.as_f64().unwrap_or_default();
                out.push_str(&format!("<value><double>{f:?}</double></value>\n"));
            }
        },
        Value::String(s) => {
            out.push_str("<value><string>");
            out.push_str(&escape(s));
            out.push_str("</string></value>\n");
        }
        Value::Array(items) => {
            out.push_str("<value><array><data>\n");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array></value>\n");
        }
        Value::Object(members) => {
            out.push_str("<value><struct>\n");
            for (name, member) in members {
                write_member(out, name, member);
            }
            out.push_str("</struct></value>\n");
        }
    }
}

fn write_member(out: &mut String, name: &str, value: &Value) {
    out.push_str("<member>\n<name>");
    out.push_str(&escape(name));
    out.push_str("</name>\n");
    write_value(out, value);
    out.push_str("</member>\n");
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(payload: Value) -> String {
        String::from_utf8(XmlRpcCodec.encode_result(&payload, &json!(1)).to_vec()).unwrap()
    }

    #[test]
    fn test_method_name() {
        let body = b"<?xml version='1.0'?><methodCall><methodName>user.list</methodName><params></params></methodCall>";
        assert_eq!(XmlRpcCodec.method_name(body), Some("user.list".to_string()));
        assert_eq!(XmlRpcCodec.method_name(b"<methodCall></methodCall>"), None);
        assert_eq!(XmlRpcCodec.method_name(b"not xml"), None);
        assert_eq!(XmlRpcCodec.method_name(&[0xff, 0xfe]), None);
    }

    #[test]
    fn test_array_of_strings() {
        assert_eq!(
            encode(json!(["john", "tom"])),
            "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
             <value><array><data>\n\
             <value><string>john</string></value>\n\
             <value><string>tom</string></value>\n\
             </data></array></value>\n\
             </param>\n</params>\n</methodResponse>\n"
        );
    }

    #[test]
    fn test_scalars() {
        assert!(encode(json!(42)).contains("<value><int>42</int></value>\n"));
        assert!(encode(json!(true)).contains("<value><boolean>1</boolean></value>\n"));
        assert!(encode(json!(1.5)).contains("<value><double>1.5</double></value>\n"));
        assert!(encode(json!(2.0)).contains("<value><double>2.0</double></value>\n"));
        assert!(encode(json!(null)).contains("<value><nil/></value>\n"));
        assert!(encode(json!("a<b&c")).contains("<string>a&lt;b&amp;c</string>"));
        assert!(encode(json!(5_000_000_000_i64)).contains("<i8>5000000000</i8>"));
    }

    #[test]
    fn test_struct_members_keep_order() {
        let xml = encode(json!({"name": "john", "age": 3}));
        assert!(xml.contains(
            "<value><struct>\n\
             <member>\n<name>name</name>\n<value><string>john</string></value>\n</member>\n\
             <member>\n<name>age</name>\n<value><int>3</int></value>\n</member>\n\
             </struct></value>\n"
        ));
    }

    #[test]
    fn test_fault() {
        let xml = String::from_utf8(
            XmlRpcCodec
                .encode_fault(-32601, "method_not_found", &json!(1))
                .to_vec(),
        )
        .unwrap();
        assert_eq!(
            xml,
            "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n\
             <member>\n<name>faultCode</name>\n<value><int>-32601</int></value>\n</member>\n\
             <member>\n<name>faultString</name>\n<value><string>method_not_found</string></value>\n</member>\n\
             </struct></value>\n</fault>\n</methodResponse>\n"
        );
    }
}
