//! # XML-RPC Module
//!
//! The engine is a plain XML-RPC server, so this module only covers what travels
//! between the two: a small [`Value`] model, `methodCall` encoding, `methodResponse`
//! decoding and the `system.multicall` envelope used for batch submissions.
//!
//! Decoding goes through a tiny element tree built from `quick_xml` events. Responses
//! are a few hundred bytes, so there is no reason to stream.

use std::io::Cursor;

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::error::XmlRpcError;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Boolean(bool),
    String(String),
    Double(f64),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
    Nil,
}

impl Value {
    /// Looks up a struct member by name.
    pub fn member(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

/// A `<fault>` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl Fault {
    fn from_value(value: &Value) -> Result<Self, XmlRpcError> {
        let code = match value.member("faultCode") {
            Some(Value::Int(code)) => *code,
            _ => return Err(malformed("fault without integer faultCode")),
        };
        let message = match value.member("faultString") {
            Some(Value::String(message)) => message.clone(),
            _ => return Err(malformed("fault without faultString")),
        };
        Ok(Fault { code, message })
    }
}

/// A decoded `methodResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault(Fault),
}

/// One call inside a `system.multicall` batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
}

fn malformed(reason: impl Into<String>) -> XmlRpcError {
    XmlRpcError::Malformed(reason.into())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Encodes a `methodCall` document.
///
/// # Example
///
/// ```rust
/// use daedalus_shell::helper::xmlrpc::{encode_call, Value};
///
/// let xml = encode_call("calc", &[Value::from("Tet & Co")]).unwrap();
/// assert!(xml.contains("<methodName>calc</methodName>"));
/// assert!(xml.contains("<string>Tet &amp; Co</string>"));
/// ```
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, XmlRpcError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    start(&mut writer, "methodCall")?;
    text_element(&mut writer, "methodName", method)?;
    start(&mut writer, "params")?;
    for param in params {
        start(&mut writer, "param")?;
        write_value(&mut writer, param)?;
        end(&mut writer, "param")?;
    }
    end(&mut writer, "params")?;
    end(&mut writer, "methodCall")?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| XmlRpcError::InvalidUtf8(e.utf8_error()))
}

/// Encodes a `system.multicall` document wrapping every call.
pub fn encode_multicall(calls: &[Call]) -> Result<String, XmlRpcError> {
    let batch = calls
        .iter()
        .map(|call| {
            Value::Struct(vec![
                ("methodName".to_string(), Value::from(call.method.as_str())),
                ("params".to_string(), Value::Array(call.params.clone())),
            ])
        })
        .collect();
    encode_call("system.multicall", &[Value::Array(batch)])
}

fn start(writer: &mut XmlWriter, name: &str) -> Result<(), XmlRpcError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<(), XmlRpcError> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), XmlRpcError> {
    start(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

fn write_value(writer: &mut XmlWriter, value: &Value) -> Result<(), XmlRpcError> {
    start(writer, "value")?;
    match value {
        Value::Int(i) => text_element(writer, "int", &i.to_string())?,
        Value::Boolean(b) => text_element(writer, "boolean", if *b { "1" } else { "0" })?,
        Value::String(s) => text_element(writer, "string", s)?,
        Value::Double(d) => text_element(writer, "double", &d.to_string())?,
        Value::Nil => {
            writer.write_event(Event::Empty(BytesStart::new("nil")))?;
        }
        Value::Array(items) => {
            start(writer, "array")?;
            start(writer, "data")?;
            for item in items {
                write_value(writer, item)?;
            }
            end(writer, "data")?;
            end(writer, "array")?;
        }
        Value::Struct(members) => {
            start(writer, "struct")?;
            for (name, member) in members {
                start(writer, "member")?;
                text_element(writer, "name", name)?;
                write_value(writer, member)?;
                end(writer, "member")?;
            }
            end(writer, "struct")?;
        }
    }
    end(writer, "value")
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn named(name: &[u8]) -> Result<Self, XmlRpcError> {
        Ok(Node {
            name: std::str::from_utf8(name)?.to_string(),
            ..Default::default()
        })
    }

    fn child(&self, name: &str) -> Result<&Node, XmlRpcError> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| malformed(format!("<{}> has no <{}>", self.name, name)))
    }
}

fn parse_tree(xml: &str) -> Result<Node, XmlRpcError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Node::named(e.local_name().as_ref())?),
            Event::Empty(e) => {
                let node = Node::named(e.local_name().as_ref())?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(std::str::from_utf8(&e)?);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(std::str::from_utf8(&e)?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push(resolve_entity(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(malformed("unexpected end of document"));
    }
    root.ok_or_else(|| malformed("empty document"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), XmlRpcError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(malformed("more than one root element")),
    }
    Ok(())
}

fn resolve_entity(name: &[u8]) -> Result<char, XmlRpcError> {
    let name = std::str::from_utf8(name)?;
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
        }
    };
    resolved.ok_or_else(|| malformed(format!("unknown entity &{};", name)))
}

fn decode_value(node: &Node) -> Result<Value, XmlRpcError> {
    let typed = match node.children.as_slice() {
        [] => return Ok(Value::String(node.text.clone())),
        [typed] => typed,
        _ => return Err(malformed("<value> with more than one child")),
    };

    let text = typed.text.trim();
    let value = match typed.name.as_str() {
        "string" => Value::String(typed.text.clone()),
        "int" | "i4" => Value::Int(
            text.parse()
                .map_err(|_| malformed(format!("bad int {:?}", text)))?,
        ),
        "boolean" => match text {
            "1" => Value::Boolean(true),
            "0" => Value::Boolean(false),
            other => return Err(malformed(format!("bad boolean {:?}", other))),
        },
        "double" => Value::Double(
            text.parse()
                .map_err(|_| malformed(format!("bad double {:?}", text)))?,
        ),
        "nil" => Value::Nil,
        "array" => Value::Array(
            typed
                .child("data")?
                .children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<_, _>>()?,
        ),
        "struct" => {
            let mut members = Vec::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.child("name")?.text.clone();
                let value = decode_value(member.child("value")?)?;
                members.push((name, value));
            }
            Value::Struct(members)
        }
        other => return Err(malformed(format!("unsupported type <{}>", other))),
    };
    Ok(value)
}

/// Decodes a `methodResponse` document.
pub fn decode_response(xml: &str) -> Result<MethodResponse, XmlRpcError> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!("root is <{}>", root.name)));
    }

    if let Ok(fault) = root.child("fault") {
        let value = decode_value(fault.child("value")?)?;
        return Ok(MethodResponse::Fault(Fault::from_value(&value)?));
    }

    let value = root.child("params")?.child("param")?.child("value")?;
    Ok(MethodResponse::Success(decode_value(value)?))
}

/// Splits the result of a `system.multicall` into one outcome per call.
///
/// Each successful call comes back wrapped in a one-element array, each failed call
/// as a fault struct.
pub fn decode_multicall_results(value: Value) -> Result<Vec<MethodResponse>, XmlRpcError> {
    let Value::Array(items) = value else {
        return Err(malformed("multicall result is not an array"));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Array(mut wrapped) if wrapped.len() == 1 => {
                Ok(MethodResponse::Success(wrapped.remove(0)))
            }
            fault @ Value::Struct(_) => Ok(MethodResponse::Fault(Fault::from_value(&fault)?)),
            _ => Err(malformed("unexpected multicall entry")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calc_call_lists_params_in_order() {
        let xml = encode_call(
            "calc",
            &["Test", "Aform", "3", "tet.ply", "M13.txt"].map(Value::from),
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        let positions: Vec<usize> = ["Test", "Aform", "<string>3<", "tet.ply", "M13.txt"]
            .iter()
            .map(|needle| xml.find(needle).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xml.matches("<param>").count(), 5);
    }

    #[test]
    fn encoder_escapes_markup() {
        let xml = encode_call("calc", &[Value::from("<a> & \"b\"")]).unwrap();
        assert!(!xml.contains("<a>"));
        assert!(xml.contains("&lt;a&gt; &amp;"));
    }

    #[test]
    fn decodes_engine_success() {
        let xml = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
                   <value><string>Finished!</string></value>\n</param>\n</params>\n\
                   </methodResponse>\n";
        assert_eq!(
            decode_response(xml).unwrap(),
            MethodResponse::Success(Value::from("Finished!"))
        );
    }

    #[test]
    fn untyped_value_is_a_string() {
        let xml = "<methodResponse><params><param><value>plain</value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            MethodResponse::Success(Value::from("plain"))
        );
    }

    #[test]
    fn entities_are_resolved() {
        let xml = "<methodResponse><params><param><value><string>a &amp; b &#60;&#x3e;</string>\
                   </value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            MethodResponse::Success(Value::from("a & b <>"))
        );
    }

    #[test]
    fn decodes_fault() {
        let xml = "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n\
                   <member>\n<name>faultCode</name>\n<value><int>1</int></value>\n</member>\n\
                   <member>\n<name>faultString</name>\n<value><string>&lt;class 'IOError'&gt;:\
                   [Errno 2] No such file or directory: 'tet.ply'</string></value>\n</member>\n\
                   </struct></value>\n</fault>\n</methodResponse>\n";
        assert_eq!(
            decode_response(xml).unwrap(),
            MethodResponse::Fault(Fault {
                code: 1,
                message: "<class 'IOError'>:[Errno 2] No such file or directory: 'tet.ply'"
                    .into(),
            })
        );
    }

    #[test]
    fn decodes_nested_types() {
        let xml = "<methodResponse><params><param><value><array><data>\
                   <value><i4>-7</i4></value>\
                   <value><boolean>1</boolean></value>\
                   <value><double>10.5</double></value>\
                   <value><nil/></value>\
                   <value><struct><member><name>k</name><value>v</value></member></struct></value>\
                   </data></array></value></param></params></methodResponse>";
        assert_eq!(
            decode_response(xml).unwrap(),
            MethodResponse::Success(Value::Array(vec![
                Value::Int(-7),
                Value::Boolean(true),
                Value::Double(10.5),
                Value::Nil,
                Value::Struct(vec![("k".into(), Value::from("v"))]),
            ]))
        );
    }

    #[test]
    fn rejects_non_xmlrpc_bodies() {
        for body in [
            "",
            "<html><body>502 Bad Gateway</body></html>",
            "<methodResponse></methodResponse>",
            "<methodResponse><params><param><value><int>x</int></value></param></params></methodResponse>",
            "<methodResponse><params>",
        ] {
            assert!(decode_response(body).is_err(), "accepted {:?}", body);
        }
    }

    #[test]
    fn multicall_wraps_each_call() {
        let calls = vec![
            Call {
                method: "calc".into(),
                params: vec!["TestTet66".into(), "Aform".into()],
            },
            Call {
                method: "calc".into(),
                params: vec!["TestOct66".into(), "Aform".into()],
            },
        ];
        let xml = encode_multicall(&calls).unwrap();
        assert!(xml.contains("<methodName>system.multicall</methodName>"));
        assert_eq!(xml.matches("<name>methodName</name>").count(), 2);
        assert_eq!(xml.matches("<string>calc</string>").count(), 2);
    }

    #[test]
    fn multicall_results_split_success_and_fault() {
        let value = Value::Array(vec![
            Value::Array(vec![Value::from("Finished!")]),
            Value::Struct(vec![
                ("faultCode".into(), Value::Int(1)),
                ("faultString".into(), Value::from("boom")),
            ]),
        ]);
        assert_eq!(
            decode_multicall_results(value).unwrap(),
            vec![
                MethodResponse::Success(Value::from("Finished!")),
                MethodResponse::Fault(Fault {
                    code: 1,
                    message: "boom".into()
                }),
            ]
        );
    }
}
