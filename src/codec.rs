//! Message body codecs.
//!
//! A codec turns the text of a chat message into zero or more records,
//! which the pipeline then decorates with fields taken from the IRC line.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::record::Record;

/// Field holding the body for codecs that do not restructure it.
pub const MESSAGE_FIELD: &str = "message";

/// Field set when a body claimed to be JSON could not be parsed.
pub const JSON_PARSE_FAILURE_FIELD: &str = "_jsonparsefailure";

/// Decodes a message body into records.
pub trait Codec: Send + Sync {
    fn decode(&self, body: &str) -> Vec<Record>;
}

/// The body, unchanged, under `message`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainCodec;

impl Codec for PlainCodec {
    fn decode(&self, body: &str) -> Vec<Record> {
        vec![Record::new().with(MESSAGE_FIELD, body)]
    }
}

/// The body parsed as a JSON object, or an array of objects.
///
/// Anything else yields the raw body flagged with `_jsonparsefailure`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn failure(body: &str) -> Vec<Record> {
        vec![Record::new()
            .with(MESSAGE_FIELD, body)
            .with(JSON_PARSE_FAILURE_FIELD, true)]
    }
}

impl Codec for JsonCodec {
    fn decode(&self, body: &str) -> Vec<Record> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => vec![Record::from(map)],
            Ok(Value::Array(items)) => {
                let objects: Option<Vec<Map<String, Value>>> = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                match objects {
                    Some(objects) => objects.into_iter().map(Record::from).collect(),
                    None => Self::failure(body),
                }
            }
            Ok(_) => Self::failure(body),
            Err(e) => {
                debug!(error = %e, "message body is not JSON");
                Self::failure(body)
            }
        }
    }
}

/// Codec selection in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Plain,
    Json,
}

impl CodecKind {
    pub fn build(self) -> Box<dyn Codec> {
        match self {
            Self::Plain => Box::new(PlainCodec),
            Self::Json => Box::new(JsonCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain() {
        let records = PlainCodec.decode("hello world");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("message"), Some("hello world"));
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn test_plain_empty_body() {
        let records = PlainCodec.decode("");
        assert_eq!(records[0].get_str("message"), Some(""));
    }

    #[test]
    fn test_json_object() {
        let records = JsonCodec.decode(r#"{"level":"info","n":2}"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("level"), Some("info"));
        assert_eq!(records[0].get("n"), Some(&Value::from(2)));
    }

    #[test]
    fn test_json_array() {
        let records = JsonCodec.decode(r#"[{"a":1},{"b":2}]"#);
        assert_eq!(records.len(), 2);
        assert!(records[0].contains_key("a"));
        assert!(records[1].contains_key("b"));
    }

    #[test]
    fn test_json_failure() {
        for body in ["not json", "42", r#"[{"a":1},3]"#] {
            let records = JsonCodec.decode(body);
            assert_eq!(records.len(), 1, "{body}");
            assert_eq!(records[0].get_str("message"), Some(body));
            assert_eq!(records[0].get(JSON_PARSE_FAILURE_FIELD), Some(&Value::Bool(true)));
        }
    }

    #[test]
    fn test_kind_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            codec: CodecKind,
        }
        let w: Wrapper = toml::from_str(r#"codec = "json""#).unwrap();
        assert_eq!(w.codec, CodecKind::Json);
        assert_eq!(CodecKind::default(), CodecKind::Plain);
    }
}
