//! IRCv3 message tag decoding.
//!
//! Turns the raw tag segment of a line (the part after `@`) into a
//! [`TagMap`]. Decoding is total: malformed input degrades to best-effort
//! string splitting and never fails.
//!
//! Key rules:
//! - keys are lowercased and `-` becomes `_` (`display-name` -> `display_name`)
//! - a value containing `,` becomes a [`TagValue::List`]
//! - a bare tag (`flag`, or `flag=`) takes its own raw name as its value
//! - `vendor/key=value` is stored as `{vendor: {key: value}}`, and a later
//!   tag with the same vendor replaces the earlier one

use std::collections::BTreeMap;

use serde::Serialize;

/// Decoded tags of one message, keyed by normalized tag name.
pub type TagMap = BTreeMap<String, TagValue>;

/// The value of a decoded tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    /// A plain string value.
    Scalar(String),
    /// A comma-separated value, split in order.
    List(Vec<String>),
    /// A vendor-namespaced tag: a single-entry map of key to value.
    Vendor(TagMap),
}

impl TagValue {
    /// Returns the value if it is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Scalar(s.to_owned())
    }
}

/// Decode a raw tag segment into a [`TagMap`].
///
/// `None` (no `@` segment on the line) yields an empty map.
///
/// ```
/// use slirc_ingest::message::tags::{decode, TagValue};
///
/// let tags = decode(Some("display-name=Nick;badges=vip/1,sub/12"));
/// assert_eq!(tags["display_name"], TagValue::from("Nick"));
/// assert_eq!(
///     tags["badges"],
///     TagValue::List(vec!["vip/1".into(), "sub/12".into()])
/// );
/// ```
pub fn decode(raw: Option<&str>) -> TagMap {
    let mut tags = TagMap::new();
    let Some(raw) = raw else {
        return tags;
    };

    for token in raw.split(';').filter(|t| !t.is_empty()) {
        let (name, value) = match token.split_once('=') {
            Some((name, value)) if !value.is_empty() => (name, Some(value)),
            Some((name, _)) => (name, None),
            None => (token, None),
        };

        // Bare tags carry their own name rather than an implicit `true`.
        let value = match value {
            Some(v) if v.contains(',') => TagValue::List(split_list(v)),
            Some(v) => TagValue::Scalar(unescape_tag_value(v)),
            None => TagValue::Scalar(name.to_owned()),
        };

        match name.split_once('/') {
            Some((vendor, key)) => {
                let mut nested = TagMap::new();
                nested.insert(to_key(key), value);
                tags.insert(to_key(vendor), TagValue::Vendor(nested));
            }
            None => {
                tags.insert(to_key(name), value);
            }
        }
    }

    tags
}

/// Normalize a tag name into a map key: Unicode lowercase, `-` as `_`.
pub fn to_key(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

fn split_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = value.split(',').map(unescape_tag_value).collect();
    while items.last().is_some_and(|s| s.is_empty()) {
        items.pop();
    }
    items
}

/// Unescape a tag value from wire format.
///
/// Reverses the IRCv3 escaping of `;`, space, `\`, CR and LF.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(s: &str) -> TagValue {
        TagValue::Scalar(s.to_string())
    }

    #[test]
    fn test_decode_absent() {
        assert!(decode(None).is_empty());
        assert!(decode(Some("")).is_empty());
    }

    #[test]
    fn test_decode_mixed() {
        let tags = decode(Some("a=1;b=2,3;vendor/c=x"));

        let mut vendor = TagMap::new();
        vendor.insert("c".to_string(), scalar("x"));

        let mut expected = TagMap::new();
        expected.insert("a".to_string(), scalar("1"));
        expected.insert(
            "b".to_string(),
            TagValue::List(vec!["2".to_string(), "3".to_string()]),
        );
        expected.insert("vendor".to_string(), TagValue::Vendor(vendor));

        assert_eq!(tags, expected);
    }

    #[test]
    fn test_non_ascii_keys_are_lowercased() {
        let tags = decode(Some("ÉCOLE=1;Straße-Nummer=2;VENDØR/KEY=3"));
        assert_eq!(tags["école"], scalar("1"));
        assert_eq!(tags["straße_nummer"], scalar("2"));

        let mut vendor = TagMap::new();
        vendor.insert("key".to_string(), scalar("3"));
        assert_eq!(tags["vendør"], TagValue::Vendor(vendor));
    }

    #[test]
    fn test_bare_tag_takes_its_name() {
        let tags = decode(Some("flag"));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["flag"], scalar("flag"));
    }

    #[test]
    fn test_empty_value_is_bare() {
        let tags = decode(Some("emote-only="));
        assert_eq!(tags["emote_only"], scalar("emote-only"));
    }

    #[test]
    fn test_key_normalization() {
        let tags = decode(Some("Display-Name=Foo;TMI-Sent-TS=1"));
        assert_eq!(tags["display_name"], scalar("Foo"));
        assert_eq!(tags["tmi_sent_ts"], scalar("1"));
    }

    #[test]
    fn test_value_splits_on_first_equals() {
        let tags = decode(Some("k=a=b"));
        assert_eq!(tags["k"], scalar("a=b"));
    }

    #[test]
    fn test_vendor_last_write_wins() {
        let tags = decode(Some("example.com/one=1;example.com/two=2"));
        let mut vendor = TagMap::new();
        vendor.insert("two".to_string(), scalar("2"));
        assert_eq!(tags["example.com"], TagValue::Vendor(vendor));
    }

    #[test]
    fn test_bare_vendor_tag_keeps_full_name() {
        let tags = decode(Some("+draft/typing"));
        let mut vendor = TagMap::new();
        vendor.insert("typing".to_string(), scalar("+draft/typing"));
        assert_eq!(tags["+draft"], TagValue::Vendor(vendor));
    }

    #[test]
    fn test_empty_tokens_skipped() {
        let tags = decode(Some(";;a=1;"));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags["a"], scalar("1"));
    }

    #[test]
    fn test_list_trailing_empty_dropped() {
        let tags = decode(Some("badges=a,b,"));
        assert_eq!(
            tags["badges"],
            TagValue::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_scalar_values_unescaped() {
        let tags = decode(Some("system-msg=hello\\sworld\\:"));
        assert_eq!(tags["system_msg"], scalar("hello world;"));
    }

    #[test]
    fn test_unescape_combined() {
        let input = "a\\:b\\sc\\\\d\\re\\nf";
        let expected = "a;b c\\d\re\nf";
        assert_eq!(unescape_tag_value(input), expected);
    }

    #[test]
    fn test_unescape_trailing_backslash() {
        assert_eq!(unescape_tag_value("test\\"), "test");
    }

    #[test]
    fn test_unescape_unknown_escape() {
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
    }

    #[test]
    fn test_serialize_untagged() {
        let tags = decode(Some("a=1;b=2,3;vendor/c=x"));
        let json = serde_json::to_value(&tags).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"a": "1", "b": ["2", "3"], "vendor": {"c": "x"}})
        );
    }
}
