//! Output records.
//!
//! A [`Record`] is a flat JSON object. Two kinds are produced: one per
//! accepted chat message (the codec-decoded body plus fields derived from
//! the parsed line), and one per completed NAMES cycle.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::Codec;
use crate::message::ParsedMessage;
use crate::stats::ChannelStats;

/// Field holding the record's event time.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// One output event.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    /// The record as a single line of JSON.
    pub fn to_json_line(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Build the records for one chat message.
    ///
    /// Returns nothing unless the message has both a command and a user.
    /// The body passed to the codec is [`ParsedMessage::display_message`];
    /// each decoded record then gets the derived fields, which take
    /// precedence over same-named codec fields. `server` is the
    /// `host:port` of the connection.
    pub fn from_message(msg: &ParsedMessage, codec: &dyn Codec, server: &str) -> Vec<Record> {
        let (Some(command), Some(user)) = (msg.command.as_deref(), msg.user.as_ref()) else {
            return Vec::new();
        };

        let body = msg.display_message().unwrap_or_default();
        let timestamp = event_time(msg);
        let tags = serde_json::to_value(&msg.tags).unwrap_or_else(|_| Value::Object(Map::new()));

        codec
            .decode(body)
            .into_iter()
            .map(|mut record| {
                if let Some(prefix) = &msg.prefix {
                    record.insert("user", prefix.as_str());
                }
                record.insert("command", command);
                if let Some(channel) = &msg.channel {
                    record.insert("channel", channel.as_str());
                }
                record.insert("nick", user.nick.as_str());
                record.insert("host", user.host.as_str());
                record.insert("server", server);
                record.insert("tags", tags.clone());

                if let Some(id) = msg.tag("user_id") {
                    record.insert("user_id", id);
                }
                if let Some(ts) = msg.tag("tmi_sent_ts") {
                    record.insert("tmi_sent_ts", leading_integer(ts));
                }
                if let Some(id) = msg.tag("room_id") {
                    record.insert("room_id", id);
                }
                if let Some(id) = msg.tag("id") {
                    record.insert("id", id);
                }

                record.insert(TIMESTAMP_FIELD, timestamp.clone());
                record
            })
            .collect()
    }

    /// Build the record for a completed NAMES cycle.
    pub fn from_stats(stats: ChannelStats) -> Record {
        Record::new()
            .with("channel", stats.channel)
            .with("users", stats.users)
            .with("server", stats.server)
            .with(TIMESTAMP_FIELD, format_time(Utc::now()))
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// When the message was sent: the `time` tag, else `tmi_sent_ts`, else now.
fn event_time(msg: &ParsedMessage) -> String {
    let tagged = msg
        .tag("time")
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            msg.tag("tmi_sent_ts")
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(DateTime::from_timestamp_millis)
        });

    format_time(tagged.unwrap_or_else(Utc::now))
}

/// Integer value of the leading digits of `s` (with an optional sign), or 0.
///
/// `"1700000000000abc"` reads as `1700000000000`; `"soon"` as `0`.
fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JsonCodec, PlainCodec};
    use crate::isupport::{Network, ParseContext};

    fn msg(raw: &str) -> ParsedMessage {
        raw.parse().unwrap()
    }

    #[test]
    fn test_message_record_fields() {
        let raw = "@user-id=42;room-id=7;id=abc;tmi-sent-ts=1700000000000 \
                   :nick!user@host PRIVMSG #chan :hello";
        let records = Record::from_message(&msg(raw), &PlainCodec, "irc.example.com:6667");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.get_str("message"), Some("hello"));
        assert_eq!(record.get_str("user"), Some("nick!user@host"));
        assert_eq!(record.get_str("command"), Some("PRIVMSG"));
        assert_eq!(record.get_str("channel"), Some("#chan"));
        assert_eq!(record.get_str("nick"), Some("nick"));
        assert_eq!(record.get_str("host"), Some("host"));
        assert_eq!(record.get_str("server"), Some("irc.example.com:6667"));
        assert_eq!(record.get_str("user_id"), Some("42"));
        assert_eq!(record.get_str("room_id"), Some("7"));
        assert_eq!(record.get_str("id"), Some("abc"));
        assert_eq!(record.get("tmi_sent_ts"), Some(&Value::from(1_700_000_000_000_i64)));
        assert_eq!(
            record.get("tags").and_then(|t| t.get("user_id")),
            Some(&Value::from("42"))
        );
        assert_eq!(record.get_str(TIMESTAMP_FIELD), Some("2023-11-14T22:13:20.000Z"));
    }

    #[test]
    fn test_time_tag_wins() {
        let raw = "@time=2024-01-02T03:04:05.678Z;tmi-sent-ts=1700000000000 :n!u@h PRIVMSG #c :x";
        let records = Record::from_message(&msg(raw), &PlainCodec, "s:1");
        assert_eq!(records[0].get_str(TIMESTAMP_FIELD), Some("2024-01-02T03:04:05.678Z"));
    }

    #[test]
    fn test_requires_command_and_user() {
        let server_notice = msg(":irc.example.com NOTICE * :hi");
        assert!(Record::from_message(&server_notice, &PlainCodec, "s:1").is_empty());
        assert!(Record::from_message(&msg(""), &PlainCodec, "s:1").is_empty());
    }

    #[test]
    fn test_action_body_is_display_text() {
        let records = Record::from_message(
            &msg(":n!u@h PRIVMSG #c :\x01ACTION waves\x01"),
            &PlainCodec,
            "s:1",
        );
        assert_eq!(records[0].get_str("message"), Some("waves"));
    }

    #[test]
    fn test_derived_fields_override_codec() {
        let records = Record::from_message(
            &msg(r#":n!u@h PRIVMSG #c :{"nick":"spoofed","level":3}"#),
            &JsonCodec,
            "s:1",
        );
        assert_eq!(records[0].get_str("nick"), Some("n"));
        assert_eq!(records[0].get("level"), Some(&Value::from(3)));
    }

    #[test]
    fn test_private_message_has_no_channel() {
        let records = Record::from_message(&msg(":n!u@h PRIVMSG me :psst"), &PlainCodec, "s:1");
        assert!(!records[0].contains_key("channel"));
    }

    #[test]
    fn test_bad_sent_ts_coerces_to_zero() {
        let records = Record::from_message(
            &msg("@tmi-sent-ts=soon :n!u@h PRIVMSG #c :x"),
            &PlainCodec,
            "s:1",
        );
        assert_eq!(records[0].get("tmi_sent_ts"), Some(&Value::from(0)));
    }

    #[test]
    fn test_sent_ts_keeps_leading_digits() {
        let records = Record::from_message(
            &msg("@tmi-sent-ts=1700000000000ms :n!u@h PRIVMSG #c :x"),
            &PlainCodec,
            "s:1",
        );
        assert_eq!(
            records[0].get("tmi_sent_ts"),
            Some(&Value::from(1_700_000_000_000_i64))
        );
        assert_eq!(leading_integer("-12x"), -12);
        assert_eq!(leading_integer(""), 0);
    }

    #[test]
    fn test_ngametv_tagged_line_produces_record() {
        let ctx = ParseContext::with_network(Network::NgameTv);
        let msg = ParsedMessage::parse("@id=1 viewer PRIVMSG #chan :hi", &ctx);
        let records = Record::from_message(&msg, &PlainCodec, "irc.ngame.tv:6667");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("nick"), Some("viewer"));
        assert_eq!(records[0].get_str("user"), Some("viewer!viewer@viewer"));
        assert_eq!(records[0].get_str("channel"), Some("#chan"));
        assert_eq!(records[0].get_str("message"), Some("hi"));
    }

    #[test]
    fn test_stats_record() {
        let record = Record::from_stats(ChannelStats {
            channel: "#x".to_string(),
            users: Some(7),
            server: "s:1".to_string(),
        });
        assert_eq!(record.get_str("channel"), Some("#x"));
        assert_eq!(record.get("users"), Some(&Value::from(7)));
        assert_eq!(record.get_str("server"), Some("s:1"));
        assert!(record.contains_key(TIMESTAMP_FIELD));

        let record = Record::from_stats(ChannelStats {
            channel: "#y".to_string(),
            users: None,
            server: "s:1".to_string(),
        });
        assert_eq!(record.get("users"), Some(&Value::Null));
    }

    #[test]
    fn test_json_line() {
        let line = Record::new().with("a", 1).with("b", "x").to_json_line();
        assert_eq!(line, r#"{"a":1,"b":"x"}"#);
    }
}
