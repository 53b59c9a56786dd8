//! The parsed form of one IRC line.

use std::convert::Infallible;
use std::str::FromStr;

use serde::Serialize;

use crate::ctcp::Ctcp;
use crate::isupport::ParseContext;
use crate::prefix::{self, User};
use crate::response::{is_error_code, Response};

use super::nom_parser::split_line;
use super::tags::{self, TagMap};

/// An error reply: a 4xx/5xx numeric or the `ERROR` verb.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    /// The numeric code, absent for `ERROR`.
    pub code: Option<u16>,
    /// The reply text (last parameter).
    pub text: Option<String>,
}

/// Who a message is addressed to: its channel, or else its sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target<'a> {
    Channel(&'a str),
    User(&'a User),
}

/// One IRC line with its raw segments and derived fields.
///
/// Built once by [`ParsedMessage::parse`] and read-only afterwards.
/// Parsing never fails; segments that are missing or malformed are `None`.
///
/// ```
/// use slirc_ingest::ParsedMessage;
///
/// let msg: ParsedMessage = ":nick!user@host PRIVMSG #chan :\x01ACTION waves\x01"
///     .parse()
///     .unwrap();
/// assert_eq!(msg.channel.as_deref(), Some("#chan"));
/// assert!(msg.is_action);
/// assert_eq!(msg.display_message(), Some("waves"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    /// The line as received, without its line ending.
    pub raw: String,
    /// Decoded IRCv3 tags; empty if the line had none.
    pub tags: TagMap,
    /// The prefix after network-specific normalization.
    pub prefix: Option<String>,
    /// The command verb or three-digit numeric.
    pub command: Option<String>,
    /// Parameters, with the trailing parameter last.
    pub params: Vec<String>,
    /// The sending user, when the prefix is a full `nick!user@host`.
    pub user: Option<User>,
    /// The channel the message concerns, without any status prefix.
    pub channel: Option<String>,
    /// Mode letter of a status-message target (`o` for `@#chan`).
    pub status_mode: Option<char>,
    /// The sending server, when the prefix is a server name.
    pub server: Option<String>,
    /// Set for error replies.
    pub error: Option<ErrorReply>,
    /// The free-text parameter of the message.
    pub message: Option<String>,
    /// CTCP command, when the message text is CTCP-wrapped.
    pub ctcp_command: Option<String>,
    /// CTCP arguments, when the message text is CTCP-wrapped.
    pub ctcp_args: Option<String>,
    /// Whether the message is a CTCP `ACTION`.
    pub is_action: bool,
}

impl ParsedMessage {
    /// Parse one raw line against the current server parameters.
    pub fn parse(raw: &str, ctx: &ParseContext) -> Self {
        let line = split_line(raw);

        let tags = tags::decode(line.tags);
        let prefix = line.prefix.map(|p| prefix::normalize(p, &ctx.network));
        let command = line.command.map(str::to_owned);
        let params: Vec<String> = line.params.iter().map(|p| (*p).to_owned()).collect();

        let user = prefix.as_deref().and_then(User::parse);
        let server = prefix
            .as_deref()
            .filter(|p| prefix::is_server_name(p))
            .map(str::to_owned);

        let numeric = command.as_deref().and_then(numeric_code);
        let (channel, status_mode) = match command.as_deref() {
            Some(cmd) => match channel_param(cmd, numeric.is_some(), &params, ctx) {
                Some((channel, status)) => (Some(channel.to_owned()), status),
                None => (None, None),
            },
            None => (None, None),
        };

        let last = params.last().cloned();
        let error = match (command.as_deref(), numeric) {
            (_, Some(code)) if is_error_code(code) => Some(ErrorReply {
                code: Some(code),
                text: last.clone(),
            }),
            (Some(cmd), None) if cmd.eq_ignore_ascii_case("ERROR") => Some(ErrorReply {
                code: None,
                text: last.clone(),
            }),
            _ => None,
        };

        let message = if error.is_some() || (command.is_some() && numeric.is_none()) {
            last
        } else {
            None
        };

        let ctcp = message.as_deref().and_then(Ctcp::parse);
        let is_action = ctcp.as_ref().is_some_and(Ctcp::is_action);
        let ctcp_command = ctcp.as_ref().map(|c| c.command.to_owned());
        let ctcp_args = ctcp.and_then(|c| c.args.map(str::to_owned));

        Self {
            raw: raw.trim_end_matches(['\r', '\n']).to_owned(),
            tags,
            prefix,
            command,
            params,
            user,
            channel,
            status_mode,
            server,
            error,
            message,
            ctcp_command,
            ctcp_args,
            is_action,
        }
    }

    /// The channel if there is one, otherwise the sending user.
    pub fn target(&self) -> Option<Target<'_>> {
        match (&self.channel, &self.user) {
            (Some(channel), _) => Some(Target::Channel(channel)),
            (None, Some(user)) => Some(Target::User(user)),
            (None, None) => None,
        }
    }

    /// The text a reader would see: the action text for `/me`, otherwise
    /// the raw message. An action without arguments reads as `""`.
    pub fn display_message(&self) -> Option<&str> {
        if self.is_action {
            Some(self.ctcp_args.as_deref().unwrap_or_default())
        } else {
            self.message.as_deref()
        }
    }

    /// The numeric code, if the command is a three-digit numeric.
    pub fn numeric(&self) -> Option<u16> {
        self.command.as_deref().and_then(numeric_code)
    }

    /// The named numeric reply, if the command is one.
    pub fn response(&self) -> Option<Response> {
        self.numeric().and_then(Response::from_code)
    }

    /// Parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Whether the command matches `name` case-insensitively.
    pub fn is_command(&self, name: &str) -> bool {
        self.command
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(name))
    }

    /// A scalar tag value.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(|v| v.as_str())
    }
}

impl FromStr for ParsedMessage {
    type Err = Infallible;

    /// Parse with a default [`ParseContext`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s, &ParseContext::default()))
    }
}

fn numeric_code(command: &str) -> Option<u16> {
    if command.len() == 3 && command.bytes().all(|b| b.is_ascii_digit()) {
        command.parse().ok()
    } else {
        None
    }
}

/// Locate the channel parameter for a command.
///
/// Most commands carry the channel first; a few replies carry it further
/// in, and other numerics fall back to the second parameter since the
/// first is the client's own nick.
fn channel_param<'a>(
    command: &str,
    is_numeric: bool,
    params: &'a [String],
    ctx: &ParseContext,
) -> Option<(&'a str, Option<char>)> {
    let fixed = match command.to_ascii_uppercase().as_str() {
        "INVITE" | "324" | "367" => Some(1),
        "353" => Some(2),
        _ => None,
    };

    if let Some(index) = fixed {
        return ctx.channel_target(params.get(index)?);
    }

    let first = params.first()?;
    match ctx.channel_target(first) {
        Some(found) => Some(found),
        None if is_numeric => ctx.channel_target(params.get(1)?),
        None => None,
    }
}
