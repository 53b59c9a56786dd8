//! IRC message prefix (source) handling.
//!
//! A prefix names the origin of a message: either a server name or a
//! user's `nick!user@host` mask.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use serde::Serialize;

use crate::isupport::Network;

/// Fixed server prefix used by NgameTV; every other prefix on that network
/// is a bare nickname.
pub const NGAMETV_SERVER_PREFIX: &str = "ngame";

/// The user that sent a message, as captured from its prefix.
///
/// All three parts are taken from the line itself; nothing is looked up
/// later, so `host` is whatever the server sent at parse time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct User {
    /// Nickname.
    pub nick: String,
    /// Username (ident).
    pub user: String,
    /// Hostname.
    pub host: String,
}

impl User {
    /// Create a user from nick, user, and host components.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Parse a `nick!user@host` prefix.
    ///
    /// Returns `None` unless all three components are present and non-empty.
    ///
    /// ```
    /// use slirc_ingest::prefix::User;
    ///
    /// let user = User::parse("nick!ident@host.example.com").unwrap();
    /// assert_eq!(user.nick, "nick");
    /// assert_eq!(user.host, "host.example.com");
    ///
    /// assert!(User::parse("irc.example.com").is_none());
    /// ```
    pub fn parse(prefix: &str) -> Option<Self> {
        let (nick, rest) = prefix.split_once('!')?;
        let (user, host) = rest.split_once('@')?;

        if nick.is_empty() || user.is_empty() || host.is_empty() {
            return None;
        }
        if prefix.contains(' ') {
            return None;
        }

        Some(Self::new(nick, user, host))
    }
}

/// Apply network-specific prefix rewriting.
///
/// NgameTV sends bare nicknames as prefixes. Anything other than its
/// server prefix is expanded to `value!value@value` so that it parses as a
/// user. Other networks pass through unchanged.
pub fn normalize(prefix: &str, network: &Network) -> String {
    match network {
        Network::NgameTv if prefix != NGAMETV_SERVER_PREFIX => {
            format!("{prefix}!{prefix}@{prefix}")
        }
        _ => prefix.to_owned(),
    }
}

/// Whether a prefix has the shape of a server name.
///
/// Server names contain no `!` or `@` and contain at least one `.`.
pub fn is_server_name(prefix: &str) -> bool {
    !prefix.is_empty()
        && !prefix.contains(['!', '@', ' '])
        && prefix.contains('.')
        && !prefix.starts_with('.')
        && !prefix.ends_with('.')
}
