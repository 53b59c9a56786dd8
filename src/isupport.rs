//! RPL_ISUPPORT (005) tracking and the parse context built from it.
//!
//! The parser needs a few server parameters to derive fields correctly:
//! which characters start a channel name (`CHANTYPES`), which prefixes
//! may target a status subset of a channel (`STATUSMSG`), how those map
//! to mode letters (`PREFIX`), and which network the server belongs to
//! (`NETWORK`). [`ParseContext`] holds the current view of these and is
//! updated as 005 replies arrive.

use std::fmt;

/// One `KEY[=VALUE]` token from an ISUPPORT reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsupportEntry {
    pub key: String,
    pub value: Option<String>,
}

/// Parsed ISUPPORT tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport {
    entries: Vec<IsupportEntry>,
}

impl Isupport {
    pub fn parse_params<S: AsRef<str>>(params: &[S]) -> Self {
        let mut entries = Vec::with_capacity(params.len());
        for p in params {
            let p = p.as_ref();
            if p.starts_with(':') {
                break;
            }
            if p.is_empty() {
                continue;
            }
            let (k, v) = match p.split_once('=') {
                Some((k, v)) => (k, Some(v.to_owned())),
                None => (p, None),
            };

            entries.push(IsupportEntry {
                key: k.to_owned(),
                value: v,
            });
        }
        Isupport { entries }
    }

    /// Parse the parameters of a 005 reply.
    ///
    /// The first parameter is the client nick and the last one is the
    /// human-readable "are supported by this server" text; both are skipped.
    pub fn from_response_args<S: AsRef<str>>(args: &[S]) -> Option<Self> {
        if args.is_empty() {
            return None;
        }

        let mut tokens = &args[1..];

        if let Some(last) = tokens.last() {
            if last.as_ref().contains(' ') {
                tokens = &tokens[..tokens.len().saturating_sub(1)];
            }
        }
        Some(Self::parse_params(tokens))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IsupportEntry> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .rfind(|e| e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value.as_deref())
    }

    pub fn chantypes(&self) -> Option<&str> {
        self.get("CHANTYPES").flatten()
    }

    pub fn statusmsg(&self) -> Option<&str> {
        self.get("STATUSMSG").flatten()
    }

    pub fn network(&self) -> Option<&str> {
        self.get("NETWORK").flatten()
    }

    pub fn prefix(&self) -> Option<PrefixSpec> {
        self.get("PREFIX").flatten().and_then(PrefixSpec::parse)
    }
}

/// The `PREFIX=(modes)prefixes` token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixSpec {
    pub modes: String,
    pub prefixes: String,
}

impl PrefixSpec {
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(open) = s.find('(') {
            if let Some(close) = s[open + 1..].find(')') {
                let close = open + 1 + close;
                let modes = &s[open + 1..close];
                let prefixes = &s[close + 1..];
                if !modes.is_empty() && !prefixes.is_empty() {
                    return Some(PrefixSpec {
                        modes: modes.to_owned(),
                        prefixes: prefixes.to_owned(),
                    });
                }
            }
        } else if !s.is_empty() {
            return Some(PrefixSpec {
                modes: String::new(),
                prefixes: s.to_owned(),
            });
        }
        None
    }

    /// Map a prefix character (`@`) to its mode letter (`o`).
    pub fn mode_for(&self, prefix: char) -> Option<char> {
        let index = self.prefixes.chars().position(|c| c == prefix)?;
        self.modes.chars().nth(index)
    }
}

impl Default for PrefixSpec {
    fn default() -> Self {
        Self {
            modes: "ov".to_owned(),
            prefixes: "@+".to_owned(),
        }
    }
}

/// The IRC network a connection belongs to.
///
/// Only networks whose quirks change parsing get their own variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Network {
    /// Not yet known.
    #[default]
    Unknown,
    /// NgameTV: prefixes are bare nicknames.
    NgameTv,
    /// Twitch chat.
    Twitch,
    /// Any other network, by its advertised name (lowercased).
    Other(String),
}

impl Network {
    /// Map an advertised or configured network name to a [`Network`].
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "" => Self::Unknown,
            "ngametv" => Self::NgameTv,
            "twitch" => Self::Twitch,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Guess the network from a server prefix.
    pub fn from_server_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "tmi.twitch.tv" => Some(Self::Twitch),
            crate::prefix::NGAMETV_SERVER_PREFIX => Some(Self::NgameTv),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::NgameTv => f.write_str("ngametv"),
            Self::Twitch => f.write_str("twitch"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Server parameters the parser consults when deriving fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseContext {
    pub network: Network,
    pub chantypes: String,
    pub statusmsg: String,
    pub prefix: PrefixSpec,
}

impl Default for ParseContext {
    fn default() -> Self {
        Self {
            network: Network::Unknown,
            chantypes: "#&".to_owned(),
            statusmsg: "@+".to_owned(),
            prefix: PrefixSpec::default(),
        }
    }
}

impl ParseContext {
    pub fn with_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Merge the tokens of one 005 reply into this context.
    ///
    /// A configured network is never overridden by the advertised one.
    pub fn apply(&mut self, isupport: &Isupport) {
        if let Some(types) = isupport.chantypes() {
            self.chantypes = types.to_owned();
        }
        if let Some(status) = isupport.statusmsg() {
            self.statusmsg = status.to_owned();
        }
        if let Some(prefix) = isupport.prefix() {
            self.prefix = prefix;
        }
        if self.network.is_unknown() {
            if let Some(name) = isupport.network() {
                self.network = Network::from_name(name);
            }
        }
    }

    pub fn is_channel_prefix(&self, c: char) -> bool {
        self.chantypes.contains(c)
    }

    pub fn is_status_prefix(&self, c: char) -> bool {
        self.statusmsg.contains(c)
    }

    /// Split a target into `(channel, status mode)` if it names a channel.
    ///
    /// `@#chan` yields `("#chan", Some('o'))`; `#chan` yields
    /// `("#chan", None)`; anything else is not a channel.
    pub fn channel_target<'a>(&self, target: &'a str) -> Option<(&'a str, Option<char>)> {
        let mut chars = target.chars();
        let first = chars.next()?;
        let second = chars.next();

        if self.is_status_prefix(first) && second.is_some_and(|c| self.is_channel_prefix(c)) {
            let mode = self.prefix.mode_for(first).unwrap_or(first);
            return Some((&target[first.len_utf8()..], Some(mode)));
        }
        if self.is_channel_prefix(first) {
            return Some((target, None));
        }
        None
    }
}
