//! CTCP (Client-to-Client Protocol) detection.
//!
//! CTCP requests ride inside PRIVMSG and NOTICE bodies, wrapped in the
//! `\x01` marker byte. `/me waves` is sent as `\x01ACTION waves\x01`.
//!
//! # Reference
//! - CTCP reference: <https://modern.ircdocs.horse/ctcp.html>

/// The CTCP delimiter character (`\x01`).
pub const CTCP_DELIM: char = '\x01';

/// A CTCP request split out of a message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The command word (`ACTION`, `VERSION`, ...), as sent.
    pub command: &'a str,
    /// Everything after the first space, if anything.
    pub args: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Parse a body delimited by the CTCP marker at both ends.
    ///
    /// Returns `None` if either marker is missing or nothing sits between
    /// them.
    ///
    /// ```
    /// use slirc_ingest::ctcp::Ctcp;
    ///
    /// let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
    /// assert_eq!(ctcp.command, "ACTION");
    /// assert_eq!(ctcp.args, Some("waves hello"));
    /// assert!(ctcp.is_action());
    ///
    /// assert!(Ctcp::parse("plain text").is_none());
    /// ```
    pub fn parse(text: &'a str) -> Option<Self> {
        let inner = text.strip_prefix(CTCP_DELIM)?.strip_suffix(CTCP_DELIM)?;
        if inner.is_empty() {
            return None;
        }

        let (command, args) = match inner.split_once(' ') {
            Some((command, args)) => (command, Some(args)),
            None => (inner, None),
        };

        Some(Self { command, args })
    }

    /// Whether this is a `/me` action.
    pub fn is_action(&self) -> bool {
        self.command == "ACTION"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        let ctcp = Ctcp::parse("\x01ACTION waves\x01").unwrap();
        assert_eq!(ctcp.command, "ACTION");
        assert_eq!(ctcp.args, Some("waves"));
        assert!(ctcp.is_action());
    }

    #[test]
    fn test_parse_without_args() {
        let ctcp = Ctcp::parse("\x01VERSION\x01").unwrap();
        assert_eq!(ctcp.command, "VERSION");
        assert_eq!(ctcp.args, None);
        assert!(!ctcp.is_action());
    }

    #[test]
    fn test_requires_both_markers() {
        assert!(Ctcp::parse("\x01ACTION waves").is_none());
        assert!(Ctcp::parse("ACTION waves\x01").is_none());
        assert!(Ctcp::parse("\x01").is_none());
        assert!(Ctcp::parse("\x01\x01").is_none());
    }

    #[test]
    fn test_args_keep_inner_spaces() {
        let ctcp = Ctcp::parse("\x01PING 123 456\x01").unwrap();
        assert_eq!(ctcp.args, Some("123 456"));
    }

    #[test]
    fn test_lowercase_action_is_not_action() {
        let ctcp = Ctcp::parse("\x01action waves\x01").unwrap();
        assert!(!ctcp.is_action());
    }
}
