//! IRCv3 capability negotiation.
//!
//! The ingestor wants a fixed set of capabilities. When the server
//! advertises its list, the negotiator requests the ones both sides know,
//! in the order the ingestor lists them. If there is nothing to request it
//! ends negotiation on the spot: some servers never answer an empty
//! `CAP REQ`, and registration would hang waiting for them.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

use std::collections::HashSet;

/// Capabilities the ingestor asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Notify of away status changes
    AwayNotify,
    /// Show all user prefix modes in NAMES
    MultiPrefix,
    /// SASL authentication
    Sasl,
    /// Twitch IRCv3 message tags
    TwitchTags,
    /// Unknown/custom capability
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::AwayNotify => "away-notify",
            Self::MultiPrefix => "multi-prefix",
            Self::Sasl => "sasl",
            Self::TwitchTags => "twitch.tv/tags",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "away-notify" => Self::AwayNotify,
            "multi-prefix" => Self::MultiPrefix,
            "sasl" => Self::Sasl,
            "twitch.tv/tags" => Self::TwitchTags,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// The capabilities requested by default, in request order.
pub const DESIRED_CAPABILITIES: &[Capability] = &[
    Capability::AwayNotify,
    Capability::MultiPrefix,
    Capability::Sasl,
    Capability::TwitchTags,
];

/// Parse a server capability advertisement into bare names.
///
/// `cap=value` entries contribute `cap`.
pub fn parse_advertised(list: &str) -> HashSet<String> {
    list.split_whitespace()
        .map(|cap| cap.split('=').next().unwrap_or(cap).to_string())
        .collect()
}

/// Intersect the desired list with the advertised set, keeping the order of
/// the desired list.
pub fn compute_request(desired: &[Capability], advertised: &HashSet<String>) -> Vec<Capability> {
    desired
        .iter()
        .filter(|cap| advertised.contains(cap.as_ref()))
        .cloned()
        .collect()
}

/// Negotiation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    /// Waiting for the server's capability list.
    #[default]
    Idle,
    /// `CAP REQ` sent, waiting for ACK/NAK.
    Requested,
    /// `CAP END` sent.
    Ended,
}

/// One-shot CAP REQ/END driver.
///
/// It only computes the lines to send; the connection writes them.
#[derive(Debug, Clone)]
pub struct CapabilityNegotiator {
    desired: Vec<Capability>,
    state: NegotiationState,
    requested: Vec<Capability>,
}

impl Default for CapabilityNegotiator {
    fn default() -> Self {
        Self::new(DESIRED_CAPABILITIES.to_vec())
    }
}

impl CapabilityNegotiator {
    pub fn new(desired: Vec<Capability>) -> Self {
        Self {
            desired,
            state: NegotiationState::Idle,
            requested: Vec::new(),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// The capabilities included in the `CAP REQ`, if one was sent.
    pub fn requested(&self) -> &[Capability] {
        &self.requested
    }

    /// Handle the server's full advertised capability list.
    ///
    /// Returns the line to send: `CAP REQ :<caps>` when there is an overlap,
    /// `CAP END` when there is none. Returns `None` once negotiation has
    /// moved past [`NegotiationState::Idle`].
    ///
    /// ```
    /// use slirc_ingest::caps::{CapabilityNegotiator, NegotiationState};
    ///
    /// let mut negotiator = CapabilityNegotiator::default();
    /// let line = negotiator.on_advertised("sasl=PLAIN multi-prefix extended-join");
    /// assert_eq!(line.as_deref(), Some("CAP REQ :multi-prefix sasl"));
    /// assert_eq!(negotiator.state(), NegotiationState::Requested);
    /// ```
    pub fn on_advertised(&mut self, advertised: &str) -> Option<String> {
        if self.state != NegotiationState::Idle {
            return None;
        }

        let available = parse_advertised(advertised);
        let request = compute_request(&self.desired, &available);

        if request.is_empty() {
            self.state = NegotiationState::Ended;
            return Some("CAP END".to_string());
        }

        let caps: Vec<&str> = request.iter().map(AsRef::as_ref).collect();
        let line = format!("CAP REQ :{}", caps.join(" "));
        self.requested = request;
        self.state = NegotiationState::Requested;
        Some(line)
    }

    /// Handle the server's ACK or NAK for our request.
    ///
    /// Returns `CAP END` the first time; later replies are ignored.
    pub fn on_reply(&mut self) -> Option<String> {
        if self.state != NegotiationState::Requested {
            return None;
        }
        self.state = NegotiationState::Ended;
        Some("CAP END".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_as_ref() {
        assert_eq!(Capability::MultiPrefix.as_ref(), "multi-prefix");
        assert_eq!(Capability::TwitchTags.as_ref(), "twitch.tv/tags");
    }

    #[test]
    fn test_capability_from_str() {
        assert_eq!(Capability::from("multi-prefix"), Capability::MultiPrefix);
        assert_eq!(Capability::from("sasl"), Capability::Sasl);
        assert_eq!(
            Capability::from("unknown-cap"),
            Capability::Custom("unknown-cap".to_string())
        );
    }

    #[test]
    fn test_request_keeps_desired_order() {
        let advertised: HashSet<String> = ["sasl", "multi-prefix"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let request = compute_request(DESIRED_CAPABILITIES, &advertised);
        assert_eq!(request, vec![Capability::MultiPrefix, Capability::Sasl]);
    }

    #[test]
    fn test_advertised_values_stripped() {
        let caps = parse_advertised("sasl=PLAIN,EXTERNAL twitch.tv/tags");
        assert!(caps.contains("sasl"));
        assert!(caps.contains("twitch.tv/tags"));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn test_empty_intersection_ends_immediately() {
        let mut negotiator = CapabilityNegotiator::default();
        let line = negotiator.on_advertised("extended-join chghost");
        assert_eq!(line.as_deref(), Some("CAP END"));
        assert_eq!(negotiator.state(), NegotiationState::Ended);
        assert!(negotiator.requested().is_empty());
        assert_eq!(negotiator.on_reply(), None);
    }

    #[test]
    fn test_empty_advertisement_ends_immediately() {
        let mut negotiator = CapabilityNegotiator::default();
        assert_eq!(negotiator.on_advertised("").as_deref(), Some("CAP END"));
    }

    #[test]
    fn test_request_then_ack() {
        let mut negotiator = CapabilityNegotiator::default();
        let line = negotiator.on_advertised("twitch.tv/tags twitch.tv/commands");
        assert_eq!(line.as_deref(), Some("CAP REQ :twitch.tv/tags"));
        assert_eq!(negotiator.state(), NegotiationState::Requested);

        assert_eq!(negotiator.on_reply().as_deref(), Some("CAP END"));
        assert_eq!(negotiator.state(), NegotiationState::Ended);
        assert_eq!(negotiator.on_reply(), None);
    }

    #[test]
    fn test_second_advertisement_ignored() {
        let mut negotiator = CapabilityNegotiator::default();
        assert!(negotiator.on_advertised("sasl").is_some());
        assert_eq!(negotiator.on_advertised("multi-prefix"), None);
        assert_eq!(negotiator.requested(), &[Capability::Sasl]);
    }
}
