//! Sans-IO session state machine for the ingesting client.
//!
//! [`Session`] consumes raw lines and produces [`SessionAction`]s: lines to
//! send, messages to hand to the pipeline, and lifecycle events. It does no
//! I/O itself, which keeps registration, capability negotiation and the
//! subscription filter testable without a socket.
//!
//! # Example
//!
//! ```
//! use slirc_ingest::state::{Session, SessionAction, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig {
//!     nickname: "logbot".to_string(),
//!     username: "logbot".to_string(),
//!     realname: "Log Bot".to_string(),
//!     password: None,
//!     channels: vec!["#rust".to_string()],
//!     subscribe_all: false,
//!     network: Default::default(),
//! });
//!
//! let actions = session.start();
//! assert!(matches!(&actions[0], SessionAction::Send(line) if line == "CAP LS 302"));
//!
//! let actions = session.feed(":irc.example.com CAP * LS :multi-prefix");
//! assert!(matches!(&actions[0], SessionAction::Send(line) if line == "CAP REQ :multi-prefix"));
//! ```

use tracing::{debug, info, warn};

use crate::caps::CapabilityNegotiator;
use crate::casemap::irc_eq;
use crate::config::{ChannelEntry, Config, Secret};
use crate::isupport::{Isupport, Network, ParseContext};
use crate::message::ParsedMessage;
use crate::response::Response;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// [`Session::start`] not yet called.
    #[default]
    Disconnected,
    /// Registration lines sent, awaiting 001.
    Registering,
    /// Received 001; channels joined.
    Connected,
    /// QUIT sent or ERROR received.
    Terminated,
}

/// Identity and behavior of the session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub password: Option<Secret>,
    /// Channel entries, each `"#chan"` or `"#chan key"`.
    pub channels: Vec<String>,
    /// Queue every message rather than only channel chat.
    pub subscribe_all: bool,
    /// A forced network; [`Network::Unknown`] to detect it.
    pub network: Network,
}

impl SessionConfig {
    /// Build from the loaded configuration, resolving the password.
    pub fn from_config(config: &Config) -> Self {
        Self {
            nickname: config.nick.clone(),
            username: config.user.clone(),
            realname: config.real.clone(),
            password: config.resolve_password(),
            channels: config.channels.clone(),
            subscribe_all: config.subscribe_all(),
            network: config.network(),
        }
    }
}

/// What the driver should do after feeding a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionAction {
    /// Write this line to the server.
    Send(String),
    /// Hand this message to the pipeline.
    Enqueue(Box<ParsedMessage>),
    /// Registration completed; periodic work may start.
    Registered,
    /// The server closed the session.
    Terminated(String),
}

/// Client-side session for one connection.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    nickname: String,
    negotiator: CapabilityNegotiator,
    /// CAP LS text accumulated across continuation lines.
    advertised: String,
    context: ParseContext,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let context = ParseContext::with_network(config.network.clone());
        Self {
            nickname: config.nickname.clone(),
            config,
            state: ConnectionState::Disconnected,
            negotiator: CapabilityNegotiator::default(),
            advertised: String::new(),
            context,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The nickname currently in use or being tried.
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn negotiator(&self) -> &CapabilityNegotiator {
        &self.negotiator
    }

    /// The parse context as updated by ISUPPORT and network detection.
    pub fn context(&self) -> &ParseContext {
        &self.context
    }

    /// Lines that open the session.
    pub fn start(&mut self) -> Vec<SessionAction> {
        self.state = ConnectionState::Registering;
        let mut actions = Vec::with_capacity(4);

        if let Some(password) = &self.config.password {
            actions.push(SessionAction::Send(format!("PASS {}", password.expose())));
        }
        actions.push(SessionAction::Send("CAP LS 302".to_string()));
        actions.push(SessionAction::Send(format!("NICK {}", self.nickname)));
        actions.push(SessionAction::Send(format!(
            "USER {} 0 * :{}",
            self.config.username, self.config.realname
        )));

        actions
    }

    /// The QUIT line, moving the session to [`ConnectionState::Terminated`].
    pub fn quit(&mut self, reason: &str) -> String {
        self.state = ConnectionState::Terminated;
        format!("QUIT :{reason}")
    }

    /// Feed one raw line received from the server.
    pub fn feed(&mut self, line: &str) -> Vec<SessionAction> {
        let msg = ParsedMessage::parse(line, &self.context);
        let mut actions = Vec::new();

        self.detect_network(&msg);
        self.handle_protocol(&msg, &mut actions);

        if self.accepts(&msg) {
            actions.push(SessionAction::Enqueue(Box::new(msg)));
        }
        actions
    }

    /// Whether a message passes the subscription filter.
    pub fn accepts(&self, msg: &ParsedMessage) -> bool {
        if self.config.subscribe_all {
            return true;
        }
        msg.channel.is_some() && (msg.is_command("PRIVMSG") || msg.is_command("NOTICE"))
    }

    fn detect_network(&mut self, msg: &ParsedMessage) {
        if !self.context.network.is_unknown() {
            return;
        }
        let Some(network) = msg.prefix.as_deref().and_then(Network::from_server_prefix) else {
            return;
        };
        info!(network = %network, "detected network from server prefix");
        self.context.network = network;
    }

    fn handle_protocol(&mut self, msg: &ParsedMessage, actions: &mut Vec<SessionAction>) {
        let Some(command) = msg.command.as_deref() else {
            return;
        };

        match command.to_ascii_uppercase().as_str() {
            "PING" => {
                let token = msg.params.last().map(String::as_str).unwrap_or_default();
                actions.push(SessionAction::Send(format!("PONG :{token}")));
            }
            "CAP" => self.handle_cap(msg, actions),
            "ERROR" => {
                let reason = msg.message.clone().unwrap_or_default();
                warn!(reason = %reason, "server closed the session");
                self.state = ConnectionState::Terminated;
                actions.push(SessionAction::Terminated(reason));
            }
            "JOIN" => {
                if let (Some(user), Some(channel)) = (&msg.user, &msg.channel) {
                    if irc_eq(&user.nick, &self.nickname) {
                        info!(channel = %channel, "joined channel");
                    }
                }
            }
            _ => self.handle_numeric(msg, actions),
        }
    }

    fn handle_cap(&mut self, msg: &ParsedMessage, actions: &mut Vec<SessionAction>) {
        let Some(subcommand) = msg.param(1) else {
            return;
        };

        match subcommand.to_ascii_uppercase().as_str() {
            "LS" => {
                // `CAP * LS * :caps` marks a continuation; the last line
                // carries no `*`.
                let continued = msg.params.len() >= 4 && msg.param(2) == Some("*");
                let caps = msg.params.last().map(String::as_str).unwrap_or_default();
                if msg.params.len() >= 3 {
                    if !self.advertised.is_empty() {
                        self.advertised.push(' ');
                    }
                    self.advertised.push_str(caps);
                }
                if continued {
                    return;
                }

                let advertised = std::mem::take(&mut self.advertised);
                debug!(caps = %advertised, "server capabilities");
                if let Some(line) = self.negotiator.on_advertised(&advertised) {
                    actions.push(SessionAction::Send(line));
                }
            }
            "ACK" | "NAK" => {
                debug!(
                    reply = %subcommand,
                    caps = %msg.params.last().map(String::as_str).unwrap_or_default(),
                    "capability reply"
                );
                if let Some(line) = self.negotiator.on_reply() {
                    actions.push(SessionAction::Send(line));
                }
            }
            _ => {}
        }
    }

    fn handle_numeric(&mut self, msg: &ParsedMessage, actions: &mut Vec<SessionAction>) {
        match msg.response() {
            Some(Response::RPL_WELCOME) => {
                if let Some(nick) = msg.param(0) {
                    self.nickname = nick.to_owned();
                }
                self.state = ConnectionState::Connected;
                info!(nick = %self.nickname, "registered");

                for entry in self.config.channels.iter().filter_map(|c| ChannelEntry::parse(c)) {
                    actions.push(SessionAction::Send(entry.join_line()));
                }
                actions.push(SessionAction::Registered);
            }
            Some(Response::RPL_ISUPPORT) => {
                if let Some(isupport) = Isupport::from_response_args(&msg.params) {
                    self.context.apply(&isupport);
                    debug!(network = %self.context.network, "applied ISUPPORT");
                }
            }
            Some(Response::ERR_NICKNAMEINUSE) if self.state == ConnectionState::Registering => {
                self.nickname.push('_');
                warn!(nick = %self.nickname, "nickname in use, retrying");
                actions.push(SessionAction::Send(format!("NICK {}", self.nickname)));
            }
            Some(code) if code.is_error() => {
                warn!(
                    code = code.code(),
                    text = %msg.message.as_deref().unwrap_or_default(),
                    "error reply"
                );
            }
            _ => {}
        }
    }
}
