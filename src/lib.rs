//! # slirc-ingest
//!
//! Ingests live IRC traffic and turns it into structured, timestamped
//! records.
//!
//! ## Features
//!
//! - Total IRC line parsing with IRCv3 message tags, CTCP and status
//!   messages
//! - IRCv3 capability negotiation that never stalls registration
//! - Per-channel user counts from periodic NAMES requests
//! - A single-consumer pipeline with responsive, ordered shutdown
//! - Plain TCP or TLS connections
//!
//! ## Parsing IRC Messages
//!
//! ```rust
//! use slirc_ingest::{ParsedMessage, TagValue};
//!
//! let raw = "@user-id=42;badges=mod,sub :nick!user@host PRIVMSG #channel :Hello!";
//! let message: ParsedMessage = raw.parse().unwrap();
//!
//! assert_eq!(message.channel.as_deref(), Some("#channel"));
//! assert_eq!(message.tag("user_id"), Some("42"));
//! assert_eq!(
//!     message.tags.get("badges"),
//!     Some(&TagValue::List(vec!["mod".to_string(), "sub".to_string()]))
//! );
//! ```
//!
//! ## Running an Ingestor
//!
//! ```no_run
//! use slirc_ingest::{Config, Ingestor};
//! use tokio::sync::mpsc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::load("config.toml")?;
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let handle = Ingestor::start(&config, tx).await?;
//!
//! while let Some(record) = rx.recv().await {
//!     println!("{}", record.to_json_line());
//! }
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod caps;
pub mod casemap;
pub mod client;
pub mod codec;
pub mod config;
pub mod ctcp;
pub mod error;
pub mod ingest;
pub mod isupport;
pub mod line;
pub mod logging;
pub mod message;
pub mod pipeline;
pub mod prefix;
pub mod record;
pub mod response;
pub mod scheduler;
pub mod state;
pub mod stats;
pub mod transport;

pub use self::caps::{Capability, CapabilityNegotiator, NegotiationState};
pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::codec::{Codec, CodecKind, JsonCodec, PlainCodec};
pub use self::config::{Config, Secret};
pub use self::ctcp::Ctcp;
pub use self::error::{ConfigError, IngestError, ProtocolError};
pub use self::ingest::{IngestHandle, Ingestor};
pub use self::isupport::{Isupport, IsupportEntry, Network, ParseContext, PrefixSpec};
pub use self::line::LineCodec;
pub use self::message::{ErrorReply, ParsedMessage, TagMap, TagValue, Target};
pub use self::pipeline::{Consumer, Event, IngestQueue};
pub use self::prefix::User;
pub use self::record::Record;
pub use self::response::Response;
pub use self::scheduler::NamesScheduler;
pub use self::state::{ConnectionState, Session, SessionAction, SessionConfig};
pub use self::stats::{ChannelStats, ChannelStatsAggregator};
pub use self::transport::Transport;
