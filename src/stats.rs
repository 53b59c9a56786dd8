//! Per-channel user counts from NAMES replies.
//!
//! A channel's NAMES listing arrives as any number of `353` fragments
//! followed by one `366`. The aggregator adds up the nicknames in each
//! fragment and reports the total when the `366` arrives.
//!
//! Counts are reset only when a new request cycle begins, not after the
//! total is reported. Unsolicited `353`/`366` traffic outside a cycle keeps
//! adding to (and re-reporting) the last cycle's count.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::casemap::irc_to_lower;
use crate::message::ParsedMessage;
use crate::response::Response;

/// A finished count for one channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    /// The channel, as named in the end-of-names reply.
    pub channel: String,
    /// Users counted in the cycle; `None` if the channel was never counted.
    pub users: Option<u64>,
    /// The `host:port` the counts came from.
    pub server: String,
}

/// Running NAMES totals keyed by case-folded channel name.
///
/// Owned by the consumer loop; nothing else mutates it.
#[derive(Debug, Default)]
pub struct ChannelStatsAggregator {
    counts: HashMap<String, u64>,
    server: String,
}

impl ChannelStatsAggregator {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            counts: HashMap::new(),
            server: server.into(),
        }
    }

    /// Start a new cycle for `channel`, zeroing its running total.
    pub fn begin_cycle(&mut self, channel: &str) {
        debug!(channel = %channel, "starting NAMES cycle");
        self.counts.insert(irc_to_lower(channel), 0);
    }

    /// The running total for `channel`.
    pub fn count(&self, channel: &str) -> Option<u64> {
        self.counts.get(&irc_to_lower(channel)).copied()
    }

    /// Feed one message; returns the finished count on end-of-names.
    ///
    /// Anything other than `353`/`366` is ignored.
    pub fn observe(&mut self, msg: &ParsedMessage) -> Option<ChannelStats> {
        match msg.response()? {
            Response::RPL_NAMREPLY => {
                let channel = msg.param(2)?;
                let names = msg.param(3).map_or(0, |list| list.split_whitespace().count());
                *self.counts.entry(irc_to_lower(channel)).or_insert(0) += names as u64;
                None
            }
            Response::RPL_ENDOFNAMES => {
                let channel = msg.param(1)?;
                let users = self.count(channel);
                debug!(channel = %channel, users = ?users, "NAMES cycle complete");
                Some(ChannelStats {
                    channel: channel.to_owned(),
                    users,
                    server: self.server.clone(),
                })
            }
            _ => None,
        }
    }
}
