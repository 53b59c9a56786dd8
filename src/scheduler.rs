//! Periodic NAMES requests for channel statistics.
//!
//! Each cycle walks the channel list. For every channel it first queues a
//! cycle start, so the consumer zeroes the channel's running total, and
//! only then sends `NAMES <channel>`. Replies to the request reach the
//! queue after the cycle start, so counting never starts from a stale
//! total.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pipeline::IngestQueue;

/// Sends NAMES requests on a fixed interval once registration completes.
pub struct NamesScheduler {
    channels: Vec<String>,
    interval: Duration,
    queue: IngestQueue,
    outbound: mpsc::UnboundedSender<String>,
    ready: watch::Receiver<bool>,
    stop: CancellationToken,
}

impl NamesScheduler {
    /// `channels` are bare channel names; `ready` flips to `true` once the
    /// connection has registered.
    pub fn new(
        channels: Vec<String>,
        interval: Duration,
        queue: IngestQueue,
        outbound: mpsc::UnboundedSender<String>,
        ready: watch::Receiver<bool>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            channels,
            interval,
            queue,
            outbound,
            ready,
            stop,
        }
    }

    /// Run until stopped or until the connection or consumer goes away.
    pub async fn run(mut self) {
        if !self.wait_until_ready().await {
            debug!("NAMES scheduler stopped before registration");
            return;
        }

        info!(
            channels = self.channels.len(),
            interval_secs = self.interval.as_secs(),
            "NAMES scheduler started"
        );

        loop {
            if !self.run_cycle() {
                debug!("NAMES scheduler lost its connection or consumer");
                break;
            }

            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("NAMES scheduler stopped");
    }

    async fn wait_until_ready(&mut self) -> bool {
        while !*self.ready.borrow_and_update() {
            tokio::select! {
                _ = self.stop.cancelled() => return false,
                changed = self.ready.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
        !self.stop.is_cancelled()
    }

    /// One pass over the channel list. Returns `false` if either the queue
    /// or the outbound line channel is closed.
    fn run_cycle(&self) -> bool {
        for channel in &self.channels {
            if self.stop.is_cancelled() {
                return true;
            }
            if !self.queue.begin_cycle(channel.as_str()) {
                return false;
            }
            if self.outbound.send(format!("NAMES {channel}")).is_err() {
                return false;
            }
        }
        true
    }
}
