//! The hand-off queue and the consumer loop.
//!
//! The connection driver pushes parsed messages, and the NAMES scheduler
//! pushes cycle starts, onto one FIFO queue. A single consumer pops them,
//! feeds the stats aggregator and emits records. Because the scheduler's
//! reset travels through the same queue as the replies it precedes, the
//! aggregator has exactly one writer and needs no lock.
//!
//! The consumer waits on the queue for at most one poll interval at a time
//! and checks the stop token between waits, so it exits within one
//! interval of a stop request even when nothing is arriving.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::codec::Codec;
use crate::error::{IngestError, Result};
use crate::message::ParsedMessage;
use crate::record::Record;
use crate::stats::ChannelStatsAggregator;

/// How long the consumer waits on an empty queue before rechecking stop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One unit of work for the consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A parsed line accepted by the subscription filter.
    Message(Box<ParsedMessage>),
    /// A NAMES request for the channel is about to be sent.
    BeginNamesCycle(String),
}

/// Producer handle for the hand-off queue.
///
/// The queue is unbounded: pushing never waits, so a slow consumer cannot
/// stall the connection.
#[derive(Clone, Debug)]
pub struct IngestQueue {
    tx: mpsc::UnboundedSender<Event>,
}

/// Create the hand-off queue.
pub fn queue() -> (IngestQueue, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IngestQueue { tx }, rx)
}

impl IngestQueue {
    /// Enqueue an event. Returns `false` if the consumer is gone.
    pub fn push(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn push_message(&self, msg: ParsedMessage) -> bool {
        self.push(Event::Message(Box::new(msg)))
    }

    pub fn begin_cycle(&self, channel: impl Into<String>) -> bool {
        self.push(Event::BeginNamesCycle(channel.into()))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The single consumer of the hand-off queue.
pub struct Consumer {
    rx: mpsc::UnboundedReceiver<Event>,
    codec: Box<dyn Codec>,
    stats: ChannelStatsAggregator,
    stats_enabled: bool,
    server: String,
    output: mpsc::UnboundedSender<Record>,
    poll_interval: Duration,
    stop: CancellationToken,
}

impl Consumer {
    /// `server` is the `host:port` stamped on every record.
    pub fn new(
        rx: mpsc::UnboundedReceiver<Event>,
        codec: Box<dyn Codec>,
        server: impl Into<String>,
        output: mpsc::UnboundedSender<Record>,
        stop: CancellationToken,
    ) -> Self {
        let server = server.into();
        Self {
            rx,
            codec,
            stats: ChannelStatsAggregator::new(server.clone()),
            stats_enabled: false,
            server,
            output,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop,
        }
    }

    /// Emit channel-stats records on end-of-names.
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until stopped, the queue closes, or the output is dropped.
    ///
    /// Events still queued when stop is observed are discarded.
    pub async fn run(mut self) -> Result<()> {
        let mut processed: u64 = 0;

        let outcome = loop {
            if self.stop.is_cancelled() {
                break Ok(());
            }

            let event = match tokio::time::timeout(self.poll_interval, self.rx.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!("ingest queue closed");
                    break Ok(());
                }
                Err(_) => continue,
            };

            if self.stop.is_cancelled() {
                break Ok(());
            }

            if let Err(e) = self.dispatch(event) {
                break Err(e);
            }
            processed += 1;
        };

        info!(processed, "consumer stopped");
        outcome
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            Event::BeginNamesCycle(channel) => {
                self.stats.begin_cycle(&channel);
                Ok(())
            }
            Event::Message(msg) => {
                trace!(raw = %msg.raw, "consuming message");

                if self.stats_enabled {
                    if let Some(stats) = self.stats.observe(&msg) {
                        self.emit(Record::from_stats(stats))?;
                    }
                }

                for record in Record::from_message(&msg, self.codec.as_ref(), &self.server) {
                    self.emit(record)?;
                }
                Ok(())
            }
        }
    }

    fn emit(&self, record: Record) -> Result<()> {
        self.output.send(record).map_err(|_| IngestError::OutputClosed)
    }
}
