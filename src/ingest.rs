//! Wiring of the three execution contexts.
//!
//! [`Ingestor::start`] connects and spawns the connection driver (the
//! producer), the consumer loop and, when statistics are enabled, the NAMES
//! scheduler. [`IngestHandle::stop`] tears them down in order: scheduler,
//! then connection, then consumer. Problems during shutdown are logged and
//! never returned.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::{self, Consumer};
use crate::record::Record;
use crate::scheduler::NamesScheduler;
use crate::state::{Session, SessionConfig};
use crate::transport::Transport;

/// Entry point for running an ingestion session.
pub struct Ingestor;

impl Ingestor {
    /// Connect to the configured server and start ingesting into `output`.
    ///
    /// The configuration is validated again before connecting, since its
    /// fields may have been changed after loading.
    pub async fn start(
        config: &Config,
        output: mpsc::UnboundedSender<Record>,
    ) -> Result<IngestHandle> {
        config.validate()?;
        let transport = Transport::connect(&config.host, config.port, config.secure).await?;
        Ok(Self::start_with_stream(config, transport, output))
    }

    /// Start ingesting over an already-connected stream.
    pub fn start_with_stream<S>(
        config: &Config,
        stream: S,
        output: mpsc::UnboundedSender<Record>,
    ) -> IngestHandle
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (queue, events) = pipeline::queue();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (registered_tx, registered_rx) = watch::channel(false);

        let consumer_stop = CancellationToken::new();
        let consumer = Consumer::new(
            events,
            config.codec.build(),
            config.server_address(),
            output,
            consumer_stop.clone(),
        )
        .with_stats(config.get_stats)
        .with_poll_interval(config.poll_interval());
        let consumer_task = tokio::spawn(consumer.run());

        let scheduler = config.get_stats.then(|| {
            let stop = CancellationToken::new();
            let scheduler = NamesScheduler::new(
                config.channel_names(),
                config.stats_interval(),
                queue.clone(),
                outbound_tx.clone(),
                registered_rx,
                stop.clone(),
            );
            (stop, tokio::spawn(scheduler.run()))
        });

        let client_stop = CancellationToken::new();
        let closed = CancellationToken::new();
        let client = Client::new(
            stream,
            Session::new(SessionConfig::from_config(config)),
            queue,
            outbound_rx,
            registered_tx,
            client_stop.clone(),
        );
        let client_closed = closed.clone();
        let client_task = tokio::spawn(async move {
            let result = client.run().await;
            client_closed.cancel();
            result
        });
        drop(outbound_tx);

        info!(server = %config.server_address(), stats = config.get_stats, "ingestion started");

        IngestHandle {
            scheduler,
            client: (client_stop, client_task),
            consumer: (consumer_stop, consumer_task),
            closed,
        }
    }
}

/// Handle to a running ingestion session.
pub struct IngestHandle {
    scheduler: Option<(CancellationToken, JoinHandle<()>)>,
    client: (CancellationToken, JoinHandle<Result<()>>),
    consumer: (CancellationToken, JoinHandle<Result<()>>),
    closed: CancellationToken,
}

impl IngestHandle {
    /// Resolves once the connection has ended for any reason.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Stop everything: scheduler, then connection, then consumer.
    pub async fn stop(self) {
        if let Some((stop, task)) = self.scheduler {
            stop.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "NAMES scheduler did not shut down cleanly");
            }
        }

        let (stop, task) = self.client;
        stop.cancel();
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "connection ended with an error"),
            Err(e) => warn!(error = %e, "connection task did not shut down cleanly"),
        }

        let (stop, task) = self.consumer;
        stop.cancel();
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "consumer ended with an error"),
            Err(e) => warn!(error = %e, "consumer task did not shut down cleanly"),
        }

        info!("ingestion stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, IngestError};

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let mut config = Config::from_toml(
            r##"
            host = "irc.example.com"
            channels = ["#rust"]
            "##,
        )
        .unwrap();
        config.channels.clear();

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = Ingestor::start(&config, tx).await;
        assert!(matches!(
            result,
            Err(IngestError::Config(ConfigError::Invalid { field: "channels", .. }))
        ));
    }
}
