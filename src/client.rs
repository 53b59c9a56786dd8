//! Connection driver: the producer side of the pipeline.
//!
//! [`Client`] owns the framed connection and a [`Session`]. It feeds every
//! received line to the session, writes the lines the session (and the
//! NAMES scheduler) asks for, and pushes accepted messages onto the
//! hand-off queue.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::line::LineCodec;
use crate::pipeline::IngestQueue;
use crate::state::{Session, SessionAction};

/// Reason given in the QUIT sent on shutdown.
pub const QUIT_REASON: &str = "ingestion stopped";

enum Flow {
    Continue,
    Stop,
}

/// Drives one IRC connection until stop, server close, or error.
pub struct Client<S> {
    framed: Framed<S, LineCodec>,
    session: Session,
    queue: IngestQueue,
    outbound: mpsc::UnboundedReceiver<String>,
    registered: watch::Sender<bool>,
    stop: CancellationToken,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// `outbound` carries lines from other tasks (the NAMES scheduler);
    /// `registered` is set to `true` once the server welcomes us.
    pub fn new(
        stream: S,
        session: Session,
        queue: IngestQueue,
        outbound: mpsc::UnboundedReceiver<String>,
        registered: watch::Sender<bool>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            framed: Framed::new(stream, LineCodec::new()),
            session,
            queue,
            outbound,
            registered,
            stop,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        for action in self.session.start() {
            self.apply(action).await?;
        }

        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => {
                    let quit = self.session.quit(QUIT_REASON);
                    if let Err(e) = self.send(quit).await {
                        debug!(error = %e, "failed to send QUIT");
                    }
                    info!("connection stopped");
                    return Ok(());
                }
                Some(line) = self.outbound.recv() => {
                    self.send(line).await?;
                }
                frame = self.framed.next() => {
                    let line = match frame {
                        Some(Ok(line)) => line,
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            info!("server closed the connection");
                            return Ok(());
                        }
                    };

                    for action in self.session.feed(&line) {
                        if let Flow::Stop = self.apply(action).await? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn apply(&mut self, action: SessionAction) -> Result<Flow> {
        match action {
            SessionAction::Send(line) => {
                self.send(line).await?;
            }
            SessionAction::Enqueue(msg) => {
                if !self.queue.push_message(*msg) {
                    warn!("ingest queue closed, dropping connection");
                    return Ok(Flow::Stop);
                }
            }
            SessionAction::Registered => {
                self.registered.send_replace(true);
            }
            SessionAction::Terminated(reason) => {
                info!(reason = %reason, "session terminated by server");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, line: String) -> Result<()> {
        if line.starts_with("PASS ") {
            debug!("-> PASS ****");
        } else {
            debug!(line = %line, "->");
        }
        self.framed.send(line).await?;
        Ok(())
    }
}
