//! Full ingestion sessions against a scripted server over an in-memory
//! duplex stream.
//!
//! Run with: `cargo test --test client_session`

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use slirc_ingest::{Config, Ingestor, LineCodec, Record};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Server {
    framed: Framed<DuplexStream, LineCodec>,
}

impl Server {
    async fn expect(&mut self, expected: &str) {
        let line = tokio::time::timeout(TIMEOUT, self.framed.next())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"))
            .expect("client closed the connection")
            .expect("invalid line from client");
        assert_eq!(line, expected);
    }

    async fn send(&mut self, line: &str) {
        self.framed.send(line.to_string()).await.unwrap();
    }
}

fn config(extra: &str) -> Config {
    Config::from_toml(&format!(
        r##"
        host = "irc.example.com"
        nick = "logbot"
        channels = ["#rust", "#secret hunter2"]
        poll_interval_ms = 50
        {extra}
        "##
    ))
    .unwrap()
}

async fn next_record(rx: &mut mpsc::UnboundedReceiver<Record>) -> Record {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a record")
        .expect("record output closed")
}

async fn register(server: &mut Server, caps: &str) {
    server.expect("CAP LS 302").await;
    server.expect("NICK logbot").await;
    server.expect("USER logstash 0 * :logstash").await;
    server.send(&format!(":irc.example.com CAP * LS :{caps}")).await;
}

#[tokio::test]
async fn test_full_session_with_stats() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut server = Server {
        framed: Framed::new(server_io, LineCodec::new()),
    };
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let handle = Ingestor::start_with_stream(&config("get_stats = true"), client_io, out_tx);

    register(&mut server, "multi-prefix sasl extended-join").await;
    server.expect("CAP REQ :multi-prefix sasl").await;
    server.send(":irc.example.com CAP logbot ACK :multi-prefix sasl").await;
    server.expect("CAP END").await;

    server.send(":irc.example.com 001 logbot :Welcome to the network").await;
    server.expect("JOIN #rust").await;
    server.expect("JOIN #secret hunter2").await;
    server.expect("NAMES #rust").await;
    server.expect("NAMES #secret").await;

    server.send(":irc.example.com 353 logbot = #rust :a b c").await;
    server.send(":irc.example.com 353 logbot = #rust :d e f g").await;
    server.send(":irc.example.com 366 logbot #rust :End of /NAMES list.").await;

    let stats = next_record(&mut out_rx).await;
    assert_eq!(stats.get_str("channel"), Some("#rust"));
    assert_eq!(stats.get("users"), Some(&Value::from(7)));
    assert_eq!(stats.get_str("server"), Some("irc.example.com:6667"));

    server.send("@user-id=99 :nick!user@host PRIVMSG #rust :hello there").await;
    let record = next_record(&mut out_rx).await;
    assert_eq!(record.get_str("message"), Some("hello there"));
    assert_eq!(record.get_str("nick"), Some("nick"));
    assert_eq!(record.get_str("user_id"), Some("99"));

    server.send("PING :irc.example.com").await;
    server.expect("PONG :irc.example.com").await;

    handle.stop().await;
    server.expect("QUIT :ingestion stopped").await;
}

#[tokio::test]
async fn test_no_common_caps_ends_immediately() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut server = Server {
        framed: Framed::new(server_io, LineCodec::new()),
    };
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    let handle = Ingestor::start_with_stream(&config(""), client_io, out_tx);

    register(&mut server, "chghost extended-join").await;
    server.expect("CAP END").await;

    server.send(":irc.example.com 001 logbot :Welcome").await;
    server.expect("JOIN #rust").await;
    server.expect("JOIN #secret hunter2").await;

    handle.stop().await;
    server.expect("QUIT :ingestion stopped").await;
}

#[tokio::test]
async fn test_filtered_mode_skips_private_messages() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut server = Server {
        framed: Framed::new(server_io, LineCodec::new()),
    };
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let handle = Ingestor::start_with_stream(&config(""), client_io, out_tx);

    register(&mut server, "").await;
    server.expect("CAP END").await;
    server.send(":irc.example.com 001 logbot :Welcome").await;

    server.send(":nick!user@host PRIVMSG logbot :private").await;
    server.send(":nick!user@host PRIVMSG #rust :\x01ACTION waves\x01").await;

    let record = next_record(&mut out_rx).await;
    assert_eq!(record.get_str("message"), Some("waves"));
    assert_eq!(record.get_str("channel"), Some("#rust"));

    handle.stop().await;
}

#[tokio::test]
async fn test_nick_collision_retries() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut server = Server {
        framed: Framed::new(server_io, LineCodec::new()),
    };
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    let handle = Ingestor::start_with_stream(&config(""), client_io, out_tx);

    register(&mut server, "").await;
    server.expect("CAP END").await;
    server.send(":irc.example.com 433 * logbot :Nickname is already in use").await;
    server.expect("NICK logbot_").await;

    handle.stop().await;
}

#[tokio::test]
async fn test_server_close_is_observed() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let mut server = Server {
        framed: Framed::new(server_io, LineCodec::new()),
    };
    let (out_tx, _out_rx) = mpsc::unbounded_channel();
    let handle = Ingestor::start_with_stream(&config(""), client_io, out_tx);

    server.expect("CAP LS 302").await;
    drop(server);

    tokio::time::timeout(TIMEOUT, handle.closed())
        .await
        .expect("closed connection was not observed");
    assert!(handle.is_closed());
    handle.stop().await;
}
