//! Fuzz target for IRC line parsing
//!
//! Parsing is total: every input must yield a message without panicking,
//! and feeding it through a session and the stats aggregator must not
//! panic either.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_ingest::{ChannelStatsAggregator, ParsedMessage, PlainCodec, Record};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);

    let msg: ParsedMessage = match input.parse() {
        Ok(msg) => msg,
        Err(never) => match never {},
    };
    assert!(msg.params.len() <= 15);

    let _ = msg.target();
    let _ = msg.display_message();
    let _ = Record::from_message(&msg, &PlainCodec, "fuzz:6667");

    let mut stats = ChannelStatsAggregator::new("fuzz:6667");
    let _ = stats.observe(&msg);
});
