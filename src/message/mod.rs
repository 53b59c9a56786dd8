//! IRC line parsing: tags, raw segments, and derived message fields.

pub mod nom_parser;
pub mod tags;
mod types;

pub use self::tags::{TagMap, TagValue};
pub use self::types::{ErrorReply, ParsedMessage, Target};
