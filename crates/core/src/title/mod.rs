//! Release-name parsing.
//!
//! A small heuristic parser that splits torrent names such as
//! `Show.Name.S02E05.720p.HDTV.x264-GRP` into a title and the usual
//! season / episode / year / resolution markers.

mod parser;

pub use parser::{normalize_title, parse_name, title_case, ParsedName};
