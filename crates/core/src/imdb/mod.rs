//! IMDB title and keyword lookup tables.

mod index;

pub use index::{ImdbError, ImdbIndex, ImdbStats};
