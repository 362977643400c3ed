//! Core stateless helpers.
//!
//! Match identity and the block-height clock. No I/O, no shared state.

pub mod height;
pub mod locator;

pub use height::{seconds_remaining, BlockClock, DEFAULT_SECONDS_PER_BLOCK};
pub use locator::{join_url, parse_join_url, Locator, LocatorError};
