//! Pendle trading API: request construction and the HTTP client.

mod api;
pub mod operations;
pub mod params;
pub mod read;

pub use api::{PendleApi, TradingApi};
pub use operations::{OpSpec, QuotedOp, QuoteRequest};
pub use read::{ReadOp, ReadQuery};
