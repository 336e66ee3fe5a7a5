//! Typed errors for response normalization
//!
//! HTTP and JSON failures propagate through `anyhow` in the client code;
//! this enum covers the shapes we can name precisely at the reshape seam.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An API tag string that does not name one of the fixed services.
    /// The original helper silently fell through to the last base URL;
    /// here an unmatched tag is a hard error.
    #[error("unknown API category `{0}` (expected TVL, COINS, STABLECOINS, YIELDS or ABI_DECODER)")]
    UnknownApiCategory(String),

    /// A price-response key that does not contain a colon.
    #[error("malformed coin key `{0}`: expected `chain:address`")]
    MalformedCoinKey(String),

    /// An epoch value chrono refuses to map to a UTC timestamp.
    #[error("epoch value {0} is out of range for a UTC timestamp")]
    EpochOutOfRange(i64),

    /// A field the reshape contract requires was absent.
    #[error("missing field `{0}` in response")]
    MissingField(&'static str),

    /// A date string that is not RFC 3339 / `YYYY-MM-DD`-prefixed.
    #[error("unparseable date value `{0}`")]
    BadDate(String),
}
