//! LlamaPull Library
//!
//! Pulls DeFi market data from DeFi Llama and Dune Analytics and reshapes
//! the JSON responses into tabular row records for downstream plotting.

pub mod config;
pub mod dune;
pub mod error;
pub mod format;
pub mod llama;
pub mod normalize;
pub mod types;
