//! SwarmHub API models
//!
//! Wire types shared by the SwarmHub client. Field names follow the server's
//! JSON (PascalCase, `ID` suffixes), and decoding is lenient where the server
//! is known to be loose: numbers sent as strings, `null` for empty arrays and
//! epoch-millisecond timestamps.

pub mod models;

pub use models::*;
