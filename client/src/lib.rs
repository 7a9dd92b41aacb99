//! SwarmHub client library
//!
//! Submits load tests, provisions grids through a cascading option picker
//! and follows deployment logs of a SwarmHub server.

pub mod app;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod lifecycle;
pub mod logs;
pub mod notify;
pub mod resolver;
pub mod storage;
pub mod tail;
pub mod upload;
pub mod utils;
