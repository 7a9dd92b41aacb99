//! SwarmHub API client
//!
//! `HttpClient` speaks HTTP; the endpoint groups are traits so the
//! orchestration components can be driven by an in-memory implementation.

pub mod client;
pub mod grids;
pub mod logs;

pub use grids::GridsApi;
pub use logs::{LogSubject, LogsApi};
pub use tests::{ByteStream, TestsApi, UploadForm};

/// Everything the client needs from the server
pub trait SwarmApi: TestsApi + GridsApi + LogsApi {}

impl<T: TestsApi + GridsApi + LogsApi + ?Sized> SwarmApi for T {}
