//! Grid and test lifecycle operations
//!
//! Every mutating call issues one request and then refetches the affected
//! list; nothing is updated locally ahead of the server.

pub mod grids;

pub use grids::GridLifecycleManager;
pub use tests::{TestDraft, TestLifecycleManager, TestOptions};
