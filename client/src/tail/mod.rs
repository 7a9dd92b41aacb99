//! Live deployment log tailing

pub mod controller;
pub mod format;
pub mod fsm;

pub use controller::{LogTailController, TailOptions, TailView};
pub use format::{format_log_line, strip_ansi};
pub use fsm::{TailEvent, TailFsm, TailPhase};
