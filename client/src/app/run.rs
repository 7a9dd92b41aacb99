//! Foreground run loops

use std::future::Future;

use tracing::info;

use crate::tail::{format_log_line, LogTailController, TailPhase, TailView};

/// Print the tail's log lines as they arrive until the session stops or
/// `shutdown` resolves.
///
/// Every fetch replaces the whole history, so only entries past the ones
/// already emitted are handed to `emit`. When `shutdown` wins the tail is
/// stopped before returning. Returns the final view.
pub async fn follow_tail(
    tail: &LogTailController,
    mut emit: impl FnMut(String),
    shutdown: impl Future<Output = ()>,
) -> TailView {
    let mut rx = tail.subscribe();
    let mut emitted = 0usize;
    tokio::pin!(shutdown);

    loop {
        let view = rx.borrow_and_update().clone();
        if view.entries.len() < emitted {
            emitted = 0;
        }
        for entry in &view.entries[emitted..] {
            let line = format_log_line(entry);
            if !line.is_empty() {
                emit(line);
            }
        }
        emitted = view.entries.len();

        if view.phase() != TailPhase::Polling {
            return view;
        }

        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping tail");
                tail.stop();
                return tail.snapshot();
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return tail.snapshot();
                }
            }
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        info!("SIGTERM received, shutting down...");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, shutting down...");
                    }
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
