//! Interrupt handling for in-flight downloads.
//!
//! The first SIGINT/SIGTERM (Ctrl+C/Ctrl+Break on Windows) cancels a
//! [`CancellationToken`] that the download loop watches. A second one exits
//! the process immediately with [`EXIT_CANCELLED`].

use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::io;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Process exit code reserved for cancellation.
pub const EXIT_CANCELLED: i32 = 130;

/// Owns the signal-listening task and the token it cancels.
pub struct CancellationSupervisor {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl CancellationSupervisor {
    /// Listens for OS interrupt signals. Must be called within a tokio runtime.
    pub fn install() -> io::Result<Self> {
        let signals = os_signals()?;
        Ok(Self::spawn(signals, || {
            std::process::exit(EXIT_CANCELLED);
        }))
    }

    /// Supervises an arbitrary signal stream; `force_exit` runs on the second signal.
    pub fn spawn<S, F>(signals: S, force_exit: F) -> Self
    where
        S: Stream<Item = &'static str> + Send + Unpin + 'static,
        F: FnOnce() + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(supervise(token.clone(), signals, force_exit));
        Self { token, task }
    }

    /// A handle to pass into [`Fetcher::fetch`](super::engine::Fetcher::fetch).
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for CancellationSupervisor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn supervise<S, F>(token: CancellationToken, mut signals: S, force_exit: F)
where
    S: Stream<Item = &'static str> + Unpin,
    F: FnOnce(),
{
    let Some(signal) = signals.next().await else {
        return;
    };
    info!(signal, "Interrupt received, cancelling download");
    token.cancel();

    if let Some(signal) = signals.next().await {
        warn!(signal, "Second interrupt received, exiting immediately");
        force_exit();
    }
}

#[cfg(unix)]
fn os_signals() -> io::Result<BoxStream<'static, &'static str>> {
    use tokio::signal::unix::{signal, SignalKind};

    let sigint = signal(SignalKind::interrupt())?;
    let sigterm = signal(SignalKind::terminate())?;

    Ok(stream::unfold((sigint, sigterm), |(mut sigint, mut sigterm)| async move {
        let name = tokio::select! {
            Some(()) = sigint.recv() => "SIGINT",
            Some(()) = sigterm.recv() => "SIGTERM",
            else => return None,
        };
        Some((name, (sigint, sigterm)))
    })
    .boxed())
}

#[cfg(windows)]
fn os_signals() -> io::Result<BoxStream<'static, &'static str>> {
    use tokio::signal::windows;

    let ctrl_c = windows::ctrl_c()?;
    let ctrl_break = windows::ctrl_break()?;

    Ok(stream::unfold((ctrl_c, ctrl_break), |(mut ctrl_c, mut ctrl_break)| async move {
        let name = tokio::select! {
            Some(()) = ctrl_c.recv() => "Ctrl+C",
            Some(()) = ctrl_break.recv() => "Ctrl+Break",
            else => return None,
        };
        Some((name, (ctrl_c, ctrl_break)))
    })
    .boxed())
}
