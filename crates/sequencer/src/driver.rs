//! Cooperative scheduler for sequencer sessions.

use crate::backend::ExportBackend;
use crate::fs::FileSystem;
use crate::host::HostContext;
use crate::sequencer::{BatchOutcome, SequencerSession, Tick};

/// Tick `session` until it reports [`Tick::Done`], sleeping for each
/// requested delay in between.
///
/// Cancellation through a [`crate::sequencer::StopHandle`] is observed at
/// the next tick.
pub async fn drive(
    session: &mut SequencerSession,
    host: &mut dyn HostContext,
    backend: &mut dyn ExportBackend,
    fs: &dyn FileSystem,
) -> BatchOutcome {
    tokio::time::sleep(session.first_delay()).await;

    loop {
        match session.tick(host, backend, fs) {
            Tick::Reschedule(delay) => {
                tracing::trace!(delay_ms = delay.as_millis() as u64, "Next tick scheduled");
                tokio::time::sleep(delay).await;
            }
            Tick::Done => break,
        }
    }

    let outcome = session.outcome();
    tracing::debug!(?outcome, "Sequencer session finished");
    outcome
}

/// Drive `session` while a Ctrl-C stops it cooperatively.
pub async fn drive_until_interrupted(
    session: &mut SequencerSession,
    host: &mut dyn HostContext,
    backend: &mut dyn ExportBackend,
    fs: &dyn FileSystem,
) -> BatchOutcome {
    let handle = session.stop_handle();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && handle.stop() {
            tracing::info!("Interrupt received; stopping after the current tick");
        }
    });

    let outcome = drive(session, host, backend, fs).await;
    watcher.abort();
    outcome
}
