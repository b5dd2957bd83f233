//! The supervisory loop of one run.
//!
//! Establishes tunnels, prints one console line per enabled profile, waits
//! for a shutdown request and tears everything down. Console lines go to the
//! given writer; diagnostics go through `tracing`.

use std::io::Write;

use tracing::{debug, info};

use crate::tunnel::orchestrator::TunnelOrchestrator;
use crate::tunnel::registry::TeardownSummary;
use crate::tunnel::session::Transport;
use crate::tunnel::shutdown::ShutdownCoordinator;
use crate::tunnel::source::ProfileEntry;

pub const BANNER: &str = concat!("TinyTunnel ", env!("CARGO_PKG_VERSION"));
pub const WAIT_NOTICE: &str = "When finished press Ctrl+C to close all connections...";
pub const TERMINATE_NOTICE: &str = "Terminating all tunnels please wait...";

/// Write one console line. Console write failures are not fatal.
pub fn emit<W: Write>(out: &mut W, line: &str) {
    if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        debug!("Failed to write console line: {}", e);
    }
}

/// Run establishment, wait for shutdown, then disconnect every tunnel.
///
/// Entries are reported in file order. A shutdown request is checked between
/// entries: the profile being established when it arrives is finished, so its
/// session is either registered or released, and the remaining entries are
/// skipped. Teardown always runs, and its outcome never turns into an error.
pub async fn supervise<T: Transport, W: Write>(
    orchestrator: &mut TunnelOrchestrator<T>,
    entries: Vec<ProfileEntry>,
    shutdown: &ShutdownCoordinator,
    out: &mut W,
) -> TeardownSummary {
    for entry in entries {
        if shutdown.is_requested() {
            info!("Shutdown requested, skipping {} and later profiles", entry.name());
            break;
        }

        if let Some(outcome) = orchestrator.establish_entry(entry).await {
            emit(out, &outcome.to_string());
        }
    }

    if !shutdown.is_requested() {
        for entry in orchestrator.registry().entries() {
            info!(
                "{}: {} -> {} (since {})",
                entry.profile_name, entry.local_addr, entry.remote_addr, entry.connected_at
            );
        }
        info!("{} tunnel(s) active", orchestrator.registry().len());

        emit(out, WAIT_NOTICE);
        shutdown.requested().await;
    }

    emit(out, TERMINATE_NOTICE);
    let summary = orchestrator.disconnect_all().await;
    info!(
        "Teardown complete: {} disconnected, {} already closed, {} failed",
        summary.disconnected, summary.already_closed, summary.failed
    );
    summary
}
