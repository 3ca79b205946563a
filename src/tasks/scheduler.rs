use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::tasks::reconciliation;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::with_capacity(1);

    if state.settings().reconciliation().enabled {
        handles.push(tokio::spawn(reconcile_loop(state.clone(), shutdown_rx)));
    } else {
        tracing::info!("Assignment file reconciliation disabled");
    }

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn reconcile_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().reconciliation().interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds = period.as_secs(), "Reconciliation loop started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                match reconciliation::sweep(&state).await {
                    Ok(report) => {
                        metrics::counter!("assignment_file_reconcile_runs_total").increment(1);
                        tracing::debug!(scanned = report.scanned, "Reconciliation sweep finished");
                    }
                    Err(err) => tracing::error!(error = %err, "Reconciliation sweep failed"),
                }
            }
        }
    }

    tracing::info!("Reconciliation loop stopped");
}
