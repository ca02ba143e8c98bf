use std::collections::BTreeSet;
use std::time::Duration;

use crate::commands::common::{CliReconciler, CommandContext};
use crate::error::CliError;

pub async fn run_watch(interval_secs: u64, context: &CommandContext) -> Result<(), CliError> {
    let reconciler = context.reconciler().await?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("Watching reminders for profile '{}' (Ctrl-C to stop)", context.profile_name);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            _ = ticker.tick() => {}
        }
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            () = refresh_alarms(&reconciler) => {}
        }
    }

    println!("Stopped watching");
    Ok(())
}

/// Reload records and make the armed alarms match them.
///
/// A failed refresh keeps the alarms armed from the previous cycle.
async fn refresh_alarms(reconciler: &CliReconciler) {
    if let Err(error) = reconciler.refresh().await {
        tracing::warn!(%error, "Refresh failed; keeping armed alarms");
        return;
    }
    let live_ids = reconciler
        .records()
        .iter()
        .map(|record| record.id)
        .collect::<BTreeSet<_>>();
    let scheduler = reconciler.scheduler();
    for stale_id in scheduler
        .platform()
        .armed_ids()
        .into_iter()
        .filter(|id| !live_ids.contains(id))
    {
        scheduler.cancel(stale_id);
    }
    let armed = reconciler.restore_alarms();
    tracing::info!(records = live_ids.len(), armed, "Alarms restored");
}
