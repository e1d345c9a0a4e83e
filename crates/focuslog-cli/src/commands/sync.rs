use std::env;
use std::path::Path;
use std::sync::Arc;

use focuslog_core::auth::{StaticTokens, TokenProvider};
use focuslog_core::remote::ApiClient;
use focuslog_core::sync::{
    ConnectivityMonitor, Outcome, SchedulerConfig, SyncEngine, SyncScheduler, SyncTrigger,
    TriggerOutcome,
};

use crate::commands::common::{format_millis, open_store};
use crate::error::CliError;

pub async fn run_now(db_path: &Path) -> Result<(), CliError> {
    let api_url = env::var("FOCUSLOG_API_URL").map_err(|_| CliError::SyncNotConfigured)?;
    let token = env::var("FOCUSLOG_TOKEN").map_err(|_| CliError::SyncNotConfigured)?;

    let store = open_store(db_path).await?;
    let auth: Arc<dyn TokenProvider> = Arc::new(StaticTokens::new(token));
    let client = ApiClient::new(api_url, auth.clone())?;
    let engine = SyncEngine::new(store.clone(), Arc::new(client));
    let connectivity = Arc::new(ConnectivityMonitor::new(true));
    let scheduler = SyncScheduler::new(
        engine,
        store,
        auth,
        connectivity,
        SchedulerConfig::default(),
    );

    match scheduler.trigger(SyncTrigger::Manual).await? {
        TriggerOutcome::Ran(report) => {
            println!(
                "Sync finished: {} synced, {} skipped, {} failed",
                report.synced(),
                report.skipped(),
                report.failed()
            );
            for record in &report.outcomes {
                if let Outcome::Failed(reason) = &record.outcome {
                    let id = record
                        .local_id
                        .map_or_else(String::new, |id| format!(" {id}"));
                    println!("  failed: {}{id}: {reason}", record.entity);
                }
            }
        }
        TriggerOutcome::Skipped(reason) => println!("Sync skipped: {reason}"),
    }
    Ok(())
}

pub async fn run_status(db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;

    let last_sync = store
        .last_sync_at()
        .await?
        .map_or_else(|| "never".to_string(), format_millis);
    let pending_projects = store.pending_projects().await?.len();
    let pending_tasks =
        store.pending_task_creates().await?.len() + store.pending_task_updates().await?.len();
    let pending_sessions = store.pending_sessions().await?.len();
    let event_backlogs = store.sessions_with_unsynced_events().await?.len();

    println!("Last successful sync: {last_sync}");
    println!("Pending projects:     {pending_projects}");
    println!("Pending tasks:        {pending_tasks}");
    println!("Pending sessions:     {pending_sessions}");
    println!("Sessions with events: {event_backlogs}");
    Ok(())
}
