// Auto-ingest scanner
// Polls an area's inbox and enqueues every new deposit directory on its own

use super::{Area, ImportRequest};
use crate::application::constants::ERROR_RECOVERY_SLEEP_DURATION;
use crate::application::ingest::run_blocking;
use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::DepositStore;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub struct AutoIngestScanner {
    area: Arc<Area>,
    store: Arc<dyn DepositStore>,
    poll_interval: Duration,
    /// Deposits submitted and still present in the inbox
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl AutoIngestScanner {
    pub fn new(area: Arc<Area>, store: Arc<dyn DepositStore>, poll_interval: Duration) -> Self {
        Self {
            area,
            store,
            poll_interval,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Scan until shutdown is signalled
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            inbox = %self.area.config().inbox.display(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Auto-ingest scanner started"
        );

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let pause = match self.scan_once().await {
                Ok(submitted) => {
                    if submitted > 0 {
                        debug!(submitted, "Auto-ingest scan submitted deposits");
                    }
                    self.poll_interval
                }
                Err(e) => {
                    error!(error = %e, "Auto-ingest scan failed");
                    ERROR_RECOVERY_SLEEP_DURATION.max(self.poll_interval)
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!("Auto-ingest scanner stopped");
    }

    /// One pass over the inbox; returns how many deposits were submitted
    pub async fn scan_once(&self) -> Result<usize> {
        let inbox = self.area.config().inbox.clone();
        let candidates = run_blocking(&self.store, move |store| {
            Ok(store
                .list_deposit_dirs(&inbox)?
                .into_iter()
                .map(|dir| {
                    let ready = store.is_deposit_dir(&dir);
                    (dir, ready)
                })
                .collect::<Vec<_>>())
        })
        .await?;

        let mut in_flight = self.in_flight.lock().await;
        // Relocated deposits are gone from the inbox
        in_flight.retain(|dir| candidates.iter().any(|(d, _)| d == dir));

        let mut submitted = 0;
        for (dir, ready) in candidates {
            if !ready || in_flight.contains(&dir) {
                continue;
            }
            let request = ImportRequest {
                path: dir.clone(),
                single_deposit: true,
                continue_previous: true,
            };
            match self.area.start_import(request).await {
                Ok(_) => {
                    in_flight.insert(dir);
                    submitted += 1;
                }
                Err(e) => {
                    warn!(deposit = %dir.display(), error = %e, "Auto-ingest could not start deposit");
                }
            }
        }
        Ok(submitted)
    }

    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}
