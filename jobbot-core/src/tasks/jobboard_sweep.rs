// jobbot-core/src/tasks/jobboard_sweep.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::error;

use crate::jobboard::JobBoardService;

/// Spawns a background task that periodically ages expired for-hire posts
/// off the board.
pub fn spawn_sweep_task(service: Arc<JobBoardService>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        // The first tick completes immediately; skip it so the sweep does
        // not race the bootstrap load.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_aged().await {
                error!("Aged job post sweep failed: {e:?}");
            }
        }
    })
}
