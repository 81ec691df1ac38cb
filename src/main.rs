mod data;
mod error;
mod portal;
mod server;
mod solver;

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::RwLock;

use portal::{CsvSnapshot, SlotSource};
use server::AppState;
use solver::SchedulingEngine;

const DEFAULT_SNAPSHOT: &str = "scraped_files/slots.csv";

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let snapshot_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SNAPSHOT.to_string());
    let source = CsvSnapshot::new(&snapshot_path);

    let engine = match source.fetch(&mut |message| info!("{message}")) {
        Ok(load) => {
            if load.rejected > 0 {
                warn!("{} snapshot rows rejected as malformed", load.rejected);
            }
            SchedulingEngine::from_records(load.records)
        }
        Err(reason) => {
            warn!(
                "No usable snapshot at {snapshot_path} ({reason}); starting empty, \
                 POST /v1/timetable/refresh after the next scrape"
            );
            SchedulingEngine::default()
        }
    };

    let state = Arc::new(AppState {
        engine: RwLock::new(engine),
        source,
    });

    server::run_server(state).await;
}
