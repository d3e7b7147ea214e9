mod fixtures;
mod mapper;
mod stub;

pub use fixtures::*;
pub use stub::*;

use log::LevelFilter;
use std::{env, sync::LazyLock};
use strata::Connection;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Common suite every driver runs against a live database.
pub async fn execute_tests<C: Connection>(mut connection: C) {
    let _lock = MUTEX.lock().await;
    mapper::setup(&mut connection)
        .await
        .expect("Could not create the tables");
    mapper::crud(&mut connection)
        .await
        .expect("Create, read, update and delete examples did not succeed");
    mapper::relations(&mut connection)
        .await
        .expect("Relation loading examples did not succeed");
    mapper::batch(&mut connection)
        .await
        .expect("Batch insert examples did not succeed");
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
