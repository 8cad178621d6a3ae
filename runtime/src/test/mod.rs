use std::sync::Arc;

use clarray_device::{HostDriver, SessionConfig};

use crate::Engine;


/// Engine on a fresh host driver, with the driver kept for its counters.
pub fn host_engine() -> (Arc<HostDriver>, Engine) {
    host_engine_with(HostDriver::new())
}

pub fn host_engine_with(driver: HostDriver) -> (Arc<HostDriver>, Engine) {
    init_tracing();
    let driver = Arc::new(driver);
    let engine = Engine::new(driver.clone(), SessionConfig::default());
    (driver, engine)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
