mod logging;
mod otel;

pub use logging::init_default_tracing;
pub use otel::{init_otel_tracing, shutdown_otel, OtelGuard};
