use cloud_logging_layer::env::{env_or, GOOGLE_CLOUD_PROJECT_ENV};
use cloud_logging_layer::{critical, try_init, CloudLoggingConfig};
use tracing::{info, info_span, warn};

fn main() {
    let config = CloudLoggingConfig::new(env_or(GOOGLE_CLOUD_PROJECT_ENV, "demo-project"));
    if let Err(e) = try_init(&config) {
        eprintln!("failed to install subscriber: {e}");
        return;
    }

    info!("service starting");

    let request = info_span!(
        "request",
        "trace-id" = "105445aa7843bc8bf206b12000100000",
        "span-id" = "1"
    );
    request.in_scope(|| {
        info!(route = "/checkout", "handling request");
        warn!(latency_ms = 830u64, "slow upstream");
    });

    critical!(component = "payments", "ledger unreachable");
}
