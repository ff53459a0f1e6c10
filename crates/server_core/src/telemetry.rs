//! Telemetry bootstrap for every process (tracing + optional Prometheus metrics).

use anyhow::Result;
use data_runtime::configs::telemetry::TelemetryCfg;

pub struct TelemetryGuard;

pub fn init_telemetry(cfg: &TelemetryCfg) -> Result<TelemetryGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = if cfg.json_logs { fmt::layer().json().boxed() } else { fmt::layer().boxed() };
    // A second init in the same process (tests, embedded nodes) keeps the first subscriber.
    let fresh = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init().is_ok();
    if let Some(addr) = &cfg.metrics_addr {
        let addr = match addr.parse() {
            Ok(a) => a,
            Err(_e) => {
                metrics::counter!("server.errors_total", "site" => "telemetry.parse_addr").increment(1);
                std::net::SocketAddr::from(([127, 0, 0, 1], 9100))
            }
        };
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        if let Err(e) = builder.with_http_listener(addr).install() {
            tracing::warn!(target: "telemetry", error = %e, %addr, "metrics exporter not installed");
        }
    }
    tracing::info!(
        target: "telemetry",
        log_level = %cfg.log_level,
        json_logs = cfg.json_logs,
        metrics_addr = ?cfg.metrics_addr,
        fresh,
        "telemetry initialized"
    );
    Ok(TelemetryGuard)
}
