use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tb_telemetry_export::config::ExportConfig;
use tb_telemetry_export::console::Terminal;
use tb_telemetry_export::export;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tb_telemetry_export=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ExportConfig::default();
    info!("Exporting telemetry from {}", config.base_url);

    let mut terminal = Terminal::new();
    match export::run(&config, &mut terminal, &Local).await {
        // platform-reported failures end the run without a failing exit status
        Err(e) if e.is_recoverable() => {
            error!("{:?}", anyhow::Error::new(e));
            Ok(())
        }
        result => Ok(result?),
    }
}
