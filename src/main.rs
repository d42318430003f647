use clap::Parser;
use log::{error, info};
use sipot_validator::configuration::config::{CliArgs, Config};
use sipot_validator::logging;
use sipot_validator::web_interface::web_server::WebServer;

#[tokio::main]
async fn main() {
    // Get command-line arguments
    let args = CliArgs::parse();

    let config = Config::from_args(&args).unwrap_or_else(|e| {
        eprintln!("Unable to import configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.ensure_directories() {
        eprintln!("Unable to prepare working directories: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = logging::init(&config.log_dir, config.log_retention_days) {
        eprintln!("Unable to initialize logging: {}", e);
        std::process::exit(1);
    }

    println!(
        "
==============================================================================
                  Sistema de Validación de Formatos SIPOT v{}
==============================================================================
",
        env!("CARGO_PKG_VERSION")
    );

    info!("Configuration imported successfully");
    info!(
        "Working directories: uploads={} downloads={} logs={} static={}",
        config.upload_dir.display(),
        config.download_dir.display(),
        config.log_dir.display(),
        config.static_dir.display()
    );

    let server = WebServer::from_config(config).unwrap_or_else(|e| {
        error!("Unable to create the web server: {}, exiting...", e);
        std::process::exit(1);
    });

    if let Err(e) = server.start().await {
        error!("Web server stopped: {}, exiting...", e);
        std::process::exit(1);
    }
}
