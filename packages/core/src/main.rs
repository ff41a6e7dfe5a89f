use clap::Parser;
use dotenvy::dotenv;

use eth_gas_model::cli::Cli;
use eth_gas_model::config::Config;
use eth_gas_model::error::AppError;
use eth_gas_model::logging::init_logging;
use eth_gas_model::pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv().ok();
    init_logging();
    let cli = Cli::parse();

    let config = Config::from_env()
        .and_then(|config| config.with_overrides(&cli))
        .map_err(AppError::Config)
        .unwrap_or_else(|err| {
            tracing::error!("{}", err);
            std::process::exit(1);
        });

    tracing::info!("Starting model run with config: {:?}", config);

    let report = pipeline::run(&config).await.unwrap_or_else(|err| {
        tracing::error!("{}", err);
        std::process::exit(1);
    });

    if cli.json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(err) => {
                tracing::error!("Failed to serialise report: {}", err);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report);
    }
}
