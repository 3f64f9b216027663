mod cmd;

use clap::Parser;
use cmd::config::{Effective, QueryArgs};

#[derive(Parser)]
#[command(
    name = "telemetry-query",
    about = "Generate a synthetic telemetry dataset, filter it, aggregate it and page through the result"
)]
struct Cli {
    #[command(flatten)]
    args: QueryArgs,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cmd::query::run(&eff).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
