use std::process::ExitCode;

use clap::{Parser, Subcommand};
use vitals_client::ProbeClient;

#[derive(Parser)]
#[command(name = "vitals-cli")]
#[command(about = "Query a running vitals probe", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the health endpoint; exits non-zero unless the probe answers 2xx
    State {
        #[arg(short, long, default_value = "/_health")]
        path: String,
    },
    /// Print the monitor's counters and timers
    Details {
        #[arg(short, long, default_value = "/_health/details")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ProbeClient::new(&cli.url);

    match cli.command {
        Commands::State { path } => {
            let report = client.probe(&path).await?;
            println!(
                "{} {}",
                report.status.as_u16(),
                report.state.as_deref().unwrap_or(&report.body)
            );
            if report.is_healthy() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Details { path } => {
            let details = client.details(&path).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
