mod commands;

use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Publishes simulated sensor telemetry over MQTT.
///
/// The broker is configured through MQTT_HOST, MQTT_USERNAME, MQTT_PASSWORD
/// and MQTT_CLIENT_ID.
#[derive(Parser)]
#[command(name = "simclient", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known scenarios
    List(ListCommand),
    /// Run scenarios until they finish or Ctrl-C is pressed
    Run(RunCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simclient=info,sensorpulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List(cmd) => cmd.execute()?,
        Commands::Run(cmd) => {
            if !cmd.execute().await? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "simclient",
            "run",
            "kitchen",
            "--dry-run",
            "--seed",
            "9",
            "-d",
            "scenarios",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.names, vec!["kitchen"]);
                assert!(cmd.dry_run);
                assert_eq!(cmd.seed, Some(9));
                assert_eq!(cmd.scenario_dir.as_deref(), Some(std::path::Path::new("scenarios")));
            }
            Commands::List(_) => panic!("expected run"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_seed() {
        assert!(Cli::try_parse_from(["simclient", "run", "--seed", "soon"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
