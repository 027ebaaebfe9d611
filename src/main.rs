//! Trade offer CLI binary

use clap::Parser;
use std::sync::Arc;
use tradeoffer::cli::{run_console, simulate, Cli, Commands, ConfigAction, TradeApp};
use tradeoffer::config::{SettingsStore, TradeSettings, KEY_COOLDOWN, KEY_TIMEOUT, SETTING_KEYS};
use tradeoffer::presence::{LogSink, StdoutSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so console output stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Console => {
            let settings = Arc::new(SettingsStore::load(&cli.settings)?);
            tracing::info!("Starting trade console with {:?}", settings.snapshot());

            let app = TradeApp::new(settings, Arc::new(StdoutSink));
            run_console(app).await?;
        }

        Commands::Config { action } => {
            let store = SettingsStore::load(&cli.settings)?;

            match action {
                ConfigAction::Show => {
                    let current = store.snapshot();
                    for key in SETTING_KEYS {
                        println!("{}", current.describe(key)?);
                    }
                }
                ConfigAction::Get { key } => {
                    println!("{}", store.snapshot().describe(&key)?);
                }
                ConfigAction::Set { key, value } => {
                    let updated = store.set(&key, &value)?;
                    println!("{}", updated.describe(&key)?);
                }
            }
        }

        Commands::Simulate {
            players,
            rounds,
            seed,
            timeout,
            cooldown,
        } => {
            let mut settings = TradeSettings::default();
            settings.set(KEY_TIMEOUT, &timeout.to_string())?;
            settings.set(KEY_COOLDOWN, &cooldown.to_string())?;

            let app = TradeApp::new(
                Arc::new(SettingsStore::in_memory(settings)),
                Arc::new(LogSink),
            );
            let seed = seed.unwrap_or_else(rand::random);

            let report = simulate(&app, players, rounds, seed).await?;
            println!("{}", report);

            if report.still_pending > 0 {
                anyhow::bail!("{} offers outlived their timeout", report.still_pending);
            }
        }
    }

    Ok(())
}
