mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stella=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Build { command } => match command {
            BuildCommand::Encode { input } => {
                commands::build::encode(&input)?;
            }

            BuildCommand::Decode { token, compact } => {
                commands::build::decode(&token, compact)?;
            }

            BuildCommand::Validate { files } => {
                commands::build::validate(&files)?;
            }

            BuildCommand::Show {
                token,
                lang,
                database_dir,
            } => {
                let dir = match database_dir {
                    Some(dir) => dir,
                    None => Config::load()?.generator.output_dir,
                };
                commands::build::show(&token, lang, &dir)?;
            }
        },

        Commands::Generate {
            no_assets,
            no_sitemap,
            offline,
            overrides,
        } => {
            let config = Config::load()?.generator(&overrides);
            let follow_up = commands::generate::FollowUp {
                assets: !no_assets,
                sitemap: !no_sitemap,
            };
            commands::generate::generate(config, offline.as_deref(), follow_up)?;
        }

        Commands::Assets { offline, overrides } => {
            let config = Config::load()?.generator(&overrides);
            commands::generate::assets(config, offline.as_deref())?;
        }

        Commands::Schema { out } => {
            commands::schema::handle(&out)?;
        }

        Commands::Configure { show, overrides } => {
            commands::configure::handle(&overrides, show)?;
        }
    }

    Ok(())
}
