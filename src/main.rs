use clap::Parser;
use screen_sentinel::cli::commands::{cmd_config, cmd_diff, cmd_history, cmd_inspect};
use screen_sentinel::cli::config::{Cli, Commands, load_config};
use screen_sentinel::logging;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Inspect { entry, store } => {
            cmd_inspect(&config, &entry, store.as_deref())?;
        }
        Commands::Diff { previous, current } => {
            cmd_diff(&config, &previous, &current)?;
        }
        Commands::History {
            entry,
            store,
            failures_only,
        } => {
            cmd_history(&config, &entry, store.as_deref(), failures_only)?;
        }
        Commands::Config => {
            cmd_config(&config)?;
        }
    }

    Ok(())
}
