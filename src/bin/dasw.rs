//! DASW binary entry point
//!
//! Dispatches to daemon mode or one-shot commands based on CLI arguments.
//! One-shot commands are synchronous. The daemon keeps the main thread for
//! display callbacks and starts its own runtime on a worker thread.

use clap::Parser;
use color_eyre::eyre::Result;
use dasw::{cli::Args, cli::Command, commands, config::Config, daemon, logging};

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        // Daemon sets up its own logging (stderr or rotating file)
        Some(Command::Daemon { log_file }) => {
            let config = Config::load()?;
            daemon::run(config, log_file)
        }

        None => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::status(&config, false)
        }

        Some(Command::Status { json }) => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::status(&config, json)
        }

        Some(Command::ListDevices { json }) => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::list_devices(&config, json)
        }

        Some(Command::ListDisplays { json }) => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::list_displays(&config, json)
        }

        Some(Command::Apply { dry_run }) => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::apply(&config, dry_run)
        }

        Some(Command::Switch { target }) => {
            logging::init_command_logging();
            let config = Config::load()?;
            commands::switch(&config, target)
        }

        Some(Command::Validate) => {
            logging::init_command_logging();
            let config = Config::load()?;
            config.print_summary();
            Ok(())
        }
    }
}
