use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;
use tracing::{debug, error};

use sift_session::settings::Settings;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Initialization error")]
    Initialization,
}

#[tokio::main]
async fn main() {
    let logpath = match get_logging_path() {
        Ok(it) => it,
        Err(_) => return,
    };

    let logfile = tracing_appender::rolling::daily(logpath, "log");
    tracing_subscriber::fmt()
        .compact()
        .with_writer(logfile)
        .init();

    debug!("starting application");

    let mut settings = Settings::default();
    map_args_to_settings(&cli().get_matches(), &mut settings);

    match sift_session::run(settings).await {
        Ok(()) => {
            debug!("closing application");
        }
        Err(err) => {
            error!("closing application with error: {:?}", err);
            eprintln!("sift failed: {}", err);
        }
    }
}

fn cli() -> Command {
    Command::new("sift")
        .about("sift - triage a media library one item at a time")
        .args([
            // NOTE: arguments
            Arg::new("library")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("path of the media library to review"),
            // NOTE: options
            Arg::new("state-path")
                .long("state-path")
                .action(ArgAction::Set)
                .value_parser(value_parser!(PathBuf))
                .help("directory the session state is persisted in"),
            Arg::new("reset")
                .long("reset")
                .action(ArgAction::SetTrue)
                .default_value("false")
                .help("clear all persisted decisions, stats and history before starting"),
        ])
}

fn map_args_to_settings(args: &ArgMatches, settings: &mut Settings) {
    settings.library_path = args.get_one("library").cloned();
    settings.state_path = args.get_one("state-path").cloned();
    settings.reset = args.get_flag("reset");
}

fn get_logging_path() -> Result<String, Error> {
    let cache_dir = match dirs::cache_dir() {
        Some(cache_dir) => match cache_dir.to_str() {
            Some(cache_dir_string) => cache_dir_string.to_string(),
            None => return Err(Error::Initialization),
        },
        None => return Err(Error::Initialization),
    };

    Ok(format!("{}{}", cache_dir, "/sift/logs"))
}
