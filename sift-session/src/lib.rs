use std::path::PathBuf;

use sift_media::{FileDecoder, MediaCache};
use tokio::io::{AsyncBufReadExt, BufReader};

use catalog::{Catalog, Filter};
use error::AppError;
use model::decision::Decision;
use model::stats::format_bytes;
use session::Session;
use settings::Settings;
use source::FsAssetSource;
use store::{FileStore, StateStore};

pub mod catalog;
pub mod error;
pub mod model;
pub mod session;
pub mod settings;
pub mod source;
pub mod store;
mod view;

pub async fn run(settings: Settings) -> Result<(), AppError> {
    let library = settings
        .library_path
        .clone()
        .ok_or(AppError::InvalidLibraryPath)?;
    let state_path = resolve_state_path(&settings)?;

    tracing::debug!("starting session over {:?}", library);

    let store = StateStore::new(FileStore::new(state_path)?);
    let cache = MediaCache::new(FileDecoder);
    let catalog = Catalog::new(FsAssetSource::new(library)?);

    let mut session = Session::new(catalog, store, cache.clone());
    if settings.reset {
        session.reset()?;
    }

    session.load().await?;

    view::print_overview(&session);
    view::print_current(&session, &cache).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Decide(decision) => {
                if session.decide(decision)? {
                    view::print_current(&session, &cache).await;
                } else {
                    println!("nothing left to decide");
                }
            }
            Command::Undo => {
                if session.undo()? {
                    println!("took back the last decision");
                    view::print_current(&session, &cache).await;
                } else {
                    println!("nothing to undo");
                }
            }
            Command::Filter(filter, year) => {
                session.apply_filter(filter, year)?;
                view::print_overview(&session);
                view::print_current(&session, &cache).await;
            }
            Command::Trash => view::print_items("trash", &session.trash_items()),
            Command::Pile => view::print_items("maybe pile", &session.maybe_pile_items()),
            Command::Restore => {
                let ids = session.marked_ids();
                session.restore(&ids)?;
                println!("restored {} items", ids.len());
            }
            Command::Commit => {
                let ids = session.marked_ids();
                match session.commit_deletion_batch(&ids).await {
                    Ok(bytes) => {
                        println!("deleted {} items, freed {}", ids.len(), format_bytes(bytes))
                    }
                    Err(AppError::DeletionFailed { ids }) => {
                        println!(
                            "deletion failed, nothing was unmarked — {} items can be retried",
                            ids.len()
                        )
                    }
                    Err(error) => return Err(error),
                }
            }
            Command::Groups => view::print_groups(&session.grouped()),
            Command::Stats => view::print_stats(&session.stats()),
            Command::Years => view::print_years(session.available_years()),
            Command::Detail => view::print_detail(&session, &cache).await,
            Command::Refresh => {
                session.refresh().await?;
                view::print_overview(&session);
                view::print_current(&session, &cache).await;
            }
            Command::Reset => {
                session.reset()?;
                println!("all session state cleared");
                view::print_overview(&session);
            }
            Command::Help => view::print_help(),
            Command::Quit => break,
            Command::Empty => {}
            Command::Unknown => println!("unknown command, h for help"),
        }
    }

    Ok(())
}

#[derive(Debug, Eq, PartialEq)]
enum Command {
    Decide(Decision),
    Undo,
    Filter(Filter, Option<i32>),
    Trash,
    Pile,
    Restore,
    Commit,
    Groups,
    Stats,
    Years,
    Detail,
    Refresh,
    Reset,
    Help,
    Quit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();

    match parts.next() {
        None => Command::Empty,
        Some("k") | Some("keep") => Command::Decide(Decision::Keep),
        Some("d") | Some("delete") => Command::Decide(Decision::Delete),
        Some("m") | Some("maybe") => Command::Decide(Decision::Maybe),
        Some("u") | Some("undo") => Command::Undo,
        Some("f") | Some("filter") => match parts.next().and_then(Filter::parse) {
            Some(filter) => {
                let year = parts.next().and_then(|year| year.parse().ok());
                Command::Filter(filter, year)
            }
            None => Command::Unknown,
        },
        Some("t") | Some("trash") => Command::Trash,
        Some("p") | Some("pile") => Command::Pile,
        Some("restore") => Command::Restore,
        Some("commit") => Command::Commit,
        Some("g") | Some("groups") => Command::Groups,
        Some("s") | Some("stats") => Command::Stats,
        Some("years") => Command::Years,
        Some("detail") => Command::Detail,
        Some("refresh") => Command::Refresh,
        Some("reset") => Command::Reset,
        Some("h") | Some("help") => Command::Help,
        Some("q") | Some("quit") => Command::Quit,
        Some(_) => Command::Unknown,
    }
}

fn resolve_state_path(settings: &Settings) -> Result<PathBuf, AppError> {
    if let Some(path) = &settings.state_path {
        return Ok(path.clone());
    }

    match dirs::data_dir() {
        Some(data_dir) => Ok(data_dir.join("sift/state")),
        None => Err(AppError::StateDirUnresolved),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn commands_parse_with_short_and_long_forms() {
        assert_eq!(Command::Decide(Decision::Keep), parse_command("k"));
        assert_eq!(Command::Decide(Decision::Delete), parse_command("delete"));
        assert_eq!(Command::Undo, parse_command("u"));
        assert_eq!(Command::Quit, parse_command("quit"));
        assert_eq!(Command::Empty, parse_command("   "));
        assert_eq!(Command::Unknown, parse_command("wat"));
    }

    #[test]
    fn filter_command_takes_selector_and_year() {
        assert_eq!(
            Command::Filter(Filter::Screenshots, None),
            parse_command("f screenshots")
        );
        assert_eq!(
            Command::Filter(Filter::All, Some(2021)),
            parse_command("filter all 2021")
        );
        assert_eq!(Command::Unknown, parse_command("f nonsense"));
    }
}
