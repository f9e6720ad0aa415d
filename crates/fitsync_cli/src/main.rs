//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire the core against SQLite files for one user and print a summary.
//! - Exit non-zero on configuration or database errors.
//!
//! Usage: `fitsync_cli [config.json] <user-uuid>`

use fitsync_core::{
    CoreConfig, DietSync, EvolutionSync, LogNotifier, SessionHandle, SqliteLocalCache,
    SqliteRemoteStore, SyncDeps, WeekSync,
};
use std::process::ExitCode;
use std::rc::Rc;
use uuid::Uuid;

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("fitsync_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    let (config_path, user_arg) = match args.as_slice() {
        [user] => (None, user),
        [config, user] => (Some(config), user),
        _ => return Err("usage: fitsync_cli [config.json] <user-uuid>".to_string()),
    };
    let user_id = Uuid::parse_str(user_arg.trim())
        .map_err(|err| format!("invalid user id `{user_arg}`: {err}"))?;

    let config = match config_path {
        Some(path) => CoreConfig::load(path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };
    if let Some(log_dir) = &config.log_dir {
        fitsync_core::init_logging(&config.log_level, log_dir)?;
    }

    let store = SqliteRemoteStore::open(&config.remote_db_path).map_err(|err| err.to_string())?;
    let cache = SqliteLocalCache::open(&config.cache_db_path).map_err(|err| err.to_string())?;
    let session = Rc::new(SessionHandle::signed_in(user_id));
    let deps = SyncDeps::new(session, Rc::new(store), Rc::new(cache), Rc::new(LogNotifier));

    let mut weeks = WeekSync::new(deps.clone());
    let mut diet = DietSync::new(deps.clone());
    let mut evolution = EvolutionSync::new(deps);
    weeks.initialize().map_err(|err| err.to_string())?;
    diet.initialize().map_err(|err| err.to_string())?;
    evolution.initialize().map_err(|err| err.to_string())?;

    log::info!("event=cli_summary module=cli status=ok user_id={user_id}");
    println!("fitsync_core version={}", fitsync_core::core_version());
    println!("user={user_id}");
    println!(
        "weeks={} days={}",
        weeks.weeks().len(),
        weeks
            .tree()
            .iter()
            .map(|week| week.days.len())
            .sum::<usize>()
    );
    println!(
        "meals={} diary_entries={}",
        diet.meals().len(),
        diet.diary_entries().len()
    );
    println!(
        "evolution_weeks={} photos={}",
        evolution.weeks().len(),
        evolution.photos().len()
    );
    Ok(())
}
