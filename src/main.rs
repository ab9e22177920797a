use resultwalk::config::{self, Config};
use resultwalk::core::db::{ResultWalker, SqliteStatement, StatementGuard, Transcript};
use resultwalk::core::{Result, WalkError};
use rusqlite::Connection;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: resultwalk [--config <file>] [--json] <database> <sql>...";

fn main() -> ExitCode {
    // Logs go to stderr so stdout only carries the transcript
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let mut config_path = None;
    let mut json = false;
    let mut positional = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => config_path = Some(path.clone()),
                None => return Err(usage()),
            },
            "--json" => json = true,
            _ => positional.push(arg.as_str()),
        }
    }

    let (db_path, statements) = match positional.split_first() {
        Some((db_path, statements)) if !statements.is_empty() => (*db_path, statements),
        _ => return Err(usage()),
    };

    let config = match config_path {
        Some(path) => config::load_config(path)?,
        None => match config::default_config_path().filter(|path| path.exists()) {
            Some(path) => config::load_config(path)?,
            None => Config::default(),
        },
    };
    let walker = config.walker();

    info!("Opening database: {}", db_path);
    let conn = Connection::open(db_path)?;

    for sql in statements {
        let transcript = walk_one(&walker, &conn, sql);
        match transcript {
            Ok(transcript) => print_transcript(&transcript, json)?,
            Err((transcript, e)) => {
                print_transcript(&transcript, json)?;
                return Err(e);
            }
        }
    }
    Ok(())
}

fn walk_one(
    walker: &ResultWalker,
    conn: &Connection,
    sql: &str,
) -> std::result::Result<Transcript, (Transcript, WalkError)> {
    let mut statement = SqliteStatement::new(conn, sql);
    let mut guard = StatementGuard::new(&mut statement);
    let mut transcript = Transcript::new();
    match walker.walk(&mut *guard, None, &mut transcript) {
        Ok(()) => Ok(transcript),
        Err(e) => Err((transcript, e)),
    }
}

fn print_transcript(transcript: &Transcript, json: bool) -> Result<()> {
    if json {
        println!("{}", transcript.to_json()?);
    } else {
        for notice in &transcript.notices {
            eprintln!("{}", notice);
        }
        if !transcript.outcomes.is_empty() {
            println!("{}", transcript.render());
        }
    }
    Ok(())
}

fn usage() -> WalkError {
    WalkError::Config(USAGE.to_string())
}
