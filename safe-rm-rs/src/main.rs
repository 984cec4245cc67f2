use std::collections::HashMap;
use std::env;
use std::io;

use chrono::Utc;
use clap::Parser;
use safe_rm_core::prelude::*;
use safe_rm_core::telemetry::init_tracing;
use tracing::info_span;

/// safe rm wrapper: confirms every deletion and moves it to a restorable trash.
#[derive(Debug, Parser)]
#[command(name = "safe-rm", version, about)]
struct Cli {
    /// Remove directories and their contents.
    #[arg(short = 'r', visible_short_alias = 'R', long)]
    recursive: bool,

    /// Ignore nonexistent files.
    #[arg(short, long)]
    force: bool,

    /// Increase diagnostic output (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List items currently in the trash.
    #[arg(long = "list-trash")]
    list_trash: bool,

    /// Restore an item to its original location.
    #[arg(long, value_name = "TRASH_ID")]
    restore: Option<String>,

    /// Show details of one trash item as JSON.
    #[arg(long, value_name = "TRASH_ID")]
    info: Option<String>,

    /// Show installation status and trash location.
    #[arg(long)]
    status: bool,

    /// Permanently remove items older than the retention window.
    #[arg(long = "clean-old")]
    clean_old: bool,

    /// Retention window for --clean-old, in days.
    #[arg(long, requires = "clean_old", value_name = "DAYS")]
    days: Option<u64>,

    /// Files or directories to move to the trash.
    paths: Vec<String>,
}

impl Cli {
    fn command(&self) -> CommandKind {
        if self.list_trash {
            CommandKind::List
        } else if self.restore.is_some() {
            CommandKind::Restore
        } else if self.info.is_some() {
            CommandKind::Info
        } else if self.status {
            CommandKind::Status
        } else if self.clean_old {
            CommandKind::Clean
        } else {
            CommandKind::Delete
        }
    }
}

fn worse(a: ExitStatusLike, b: ExitStatusLike) -> ExitStatusLike {
    match (a, b) {
        (ExitStatusLike::Error, _) | (_, ExitStatusLike::Error) => ExitStatusLike::Error,
        (ExitStatusLike::Warning, _) | (_, ExitStatusLike::Warning) => ExitStatusLike::Warning,
        _ => ExitStatusLike::Ok,
    }
}

fn delete_all(ctx: &SafeRmContext, cli: &Cli) -> ExitStatusLike {
    if cli.paths.is_empty() {
        eprintln!("safe-rm: missing operand\nTry 'safe-rm --help' for more information.");
        return ExitStatusLike::Error;
    }

    let store = TrashStore::new(&ctx.config);
    let policy = ProtectionPolicy::from_config(&ctx.config);
    let engine = DeletionEngine::new(ctx, &store, &policy);
    let stdin = io::stdin();
    let mut prompter = StreamPrompter::new(stdin.lock(), io::stderr());
    let mut rng = rand::thread_rng();

    let mut status = ExitStatusLike::Ok;
    for path in &cli.paths {
        match engine.delete(path, cli.recursive, &mut prompter, &mut rng) {
            Ok(entry) => println!("{}", entry.trash_id),
            Err(CoreError::NotFound(_)) if cli.force => {}
            Err(err) => {
                eprintln!("safe-rm: {path}: {err}");
                status = worse(status, err.exit_status());
            }
        }
    }
    status
}

fn run_command(ctx: &SafeRmContext, cli: &Cli) -> Result<ExitStatusLike> {
    let store = TrashStore::new(&ctx.config);
    let queries = RestoreEngine::new(ctx, &store);
    match cli.command() {
        CommandKind::Delete => return Ok(delete_all(ctx, cli)),
        CommandKind::List => println!("{}", format_listing(&queries.list()?, Utc::now())),
        CommandKind::Restore => {
            let trash_id = TrashId::parse(cli.restore.as_deref().unwrap_or_default())?;
            println!("{}", queries.restore(&trash_id)?);
        }
        CommandKind::Info => println!(
            "{}",
            get_trash_info(ctx, cli.info.as_deref().unwrap_or_default())?
        ),
        CommandKind::Status => println!("{}", queries.status()?),
        CommandKind::Clean => {
            let days = cli.days.unwrap_or(ctx.config.retention_days);
            let report = RetentionSweeper::new(&store).clean_old(days)?;
            println!("{report}");
            if !report.failed.is_empty() {
                return Ok(ExitStatusLike::Error);
            }
        }
    }
    Ok(ExitStatusLike::Ok)
}

fn run() -> ExitStatusLike {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let environ: HashMap<String, String> = env::vars().collect();
    let config = match SafeRmConfig::from_environ(&environ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("safe-rm: {err}");
            return ExitStatusLike::Error;
        }
    };
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("safe-rm: cannot determine current directory: {err}");
            return ExitStatusLike::Error;
        }
    };
    let ctx = SafeRmContext::new(config, cwd);

    let command = cli.command();
    let _span = info_span!("safe-rm", command = %command).entered();
    match run_command(&ctx, &cli) {
        Ok(status) => status,
        Err(err) => {
            eprintln!("safe-rm: {err}");
            err.exit_status()
        }
    }
}

fn main() {
    std::process::exit(i32::from(run().as_code()));
}
