// quick-term - type a command template, get a ready-to-run shell command
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quick_term_lib::{
    command_input::PasteInput,
    config::{LayeredConfig, Settings},
    core::{
        resolve, ActiveDocument, AutoCdPolicy, ContextDetector, EnvInterpreter, ProcessEnv,
        ResolutionContext, WorkspaceFolder,
    },
    db::HISTORY_KEY,
    history::{self, HistoryEntry},
    session::{Dispatch, Session},
    shell::{ShellDetector, ShellSink, StdoutSink, TerminalSink},
    Database,
};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "quick-term", version, about = "Resolve command templates and keep a history of them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved form of a template without recording it
    Resolve {
        template: String,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Resolve a template, record it and run it in your shell
    Run {
        template: String,
        /// Print the command instead of running it
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Take a command as JSON (string, pattern list or {command, autoExecute})
    Paste {
        input: String,
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Show recorded commands, most recent first
    History {
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
        /// Show the templates instead of what they resolved to
        #[arg(long)]
        original: bool,
    },
    /// Search recorded commands
    Search {
        term: String,
        /// Rank by fuzzy match instead of substring filtering
        #[arg(long)]
        fuzzy: bool,
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },
    /// Forget all recorded commands
    Clear,
}

/// The editor state a template is resolved against
#[derive(Args, Debug)]
struct ContextArgs {
    /// Active file
    #[arg(long)]
    file: Option<PathBuf>,
    /// 1-based cursor line
    #[arg(long, default_value_t = 1)]
    line: usize,
    /// 1-based cursor column
    #[arg(long, default_value_t = 1)]
    column: usize,
    /// Selected text
    #[arg(long)]
    selection: Option<String>,
    /// URI scheme of the active document
    #[arg(long, default_value = "file")]
    scheme: String,
    /// Workspace folder (repeatable); defaults to the enclosing git work tree
    #[arg(long = "workspace")]
    workspaces: Vec<PathBuf>,
    /// none, file, workspace or auto; overrides quickTerm.autoChangeDirectory
    #[arg(long)]
    auto_cd: Option<AutoCdPolicy>,
}

/// Everything a resolution borrows from
struct Environment {
    cwd: PathBuf,
    folders: Vec<WorkspaceFolder>,
    config: LayeredConfig,
    settings: Settings,
}

impl Environment {
    fn load(args: &ContextArgs) -> Result<Self> {
        let cwd = env::current_dir().context("could not read the current directory")?;
        let workspaces: Vec<PathBuf> = args.workspaces.iter().map(|p| absolute(&cwd, p)).collect();
        let folders = ContextDetector::workspace_folders(&workspaces, &cwd);

        let config = match LayeredConfig::load(folders.first().map(|f| f.path.as_path())) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring settings: {}", e.user_message());
                LayeredConfig::default()
            }
        };

        let mut settings = Settings::from_config(&config);
        if let Some(policy) = args.auto_cd {
            settings.auto_cd = policy;
        }

        Ok(Self {
            cwd,
            folders,
            config,
            settings,
        })
    }

    fn document(&self, args: &ContextArgs) -> Option<ActiveDocument> {
        let file = args.file.as_ref()?;
        let path = if args.scheme == "file" {
            absolute(&self.cwd, file)
        } else {
            file.clone()
        };

        let mut document = ActiveDocument::local(path)
            .with_scheme(&args.scheme)
            .with_cursor(args.line.saturating_sub(1), args.column.saturating_sub(1));
        if let Some(selection) = &args.selection {
            document = document.with_selection(selection);
        }
        Some(document)
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    log::debug!("CLI args parsed: {:?}", cli);

    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

async fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve { template, context } => handle_resolve(&template, &context),
        Commands::Run {
            template,
            dry_run,
            context,
        } => handle_run(&template, dry_run, &context).await,
        Commands::Paste {
            input,
            dry_run,
            context,
        } => handle_paste(&input, dry_run, &context).await,
        Commands::History { limit, original } => handle_history(limit, original).await,
        Commands::Search { term, fuzzy, limit } => handle_search(&term, fuzzy, limit).await,
        Commands::Clear => handle_clear().await,
    }
}

fn handle_resolve(template: &str, args: &ContextArgs) -> Result<()> {
    let environment = Environment::load(args)?;
    let interpreter = EnvInterpreter::new(&ProcessEnv);
    let ctx = resolution_context(&environment, args, &interpreter);

    let resolution = resolve(template, &ctx);
    for warning in &resolution.warnings {
        eprintln!("warning: {}", warning);
    }
    StdoutSink::new().send(&resolution.resolved_text, false)?;

    Ok(())
}

async fn handle_run(template: &str, dry_run: bool, args: &ContextArgs) -> Result<()> {
    let environment = Environment::load(args)?;
    let interpreter = EnvInterpreter::new(&ProcessEnv);
    let ctx = resolution_context(&environment, args, &interpreter);

    let db = open_database().await;
    let mut session = Session::new(&environment.settings)
        .with_history(load_history(db.as_ref()).await)
        .with_auto_submit(!dry_run);

    session.set_input(template);
    let dispatch = session.accept(&ctx);
    save_history(db.as_ref(), session.history().entries()).await;

    match dispatch {
        Some(dispatch) => send(dispatch, &environment),
        None => Ok(()), // nothing typed, nothing to do
    }
}

async fn handle_paste(raw: &str, dry_run: bool, args: &ContextArgs) -> Result<()> {
    let input = PasteInput::parse(raw).map_err(|e| anyhow::anyhow!(e.user_message()))?;

    let environment = Environment::load(args)?;
    let interpreter = EnvInterpreter::new(&ProcessEnv);
    let ctx = resolution_context(&environment, args, &interpreter);

    let db = open_database().await;
    let mut session = Session::new(&environment.settings)
        .with_history(load_history(db.as_ref()).await)
        .with_auto_submit(!dry_run);

    match session.paste(input, &ctx) {
        Some(dispatch) => {
            save_history(db.as_ref(), session.history().entries()).await;
            send(dispatch, &environment)
        }
        None => {
            // not auto-executed: hand the template back for editing
            println!("{}", session.input());
            Ok(())
        }
    }
}

async fn handle_history(limit: usize, original: bool) -> Result<()> {
    let db = open_database().await;
    let entries = load_history(db.as_ref()).await;

    if entries.is_empty() {
        println!("No commands recorded yet.");
        return Ok(());
    }

    println!("\nRecent commands:");
    println!("{}", "=".repeat(60));
    for (i, entry) in entries.iter().rev().take(limit).enumerate() {
        let shown = if original { &entry.original } else { &entry.expanded };
        println!("{:3}. {}", i + 1, shown);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_search(term: &str, fuzzy: bool, limit: usize) -> Result<()> {
    let db = open_database().await;
    let store = history::HistoryStore::from_entries(load_history(db.as_ref()).await, usize::MAX);

    let results: Vec<HistoryEntry> = if fuzzy {
        history::fuzzy(&store, term, limit)
            .into_iter()
            .map(|scored| scored.entry)
            .collect()
    } else {
        let mut search = history::SearchSession::new();
        search.enter(&store);
        search.update_term(&store, term);
        search.results().iter().take(limit).cloned().collect()
    };

    if results.is_empty() {
        println!("No commands found matching '{}'", term);
        return Ok(());
    }

    println!("\nFound {} command(s) matching '{}':", results.len(), term);
    println!("{}", "=".repeat(60));
    for (i, entry) in results.iter().enumerate() {
        if entry.original == entry.expanded {
            println!("{:3}. {}", i + 1, entry.expanded);
        } else {
            println!("{:3}. {}  <- {}", i + 1, entry.expanded, entry.original);
        }
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_clear() -> Result<()> {
    let db = open_database()
        .await
        .context("history database is not available")?;
    let removed = db.clear_history(HISTORY_KEY).await?;
    println!("Removed {} command(s) from history.", removed);
    Ok(())
}

fn resolution_context<'a>(
    environment: &'a Environment,
    args: &ContextArgs,
    interpreter: &'a EnvInterpreter<'a>,
) -> ResolutionContext<'a> {
    let mut ctx = ResolutionContext::new(&ProcessEnv, &environment.config)
        .with_workspace_folders(environment.folders.clone())
        .with_auto_cd(environment.settings.auto_cd)
        .with_interpreter(interpreter)
        .with_cwd(&environment.cwd.to_string_lossy());

    if let Some(document) = environment.document(args) {
        ctx = ctx.with_document(document);
    }
    ctx
}

fn send(dispatch: Dispatch, environment: &Environment) -> Result<()> {
    for warning in &dispatch.warnings {
        eprintln!("warning: {}", warning);
    }

    let shell = ShellDetector::detect_or_default(&ProcessEnv);
    let mut sink = ShellSink::new(shell).with_cwd(environment.cwd.clone());
    sink.send(&dispatch.command, dispatch.auto_submit)?;

    match sink.last_exit_code() {
        Some(code) if code != 0 => std::process::exit(code),
        _ => Ok(()),
    }
}

// History is nice to have. If the database is unavailable, keep going
// with an in-memory history for this run.
async fn open_database() -> Option<Database> {
    let path = Database::default_path()?;
    match Database::new(&path).await {
        Ok(db) => Some(db),
        Err(e) => {
            log::warn!("{}", e.user_message());
            None
        }
    }
}

async fn load_history(db: Option<&Database>) -> Vec<HistoryEntry> {
    let Some(db) = db else {
        return Vec::new();
    };
    db.load_history(HISTORY_KEY).await.unwrap_or_else(|e| {
        log::warn!("{}", e.user_message());
        Vec::new()
    })
}

async fn save_history(db: Option<&Database>, entries: &[HistoryEntry]) {
    if let Some(db) = db {
        if let Err(e) = db.save_history(HISTORY_KEY, entries).await {
            log::warn!("{}", e.user_message());
        }
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
