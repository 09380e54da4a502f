use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tiffin::consts::{self, SESSION_SWEEP_INTERVAL, kitchen_tz};
use tiffin::engine::{Engine, InboundMessage, Orchestrator};
use tiffin::intent::gemini::GeminiExtractor;
use tiffin::session::SessionStore;
use tiffin::store::OrderStore;
use tiffin::store::sqlite::SqliteStore;
use tiffin::summary;

#[derive(Parser)]
#[command(name = "tiffin", version, about = "Order-taking brain for a shared-kitchen meal bot.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database path (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<String>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,

    /// Messaging handle to chat as
    #[arg(long, default_value = "local")]
    handle: String,

    /// Display name to chat as
    #[arg(long)]
    name: Option<String>,

    /// Send a single message and exit (non-interactive)
    #[arg(short, long)]
    run: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Meal counts and money total for a date (default: tomorrow)
    Summary {
        #[arg(long)]
        date: Option<String>,
    },
    /// Who ordered what for a date, and who has not ordered yet
    Report {
        #[arg(long)]
        date: Option<String>,
    },
    /// List a user's orders, optionally for one month (YYYY-MM)
    Orders {
        handle: String,
        #[arg(long)]
        month: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => {
            let path = consts::default_db_path();
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            path.to_string_lossy().into_owned()
        }
    };
    let store: Arc<dyn OrderStore> = Arc::new(SqliteStore::new(&db_path)?);

    if let Some(command) = &cli.command {
        return run_command(command, store.as_ref()).await;
    }

    let api_key = std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
        .context("GEMINI_API_KEY is not set")?;
    let extractor = Box::new(GeminiExtractor::new(cli.model.clone(), api_key));

    let sessions = Arc::new(SessionStore::new());
    sessions.start(SESSION_SWEEP_INTERVAL);

    let engine = Orchestrator::new(extractor, store, Arc::clone(&sessions));

    // Single message mode
    if let Some(text) = cli.run {
        let outcome = engine.handle(&message(&cli.handle, cli.name.clone(), &text)).await;
        println!("{}", outcome.reply());
        sessions.stop();
        return Ok(());
    }

    // REPL — async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\ntiffin> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "quit" || text == "exit" {
            break;
        }

        let outcome = engine.handle(&message(&cli.handle, cli.name.clone(), text)).await;
        println!("\n=> {}", outcome.reply());
    }

    sessions.stop();
    Ok(())
}

fn message(handle: &str, name: Option<String>, text: &str) -> InboundMessage {
    InboundMessage {
        handle: handle.to_string(),
        name,
        text: text.to_string(),
        received_at: Utc::now(),
    }
}

/// CLI date argument, defaulting to tomorrow in kitchen time.
fn parse_date_arg(arg: Option<&str>) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date: {raw} (expected YYYY-MM-DD)")),
        None => Ok(Utc::now().with_timezone(&kitchen_tz()).date_naive() + Days::new(1)),
    }
}

async fn run_command(command: &Command, store: &dyn OrderStore) -> anyhow::Result<()> {
    match command {
        Command::Summary { date } => {
            let date = parse_date_arg(date.as_deref())?;
            let s = summary::daily_summary(store, date).await?;
            println!("{}", s.date);
            println!("  breakfast: {}", s.breakfast);
            println!("  lunch:     {}", s.lunch);
            println!("  dinner:    {}", s.dinner);
            println!("  total:     {}", s.total);
        }
        Command::Report { date } => {
            let date = parse_date_arg(date.as_deref())?;
            let report = summary::daily_report(store, date).await?;
            println!("{}: {} order(s)", report.date, report.orders.len());
            for (user, order) in &report.orders {
                println!("  {} ({}): {}", user.name, user.handle, order.meals());
            }
            if !report.missing.is_empty() {
                println!("missing ({}):", report.missing.len());
                for user in &report.missing {
                    println!("  {} ({})", user.name, user.handle);
                }
            }
        }
        Command::Orders { handle, month } => {
            let orders = match month {
                Some(month) => {
                    let (year, month) = parse_month_arg(month)?;
                    match summary::monthly_orders(store, handle, year, month).await? {
                        Some((_, orders)) => orders,
                        None => anyhow::bail!("unknown user: {handle}"),
                    }
                }
                None => {
                    let user = store
                        .find_user(handle)
                        .await?
                        .with_context(|| format!("unknown user: {handle}"))?;
                    store.orders_for_user(user.id).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&orders)?);
        }
    }
    Ok(())
}

fn parse_month_arg(raw: &str) -> anyhow::Result<(i32, u32)> {
    let (year, month) = raw
        .split_once('-')
        .with_context(|| format!("invalid month: {raw} (expected YYYY-MM)"))?;
    Ok((year.parse()?, month.parse()?))
}
