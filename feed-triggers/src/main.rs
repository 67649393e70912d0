use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use feed_triggers::console::{ConsoleCommand, HELP};
use feed_triggers::{AppConfig, CycleReport, TestRunOptions, TriggerManager, TriggerStatus};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, Level};

/// Watch feeds and turn new articles into summarized notes
#[derive(Parser, Debug)]
#[command(name = "feed-triggers")]
#[command(version)]
#[command(about = "Watch feeds and turn new articles into summarized notes", long_about = None)]
struct Args {
    /// Config file (default: $FEED_TRIGGERS_CONFIG or ./feed-triggers.json)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured triggers
    List,

    /// Run one trigger once in test mode
    Test {
        /// Trigger id
        id: String,

        /// Maximum number of items to process (default: 2)
        #[arg(short, long, value_name = "NUM")]
        max_items: Option<usize>,

        /// Summarize without writing notes
        #[arg(long)]
        dry_run: bool,
    },

    /// Start triggers and keep polling until quit or Ctrl-C
    Run {
        /// Only start this trigger
        #[arg(long, value_name = "ID")]
        only: Option<String>,
    },
}

fn init_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_status(id: &str, status: &TriggerStatus) {
    println!(
        "{:<20} {:<8} last: {:<19}  next: {}",
        id,
        if status.running { "running" } else { "stopped" },
        format_time(status.last_check),
        format_time(status.next_check)
    );
}

fn print_report(id: &str, report: &CycleReport) {
    println!("Test run of {}:", id);
    println!("  items in feed:         {}", report.items_in_feed);
    println!("  without identifier:    {}", report.unidentifiable);
    println!("  new:                   {}", report.new_items);
    println!("  cap:                   {}", report.cap);
    println!("  skipped over cap:      {}", report.deferred);
    println!("  skipped without link:  {}", report.skipped_without_link);
    println!("  processed:             {}", report.delivered);
    println!("  failed:                {}", report.failed);
}

fn list(config: &AppConfig) {
    if config.triggers.is_empty() {
        println!("No triggers configured");
        return;
    }
    for trigger in &config.triggers {
        println!(
            "{:<20} {:<6} {:<9} {:<16} {:<14} {}",
            trigger.id,
            trigger.kind,
            if trigger.enabled { "enabled" } else { "disabled" },
            trigger.schedule.as_deref().unwrap_or("-"),
            trigger.profile,
            trigger.feed_url.as_deref().unwrap_or("-")
        );
    }
}

async fn prepare(config: &AppConfig) -> anyhow::Result<TriggerManager> {
    let mut manager = TriggerManager::new(config.clone());
    manager.initialize().context("failed to initialize trigger manager")?;
    manager.load_triggers(config.triggers.clone()).await?;
    Ok(manager)
}

/// Returns `false` when the console should exit.
async fn handle_console(manager: &TriggerManager, line: &str) -> bool {
    let command = match ConsoleCommand::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return true,
        Err(message) => {
            println!("{}", message);
            return true;
        }
    };

    match command {
        ConsoleCommand::Status => {
            for (id, status) in manager.get_trigger_status() {
                print_status(&id, &status);
            }
        }
        ConsoleCommand::List => {
            for id in manager.list_triggers() {
                println!("{}", id);
            }
        }
        ConsoleCommand::Start { id: None } => {
            manager.start_all_triggers().await;
        }
        ConsoleCommand::Start { id: Some(id) } => {
            if let Err(e) = manager.start_trigger(&id).await {
                println!("{}", e);
            }
        }
        ConsoleCommand::Stop { id: None } => {
            manager.stop_all_triggers().await;
        }
        ConsoleCommand::Stop { id: Some(id) } => {
            if let Err(e) = manager.stop_trigger(&id).await {
                println!("{}", e);
            }
        }
        ConsoleCommand::Test { id, max_items } => {
            let options = TestRunOptions {
                max_items,
                dry_run: false,
            };
            match manager.test_trigger(&id, options).await {
                Ok(report) => print_report(&id, &report),
                Err(e) => println!("{}", e),
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return false,
    }
    true
}

async fn run(config: &AppConfig, only: Option<String>) -> anyhow::Result<()> {
    let manager = prepare(config).await?;
    match only {
        Some(id) => manager.start_trigger(&id).await?,
        None => {
            manager.start_all_triggers().await;
        }
    }

    info!("Running; type 'help' for commands, Ctrl-C to exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_console(&manager, &line).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    error!("Failed to read console input: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    manager.cleanup().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let path = AppConfig::resolve_path(args.config.as_deref());
    let config = AppConfig::load(&path).with_context(|| format!("failed to load config {}", path.display()))?;

    match args.command {
        Command::List => list(&config),
        Command::Test { id, max_items, dry_run } => {
            let manager = prepare(&config).await?;
            let report = manager.test_trigger(&id, TestRunOptions { max_items, dry_run }).await;
            manager.cleanup().await;
            print_report(&id, &report?);
        }
        Command::Run { only } => run(&config, only).await?,
    }
    Ok(())
}
