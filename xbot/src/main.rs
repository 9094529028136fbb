//! xbot - terminal assistant for X
//!
//! Runs the interactive menu by default. Every menu action is also available
//! as a subcommand for scripting.

mod jobs;
mod menu;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use libxbot::config::expand_path;
use libxbot::service::BotService;
use libxbot::social::parse_keywords;
use libxbot::{logging, Config, Credentials, DispatchOutcome, PollOutcome, TrustedSourceStore, XbotError};

use crate::jobs::{with_events, JobControl};
use crate::menu::Menu;

#[derive(Parser, Debug)]
#[command(name = "xbot")]
#[command(version)]
#[command(about = "Post, schedule and automate engagement on X from the terminal")]
#[command(long_about = "\
xbot - terminal assistant for X

DESCRIPTION:
    Without a subcommand xbot opens the interactive menu. Each menu action is
    also available as a subcommand.

    Automated jobs (auto-like, auto-retweet, schedule) run in the foreground.
    Ctrl+C stops the running job; Ctrl+C at a prompt exits.

CREDENTIALS:
    Read from the environment or a .env file in the working directory:
    API_KEY, API_KEY_SECRET, ACCESS_TOKEN, ACCESS_TOKEN_SECRET, BEARER_TOKEN,
    OPENAI_API_KEY, LLM_SECRET_WORD

CONFIGURATION:
    Configuration file: ~/.config/xbot/config.toml (override with XBOT_CONFIG
    or --config)

EXIT CODES:
    0   - Success
    1   - Runtime error
    2   - Missing credentials or authentication failure
    3   - Invalid input
    130 - Interrupted while idle
")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive menu (default)
    Menu,

    /// Post a tweet now
    Post {
        /// Tweet text
        text: String,
    },

    /// Post tweets from a CSV file, one per schedule interval
    Schedule {
        /// CSV file with a `Tweet Text` column and optional `Hashtag1..4`
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,
    },

    /// Like one tweet matching the keywords per cooldown window
    AutoLike {
        /// Comma-separated keywords
        keywords: String,
    },

    /// Retweet one tweet from the trusted sources per cooldown window
    AutoRetweet,

    /// Summarize recent tweets about the keywords
    Summarize {
        /// Comma-separated keywords
        keywords: String,

        /// Post the summary
        #[arg(long)]
        post: bool,
    },

    /// Talk to the language model (the text must contain the secret word)
    Llm {
        #[command(subcommand)]
        action: LlmCommand,
    },

    /// Manage trusted sources (no credentials needed)
    Sources {
        #[command(subcommand)]
        action: SourcesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum LlmCommand {
    /// Get a response to a message
    Respond {
        message: String,

        /// Post the response
        #[arg(long)]
        post: bool,
    },

    /// Generate a tweet from a prompt
    Generate {
        prompt: String,

        /// Post the generated tweet
        #[arg(long)]
        post: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SourcesCommand {
    /// List trusted sources
    List,

    /// Add a trusted source
    Add {
        /// Account handle, with or without a leading @
        handle: String,
    },

    /// Remove a trusted source by its position in `list`
    Remove { position: usize },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<XbotError>()
            .map(XbotError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    logging::init_from_config(&config.logging, cli.verbose)
        .context("Failed to initialize logging")?;

    let command = cli.command.unwrap_or(Command::Menu);
    if let Command::Sources { action } = command {
        return manage_sources(&config, action);
    }

    let jobs = JobControl::new();
    jobs::install_signal_handlers(Arc::clone(&jobs))?;

    let credentials = Credentials::from_env()?;
    let service = BotService::connect(config, credentials).await?;
    if let Some(account) = service.account() {
        println!("Authentication successful for user @{}", account.username);
    }

    match command {
        Command::Menu => Menu::new(service, jobs).run().await,
        Command::Post { text } => {
            let posted = service.post(&text).await?;
            println!("Tweet sent successfully. (ID: {})", posted.id);
            Ok(())
        }
        Command::Schedule { csv } => {
            let items = service.load_schedule(csv.as_deref())?;
            let job = jobs.start();
            let outcome =
                with_events(service.subscribe(), service.run_schedule(items, job.signal())).await;
            match outcome {
                DispatchOutcome::NothingToSend => println!("No tweets to schedule."),
                DispatchOutcome::Completed { .. } => {}
                DispatchOutcome::Cancelled { unsent, .. } => {
                    println!("Scheduler stopped by user ({} tweet(s) not sent)", unsent)
                }
                DispatchOutcome::Terminal(e) => return Err(XbotError::from(e).into()),
            }
            Ok(())
        }
        Command::AutoLike { keywords } => {
            let job = jobs.start();
            let outcome = with_events(
                service.subscribe(),
                service.auto_like(parse_keywords(&keywords), job.signal()),
            )
            .await?;
            finish_poll(outcome)
        }
        Command::AutoRetweet => {
            let job = jobs.start();
            let outcome =
                with_events(service.subscribe(), service.auto_retweet(job.signal())).await?;
            finish_poll(outcome)
        }
        Command::Summarize { keywords, post } => {
            match service.summarize(&parse_keywords(&keywords)).await? {
                Some(summary) => {
                    println!("{}", summary);
                    if post {
                        service.post(&summary).await?;
                        println!("Summary tweeted successfully!");
                    }
                }
                None => println!("No tweets found for the given keywords"),
            }
            Ok(())
        }
        Command::Llm { action } => {
            let (text, post) = match action {
                LlmCommand::Respond { message, post } => (service.respond(&message).await, post),
                LlmCommand::Generate { prompt, post } => {
                    (service.generate_post(&prompt).await, post)
                }
            };
            println!("{}", text);
            if post {
                let posted = service.post(&text).await?;
                println!("Tweet sent successfully. (ID: {})", posted.id);
            }
            Ok(())
        }
        Command::Sources { .. } => unreachable!("handled before connecting"),
    }
}

fn finish_poll(outcome: PollOutcome) -> Result<()> {
    match outcome {
        PollOutcome::Cancelled => Ok(()),
        PollOutcome::Terminal(e) => Err(XbotError::from(e).into()),
    }
}

fn manage_sources(config: &Config, action: SourcesCommand) -> Result<()> {
    let mut store = TrustedSourceStore::load(expand_path(&config.trusted_sources.path))?;

    match action {
        SourcesCommand::List => {
            if store.is_empty() {
                println!("No trusted sources configured.");
            }
            for (i, source) in store.sources().iter().enumerate() {
                println!("{}. {}", i + 1, source);
            }
        }
        SourcesCommand::Add { handle } => {
            if store.add(&handle)? {
                println!("Added {} to trusted sources", handle.trim().trim_start_matches('@'));
            } else {
                println!("{} is blank or already trusted", handle.trim());
            }
        }
        SourcesCommand::Remove { position } => match store.remove(position)? {
            Some(removed) => println!("Removed {} from trusted sources", removed),
            None => println!("No trusted source at position {}", position),
        },
    }
    Ok(())
}
