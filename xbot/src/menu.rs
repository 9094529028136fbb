//! Interactive numbered menus

use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;

use libxbot::service::BotService;
use libxbot::social::parse_keywords;
use libxbot::{DispatchOutcome, PollOutcome, XbotError};
use tracing::info;

use crate::jobs::{with_events, JobControl};

pub struct Menu {
    service: BotService,
    jobs: Arc<JobControl>,
}

/// Print `label`, read one line; `None` on end of input
fn prompt(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn confirm(label: &str) -> Result<bool> {
    Ok(prompt(label)?.is_some_and(|answer| answer.eq_ignore_ascii_case("y")))
}

/// Print an error returned by a menu action and keep going
fn report(error: &XbotError) {
    match error {
        XbotError::InvalidInput(msg) => println!("{}", msg),
        other => println!("Error: {}", other),
    }
}

impl Menu {
    pub fn new(service: BotService, jobs: Arc<JobControl>) -> Self {
        Self { service, jobs }
    }

    pub async fn run(&self) -> Result<()> {
        println!("Bot is running...");
        info!("Bot started.");

        loop {
            println!("\n=== X Bot Menu ===");
            println!("1. Send a tweet from terminal input");
            println!("2. Send scheduled tweets from CSV");
            println!("3. Use LLM interface");
            println!("4. Automated features");
            println!("5. Exit");

            let Some(choice) = prompt("Enter your choice (1-5): ")? else {
                break;
            };
            match choice.as_str() {
                "1" => {
                    if let Some(text) = prompt("Enter your tweet: ")? {
                        self.send(&text).await;
                    }
                }
                "2" => self.scheduled_tweets().await,
                "3" => self.llm_menu().await?,
                "4" => self.automated_menu().await?,
                "5" => break,
                _ => println!("Invalid choice. Please enter 1-5."),
            }
        }

        println!("Exiting the bot. Goodbye!");
        info!("Bot exited by user.");
        Ok(())
    }

    async fn send(&self, text: &str) {
        match self.service.post(text).await {
            Ok(_) => println!("Tweet sent successfully."),
            Err(e) => report(&e),
        }
    }

    async fn scheduled_tweets(&self) {
        let items = match self.service.load_schedule(None) {
            Ok(items) => items,
            Err(e) => return report(&e),
        };

        println!("Press Ctrl+C to stop the scheduler");
        let job = self.jobs.start();
        let outcome = with_events(
            self.service.subscribe(),
            self.service.run_schedule(items, job.signal()),
        )
        .await;
        drop(job);

        match outcome {
            DispatchOutcome::NothingToSend => println!("No tweets to schedule."),
            DispatchOutcome::Completed { .. } => {}
            DispatchOutcome::Cancelled { unsent, .. } => {
                println!("Scheduler stopped by user ({} tweet(s) not sent)", unsent)
            }
            DispatchOutcome::Terminal(e) => {
                println!("Authentication error: {}", e);
            }
        }
    }

    async fn llm_menu(&self) -> Result<()> {
        loop {
            println!("\n=== LLM Interface ===");
            println!("1. Get LLM response");
            println!("2. Generate tweet");
            println!("3. Return to main menu");

            let Some(choice) = prompt("Enter your choice (1-3): ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => {
                    let Some(message) = prompt("Enter your message (include secret word): ")?
                    else {
                        return Ok(());
                    };
                    let response = self.service.respond(&message).await;
                    println!("\nLLM Response: {}", response);

                    if confirm("\nWould you like to tweet this response? (y/n): ")? {
                        self.send(&response).await;
                    }
                }
                "2" => {
                    let Some(request) =
                        prompt("Enter tweet generation prompt (include secret word): ")?
                    else {
                        return Ok(());
                    };
                    let tweet = self.service.generate_post(&request).await;
                    println!("\nGenerated Tweet: {}", tweet);

                    if confirm("\nWould you like to post this tweet? (y/n): ")? {
                        self.send(&tweet).await;
                    }
                }
                "3" => return Ok(()),
                _ => println!("Invalid choice. Please enter 1-3."),
            }
        }
    }

    async fn automated_menu(&self) -> Result<()> {
        loop {
            println!("\n=== Automated Features Menu ===");
            println!("1. Auto-like tweets with keywords");
            println!("2. Auto-retweet trusted sources");
            println!("3. Create content summary");
            println!("4. Manage trusted sources");
            println!("5. Return to main menu");

            let Some(choice) = prompt("Enter your choice (1-5): ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => {
                    let Some(input) = prompt("Enter keywords to monitor (comma-separated): ")?
                    else {
                        return Ok(());
                    };
                    self.auto_like(parse_keywords(&input)).await;
                }
                "2" => self.auto_retweet().await,
                "3" => self.summary().await?,
                "4" => self.trusted_sources_menu()?,
                "5" => return Ok(()),
                _ => println!("Invalid choice. Please enter 1-5."),
            }
        }
    }

    async fn auto_like(&self, keywords: Vec<String>) {
        if keywords.is_empty() {
            println!("No valid keywords provided");
            return;
        }
        println!("\nMonitoring for keywords: {}", keywords.join(", "));
        println!("Press Ctrl+C to stop monitoring");

        let job = self.jobs.start();
        let outcome = with_events(
            self.service.subscribe(),
            self.service.auto_like(keywords, job.signal()),
        )
        .await;
        drop(job);

        self.report_poll(outcome);
    }

    async fn auto_retweet(&self) {
        let sources = self.service.sources();
        if sources.is_empty() {
            println!("No trusted sources configured. Please add some first.");
            return;
        }
        println!("\nMonitoring trusted sources: {}", sources.join(", "));
        println!("Press Ctrl+C to stop monitoring");

        let job = self.jobs.start();
        let outcome = with_events(
            self.service.subscribe(),
            self.service.auto_retweet(job.signal()),
        )
        .await;
        drop(job);

        self.report_poll(outcome);
    }

    fn report_poll(&self, outcome: libxbot::Result<PollOutcome>) {
        match outcome {
            Ok(PollOutcome::Cancelled) => {}
            Ok(PollOutcome::Terminal(e)) => {
                println!("Authentication error. Please check your credentials: {}", e)
            }
            Err(e) => report(&e),
        }
    }

    async fn summary(&self) -> Result<()> {
        let Some(input) = prompt("Enter keywords for content summary (comma-separated): ")? else {
            return Ok(());
        };

        match self.service.summarize(&parse_keywords(&input)).await {
            Ok(Some(summary)) => {
                println!("\nGenerated Summary:\n{}", summary);
                if confirm("\nWould you like to tweet this summary? (y/n): ")? {
                    match self.service.post(&summary).await {
                        Ok(_) => println!("Summary tweeted successfully!"),
                        Err(e) => report(&e),
                    }
                }
            }
            Ok(None) => println!("No tweets found for the given keywords"),
            Err(e) => report(&e),
        }
        Ok(())
    }

    fn trusted_sources_menu(&self) -> Result<()> {
        loop {
            println!("\n=== Trusted Sources Management ===");
            println!("Current trusted sources:");
            for (i, source) in self.service.sources().iter().enumerate() {
                println!("{}. {}", i + 1, source);
            }
            println!("\n1. Add trusted source");
            println!("2. Remove trusted source");
            println!("3. Return to main menu");

            let Some(choice) = prompt("\nEnter your choice (1-3): ")? else {
                return Ok(());
            };
            match choice.as_str() {
                "1" => {
                    let Some(handle) = prompt("Enter username to add (without @): ")? else {
                        return Ok(());
                    };
                    match self.service.add_source(&handle) {
                        Ok(true) => println!("Added {} to trusted sources", handle.trim_start_matches('@')),
                        Ok(false) => println!("{} is blank or already trusted", handle),
                        Err(e) => report(&e),
                    }
                }
                "2" => {
                    if self.service.sources().is_empty() {
                        println!("No trusted sources to remove");
                        continue;
                    }
                    let Some(input) = prompt("Enter number to remove: ")? else {
                        return Ok(());
                    };
                    let Ok(position) = input.parse::<usize>() else {
                        println!("Please enter a number");
                        continue;
                    };
                    match self.service.remove_source(position) {
                        Ok(Some(removed)) => println!("Removed {} from trusted sources", removed),
                        Ok(None) => println!("No trusted source at position {}", position),
                        Err(e) => report(&e),
                    }
                }
                "3" => return Ok(()),
                _ => println!("Invalid choice. Please enter 1-3."),
            }
        }
    }
}
