//! Swipe Feed console driver
//!
//! Browses the catalog for one user from a terminal: one card at a time, decided with a
//! typed command instead of a swipe.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swipe_feed::{
    init_store, Config, Decision, Facet, FeedError, FilterCriteria, HttpCatalogClient, Item,
    SwipeSession,
};

const HELP: &str = "commands: l(ike) | d(islike) | f [facet=value ...] | r(etry) | s(tats) | clear | q(uit)";

#[derive(Debug, PartialEq)]
enum Command {
    Like,
    Dislike,
    Filter(FilterCriteria),
    Retry,
    Stats,
    Clear,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let command = match words.next().unwrap_or("") {
        "l" | "like" => Command::Like,
        "d" | "dislike" => Command::Dislike,
        "r" | "retry" => Command::Retry,
        "s" | "stats" => Command::Stats,
        "clear" => Command::Clear,
        "q" | "quit" => Command::Quit,
        "" | "h" | "help" => Command::Help,
        "f" | "filter" => {
            let mut filter = FilterCriteria::new();
            for pair in words {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected facet=value, got {:?}", pair))?;
                let facet = Facet::from_wire_name(name)
                    .ok_or_else(|| format!("unknown facet {:?}", name))?;
                filter.set(facet, value);
            }
            return Ok(Command::Filter(filter));
        }
        other => return Err(format!("unknown command {:?}", other)),
    };
    Ok(command)
}

fn print_card(session: &SwipeSession) {
    match session.current() {
        Some(item) => println!("{}", describe(&item)),
        None => {
            let state = session.state();
            if let Some(error) = &state.error {
                println!("Failed to load items ({}). Type r to retry.", error.message());
            } else if state.is_loading {
                println!("Loading more items...");
            } else if !state.has_more {
                println!("No more items. You've seen everything for the current filters.");
            } else {
                println!("Queue is empty.");
            }
        }
    }
}

fn describe(item: &Item) -> String {
    let facets: Vec<&str> = [
        item.category.as_deref(),
        item.kind.as_deref(),
        item.season.as_deref(),
        item.basecolour.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    let name = item.name.as_deref().unwrap_or("(unnamed)");
    format!("[{}] {} ({})", item.id, name, facets.join(", "))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Swipe Feed for user {}", config.user_id);
    tracing::info!("Catalog URL: {}", config.api_url);
    tracing::info!("Store path: {:?}", config.db_path);

    let store = Arc::new(init_store(&config.db_path).await?);
    let client = Arc::new(HttpCatalogClient::new(&config.api_url, config.api_timeout)?);
    let session = SwipeSession::new(config.user_id, client, store, config.queue);

    if let Err(e) = session.ensure_loaded().await {
        tracing::warn!("Initial load failed: {}", e);
    }

    println!("{}", HELP);
    print_card(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        let outcome: Result<(), FeedError> = match command {
            Command::Like => session.swipe(Decision::Like).await.map(|_| ()),
            Command::Dislike => session.swipe(Decision::Dislike).await.map(|_| ()),
            Command::Filter(filter) => session.apply_filters(filter).await.map(|_| ()),
            Command::Retry => session.retry().await.map(|_| ()),
            Command::Stats => {
                println!(
                    "liked {} / disliked {}",
                    session.liked_items().len(),
                    session.disliked_items().len()
                );
                for share in session.style_distribution() {
                    println!("  {:<20} {:>3} {:>6.1}%", share.style, share.count, share.percentage);
                }
                continue;
            }
            Command::Clear => {
                session.clear_all_data().await;
                println!("All data has been cleared");
                session.load_more(None).await.map(|_| ())
            }
            Command::Help => {
                println!("{}", HELP);
                continue;
            }
            Command::Quit => break,
        };

        if let Err(e) = outcome {
            println!("Error: {}", e.message());
        }
        if session.current().is_none() {
            session.wait_for_refill().await;
        }
        print_card(&session);
    }

    Ok(())
}
