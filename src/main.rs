//! History aggregator demo.
//!
//! Records a spread of visits into an in-memory store, attaches a query
//! controller, and prints the cards produced by every grouping and by a
//! search. Set `RUST_LOG=debug` to watch the controller commit and drop
//! results.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;

use history_aggregator::database::Database;
use history_aggregator::managers::query_controller::{QueryController, RenderHost, UpdateOutcome};
use history_aggregator::managers::sqlite_source::SqliteVisitSource;
use history_aggregator::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use history_aggregator::types::history::{CardItems, ResultsCache, SortOption};

/// Forwards committed results to the demo loop.
struct ChannelHost(mpsc::UnboundedSender<Arc<ResultsCache>>);

impl RenderHost for ChannelHost {
    fn request_update(&self, cache: Arc<ResultsCache>) {
        let _ = self.0.send(cache);
    }
}

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

fn print_cards(cache: &ResultsCache) {
    let Some(entries) = cache.entries.as_ref() else {
        println!("  (loading)");
        return;
    };
    for entry in entries {
        let label = entry.label_key.map_or("results", |key| key.token());
        match &entry.domain {
            Some(domain) => println!("  [{}] {}", label, domain),
            None => println!("  [{}]", label),
        }
        match &entry.items {
            CardItems::Visits(rows) => {
                for row in rows {
                    println!("      {}  {}", row.date.format("%Y-%m-%d %H:%M"), row.title);
                }
            }
            CardItems::Sites(sites) => {
                for site in sites {
                    println!("      {} ({} visits)", site.domain, site.visits.len());
                }
            }
        }
    }
    println!();
}

fn record_samples(source: &SqliteVisitSource) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let samples: [(&str, Option<&str>, Duration); 8] = [
        ("https://github.com/rust-lang/rust", Some("rust-lang/rust"), Duration::minutes(5)),
        ("https://docs.rs/tokio", Some("tokio - Rust"), Duration::minutes(40)),
        ("https://github.com/tokio-rs/tokio", Some("tokio-rs/tokio"), Duration::hours(26)),
        ("file:///home/user/notes.html", None, Duration::hours(30)),
        ("https://crates.io/crates/chrono", Some("chrono - crates.io"), Duration::days(4)),
        ("https://Docs.rs/chrono", Some("chrono - Rust"), Duration::days(4) + Duration::hours(1)),
        ("https://news.ycombinator.com/", Some("Hacker News"), Duration::days(35)),
        ("https://www.rust-lang.org/", Some("Rust Programming Language"), Duration::days(50)),
    ];
    for (url, title, age) in samples {
        source.record_visit(url, title, now - age)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut engine = SettingsEngine::new(std::env::var("HISTORY_SETTINGS").ok());
    let settings = engine.load()?;
    println!("Settings from {}: {:?}", engine.get_config_path(), settings);
    println!();

    let source = Arc::new(SqliteVisitSource::new(Database::open_in_memory()?, &settings));
    let controller = Arc::new(QueryController::new(Arc::clone(&source), settings));
    let (tx, mut rx) = mpsc::unbounded_channel();
    controller.attach(Arc::new(ChannelHost(tx)));

    record_samples(&source)?;

    for sort in [
        SortOption::Date,
        SortOption::Site,
        SortOption::DateSite,
        SortOption::LastVisited,
    ] {
        section(&format!("Sorted by {}", sort));
        if controller.set_sort_option(sort).await == UpdateOutcome::Committed {
            print_cards(&controller.cache());
        }
    }

    section("Search \"rust\"");
    if controller.set_search_query("rust").await == UpdateOutcome::Committed {
        print_cards(&controller.cache());
    }

    section("Live update after deleting docs.rs/tokio");
    let deleted = "https://docs.rs/tokio";
    source.delete_url(deleted)?;
    let refreshed = tokio::time::timeout(StdDuration::from_secs(1), async {
        while let Some(cache) = rx.recv().await {
            let still_listed = cache
                .entries
                .iter()
                .flatten()
                .any(|entry| entry.items.visits().any(|row| row.url == deleted));
            if !still_listed {
                return Some(cache);
            }
        }
        None
    })
    .await;
    match refreshed {
        Ok(Some(cache)) => print_cards(&cache),
        _ => println!("  (no update received)"),
    }

    controller.detach();
    Ok(())
}
