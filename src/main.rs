mod db;
mod export;
mod parser;
mod settings;
mod topics;
mod wiki;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use parser::extract::{self, EventRecord, Significance};
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "bg_history_scraper",
    about = "Bulgarian history events from Wikipedia, classified and exported"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the topic queue with the default history pages
    Init,
    /// Fetch unvisited topics from the Wikipedia parse API
    Fetch {
        /// Max topics to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Re-queue every topic before fetching
        #[arg(long)]
        refresh: bool,
    },
    /// Extract events from fetched pages, store them and write CSV + JSON
    Process,
    /// Fetch + process in one pipeline
    Run {
        /// Max topics to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show fetching and extraction statistics
    Stats,
    /// Events overview table
    Overview {
        /// Filter by category (e.g. "Война/Битка")
        #[arg(short, long)]
        category: Option<String>,
        /// Filter by significance (Висока, Средна, Ниска or high/medium/low)
        #[arg(short, long)]
        significance: Option<String>,
        /// Filter by exact location (e.g. "Търново")
        #[arg(short, long)]
        location: Option<String>,
        /// Earliest year to include
        #[arg(long)]
        from_year: Option<i64>,
        /// Latest year to include
        #[arg(long)]
        to_year: Option<i64>,
        /// Text to look for in title or description
        #[arg(long)]
        search: Option<String>,
        /// Order by title instead of timeline
        #[arg(long)]
        by_title: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Classify a single fragment and print the record as JSON
    Classify {
        /// Fragment text, e.g. "681 г. Образуване на България"
        text: String,
        /// Topic the fragment belongs to
        #[arg(short, long, default_value = "История_на_България")]
        topic: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let inserted = db::insert_topics(&conn, topics::DEFAULT_TOPICS, &settings.language)?;
            println!(
                "Inserted {} new topics ({} in default list)",
                inserted,
                topics::DEFAULT_TOPICS.len()
            );
            Ok(())
        }
        Commands::Fetch { limit, refresh } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            if refresh {
                let n = db::reset_visited(&conn)?;
                info!("Re-queued {} topics", n);
            }
            let queued = db::fetch_unvisited(&conn, limit)?;
            if queued.is_empty() {
                println!("No unvisited topics. Run 'init' first or use --refresh.");
                return Ok(());
            }
            println!("Fetching {} topics (saving each to DB)...", queued.len());
            let stats = wiki::fetch_topics(&conn, &settings, queued).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            process_and_export(&conn, &settings)
        }
        Commands::Run { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let queued = db::fetch_unvisited(&conn, limit)?;
            if queued.is_empty() {
                println!("No unvisited topics. Run 'init' first.");
                return Ok(());
            }

            // Phase 1: Fetch
            let t_fetch = Instant::now();
            println!("Pipeline: fetching {} topics...", queued.len());
            let stats = wiki::fetch_topics(&conn, &settings, queued).await?;
            println!(
                "Fetched {} topics ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_fetch.elapsed().as_secs_f64()
            );

            // Phase 2: Process
            process_and_export(&conn, &settings)
        }
        Commands::Overview {
            category,
            significance,
            location,
            from_year,
            to_year,
            search,
            by_title,
            limit,
        } => {
            let significance = match significance {
                Some(s) => Some(
                    Significance::parse(&s)
                        .with_context(|| format!("Unknown significance '{}'", s))?,
                ),
                None => None,
            };
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let filter = db::OverviewFilter {
                category: category.as_deref(),
                significance: significance.map(Significance::label),
                location: location.as_deref(),
                from_year,
                to_year,
                search: search.as_deref(),
                by_title,
            };
            let rows = db::fetch_overview(&conn, &filter, limit)?;
            if rows.is_empty() {
                println!("No events found. Run 'process' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<20} | {:<40} | {:<20} | {:<7} | {:<18}",
                "#", "Date", "Title", "Category", "Signif.", "Location"
            );
            println!("{}", "-".repeat(125));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<20} | {:<40} | {:<20} | {:<7} | {:<18}",
                    i + 1,
                    truncate(&r.event_date, 20),
                    truncate(&r.title, 40),
                    truncate(&r.category, 20),
                    r.significance,
                    truncate(&r.location, 18),
                );
            }

            let mut sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
            sources.sort_unstable();
            sources.dedup();
            println!("\n{} events from {} sources", rows.len(), sources.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Topics:    {}", s.topics);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Events:    {}", s.events);
            if !s.by_category.is_empty() {
                println!("\n--- Categories ---");
                for (category, n) in &s.by_category {
                    println!("  {:<24} {}", category, n);
                }
            }
            Ok(())
        }
        Commands::Classify { text, topic } => {
            let lex = settings.lexicon()?;
            let topic = topics::normalize(&topic);
            let record = extract::extract_event(&text, &topic, &lex);
            info!(sort_key = ?record.sort_year, "classified fragment");
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Extract every fetched page, then dedup, sort, store and write the files.
fn process_and_export(conn: &rusqlite::Connection, settings: &Settings) -> anyhow::Result<()> {
    let pages = db::fetch_pages(conn)?;
    if pages.is_empty() {
        println!("No fetched pages. Run 'fetch' first.");
        return Ok(());
    }
    let lex = settings.lexicon()?;

    let t_process = Instant::now();
    println!("Processing {} pages...", pages.len());
    let events = process_pages(&pages, &lex)?;
    let extracted = events.len();

    let events = export::finalize(events);
    db::save_events(conn, &events)?;
    println!(
        "Extracted {} events ({} unique) in {:.1}s",
        extracted,
        events.len(),
        t_process.elapsed().as_secs_f64()
    );

    let paths = export::write_all(
        &events,
        &settings.output_dir,
        &settings.output_prefix,
        &chrono::Local::now(),
    )?;
    println!("Saved {} events to {}", events.len(), paths.csv.display());
    println!("Saved {} events to {}", events.len(), paths.json.display());
    Ok(())
}

/// Pages are extracted in parallel; the result keeps page order and,
/// within a page, fragment order.
fn process_pages(
    pages: &[db::FetchedPage],
    lex: &parser::lexicon::Lexicon,
) -> anyhow::Result<Vec<EventRecord>> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let per_page: Vec<Vec<EventRecord>> = pages
        .par_iter()
        .map(|page| {
            let events = parser::process_page(page, lex);
            info!("{}: {} events", page.topic, events.len());
            pb.inc(1);
            events
        })
        .collect();

    pb.finish_and_clear();
    Ok(per_page.into_iter().flatten().collect())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("България", 20), "България");
        assert_eq!(truncate("Първа българска държава", 5), "Първа...");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn overview_filter_flags() {
        let cli = Cli::try_parse_from([
            "bg_history_scraper",
            "overview",
            "-l",
            "Търново",
            "--from-year",
            "1185",
            "--to-year",
            "1396",
            "--search",
            "въстание",
            "--by-title",
        ])
        .unwrap();
        match cli.command {
            Commands::Overview {
                location,
                from_year,
                to_year,
                search,
                by_title,
                limit,
                ..
            } => {
                assert_eq!(location.as_deref(), Some("Търново"));
                assert_eq!((from_year, to_year), (Some(1185), Some(1396)));
                assert_eq!(search.as_deref(), Some("въстание"));
                assert!(by_title);
                assert_eq!(limit, 50);
            }
            _ => panic!("expected overview"),
        }
    }

    #[test]
    fn parallel_processing_keeps_page_order() {
        let html = std::fs::read_to_string("tests/fixtures/april_uprising.html").unwrap();
        let pages: Vec<db::FetchedPage> = ["Априлско_въстание", "Българско_възраждане"]
            .iter()
            .map(|t| db::FetchedPage {
                topic: t.to_string(),
                html: html.clone(),
            })
            .collect();
        let events = process_pages(&pages, parser::lexicon::Lexicon::builtin()).unwrap();
        assert_eq!(events.len(), 10);
        assert!(events[..5].iter().all(|e| e.source == "Априлско въстание"));
        assert!(events[5..].iter().all(|e| e.source == "Българско възраждане"));
    }
}
