mod db;
mod export;
mod fetcher;
mod parser;
mod record;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use parser::document::HtmlDocument;

#[derive(Parser)]
#[command(name = "profile_scraper", about = "Profile page scraper and experience extractor")]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true, default_value = db::DEFAULT_DB_PATH)]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue profile URLs for fetching
    Init {
        /// Profile URLs
        urls: Vec<String>,
        /// File with one URL per line (`#` starts a comment)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Fetch unvisited profile pages
    Fetch {
        /// Max pages to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract profile records from fetched pages
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Task id recorded with every saved profile (default: current UTC timestamp)
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Fetch + process in one pipeline
    Run {
        /// Max pages to fetch+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(short, long)]
        task: Option<String>,
    },
    /// Extract one page (file path or URL) and print the record as JSON
    Parse {
        source: String,
    },
    /// List the named sections of one page (file path or URL)
    Sections {
        source: String,
    },
    /// Export saved profiles
    Export {
        #[arg(short, long, value_enum, default_value = "json")]
        format: export::Format,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Show pipeline statistics
    Stats,
    /// Saved profiles overview table
    Overview {
        /// Filter by (partial) current company name
        #[arg(short, long)]
        company: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
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

    let result = match cli.command {
        Commands::Init { urls, file } => {
            let mut all = urls;
            if let Some(path) = file {
                all.extend(read_url_list(&path)?);
            }
            if all.is_empty() {
                println!("No URLs given. Pass them as arguments or with --file.");
                return Ok(());
            }
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let inserted = db::insert_pages(&conn, &all)?;
            println!("Queued {} new profile URLs ({} given)", inserted, all.len());
            Ok(())
        }
        Commands::Fetch { limit } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first or all pages are fetched.");
                return Ok(());
            }
            println!("Fetching {} pages (streaming to DB)...", pages.len());
            let stats = fetcher::fetch_pages_streaming(&conn, pages).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit, task } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages, &task_id(task))?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit, task } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited pages. Run 'init' first.");
                return Ok(());
            }

            // Phase 1: Fetch (streaming to DB)
            let t_fetch = Instant::now();
            println!("Pipeline: fetching {} pages (streaming to DB)...", pages.len());
            let stats = fetcher::fetch_pages_streaming(&conn, pages).await?;
            println!(
                "Fetched {} pages ({} ok, {} errors) in {:.1}s",
                stats.total, stats.ok, stats.errors, t_fetch.elapsed().as_secs_f64()
            );

            // Phase 2: Process
            let t_process = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (all fetched pages had errors).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed, &task_id(task))?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Parse { source } => {
            let html = load_source(&source).await?;
            let doc = HtmlDocument::parse(&html);
            let record = parser::extract::assemble(&doc)
                .with_context(|| format!("Could not assemble {}", source))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Sections { source } => {
            let html = load_source(&source).await?;
            let doc = HtmlDocument::parse(&html);
            let sections = parser::sections::list_sections(&doc);
            if sections.is_empty() {
                println!("No named sections found.");
                return Ok(());
            }
            println!("{:>3} | {:<24} | {:>5}", "#", "Section", "Items");
            println!("{}", "-".repeat(38));
            for s in &sections {
                println!("{:>3} | {:<24} | {:>5}", s.ordinal, truncate(&s.name, 24), s.item_count);
            }
            Ok(())
        }
        Commands::Export { format, out } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let people = db::fetch_people(&conn)?
                .into_iter()
                .map(|row| Ok((row.profile_url.clone(), row.to_record()?)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            if people.is_empty() {
                println!("No saved profiles. Run 'process' first.");
                return Ok(());
            }
            export::write_export(&out, format, &people)?;
            println!("Exported {} profiles to {}", people.len(), out.display());
            Ok(())
        }
        Commands::Overview { company, limit } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_overview(&conn, company.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No profiles found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<22} | {:<24} | {:<20} | {:<18} | {:>5}",
                "#", "Name", "Title", "Company", "Location", "Roles"
            );
            println!("{}", "-".repeat(106));

            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<22} | {:<24} | {:<20} | {:<18} | {:>5}",
                    i + 1,
                    truncate(&r.name, 22),
                    truncate(&r.job_title, 24),
                    truncate(&r.company_name, 20),
                    truncate(&r.location, 18),
                    r.roles
                );
            }

            let with_headline: Vec<_> = rows.iter().filter(|r| r.headline != record::NOT_FOUND).collect();
            if !with_headline.is_empty() {
                println!("\n--- Headlines ---");
                for r in &with_headline {
                    println!("  {}: {}", truncate(&r.name, 22), truncate(&r.headline, 80));
                }
            }

            println!(
                "\n{} profiles | last update {}",
                rows.len(),
                rows.first().map(|r| r.updated_at.as_str()).unwrap_or("-")
            );
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Processed: {}", s.processed);
            println!("Failed:    {}", s.failed);
            println!("Profiles:  {}", s.people);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    profiles: usize,
    entries: usize,
    failed: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} profiles with {} experience entries, {} failed.",
            self.profiles, self.entries, self.failed,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::FetchedPage],
    task_id: &str,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        profiles: 0,
        entries: 0,
        failed: 0,
    };

    for chunk in pages.chunks(200) {
        // Each page parses its own document inside its task.
        let results: Vec<_> = chunk.par_iter().map(parser::process_page).collect();

        let mut people = Vec::new();
        let mut outcomes = Vec::with_capacity(chunk.len());

        for (page, result) in chunk.iter().zip(results) {
            match result {
                Ok(record) => {
                    counts.entries += record.experience.len();
                    people.push(db::PersonRow::from_record(&page.url, &record)?);
                    outcomes.push((page.page_data_id, None));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", page.url, e);
                    counts.failed += 1;
                    outcomes.push((page.page_data_id, Some(e.to_string())));
                }
            }
        }

        counts.profiles += people.len();
        db::save_people(conn, task_id, &people)?;
        db::mark_processed(conn, &outcomes)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn task_id(given: Option<String>) -> String {
    given.unwrap_or_else(|| chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string())
}

fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

async fn load_source(source: &str) -> anyhow::Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        fetcher::fetch_single_page(source).await
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
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
