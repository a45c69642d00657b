//! Codex Location Estimator CLI
//!
//! Estimates page, column and line of biblical citations in a calibrated
//! manuscript codex.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use codex_locate::augment::{augment, corpus_stats, flatten_page_lengths, flatten_records};
use codex_locate::db::{
    load_book_order, load_corpus, load_corpus_json, load_params_json, Corpus, DbError,
};
use codex_locate::models::{BatchEntry, Citation, LocatorParams};
use codex_locate::output::{
    format_estimate, print_estimates, print_stats, write_augmented_csv, write_augmented_json,
    write_estimates_csv_file, write_estimates_json_file, write_page_lengths_csv,
    write_page_lengths_json,
};
use codex_locate::Locator;

#[derive(Parser)]
#[command(name = "codex-locate")]
#[command(about = "Estimate where biblical citations fall in a manuscript codex")]
#[command(version)]
struct Cli {
    /// Log every augmented record and lookup
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Only log errors, no progress bar
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for exported results
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

/// Where calibration data comes from, plus parameter overrides
#[derive(Args)]
struct DataArgs {
    /// Path to a corpus database (word counts, breakpoints, optional book table)
    #[arg(long, conflicts_with_all = ["records", "word_counts"])]
    corpus_db: Option<PathBuf>,

    /// Breakpoint records as JSON (requires --word-counts)
    #[arg(long, requires = "word_counts")]
    records: Option<PathBuf>,

    /// Word counts per verse as JSON
    #[arg(long, requires = "records")]
    word_counts: Option<PathBuf>,

    /// Book table (.json or .xlsx) overriding the built-in canon
    #[arg(long)]
    books: Option<PathBuf>,

    /// JSON file with estimation parameters
    #[arg(long)]
    config: Option<PathBuf>,

    // Overrides on top of --config or the defaults
    /// Lines per column [default: 27]
    #[arg(long)]
    lines_per_column: Option<u32>,

    /// Decimal places in line estimates [default: 1]
    #[arg(long)]
    precision: Option<usize>,
}

impl DataArgs {
    fn load_corpus(&self) -> Result<Corpus, DbError> {
        let mut corpus = match (&self.corpus_db, &self.records, &self.word_counts) {
            (Some(db), _, _) => load_corpus(db)?,
            (None, Some(records), Some(word_counts)) => load_corpus_json(records, word_counts)?,
            _ => return Err(DbError::NoDataSource),
        };

        if let Some(ref path) = self.books {
            corpus.books = load_book_order(path)?;
            info!(path = %path.display(), books = corpus.books.len(), "loaded book table");
        }

        Ok(corpus)
    }

    fn params(&self) -> Result<LocatorParams, DbError> {
        let base = match self.config {
            Some(ref path) => load_params_json(path)?,
            None => LocatorParams::default(),
        };

        Ok(LocatorParams {
            lines_per_column: self.lines_per_column.unwrap_or(base.lines_per_column),
            precision: self.precision.unwrap_or(base.precision),
        })
    }

    fn locator(&self) -> Result<Locator, Box<dyn std::error::Error>> {
        let params = self.params()?;
        let corpus = self.load_corpus()?;
        let locator = Locator::new(corpus.word_counts, corpus.books, &corpus.records, params)?;
        info!(
            records = locator.augmented().records.len(),
            biblical = locator.real_count(),
            pages = locator.page_lengths().len(),
            "calibration ready"
        );
        Ok(locator)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the location of a single citation
    Locate {
        #[command(flatten)]
        data: DataArgs,

        /// Citation such as "Job 1:1.3", "Psalms 23:4" or "Genesis 1:1b"
        citation: String,

        /// Print the estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// Estimate locations for a file of citations, one per line
    Batch {
        #[command(flatten)]
        data: DataArgs,

        /// Input file; blank lines and lines starting with '#' are skipped
        #[arg(long)]
        input: PathBuf,

        /// Output file path
        #[arg(long)]
        output: PathBuf,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Print first N results to console
        #[arg(long)]
        show: Option<usize>,
    },

    /// Write augmented breakpoint records (and optionally page lengths)
    Augment {
        #[command(flatten)]
        data: DataArgs,

        /// Output file for augmented records
        #[arg(long)]
        output: PathBuf,

        /// Output file for page lengths
        #[arg(long)]
        page_lengths: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Show calibration statistics
    Stats {
        #[command(flatten)]
        data: DataArgs,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_citations(path: &Path) -> Result<Vec<String>, std::io::Error> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Locate {
            data,
            citation,
            json,
        } => {
            let locator = data.locator()?;
            let citation: Citation = citation.parse()?;
            let estimate = locator.locate(&citation)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                println!("{}: {}", citation, format_estimate(&estimate));
            }
        }

        Commands::Batch {
            data,
            input,
            output,
            format,
            show,
        } => {
            let locator = data.locator()?;
            let lines = read_citations(&input)?;

            // Unparseable lines keep their slot with an error
            let parsed: Vec<Result<Citation, String>> = lines
                .iter()
                .map(|line| {
                    line.parse::<Citation>().map_err(|e| {
                        warn!(citation = %line, error = %e, "skipping unparseable citation");
                        e.to_string()
                    })
                })
                .collect();
            let citations: Vec<Citation> =
                parsed.iter().filter_map(|p| p.as_ref().ok().cloned()).collect();

            let mut located = locator.locate_many(&citations, !cli.quiet).into_iter();

            let entries: Vec<BatchEntry> = lines
                .into_iter()
                .zip(parsed)
                .map(|(line, parsed)| {
                    let result = match parsed {
                        Ok(_) => located.next().map(|r| r.map_err(|e| e.to_string())),
                        Err(e) => Some(Err(e)),
                    };
                    match result {
                        Some(Ok(estimate)) => BatchEntry {
                            citation: line,
                            estimate: Some(estimate),
                            error: None,
                        },
                        Some(Err(error)) => BatchEntry {
                            citation: line,
                            estimate: None,
                            error: Some(error),
                        },
                        None => BatchEntry {
                            citation: line,
                            estimate: None,
                            error: None,
                        },
                    }
                })
                .collect();

            match format {
                OutputFormat::Json => write_estimates_json_file(&entries, &output)?,
                OutputFormat::Csv => write_estimates_csv_file(&entries, &output)?,
            }

            let failed = entries.iter().filter(|e| e.error.is_some()).count();
            if !cli.quiet {
                eprintln!(
                    "Located {} of {} citations",
                    entries.len() - failed,
                    entries.len()
                );
                eprintln!("Output: {}", output.display());
            }

            if let Some(limit) = show {
                println!("\n=== Sample Estimates ===");
                print_estimates(&entries, Some(limit));
            }
        }

        Commands::Augment {
            data,
            output,
            page_lengths,
            format,
        } => {
            let corpus = data.load_corpus()?;
            let augmented = augment(&corpus.word_counts, &corpus.records)?;

            let records = flatten_records(&augmented.records);
            let mut file = std::fs::File::create(&output)?;
            match format {
                OutputFormat::Json => write_augmented_json(&records, &mut file)?,
                OutputFormat::Csv => write_augmented_csv(&records, &mut file)?,
            }

            if let Some(ref path) = page_lengths {
                let lengths = flatten_page_lengths(&augmented.page_lengths);
                let mut file = std::fs::File::create(path)?;
                match format {
                    OutputFormat::Json => write_page_lengths_json(&lengths, &mut file)?,
                    OutputFormat::Csv => write_page_lengths_csv(&lengths, &mut file)?,
                }
            }

            if !cli.quiet {
                eprintln!(
                    "Augmented {} records over {} pages",
                    records.len(),
                    augmented.page_lengths.len()
                );
                eprintln!("Output: {}", output.display());
                if let Some(path) = page_lengths {
                    eprintln!("Page lengths: {}", path.display());
                }
            }
        }

        Commands::Stats { data } => {
            let corpus = data.load_corpus()?;
            let augmented = augment(&corpus.word_counts, &corpus.records)?;
            let stats = corpus_stats(&augmented);

            print_stats(&stats);
            println!(
                "Word-count table: {} books, {} verses",
                corpus.word_counts.book_count(),
                corpus.word_counts.verse_count()
            );
            println!("Book order: {} books", corpus.books.len());
        }
    }

    Ok(())
}
