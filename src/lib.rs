//! Codex Location Estimator
//!
//! Estimates where a biblical citation sits in a manuscript codex: which page,
//! which column and which line. Calibration comes from a table of breakpoint
//! records (which verses each page or column covers) and a table of word
//! counts per verse. Within a calibrated span the position is interpolated
//! linearly by word count.
//!
//! # Example
//!
//! ```no_run
//! use codex_locate::prelude::*;
//! use std::path::Path;
//!
//! let corpus = load_corpus(Path::new("codex.db")).unwrap();
//! let locator = Locator::new(
//!     corpus.word_counts,
//!     corpus.books,
//!     &corpus.records,
//!     LocatorParams::default(),
//! )
//! .unwrap();
//!
//! let citation: Citation = "Job 1:1.3".parse().unwrap();
//! let estimate = locator.locate(&citation).unwrap();
//! println!(
//!     "{} column {} line {}",
//!     estimate.page, estimate.column_guess, estimate.line_guess
//! );
//! ```
//!
//! # Batch Example
//!
//! ```no_run
//! use codex_locate::prelude::*;
//! use std::path::Path;
//!
//! let corpus = load_corpus_json(Path::new("breakpoints.json"), Path::new("word_counts.json")).unwrap();
//! let locator = Locator::new(corpus.word_counts, corpus.books, &corpus.records, LocatorParams::default()).unwrap();
//!
//! let citations: Vec<Citation> = ["Genesis 1:1", "Psalms 23:4.2"]
//!     .iter()
//!     .map(|s| s.parse().unwrap())
//!     .collect();
//!
//! // Parallel, results in input order
//! for result in locator.locate_many(&citations, true) {
//!     match result {
//!         Ok(est) => println!("{}", format_estimate(&est)),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! ```

pub mod augment;
pub mod books;
pub mod db;
pub mod distance;
pub mod locate;
pub mod models;
pub mod output;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::augment::{
        augment, corpus_stats, flatten_page_lengths, flatten_records, Augmented,
    };
    pub use crate::books::{BookEntry, BookError, BookOrder, Section};
    pub use crate::db::{
        load_book_order, load_book_order_from_excel, load_book_order_json, load_breakpoints_json,
        load_corpus, load_corpus_json, load_params_json, load_word_counts_json, read_book_order,
        read_breakpoints, read_word_counts, Corpus, DbError,
    };
    pub use crate::distance::{calc, verse_len, DistanceError, WordCountDistance, WordCountTable};
    pub use crate::locate::{Estimate, LocateError, Locator, SortKey};
    pub use crate::models::{
        column_and_line, parse_page_id, unparse_page_id, Atom, AugmentedBreakpointRecord,
        BatchEntry, BreakpointRecord, Citation, ColumnLine, ColumnLineRange, CorpusStats,
        FlatAugmentedRecord, FlatBreakpointRecord, FlatPageLength, HalfVerse, LocationEstimate,
        LocatorParams, ModelError, PageId, PageLengths, Passage, Position, PositionRange, Side,
        LINES_PER_COLUMN,
    };
    pub use crate::output::{
        format_estimate, print_estimates, print_stats, write_augmented_csv, write_augmented_json,
        write_estimates_csv, write_estimates_csv_file, write_estimates_json,
        write_estimates_json_file, write_page_lengths_csv, write_page_lengths_json, OutputError,
    };
}

// Re-export commonly used types at the crate root
pub use locate::{LocateError, Locator};
pub use models::{Citation, LocationEstimate, LocatorParams, PageId};
