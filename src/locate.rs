//! Citation-to-location estimation.
//!
//! A citation is first matched to the calibrated breakpoint record whose
//! range contains it (bisection over the records sorted by range start), then
//! placed inside that record's flat-line span in proportion to its word-count
//! distance from the record's start.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::augment::{augment, Augmented};
use crate::books::BookOrder;
use crate::distance::{calc_between, verse_len, DistanceError, WordCountDistance, WordCountTable};
use crate::models::{
    AugmentedBreakpointRecord, BreakpointRecord, Citation, LocationEstimate, LocatorParams,
    PageId, PageLengths, Passage, Position,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("Book not in book order: {0}")]
    UnknownBook(String),
    #[error("Atom is not a resolved index: {0}")]
    UnresolvedAtom(String),
    #[error("Citation {0} is outside all calibrated ranges")]
    CitationOutOfRange(String),
    #[error("Citation {citation} names a word past the end of its {words}-word verse")]
    AtomOutOfRange { citation: String, words: u32 },
    #[error("No calibrated breakpoint records")]
    NoCalibration,
    #[error("Record on page {0} carries no biblical range")]
    NotBiblical(PageId),
    #[error("Record on page {page} spans no words")]
    EmptySpan { page: PageId },
    #[error("Word-count distance to {citation} on page {page} is unknown")]
    UnknownDistance { page: PageId, citation: String },
    #[error("Distance error: {0}")]
    Distance(#[from] DistanceError),
}

/// Comparison key across the whole corpus: (book rank, chapter, verse, atom).
pub type SortKey = (u32, u32, u32, u32);

/// A located record and the raw flat-line estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Index into [`Locator::real_records`]
    pub record_index: usize,
    pub page: PageId,
    pub fline: f64,
}

/// Read-only estimator over augmented calibration data.
///
/// Immutable once built, so any number of threads can query it at once.
#[derive(Debug, Clone)]
pub struct Locator {
    table: WordCountTable,
    books: BookOrder,
    augmented: Augmented,
    real: Vec<usize>,
    params: LocatorParams,
}

impl Locator {
    /// Augment `records` and build a locator over them.
    pub fn new(
        table: WordCountTable,
        books: BookOrder,
        records: &[BreakpointRecord],
        params: LocatorParams,
    ) -> Result<Self, LocateError> {
        let augmented = augment(&table, records)?;
        Ok(Self::from_augmented(table, books, augmented, params))
    }

    /// Build a locator over records that were already augmented with `table`.
    pub fn from_augmented(
        table: WordCountTable,
        books: BookOrder,
        augmented: Augmented,
        params: LocatorParams,
    ) -> Self {
        let real = augmented
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.record.is_real())
            .map(|(i, _)| i)
            .collect();
        Locator {
            table,
            books,
            augmented,
            real,
            params,
        }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    pub fn books(&self) -> &BookOrder {
        &self.books
    }

    pub fn word_counts(&self) -> &WordCountTable {
        &self.table
    }

    pub fn augmented(&self) -> &Augmented {
        &self.augmented
    }

    pub fn page_lengths(&self) -> &PageLengths {
        &self.augmented.page_lengths
    }

    /// Number of records covering biblical text.
    pub fn real_count(&self) -> usize {
        self.real.len()
    }

    /// The `index`-th record covering biblical text.
    pub fn real_record(&self, index: usize) -> Option<&AugmentedBreakpointRecord> {
        self.real.get(index).map(|&i| &self.augmented.records[i])
    }

    /// Records covering biblical text, in calibration order.
    pub fn real_records(&self) -> impl Iterator<Item = &AugmentedBreakpointRecord> + '_ {
        self.real.iter().map(|&i| &self.augmented.records[i])
    }

    /// Comparison key of a citation.
    pub fn citation_key(&self, citation: &Citation) -> Result<SortKey, LocateError> {
        let rank = self
            .books
            .rank(&citation.book)
            .ok_or_else(|| LocateError::UnknownBook(citation.book.clone()))?;
        let atom = citation
            .atom
            .index()
            .ok_or_else(|| LocateError::UnresolvedAtom(citation.to_string()))?;
        Ok((rank, citation.chapter, citation.verse, atom))
    }

    fn position_key(&self, book: &str, position: &Position) -> Result<SortKey, LocateError> {
        let rank = self
            .books
            .rank(book)
            .ok_or_else(|| LocateError::UnknownBook(book.to_string()))?;
        let atom = position
            .atom()
            .index()
            .ok_or_else(|| LocateError::UnresolvedAtom(format!("{} {}", book, position)))?;
        Ok((rank, position.chapter(), position.verse(), atom))
    }

    fn passage_at(&self, index: usize) -> Result<(&AugmentedBreakpointRecord, &Passage), LocateError> {
        let augrec = self.real_record(index).ok_or(LocateError::NoCalibration)?;
        let passage = augrec
            .record
            .passage()
            .ok_or(LocateError::NotBiblical(augrec.record.page()))?;
        Ok((augrec, passage))
    }

    /// Find the index of the real record whose range contains `citation`.
    ///
    /// Bisects over range starts on the half-open interval `[start, stop)`;
    /// once it narrows to one record, the citation must also lie at or
    /// before that record's range stop.
    pub fn find_record_index(&self, citation: &Citation) -> Result<usize, LocateError> {
        let key = self.citation_key(citation)?;
        if self.real.is_empty() {
            return Err(LocateError::NoCalibration);
        }

        let (mut start, mut stop) = (0, self.real.len());
        loop {
            let mid = start + (stop - start) / 2;
            let (_, passage) = self.passage_at(mid)?;
            let start_key = self.position_key(&passage.book, passage.range.start())?;

            if start == mid {
                debug_assert_eq!(stop, start + 1);
                let stop_key = self.position_key(&passage.book, passage.range.stop())?;
                if key < start_key || key > stop_key {
                    return Err(LocateError::CitationOutOfRange(citation.to_string()));
                }
                debug!(%citation, index = mid, "found enclosing record");
                return Ok(mid);
            }

            if key < start_key {
                stop = mid;
            } else {
                start = mid;
            }
        }
    }

    /// Estimate the page and flat line of `citation`.
    pub fn estimate(&self, citation: &Citation) -> Result<Estimate, LocateError> {
        let index = self.find_record_index(citation)?;
        let (augrec, passage) = self.passage_at(index)?;
        let page = augrec.record.page();
        let lpc = self.params.lines_per_column;

        // The cited verse and atom must exist in the word-count table
        let words = verse_len(&self.table, &citation.book, &citation.position())?;
        if !citation.atom.index().is_some_and(|atom| (1..=words).contains(&atom)) {
            return Err(LocateError::AtomOutOfRange {
                citation: citation.to_string(),
                words,
            });
        }

        // Words from the record start strictly before the cited atom
        let words_before_citation = calc_between(
            &self.table,
            &passage.book,
            passage.range.start(),
            &citation.position(),
        )? - WordCountDistance::new(1);

        let (start_fline, span, to_citation, total) = match augrec.record.extent() {
            Some(extent) => (
                extent.start_flat_line(lpc),
                extent.flat_lines(lpc),
                words_before_citation,
                augrec.stop_distance - augrec.start_distance,
            ),
            None => {
                let columns = self
                    .books
                    .page_column_count(&passage.book)
                    .ok_or_else(|| LocateError::UnknownBook(passage.book.clone()))?;
                (
                    1,
                    i64::from(lpc) * i64::from(columns),
                    augrec.start_distance + words_before_citation,
                    self.page_lengths()
                        .get(page)
                        .unwrap_or_else(WordCountDistance::unknown),
                )
            }
        };

        let total = match total.word_count() {
            Some(words) if words > 0 => words,
            _ => return Err(LocateError::EmptySpan { page }),
        };
        let to_citation = to_citation
            .word_count()
            .ok_or_else(|| LocateError::UnknownDistance {
                page,
                citation: citation.to_string(),
            })?;

        let ratio = to_citation as f64 / total as f64;
        let fline = start_fline as f64 + ratio * span as f64;

        debug!(
            %citation,
            %page,
            to_citation,
            total,
            start_fline,
            span,
            fline,
            "interpolated flat line"
        );

        Ok(Estimate {
            record_index: index,
            page,
            fline,
        })
    }

    /// Estimate page, column and line of `citation`.
    pub fn locate(&self, citation: &Citation) -> Result<LocationEstimate, LocateError> {
        let estimate = self.estimate(citation)?;
        Ok(LocationEstimate::from_flat_line(
            estimate.page,
            estimate.fline,
            &self.params,
        ))
    }

    /// Locate many citations in parallel. Results keep the input order.
    pub fn locate_many(
        &self,
        citations: &[Citation],
        show_progress: bool,
    ) -> Vec<Result<LocationEstimate, LocateError>> {
        let progress = if show_progress {
            let pb = ProgressBar::new(citations.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        let results = citations
            .par_iter()
            .map(|citation| {
                let result = self.locate(citation);
                if let Some(ref pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("Done");
        }

        results
    }
}
