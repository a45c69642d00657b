//! Breakpoint augmentation.
//!
//! One left-to-right pass over the ordered breakpoint records computes, for
//! every biblical record, how many words into its page the record starts and
//! stops. The running per-page totals are folded through the pass and come
//! out the other end as the page lengths.

use tracing::debug;

use crate::distance::{calc, verse_len, DistanceError, WordCountDistance, WordCountTable};
use crate::models::{
    AugmentedBreakpointRecord, BreakpointRecord, CorpusStats, FlatAugmentedRecord,
    FlatPageLength, PageLengths,
};

/// Output of the augmentation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Augmented {
    pub records: Vec<AugmentedBreakpointRecord>,
    pub page_lengths: PageLengths,
}

/// Augment breakpoint records with word-count distances from the start of their page.
pub fn augment(
    table: &WordCountTable,
    records: &[BreakpointRecord],
) -> Result<Augmented, DistanceError> {
    let initial = Augmented {
        records: Vec::with_capacity(records.len()),
        page_lengths: PageLengths::default(),
    };

    let augmented = records.iter().try_fold(initial, |acc, record| {
        let Augmented {
            records: mut augmented,
            page_lengths,
        } = acc;
        let (augrec, page_lengths) = augment_one(table, record, page_lengths)?;
        augmented.push(augrec);
        Ok::<_, DistanceError>(Augmented {
            records: augmented,
            page_lengths,
        })
    })?;

    debug!(
        records = augmented.records.len(),
        pages = augmented.page_lengths.len(),
        "augmented breakpoint records"
    );

    Ok(augmented)
}

fn augment_one(
    table: &WordCountTable,
    record: &BreakpointRecord,
    mut page_lengths: PageLengths,
) -> Result<(AugmentedBreakpointRecord, PageLengths), DistanceError> {
    let Some(passage) = record.passage() else {
        return Ok((AugmentedBreakpointRecord::unknown(record.clone()), page_lengths));
    };

    let span = calc(table, &passage.book, &passage.range)?;
    let page = record.page();
    let start_distance = page_lengths.get(page).unwrap_or_else(WordCountDistance::zero);
    let stop_distance = start_distance + span;
    page_lengths.set(page, stop_distance);

    let start_verse_len = verse_len(table, &passage.book, passage.range.start())?;
    let stop_verse_len = verse_len(table, &passage.book, passage.range.stop())?;

    debug!(
        %page,
        book = %passage.book,
        range = %passage.range,
        start = ?start_distance.word_count(),
        stop = ?stop_distance.word_count(),
        "augmented record"
    );

    let augrec = AugmentedBreakpointRecord {
        record: record.clone(),
        start_distance,
        stop_distance,
        start_verse_len: Some(start_verse_len),
        stop_verse_len: Some(stop_verse_len),
    };
    Ok((augrec, page_lengths))
}

/// Flatten augmented records for JSON/CSV export.
pub fn flatten_records(records: &[AugmentedBreakpointRecord]) -> Vec<FlatAugmentedRecord> {
    records.iter().map(FlatAugmentedRecord::from).collect()
}

/// Flatten page lengths for JSON/CSV export, in page order.
pub fn flatten_page_lengths(page_lengths: &PageLengths) -> Vec<FlatPageLength> {
    page_lengths
        .iter()
        .map(|(page, length)| FlatPageLength {
            page: page.to_string(),
            word_count: length.word_count(),
        })
        .collect()
}

/// Summarize augmented calibration data.
pub fn corpus_stats(augmented: &Augmented) -> CorpusStats {
    let records = &augmented.records;
    let biblical_records = records.iter().filter(|r| r.record.is_real()).count();

    let mut books: Vec<String> = Vec::new();
    for book in records.iter().filter_map(|r| r.record.book()) {
        if !books.iter().any(|b| b == book) {
            books.push(book.to_string());
        }
    }

    CorpusStats {
        total_records: records.len(),
        biblical_records,
        non_biblical_records: records.len() - biblical_records,
        pinpointed_records: records
            .iter()
            .filter(|r| r.record.extent().is_some())
            .count(),
        pages: {
            let mut pages: Vec<_> = records.iter().map(|r| r.record.page()).collect();
            pages.sort_unstable();
            pages.dedup();
            pages.len()
        },
        books,
        total_words: augmented
            .page_lengths
            .iter()
            .filter_map(|(_, length)| length.word_count())
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, ColumnLine, ColumnLineRange, PageId, Position, PositionRange};

    fn table() -> WordCountTable {
        let mut table = WordCountTable::new();
        table.insert_book("Job", vec![vec![5, 7, 9], vec![4, 6]]);
        table
    }

    fn record(page: &str, book: Option<&str>, start: (u32, u32, u32), stop: (u32, u32, u32)) -> BreakpointRecord {
        let page: PageId = page.parse().unwrap();
        let range = book.map(|_| {
            PositionRange::new(
                Position::new(start.0, start.1, Atom::Index(start.2)),
                Position::new(stop.0, stop.1, Atom::Index(stop.2)),
            )
            .unwrap()
        });
        BreakpointRecord::from_parts(page, None, book.map(str::to_string), range, None).unwrap()
    }

    #[test]
    fn test_running_totals_per_page() {
        let records = vec![
            record("100A", Some("Job"), (1, 1, 1), (1, 2, 3)), // 5 + 3 = 8
            record("100A", Some("Job"), (1, 2, 4), (1, 3, 9)), // 4 + 9 = 13
            record("100B", Some("Job"), (2, 1, 1), (2, 2, 6)), // 10
        ];
        let augmented = augment(&table(), &records).unwrap();

        let counts: Vec<_> = augmented
            .records
            .iter()
            .map(|r| (r.start_distance.word_count(), r.stop_distance.word_count()))
            .collect();
        assert_eq!(
            counts,
            vec![(Some(0), Some(8)), (Some(8), Some(21)), (Some(0), Some(10))]
        );

        let page = |s: &str| s.parse::<PageId>().unwrap();
        assert_eq!(augmented.page_lengths.get(page("100A")), Some(WordCountDistance::new(21)));
        assert_eq!(augmented.page_lengths.get(page("100B")), Some(WordCountDistance::new(10)));
    }

    #[test]
    fn test_non_biblical_records_skipped() {
        let records = vec![
            record("100A", Some("Job"), (1, 1, 1), (1, 1, 5)),
            record("100A", None, (0, 0, 0), (0, 0, 0)),
            record("100A", Some("Job"), (1, 2, 1), (1, 2, 7)),
            record("101A", None, (0, 0, 0), (0, 0, 0)),
        ];
        let augmented = augment(&table(), &records).unwrap();

        let masora = &augmented.records[1];
        assert!(masora.start_distance.is_unknown());
        assert!(masora.stop_distance.is_unknown());
        assert_eq!(masora.start_verse_len, None);

        assert_eq!(augmented.records[2].start_distance, WordCountDistance::new(5));
        assert_eq!(augmented.page_lengths.len(), 1);
        assert_eq!(
            augmented.page_lengths.get("100A".parse().unwrap()),
            Some(WordCountDistance::new(12))
        );
    }

    #[test]
    fn test_page_revisited_continues_total() {
        let records = vec![
            record("100A", Some("Job"), (1, 1, 1), (1, 1, 5)),
            record("100B", Some("Job"), (1, 2, 1), (1, 2, 7)),
            record("100A", Some("Job"), (1, 3, 1), (1, 3, 9)),
        ];
        let augmented = augment(&table(), &records).unwrap();
        assert_eq!(augmented.records[2].start_distance, WordCountDistance::new(5));
        assert_eq!(augmented.records[2].stop_distance, WordCountDistance::new(14));
    }

    #[test]
    fn test_verse_lengths_cached() {
        let records = vec![record("100A", Some("Job"), (1, 2, 1), (2, 2, 2))];
        let augmented = augment(&table(), &records).unwrap();
        assert_eq!(augmented.records[0].start_verse_len, Some(7));
        assert_eq!(augmented.records[0].stop_verse_len, Some(6));
    }

    #[test]
    fn test_missing_book_fails() {
        let records = vec![record("100A", Some("Ruth"), (1, 1, 1), (1, 1, 2))];
        assert_eq!(
            augment(&table(), &records),
            Err(DistanceError::UnknownBook("Ruth".to_string()))
        );
    }

    #[test]
    fn test_flatten_and_stats() {
        let page: PageId = "100A".parse().unwrap();
        let extent = ColumnLineRange::new(ColumnLine::new(1, 1), ColumnLine::new(1, 5));
        let range = PositionRange::new(
            Position::new(1, 1, Atom::Index(1)),
            Position::new(1, 1, Atom::Index(5)),
        )
        .unwrap();
        let records = vec![
            BreakpointRecord::from_parts(page, Some(extent), Some("Job".to_string()), Some(range), None)
                .unwrap(),
            record("101A", None, (0, 0, 0), (0, 0, 0)),
        ];
        let augmented = augment(&table(), &records).unwrap();

        let flat = flatten_records(&augmented.records);
        assert_eq!(flat[0].start_word_count, Some(0));
        assert_eq!(flat[0].stop_word_count, Some(5));
        assert_eq!(flat[0].startl, Some(5));
        assert_eq!(flat[0].record.startco, Some(1));
        assert_eq!(flat[1].stop_word_count, None);

        let lengths = flatten_page_lengths(&augmented.page_lengths);
        assert_eq!(
            lengths,
            vec![FlatPageLength {
                page: "100A".to_string(),
                word_count: Some(5)
            }]
        );

        let stats = corpus_stats(&augmented);
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.biblical_records, 1);
        assert_eq!(stats.non_biblical_records, 1);
        assert_eq!(stats.pinpointed_records, 1);
        assert_eq!(stats.pages, 2);
        assert_eq!(stats.books, vec!["Job".to_string()]);
        assert_eq!(stats.total_words, 5);
    }
}
