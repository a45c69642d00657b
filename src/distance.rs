//! Word-count distances between positions within a book.
//!
//! The distance between two positions is the number of words separating
//! them, computed from a per-book table of per-verse word counts. It is the
//! metric the locator interpolates over.

use crate::models::{Position, PositionRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::iter::Sum;
use std::ops::{Add, Sub};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistanceError {
    #[error("Book not in word-count table: {0}")]
    UnknownBook(String),
    #[error("Verse {chapter}:{verse} is outside the word-count table for {book}")]
    VerseOutOfRange {
        book: String,
        chapter: u32,
        verse: u32,
    },
}

/// A word count, or unknown.
///
/// Unknown propagates through addition and subtraction like a null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordCountDistance(Option<i64>);

impl WordCountDistance {
    pub fn new(word_count: i64) -> Self {
        WordCountDistance(Some(word_count))
    }

    pub fn zero() -> Self {
        WordCountDistance(Some(0))
    }

    pub fn unknown() -> Self {
        WordCountDistance(None)
    }

    pub fn word_count(self) -> Option<i64> {
        self.0
    }

    pub fn is_unknown(self) -> bool {
        self.0.is_none()
    }
}

impl Default for WordCountDistance {
    fn default() -> Self {
        WordCountDistance::zero()
    }
}

impl Add for WordCountDistance {
    type Output = WordCountDistance;

    fn add(self, rhs: Self) -> Self::Output {
        WordCountDistance(self.0.zip(rhs.0).map(|(a, b)| a + b))
    }
}

impl Sub for WordCountDistance {
    type Output = WordCountDistance;

    fn sub(self, rhs: Self) -> Self::Output {
        WordCountDistance(self.0.zip(rhs.0).map(|(a, b)| a - b))
    }
}

impl Sum for WordCountDistance {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(WordCountDistance::zero(), Add::add)
    }
}

/// Per-book word counts: chapters of verses, both stored 0-indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordCountTable {
    books: HashMap<String, Vec<Vec<u32>>>,
}

impl WordCountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a whole book.
    pub fn insert_book(&mut self, book: impl Into<String>, chapters: Vec<Vec<u32>>) {
        self.books.insert(book.into(), chapters);
    }

    /// Set the word count of one verse (1-based), growing the book as needed.
    ///
    /// Verses skipped over while growing are filled with zero.
    pub fn insert_verse(
        &mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        word_count: u32,
    ) -> Result<(), DistanceError> {
        if chapter == 0 || verse == 0 {
            return Err(DistanceError::VerseOutOfRange {
                book: book.to_string(),
                chapter,
                verse,
            });
        }
        let chapters = self.books.entry(book.to_string()).or_default();
        let (c, v) = (chapter as usize - 1, verse as usize - 1);
        if chapters.len() <= c {
            chapters.resize_with(c + 1, Vec::new);
        }
        let verses = &mut chapters[c];
        if verses.len() <= v {
            verses.resize(v + 1, 0);
        }
        verses[v] = word_count;
        Ok(())
    }

    pub fn book(&self, book: &str) -> Option<&[Vec<u32>]> {
        self.books.get(book).map(Vec::as_slice)
    }

    pub fn contains_book(&self, book: &str) -> bool {
        self.books.contains_key(book)
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn verse_count(&self) -> usize {
        self.books.values().flatten().map(Vec::len).sum()
    }

    fn chapters(&self, book: &str) -> Result<&[Vec<u32>], DistanceError> {
        self.book(book)
            .ok_or_else(|| DistanceError::UnknownBook(book.to_string()))
    }
}

/// Word count of the verse containing `position`.
pub fn verse_len(
    table: &WordCountTable,
    book: &str,
    position: &Position,
) -> Result<u32, DistanceError> {
    let chapters = table.chapters(book)?;
    let (chapter, verse) = position.chapter_verse();
    lookup_verse(chapters, book, chapter, verse)
}

/// Word-count distance covered by `range` in `book`, both ends inclusive.
///
/// Whole verses from the start verse up to (not including) the stop verse
/// are summed; atoms before the start atom are then removed and atoms up to
/// and including the stop atom added. Absent and half-verse atoms count as
/// atom 1.
pub fn calc(
    table: &WordCountTable,
    book: &str,
    range: &PositionRange,
) -> Result<WordCountDistance, DistanceError> {
    calc_between(table, book, range.start(), range.stop())
}

pub(crate) fn calc_between(
    table: &WordCountTable,
    book: &str,
    start: &Position,
    stop: &Position,
) -> Result<WordCountDistance, DistanceError> {
    let chapters = table.chapters(book)?;
    for end in [start, stop] {
        let (chapter, verse) = end.chapter_verse();
        lookup_verse(chapters, book, chapter, verse)?;
    }

    let mut word_count = -i64::from(start.atom().distance_index());
    let (mut chapter, mut verse) = start.chapter_verse();
    while (chapter, verse) < stop.chapter_verse() {
        word_count += i64::from(lookup_verse(chapters, book, chapter, verse)?);
        (chapter, verse) = next_verse(chapters, chapter, verse);
    }
    // Stop atom is inclusive
    word_count += i64::from(stop.atom().distance_index()) + 1;

    Ok(WordCountDistance::new(word_count))
}

fn lookup_verse(
    chapters: &[Vec<u32>],
    book: &str,
    chapter: u32,
    verse: u32,
) -> Result<u32, DistanceError> {
    let out_of_range = || DistanceError::VerseOutOfRange {
        book: book.to_string(),
        chapter,
        verse,
    };
    let c = (chapter as usize).checked_sub(1).ok_or_else(out_of_range)?;
    let v = (verse as usize).checked_sub(1).ok_or_else(out_of_range)?;
    chapters
        .get(c)
        .and_then(|verses| verses.get(v))
        .copied()
        .ok_or_else(out_of_range)
}

fn next_verse(chapters: &[Vec<u32>], chapter: u32, verse: u32) -> (u32, u32) {
    let verses_in_chapter = chapters
        .get(chapter as usize - 1)
        .map_or(0, |verses| verses.len());
    if verse as usize + 1 > verses_in_chapter {
        (chapter + 1, 1)
    } else {
        (chapter, verse + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Atom;

    fn job_table() -> WordCountTable {
        let mut table = WordCountTable::new();
        table.insert_book("Job", vec![vec![5, 7, 9], vec![4, 6]]);
        table
    }

    fn range(start: (u32, u32, u32), stop: (u32, u32, u32)) -> PositionRange {
        PositionRange::new(
            Position::new(start.0, start.1, Atom::Index(start.2)),
            Position::new(stop.0, stop.1, Atom::Index(stop.2)),
        )
        .unwrap()
    }

    #[test]
    fn test_group_laws() {
        for a in [-40, -1, 0, 3, 17, 1000] {
            for b in [-7, 0, 1, 21, 999] {
                let (da, db) = (WordCountDistance::new(a), WordCountDistance::new(b));
                assert_eq!((da + db) - db, da);
                assert_eq!(da + db, db + da);
                assert_eq!(da + WordCountDistance::zero(), da);
            }
        }
    }

    #[test]
    fn test_unknown_propagates() {
        let known = WordCountDistance::new(12);
        let unknown = WordCountDistance::unknown();
        assert!((known + unknown).is_unknown());
        assert!((unknown + known).is_unknown());
        assert!((known - unknown).is_unknown());
        assert!((unknown - unknown).is_unknown());
        assert_eq!(unknown.word_count(), None);
    }

    #[test]
    fn test_sum() {
        let total: WordCountDistance = [3, 4, 5].into_iter().map(WordCountDistance::new).sum();
        assert_eq!(total, WordCountDistance::new(12));
    }

    #[test]
    fn test_calc_single_atom() {
        let mut table = WordCountTable::new();
        table.insert_book("Gen", vec![vec![10]]);
        let d = calc(&table, "Gen", &range((1, 1, 3), (1, 1, 3))).unwrap();
        assert_eq!(d.word_count(), Some(1));
    }

    #[test]
    fn test_calc_within_verse() {
        let d = calc(&job_table(), "Job", &range((1, 1, 1), (1, 1, 5))).unwrap();
        assert_eq!(d.word_count(), Some(5));
    }

    #[test]
    fn test_calc_across_verses_and_chapters() {
        let table = job_table();

        // Whole chapter 1
        let d = calc(&table, "Job", &range((1, 1, 1), (1, 3, 9))).unwrap();
        assert_eq!(d.word_count(), Some(21));

        // 1:3.8 through 2:1.2 = two words of 1:3 and two of 2:1
        let d = calc(&table, "Job", &range((1, 3, 8), (2, 1, 2))).unwrap();
        assert_eq!(d.word_count(), Some(4));
    }

    #[test]
    fn test_calc_half_verse_counts_as_first_atom() {
        let table = job_table();
        let half = PositionRange::new(
            Position::new(1, 2, Atom::Half(crate::models::HalfVerse::Second)),
            Position::new(1, 2, Atom::Index(4)),
        )
        .unwrap();
        let indexed = range((1, 2, 1), (1, 2, 4));
        assert_eq!(
            calc(&table, "Job", &half).unwrap(),
            calc(&table, "Job", &indexed).unwrap()
        );
    }

    #[test]
    fn test_calc_unknown_book() {
        let err = calc(&job_table(), "Ruth", &range((1, 1, 1), (1, 1, 1))).unwrap_err();
        assert_eq!(err, DistanceError::UnknownBook("Ruth".to_string()));
    }

    #[test]
    fn test_calc_past_end_of_book() {
        let err = calc(&job_table(), "Job", &range((2, 2, 1), (3, 2, 1))).unwrap_err();
        assert!(matches!(err, DistanceError::VerseOutOfRange { chapter: 3, .. }));
    }

    #[test]
    fn test_verse_len() {
        let table = job_table();
        let pos = Position::new(2, 2, Atom::Absent);
        assert_eq!(verse_len(&table, "Job", &pos).unwrap(), 6);
        assert!(verse_len(&table, "Job", &Position::new(2, 3, Atom::Absent)).is_err());
    }

    #[test]
    fn test_insert_verse_grows_book() {
        let mut table = WordCountTable::new();
        table.insert_verse("Ruth", 2, 3, 11).unwrap();
        table.insert_verse("Ruth", 1, 1, 8).unwrap();
        assert_eq!(
            table.book("Ruth").unwrap().to_vec(),
            vec![vec![8u32], vec![0, 0, 11]]
        );
        assert_eq!(table.verse_count(), 4);
    }

    #[test]
    fn test_insert_verse_rejects_zero() {
        let mut table = WordCountTable::new();
        assert!(matches!(
            table.insert_verse("Ruth", 0, 1, 8),
            Err(DistanceError::VerseOutOfRange { chapter: 0, .. })
        ));
        assert!(table.insert_verse("Ruth", 1, 0, 8).is_err());
        assert!(!table.contains_book("Ruth"));
    }

    #[test]
    fn test_calc_stop_verse_missing_from_chapter() {
        // Chapter 1 has three verses; 1:9 lies between 1:3 and 2:1 by key only
        let err = calc(&job_table(), "Job", &range((1, 1, 1), (1, 9, 1))).unwrap_err();
        assert_eq!(
            err,
            DistanceError::VerseOutOfRange {
                book: "Job".to_string(),
                chapter: 1,
                verse: 9,
            }
        );

        let err = calc(&job_table(), "Job", &range((1, 4, 1), (2, 1, 1))).unwrap_err();
        assert!(matches!(err, DistanceError::VerseOutOfRange { chapter: 1, verse: 4, .. }));
    }
}
