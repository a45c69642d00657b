//! Book order and corpus sections.
//!
//! The book order ranks every book so that citations from different books
//! compare on a single key. The section of a book decides how many columns
//! its pages are written in.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("Duplicate book in book order: {0}")]
    DuplicateBook(String),
    #[error("Duplicate rank in book order: {0}")]
    DuplicateRank(u32),
    #[error("Unknown section: {0:?}")]
    UnknownSection(String),
}

/// Division of the canon a book belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Torah,
    FormerProphets,
    LatterProphets,
    /// Psalms, Proverbs and Job, laid out in two columns
    SifreiEmet,
    Writings,
}

impl Section {
    pub fn page_column_count(self) -> u32 {
        match self {
            Section::SifreiEmet => 2,
            _ => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Torah => "torah",
            Section::FormerProphets => "former_prophets",
            Section::LatterProphets => "latter_prophets",
            Section::SifreiEmet => "sifrei_emet",
            Section::Writings => "writings",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "torah" => Ok(Section::Torah),
            "former_prophets" => Ok(Section::FormerProphets),
            "latter_prophets" => Ok(Section::LatterProphets),
            "sifrei_emet" | "sifre_emet" => Ok(Section::SifreiEmet),
            "writings" => Ok(Section::Writings),
            _ => Err(BookError::UnknownSection(s.to_string())),
        }
    }
}

/// One row of the book table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEntry {
    pub book_id: String,
    pub rank: u32,
    pub section: Section,
}

/// Book ID -> rank and section.
#[derive(Debug, Clone, PartialEq)]
pub struct BookOrder {
    entries: HashMap<String, BookEntry>,
}

impl BookOrder {
    /// Build from entries; book IDs and ranks must be unique.
    pub fn new(entries: impl IntoIterator<Item = BookEntry>) -> Result<Self, BookError> {
        let mut by_id = HashMap::new();
        let mut ranks = HashSet::new();
        for entry in entries {
            if !ranks.insert(entry.rank) {
                return Err(BookError::DuplicateRank(entry.rank));
            }
            if by_id.contains_key(&entry.book_id) {
                return Err(BookError::DuplicateBook(entry.book_id));
            }
            by_id.insert(entry.book_id.clone(), entry);
        }
        Ok(BookOrder { entries: by_id })
    }

    pub fn rank(&self, book: &str) -> Option<u32> {
        self.entries.get(book).map(|e| e.rank)
    }

    pub fn section(&self, book: &str) -> Option<Section> {
        self.entries.get(book).map(|e| e.section)
    }

    pub fn page_column_count(&self, book: &str) -> Option<u32> {
        self.section(book).map(Section::page_column_count)
    }

    pub fn contains(&self, book: &str) -> bool {
        self.entries.contains_key(book)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in rank order
    pub fn entries(&self) -> Vec<&BookEntry> {
        let mut entries: Vec<&BookEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.rank);
        entries
    }
}

/// Books of the canon in codex order, with their sections.
const CANON: &[(&str, Section)] = &[
    ("Genesis", Section::Torah),
    ("Exodus", Section::Torah),
    ("Leviticus", Section::Torah),
    ("Numbers", Section::Torah),
    ("Deuteronomy", Section::Torah),
    ("Joshua", Section::FormerProphets),
    ("Judges", Section::FormerProphets),
    ("1Samuel", Section::FormerProphets),
    ("2Samuel", Section::FormerProphets),
    ("1Kings", Section::FormerProphets),
    ("2Kings", Section::FormerProphets),
    ("Isaiah", Section::LatterProphets),
    ("Jeremiah", Section::LatterProphets),
    ("Ezekiel", Section::LatterProphets),
    ("Hosea", Section::LatterProphets),
    ("Joel", Section::LatterProphets),
    ("Amos", Section::LatterProphets),
    ("Obadiah", Section::LatterProphets),
    ("Jonah", Section::LatterProphets),
    ("Micah", Section::LatterProphets),
    ("Nahum", Section::LatterProphets),
    ("Habakkuk", Section::LatterProphets),
    ("Zephaniah", Section::LatterProphets),
    ("Haggai", Section::LatterProphets),
    ("Zechariah", Section::LatterProphets),
    ("Malachi", Section::LatterProphets),
    ("1Chronicles", Section::Writings),
    ("2Chronicles", Section::Writings),
    ("Psalms", Section::SifreiEmet),
    ("Job", Section::SifreiEmet),
    ("Proverbs", Section::SifreiEmet),
    ("Ruth", Section::Writings),
    ("Song", Section::Writings),
    ("Ecclesiastes", Section::Writings),
    ("Lamentations", Section::Writings),
    ("Esther", Section::Writings),
    ("Daniel", Section::Writings),
    ("Ezra", Section::Writings),
    ("Nehemiah", Section::Writings),
];

impl Default for BookOrder {
    fn default() -> Self {
        let entries = CANON.iter().zip(1..).map(|(&(book_id, section), rank)| BookEntry {
            book_id: book_id.to_string(),
            rank,
            section,
        });
        // Ranks come from a counter and the canon lists each book once
        BookOrder {
            entries: entries.map(|e| (e.book_id.clone(), e)).collect(),
        }
    }
}
