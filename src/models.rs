//! Data structures for the citation-to-location pipeline.

use crate::distance::WordCountDistance;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lines per manuscript column used by the flat-line model.
pub const LINES_PER_COLUMN: u32 = 27;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Malformed page ID: {0:?} (expected three digits followed by A or B)")]
    MalformedPageId(String),
    #[error("Invalid leaf side: {0:?}")]
    InvalidSide(char),
    #[error("Leaf number out of range: {0}")]
    LeafOutOfRange(u32),
    #[error("Invalid atom: {0:?}")]
    InvalidAtom(String),
    #[error("Cannot decrement atom {0}")]
    CannotDecrement(Atom),
    #[error("Malformed citation: {0:?}")]
    MalformedCitation(String),
    #[error("Position range start {start} is after stop {stop}")]
    InvertedRange { start: Position, stop: Position },
    #[error("Book ID and position range must be both present or both absent (page {0})")]
    BookRangeMismatch(String),
    #[error("Column/line fields are partially filled (page {0})")]
    PartialColumnLine(String),
    #[error("Chapter/verse fields are partially filled (page {0})")]
    PartialPosition(String),
    #[error("Column and line numbers start at 1 (page {0})")]
    ZeroColumnLine(String),
}

// ============================================================================
// Positions and citations
// ============================================================================

/// Half-verse tag used when a record only resolves a verse to one of its halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HalfVerse {
    First,
    Second,
}

impl HalfVerse {
    pub fn tag(self) -> &'static str {
        match self {
            HalfVerse::First => "a",
            HalfVerse::Second => "b",
        }
    }
}

/// Part of a verse: nothing, an atom index (1-based), or a half-verse tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Atom {
    #[default]
    Absent,
    Index(u32),
    Half(HalfVerse),
}

impl Atom {
    /// The atom index, if this atom is resolved to one.
    pub fn index(self) -> Option<u32> {
        match self {
            Atom::Index(n) => Some(n),
            Atom::Absent | Atom::Half(_) => None,
        }
    }

    /// Atom index used by word-count arithmetic.
    ///
    /// Absent atoms and half-verse tags count as the first atom of the verse.
    pub fn distance_index(self) -> u32 {
        self.index().unwrap_or(1)
    }
}

/// Only resolved indices order against each other; tags only against the same kind.
impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Atom::Index(a), Atom::Index(b)) => Some(a.cmp(b)),
            (Atom::Half(a), Atom::Half(b)) => Some(a.cmp(b)),
            (Atom::Absent, Atom::Absent) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Absent => write!(f, "-"),
            Atom::Index(n) => write!(f, "{}", n),
            Atom::Half(half) => write!(f, "{}", half.tag()),
        }
    }
}

impl FromStr for Atom {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(Atom::Absent),
            "a" => Ok(Atom::Half(HalfVerse::First)),
            "b" => Ok(Atom::Half(HalfVerse::Second)),
            digits => match digits.parse::<u32>() {
                Ok(n) if n >= 1 => Ok(Atom::Index(n)),
                _ => Err(ModelError::InvalidAtom(s.to_string())),
            },
        }
    }
}

// Flat form: null, an integer, or "a"/"b".
impl Serialize for Atom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Atom::Absent => serializer.serialize_none(),
            Atom::Index(n) => serializer.serialize_u32(*n),
            Atom::Half(half) => serializer.serialize_str(half.tag()),
        }
    }
}

impl<'de> Deserialize<'de> for Atom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Index(u32),
            Tag(String),
        }

        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(Atom::Absent),
            Some(Repr::Index(0)) => Err(serde::de::Error::custom("atom index starts at 1")),
            Some(Repr::Index(n)) => Ok(Atom::Index(n)),
            Some(Repr::Tag(tag)) => tag.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// A (chapter, verse, atom) point within one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    chapter: u32,
    verse: u32,
    atom: Atom,
}

impl Position {
    pub fn new(chapter: u32, verse: u32, atom: Atom) -> Self {
        Position {
            chapter,
            verse,
            atom,
        }
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn verse(&self) -> u32 {
        self.verse
    }

    /// Get (chapter, verse) pair
    pub fn chapter_verse(&self) -> (u32, u32) {
        (self.chapter, self.verse)
    }

    pub fn atom(&self) -> Atom {
        self.atom
    }

    /// Same chapter and verse, atom one less. Atom 0 does not exist.
    pub fn decrement_atom(&self) -> Result<Position, ModelError> {
        match self.atom {
            Atom::Index(n) if n > 1 => Ok(self.with_atom(Atom::Index(n - 1))),
            other => Err(ModelError::CannotDecrement(other)),
        }
    }

    /// Same chapter and verse with a different atom.
    pub fn with_atom(&self, atom: Atom) -> Position {
        Position::new(self.chapter, self.verse, atom)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.chapter_verse().cmp(&other.chapter_verse()) {
            Ordering::Equal => self.atom.partial_cmp(&other.atom),
            ord => Some(ord),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.atom {
            Atom::Absent => write!(f, "{}:{}", self.chapter, self.verse),
            Atom::Index(n) => write!(f, "{}:{}.{}", self.chapter, self.verse, n),
            Atom::Half(half) => write!(f, "{}:{}{}", self.chapter, self.verse, half.tag()),
        }
    }
}

/// An inclusive (start, stop) range of positions within one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionRange {
    start: Position,
    stop: Position,
}

impl PositionRange {
    /// Rejects ranges whose start is known to come after their stop.
    pub fn new(start: Position, stop: Position) -> Result<Self, ModelError> {
        if start.partial_cmp(&stop) == Some(Ordering::Greater) {
            return Err(ModelError::InvertedRange { start, stop });
        }
        Ok(PositionRange { start, stop })
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn stop(&self) -> &Position {
        &self.stop
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.start, self.stop)
    }
}

/// A fully qualified (book, chapter, verse, atom) reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    #[serde(default)]
    pub atom: Atom,
}

impl Citation {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32, atom: Atom) -> Self {
        Citation {
            book: book.into(),
            chapter,
            verse,
            atom,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.chapter, self.verse, self.atom)
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.book, self.position())
    }
}

/// Parses `Book C:V`, `Book C:V.A` or `Book C:Va`/`Book C:Vb`.
///
/// A citation without an atom points at the first atom of the verse.
impl FromStr for Citation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ModelError::MalformedCitation(s.to_string());

        let (book, cv) = s.trim().rsplit_once(char::is_whitespace).ok_or_else(malformed)?;
        let book = book.trim();
        let (chapter, rest) = cv.split_once(':').ok_or_else(malformed)?;
        let chapter: u32 = chapter.parse().map_err(|_| malformed())?;

        let (verse, atom) = match rest.split_once('.') {
            Some((verse, atom)) => (verse, atom.parse::<Atom>()?),
            None => match rest.strip_suffix('a') {
                Some(verse) => (verse, Atom::Half(HalfVerse::First)),
                None => match rest.strip_suffix('b') {
                    Some(verse) => (verse, Atom::Half(HalfVerse::Second)),
                    None => (rest, Atom::Index(1)),
                },
            },
        };
        let verse: u32 = verse.parse().map_err(|_| malformed())?;

        if book.is_empty() || chapter == 0 || verse == 0 {
            return Err(malformed());
        }

        Ok(Citation::new(book, chapter, verse, atom))
    }
}

// ============================================================================
// Pages, columns and lines
// ============================================================================

/// Side of a manuscript leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn letter(self) -> char {
        match self {
            Side::A => 'A',
            Side::B => 'B',
        }
    }
}

impl TryFrom<char> for Side {
    type Error = ModelError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'A' => Ok(Side::A),
            'B' => Ok(Side::B),
            other => Err(ModelError::InvalidSide(other)),
        }
    }
}

/// Page ID: three-digit leaf number plus side, e.g. `007B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageId {
    leaf: u16,
    side: Side,
}

impl PageId {
    pub fn new(leaf: u16, side: Side) -> Result<Self, ModelError> {
        if leaf > 999 {
            return Err(ModelError::LeafOutOfRange(u32::from(leaf)));
        }
        Ok(PageId { leaf, side })
    }

    pub fn leaf(&self) -> u16 {
        self.leaf
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}{}", self.leaf, self.side.letter())
    }
}

impl FromStr for PageId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (leaf, side) = parse_page_id(s)?;
        PageId::new(leaf, Side::try_from(side)?)
    }
}

impl TryFrom<String> for PageId {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PageId> for String {
    fn from(page: PageId) -> Self {
        page.to_string()
    }
}

/// Parse a page ID string into its leaf number and side letter.
pub fn parse_page_id(page_id: &str) -> Result<(u16, char), ModelError> {
    let malformed = || ModelError::MalformedPageId(page_id.to_string());

    let bytes = page_id.as_bytes();
    if bytes.len() != 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    let side = match bytes[3] {
        b'A' => 'A',
        b'B' => 'B',
        _ => return Err(malformed()),
    };
    let leaf = page_id[..3].parse().map_err(|_| malformed())?;
    Ok((leaf, side))
}

/// Turn a leaf number and side letter into a page ID string like `007B`.
pub fn unparse_page_id(leaf: u16, side: char) -> String {
    format!("{:03}{}", leaf, side)
}

/// A (column, line) point on a page, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnLine {
    pub column: u32,
    pub line: u32,
}

impl ColumnLine {
    pub fn new(column: u32, line: u32) -> Self {
        ColumnLine { column, line }
    }
}

/// Column/line extent of a breakpoint record on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnLineRange {
    pub start: ColumnLine,
    pub stop: ColumnLine,
}

impl ColumnLineRange {
    pub fn new(start: ColumnLine, stop: ColumnLine) -> Self {
        ColumnLineRange { start, stop }
    }

    /// Number of flat lines covered, both ends inclusive.
    pub fn flat_lines(&self, lines_per_column: u32) -> i64 {
        let columns = i64::from(self.stop.column) - i64::from(self.start.column);
        let lines = i64::from(self.stop.line) - i64::from(self.start.line);
        i64::from(lines_per_column) * columns + lines + 1
    }

    /// Flat line on which the extent starts.
    pub fn start_flat_line(&self, lines_per_column: u32) -> i64 {
        let preceding_columns = i64::from(self.start.column) - 1;
        i64::from(lines_per_column) * preceding_columns + i64::from(self.start.line)
    }
}

// ============================================================================
// Breakpoint records
// ============================================================================

/// The biblical side of a breakpoint record: a book and a range within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Passage {
    pub book: String,
    pub range: PositionRange,
}

/// A known correspondence between a page (optionally a column/line extent)
/// and a citation range. Records without a passage cover non-biblical
/// material such as masoretic lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakpointRecord {
    page: PageId,
    extent: Option<ColumnLineRange>,
    passage: Option<Passage>,
    note: Option<String>,
}

impl BreakpointRecord {
    pub fn new(
        page: PageId,
        extent: Option<ColumnLineRange>,
        passage: Option<Passage>,
        note: Option<String>,
    ) -> Self {
        BreakpointRecord {
            page,
            extent,
            passage,
            note,
        }
    }

    /// Build from separately supplied book and range, which must agree on presence.
    pub fn from_parts(
        page: PageId,
        extent: Option<ColumnLineRange>,
        book: Option<String>,
        range: Option<PositionRange>,
        note: Option<String>,
    ) -> Result<Self, ModelError> {
        if let Some(extent) = &extent {
            let (start, stop) = (extent.start, extent.stop);
            if [start.column, start.line, stop.column, stop.line].contains(&0) {
                return Err(ModelError::ZeroColumnLine(page.to_string()));
            }
        }
        let passage = match (book, range) {
            (Some(book), Some(range)) => Some(Passage { book, range }),
            (None, None) => None,
            _ => return Err(ModelError::BookRangeMismatch(page.to_string())),
        };
        Ok(BreakpointRecord::new(page, extent, passage, note))
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn extent(&self) -> Option<&ColumnLineRange> {
        self.extent.as_ref()
    }

    pub fn passage(&self) -> Option<&Passage> {
        self.passage.as_ref()
    }

    pub fn book(&self) -> Option<&str> {
        self.passage.as_ref().map(|p| p.book.as_str())
    }

    pub fn range(&self) -> Option<&PositionRange> {
        self.passage.as_ref().map(|p| &p.range)
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Whether this record covers biblical text.
    pub fn is_real(&self) -> bool {
        self.passage.is_some()
    }

    /// Refine the atoms of the range ends. `None` keeps the current atom.
    pub fn with_atoms(
        &self,
        start_atom: Option<Atom>,
        stop_atom: Option<Atom>,
    ) -> Result<BreakpointRecord, ModelError> {
        let passage = match &self.passage {
            Some(passage) => {
                let start = passage.range.start();
                let stop = passage.range.stop();
                let start = start_atom.map_or(*start, |atom| start.with_atom(atom));
                let stop = stop_atom.map_or(*stop, |atom| stop.with_atom(atom));
                Some(Passage {
                    book: passage.book.clone(),
                    range: PositionRange::new(start, stop)?,
                })
            }
            None => None,
        };
        Ok(BreakpointRecord {
            passage,
            ..self.clone()
        })
    }
}

/// A breakpoint record with cached word-count distances from the start of its page.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedBreakpointRecord {
    pub record: BreakpointRecord,
    pub start_distance: WordCountDistance,
    pub stop_distance: WordCountDistance,
    pub start_verse_len: Option<u32>,
    pub stop_verse_len: Option<u32>,
}

impl AugmentedBreakpointRecord {
    /// Augmentation of a non-biblical record: nothing is known.
    pub fn unknown(record: BreakpointRecord) -> Self {
        AugmentedBreakpointRecord {
            record,
            start_distance: WordCountDistance::unknown(),
            stop_distance: WordCountDistance::unknown(),
            start_verse_len: None,
            stop_verse_len: None,
        }
    }
}

/// Total word count of each page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLengths(BTreeMap<PageId, WordCountDistance>);

impl PageLengths {
    pub fn get(&self, page: PageId) -> Option<WordCountDistance> {
        self.0.get(&page).copied()
    }

    pub fn set(&mut self, page: PageId, length: WordCountDistance) {
        self.0.insert(page, length);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PageId, WordCountDistance)> + '_ {
        self.0.iter().map(|(page, length)| (*page, *length))
    }
}

// ============================================================================
// Flat forms for JSON/CSV exchange
// ============================================================================

/// A breakpoint record as stored in JSON files and database rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatBreakpointRecord {
    pub page: String,
    #[serde(default)]
    pub startco: Option<u32>,
    #[serde(default)]
    pub startli: Option<u32>,
    #[serde(default)]
    pub stopco: Option<u32>,
    #[serde(default)]
    pub stopli: Option<u32>,
    #[serde(default)]
    pub bkid: Option<String>,
    #[serde(default)]
    pub startc: Option<u32>,
    #[serde(default)]
    pub startv: Option<u32>,
    #[serde(default)]
    pub startp: Atom,
    #[serde(default)]
    pub stopc: Option<u32>,
    #[serde(default)]
    pub stopv: Option<u32>,
    #[serde(default)]
    pub stopp: Atom,
    #[serde(default)]
    pub note: Option<String>,
}

impl TryFrom<FlatBreakpointRecord> for BreakpointRecord {
    type Error = ModelError;

    fn try_from(flat: FlatBreakpointRecord) -> Result<Self, Self::Error> {
        let page: PageId = flat.page.parse()?;

        let extent = match (flat.startco, flat.startli, flat.stopco, flat.stopli) {
            (None, None, None, None) => None,
            (Some(startco), Some(startli), Some(stopco), Some(stopli)) => Some(
                ColumnLineRange::new(ColumnLine::new(startco, startli), ColumnLine::new(stopco, stopli)),
            ),
            _ => return Err(ModelError::PartialColumnLine(flat.page)),
        };

        let range = match (flat.startc, flat.startv, flat.stopc, flat.stopv) {
            (None, None, None, None) => {
                if flat.startp != Atom::Absent || flat.stopp != Atom::Absent {
                    return Err(ModelError::PartialPosition(flat.page));
                }
                None
            }
            (Some(startc), Some(startv), Some(stopc), Some(stopv)) => Some(PositionRange::new(
                Position::new(startc, startv, flat.startp),
                Position::new(stopc, stopv, flat.stopp),
            )?),
            _ => return Err(ModelError::PartialPosition(flat.page)),
        };

        BreakpointRecord::from_parts(page, extent, flat.bkid, range, flat.note)
    }
}

impl From<&BreakpointRecord> for FlatBreakpointRecord {
    fn from(record: &BreakpointRecord) -> Self {
        let extent = record.extent();
        let range = record.range();
        FlatBreakpointRecord {
            page: record.page().to_string(),
            startco: extent.map(|e| e.start.column),
            startli: extent.map(|e| e.start.line),
            stopco: extent.map(|e| e.stop.column),
            stopli: extent.map(|e| e.stop.line),
            bkid: record.book().map(str::to_string),
            startc: range.map(|r| r.start().chapter()),
            startv: range.map(|r| r.start().verse()),
            startp: range.map_or(Atom::Absent, |r| r.start().atom()),
            stopc: range.map(|r| r.stop().chapter()),
            stopv: range.map(|r| r.stop().verse()),
            stopp: range.map_or(Atom::Absent, |r| r.stop().atom()),
            note: record.note().map(str::to_string),
        }
    }
}

/// An augmented record flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatAugmentedRecord {
    #[serde(flatten)]
    pub record: FlatBreakpointRecord,
    pub start_word_count: Option<i64>,
    pub stop_word_count: Option<i64>,
    pub startl: Option<u32>,
    pub stopl: Option<u32>,
}

impl From<&AugmentedBreakpointRecord> for FlatAugmentedRecord {
    fn from(augrec: &AugmentedBreakpointRecord) -> Self {
        FlatAugmentedRecord {
            record: FlatBreakpointRecord::from(&augrec.record),
            start_word_count: augrec.start_distance.word_count(),
            stop_word_count: augrec.stop_distance.word_count(),
            startl: augrec.start_verse_len,
            stopl: augrec.stop_verse_len,
        }
    }
}

/// A page length flattened for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatPageLength {
    pub page: String,
    pub word_count: Option<i64>,
}

// ============================================================================
// Estimates and parameters
// ============================================================================

/// Estimated location of a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationEstimate {
    pub page: PageId,
    #[serde(rename = "fline-guess")]
    pub fline_guess: String,
    #[serde(rename = "line-guess")]
    pub line_guess: String,
    #[serde(rename = "column-guess")]
    pub column_guess: u8,
    #[serde(skip)]
    pub fline: f64,
}

impl LocationEstimate {
    /// Split a flat line into column and line, rendering both estimates.
    pub fn from_flat_line(page: PageId, fline: f64, params: &LocatorParams) -> Self {
        let (column, line) = column_and_line(fline, params.lines_per_column);
        LocationEstimate {
            page,
            fline_guess: format!("{:.*}", params.precision, fline),
            line_guess: format!("{:.*}", params.precision, line),
            column_guess: column,
            fline,
        }
    }
}

/// Convert a flat line into (column, line within column), three columns at most.
pub fn column_and_line(fline: f64, lines_per_column: u32) -> (u8, f64) {
    let lpc = f64::from(lines_per_column);
    if fline > 2.0 * lpc {
        (3, fline - 2.0 * lpc)
    } else if fline >= lpc + 1.0 {
        (2, fline - lpc)
    } else {
        (1, fline)
    }
}

/// Outcome of one citation in a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub citation: String,
    #[serde(flatten)]
    pub estimate: Option<LocationEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    pub lines_per_column: u32,
    /// Decimal places for rendered line estimates
    pub precision: usize,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            lines_per_column: LINES_PER_COLUMN,
            precision: 1,
        }
    }
}

/// Summary of loaded calibration data.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total_records: usize,
    pub biblical_records: usize,
    pub non_biblical_records: usize,
    pub pinpointed_records: usize,
    pub pages: usize,
    pub books: Vec<String>,
    pub total_words: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_round_trip() {
        for id in ["007B", "123A", "000A", "999B"] {
            let (leaf, side) = parse_page_id(id).unwrap();
            assert_eq!(unparse_page_id(leaf, side), id);
            assert_eq!(id.parse::<PageId>().unwrap().to_string(), id);
        }
        assert_eq!(parse_page_id("007B").unwrap(), (7, 'B'));
    }

    #[test]
    fn test_page_id_rejects_malformed() {
        for id in ["7B", "0007B", "007C", "007b", "0x7A", "", "١٢٣A"] {
            assert!(parse_page_id(id).is_err(), "{id} should be rejected");
        }
    }

    #[test]
    fn test_page_id_ordering() {
        let a: PageId = "007A".parse().unwrap();
        let b: PageId = "007B".parse().unwrap();
        let c: PageId = "010A".parse().unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_decrement_atom() {
        let pos = Position::new(3, 4, Atom::Index(5));
        assert_eq!(pos.decrement_atom().unwrap().atom(), Atom::Index(4));

        assert!(Position::new(3, 4, Atom::Index(1)).decrement_atom().is_err());
        assert!(Position::new(3, 4, Atom::Absent).decrement_atom().is_err());
        assert!(Position::new(3, 4, Atom::Half(HalfVerse::Second))
            .decrement_atom()
            .is_err());
    }

    #[test]
    fn test_position_ordering() {
        let p = |c, v, a| Position::new(c, v, Atom::Index(a));
        assert!(p(1, 2, 9) < p(1, 3, 1));
        assert!(p(1, 3, 1) < p(1, 3, 2));
        assert!(p(1, 30, 1) < p(2, 1, 1));

        let half = Position::new(1, 3, Atom::Half(HalfVerse::First));
        assert_eq!(half.partial_cmp(&p(1, 3, 1)), None);
        assert!(half < p(1, 4, 1));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let start = Position::new(2, 1, Atom::Index(1));
        let stop = Position::new(1, 9, Atom::Index(1));
        assert!(PositionRange::new(start, stop).is_err());
        assert!(PositionRange::new(stop, start).is_ok());
    }

    #[test]
    fn test_citation_parsing() {
        let c: Citation = "Job 1:1.3".parse().unwrap();
        assert_eq!(c, Citation::new("Job", 1, 1, Atom::Index(3)));

        let c: Citation = "Job 38:2".parse().unwrap();
        assert_eq!(c.atom, Atom::Index(1));

        let c: Citation = "Song of Songs 2:4b".parse().unwrap();
        assert_eq!(c.book, "Song of Songs");
        assert_eq!(c.atom, Atom::Half(HalfVerse::Second));

        assert!("Job".parse::<Citation>().is_err());
        assert!("Job 1".parse::<Citation>().is_err());
        assert!("Job 0:1".parse::<Citation>().is_err());
        assert!("Job 1:x.2".parse::<Citation>().is_err());
    }

    #[test]
    fn test_column_line_extent() {
        let extent = ColumnLineRange::new(ColumnLine::new(1, 1), ColumnLine::new(1, 5));
        assert_eq!(extent.flat_lines(27), 5);
        assert_eq!(extent.start_flat_line(27), 1);

        let extent = ColumnLineRange::new(ColumnLine::new(2, 20), ColumnLine::new(3, 4));
        assert_eq!(extent.flat_lines(27), 27 - 16 + 1);
        assert_eq!(extent.start_flat_line(27), 47);
    }

    #[test]
    fn test_column_and_line() {
        assert_eq!(column_and_line(1.0, 27), (1, 1.0));
        assert_eq!(column_and_line(27.5, 27), (1, 27.5));
        assert_eq!(column_and_line(28.0, 27), (2, 1.0));
        assert_eq!(column_and_line(54.0, 27), (2, 27.0));
        assert_eq!(column_and_line(60.0, 27), (3, 6.0));
    }

    #[test]
    fn test_flat_record_conversion() {
        let json = r#"{
            "page": "100A", "startco": 1, "startli": 1, "stopco": 1, "stopli": 5,
            "bkid": "Job", "startc": 1, "startv": 1, "startp": 1,
            "stopc": 1, "stopv": 1, "stopp": "b", "note": null
        }"#;
        let flat: FlatBreakpointRecord = serde_json::from_str(json).unwrap();
        let record = BreakpointRecord::try_from(flat.clone()).unwrap();

        assert_eq!(record.page().to_string(), "100A");
        assert_eq!(record.book(), Some("Job"));
        assert_eq!(
            record.range().unwrap().stop().atom(),
            Atom::Half(HalfVerse::Second)
        );
        assert_eq!(FlatBreakpointRecord::from(&record), flat);
    }

    #[test]
    fn test_flat_record_non_biblical() {
        let json = r#"{"page": "101B", "note": "masoretic list"}"#;
        let flat: FlatBreakpointRecord = serde_json::from_str(json).unwrap();
        let record = BreakpointRecord::try_from(flat).unwrap();
        assert!(!record.is_real());
        assert!(record.extent().is_none());
        assert_eq!(record.note(), Some("masoretic list"));
    }

    #[test]
    fn test_flat_record_rejects_partial_groups() {
        let partial_extent = FlatBreakpointRecord {
            page: "100A".to_string(),
            startco: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            BreakpointRecord::try_from(partial_extent),
            Err(ModelError::PartialColumnLine(_))
        ));

        let book_without_range = FlatBreakpointRecord {
            page: "100A".to_string(),
            bkid: Some("Job".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            BreakpointRecord::try_from(book_without_range),
            Err(ModelError::BookRangeMismatch(_))
        ));
    }

    #[test]
    fn test_flat_record_rejects_zero_column_or_line() {
        let zero_start = FlatBreakpointRecord {
            page: "100A".to_string(),
            startco: Some(0),
            startli: Some(0),
            stopco: Some(1),
            stopli: Some(5),
            ..Default::default()
        };
        assert_eq!(
            BreakpointRecord::try_from(zero_start),
            Err(ModelError::ZeroColumnLine("100A".to_string()))
        );

        let extent = ColumnLineRange::new(ColumnLine::new(1, 1), ColumnLine::new(2, 0));
        assert!(matches!(
            BreakpointRecord::from_parts("100A".parse().unwrap(), Some(extent), None, None, None),
            Err(ModelError::ZeroColumnLine(_))
        ));
    }

    #[test]
    fn test_atom_zero_rejected() {
        assert_eq!("0".parse::<Atom>(), Err(ModelError::InvalidAtom("0".to_string())));
        assert_eq!("7".parse::<Atom>(), Ok(Atom::Index(7)));
        assert!("Job 1:1.0".parse::<Citation>().is_err());
        assert!(serde_json::from_str::<Atom>("0").is_err());
        assert_eq!(serde_json::from_str::<Atom>("3").unwrap(), Atom::Index(3));
    }

    #[test]
    fn test_with_atoms() {
        let range = PositionRange::new(
            Position::new(1, 1, Atom::Half(HalfVerse::First)),
            Position::new(1, 2, Atom::Absent),
        )
        .unwrap();
        let page = "050A".parse().unwrap();
        let record =
            BreakpointRecord::from_parts(page, None, Some("Job".to_string()), Some(range), None)
                .unwrap();

        let refined = record.with_atoms(Some(Atom::Index(1)), None).unwrap();
        assert_eq!(refined.range().unwrap().start().atom(), Atom::Index(1));
        assert_eq!(refined.range().unwrap().stop().atom(), Atom::Absent);
        assert_eq!(refined.page(), record.page());
    }
}
