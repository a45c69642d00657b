//! Loading calibration data from a SQLite corpus database, JSON files and Excel sheets.

use crate::books::{BookEntry, BookError, BookOrder, Section};
use crate::distance::{DistanceError, WordCountTable};
use crate::models::{
    Atom, BreakpointRecord, FlatBreakpointRecord, LocatorParams, ModelError,
};
use calamine::{open_workbook, Reader, Xlsx};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),
    #[error("Excel XLSX error: {0}")]
    ExcelXlsx(#[from] calamine::XlsxError),
    #[error("Invalid record: {0}")]
    Model(#[from] ModelError),
    #[error("Invalid book table: {0}")]
    Books(#[from] BookError),
    #[error("Breakpoint row {seq}: {source}")]
    Row { seq: i64, source: ModelError },
    #[error("Word-count row {book} {chapter}:{verse} does not follow the previous row")]
    NonContiguousVerse {
        book: String,
        chapter: u32,
        verse: u32,
    },
    #[error("Word-count error: {0}")]
    Distance(#[from] DistanceError),
    #[error("Book table row for {0:?} has no valid rank")]
    InvalidBookRow(String),
    #[error("Negative word count for {book} {chapter}:{verse}")]
    NegativeWordCount {
        book: String,
        chapter: u32,
        verse: u32,
    },
    #[error("Book table in {0} has no book_id/rank/section header")]
    MissingColumns(PathBuf),
    #[error("No calibration data source given")]
    NoDataSource,
}

/// Everything the locator needs, as loaded from storage.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub word_counts: WordCountTable,
    pub books: BookOrder,
    pub records: Vec<BreakpointRecord>,
}

// ============================================================================
// SQLite
// ============================================================================

/// Load word counts, breakpoint records and the book table from a corpus database.
///
/// The `books` table is optional; without it the built-in canon is used.
pub fn load_corpus(db_path: &Path) -> Result<Corpus, DbError> {
    let conn = Connection::open(db_path)?;

    let word_counts = read_word_counts(&conn)?;
    let records = read_breakpoints(&conn)?;
    let books = read_book_order(&conn)?.unwrap_or_default();

    info!(
        path = %db_path.display(),
        books = word_counts.book_count(),
        verses = word_counts.verse_count(),
        records = records.len(),
        "loaded corpus database"
    );

    Ok(Corpus {
        word_counts,
        books,
        records,
    })
}

/// Read the `verse_word_counts` table.
pub fn read_word_counts(conn: &Connection) -> Result<WordCountTable, DbError> {
    let mut stmt = conn.prepare(
        "SELECT book_id, chapter, verse, word_count
         FROM verse_word_counts
         ORDER BY book_id, chapter, verse",
    )?;

    let mut table = WordCountTable::new();
    let mut rows = stmt.query([])?;
    let mut previous: Option<(String, u32, u32)> = None;

    while let Some(row) = rows.next()? {
        let book: String = row.get(0)?;
        let chapter: u32 = row.get(1)?;
        let verse: u32 = row.get(2)?;

        // Each book starts at 1:1 and every row is the next verse or the next chapter's first
        let follows = match &previous {
            Some((prev_book, prev_chapter, prev_verse)) if *prev_book == book => {
                (chapter, verse) == (*prev_chapter, prev_verse + 1)
                    || (chapter, verse) == (prev_chapter + 1, 1)
            }
            _ => (chapter, verse) == (1, 1),
        };
        if !follows {
            return Err(DbError::NonContiguousVerse {
                book,
                chapter,
                verse,
            });
        }

        let word_count: i64 = row.get(3)?;
        let word_count = u32::try_from(word_count).map_err(|_| DbError::NegativeWordCount {
            book: book.clone(),
            chapter,
            verse,
        })?;
        table.insert_verse(&book, chapter, verse, word_count)?;
        previous = Some((book, chapter, verse));
    }

    Ok(table)
}

/// Read the `breakpoints` table in calibration order.
pub fn read_breakpoints(conn: &Connection) -> Result<Vec<BreakpointRecord>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT seq, page, startco, startli, stopco, stopli,
                bkid, startc, startv, startp, stopc, stopv, stopp, note
         FROM breakpoints
         ORDER BY seq",
    )?;

    let mut records = Vec::new();
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let row_error = |source| DbError::Row { seq, source };

        let flat = FlatBreakpointRecord {
            page: row.get(1)?,
            startco: row.get(2)?,
            startli: row.get(3)?,
            stopco: row.get(4)?,
            stopli: row.get(5)?,
            bkid: row.get(6)?,
            startc: row.get(7)?,
            startv: row.get(8)?,
            startp: atom_from_value(row.get(9)?).map_err(row_error)?,
            stopc: row.get(10)?,
            stopv: row.get(11)?,
            stopp: atom_from_value(row.get(12)?).map_err(row_error)?,
            note: row.get(13)?,
        };
        records.push(BreakpointRecord::try_from(flat).map_err(row_error)?);
    }

    Ok(records)
}

/// Read the `books` table if the database has one.
pub fn read_book_order(conn: &Connection) -> Result<Option<BookOrder>, DbError> {
    let has_table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'books'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if has_table.is_none() {
        return Ok(None);
    }

    let mut stmt = conn.prepare("SELECT book_id, rank, section FROM books ORDER BY rank")?;
    let mut rows = stmt.query([])?;
    let mut entries = Vec::new();

    while let Some(row) = rows.next()? {
        let section: String = row.get(2)?;
        entries.push(BookEntry {
            book_id: row.get(0)?,
            rank: row.get(1)?,
            section: section.parse()?,
        });
    }

    Ok(Some(BookOrder::new(entries)?))
}

/// A `startp`/`stopp` cell: NULL, an integer, or a half-verse tag.
fn atom_from_value(value: Value) -> Result<Atom, ModelError> {
    match value {
        Value::Null => Ok(Atom::Absent),
        Value::Integer(n) => match u32::try_from(n) {
            Ok(index) if index >= 1 => Ok(Atom::Index(index)),
            _ => Err(ModelError::InvalidAtom(n.to_string())),
        },
        Value::Text(s) => s.parse(),
        other => Err(ModelError::InvalidAtom(format!("{:?}", other))),
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Load flattened breakpoint records from a JSON array.
pub fn load_breakpoints_json(path: &Path) -> Result<Vec<BreakpointRecord>, DbError> {
    let reader = BufReader::new(File::open(path)?);
    let flat: Vec<FlatBreakpointRecord> = serde_json::from_reader(reader)?;
    let records = flat
        .into_iter()
        .map(BreakpointRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Load word counts from JSON shaped as `{"Job": [[5, 7, 9], ...]}`.
pub fn load_word_counts_json(path: &Path) -> Result<WordCountTable, DbError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Load a book table from a JSON array of `{book_id, rank, section}`.
pub fn load_book_order_json(path: &Path) -> Result<BookOrder, DbError> {
    let reader = BufReader::new(File::open(path)?);
    let entries: Vec<BookEntry> = serde_json::from_reader(reader)?;
    Ok(BookOrder::new(entries)?)
}

/// Load estimation parameters; missing fields keep their defaults.
pub fn load_params_json(path: &Path) -> Result<LocatorParams, DbError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Load records and word counts from JSON files, with the built-in canon.
pub fn load_corpus_json(records_path: &Path, word_counts_path: &Path) -> Result<Corpus, DbError> {
    let records = load_breakpoints_json(records_path)?;
    let word_counts = load_word_counts_json(word_counts_path)?;

    info!(
        records = records.len(),
        books = word_counts.book_count(),
        "loaded JSON calibration data"
    );

    Ok(Corpus {
        word_counts,
        books: BookOrder::default(),
        records,
    })
}

/// Load a book table, choosing the reader by file extension (`.xlsx` or JSON).
pub fn load_book_order(path: &Path) -> Result<BookOrder, DbError> {
    let is_excel = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    if is_excel {
        load_book_order_from_excel(path)
    } else {
        load_book_order_json(path)
    }
}

// ============================================================================
// Excel
// ============================================================================

/// Load a book table from the first sheet of an Excel file
pub fn load_book_order_from_excel(excel_path: &Path) -> Result<BookOrder, DbError> {
    let mut workbook: Xlsx<_> = open_workbook(excel_path)?;
    let missing = || DbError::MissingColumns(excel_path.to_path_buf());

    let sheet_name = workbook.sheet_names().first().cloned().ok_or_else(missing)?;
    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let header = rows.next().ok_or_else(missing)?;
    let columns = find_column_indices(header);
    let (Some(id_col), Some(rank_col), Some(section_col)) =
        (columns.book_id, columns.rank, columns.section)
    else {
        return Err(missing());
    };

    let mut entries = Vec::new();
    for row in rows {
        if let Some(entry) = book_entry_from_row(row, id_col, rank_col, section_col)? {
            entries.push(entry);
        }
    }

    Ok(BookOrder::new(entries)?)
}

/// Parse one book table row; rows without a book ID are skipped.
fn book_entry_from_row(
    row: &[calamine::Data],
    id_col: usize,
    rank_col: usize,
    section_col: usize,
) -> Result<Option<BookEntry>, DbError> {
    let Some(book_id) = get_string_cell(row, id_col) else {
        return Ok(None);
    };
    let Some(rank) = get_u32_cell(row, rank_col) else {
        return Err(DbError::InvalidBookRow(book_id));
    };
    let section: Section = get_string_cell(row, section_col)
        .unwrap_or_default()
        .parse()?;
    Ok(Some(BookEntry {
        book_id,
        rank,
        section,
    }))
}

/// Column indices for the book table sheet
struct ColumnIndices {
    book_id: Option<usize>,
    rank: Option<usize>,
    section: Option<usize>,
}

fn find_column_indices(header: &[calamine::Data]) -> ColumnIndices {
    let mut indices = ColumnIndices {
        book_id: None,
        rank: None,
        section: None,
    };

    for (i, cell) in header.iter().enumerate() {
        if let calamine::Data::String(s) = cell {
            let s_lower = s.trim().to_lowercase();
            match s_lower.as_str() {
                "book_id" | "bkid" | "book" => indices.book_id = Some(i),
                "rank" | "order" => indices.rank = Some(i),
                "section" => indices.section = Some(i),
                _ => {}
            }
        }
    }

    indices
}

fn get_string_cell(row: &[calamine::Data], col: usize) -> Option<String> {
    row.get(col).and_then(|cell| match cell {
        calamine::Data::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        calamine::Data::Int(n) => Some(n.to_string()),
        calamine::Data::Float(n) => Some(n.to_string()),
        _ => None,
    })
}

fn get_u32_cell(row: &[calamine::Data], col: usize) -> Option<u32> {
    row.get(col).and_then(|cell| match cell {
        calamine::Data::Int(n) => u32::try_from(*n).ok(),
        calamine::Data::Float(n) => {
            let whole = *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX);
            whole.then_some(*n as u32)
        }
        calamine::Data::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
