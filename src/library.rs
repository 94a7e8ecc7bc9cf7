use crate::books;
use include_dir::{include_dir, Dir};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bundled sample edition so the binary runs without a data directory.
static SAMPLE_DATA: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

/// Composite key identifying one chapter of one edition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterRef {
    pub edition: String,
    pub book: String,
    pub chapter: u32,
}

impl ChapterRef {
    pub fn new(edition: &str, book: &str, chapter: u32) -> Self {
        Self {
            edition: edition.to_string(),
            book: book.to_string(),
            chapter,
        }
    }

    fn relative_path(&self) -> String {
        format!("{}/{}/{}.json", self.edition, self.book, self.chapter)
    }
}

impl fmt::Display for ChapterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = books::find_book(&self.book)
            .map(|b| b.name)
            .unwrap_or(self.book.as_str());
        write!(f, "{} {} ({})", name, self.chapter, self.edition.to_uppercase())
    }
}

/// One chapter's raw text: an ordered list of verse strings.
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterText {
    pub reference: ChapterRef,
    pub verses: Vec<String>,
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no chapter text for {0}")]
    NotFound(String),
    #[error("unreadable chapter file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed chapter file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of chapter text. Implementations may cache and prefetch; callers
/// only see the load operation.
pub trait Library {
    fn load_chapter(&mut self, reference: &ChapterRef) -> Result<ChapterText, LibraryError>;
}

/// Reads chapters from `<root>/<edition>/<book>/<chapter>.json` (each file a
/// JSON array of verse strings) with an in-memory cache.
#[derive(Debug)]
pub struct FileLibrary {
    root: PathBuf,
    cache: HashMap<ChapterRef, ChapterText>,
}

impl FileLibrary {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache: HashMap::new(),
        }
    }

    pub fn cached_chapters(&self) -> usize {
        self.cache.len()
    }
}

impl Library for FileLibrary {
    fn load_chapter(&mut self, reference: &ChapterRef) -> Result<ChapterText, LibraryError> {
        if let Some(text) = self.cache.get(reference) {
            return Ok(text.clone());
        }

        let path = self.root.join(reference.relative_path());
        if !path.exists() {
            return Err(LibraryError::NotFound(reference.to_string()));
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| LibraryError::Io {
            path: path.clone(),
            source,
        })?;
        let verses: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| LibraryError::Parse { path, source })?;

        let text = ChapterText {
            reference: reference.clone(),
            verses,
        };
        self.cache.insert(reference.clone(), text.clone());
        Ok(text)
    }
}

/// Serves the compiled-in sample edition.
#[derive(Debug, Default)]
pub struct EmbeddedLibrary;

impl EmbeddedLibrary {
    pub fn new() -> Self {
        Self
    }

    pub fn has_chapter(reference: &ChapterRef) -> bool {
        SAMPLE_DATA.get_file(reference.relative_path()).is_some()
    }
}

impl Library for EmbeddedLibrary {
    fn load_chapter(&mut self, reference: &ChapterRef) -> Result<ChapterText, LibraryError> {
        let file = SAMPLE_DATA
            .get_file(reference.relative_path())
            .ok_or_else(|| LibraryError::NotFound(reference.to_string()))?;
        let raw = file
            .contents_utf8()
            .ok_or_else(|| LibraryError::NotFound(reference.to_string()))?;
        let verses: Vec<String> =
            serde_json::from_str(raw).map_err(|source| LibraryError::Parse {
                path: PathBuf::from(reference.relative_path()),
                source,
            })?;
        Ok(ChapterText {
            reference: reference.clone(),
            verses,
        })
    }
}
