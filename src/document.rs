//! Abstract line-oriented access to a source document.

use std::path::{Path, PathBuf};

use crate::error::Error;

/// Byte order mark some editors write at the start of UTF-8 files.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// What the analysis core needs from a document: its identity and its lines.
/// Editors implement this over their buffers; the CLI uses [`TextDocument`].
pub trait SourceDocument {
    /// Full text, lines joined with `\n`.
    fn full_text(&self) -> String {
        let lines: Vec<&str> = (0..self.line_count()).filter_map(|i| return self.line(i)).collect();
        return lines.join("\n");
    }

    /// Text of line `index` (zero-based), without its terminator.
    fn line(&self, index: usize) -> Option<&str>;

    /// Number of lines.
    fn line_count(&self) -> usize;

    /// File identity, used as the cache key.
    fn path(&self) -> &Path;
}

/// A document held in memory as a vector of lines.
#[derive(Debug, Clone)]
pub struct TextDocument {
    /// Lines without terminators; `\r\n` is normalised away.
    lines: Vec<String>,
    /// File identity.
    path: PathBuf,
}

impl TextDocument {
    /// Wrap already-loaded text. A leading byte order mark is dropped.
    pub fn new(path: impl Into<PathBuf>, text: &str) -> Self {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        return Self {
            lines: text.lines().map(String::from).collect(),
            path: path.into(),
        };
    }

    /// Read `root/relative` from disk. The document's identity is `relative`.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file does not exist,
    /// or `Error::Io` if it cannot be read as UTF-8 text.
    pub fn read(root: &Path, relative: &Path) -> Result<Self, Error> {
        let disk_path = root.join(relative);
        let text = match std::fs::read_to_string(&disk_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: disk_path });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(t) => t,
        };
        return Ok(Self::new(relative, &text));
    }
}

impl SourceDocument for TextDocument {
    fn line(&self, index: usize) -> Option<&str> {
        return self.lines.get(index).map(String::as_str);
    }

    fn line_count(&self) -> usize {
        return self.lines.len();
    }

    fn path(&self) -> &Path {
        return &self.path;
    }
}
