// Text extraction from uploaded documents.
//
// Dispatch is over a closed set of formats decided by the file extension.
// Office formats (.pptx, .docx) are zip archives of XML parts; the submodules
// walk those parts with quick-xml. Plain text is decoded permissively so a
// stray Latin-1 byte doesn't turn a readable upload into an error.
//
// Extraction never panics on bad input: corrupt archives come back as
// `ExtractError`, which the web layer reports as an unreadable document.

mod archive;
pub mod docx;
pub mod pptx;

use std::path::Path;

use thiserror::Error;

/// Upper bound on the decompressed size of any single archive part.
pub const MAX_PART_BYTES: u64 = 16 * 1024 * 1024;

/// Upper bound on the decompressed bytes read from one archive, summed over
/// every part. Keeps a small zip from expanding into gigabytes of text.
pub const MAX_ARCHIVE_BYTES: u64 = 2 * MAX_PART_BYTES;

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// PowerPoint Open XML (.pptx)
    Presentation,
    /// Word Open XML (.docx)
    WordProcessing,
    /// UTF-8 text (.txt)
    PlainText,
    Unsupported,
}

impl DocumentFormat {
    /// Pick the format from a filename's extension (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pptx") => Self::Presentation,
            Some("docx") => Self::WordProcessing,
            Some("txt") => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Presentation => "presentation (.pptx)",
            Self::WordProcessing => "word document (.docx)",
            Self::PlainText => "text file (.txt)",
            Self::Unsupported => "unsupported",
        }
    }
}

/// An uploaded file: its client-supplied name and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn format(&self) -> DocumentFormat {
        DocumentFormat::from_filename(&self.filename)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a valid archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive is missing {0}")]
    MissingPart(String),
    #[error("archive part {part} exceeds {limit} bytes when decompressed")]
    PartTooLarge { part: String, limit: u64 },
    #[error("archive expands past {limit} bytes when decompressed")]
    ArchiveTooLarge { limit: u64 },
    #[error("archive part {part} is not valid UTF-8")]
    Encoding { part: String },
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract plain text from an upload.
///
/// Unsupported formats yield an empty string; the caller decides whether
/// another input (such as a raw text field) should be used instead.
pub fn extract(upload: &Upload) -> Result<String, ExtractError> {
    extract_with_limit(upload, MAX_ARCHIVE_BYTES)
}

/// Like `extract`, with an explicit budget for the decompressed bytes read
/// out of an Office archive.
pub fn extract_with_limit(upload: &Upload, archive_limit: u64) -> Result<String, ExtractError> {
    match upload.format() {
        DocumentFormat::Presentation => pptx::extract_text(&upload.bytes, archive_limit),
        DocumentFormat::WordProcessing => docx::extract_text(&upload.bytes, archive_limit),
        DocumentFormat::PlainText => Ok(decode_text(&upload.bytes)),
        DocumentFormat::Unsupported => Ok(String::new()),
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD and
/// dropping a leading byte-order mark.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
