// Input resolution: which of a request's inputs becomes the text to classify.
//
// A request may carry an uploaded file, a raw text field, both, or neither.
// A file in a supported format wins. A file in an unsupported format is
// ignored in favour of the text field, and with no usable input the result is
// an empty string, which validation then rejects.

use thiserror::Error;

use crate::extract::{self, DocumentFormat, ExtractError, Upload};

/// Where the resolved text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    File(DocumentFormat),
    TextField,
    Nothing,
}

/// A supported file that could not be parsed.
#[derive(Debug, Error)]
#[error("could not read {}: {source}", .format.name())]
pub struct UnreadableDocument {
    pub format: DocumentFormat,
    #[source]
    pub source: ExtractError,
}

/// The raw inputs of one request, before extraction.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub file: Option<Upload>,
    pub text: Option<String>,
}

impl Submission {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            file: None,
            text: Some(text.into()),
        }
    }

    pub fn from_file(upload: Upload) -> Self {
        Self {
            file: Some(upload),
            text: None,
        }
    }

    /// Produce the text to classify. Runs extraction, so it may be slow for
    /// large documents; call it off the async runtime.
    pub fn resolve(self) -> Result<(String, Source), UnreadableDocument> {
        if let Some(upload) = self.file.as_ref() {
            let format = upload.format();
            if format.is_supported() {
                let text = extract::extract(upload)
                    .map_err(|source| UnreadableDocument { format, source })?;
                return Ok((text, Source::File(format)));
            }
        }

        match self.text {
            Some(text) => Ok((text, Source::TextField)),
            None => Ok((String::new(), Source::Nothing)),
        }
    }
}
