// Zip access shared by the Office extractors.
//
// Every part read through an `Archive` draws from one decompressed-byte
// budget, so a deck with many (or repeated) large slides can't inflate past
// it no matter how small the upload is.

use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use super::{ExtractError, MAX_PART_BYTES};

pub(crate) struct Archive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
    /// Decompressed bytes still allowed across all remaining reads.
    remaining: u64,
    limit: u64,
}

pub(crate) fn open(bytes: &[u8], limit: u64) -> Result<Archive<'_>, ExtractError> {
    Ok(Archive {
        zip: ZipArchive::new(Cursor::new(bytes))?,
        remaining: limit,
        limit,
    })
}

impl Archive<'_> {
    /// Read a part as UTF-8, or `None` if the archive doesn't contain it.
    pub(crate) fn read_part(&mut self, name: &str) -> Result<Option<String>, ExtractError> {
        let entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Read one byte past the tighter cap so overflow is detectable.
        let cap = MAX_PART_BYTES.min(self.remaining);
        let mut data = Vec::new();
        entry.take(cap + 1).read_to_end(&mut data)?;

        let size = data.len() as u64;
        if size > MAX_PART_BYTES {
            return Err(ExtractError::PartTooLarge {
                part: name.to_string(),
                limit: MAX_PART_BYTES,
            });
        }
        if size > self.remaining {
            return Err(ExtractError::ArchiveTooLarge { limit: self.limit });
        }
        self.remaining -= size;

        String::from_utf8(data)
            .map(Some)
            .map_err(|_| ExtractError::Encoding {
                part: name.to_string(),
            })
    }

    /// Read a part that must exist.
    pub(crate) fn require_part(&mut self, name: &str) -> Result<String, ExtractError> {
        self.read_part(name)?
            .ok_or_else(|| ExtractError::MissingPart(name.to_string()))
    }

    /// Names of all entries in the archive.
    pub(crate) fn part_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }
}
