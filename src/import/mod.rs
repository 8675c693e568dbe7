//! Bulk question import: uploaded file → raw records → validated questions.

mod format;
mod parse;
mod record;
mod upload;

use std::io::Read;

pub use format::{RecordStyle, UploadFormat};
pub use parse::{read_records, RawRecord};
pub use record::{parse_mappings, to_question};
pub use upload::{StagedUpload, UploadDir};

use crate::error::Result;
use crate::models::NewQuestion;

/// Parses and validates every record, in file order. The first bad record
/// fails the whole file.
pub fn parse_questions(format: UploadFormat, reader: impl Read) -> Result<Vec<NewQuestion>> {
    let style = format.record_style();
    read_records(format, reader)?
        .iter()
        .enumerate()
        .map(|(idx, raw)| to_question(style, idx + 1, raw))
        .collect()
}
