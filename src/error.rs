use std::path::PathBuf;

use thiserror::Error;

use crate::xlsx_out::XlsxWriteError;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input file does not exist: {0}")]
    NotFound(PathBuf),

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to open PDF: {0}")]
    PdfOpen(#[source] lopdf::Error),

    #[error("failed to save workbook: {0}")]
    WorkbookSave(#[from] XlsxWriteError),

    #[error("page {page} is out of range; the PDF has {page_count} pages")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("failed to process page {page}: {reason}")]
    PageFailure { page: u32, reason: String },
}
