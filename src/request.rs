use std::path::{Path, PathBuf};

use crate::error::ConvertError;

/// One conversion job: which PDF, which pages, which bands to drop, and
/// where the workbook goes. Built once from CLI arguments and consumed by
/// [`crate::convert`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// First page to convert, 1-based.
    pub start_page: u32,
    /// Last page to convert, inclusive. `None` means the last page of the
    /// document.
    pub end_page: Option<u32>,
    pub header_height_mm: f32,
    pub footer_height_mm: f32,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

impl ConversionRequest {
    /// Checks every precondition that can be checked without opening the
    /// document. Runs before any I/O.
    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if !self.input_file.exists() {
            return Err(ConvertError::NotFound(self.input_file.clone()));
        }
        if !has_extension(&self.input_file, "pdf") {
            return Err(ConvertError::InvalidInput(
                "the input file must be a PDF".to_string(),
            ));
        }
        if !has_extension(&self.output_file, "xlsx") {
            return Err(ConvertError::InvalidInput(
                "the output file must have an .xlsx extension".to_string(),
            ));
        }
        if self.start_page == 0 {
            return Err(ConvertError::InvalidInput(
                "pages are 1-based; start page must be at least 1".to_string(),
            ));
        }
        if let Some(end_page) = self.end_page
            && end_page < self.start_page
        {
            return Err(ConvertError::InvalidInput(format!(
                "end page {end_page} is smaller than start page {}",
                self.start_page
            )));
        }
        if self.header_height_mm < 0.0 || self.footer_height_mm < 0.0 {
            return Err(ConvertError::InvalidInput(
                "header and footer heights must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConversionRequest;
    use crate::error::ConvertError;

    fn request_for(input: &std::path::Path) -> ConversionRequest {
        ConversionRequest {
            input_file: input.to_path_buf(),
            output_file: input.with_extension("xlsx"),
            start_page: 1,
            end_page: None,
            header_height_mm: 0.0,
            footer_height_mm: 0.0,
        }
    }

    #[test]
    fn missing_input_is_not_found() {
        let request = request_for(std::path::Path::new("/nonexistent/report.pdf"));
        assert!(matches!(
            request.validate(),
            Err(ConvertError::NotFound(_))
        ));
    }

    #[test]
    fn existing_non_pdf_input_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("report.txt");
        std::fs::write(&input, "not a pdf").expect("fixture should be written");

        let request = request_for(&input);
        let error = request.validate().expect_err("validation should fail");
        assert!(matches!(error, ConvertError::InvalidInput(_)));
        assert!(error.to_string().contains("must be a PDF"));
    }

    #[test]
    fn non_xlsx_output_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("report.pdf");
        std::fs::write(&input, "%PDF-1.5").expect("fixture should be written");

        let mut request = request_for(&input);
        request.output_file = dir.path().join("out.csv");
        let error = request.validate().expect_err("validation should fail");
        assert!(error.to_string().contains(".xlsx"));
    }

    #[test]
    fn uppercase_extensions_are_accepted() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("REPORT.PDF");
        std::fs::write(&input, "%PDF-1.5").expect("fixture should be written");

        let mut request = request_for(&input);
        request.output_file = dir.path().join("OUT.XLSX");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn end_page_before_start_page_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("report.pdf");
        std::fs::write(&input, "%PDF-1.5").expect("fixture should be written");

        let mut request = request_for(&input);
        request.start_page = 3;
        request.end_page = Some(1);
        assert!(matches!(
            request.validate(),
            Err(ConvertError::InvalidInput(_))
        ));
    }
}
