mod crop;
mod error;
mod pdf_reader;
mod request;
mod table_detect;
mod table_parse;
mod units;
mod workbook;
mod xlsx_out;

use tracing::{debug, info, warn};

use crate::crop::CropRegion;
use crate::pdf_reader::PdfDocument;
use crate::workbook::{Workbook, write_table, write_text_rows};

pub use error::ConvertError;
pub use request::ConversionRequest;
pub use units::{POINTS_PER_MM, mm_to_points};
pub use xlsx_out::XlsxWriteError;

/// What a successful conversion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionReport {
    pub pages: u32,
    pub text_blocks: usize,
    pub tables: usize,
}

/// Convert the requested page range of a PDF into an `.xlsx` workbook:
/// free-form text collects in a "Text_Body" sheet, every detected table
/// gets its own "Table_Page_{page}_{index}" sheet.
///
/// The workbook is only written once every page processed cleanly; any
/// failure aborts the conversion without touching the output path.
pub fn convert(request: &ConversionRequest) -> Result<ConversionReport, ConvertError> {
    request.validate()?;

    let header_pts = mm_to_points(request.header_height_mm);
    let footer_pts = mm_to_points(request.footer_height_mm);

    let document = PdfDocument::open(&request.input_file).map_err(ConvertError::PdfOpen)?;
    let page_count = document.page_count();
    if request.start_page > page_count {
        return Err(ConvertError::PageOutOfRange {
            page: request.start_page,
            page_count,
        });
    }
    let end_page = request.end_page.unwrap_or(page_count);

    let mut workbook = Workbook::new("Text_Body");
    let mut all_text = Vec::new();
    let mut table_total = 0_usize;

    for page_number in request.start_page..=end_page {
        if page_number > page_count {
            return Err(ConvertError::PageOutOfRange {
                page: page_number,
                page_count,
            });
        }

        let page = document
            .page(page_number)
            .ok_or_else(|| ConvertError::PageFailure {
                page: page_number,
                reason: "page is missing from the page tree".to_string(),
            })?;

        let region = CropRegion::for_page(page.width, page.height, header_pts, footer_pts);
        let (text, tables) = if region.is_degenerate() {
            warn!(
                page = page_number,
                "header and footer bands leave no readable area; dropping page text and detecting tables on the uncropped page"
            );
            let full = page.within_bounding_box(&CropRegion::full_page(page.width, page.height));
            (None, full.extract_tables())
        } else {
            let cropped = page.within_bounding_box(&region);
            (cropped.extract_text(), cropped.extract_tables())
        };

        if let Some(text) = text {
            all_text.push(format!("Page {page_number}:\n{text}"));
        }

        debug!(
            page = page_number,
            tables = tables.len(),
            "page extracted"
        );

        for (index, table) in tables.iter().enumerate() {
            let sheet = workbook.create_sheet(format!("Table_Page_{page_number}_{}", index + 1));
            write_table(sheet, &table.rows);
            table_total += 1;
        }
    }

    write_text_rows(workbook.first_sheet_mut(), &all_text);
    workbook.save(&request.output_file)?;

    let report = ConversionReport {
        pages: end_page - request.start_page + 1,
        text_blocks: all_text.len(),
        tables: table_total,
    };
    info!(
        pages = report.pages,
        text_blocks = report.text_blocks,
        tables = report.tables,
        output = %request.output_file.display(),
        "conversion finished"
    );
    Ok(report)
}
