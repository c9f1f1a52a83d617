//! Workbook serialization. An `.xlsx` file is a zip archive of XML parts;
//! the parts written here are the minimal set a spreadsheet reader needs:
//! content types, package relationships, the workbook index, one worksheet
//! per sheet (cells as inline strings) and a stub style part.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::workbook::{Sheet, Workbook};

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const DOC_RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

#[derive(Debug, Error)]
pub enum XlsxWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Spreadsheet column name for a 1-based column index: 1 → A, 27 → AA.
fn column_name(mut column: usize) -> String {
    let mut name = String::new();
    while column > 0 {
        let remainder = (column - 1) % 26;
        name.insert(0, char::from(b'A' + remainder as u8));
        column = (column - 1) / 26;
    }
    name
}

fn xml_declaration() -> Event<'static> {
    Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes")))
}

fn write_content_types<W: Write>(writer: W, sheet_count: usize) -> Result<(), XlsxWriteError> {
    let mut xml = Writer::new(writer);
    xml.write_event(xml_declaration())?;

    let mut types = BytesStart::new("Types");
    types.push_attribute(("xmlns", CONTENT_TYPES_NS));
    xml.write_event(Event::Start(types))?;

    let mut rels_default = BytesStart::new("Default");
    rels_default.push_attribute(("Extension", "rels"));
    rels_default.push_attribute(("ContentType", RELS_CONTENT_TYPE));
    xml.write_event(Event::Empty(rels_default))?;

    let mut xml_default = BytesStart::new("Default");
    xml_default.push_attribute(("Extension", "xml"));
    xml_default.push_attribute(("ContentType", "application/xml"));
    xml.write_event(Event::Empty(xml_default))?;

    let mut workbook_override = BytesStart::new("Override");
    workbook_override.push_attribute(("PartName", "/xl/workbook.xml"));
    workbook_override.push_attribute(("ContentType", WORKBOOK_CONTENT_TYPE));
    xml.write_event(Event::Empty(workbook_override))?;

    let mut styles_override = BytesStart::new("Override");
    styles_override.push_attribute(("PartName", "/xl/styles.xml"));
    styles_override.push_attribute(("ContentType", STYLES_CONTENT_TYPE));
    xml.write_event(Event::Empty(styles_override))?;

    for index in 1..=sheet_count {
        let mut sheet_override = BytesStart::new("Override");
        let part_name = format!("/xl/worksheets/sheet{index}.xml");
        sheet_override.push_attribute(("PartName", part_name.as_str()));
        sheet_override.push_attribute(("ContentType", WORKSHEET_CONTENT_TYPE));
        xml.write_event(Event::Empty(sheet_override))?;
    }

    xml.write_event(Event::End(BytesEnd::new("Types")))?;
    Ok(())
}

fn write_relationship<W: Write>(
    xml: &mut Writer<W>,
    id: &str,
    kind: &str,
    target: &str,
) -> Result<(), XlsxWriteError> {
    let mut relationship = BytesStart::new("Relationship");
    relationship.push_attribute(("Id", id));
    let kind = format!("{DOC_RELATIONSHIPS_NS}/{kind}");
    relationship.push_attribute(("Type", kind.as_str()));
    relationship.push_attribute(("Target", target));
    xml.write_event(Event::Empty(relationship))?;
    Ok(())
}

fn write_package_rels<W: Write>(writer: W) -> Result<(), XlsxWriteError> {
    let mut xml = Writer::new(writer);
    xml.write_event(xml_declaration())?;

    let mut relationships = BytesStart::new("Relationships");
    relationships.push_attribute(("xmlns", RELATIONSHIPS_NS));
    xml.write_event(Event::Start(relationships))?;
    write_relationship(&mut xml, "rId1", "officeDocument", "xl/workbook.xml")?;
    xml.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(())
}

fn write_workbook_part<W: Write>(writer: W, sheets: &[Sheet]) -> Result<(), XlsxWriteError> {
    let mut xml = Writer::new(writer);
    xml.write_event(xml_declaration())?;

    let mut workbook = BytesStart::new("workbook");
    workbook.push_attribute(("xmlns", MAIN_NS));
    workbook.push_attribute(("xmlns:r", DOC_RELATIONSHIPS_NS));
    xml.write_event(Event::Start(workbook))?;
    xml.write_event(Event::Start(BytesStart::new("sheets")))?;

    for (index, sheet) in sheets.iter().enumerate() {
        let mut element = BytesStart::new("sheet");
        element.push_attribute(("name", sheet.name()));
        let sheet_id = (index + 1).to_string();
        element.push_attribute(("sheetId", sheet_id.as_str()));
        let rel_id = format!("rId{}", index + 1);
        element.push_attribute(("r:id", rel_id.as_str()));
        xml.write_event(Event::Empty(element))?;
    }

    xml.write_event(Event::End(BytesEnd::new("sheets")))?;
    xml.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(())
}

fn write_workbook_rels<W: Write>(writer: W, sheet_count: usize) -> Result<(), XlsxWriteError> {
    let mut xml = Writer::new(writer);
    xml.write_event(xml_declaration())?;

    let mut relationships = BytesStart::new("Relationships");
    relationships.push_attribute(("xmlns", RELATIONSHIPS_NS));
    xml.write_event(Event::Start(relationships))?;

    for index in 1..=sheet_count {
        let id = format!("rId{index}");
        let target = format!("worksheets/sheet{index}.xml");
        write_relationship(&mut xml, &id, "worksheet", &target)?;
    }
    let styles_id = format!("rId{}", sheet_count + 1);
    write_relationship(&mut xml, &styles_id, "styles", "styles.xml")?;

    xml.write_event(Event::End(BytesEnd::new("Relationships")))?;
    Ok(())
}

fn write_worksheet<W: Write>(writer: W, sheet: &Sheet) -> Result<(), XlsxWriteError> {
    let mut xml = Writer::new(writer);
    xml.write_event(xml_declaration())?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", MAIN_NS));
    xml.write_event(Event::Start(worksheet))?;
    xml.write_event(Event::Start(BytesStart::new("sheetData")))?;

    for (row_index, row) in sheet.rows().iter().enumerate() {
        let row_number = row_index + 1;
        let mut row_element = BytesStart::new("row");
        let reference = row_number.to_string();
        row_element.push_attribute(("r", reference.as_str()));
        xml.write_event(Event::Start(row_element))?;

        for (column_index, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let mut cell = BytesStart::new("c");
            let reference = format!("{}{row_number}", column_name(column_index + 1));
            cell.push_attribute(("r", reference.as_str()));
            cell.push_attribute(("t", "inlineStr"));
            xml.write_event(Event::Start(cell))?;
            xml.write_event(Event::Start(BytesStart::new("is")))?;

            let mut text = BytesStart::new("t");
            if value.contains('\n') || value != value.trim() {
                text.push_attribute(("xml:space", "preserve"));
            }
            xml.write_event(Event::Start(text))?;
            xml.write_event(Event::Text(BytesText::new(value)))?;
            xml.write_event(Event::End(BytesEnd::new("t")))?;

            xml.write_event(Event::End(BytesEnd::new("is")))?;
            xml.write_event(Event::End(BytesEnd::new("c")))?;
        }

        xml.write_event(Event::End(BytesEnd::new("row")))?;
    }

    xml.write_event(Event::End(BytesEnd::new("sheetData")))?;
    xml.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(())
}

/// Serialize the workbook to `path`, overwriting any existing file.
pub(crate) fn write_workbook(path: &Path, workbook: &Workbook) -> Result<(), XlsxWriteError> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let sheets = workbook.sheets();

    zip.start_file("[Content_Types].xml", options)?;
    write_content_types(&mut zip, sheets.len())?;

    zip.start_file("_rels/.rels", options)?;
    write_package_rels(&mut zip)?;

    zip.start_file("xl/workbook.xml", options)?;
    write_workbook_part(&mut zip, sheets)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    write_workbook_rels(&mut zip, sheets.len())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    for (index, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;
        write_worksheet(&mut zip, sheet)?;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    Ok(())
}
