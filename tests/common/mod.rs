use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// A run of lines starting at a given baseline (points from the page
/// bottom), advancing downwards by the fixture leading.
pub struct TextBlock<'a> {
    pub y: f32,
    pub lines: &'a [&'a str],
}

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const LEADING: i64 = 16;

/// Build a PDF whose pages each contain one block of lines near the top of
/// the page.
pub fn create_test_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let positioned = pages
        .iter()
        .map(|lines| {
            vec![TextBlock {
                y: 780.0,
                lines: lines.as_slice(),
            }]
        })
        .collect::<Vec<_>>();
    let borrowed = positioned
        .iter()
        .map(Vec::as_slice)
        .collect::<Vec<_>>();
    create_positioned_pdf(path, &borrowed)
}

/// Build a PDF with explicitly placed text blocks per page, so header and
/// footer band cropping has geometry to act on.
pub fn create_positioned_pdf(
    path: &Path,
    pages: &[&[TextBlock<'_>]],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();

    for blocks in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![LEADING.into()]),
        ];

        for block in *blocks {
            operations.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    50.into(),
                    block.y.into(),
                ],
            ));
            for (index, line) in block.lines.iter().enumerate() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                if index + 1 < block.lines.len() {
                    operations.push(Operation::new("T*", vec![]));
                }
            }
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}
