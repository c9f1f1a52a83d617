use tracing::debug;

use crate::table_parse::{modal_width, soft_split_line_into_cells, split_line_into_cells};

const MIN_COLS: usize = 2;
const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// A grid of text cells detected on a page. Rows keep the widths the page
/// gave them; nothing is padded to a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub rows: Vec<Vec<String>>,
    pub confidence: f32,
}

fn table_confidence(rows: &[Vec<String>]) -> f32 {
    if rows.len() < 2 {
        return 0.0;
    }

    let modal = modal_width(rows);
    if modal == 0 {
        return 0.0;
    }

    let consistent =
        rows.iter().filter(|row| row.len() == modal).count() as f32 / rows.len() as f32;
    let max_width = rows.iter().map(Vec::len).max().unwrap_or(modal);
    let min_width = rows.iter().map(Vec::len).min().unwrap_or(modal);
    let uniformity = if max_width == 0 {
        0.0
    } else {
        1.0 - ((max_width - min_width) as f32 / max_width as f32)
    };

    (consistent * 0.75 + uniformity * 0.25).clamp(0.0, 1.0)
}

/// Find runs of consecutive multi-cell lines and turn each run into a table,
/// preserving top-to-bottom order.
pub(crate) fn detect_tables<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut current_rows: Vec<Vec<String>> = Vec::new();

    let flush_current = |rows: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>| {
        if rows.len() >= 2 {
            let confidence = table_confidence(rows);
            if confidence < LOW_CONFIDENCE_THRESHOLD {
                debug!(confidence, "keeping low-confidence table");
            }
            tables.push(DetectedTable {
                rows: std::mem::take(rows),
                confidence,
            });
        } else {
            rows.clear();
        }
    };

    for line in lines {
        let mut cells = split_line_into_cells(line);
        if cells.len() < MIN_COLS {
            let soft_cells = soft_split_line_into_cells(line);
            let has_numeric = soft_cells
                .iter()
                .any(|cell| cell.chars().any(|ch| ch.is_ascii_digit()));
            let looks_like_sentence = ['.', '!', '?']
                .iter()
                .any(|punctuation| line.trim_end().ends_with(*punctuation));
            if soft_cells.len() >= MIN_COLS
                && !looks_like_sentence
                && (has_numeric || soft_cells.len() <= 6)
            {
                cells = soft_cells;
            }
        }

        if cells.len() >= MIN_COLS {
            current_rows.push(cells);
        } else {
            flush_current(&mut current_rows, &mut tables);
        }
    }

    flush_current(&mut current_rows, &mut tables);
    tables
}

#[cfg(test)]
mod tests {
    use super::detect_tables;

    #[test]
    fn detects_a_single_aligned_table() {
        let text = "Name  Age  Score\nAlice  30  98\nBob  22  87";
        let tables = detect_tables(text.lines());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 3);
        assert_eq!(tables[0].rows[1], vec!["Alice", "30", "98"]);
        assert!(tables[0].confidence > 0.9);
    }

    #[test]
    fn narrative_lines_break_tables_apart() {
        let text = "A  B\nC  D\nThis is a plain sentence in between.\nE  F\nG  H";
        let tables = detect_tables(text.lines());
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0], vec!["A", "B"]);
        assert_eq!(tables[1].rows[1], vec!["G", "H"]);
    }

    #[test]
    fn a_lone_multi_cell_line_is_not_a_table() {
        let tables = detect_tables("Total  42".lines());
        assert!(tables.is_empty());
    }

    #[test]
    fn prose_only_pages_yield_no_tables() {
        let text = "First paragraph of narrative text.\nSecond paragraph, still no columns.";
        let tables = detect_tables(text.lines());
        assert!(tables.is_empty());
    }

    #[test]
    fn ragged_rows_stay_ragged() {
        let text = "a  b  c\nd  e\nf  g  h";
        let tables = detect_tables(text.lines());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[1].len(), 2);
        assert!(tables[0].confidence < 1.0);
    }
}
