//! Snapshot extractor: flattens a document into non-empty plain-text lines.
//!
//! One line per paragraph, one line per table row (cells joined with
//! [`CELL_SEPARATOR`]). Blank paragraphs produce no line, so the snapshot is
//! denser than the block sequence the reinjection engine walks.

use tracing::warn;

use crate::docx::{Block, Cell, Document, Paragraph, Row};

pub const CELL_SEPARATOR: &str = " | ";

/// Line text of a paragraph: trimmed, with embedded line breaks collapsed so a
/// paragraph never spans two snapshot lines.
pub fn paragraph_line(paragraph: &Paragraph) -> String {
    single_line(paragraph.text().trim())
}

fn single_line(text: &str) -> String {
    if !text.contains(['\n', '\r']) {
        return text.to_string();
    }
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of every paragraph in the cell, non-empty ones joined by a space.
pub fn cell_text(cell: &Cell) -> String {
    cell.paragraphs()
        .map(paragraph_line)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Row text with cells joined by the separator, trimmed. A row of blank cells
/// still yields its separators (`"|"` for two cells); only a row without cells
/// is empty.
pub fn row_line(row: &Row) -> String {
    row.cells()
        .map(cell_text)
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
        .trim()
        .to_string()
}

/// The ordered, non-empty snapshot lines of `document`. Read-only.
pub fn extract_lines(document: &Document) -> Vec<String> {
    let mut lines = Vec::new();
    for block in document.blocks() {
        match block {
            Block::Paragraph(p) => {
                let line = paragraph_line(p);
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Block::Table(t) => {
                lines.extend(t.rows().map(row_line).filter(|l| !l.is_empty()));
            }
        }
    }
    lines
}

/// The text sent to the rewriting service.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub lines: Vec<String>,
    pub text: String,
    /// Character count of `text` after truncation.
    pub char_count: usize,
    pub truncated: bool,
}

impl Snapshot {
    /// Joins the extracted lines and truncates the joined text to `char_limit`
    /// characters. Truncation never splits a character.
    pub fn build(document: &Document, char_limit: usize) -> Self {
        let lines = extract_lines(document);
        let joined = lines.join("\n");
        let total = joined.chars().count();

        let (text, truncated) = match joined.char_indices().nth(char_limit) {
            Some((cut, _)) => (joined[..cut].to_string(), true),
            None => (joined, false),
        };

        if truncated {
            warn!(
                "Snapshot truncated from {} to {} characters ({} lines extracted)",
                total,
                char_limit,
                lines.len()
            );
        }

        let char_count = total.min(char_limit);
        Self {
            lines,
            text,
            char_count,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::*;

    fn doc(body: &[String]) -> Document {
        Document::parse(document_xml(body).as_bytes()).unwrap()
    }

    #[test]
    fn test_table_rows_flatten_with_separator() {
        let lines = extract_lines(&doc(&[table(&[&["A", "B"], &["C", "D"]])]));
        assert_eq!(lines, vec!["A | B", "C | D"]);
    }

    #[test]
    fn test_blank_paragraphs_are_omitted() {
        let body = vec![text_para("  Summary  "), empty_para(), text_para("   ")];
        assert_eq!(extract_lines(&doc(&body)), vec!["Summary"]);
    }

    #[test]
    fn test_blank_rows_keep_their_separators() {
        let body = vec![table(&[&["", ""], &["A", "B"], &["x", ""], &[""]])];
        assert_eq!(extract_lines(&doc(&body)), vec!["|", "A | B", "x |"]);
    }

    #[test]
    fn test_lines_follow_block_order() {
        let body = vec![
            text_para("first"),
            table(&[&["second"]]),
            text_para("third"),
            table(&[&["fourth", "4b"]]),
        ];
        assert_eq!(
            extract_lines(&doc(&body)),
            vec!["first", "second", "third", "fourth | 4b"]
        );
    }

    #[test]
    fn test_scenario_extraction() {
        assert_eq!(
            extract_lines(&doc(&scenario_body())),
            vec!["Summary", "Built X", "Skills: Python"]
        );
    }

    #[test]
    fn test_embedded_breaks_collapse_to_spaces() {
        let body = vec!["<w:p><w:r><w:t>Lead</w:t><w:br/><w:t>Engineer</w:t></w:r></w:p>".to_string()];
        assert_eq!(extract_lines(&doc(&body)), vec!["Lead Engineer"]);
    }

    #[test]
    fn test_multi_paragraph_cell_joins_paragraphs() {
        let body = vec![format!(
            "<w:tbl><w:tr><w:tc>{}{}{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            text_para("Rust"),
            empty_para(),
            text_para("Go"),
            text_para("Python")
        )];
        assert_eq!(extract_lines(&doc(&body)), vec!["Rust Go | Python"]);
    }

    #[test]
    fn test_extraction_does_not_mutate_document() {
        let document = doc(&scenario_body());
        let before = document.to_xml().unwrap();
        let _ = extract_lines(&document);
        let _ = Snapshot::build(&document, 5);
        assert_eq!(document.to_xml().unwrap(), before);
    }

    #[test]
    fn test_snapshot_joins_lines() {
        let snapshot = Snapshot::build(&doc(&scenario_body()), 12_000);
        assert_eq!(snapshot.text, "Summary\nBuilt X\nSkills: Python");
        assert_eq!(snapshot.char_count, snapshot.text.chars().count());
        assert!(!snapshot.truncated);
    }

    #[test]
    fn test_snapshot_truncates_after_joining_on_char_boundary() {
        let snapshot = Snapshot::build(&doc(&[text_para("Café"), text_para("Zürich")]), 7);
        assert_eq!(snapshot.text, "Café\nZü");
        assert_eq!(snapshot.char_count, 7);
        assert!(snapshot.truncated);
        assert_eq!(snapshot.lines.len(), 2);
    }
}
