//! Line allocator: writes revised lines back into the document's structural
//! slots, in the same walk order the snapshot extractor used.
//!
//! # Slot rules
//! - One forward cursor over the revised lines for the whole document.
//! - Each paragraph is one slot; each table cell (row-major) is one slot and
//!   writes into the cell's first paragraph.
//! - Inside a slot, run 0 receives the line and every other run is emptied.
//!   Run properties, paragraph properties and table geometry are never touched.
//! - Running out of lines blanks the remaining slots; surplus lines are
//!   dropped. Neither is an error.

use std::str::FromStr;

use tracing::{debug, warn};

use crate::docx::{Block, Document, Row};
use crate::tailoring::snapshot::{paragraph_line, row_line, CELL_SEPARATOR};

/// Which slots consume a revised line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotPolicy {
    /// Every paragraph and every cell consumes a line, including ones that
    /// were blank and therefore absent from the snapshot.
    #[default]
    AllSlots,
    /// Only slots that produced a snapshot line consume one. A table row
    /// consumes a single line, split back into cells on `|`.
    NonEmptyOnly,
}

impl FromStr for SlotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_slots" => Ok(SlotPolicy::AllSlots),
            "non_empty" | "non_empty_only" => Ok(SlotPolicy::NonEmptyOnly),
            other => Err(format!(
                "unknown slot policy '{other}' (expected 'all' or 'non_empty')"
            )),
        }
    }
}

/// How the revised lines lined up with the document's slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReinjectReport {
    /// Slots that consumed a line.
    pub slots: usize,
    /// Lines in the revised text.
    pub lines: usize,
    /// Slots that received a line from the revised text.
    pub applied: usize,
    /// Slots left blank because the lines ran out.
    pub blanked: usize,
    /// Revised lines never consumed.
    pub dropped: usize,
}

impl ReinjectReport {
    pub fn is_aligned(&self) -> bool {
        self.slots == self.lines
    }
}

/// Forward-only cursor over the revised lines.
struct LineCursor<'a> {
    lines: Vec<&'a str>,
    next: usize,
}

impl<'a> LineCursor<'a> {
    fn new(revised: &'a str) -> Self {
        Self {
            lines: revised.split('\n').map(str::trim_end).collect(),
            next: 0,
        }
    }

    /// The next line, or `""` once exhausted.
    fn pop(&mut self) -> &'a str {
        let line = self.lines.get(self.next).copied().unwrap_or("");
        self.next += 1;
        line
    }

    fn report(&self) -> ReinjectReport {
        let slots = self.next;
        let lines = self.lines.len();
        let applied = slots.min(lines);
        ReinjectReport {
            slots,
            lines,
            applied,
            blanked: slots - applied,
            dropped: lines - applied,
        }
    }
}

/// Writes `revised` into `document` (which must be the caller's private copy)
/// and reports how lines were allocated.
pub fn reinject(document: &mut Document, revised: &str, policy: SlotPolicy) -> ReinjectReport {
    let mut cursor = LineCursor::new(revised);

    for block in document.blocks_mut() {
        match (block, policy) {
            (Block::Paragraph(p), SlotPolicy::AllSlots) => p.set_text(cursor.pop()),
            (Block::Paragraph(p), SlotPolicy::NonEmptyOnly) => {
                if !paragraph_line(p).is_empty() {
                    p.set_text(cursor.pop());
                }
            }
            (Block::Table(t), SlotPolicy::AllSlots) => {
                for row in t.rows_mut() {
                    for cell in row.cells_mut() {
                        let line = cursor.pop();
                        if let Some(p) = cell.first_paragraph_mut() {
                            p.set_text(line);
                        }
                    }
                }
            }
            (Block::Table(t), SlotPolicy::NonEmptyOnly) => {
                for row in t.rows_mut() {
                    if row_line(row).is_empty() {
                        continue;
                    }
                    let line = cursor.pop();
                    fill_row(row, line);
                }
            }
        }
    }

    let report = cursor.report();
    if report.is_aligned() {
        debug!("Reinjected {} lines into {} slots", report.lines, report.slots);
    } else {
        warn!(
            "Slot/line mismatch: {} slots, {} lines ({} slots blanked, {} lines dropped)",
            report.slots, report.lines, report.blanked, report.dropped
        );
    }
    report
}

/// Spreads a `a | b | c` line over the row's cells. Missing parts blank the
/// trailing cells; surplus parts land in the last cell.
fn fill_row(row: &mut Row, line: &str) {
    let cell_count = row.cells().count();
    let parts = split_row_line(line, cell_count);
    for (cell, part) in row.cells_mut().zip(parts) {
        if let Some(p) = cell.first_paragraph_mut() {
            p.set_text(&part);
        }
    }
}

fn split_row_line(line: &str, cell_count: usize) -> Vec<String> {
    if cell_count == 0 {
        return Vec::new();
    }
    let mut parts: Vec<String> = line.split('|').map(|s| s.trim().to_string()).collect();
    if parts.len() > cell_count {
        let tail = parts.split_off(cell_count - 1).join(CELL_SEPARATOR);
        parts.push(tail);
    }
    parts.resize(cell_count, String::new());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::*;
    use crate::tailoring::snapshot::extract_lines;

    fn doc(body: &[String]) -> Document {
        Document::parse(document_xml(body).as_bytes()).unwrap()
    }

    /// Slot texts in walk order: each paragraph, then each cell's first paragraph.
    fn slot_texts(document: &Document) -> Vec<String> {
        let mut out = Vec::new();
        for block in document.blocks() {
            match block {
                Block::Paragraph(p) => out.push(p.text()),
                Block::Table(t) => {
                    for row in t.rows() {
                        for cell in row.cells() {
                            out.push(cell.paragraphs().next().map(|p| p.text()).unwrap_or_default());
                        }
                    }
                }
            }
        }
        out
    }

    /// (blocks, rows, cells, runs) of the document.
    fn shape(document: &Document) -> (usize, usize, usize, usize) {
        let mut shape = (0, 0, 0, 0);
        for block in document.blocks() {
            shape.0 += 1;
            match block {
                Block::Paragraph(p) => shape.3 += p.runs().len(),
                Block::Table(t) => {
                    for row in t.rows() {
                        shape.1 += 1;
                        for cell in row.cells() {
                            shape.2 += 1;
                            shape.3 += cell.paragraphs().map(|p| p.runs().len()).sum::<usize>();
                        }
                    }
                }
            }
        }
        shape
    }

    #[test]
    fn test_scenario_content_flows_into_next_slot() {
        let original = doc(&scenario_body());
        assert_eq!(
            extract_lines(&original),
            vec!["Summary", "Built X", "Skills: Python"]
        );

        let mut copy = original.clone();
        let report = reinject(
            &mut copy,
            "Overview\nShipped X fast\nSkills: Python, Go",
            SlotPolicy::AllSlots,
        );

        assert_eq!(
            slot_texts(&copy),
            vec!["Overview", "Shipped X fast", "Skills: Python, Go", ""]
        );
        assert_eq!(
            report,
            ReinjectReport {
                slots: 4,
                lines: 3,
                applied: 3,
                blanked: 1,
                dropped: 0
            }
        );
    }

    #[test]
    fn test_first_run_gets_line_and_others_are_emptied() {
        let mut document = doc(&[para(&[
            styled_run(BOLD, "Built "),
            run("a thing"),
            styled_run(ITALIC, " quickly"),
        ])]);
        reinject(&mut document, "Shipped it", SlotPolicy::AllSlots);

        let block = document.blocks().next().unwrap();
        let Block::Paragraph(p) = block else {
            panic!("expected a paragraph");
        };
        let runs: Vec<String> = p.runs().iter().map(|r| r.text()).collect();
        assert_eq!(runs, vec!["Shipped it", "", ""]);
    }

    #[test]
    fn test_style_and_structure_are_preserved() {
        let body = vec![
            para(&[styled_run(BOLD, "Jane Doe"), styled_run(ITALIC, " — Engineer")]),
            empty_para(),
            table(&[&["Rust", "Go"], &["SQL", ""]]),
        ];
        let original = doc(&body);
        let mut copy = original.clone();
        reinject(&mut copy, "J. Doe\n\nRust!\nGo!\nSQL!\nMore", SlotPolicy::AllSlots);

        assert_eq!(shape(&copy), shape(&original));
        let xml = String::from_utf8(copy.to_xml().unwrap()).unwrap();
        assert_eq!(xml.matches(BOLD).count(), 1);
        assert_eq!(xml.matches(ITALIC).count(), 1);
        assert_eq!(xml.matches("<w:pStyle w:val=\"ListBullet\"/>").count(), 5);
        assert_eq!(xml.matches("<w:tcW w:w=\"4500\"/>").count(), 4);
        assert!(xml.contains("<w:tblStyle w:val=\"TableGrid\"/>"));
        assert!(xml.contains("<w:spacing w:after=\"120\"/>"));
    }

    #[test]
    fn test_underflow_blanks_remaining_slots() {
        let body: Vec<String> = (1..=5).map(|i| text_para(&format!("p{i}"))).collect();
        let mut document = doc(&body);
        let report = reinject(&mut document, "one\ntwo", SlotPolicy::AllSlots);

        assert_eq!(slot_texts(&document), vec!["one", "two", "", "", ""]);
        assert_eq!(report.blanked, 3);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn test_overflow_drops_extra_lines() {
        let mut document = doc(&[text_para("a"), text_para("b")]);
        let report = reinject(&mut document, "1\n2\n3\n4\n5", SlotPolicy::AllSlots);

        assert_eq!(slot_texts(&document), vec!["1", "2"]);
        assert_eq!(report.dropped, 3);
        assert_eq!(report.blanked, 0);
        assert!(!report.is_aligned());
    }

    #[test]
    fn test_empty_paragraph_consumes_a_line() {
        let mut document = doc(&[text_para("a"), empty_para(), text_para("b")]);
        assert_eq!(extract_lines(&document).len(), 2);
        reinject(&mut document, "x\ny\nz", SlotPolicy::AllSlots);
        assert_eq!(slot_texts(&document), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_cells_are_filled_row_major() {
        let mut document = doc(&[table(&[&["A", "B"], &["C", "D"]])]);
        reinject(&mut document, "1\n2\n3\n4", SlotPolicy::AllSlots);
        assert_eq!(slot_texts(&document), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_only_trailing_whitespace_is_stripped() {
        let mut document = doc(&[text_para("a"), text_para("b"), text_para("c")]);
        reinject(&mut document, "  indented  \r\n\n\tlast\t", SlotPolicy::AllSlots);
        assert_eq!(slot_texts(&document), vec!["  indented", "", "\tlast"]);
    }

    #[test]
    fn test_reinjecting_a_copy_leaves_source_untouched() {
        let original = doc(&scenario_body());
        let before = original.to_xml().unwrap();
        let mut copy = original.clone();
        reinject(&mut copy, "a\nb\nc\nd", SlotPolicy::AllSlots);
        assert_eq!(original.to_xml().unwrap(), before);
        assert_ne!(copy.to_xml().unwrap(), before);
    }

    #[test]
    fn test_non_empty_policy_skips_blank_slots() {
        let mut document = doc(&scenario_body());
        let report = reinject(
            &mut document,
            "Overview\nShipped X fast\nSkills: Python, Go",
            SlotPolicy::NonEmptyOnly,
        );
        assert_eq!(
            slot_texts(&document),
            vec!["Overview", "Shipped X fast", "", "Skills: Python, Go"]
        );
        assert!(report.is_aligned());
    }

    #[test]
    fn test_non_empty_policy_splits_rows_into_cells() {
        let original = doc(&[table(&[&["A", "B"], &["", ""], &["C", "D"], &["E", "F"]])]);
        let mut document = original.clone();
        let report = reinject(
            &mut document,
            "a | b\n|\nc | d | e\nf",
            SlotPolicy::NonEmptyOnly,
        );
        assert_eq!(
            slot_texts(&document),
            vec!["a", "b", "", "", "c", "d | e", "f", ""]
        );
        assert_eq!(report.slots, extract_lines(&original).len());
        assert!(report.is_aligned());
    }

    #[test]
    fn test_split_row_line() {
        assert_eq!(split_row_line("a | b", 2), vec!["a", "b"]);
        assert_eq!(split_row_line("a", 3), vec!["a", "", ""]);
        assert_eq!(split_row_line("a|b|c", 2), vec!["a", "b | c"]);
        assert!(split_row_line("a", 0).is_empty());
    }

    #[test]
    fn test_slot_policy_from_str() {
        assert_eq!("all".parse::<SlotPolicy>().unwrap(), SlotPolicy::AllSlots);
        assert_eq!(
            " NON_EMPTY ".parse::<SlotPolicy>().unwrap(),
            SlotPolicy::NonEmptyOnly
        );
        assert!("sometimes".parse::<SlotPolicy>().is_err());
    }
}
