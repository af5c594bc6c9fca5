//! Hand-written WordprocessingML fixtures for tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const BOLD: &str = "<w:rPr><w:b/><w:color w:val=\"1F3864\"/></w:rPr>";
pub const ITALIC: &str = "<w:rPr><w:i/></w:rPr>";

pub fn run(text: &str) -> String {
    format!("<w:r><w:t xml:space=\"preserve\">{text}</w:t></w:r>")
}

pub fn styled_run(props: &str, text: &str) -> String {
    format!("<w:r>{props}<w:t xml:space=\"preserve\">{text}</w:t></w:r>")
}

/// A paragraph with a bullet-list style and the given runs.
pub fn para(runs: &[String]) -> String {
    format!(
        "<w:p><w:pPr><w:pStyle w:val=\"ListBullet\"/></w:pPr>{}</w:p>",
        runs.concat()
    )
}

pub fn text_para(text: &str) -> String {
    para(&[run(text)])
}

pub fn empty_para() -> String {
    "<w:p><w:pPr><w:spacing w:after=\"120\"/></w:pPr></w:p>".to_string()
}

/// A table whose cells each hold one single-run paragraph.
pub fn table(rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|c| format!("<w:tc><w:tcPr><w:tcW w:w=\"4500\"/></w:tcPr>{}</w:tc>", text_para(c)))
                .collect();
            format!("<w:tr>{cells}</w:tr>")
        })
        .collect();
    format!("<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/></w:tblPr><w:tblGrid><w:gridCol w:w=\"4500\"/></w:tblGrid>{rows}</w:tbl>")
}

pub fn document_xml(body: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
        <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
        <w:body>{}<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr></w:body></w:document>",
        body.concat()
    )
}

pub const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
    <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
    <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
    <Override PartName=\"/word/document.xml\" \
    ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
    </Types>";

pub const STYLES: &str = "<?xml version=\"1.0\"?><w:styles xmlns:w=\"urn:w\"/>";

/// Zips a minimal package around `body`.
pub fn docx_bytes(body: &[String]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", deflated).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    zip.start_file("word/document.xml", deflated).unwrap();
    zip.write_all(document_xml(body).as_bytes()).unwrap();
    zip.start_file("word/styles.xml", stored).unwrap();
    zip.write_all(STYLES.as_bytes()).unwrap();

    zip.finish().unwrap().into_inner()
}

/// The scenario document: two text paragraphs, a spacer, and a one-cell table.
pub fn scenario_body() -> Vec<String> {
    vec![
        para(&[styled_run(BOLD, "Summary")]),
        para(&[run("Built "), styled_run(ITALIC, "X")]),
        empty_para(),
        table(&[&["Skills: Python"]]),
    ]
}
