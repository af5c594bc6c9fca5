//! OOXML zip package: read every part, swap `word/document.xml`, write back.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::docx::model::Document;
use crate::docx::DocxError;

pub const DOCUMENT_PART: &str = "word/document.xml";

/// Default cap on the uncompressed size of any single part.
pub const DEFAULT_MAX_PART_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    compression: CompressionMethod,
    is_dir: bool,
    data: Vec<u8>,
}

/// An in-memory `.docx`. Entry order and per-entry compression are kept so
/// the rewritten archive differs from the input only in the document part.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
    document_index: usize,
}

impl DocxPackage {
    /// Reads every entry of the archive. Any entry that inflates beyond
    /// `max_part_bytes` rejects the whole package; the declared size is not
    /// trusted, reads stop one byte past the cap.
    pub fn from_bytes(bytes: &[u8], max_part_bytes: u64) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.size() > max_part_bytes {
                return Err(oversized_part(file.name(), max_part_bytes));
            }
            let mut data = Vec::new();
            file.by_ref()
                .take(max_part_bytes.saturating_add(1))
                .read_to_end(&mut data)?;
            if data.len() as u64 > max_part_bytes {
                return Err(oversized_part(file.name(), max_part_bytes));
            }
            entries.push(PackageEntry {
                name: file.name().to_string(),
                compression: file.compression(),
                is_dir: file.is_dir(),
                data,
            });
        }

        let document_index = entries
            .iter()
            .position(|e| e.name == DOCUMENT_PART)
            .ok_or_else(|| DocxError::MissingPart(DOCUMENT_PART.to_string()))?;

        Ok(Self {
            entries,
            document_index,
        })
    }

    pub fn document_xml(&self) -> &[u8] {
        &self.entries[self.document_index].data
    }

    /// Parses the main document part.
    pub fn document(&self) -> Result<Document, DocxError> {
        Document::parse(self.document_xml())
    }

    pub fn replace_document_xml(&mut self, xml: Vec<u8>) {
        self.entries[self.document_index].data = xml;
    }

    /// Serializes `document` into the main part and writes the whole archive.
    pub fn write_with(&mut self, document: &Document) -> Result<Vec<u8>, DocxError> {
        self.replace_document_xml(document.to_xml()?);
        self.to_bytes()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for entry in &self.entries {
            let method = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)?;
            } else {
                zip.start_file(entry.name.as_str(), options)?;
                zip.write_all(&entry.data)?;
            }
        }

        Ok(zip.finish()?.into_inner())
    }

    #[cfg(test)]
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    #[cfg(test)]
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }
}

fn oversized_part(name: &str, max_part_bytes: u64) -> DocxError {
    DocxError::Malformed(format!(
        "part '{name}' expands beyond the {max_part_bytes}-byte limit"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::*;

    #[test]
    fn test_reads_document_part() {
        let bytes = docx_bytes(&[text_para("Hello")]);
        let package = DocxPackage::from_bytes(&bytes, DEFAULT_MAX_PART_BYTES).unwrap();
        assert_eq!(package.document_xml(), document_xml(&[text_para("Hello")]).as_bytes());
    }

    #[test]
    fn test_rewrite_keeps_other_parts_and_order() {
        let bytes = docx_bytes(&scenario_body());
        let package = DocxPackage::from_bytes(&bytes, DEFAULT_MAX_PART_BYTES).unwrap();
        let out = DocxPackage::from_bytes(&package.to_bytes().unwrap(), DEFAULT_MAX_PART_BYTES).unwrap();

        let names: Vec<&str> = out.part_names().collect();
        assert_eq!(names, vec!["[Content_Types].xml", DOCUMENT_PART, "word/styles.xml"]);
        assert_eq!(out.part("word/styles.xml"), Some(STYLES.as_bytes()));
        assert_eq!(out.document_xml(), package.document_xml());
    }

    #[test]
    fn test_write_with_replaces_document() {
        let bytes = docx_bytes(&[text_para("Old")]);
        let mut package = DocxPackage::from_bytes(&bytes, DEFAULT_MAX_PART_BYTES).unwrap();
        let mut document = package.document().unwrap();
        if let Some(crate::docx::Block::Paragraph(p)) = document.blocks_mut().next() {
            p.set_text("New");
        }
        let out = DocxPackage::from_bytes(&package.write_with(&document).unwrap(), DEFAULT_MAX_PART_BYTES).unwrap();
        let reparsed = out.document().unwrap();
        let texts: Vec<String> = reparsed
            .blocks()
            .filter_map(|b| match b {
                crate::docx::Block::Paragraph(p) => Some(p.text()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["New"]);
    }

    #[test]
    fn test_rejects_non_zip_input() {
        let err = DocxPackage::from_bytes(b"definitely not a zip", DEFAULT_MAX_PART_BYTES).unwrap_err();
        assert!(matches!(err, DocxError::Zip(_)));
    }

    #[test]
    fn test_rejects_package_without_document_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(STYLES.as_bytes()).unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = DocxPackage::from_bytes(&bytes, DEFAULT_MAX_PART_BYTES).unwrap_err();
        assert!(matches!(err, DocxError::MissingPart(ref p) if p == DOCUMENT_PART));
    }

    #[test]
    fn test_rejects_part_inflating_past_limit() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(DOCUMENT_PART, deflated).unwrap();
        zip.write_all(&[b' '; 4096]).unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(bytes.len() < 1024);

        let err = DocxPackage::from_bytes(&bytes, 1024).unwrap_err();
        assert!(matches!(err, DocxError::Malformed(ref m) if m.contains(DOCUMENT_PART)));
        assert!(DocxPackage::from_bytes(&bytes, 4096).is_ok());
    }
}
