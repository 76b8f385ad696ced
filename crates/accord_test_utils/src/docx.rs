//! Minimal `.docx` packages for renderer tests.

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Builds a template package paragraph by paragraph.
///
/// Each paragraph is a list of runs; a run is written as its own `<w:r>`, so
/// a placeholder can be split across runs the way word processors do it.
#[derive(Debug, Clone, Default)]
pub struct DocxFixture {
    paragraphs: Vec<Vec<String>>,
    headers: Vec<Vec<String>>,
    extra_parts: Vec<(String, Vec<u8>)>,
    omit_document: bool,
}

impl DocxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with a single run.
    pub fn paragraph(self, text: &str) -> Self {
        self.runs(&[text])
    }

    /// Paragraph made of several runs.
    pub fn runs(mut self, runs: &[&str]) -> Self {
        self.paragraphs.push(runs.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Add `word/header<N>.xml` with one paragraph of the given runs.
    pub fn header(mut self, runs: &[&str]) -> Self {
        self.headers.push(runs.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Add an arbitrary part, copied as-is.
    pub fn part(mut self, name: &str, data: &[u8]) -> Self {
        self.extra_parts.push((name.to_string(), data.to_vec()));
        self
    }

    /// Leave out `word/document.xml` (a broken package).
    pub fn without_document(mut self) -> Self {
        self.omit_document = true;
        self
    }

    /// XML of the main document part.
    pub fn document_xml(&self) -> String {
        let body: String = self.paragraphs.iter().map(|runs| paragraph_xml(runs)).collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            W_NS, body
        )
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let mut parts: Vec<(String, Vec<u8>)> = vec![(
            "[Content_Types].xml".to_string(),
            br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.to_vec(),
        )];
        if !self.omit_document {
            parts.push(("word/document.xml".to_string(), self.document_xml().into_bytes()));
        }
        for (idx, runs) in self.headers.iter().enumerate() {
            let xml = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="{}">{}</w:hdr>"#,
                W_NS,
                paragraph_xml(runs)
            );
            parts.push((format!("word/header{}.xml", idx + 1), xml.into_bytes()));
        }
        parts.extend(self.extra_parts.iter().cloned());

        let mut archive = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut archive));
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            for (name, data) in &parts {
                zip.start_file(name.as_str(), options)
                    .with_context(|| format!("Failed to add {} to fixture", name))?;
                zip.write_all(data)?;
            }
            zip.finish().context("Failed to finalize fixture")?;
        }
        Ok(archive)
    }
}

fn paragraph_xml(runs: &[String]) -> String {
    let runs: String = runs
        .iter()
        .map(|text| format!(r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#, escape(text)))
        .collect();
    format!("<w:p>{}</w:p>", runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_runs_are_separate_elements() {
        let xml = DocxFixture::new().runs(&["{{fe", "cha}}"]).document_xml();
        assert_eq!(xml.matches("<w:r>").count(), 2);
        assert!(xml.contains(">{{fe</w:t>"));
    }

    #[test]
    fn build_produces_a_zip() {
        let bytes = DocxFixture::new().paragraph("hola").build().unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
