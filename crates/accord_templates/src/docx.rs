//! Reading and writing word-processing packages.
//!
//! A `.docx` is a zip archive of XML parts. Parts are kept in archive order
//! so a rewritten package lists its entries exactly like the original.

use crate::error::{Result, TemplateError};
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part; every package must carry it.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// One named entry of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePart {
    pub name: String,
    pub data: Vec<u8>,
}

impl PackagePart {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Parts whose text runs may carry merge fields.
pub fn is_text_part(name: &str) -> bool {
    if name == DOCUMENT_PART {
        return true;
    }
    match name.strip_prefix("word/") {
        Some(rest) => {
            !rest.contains('/')
                && rest.ends_with(".xml")
                && (rest.starts_with("header") || rest.starts_with("footer"))
        }
        None => false,
    }
}

/// Read every file entry of a package, in archive order.
pub fn read_package(binary: &[u8]) -> Result<Vec<PackagePart>> {
    let mut archive = ZipArchive::new(Cursor::new(binary))?;
    let mut parts = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        parts.push(PackagePart::new(entry.name(), data));
    }
    Ok(parts)
}

/// Write parts into a new package with canonical timestamps (1980-01-01),
/// so identical parts always give identical bytes.
pub fn write_package(parts: &[PackagePart]) -> Result<Vec<u8>> {
    let mut archive = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut archive));
        let options = SimpleFileOptions::default()
            .last_modified_time(zip::DateTime::default())
            .compression_method(CompressionMethod::Deflated);

        for part in parts {
            zip.start_file(part.name.as_str(), options)?;
            zip.write_all(&part.data)?;
        }
        zip.finish()?;
    }
    Ok(archive)
}

/// One `<w:t>` element. Ranges are byte offsets into the part XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub open_tag: Range<usize>,
    pub content: Range<usize>,
    /// Unescaped content
    pub text: String,
}

/// Paragraph content that contributes to its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(TextNode),
    Break,
    Tab,
}

/// A top-level `<w:p>`; nested paragraphs (text boxes) are folded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub span: Range<usize>,
    pub inlines: Vec<Inline>,
}

impl Paragraph {
    fn open(span: Range<usize>) -> Self {
        Self {
            span,
            inlines: Vec::new(),
        }
    }

    pub fn text_nodes(&self) -> impl Iterator<Item = &TextNode> {
        self.inlines.iter().filter_map(|inline| match inline {
            Inline::Text(node) => Some(node),
            _ => None,
        })
    }

    pub fn text(&self) -> String {
        self.inlines
            .iter()
            .map(|inline| match inline {
                Inline::Text(node) => node.text.as_str(),
                Inline::Break => "\n",
                Inline::Tab => "\t",
            })
            .collect()
    }
}

/// Text layout of one XML part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartLayout {
    pub paragraphs: Vec<Paragraph>,
    /// `<w:t>` elements outside any paragraph
    pub loose: Vec<TextNode>,
}

/// Walk a part and collect its paragraphs and text elements.
pub fn scan_part(xml: &str) -> std::result::Result<PartLayout, String> {
    let mut reader = Reader::from_str(xml);
    let mut layout = PartLayout::default();
    let mut current: Option<Paragraph> = None;
    let mut depth = 0usize;
    let mut open_text: Option<Range<usize>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML near byte {}: {}", reader.buffer_position(), e))?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    if depth == 0 {
                        current = Some(Paragraph::open(tag_start(xml, end)..end));
                    }
                    depth += 1;
                }
                b"w:t" => open_text = Some(tag_start(xml, end)..end),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        if let Some(mut paragraph) = current.take() {
                            paragraph.span.end = end;
                            layout.paragraphs.push(paragraph);
                        }
                    }
                }
                b"w:t" => {
                    let Some(open_tag) = open_text.take() else {
                        continue;
                    };
                    let content = open_tag.end..tag_start(xml, end);
                    let text = unescape(&xml[content.clone()])
                        .map_err(|e| format!("invalid text at byte {}: {}", content.start, e))?
                        .into_owned();
                    let node = TextNode {
                        open_tag,
                        content,
                        text,
                    };
                    match current.as_mut() {
                        Some(paragraph) => paragraph.inlines.push(Inline::Text(node)),
                        None => layout.loose.push(node),
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                let inline = match e.name().as_ref() {
                    b"w:p" if depth == 0 => {
                        layout
                            .paragraphs
                            .push(Paragraph::open(tag_start(xml, end)..end));
                        None
                    }
                    b"w:br" => Some(Inline::Break),
                    b"w:tab" => Some(Inline::Tab),
                    _ => None,
                };
                if let (Some(inline), Some(paragraph)) = (inline, current.as_mut()) {
                    paragraph.inlines.push(inline);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layout)
}

/// Start of the tag that ends at `end`. `<` never appears unescaped inside
/// a tag, so the last one before `end` opens it.
fn tag_start(xml: &str, end: usize) -> usize {
    xml[..end].rfind('<').unwrap_or(0)
}

/// Plain text of the main document: one line per paragraph, `<w:br/>` as a
/// newline and `<w:tab/>` as a tab.
pub fn document_text(binary: &[u8]) -> Result<String> {
    let parts = read_package(binary)?;
    let document = parts
        .iter()
        .find(|p| p.name == DOCUMENT_PART)
        .ok_or_else(|| TemplateError::render("package", "missing word/document.xml"))?;
    let xml = String::from_utf8_lossy(&document.data);
    let layout = scan_part(&xml).map_err(|e| TemplateError::render("package", e))?;

    let lines: Vec<String> = layout.paragraphs.iter().map(Paragraph::text).collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_parts_are_document_headers_and_footers() {
        assert!(is_text_part("word/document.xml"));
        assert!(is_text_part("word/header1.xml"));
        assert!(is_text_part("word/footer2.xml"));
        assert!(!is_text_part("word/styles.xml"));
        assert!(!is_text_part("word/_rels/header1.xml.rels"));
        assert!(!is_text_part("customXml/header1.xml"));
    }

    #[test]
    fn package_is_deterministic_and_readable() {
        let parts = vec![
            PackagePart::new("[Content_Types].xml", b"<Types/>".to_vec()),
            PackagePart::new(DOCUMENT_PART, b"<w:document/>".to_vec()),
        ];
        let a = write_package(&parts).unwrap();
        let b = write_package(&parts).unwrap();
        assert_eq!(a, b);
        assert_eq!(read_package(&a).unwrap(), parts);
    }

    #[test]
    fn garbage_is_not_a_package() {
        assert!(matches!(
            read_package(b"definitely not a zip"),
            Err(TemplateError::Package(_))
        ));
    }

    #[test]
    fn scan_decodes_entities_and_records_spans() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve">P&#233;rez &amp; &#x41;</w:t></w:r></w:p>"#;
        let layout = scan_part(xml).unwrap();
        assert_eq!(layout.paragraphs.len(), 1);
        assert_eq!(layout.paragraphs[0].span, 0..xml.len());

        let node = layout.paragraphs[0].text_nodes().next().unwrap();
        assert_eq!(node.text, "Pérez & A");
        assert_eq!(&xml[node.open_tag.clone()], r#"<w:t xml:space="preserve">"#);
        assert_eq!(&xml[node.content.clone()], "P&#233;rez &amp; &#x41;");
    }

    #[test]
    fn self_closing_paragraph_stands_alone() {
        let xml = concat!(
            r#"<w:body><w:p w:rsidR="00A1"/>"#,
            r#"<w:p><w:r><w:t>Hola</w:t></w:r></w:p></w:body>"#
        );
        let layout = scan_part(xml).unwrap();
        assert_eq!(layout.paragraphs.len(), 2);
        assert_eq!(&xml[layout.paragraphs[0].span.clone()], r#"<w:p w:rsidR="00A1"/>"#);
        assert_eq!(layout.paragraphs[1].text(), "Hola");

        let binary = write_package(&[PackagePart::new(DOCUMENT_PART, xml.as_bytes().to_vec())]).unwrap();
        assert_eq!(document_text(&binary).unwrap(), "\nHola");
    }

    #[test]
    fn text_box_paragraphs_fold_into_their_host() {
        let xml = concat!(
            r#"<w:p><w:r><w:t>A</w:t></w:r><w:r><w:txbxContent>"#,
            r#"<w:p><w:r><w:t>B</w:t></w:r></w:p>"#,
            r#"</w:txbxContent></w:r></w:p>"#
        );
        let layout = scan_part(xml).unwrap();
        assert_eq!(layout.paragraphs.len(), 1);
        assert_eq!(layout.paragraphs[0].text(), "AB");
    }

    #[test]
    fn broken_markup_is_reported() {
        assert!(scan_part("<w:p><w:t>abierto</w:p>").is_err());
        assert!(scan_part("<w:p><w:t>R&D;</w:t></w:p>").is_err());
    }

    #[test]
    fn document_text_reads_paragraphs() {
        let xml = concat!(
            r#"<w:document><w:body>"#,
            r#"<w:p><w:r><w:t>Hola</w:t></w:r><w:r><w:t xml:space="preserve"> mundo</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr/><w:r><w:t>a</w:t><w:br/><w:t>b</w:t><w:tab/><w:t>&amp;</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#
        );
        let binary = write_package(&[PackagePart::new(DOCUMENT_PART, xml.as_bytes().to_vec())]).unwrap();
        assert_eq!(document_text(&binary).unwrap(), "Hola mundo\na\nb\t&");
    }
}
