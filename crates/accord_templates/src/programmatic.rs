//! Builds a document from scratch when no template applies.

use crate::docx::{write_package, PackagePart, DOCUMENT_PART};
use crate::error::Result;
use accord_protocol::{FieldMap, StructuralFallback};
use quick_xml::escape::escape;

const FALLBACK_TITLE: &str = "Documento";
const FIELDS_HEADING: &str = "Datos del acuerdo";
const CLAUSES_HEADING: &str = "Cláusulas";

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

const STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/>"#,
    r#"<w:rPr><w:sz w:val="22"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/>"#,
    r#"<w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style>"#,
    r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/>"#,
    r#"<w:pPr><w:spacing w:before="240" w:after="120"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/></w:rPr></w:style>"#,
    r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders>"#,
    r#"<w:top w:val="single" w:sz="4"/><w:left w:val="single" w:sz="4"/><w:bottom w:val="single" w:sz="4"/>"#,
    r#"<w:right w:val="single" w:sz="4"/><w:insideH w:val="single" w:sz="4"/><w:insideV w:val="single" w:sz="4"/>"#,
    r#"</w:tblBorders></w:tblPr></w:style>"#,
    r#"</w:styles>"#
);

/// Synthesizes a package from a title, numbered clauses and a field table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgrammaticRenderer;

impl ProgrammaticRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Build the document. `type_name` titles it when the fallback has no title.
    pub fn render(&self, type_name: &str, fallback: &StructuralFallback, fields: &FieldMap) -> Result<Vec<u8>> {
        let title = [fallback.title.trim(), type_name.trim()]
            .into_iter()
            .find(|t| !t.is_empty())
            .unwrap_or(FALLBACK_TITLE);

        let mut body = String::new();
        body.push_str(&paragraph(Some("Title"), title));

        let clauses: Vec<&str> = fallback
            .clauses
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if !clauses.is_empty() {
            body.push_str(&paragraph(Some("Heading1"), CLAUSES_HEADING));
            for (idx, clause) in clauses.iter().enumerate() {
                body.push_str(&paragraph(None, &format!("{}. {}", idx + 1, clause)));
            }
        }

        if !fields.is_empty() {
            body.push_str(&paragraph(Some("Heading1"), FIELDS_HEADING));
            body.push_str(&field_table(fields));
        }

        let document = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                r#"<w:body>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
                r#"<w:pgMar w:top="1417" w:right="1701" w:bottom="1417" w:left="1701"/></w:sectPr></w:body></w:document>"#
            ),
            body
        );

        write_package(&[
            PackagePart::new("[Content_Types].xml", CONTENT_TYPES),
            PackagePart::new("_rels/.rels", PACKAGE_RELS),
            PackagePart::new(DOCUMENT_PART, document),
            PackagePart::new("word/_rels/document.xml.rels", DOCUMENT_RELS),
            PackagePart::new("word/styles.xml", STYLES),
        ])
    }
}

/// `fecha_inicio` -> `Fecha inicio`.
pub fn humanize_key(key: &str) -> String {
    let spaced: Vec<&str> = key
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    let joined = spaced.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn paragraph(style: Option<&str>, text: &str) -> String {
    let props = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
        .unwrap_or_default();
    format!("<w:p>{}{}</w:p>", props, run(text))
}

fn run(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(line)))
        .collect();
    format!("<w:r>{}</w:r>", lines.join("<w:br/>"))
}

fn cell(text: &str, bold: bool) -> String {
    let content = if bold {
        format!(
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(text)
        )
    } else {
        run(text)
    };
    format!(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr><w:p>{}</w:p></w:tc>"#, content)
}

fn field_table(fields: &FieldMap) -> String {
    let mut table = String::from(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol/><w:gridCol/></w:tblGrid>"#,
    );
    for (key, value) in fields.iter() {
        table.push_str("<w:tr>");
        table.push_str(&cell(&humanize_key(key), true));
        table.push_str(&cell(value, false));
        table.push_str("</w:tr>");
    }
    table.push_str("</w:tbl>");
    table
}
