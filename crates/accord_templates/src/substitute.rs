//! Merge-field substitution over an existing template package.
//!
//! Fields are written `{{name}}` in the template text. Word frequently splits
//! such a placeholder across several runs (`{{`, `fecha_`, `inicio}}`), so
//! substitution works on the concatenated text of each paragraph and writes
//! the value into the first run the placeholder touches. That run keeps its
//! formatting; the placeholder's leftovers are removed from the other runs.

use crate::docx::{is_text_part, read_package, scan_part, write_package, TextNode, DOCUMENT_PART};
use crate::error::{Result, TemplateError};
use accord_protocol::FieldMap;
use quick_xml::escape::escape;
use std::ops::Range;
use tracing::debug;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// Fills `{{field}}` placeholders of a template package.
#[derive(Debug, Clone, Default)]
pub struct TemplateSubstitutionRenderer;

/// Placeholder located in a paragraph's concatenated text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholder {
    span: Range<usize>,
    key: String,
}

impl TemplateSubstitutionRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Fill the template named `template_name` (used in errors and logs).
    pub fn render(&self, template_name: &str, template: &[u8], fields: &FieldMap) -> Result<Vec<u8>> {
        let mut parts = read_package(template)
            .map_err(|e| TemplateError::render(template_name, format!("unreadable package: {}", e)))?;

        if !parts.iter().any(|p| p.name == DOCUMENT_PART) {
            return Err(TemplateError::render(
                template_name,
                format!("package has no {}", DOCUMENT_PART),
            ));
        }

        let mut substituted = 0usize;
        for part in parts.iter_mut().filter(|p| is_text_part(&p.name)) {
            let xml = std::str::from_utf8(&part.data).map_err(|e| {
                TemplateError::render(template_name, format!("{} is not UTF-8: {}", part.name, e))
            })?;
            let (rewritten, count) = fill_part(xml, fields)
                .map_err(|message| TemplateError::render(template_name, format!("{}: {}", part.name, message)))?;
            if count > 0 {
                part.data = rewritten.into_bytes();
                substituted += count;
            }
        }

        debug!(
            "Filled {} placeholders in template {}",
            substituted, template_name
        );
        write_package(&parts)
    }
}

/// Rewrite one XML part. Returns the new XML and the number of placeholders
/// replaced.
fn fill_part(xml: &str, fields: &FieldMap) -> std::result::Result<(String, usize), String> {
    let layout = scan_part(xml)?;

    // Braces outside any paragraph cannot be merge fields.
    let loose: String = layout.loose.iter().map(|n| n.text.as_str()).collect();
    find_placeholders(&loose)?;

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    let mut count = 0;
    for paragraph in &layout.paragraphs {
        let nodes: Vec<&TextNode> = paragraph.text_nodes().collect();
        let (new_texts, n) = fill_paragraph(&nodes, fields)?;
        count += n;
        for (node, new_text) in nodes.iter().zip(new_texts) {
            let Some(text) = new_text else {
                continue;
            };
            out.push_str(&xml[cursor..node.open_tag.start]);
            out.push_str(&preserve_space(&xml[node.open_tag.clone()]));
            out.push_str(&escape_with_breaks(&text));
            cursor = node.content.end;
        }
    }
    out.push_str(&xml[cursor..]);
    Ok((out, count))
}

/// New text for every node a placeholder touches (`None` for the others),
/// plus the number of placeholders in the paragraph.
fn fill_paragraph(
    nodes: &[&TextNode],
    fields: &FieldMap,
) -> std::result::Result<(Vec<Option<String>>, usize), String> {
    let full: String = nodes.iter().map(|n| n.text.as_str()).collect();
    let placeholders = find_placeholders(&full)?;
    if placeholders.is_empty() {
        return Ok((vec![None; nodes.len()], 0));
    }

    let mut new_texts: Vec<String> = vec![String::new(); nodes.len()];
    let mut touched = vec![false; nodes.len()];
    let mut next = placeholders.iter().peekable();
    let mut base = 0;
    for (idx, node) in nodes.iter().enumerate() {
        for (local, ch) in node.text.char_indices() {
            let pos = base + local;
            while next.peek().map_or(false, |p| p.span.end <= pos) {
                next.next();
            }
            match next.peek() {
                Some(p) if p.span.contains(&pos) => {
                    touched[idx] = true;
                    if pos == p.span.start {
                        new_texts[idx].push_str(&field_value(fields, &p.key));
                    }
                }
                _ => new_texts[idx].push(ch),
            }
        }
        base += node.text.len();
    }

    let filled = new_texts
        .into_iter()
        .zip(touched)
        .map(|(text, touched)| touched.then_some(text))
        .collect();
    Ok((filled, placeholders.len()))
}

fn field_value(fields: &FieldMap, key: &str) -> String {
    match fields.get(key) {
        Some(value) => value.to_string(),
        None => {
            debug!("No value for field '{}', leaving it empty", key);
            String::new()
        }
    }
}

/// Locate every `{{key}}` in `text`. An unclosed `{{`, a `}}` with no
/// opener, or an empty key is an error.
fn find_placeholders(text: &str) -> std::result::Result<Vec<Placeholder>, String> {
    let mut found = Vec::new();
    let mut pos = 0;
    loop {
        let rest = &text[pos..];
        let open = rest.find(OPEN);
        let close = rest.find(CLOSE);
        match (open, close) {
            (None, None) => return Ok(found),
            (None, Some(c)) => return Err(format!("stray '}}}}' at offset {}", pos + c)),
            (Some(o), Some(c)) if c < o => {
                return Err(format!("stray '}}}}' at offset {}", pos + c))
            }
            (Some(o), _) => {
                let start = pos + o;
                let inner_start = start + OPEN.len();
                let Some(len) = text[inner_start..].find(CLOSE) else {
                    return Err(format!("unclosed '{{{{' at offset {}", start));
                };
                let inner = &text[inner_start..inner_start + len];
                if inner.contains(OPEN) {
                    return Err(format!("unclosed '{{{{' at offset {}", start));
                }
                let key = inner.trim();
                if key.is_empty() {
                    return Err(format!("empty field name at offset {}", start));
                }
                let end = inner_start + len + CLOSE.len();
                found.push(Placeholder {
                    span: start..end,
                    key: key.to_string(),
                });
                pos = end;
            }
        }
    }
}

fn preserve_space(open_tag: &str) -> String {
    if open_tag.contains("xml:space=") {
        open_tag.to_string()
    } else {
        r#"<w:t xml:space="preserve">"#.to_string()
    }
}

fn escape_with_breaks(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split('\n')
        .map(|line| escape(line).into_owned())
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}
