//! Arguments describing the document to render, shared by render/submit/resubmit.

use accord_protocol::{FieldMap, RenderRequest};
use anyhow::{Context as _, Result};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, clap::Args)]
pub struct DocumentArgs {
    /// Field value (repeatable), e.g. --field contraparte="ACME S.A."
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// JSON object with field values; --field entries override it
    #[arg(long = "fields-file")]
    pub fields_file: Option<PathBuf>,

    /// Title used when no template matches (defaults to the type name)
    #[arg(long)]
    pub title: Option<String>,

    /// Clause used when no template matches (repeatable, in order)
    #[arg(long = "clause")]
    pub clauses: Vec<String>,
}

impl DocumentArgs {
    pub fn has_overrides(&self) -> bool {
        !self.fields.is_empty() || self.fields_file.is_some() || self.title.is_some() || !self.clauses.is_empty()
    }

    /// Field values from the file, then from `--field`, applied onto `base`.
    pub fn merged_fields(&self, mut base: FieldMap) -> Result<FieldMap> {
        if let Some(path) = &self.fields_file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read fields file {}", path.display()))?;
            let from_file: FieldMap = serde_json::from_str(&raw)
                .with_context(|| format!("Fields file {} is not a JSON object", path.display()))?;
            for (key, value) in from_file.iter() {
                base.insert(key, value);
            }
        }
        for (key, value) in &self.fields {
            base.insert(key.as_str(), value.as_str());
        }
        Ok(base)
    }

    pub fn request(&self, type_name: &str) -> Result<RenderRequest> {
        self.apply(RenderRequest::new(type_name, FieldMap::new()))
    }

    /// Apply these arguments on top of an existing request.
    pub fn apply(&self, base: RenderRequest) -> Result<RenderRequest> {
        let fields = self.merged_fields(base.fields.clone())?;
        let mut request = RenderRequest {
            fields,
            ..base
        };
        if let Some(title) = &self.title {
            request.structural_fallback.title = title.clone();
        }
        if !self.clauses.is_empty() {
            request.structural_fallback.clauses = self.clauses.clone();
        }
        Ok(request)
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Invalid field '{}'. Expected key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid field '{}': empty key", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
