//! Directory of candidate templates, listed fresh on every lookup.

use crate::error::{Result, TemplateError};
use crate::resolver::{resolve_template, TemplateCandidate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMPLATE_EXTENSION: &str = "docx";

#[derive(Debug, Clone)]
pub struct TemplateSource {
    dir: PathBuf,
}

impl TemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List candidate template file names, sorted by name.
    ///
    /// Only `.docx` regular files count; hidden files and Word lock files
    /// (`~$...`) are skipped.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Err(TemplateError::SourceNotFound(self.dir.display().to_string()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_template_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        debug!("Listed {} templates in {}", names.len(), self.dir.display());
        Ok(names)
    }

    pub fn read(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(file_name);
        Ok(fs::read(&path)?)
    }

    /// List, resolve and load the best template for `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<(TemplateCandidate, Vec<u8>)> {
        let files = self.list()?;
        let candidate = resolve_template(type_name, &files)?;
        let binary = self.read(&candidate.file_name)?;
        Ok((candidate, binary))
    }
}

fn is_template_name(name: &str) -> bool {
    if name.starts_with('.') || name.starts_with("~$") {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z-marco.docx", "a-practica.DOCX", "~$marco.docx", ".oculto.docx", "notas.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("carpeta.docx")).unwrap();

        let source = TemplateSource::new(dir.path());
        assert_eq!(source.list().unwrap(), vec!["a-practica.DOCX", "z-marco.docx"]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let source = TemplateSource::new("/definitely/not/here");
        assert!(matches!(source.list(), Err(TemplateError::SourceNotFound(_))));
    }

    #[test]
    fn resolve_reads_the_winning_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("marco.docx"), b"marco").unwrap();
        fs::write(dir.path().join("convenio-marco-practica.docx"), b"practica").unwrap();

        let source = TemplateSource::new(dir.path());
        let (candidate, binary) = source.resolve("Convenio Marco").unwrap();
        assert_eq!(candidate.file_name, "marco.docx");
        assert_eq!(binary, b"marco");
    }
}
