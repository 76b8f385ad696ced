//! Media types understood by the document store.

/// Office Open XML word-processing package (.docx)
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// The store's native editable document format
pub const NATIVE_DOCUMENT: &str = "application/vnd.google-apps.document";
pub const FOLDER: &str = "application/vnd.google-apps.folder";
pub const PDF: &str = "application/pdf";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Best-effort media type from a file name's extension.
pub fn guess_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => DOCX,
        "pdf" => PDF,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_by_extension() {
        assert_eq!(guess_from_name("anexo.PDF"), PDF);
        assert_eq!(guess_from_name("convenio.docx"), DOCX);
        assert_eq!(guess_from_name("README"), OCTET_STREAM);
    }
}
