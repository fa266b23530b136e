//! Loading a corpus of documents from a directory.
//!
//! Plain text (`.txt`) and markdown (`.md`, `.markdown`) files become one
//! [`Document`] each. With the `pdf` feature, every non-blank page of a
//! `.pdf` file becomes its own document with `page` set. Other files are
//! ignored.

use std::path::Path;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Options for [`load_documents_with`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
}

/// Load every supported file directly inside `dir`.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    load_documents_with(dir, &LoadOptions::default())
}

/// Load every supported file under `dir`, in path order.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` cannot be read and
/// [`RagError::LoadError`] if a PDF cannot be parsed. Text files that are not
/// valid UTF-8 are skipped with a warning.
pub fn load_documents_with(dir: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let max_depth = if options.recursive { usize::MAX } else { 1 };
    let mut documents = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth).sort_by_file_name() {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => RagError::Io(io),
            None => RagError::LoadError {
                path: dir.display().to_string(),
                message: "filesystem loop detected".into(),
            },
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let source = relative_source(dir, path);
        match extension(path).as_deref() {
            Some("txt" | "md" | "markdown") => {
                if let Some(document) = load_text(path, &source)? {
                    documents.push(document);
                }
            }
            Some("pdf") => documents.extend(load_pdf(path, &source)?),
            _ => debug!(path = %path.display(), "skipping unsupported file"),
        }
    }

    info!(dir = %dir.display(), document_count = documents.len(), "loaded documents");
    Ok(documents)
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

fn relative_source(dir: &Path, path: &Path) -> String {
    path.strip_prefix(dir).unwrap_or(path).display().to_string()
}

fn load_text(path: &Path, source: &str) -> Result<Option<Document>> {
    let bytes = std::fs::read(path)?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            warn!(path = %path.display(), "skipping file that is not valid UTF-8");
            return Ok(None);
        }
    };
    if text.trim().is_empty() {
        debug!(path = %path.display(), "skipping empty file");
        return Ok(None);
    }
    Ok(Some(Document::new(source, source, text)))
}

#[cfg(feature = "pdf")]
fn load_pdf(path: &Path, source: &str) -> Result<Vec<Document>> {
    let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| RagError::LoadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| {
            let page = i as u32 + 1;
            Document::new(format!("{source}#page={page}"), source, text).with_page(page)
        })
        .collect())
}

#[cfg(not(feature = "pdf"))]
fn load_pdf(path: &Path, _source: &str) -> Result<Vec<Document>> {
    warn!(path = %path.display(), "skipping PDF; build with the `pdf` feature to load it");
    Ok(Vec::new())
}
