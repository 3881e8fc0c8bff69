//! Document loading from a local directory
//!
//! Every readable text file in the data directory becomes one [`Document`]
//! carrying its extracted text and file metadata. Hidden files, known
//! binary formats and files containing NUL bytes are skipped.

use crate::chunk::compute_content_hash;
use crate::error::{Error, Result};
use crate::parse::{parse_content, ContentType, ParsedDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// File metadata attached to every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<String>,
}

/// A loaded document
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identifier derived from the file path
    pub id: String,
    pub path: PathBuf,
    /// Extracted text, title and headings
    pub parsed: ParsedDocument,
    /// Blake3 hash of the raw file bytes
    pub content_hash: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Stable document id for a path
    pub fn id_for_path(path: &Path) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, path.to_string_lossy().as_bytes()).to_string()
    }

    pub fn title(&self) -> Option<&str> {
        self.parsed.title.as_deref()
    }
}

/// Extensions that never hold readable text
const SKIPPED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp", "mp3", "mp4", "wav", "ogg", "webm",
    "mov", "zip", "tar", "gz", "7z", "rar", "exe", "dll", "so", "dylib", "bin", "woff", "woff2",
    "ttf", "otf", "pyc", "class", "o", "lock", "pdf", "sqlite3", "db",
];

/// Bytes sniffed for NUL when deciding a file is binary
const BINARY_SNIFF_LEN: usize = 8192;

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn has_skipped_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SKIPPED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0)
}

/// Load all documents from a directory
pub fn load_documents(dir: &Path, recursive: bool) -> Result<Vec<Document>> {
    let canonical = dir
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", dir.display(), e)))?;

    if !canonical.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            canonical.display()
        )));
    }

    info!("Loading documents from {}", canonical.display());

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files: Vec<PathBuf> = Vec::new();

    let walker = WalkDir::new(&canonical)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = entry.map_err(|e| Error::Loader(e.to_string()))?;
        if entry.file_type().is_file() && !has_skipped_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        if let Some(doc) = load_file(&path)? {
            documents.push(doc);
        }
    }

    if documents.is_empty() {
        return Err(Error::Loader(format!(
            "no documents found in {}",
            canonical.display()
        )));
    }

    info!("Loaded {} documents", documents.len());
    Ok(documents)
}

/// Load a single file; `None` when the file is binary
pub fn load_file(path: &Path) -> Result<Option<Document>> {
    let bytes = std::fs::read(path)?;

    if looks_binary(&bytes) {
        debug!("Skipping binary file: {}", path.display());
        return Ok(None);
    }

    let content_hash = compute_content_hash(&bytes);
    let raw = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!("{} is not valid UTF-8; decoding lossily", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    let content_type = ContentType::for_path(path);
    let parsed = parse_content(&raw, content_type)?;

    let fs_meta = std::fs::metadata(path)?;
    let last_modified_date = fs_meta
        .modified()
        .ok()
        .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d").to_string());

    let metadata = DocumentMetadata {
        file_path: path.display().to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_type: mime_guess::from_path(path)
            .first_or_text_plain()
            .essence_str()
            .to_string(),
        file_size: fs_meta.len(),
        last_modified_date,
    };

    debug!(
        path = %path.display(),
        content_type = content_type.as_str(),
        chars = parsed.text.len(),
        "Loaded document"
    );

    Ok(Some(Document {
        id: Document::id_for_path(path),
        path: path.to_path_buf(),
        parsed,
        content_hash,
        metadata,
    }))
}
