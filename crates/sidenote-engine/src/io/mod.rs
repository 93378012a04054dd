use std::fs;
use std::path::{Path, PathBuf};

use relative_path::RelativePath;

use crate::editing::Document;
use crate::projection::build_projection;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid export directory: {0}")]
    InvalidExportDir(String),
}

/// Read a markdown file and return its content
pub fn read_file(relative_path: &RelativePath, root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write content to a markdown file, creating parent directories as needed
pub fn write_file(relative_path: &RelativePath, root: &Path, content: &str) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// What an export writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// The Markdown source as-is
    Markdown,
    /// The plain-text projection, markers stripped
    PlainText,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::PlainText => "txt",
        }
    }
}

/// Export the document into `export_dir`, never overwriting anything there.
///
/// The filename is derived from the document's first content line; name
/// collisions get a ` (N)` suffix. Returns the path actually written.
pub fn export_document(
    doc: &Document,
    export_dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, IoError> {
    if !export_dir.is_dir() {
        return Err(IoError::InvalidExportDir(
            export_dir.display().to_string(),
        ));
    }

    let content = match format {
        ExportFormat::Markdown => doc.text(),
        ExportFormat::PlainText => build_projection(doc).text,
    };

    let stem = suggest_stem(doc);
    let path = unique_export_path(export_dir, &stem, format.extension());
    fs::write(&path, content).map_err(IoError::Io)?;
    Ok(path)
}

/// Filename stem for a document: its first projected content line, cleaned
/// up for the filesystem
pub fn suggest_stem(doc: &Document) -> String {
    let projection = build_projection(doc);
    let first_line = projection
        .text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string();

    let mut stem: String = first_line
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .chars()
        .take(60)
        .collect();

    if stem.is_empty() {
        stem = "Untitled".to_string();
    }
    stem
}

/// First free path `dir/stem.ext`, `dir/stem (1).ext`, `dir/stem (2).ext`, ...
pub fn unique_export_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{stem}.{extension}"));
    let mut counter = 1;

    while candidate.exists() {
        candidate = dir.join(format!("{stem} ({counter}).{extension}"));
        counter += 1;
    }

    candidate
}
