//! Destination path resolution
//!
//! Every artifact lands at `{base}/{source}/[{category}/]{file_name}` where
//! `source` is the sanitized title of the container it came from.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use utoipa::ToSchema;

#[allow(clippy::expect_used)]
static ILLEGAL_PATH_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("static regex is valid"));

/// Content category used to bucket files when classification is enabled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Photos and pictures
    Image,
    /// Video files
    Video,
    /// Music and voice
    Audio,
    /// Text, office and PDF documents
    Document,
    /// Compressed archives
    Archive,
    /// Source code and scripts
    Code,
    /// Anything else, including files without an extension
    Other,
}

const EXTENSION_TABLE: &[(FileCategory, &[&str])] = &[
    (
        FileCategory::Image,
        &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "svg", "heic"],
    ),
    (
        FileCategory::Video,
        &["mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "ts"],
    ),
    (
        FileCategory::Audio,
        &["mp3", "flac", "wav", "ogg", "m4a", "aac", "opus", "wma"],
    ),
    (
        FileCategory::Document,
        &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "epub", "md"],
    ),
    (
        FileCategory::Archive,
        &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "zst"],
    ),
    (
        FileCategory::Code,
        &["rs", "py", "js", "c", "cpp", "h", "java", "go", "sh", "json", "toml", "yaml"],
    ),
];

impl FileCategory {
    /// Classify a file name by its extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Self {
        let Some(ext) = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
        else {
            return FileCategory::Other;
        };

        EXTENSION_TABLE
            .iter()
            .find(|(_, exts)| exts.contains(&ext.as_str()))
            .map(|(category, _)| *category)
            .unwrap_or(FileCategory::Other)
    }

    /// Directory name used for this category
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Audio => "audio",
            FileCategory::Document => "document",
            FileCategory::Archive => "archive",
            FileCategory::Code => "code",
            FileCategory::Other => "other",
        }
    }
}

/// Replace characters that are illegal in path components with `_`
pub fn sanitize_component(name: &str) -> String {
    ILLEGAL_PATH_CHARS
        .replace_all(name.trim(), "_")
        .trim_end_matches(['.', ' '])
        .to_string()
}

/// Derives destination directories and file paths
#[derive(Clone, Debug)]
pub struct PathResolver {
    base: PathBuf,
    fallback_dir: String,
    classify_by_type: bool,
}

impl PathResolver {
    /// Create a resolver rooted at `base`
    pub fn new(base: impl Into<PathBuf>, fallback_dir: impl Into<String>, classify: bool) -> Self {
        Self {
            base: base.into(),
            fallback_dir: fallback_dir.into(),
            classify_by_type: classify,
        }
    }

    /// Root download directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory a file from `source_name` will be written into
    ///
    /// An absent, empty or dot-only source name falls back to the configured
    /// fallback directory.
    pub fn directory(&self, source_name: Option<&str>, file_name: &str) -> PathBuf {
        let source = source_name
            .map(sanitize_component)
            .filter(|s| !s.is_empty() && s != "." && s != "..")
            .unwrap_or_else(|| self.fallback_dir.clone());

        let mut dir = self.base.join(source);
        if self.classify_by_type {
            dir.push(FileCategory::from_file_name(file_name).dir_name());
        }
        dir
    }

    /// Full destination path for `file_name`
    pub fn resolve(&self, source_name: Option<&str>, file_name: &str) -> PathBuf {
        self.directory(source_name, file_name)
            .join(sanitize_component(file_name))
    }
}
