//! Note, draft and listing types

use serde::{Deserialize, Serialize};

/// File attached to a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteFile {
    pub name: String,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,

    /// MIME type as reported by the server
    #[serde(default, rename = "type")]
    pub content_type: String,

    /// Marked for removal on the next update
    #[serde(default, skip_serializing)]
    pub disable: bool,
}

impl NoteFile {
    pub fn new(name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
            disable: false,
        }
    }
}

/// Editable note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub files: Vec<NoteFile>,
}

/// Per-field validation result for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteValidation {
    pub title: bool,
    pub content: bool,
    pub tags: bool,
}

impl NoteValidation {
    pub fn is_valid(&self) -> bool {
        self.title && self.content && self.tags
    }
}

impl Note {
    /// A note needs a title, content and at least one tag
    pub fn validate(&self) -> NoteValidation {
        NoteValidation {
            title: !self.title.is_empty(),
            content: !self.content.is_empty(),
            tags: !self.tags.is_empty(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }

    /// Files the user disabled while editing
    pub fn disabled_files(&self) -> impl Iterator<Item = &NoteFile> {
        self.files.iter().filter(|file| file.disable)
    }
}

/// Note as returned by the listing and detail endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailNote {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub files: Vec<NoteFile>,

    #[serde(default)]
    pub files_count: u64,

    #[serde(default, rename = "published_at")]
    pub published_at: String,

    #[serde(default, alias = "preview_image")]
    pub preview_image: String,

    /// Search relevance in `0.0..=1.0`
    #[serde(default)]
    pub score: f64,
}

impl DetailNote {
    /// Relevance score as a rounded percentage
    pub fn score_percents(&self) -> i64 {
        (self.score * 100.0).round() as i64
    }
}

impl From<DetailNote> for Note {
    fn from(detail: DetailNote) -> Self {
        Self {
            id: detail.id,
            title: detail.title,
            content: detail.content,
            tags: detail.tags,
            files: detail.files,
        }
    }
}

/// Server-side draft of a note being edited
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl NoteDraft {
    pub fn from_note(id: impl Into<String>, note: &Note) -> Self {
        Self {
            id: id.into(),
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            preview: None,
        }
    }
}

/// Pagination state of a note listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginator {
    pub current_page: u32,
    pub max_pages: u32,
    pub per_page: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            current_page: 1,
            max_pages: 1,
            per_page: 24,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesPage {
    #[serde(default, alias = "records")]
    pub notes: Vec<DetailNote>,

    #[serde(default)]
    pub total_records: u64,

    #[serde(default)]
    pub paginator: Paginator,

    /// History location for the filter that produced this page
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}
