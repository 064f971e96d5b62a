//! Notes, files, tags and drafts endpoints

use crate::pipeline::Dispatcher;
use crate::request::{ApiRequest, UploadFile};
use crate::Result;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taged_core::{DetailNote, Note, NoteDraft, NoteFile, NoteSearchFilter, NotesPage, UserPermissions};
use tracing::{debug, instrument, warn};

pub const NOTES_PATH: &str = "/api/notes";
pub const DRAFTS_PATH: &str = "/api/drafts";

/// Form field name for uploaded note files
pub const FILES_FIELD: &str = "files";

/// Bytes escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn segment(raw: &str) -> String {
    utf8_percent_encode(raw, PATH_SEGMENT).to_string()
}

#[derive(Serialize)]
struct TempLinkRequest {
    minutes: u32,
}

#[derive(Deserialize)]
struct TempLinkResponse {
    link: String,
}

pub struct NotesApi {
    dispatcher: Arc<dyn Dispatcher>,
    base_url: String,
}

impl NotesApi {
    /// `base_url` is only used to make temporary links absolute
    pub fn new(dispatcher: Arc<dyn Dispatcher>, base_url: impl Into<String>) -> Self {
        Self {
            dispatcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// One page of notes matching `filter`.
    ///
    /// The returned page carries the history location for the filter, without the page number.
    #[instrument(skip(self))]
    pub async fn find_notes(&self, filter: &NoteSearchFilter, page: u32) -> Result<NotesPage> {
        let request = ApiRequest::get(format!("{}/", NOTES_PATH))
            .with_query(filter.params())
            .with_query([("page", page.to_string())]);

        let mut found: NotesPage = self.dispatcher.dispatch(request).await?.json()?;
        found.location = filter.location()?;
        debug!(
            "Found {} notes, page {}/{}",
            found.total_records, found.paginator.current_page, found.paginator.max_pages
        );
        Ok(found)
    }

    pub async fn get_note(&self, id: &str) -> Result<DetailNote> {
        let request = ApiRequest::get(format!("{}/{}", NOTES_PATH, segment(id)));
        let mut note: DetailNote = self.dispatcher.dispatch(request).await?.json()?;
        note.id = id.to_string();
        Ok(note)
    }

    pub async fn note_files(&self, id: &str) -> Result<Vec<NoteFile>> {
        let request = ApiRequest::get(format!("{}/{}/files", NOTES_PATH, segment(id)));
        self.dispatcher.dispatch(request).await?.json()
    }

    /// Create a note, then attach `files` to it
    #[instrument(skip_all, fields(title = %note.title))]
    pub async fn create_note(&self, note: &Note, files: Vec<UploadFile>) -> Result<DetailNote> {
        let request = ApiRequest::post(format!("{}/", NOTES_PATH)).with_json(note)?;
        let created: DetailNote = self.dispatcher.dispatch(request).await?.json()?;

        self.upload_files(&created.id, files).await?;
        Ok(created)
    }

    /// Save a note, drop the files disabled while editing and attach new ones.
    ///
    /// Failing to delete an old file is logged and does not fail the update.
    #[instrument(skip_all, fields(id = %note.id))]
    pub async fn update_note(&self, note: &Note, files: Vec<UploadFile>) -> Result<()> {
        let request =
            ApiRequest::put(format!("{}/{}", NOTES_PATH, segment(&note.id))).with_json(note)?;
        self.dispatcher.dispatch(request).await?;

        for file in note.disabled_files() {
            if let Err(e) = self.delete_file(&note.id, &file.name).await {
                warn!("Failed to delete file {}: {}", file.name, e);
            }
        }

        self.upload_files(&note.id, files).await
    }

    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let request = ApiRequest::delete(format!("{}/{}", NOTES_PATH, segment(id)));
        self.dispatcher.dispatch(request).await?;
        Ok(())
    }

    /// Multipart upload; the server answers 201 when the files were stored
    pub async fn upload_files(&self, id: &str, files: Vec<UploadFile>) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        let count = files.len();
        let request = ApiRequest::post(format!("{}/{}/files", NOTES_PATH, segment(id)))
            .with_multipart(files);
        let response = self.dispatcher.dispatch(request).await?;

        if response.status != 201 {
            warn!(
                "Upload of {} files to note {} answered {}: {}",
                count,
                id,
                response.status,
                response.text()
            );
        } else {
            debug!("Uploaded {} files to note {}", count, id);
        }
        Ok(())
    }

    pub async fn delete_file(&self, id: &str, name: &str) -> Result<()> {
        let request = ApiRequest::delete(format!(
            "{}/{}/files/{}",
            NOTES_PATH,
            segment(id),
            segment(name)
        ));
        self.dispatcher.dispatch(request).await?;
        Ok(())
    }

    /// Tags the user may attach to notes
    pub async fn available_tags(&self) -> Result<Vec<String>> {
        let request = ApiRequest::get(format!("{}/tags", NOTES_PATH));
        self.dispatcher.dispatch(request).await?.json()
    }

    /// Title suggestions for a partial search term
    pub async fn autocomplete(&self, term: &str) -> Result<Vec<String>> {
        let request =
            ApiRequest::get(format!("{}/autocomplete", NOTES_PATH)).with_query([("term", term)]);
        self.dispatcher.dispatch(request).await?.json()
    }

    pub async fn permissions(&self) -> Result<UserPermissions> {
        let request = ApiRequest::get(format!("{}/permissions", NOTES_PATH));
        self.dispatcher.dispatch(request).await?.json()
    }

    /// Shareable link to a note that expires after `minutes`
    pub async fn temp_link(&self, id: &str, minutes: u32) -> Result<String> {
        let request = ApiRequest::post(format!("{}/temp/{}", NOTES_PATH, segment(id)))
            .with_json(&TempLinkRequest { minutes })?;
        let response: TempLinkResponse = self.dispatcher.dispatch(request).await?.json()?;
        Ok(format!("{}{}", self.base_url, response.link))
    }

    /// Saved drafts; any failure yields an empty list
    pub async fn list_drafts(&self) -> Vec<NoteDraft> {
        let request = ApiRequest::get(format!("{}/", DRAFTS_PATH));
        match self.dispatcher.dispatch(request).await.and_then(|r| r.json()) {
            Ok(drafts) => drafts,
            Err(e) => {
                warn!("Failed to load drafts: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn get_draft(&self, id: &str) -> Option<NoteDraft> {
        let request = ApiRequest::get(format!("{}/{}/", DRAFTS_PATH, segment(id)));
        match self.dispatcher.dispatch(request).await.and_then(|r| r.json()) {
            Ok(draft) => Some(draft),
            Err(e) => {
                debug!("Draft {} unavailable: {}", id, e);
                None
            }
        }
    }

    /// Save `note` as a new draft under a fresh id
    pub async fn create_draft(&self, note: &Note) -> Result<NoteDraft> {
        let id = uuid::Uuid::new_v4().to_string();
        self.save_draft(&id, note).await
    }

    pub async fn save_draft(&self, id: &str, note: &Note) -> Result<NoteDraft> {
        let request =
            ApiRequest::post(format!("{}/", DRAFTS_PATH)).with_json(&NoteDraft::from_note(id, note))?;
        self.dispatcher.dispatch(request).await?.json()
    }

    pub async fn delete_draft(&self, id: &str) -> Result<()> {
        let request = ApiRequest::delete(format!("{}/{}/", DRAFTS_PATH, segment(id)));
        self.dispatcher.dispatch(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::pipeline::testing::ScriptedTransport;
    use crate::request::{ApiResponse, RequestBody};
    use crate::ClientError;
    use reqwest::Method;

    fn api(replies: Vec<ApiResponse>) -> (NotesApi, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let pipeline = Pipeline::new(transport.clone());
        (
            NotesApi::new(Arc::new(pipeline), "https://notes.example.com/"),
            transport,
        )
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_find_notes_query_and_location() {
        let (api, transport) = api(vec![ApiResponse::new(
            200,
            r#"{
                "records": [{"id": "n1", "title": "Router", "tags": ["net"], "filesCount": 2, "score": 0.5}],
                "totalRecords": 1,
                "paginator": {"currentPage": 2, "maxPages": 3, "perPage": 24}
            }"#,
        )]);

        let filter = NoteSearchFilter::new("router").with_tags(["net", "cisco"]);
        let page = api.find_notes(&filter, 2).await.unwrap();

        assert_eq!(page.notes.len(), 1);
        assert_eq!(page.notes[0].files_count, 2);
        assert_eq!(page.total_records, 1);
        assert_eq!(page.paginator.current_page, 2);
        assert_eq!(page.location, "/?search=router&tags-in=net&tags-in=cisco");

        let sent = transport.sent();
        assert_eq!(sent[0].path, "/api/notes/");
        assert_eq!(
            sent[0].query,
            query(&[
                ("search", "router"),
                ("tags-in", "net"),
                ("tags-in", "cisco"),
                ("page", "2")
            ])
        );
    }

    #[tokio::test]
    async fn test_get_note_keeps_requested_id() {
        let (api, _) = api(vec![ApiResponse::new(
            200,
            r#"{"title": "T", "content": "C", "tags": ["a"], "files": [{"name": "x.pdf", "size": 10, "type": "application/pdf"}]}"#,
        )]);

        let note = api.get_note("n42").await.unwrap();
        assert_eq!(note.id, "n42");
        assert_eq!(note.files[0].content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_ids_and_file_names_are_escaped_in_paths() {
        let (api, transport) = api(vec![
            ApiResponse::new(204, ""),
            ApiResponse::new(204, ""),
            ApiResponse::new(200, r#"{"link": "/t/x"}"#),
        ]);

        api.delete_file("n1", "report#1 v2?.pdf").await.unwrap();
        api.delete_note("a/b").await.unwrap();
        api.temp_link("100%", 5).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].path, "/api/notes/n1/files/report%231%20v2%3F.pdf");
        assert_eq!(sent[1].path, "/api/notes/a%2Fb");
        assert_eq!(sent[2].path, "/api/notes/temp/100%25");
    }

    #[tokio::test]
    async fn test_update_note_deletes_disabled_and_uploads() {
        let (api, transport) = api(vec![
            ApiResponse::new(200, "{}"),
            ApiResponse::new(500, "cannot delete"),
            ApiResponse::new(201, "[]"),
        ]);

        let mut old = NoteFile::new("old.txt", 3, "text/plain");
        old.disable = true;
        let note = Note {
            id: "n1".to_string(),
            title: "T".to_string(),
            content: "C".to_string(),
            tags: vec!["a".to_string()],
            files: vec![old, NoteFile::new("keep.txt", 1, "text/plain")],
        };
        let upload = UploadFile::new(FILES_FIELD, "new.txt", "text/plain", b"new".to_vec());

        api.update_note(&note, vec![upload.clone()]).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].method, Method::PUT);
        assert_eq!(sent[0].path, "/api/notes/n1");
        assert_eq!(sent[1].method, Method::DELETE);
        assert_eq!(sent[1].path, "/api/notes/n1/files/old.txt");
        assert_eq!(sent[2].path, "/api/notes/n1/files");
        assert_eq!(sent[2].body, Some(RequestBody::Multipart(vec![upload])));
    }

    #[tokio::test]
    async fn test_create_note_without_files_skips_upload() {
        let (api, transport) = api(vec![ApiResponse::new(201, r#"{"id": "n9", "title": "T"}"#)]);

        let created = api.create_note(&Note::default(), Vec::new()).await.unwrap();
        assert_eq!(created.id, "n9");
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_create_note_validation_error() {
        let (api, _) = api(vec![ApiResponse::new(
            400,
            r#"{"title": ["This field may not be blank."]}"#,
        )]);

        let err = api.create_note(&Note::default(), Vec::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation { status: 400, .. }));
        assert_eq!(err.verbose_message(), "title: This field may not be blank.");
    }

    #[tokio::test]
    async fn test_temp_link_is_absolute() {
        let (api, transport) = api(vec![ApiResponse::new(200, r#"{"link": "/notes/temp/abc"}"#)]);

        let link = api.temp_link("n1", 15).await.unwrap();
        assert_eq!(link, "https://notes.example.com/notes/temp/abc");
        assert_eq!(
            transport.sent()[0].body,
            Some(RequestBody::Json(serde_json::json!({"minutes": 15})))
        );
    }

    #[tokio::test]
    async fn test_tags_autocomplete_permissions() {
        let (api, transport) = api(vec![
            ApiResponse::new(200, r#"["net", "linux"]"#),
            ApiResponse::new(200, r#"["Router setup"]"#),
            ApiResponse::new(200, r#"["create_notes", "delete_notes"]"#),
        ]);

        assert_eq!(api.available_tags().await.unwrap(), vec!["net", "linux"]);
        assert_eq!(api.autocomplete("rou").await.unwrap(), vec!["Router setup"]);
        let perms = api.permissions().await.unwrap();
        assert!(perms.can_create_notes());
        assert!(!perms.can_update_notes());
        assert!(perms.can_delete_notes());

        let sent = transport.sent();
        assert_eq!(sent[1].path, "/api/notes/autocomplete");
        assert_eq!(sent[1].query, query(&[("term", "rou")]));
    }

    #[tokio::test]
    async fn test_drafts_degrade_on_failure() {
        let (api, _) = api(vec![
            ApiResponse::new(500, "down"),
            ApiResponse::new(404, r#"{"detail": "Not found."}"#),
        ]);

        assert!(api.list_drafts().await.is_empty());
        assert_eq!(api.get_draft("d1").await, None);
    }

    #[tokio::test]
    async fn test_create_draft_uses_fresh_id() {
        let (api, transport) = api(vec![ApiResponse::new(
            200,
            r#"{"id": "echo", "title": "T", "content": "", "tags": []}"#,
        )]);
        let note = Note {
            title: "T".to_string(),
            ..Note::default()
        };

        api.create_draft(&note).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].path, "/api/drafts/");
        let Some(RequestBody::Json(body)) = &sent[0].body else {
            panic!("expected json body");
        };
        let id = body["id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(body["title"], "T");
        assert!(body.get("preview").is_none());
    }
}
