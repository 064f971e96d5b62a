//! Integration tests for login and the notes endpoints using wiremock

use std::sync::Arc;
use taged_client::notes::FILES_FIELD;
use taged_client::{ClientConfig, ClientError, LogRedirect, TagedClient, UploadFile};
use taged_core::{Note, NoteSearchFilter};
use taged_storage::MemoryStore;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, header_exists, method, path, query_param},
};

async fn client(server: &MockServer) -> TagedClient {
    TagedClient::connect(
        &ClientConfig::new(server.uri()),
        Arc::new(MemoryStore::new()),
        Arc::new(LogRedirect),
    )
    .await
    .unwrap()
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/token/"))
        .and(body_json(serde_json::json!({"username": "anna", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access": "acc",
            "refresh": "ref"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/myself/"))
        .and(header("authorization", "Bearer acc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 3,
            "username": "anna",
            "is_superuser": false,
            "is_staff": true,
            "first_name": "Anna",
            "last_name": "K"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_search() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/notes/"))
        .and(header("authorization", "Bearer acc"))
        .and(query_param("search", "vlan config"))
        .and(query_param("tags-in", "net"))
        .and(query_param("tags-in", "cisco"))
        .and(query_param("use-vectorizer", "true"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{
                "id": "n1",
                "title": "VLAN",
                "tags": ["net"],
                "filesCount": 1,
                "published_at": "2024-01-02",
                "preview_image": "/media/a_thumb_small.png",
                "score": 0.876
            }],
            "totalRecords": 49,
            "paginator": {"currentPage": 3, "maxPages": 3, "perPage": 24}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let user = client.auth().login("anna", "secret").await.unwrap().unwrap();
    assert_eq!(user.display_name(), "Anna K");

    let mut filter = NoteSearchFilter::new("vlan config").with_tags(["net", "cisco"]);
    filter.toggle_vector_search();
    let page = client.notes().find_notes(&filter, 3).await.unwrap();

    assert_eq!(page.total_records, 49);
    assert_eq!(page.notes[0].score_percents(), 88);
    assert_eq!(page.notes[0].preview_image, "/media/a_thumb_small.png");
    assert_eq!(
        page.location,
        "/?search=vlan+config&tags-in=net&tags-in=cisco&use-vectorizer=true"
    );
}

#[tokio::test]
async fn test_create_note_uploads_files() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/notes/"))
        .and(body_json(serde_json::json!({
            "id": "",
            "title": "Backup",
            "content": "<p>rsync</p>",
            "tags": ["linux"],
            "files": []
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "n7",
            "title": "Backup"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/notes/n7/files"))
        .and(header_exists("content-type"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;
    let note = Note {
        title: "Backup".to_string(),
        content: "<p>rsync</p>".to_string(),
        tags: vec!["linux".to_string()],
        ..Note::default()
    };
    assert!(note.is_valid());

    let file = UploadFile::new(FILES_FIELD, "backup.sh", "text/x-sh", b"rsync -a".to_vec());
    let created = client.notes().create_note(&note, vec![file]).await.unwrap();
    assert_eq!(created.id, "n7");

    let requests = server.received_requests().await.unwrap();
    let upload = requests
        .iter()
        .find(|r| r.url.path() == "/api/notes/n7/files")
        .unwrap();
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&upload.body);
    assert!(body.contains(r#"name="files"; filename="backup.sh""#));
    assert!(body.contains("rsync -a"));
}

#[tokio::test]
async fn test_validation_errors_are_reported_per_field() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/notes/n1"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "tags": ["Tag \"secret\" is not available"],
            "title": ["Ensure this field has no more than 128 characters."]
        })))
        .mount(&server)
        .await;

    let client = client(&server).await;
    let note = Note {
        id: "n1".to_string(),
        ..Note::default()
    };

    let err = client.notes().update_note(&note, Vec::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { status: 400, .. }));
    assert_eq!(
        err.verbose_message(),
        "tags: Tag \"secret\" is not available\ntitle: Ensure this field has no more than 128 characters."
    );
}

#[tokio::test]
async fn test_drafts_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/drafts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "d1", "title": "Draft", "content": "", "tags": [], "preview": "/media/p.png"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/drafts/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/drafts/d1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server).await;

    let drafts = client.notes().list_drafts().await;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].preview.as_deref(), Some("/media/p.png"));

    assert_eq!(client.notes().get_draft("missing").await, None);
    client.notes().delete_draft("d1").await.unwrap();
}

#[tokio::test]
async fn test_temp_link_uses_server_origin() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/notes/temp/n1"))
        .and(body_json(serde_json::json!({"minutes": 30})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"link": "/t/abc123"})),
        )
        .mount(&server)
        .await;

    let client = client(&server).await;
    let link = client.notes().temp_link("n1", 30).await.unwrap();
    assert_eq!(link, format!("{}/t/abc123", server.uri()));
}
