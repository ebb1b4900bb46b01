//! End-to-end tests for the HTTP routes, driven through the axum router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use portfolio::config::SiteConfig;
use portfolio::context::ContextDocument;
use portfolio::provider::stub::{StubProvider, StubScript};
use portfolio::provider::SharedProvider;
use portfolio::render::Templates;
use portfolio::server::chat::MISSING_CREDENTIAL;
use portfolio::server::{router, AppState};
use portfolio::store::{SqliteStore, CONTACTS_COLLECTION, RESUME_COLLECTION};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn state(provider: Option<SharedProvider>, store: SqliteStore) -> AppState {
    AppState {
        site: SiteConfig {
            owner: "Ada".into(),
            title: None,
        },
        context: ContextDocument::from_text("Ada writes compilers in Rust."),
        provider,
        templates: Templates::builtin().unwrap(),
        store,
        static_dir: "static".into(),
    }
}

fn stub(script: StubScript) -> Option<SharedProvider> {
    Some(Arc::new(StubProvider::new(script)))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, String, String) {
    let resp = ServiceExt::<Request<Body>>::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

fn records(body: &str) -> Vec<Value> {
    assert!(body.ends_with('\n'), "stream must end with a newline");
    body.lines()
        .map(|l| serde_json::from_str(l).expect("every line is JSON"))
        .collect()
}

fn assert_single_terminal_last(recs: &[Value]) {
    let terminal = recs
        .iter()
        .filter(|r| r.get("done").is_some() || r.get("error").is_some())
        .count();
    assert_eq!(terminal, 1, "exactly one terminal record: {recs:?}");
    let last = recs.last().unwrap();
    assert!(last.get("done").is_some() || last.get("error").is_some());
}

async fn ask(provider: Option<SharedProvider>, question: &str) -> (StatusCode, String, String) {
    let app = router(state(provider, SqliteStore::open_in_memory().unwrap()));
    send(app, post_json("/ask-stream", json!({ "question": question }))).await
}

#[tokio::test]
async fn answer_streams_as_ndjson() {
    let (status, ct, body) = ask(
        stub(StubScript {
            pieces: vec!["Ada ".into(), "".into(), "writes compilers.".into()],
            ..StubScript::default()
        }),
        "What are Ada's main skills?",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "application/x-ndjson");
    let recs = records(&body);
    assert_eq!(
        recs,
        vec![
            json!({"chunk": ""}),
            json!({"chunk": "Ada "}),
            json!({"chunk": "writes compilers."}),
            json!({"done": true}),
        ]
    );
    assert_single_terminal_last(&recs);
}

#[tokio::test]
async fn failure_mid_stream_is_reported_in_band() {
    let (status, _, body) = ask(
        stub(StubScript {
            pieces: vec!["A".into(), "B".into(), "C".into()],
            fail_after: Some(2),
            error: Some("quota exhausted".into()),
            ..StubScript::default()
        }),
        "hi",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        records(&body),
        vec![
            json!({"chunk": ""}),
            json!({"chunk": "A"}),
            json!({"chunk": "B"}),
            json!({"error": "quota exhausted"}),
        ]
    );
}

#[tokio::test]
async fn failure_before_first_piece_is_still_primed() {
    let (_, _, body) = ask(
        stub(StubScript {
            pieces: vec!["never".into()],
            fail_after: Some(0),
            ..StubScript::default()
        }),
        "hi",
    )
    .await;
    let recs = records(&body);
    assert_eq!(recs[0], json!({"chunk": ""}));
    assert_eq!(recs.len(), 2);
    assert_single_terminal_last(&recs);
}

#[tokio::test]
async fn missing_credential_is_one_error_record() {
    let (status, ct, body) = ask(None, "hi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ct, "application/x-ndjson");
    assert_eq!(records(&body), vec![json!({ "error": MISSING_CREDENTIAL })]);
}

#[tokio::test]
async fn question_is_trimmed_before_prompting() {
    // With no script the stub echoes the question it received.
    let (_, _, body) = ask(stub(StubScript::default()), "   what do you build?\n").await;
    let recs = records(&body);
    assert_eq!(recs[1], json!({"chunk": "what do you build?"}));
}

#[tokio::test]
async fn invalid_questions_are_rejected_before_streaming() {
    let long = "x".repeat(2001);
    for question in ["", "    ", long.as_str()] {
        let (status, ct, body) = ask(stub(StubScript::default()), question).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{question:?}");
        assert!(ct.starts_with("application/json"));
        let v: Value = serde_json::from_str(&body).unwrap();
        assert!(v["detail"].as_str().unwrap().starts_with("question"));
    }

    let app = router(state(
        stub(StubScript::default()),
        SqliteStore::open_in_memory().unwrap(),
    ));
    let (status, _, _) = send(app, post_json("/ask-stream", json!({ "q": "hi" }))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn repeated_questions_are_independent() {
    let app = router(state(
        stub(StubScript {
            pieces: vec!["same".into()],
            ..StubScript::default()
        }),
        SqliteStore::open_in_memory().unwrap(),
    ));
    let (_, _, first) =
        send(app.clone(), post_json("/ask-stream", json!({"question": "q"}))).await;
    let (_, _, second) = send(app, post_json("/ask-stream", json!({"question": "q"}))).await;
    assert_eq!(first, second);
    assert_eq!(records(&first).len(), 3);
}

#[tokio::test]
async fn landing_page_renders() {
    let app = router(state(None, SqliteStore::open_in_memory().unwrap()));
    let (status, ct, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ct.starts_with("text/html"));
    assert!(body.contains("<title>Ada Portfolio</title>"));
}

#[tokio::test]
async fn resume_is_404_until_seeded() {
    let store = SqliteStore::open_in_memory().unwrap();
    let app = router(state(None, store.clone()));

    let (status, _, body) = send(app.clone(), get("/resume")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"detail": "Resume not found"})
    );

    store
        .replace_all(
            RESUME_COLLECTION,
            &json!({
                "name": "Ada Lovelace",
                "title": "Engineer",
                "summary": "Writes compilers.",
                "skills": ["Rust", "Parsing"],
                "experience": [{"company": "Analytical", "role": "Lead", "duration": "2y",
                                "highlights": ["Shipped the engine"]}],
                "education": [{"institution": "Uni", "degree": "BSc", "year": "2020"}],
                "projects": [{"title": "Notes", "description": "Annotated", "link": "https://example.com"}]
            }),
        )
        .await
        .unwrap();

    let (status, ct, body) = send(app, get("/resume")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(ct.starts_with("text/html"));
    assert!(body.contains("<title>Resume | Ada</title>"));
    assert!(body.contains("<h1>Ada Lovelace</h1>"));
    assert!(body.contains("<li>Parsing</li>"));
    assert!(body.contains("Shipped the engine"));
    assert!(body.contains("href=\"https://example.com\""));
}

#[tokio::test]
async fn malformed_resume_is_a_server_error() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.replace_all(RESUME_COLLECTION, &json!({"name": 3})).await.unwrap();
    let app = router(state(None, store));
    let (status, _, body) = send(app, get("/resume")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("malformed"));
}

#[tokio::test]
async fn contact_is_stored_with_receipt() {
    let store = SqliteStore::open_in_memory().unwrap();
    let app = router(state(None, store.clone()));

    let (status, _, body) = send(
        app,
        post_json(
            "/contact",
            json!({"name": "Grace", "email": "grace@example.com", "message": "Hello there, Ada!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["message"], "Contact information received.");
    assert_eq!(v["id"].as_str().unwrap().len(), 32);

    let stored = store.find_one(CONTACTS_COLLECTION).await.unwrap().unwrap();
    assert_eq!(stored["email"], "grace@example.com");
    assert!(stored["created_at"].is_string());
}

#[tokio::test]
async fn overlong_contact_message_is_an_inline_error() {
    let store = SqliteStore::open_in_memory().unwrap();
    let app = router(state(None, store.clone()));

    let (status, _, body) = send(
        app,
        post_json(
            "/contact",
            json!({"name": "Grace", "email": "grace@example.com", "message": "m".repeat(501)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"error": "Message too long. Max 500 characters."})
    );
    assert_eq!(store.count(CONTACTS_COLLECTION).await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_contact_fields_are_422() {
    let app = router(state(None, SqliteStore::open_in_memory().unwrap()));
    let (status, _, body) = send(
        app,
        post_json(
            "/contact",
            json!({"name": "G", "email": "grace@example.com", "message": "Hello there"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("name"));
}
