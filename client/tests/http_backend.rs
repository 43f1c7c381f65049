use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use prodshot_client::{
    AspectRatio, Backend, Client, DeviceId, GenerationRequest, HttpBackend, Phase, PollConfig, SourceFile,
    SubmitOutcome, Tier,
};
use serde_json::{json, Value};

const DEVICE: &str = "dev-1";
const TOKEN: &str = "tok-123";

#[derive(Debug, Clone)]
struct Call {
    path: String,
    device_id: Option<String>,
    authorization: Option<String>,
    query: HashMap<String, String>,
    body: Value,
}

/// Records every request the fake backend sees.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Call>>>);

impl Recorder {
    fn record(&self, path: &str, headers: &HeaderMap, query: HashMap<String, String>, body: Value) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        self.0.lock().push(Call {
            path: path.to_string(),
            device_id: header("x-device-id"),
            authorization: header("authorization"),
            query,
            body,
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }
}

async fn upload(State(rec): State<Recorder>, headers: HeaderMap, mut multipart: Multipart) -> Json<Value> {
    let mut parts = Vec::new();
    let mut stored = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let len = field.bytes().await.unwrap().len();
        stored = file_name.clone();
        parts.push(json!({
            "name": name,
            "file_name": file_name,
            "content_type": content_type,
            "len": len,
        }));
    }
    rec.record("/api/upload", &headers, HashMap::new(), Value::Array(parts));
    Json(json!({ "image_url": format!("/storage/{}", stored) }))
}

async fn generate_free(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.record("/api/generate-free", &headers, HashMap::new(), body.clone());
    if body["prompt"] == "over quota" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "detail": "Free generation limit reached (3 per month). Please sign up and purchase credits for unlimited generations."
            })),
        );
    }
    (
        StatusCode::ACCEPTED,
        Json(json!({ "generation_id": "g1", "status": "processing" })),
    )
}

async fn generate_paid(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    rec.record("/api/generate-paid", &headers, HashMap::new(), body);
    let bearer = format!("Bearer {}", TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(bearer.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "generation_id": "g2",
            "status": "completed",
            "output_image_url": "/storage/paid.jpg",
        })),
    )
}

async fn generation(
    State(rec): State<Recorder>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.record(&format!("/api/generations/{}", id), &headers, query, Value::Null);
    Json(json!({ "id": id, "status": "completed", "output_image_url": "/storage/out.jpg" }))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "hunter22" {
        (
            StatusCode::OK,
            Json(json!({ "access_token": TOKEN, "token_type": "bearer" })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
    }
}

async fn packs() -> Json<Value> {
    Json(json!({
        "packs": [
            { "id": "starter", "name": "Starter", "credits": 5, "price_per_credit": 0.99, "total_price": 4.95 },
            { "id": "pro", "name": "Pro", "credits": 40, "price_per_credit": 0.79, "total_price": 31.6 },
        ]
    }))
}

async fn spawn_backend() -> (String, Recorder) {
    let rec = Recorder::default();
    let app = Router::new()
        .route("/api/upload", post(upload))
        .route("/api/generate-free", post(generate_free))
        .route("/api/generate-paid", post(generate_paid))
        .route("/api/generations/{id}", get(generation))
        .route("/api/auth/login", post(login))
        .route("/api/credits/packs", get(packs))
        .with_state(rec.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), rec)
}

fn client(base_url: &str, token: &str) -> Client {
    Client::builder(base_url)
        .auth_token(token)
        .device_id(DeviceId::new(DEVICE))
        .poll_config(PollConfig {
            interval: Duration::from_millis(20),
            max_duration: Some(Duration::from_secs(5)),
        })
        .build()
        .unwrap()
}

fn backend(client: &Client) -> HttpBackend {
    HttpBackend::new(client.http().clone())
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(
        prompt,
        Some("/storage/shoe.jpg"),
        AspectRatio::Portrait,
        DeviceId::new(DEVICE),
    )
    .unwrap()
}

#[tokio::test]
async fn test_upload_sends_file_part() {
    let (url, rec) = spawn_backend().await;
    let backend = backend(&client(&url, ""));

    let image = backend
        .upload(&SourceFile::from_bytes("shoe.jpg", vec![0xFF, 0xD8, 0xFF]))
        .await
        .unwrap();
    assert_eq!(image, "/storage/shoe.jpg");

    let calls = rec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].device_id.as_deref(), Some(DEVICE));
    let part = &calls[0].body[0];
    assert_eq!(part["name"], "file");
    assert_eq!(part["file_name"], "shoe.jpg");
    assert_eq!(part["content_type"], "image/jpeg");
    assert_eq!(part["len"], 3);
}

#[tokio::test]
async fn test_free_generation_wire_format() {
    let (url, rec) = spawn_backend().await;
    let backend = backend(&client(&url, ""));

    let outcome = backend.generate(Tier::Free, &request("on marble")).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Processing { job_id: "g1".into() });

    let call = &rec.calls()[0];
    assert_eq!(call.path, "/api/generate-free");
    assert_eq!(call.device_id.as_deref(), Some(DEVICE));
    assert_eq!(call.authorization, None);
    assert_eq!(call.body["prompt"], "on marble");
    assert_eq!(call.body["image_url"], "/storage/shoe.jpg");
    assert_eq!(call.body["aspect_ratio"], "4:5");
    assert_eq!(call.body["resolution"], "8k");
    assert_eq!(call.body["device_id"], DEVICE);
}

#[tokio::test]
async fn test_paid_generation_sends_bearer() {
    let (url, rec) = spawn_backend().await;

    let outcome = backend(&client(&url, TOKEN))
        .generate(Tier::Paid, &request("studio light"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Completed { output_url: "/storage/paid.jpg".into() }
    );
    let call = &rec.calls()[0];
    assert_eq!(call.path, "/api/generate-paid");
    assert_eq!(call.authorization.as_deref(), Some("Bearer tok-123"));

    let err = backend(&client(&url, "wrong"))
        .generate(Tier::Paid, &request("studio light"))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_status_query_carries_device_id() {
    let (url, rec) = spawn_backend().await;
    let backend = backend(&client(&url, ""));

    let job = backend
        .generation_status("g1", Some(&DeviceId::new(DEVICE)))
        .await
        .unwrap();
    assert_eq!(job.id, "g1");
    assert_eq!(job.output_image_url.as_deref(), Some("/storage/out.jpg"));
    backend.generation_status("g1", None).await.unwrap();

    let calls = rec.calls();
    assert_eq!(calls[0].path, "/api/generations/g1");
    assert_eq!(calls[0].query.get("device_id").map(String::as_str), Some(DEVICE));
    assert!(calls[1].query.is_empty());
}

#[tokio::test]
async fn test_quota_error_is_classified() {
    let (url, _rec) = spawn_backend().await;

    let err = backend(&client(&url, ""))
        .generate(Tier::Free, &request("over quota"))
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
    assert!(err.user_message().starts_with("Free generation limit reached"));
}

#[tokio::test]
async fn test_session_over_http() {
    let (url, rec) = spawn_backend().await;
    let client = client(&url, "");
    let session = client.session();
    let mut view = session.subscribe();

    session.select_file(SourceFile::from_bytes("shoe.jpg", vec![0xFF, 0xD8, 0xFF]));
    tokio::time::timeout(Duration::from_secs(5), view.wait_for(|v| v.phase == Phase::Uploaded))
        .await
        .unwrap()
        .unwrap();

    session.submit("on marble", AspectRatio::Square).await.unwrap();
    let done = tokio::time::timeout(Duration::from_secs(5), view.wait_for(|v| v.phase.is_terminal()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert_eq!(done.phase, Phase::Completed);
    assert_eq!(done.result_url.as_deref(), Some("/images/generated/out.jpg"));

    let paths: Vec<String> = rec.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(
        paths,
        vec!["/api/upload", "/api/generate-free", "/api/generations/g1"]
    );
}

#[tokio::test]
async fn test_login_and_credit_packs() {
    let (url, _rec) = spawn_backend().await;
    let client = client(&url, "");

    let token = client.auth().login("me@shop.example", "hunter22").await.unwrap();
    assert_eq!(token.access_token, TOKEN);

    let err = client.auth().login("me@shop.example", "nope").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Incorrect email or password");

    let packs = client.credits().packs().await.unwrap();
    assert_eq!(packs.len(), 2);
    assert_eq!(packs[0].id, "starter");
    assert_eq!(packs[1].credits, 40);
}
