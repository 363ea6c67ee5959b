use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use household_api::{
    api::{create_router, AppState},
    db::{InMemoryMetadataCache, MemoryStore},
    error::AppResult,
    models::{
        FamilyMemberProfile, LibraryBook, MetadataQuery, MetadataSourceKind, PantryItem,
        ReadingStatus, SourceCandidate,
    },
    services::{
        metadata::MetadataSource,
        providers::{LlmProvider, ProviderError, ProviderKind, SendOptions},
        MetadataMerger, ProviderRegistry,
    },
};

/// Provider that answers every prompt with a fixed reply and records what it was sent
struct ScriptedProvider {
    kind: ProviderKind,
    available: bool,
    reply: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn replying(kind: ProviderKind, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: true,
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(kind: ProviderKind, error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: true,
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn unconfigured(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            available: false,
            reply: Err(ProviderError::NotConfigured),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn send(&self, prompt: &str, _options: SendOptions) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> String {
        format!("{}-test", self.kind)
    }
}

struct FixedSource {
    kind: MetadataSourceKind,
    candidate: Option<SourceCandidate>,
}

#[async_trait::async_trait]
impl MetadataSource for FixedSource {
    fn kind(&self) -> MetadataSourceKind {
        self.kind
    }

    async fn lookup(&self, _query: &MetadataQuery) -> AppResult<Option<SourceCandidate>> {
        Ok(self.candidate.clone())
    }
}

struct Harness {
    server: TestServer,
    store: Arc<MemoryStore>,
    user: Uuid,
}

fn build_harness(
    providers: Vec<Arc<dyn LlmProvider>>,
    sources: Vec<Arc<dyn MetadataSource>>,
) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let registry = providers
        .into_iter()
        .fold(ProviderRegistry::new(), |registry, provider| registry.with_provider(provider));
    let metadata = MetadataMerger::new(
        sources,
        Arc::new(InMemoryMetadataCache::new(16, Duration::from_secs(60))),
        Duration::from_secs(1),
    );

    let state = AppState::new(store.clone(), store.clone(), registry, metadata);
    let server = TestServer::new(create_router(state)).unwrap();

    Harness {
        server,
        store,
        user: Uuid::new_v4(),
    }
}

fn user_header(user: Uuid) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user.to_string()).unwrap(),
    )
}

fn library_book(title: &str, author: &str, genre: &str, status: ReadingStatus) -> LibraryBook {
    LibraryBook {
        id: Uuid::new_v4(),
        title: title.to_string(),
        author: author.to_string(),
        genre: Some(genre.to_string()),
        reading_status: status,
        is_favorite: false,
        date_read: None,
    }
}

const MEAL_REPLY: &str = r#"Here you go!
{"recommendations": [
  {"name": "Mushroom Risotto", "description": "Creamy rice", "prep_time": 40,
   "difficulty": "Medium", "servings": 4,
   "ingredients_needed": [{"name": "Rice", "quantity": 2, "unit": "cup", "have_in_pantry": true}],
   "instructions": ["Toast rice", "Add stock"], "tags": ["comfort"]},
  {"name": "Plain Rice", "description": "Steamed", "prep_time": 20, "difficulty": "Easy"}
]}"#;

#[tokio::test]
async fn test_health_check() {
    let harness = build_harness(Vec::new(), Vec::new());
    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_rejected() {
    let harness = build_harness(Vec::new(), Vec::new());
    let response = harness.server.get("/api/v1/providers").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let harness = build_harness(Vec::new(), Vec::new());
    let id = Uuid::new_v4().to_string();

    let response = harness
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_str(&id).unwrap(),
        )
        .await;

    assert_eq!(response.header("x-request-id").to_str().unwrap(), id);
}

#[tokio::test]
async fn test_providers_report_availability() {
    let harness = build_harness(
        vec![
            ScriptedProvider::replying(ProviderKind::Claude, "{}"),
            ScriptedProvider::unconfigured(ProviderKind::Gemini),
        ],
        Vec::new(),
    );
    let (name, value) = user_header(harness.user);

    let response = harness.server.get("/api/v1/providers").add_header(name, value).await;
    response.assert_status_ok();

    let statuses: Vec<Value> = response.json();
    let available: Vec<(String, bool)> = statuses
        .iter()
        .map(|s| (s["provider"].as_str().unwrap().to_string(), s["available"].as_bool().unwrap()))
        .collect();
    assert!(available.contains(&("claude".to_string(), true)));
    assert!(available.contains(&("gemini".to_string(), false)));
}

#[tokio::test]
async fn test_meal_recommendations_flow() {
    let provider = ScriptedProvider::replying(ProviderKind::Claude, MEAL_REPLY);
    let harness = build_harness(vec![provider.clone()], Vec::new());

    let mut alice = FamilyMemberProfile::new("Alice");
    alice.age = Some(34);
    alice.preferences.dislikes = vec!["mushrooms".to_string()];
    harness.store.set_family(harness.user, vec![alice]).await;
    harness
        .store
        .set_pantry(harness.user, vec![PantryItem::new("Rice", "Grain", 2.0, "cup")])
        .await;

    let (name, value) = user_header(harness.user);
    let response = harness
        .server
        .post("/api/v1/meals/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "claude", "count": 3, "meal_type": "dinner"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    // The incomplete item is dropped and the disliked ingredient passes through
    assert_eq!(body["total_recommendations"], 1);
    assert_eq!(body["provider"], "claude");
    assert_eq!(
        body["summary"],
        "Planned for Alice. Draws on the 1 item in your pantry."
    );
    let meal = &body["recommendations"][0];
    assert_eq!(meal["name"], "Mushroom Risotto");
    assert_eq!(meal["ai_generated"], true);
    assert_eq!(meal["ingredients_needed"][0]["quantity"], "2");
    let tags: Vec<&str> = meal["tags"].as_array().unwrap().iter().filter_map(Value::as_str).collect();
    assert_eq!(tags, vec!["comfort", "AI-Generated", "Claude-Generated"]);

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Suggest 3 dinner recipes"));
    assert!(prompts[0].contains("Alice (34)"));
    assert!(prompts[0].contains("dislikes: mushrooms"));
    assert!(prompts[0].contains("Grain: Rice (2 cup)"));
}

#[tokio::test]
async fn test_meal_provider_failure_is_bad_gateway() {
    let provider = ScriptedProvider::failing(
        ProviderKind::OpenAi,
        ProviderError::Status {
            status: 500,
            message: "overloaded".to_string(),
        },
    );
    let harness = build_harness(vec![provider], Vec::new());
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .post("/api/v1/meals/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "openai"}))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_meal_count_out_of_range() {
    let provider = ScriptedProvider::replying(ProviderKind::Claude, MEAL_REPLY);
    let harness = build_harness(vec![provider.clone()], Vec::new());
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .post("/api/v1/meals/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "claude", "count": 11}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_unavailable_provider_fails_fast() {
    let provider = ScriptedProvider::unconfigured(ProviderKind::Gemini);
    let harness = build_harness(vec![provider.clone()], Vec::new());
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .post("/api/v1/books/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "gemini", "count": 5}))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_book_recommendations_exclude_owned_books() {
    let reply = r#"{"recommendations": [
        {"title": "Dune", "author": "Frank Herbert", "genre": "Science Fiction",
         "reasoning": "Classic", "confidence_score": 0.9},
        {"title": "Hyperion", "author": "Dan Simmons", "genre": "Science Fiction",
         "reasoning": "Layered pilgrims", "confidence_score": 0.8}
    ]}"#;
    let provider = ScriptedProvider::replying(ProviderKind::Claude, reply);
    let harness = build_harness(vec![provider.clone()], Vec::new());
    harness
        .store
        .insert_book(
            harness.user,
            library_book("Dune", "Frank Herbert", "Science Fiction", ReadingStatus::Read),
            Some(5),
        )
        .await
        .unwrap();

    let (name, value) = user_header(harness.user);
    let response = harness
        .server
        .post("/api/v1/books/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "claude", "count": 5}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total_recommendations"], 1);
    assert_eq!(body["recommendations"][0]["title"], "Hyperion");
    assert!(Uuid::parse_str(body["session_id"].as_str().unwrap()).is_ok());

    let prompts = provider.prompts();
    assert!(prompts[0].contains("Dune by Frank Herbert"));
}

#[tokio::test]
async fn test_book_failure_returns_empty_result() {
    let provider = ScriptedProvider::replying(ProviderKind::Claude, "I cannot help with that.");
    let harness = build_harness(vec![provider], Vec::new());
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .post("/api/v1/books/recommendations")
        .add_header(name, value)
        .json(&json!({"provider": "claude"}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total_recommendations"], 0);
    assert!(body["recommendations"].as_array().unwrap().is_empty());
    assert!(body["context_summary"].as_str().unwrap().contains("couldn't generate"));
}

#[tokio::test]
async fn test_feedback_updates_collection_and_context() {
    let harness = build_harness(Vec::new(), Vec::new());
    let session_id = Uuid::new_v4();

    let (name, value) = user_header(harness.user);
    let response = harness
        .server
        .post("/api/v1/books/feedback")
        .add_header(name, value)
        .json(&json!({
            "session_id": session_id,
            "title": "Hyperion",
            "author": "Dan Simmons",
            "kind": "want_to_read",
            "genre": "Science Fiction"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let outcome: Value = response.json();
    assert_eq!(outcome["added_to_collection"], true);
    assert_eq!(outcome["should_regenerate"], false);

    let (name, value) = user_header(harness.user);
    let response = harness
        .server
        .post("/api/v1/books/feedback")
        .add_header(name, value)
        .json(&json!({
            "session_id": session_id,
            "title": "Twilight",
            "author": "Stephenie Meyer",
            "kind": "not-interested"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let outcome: Value = response.json();
    assert_eq!(outcome["added_to_collection"], false);
    assert_eq!(outcome["should_regenerate"], true);

    let (name, value) = user_header(harness.user);
    let response = harness.server.get("/api/v1/books/context").add_header(name, value).await;
    response.assert_status_ok();

    let context: Value = response.json();
    assert_eq!(context["total_books"], 1);
    assert_eq!(context["want_to_read_count"], 1);
    assert_eq!(context["recent_positive"][0], "Hyperion by Dan Simmons");
    assert_eq!(context["recent_negative"][0], "Twilight by Stephenie Meyer");
    assert_eq!(harness.store.feedback_log(harness.user).await.len(), 2);
}

#[tokio::test]
async fn test_feedback_requires_title() {
    let harness = build_harness(Vec::new(), Vec::new());
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .post("/api/v1/books/feedback")
        .add_header(name, value)
        .json(&json!({
            "session_id": Uuid::new_v4(),
            "title": "  ",
            "author": "Dan Simmons",
            "kind": "already_read"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metadata_lookup() {
    let sources: Vec<Arc<dyn MetadataSource>> = vec![
        Arc::new(FixedSource {
            kind: MetadataSourceKind::AiInference,
            candidate: Some(SourceCandidate {
                title: Some("Dune".to_string()),
                authors: vec!["Frank Herbert".to_string()],
                publication_year: Some(1965),
                ..Default::default()
            }),
        }),
        Arc::new(FixedSource {
            kind: MetadataSourceKind::GoogleBooks,
            candidate: Some(SourceCandidate {
                cover_image_url: Some("https://books.google.com/dune.jpg".to_string()),
                external_id: Some("vol-1".to_string()),
                ..Default::default()
            }),
        }),
    ];
    let harness = build_harness(Vec::new(), sources);
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .get("/api/v1/metadata/books")
        .add_header(name, value)
        .add_query_param("title", "Dune")
        .add_query_param("author", "Frank Herbert")
        .await;
    response.assert_status_ok();

    let record: Value = response.json();
    assert_eq!(record["author"], "Frank Herbert");
    assert_eq!(record["publication_year"], 1965);
    assert_eq!(record["google_books_id"], "vol-1");
    assert_eq!(record["sources"], json!(["ai_inference", "google_books"]));
}

#[tokio::test]
async fn test_metadata_not_found() {
    let sources: Vec<Arc<dyn MetadataSource>> = vec![Arc::new(FixedSource {
        kind: MetadataSourceKind::OpenLibrary,
        candidate: None,
    })];
    let harness = build_harness(Vec::new(), sources);
    let (name, value) = user_header(harness.user);

    let response = harness
        .server
        .get("/api/v1/metadata/books")
        .add_header(name, value)
        .add_query_param("title", "Nonexistent Book")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
