//! In-process stand-in for the library and user services

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

use bookshelf_client::{config::ApiConfig, session::Session, ApiClient, MemorySessionStore};

pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "s3cret";

#[derive(Default)]
pub struct ServerState {
    pub valid_token: Mutex<String>,
    pub logins: AtomicUsize,
    /// Reject every authenticated call, even with a valid token
    pub reject_all: AtomicBool,
    pub requests: Mutex<Vec<(String, Option<String>)>>,
    pub queries: Mutex<Vec<(String, HashMap<String, String>)>>,
    pub uploads: Mutex<Vec<HashMap<String, String>>>,
    pub json_bodies: Mutex<Vec<(String, Value)>>,
}

impl ServerState {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// Authorization headers seen for `path`, in order
    pub fn auth_headers(&self, path: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, h)| h.clone())
            .collect()
    }

    pub fn queries(&self, path: &str) -> Vec<HashMap<String, String>> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, q)| q.clone())
            .collect()
    }

    fn authorize(&self, path: &str, headers: &HeaderMap) -> Result<(), Response> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((path.to_string(), header.clone()));

        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        if self.reject_all.load(Ordering::SeqCst) || header.as_deref() != Some(expected.as_str()) {
            return Err((StatusCode::UNAUTHORIZED, "token expired").into_response());
        }
        Ok(())
    }
}

pub struct MockServer {
    pub url: String,
    pub state: Arc<ServerState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        *state.valid_token.lock().unwrap() = "good".to_string();

        let app = Router::new()
            // user service
            .route("/login/v1", post(login))
            .route("/register/v1", post(register))
            .route("/v1/", get(current_user))
            .route("/v1/friend", get(get_friend))
            .route("/v1/addfriend", patch(add_friend))
            .route("/v1/updateprofile", patch(update_profile))
            // library service
            .route("/books/v1", get(catalog))
            .route("/book/v1", patch(update_book).delete(delete_book))
            .route("/book/v1/:id", get(get_book))
            .route("/book/create/v1", post(create_book))
            .route("/userbook/v1/", get(user_books))
            .route("/userbook/v1/:id", get(get_user_book))
            .route("/userbook/v1", post(assign_book).delete(delete_user_book))
            .route("/wishlist/v1", post(toggle_wishlist))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            library_url: self.url.clone(),
            user_url: format!("{}/", self.url),
            page_size: 20,
            timeout_secs: Some(5),
        }
    }

    /// Client whose session holds `token` and, optionally, cached credentials
    pub fn client(&self, token: Option<&str>, credentials: Option<(&str, &str)>) -> (ApiClient, Arc<MemorySessionStore>) {
        let session = Arc::new(MemorySessionStore::with_session(Session {
            token: token.map(str::to_string),
            username: credentials.map(|(u, _)| u.to_string()),
            password: credentials.map(|(_, p)| p.to_string()),
        }));
        let client = ApiClient::new(&self.config(), session.clone()).unwrap();
        (client, session)
    }
}

pub fn book_json(id: &str, genres: &[&str]) -> Value {
    json!({
        "id": id,
        "title": format!("Book {}", id),
        "authors": ["Anon"],
        "genres": genres,
        "pages": 120,
        "wished": false,
    })
}

async fn login(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        let token = format!("fresh-{}", n);
        *state.valid_token.lock().unwrap() = token.clone();
        Json(json!({ "token": token })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "bad credentials").into_response()
    }
}

async fn register(State(state): State<Arc<ServerState>>, headers: HeaderMap, multipart: Multipart) -> Response {
    let fields = read_multipart(multipart).await;
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(("/register/v1".into(), header));
    if state.reject_all.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, "registration closed").into_response();
    }
    let user_name = fields.get("username").cloned().unwrap_or_default();
    let name = fields.get("name").cloned();
    state.uploads.lock().unwrap().push(fields);
    Json(json!({ "userName": user_name, "name": name, "profileId": "p-new" })).into_response()
}

async fn current_user(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize("/v1/", &headers) {
        return rejection;
    }
    Json(json!({
        "name": "Ada",
        "surname": "Lovelace",
        "userName": USERNAME,
        "profileId": "p-1",
        "friends": [
            { "friendId": "p-2", "userName": "charles", "status": "Accepted" },
            { "friendId": "p-3", "userName": "mary", "status": "Pending" }
        ]
    }))
    .into_response()
}

async fn get_friend(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/v1/friend", &headers) {
        return rejection;
    }
    state.queries.lock().unwrap().push(("/v1/friend".into(), params.clone()));
    let id = params.get("friendId").cloned().unwrap_or_default();
    Json(json!({ "name": "Charles", "userName": "charles", "profileId": id })).into_response()
}

async fn add_friend(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize("/v1/addfriend", &headers) {
        return rejection;
    }
    state.json_bodies.lock().unwrap().push(("/v1/addfriend".into(), body));
    StatusCode::OK.into_response()
}

async fn update_profile(State(state): State<Arc<ServerState>>, headers: HeaderMap, multipart: Multipart) -> Response {
    let fields = read_multipart(multipart).await;
    if let Err(rejection) = state.authorize("/v1/updateprofile", &headers) {
        return rejection;
    }
    state.uploads.lock().unwrap().push(fields);
    StatusCode::NO_CONTENT.into_response()
}

async fn catalog(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/books/v1", &headers) {
        return rejection;
    }
    state.queries.lock().unwrap().push(("/books/v1".into(), params.clone()));

    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let rows: usize = params.get("rows").and_then(|r| r.parse().ok()).unwrap_or(10);
    let filter = params.get("filter").cloned().unwrap_or_default();
    let count = if page >= 3 { 7 } else { rows };

    let books: Vec<Value> = (0..count)
        .map(|i| {
            let genre = if i % 2 == 0 { "fantasy" } else { "history" };
            book_json(&format!("{}{}-{}", filter, page, i), &[genre])
        })
        .collect();
    Json(books).into_response()
}

async fn get_book(State(state): State<Arc<ServerState>>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(rejection) = state.authorize("/book/v1", &headers) {
        return rejection;
    }
    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, "no such book").into_response(),
        "broken" => Json(json!({ "id": "broken", "authors": "not a list" })).into_response(),
        _ => Json(book_json(&id, &["fantasy", "fantasy", "classic"])).into_response(),
    }
}

async fn update_book(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize("/book/v1", &headers) {
        return rejection;
    }
    state.json_bodies.lock().unwrap().push(("/book/v1".into(), body));
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_book(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/book/v1", &headers) {
        return rejection;
    }
    state.queries.lock().unwrap().push(("/book/v1".into(), params));
    StatusCode::NO_CONTENT.into_response()
}

async fn get_user_book(State(state): State<Arc<ServerState>>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if let Err(rejection) = state.authorize("/userbook/v1/:id", &headers) {
        return rejection;
    }
    let mut book = book_json(&id, &["essay"]);
    book["assigned"] = json!(true);
    book["rating"] = json!(5);
    book["comments"] = json!("reread every year");
    book["ownershipStatus"] = json!("Lent");
    book["readingStatus"] = json!("Finished");
    book["startDate"] = json!("2024-03-01");
    book["endDate"] = json!("2024-03-20");
    Json(book).into_response()
}

async fn create_book(State(state): State<Arc<ServerState>>, headers: HeaderMap, multipart: Multipart) -> Response {
    let fields = read_multipart(multipart).await;
    if let Err(rejection) = state.authorize("/book/create/v1", &headers) {
        return rejection;
    }
    let title = fields.get("title").cloned().unwrap_or_default();
    let genres: Vec<String> = fields
        .get("genres")
        .map(|g| g.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    state.uploads.lock().unwrap().push(fields);
    Json(json!({ "id": "new-1", "title": title, "genres": genres })).into_response()
}

async fn user_books(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/userbook/v1/", &headers) {
        return rejection;
    }
    state.queries.lock().unwrap().push(("/userbook/v1/".into(), params.clone()));

    let wishlist = params.get("wishlist").map(String::as_str) == Some("true");
    let prefix = match params.get("friendId") {
        Some(friend) => format!("{}-wish", friend),
        None if wishlist => "wish".to_string(),
        None => "mine".to_string(),
    };
    let books: Vec<Value> = (0..3)
        .map(|i| {
            let mut book = book_json(&format!("{}-{}", prefix, i), &["poetry"]);
            book["wished"] = json!(wishlist);
            book["rating"] = json!(i + 1);
            book["readingStatus"] = json!("Reading");
            book
        })
        .collect();
    Json(books).into_response()
}

async fn assign_book(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize("/userbook/v1", &headers) {
        return rejection;
    }
    let id = body["BookId"].as_str().unwrap_or_default().to_string();
    state.json_bodies.lock().unwrap().push(("/userbook/v1".into(), body));
    let mut book = book_json(&id, &[]);
    book["assigned"] = json!(true);
    book["ownershipStatus"] = json!("Owned");
    Json(book).into_response()
}

async fn delete_user_book(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = state.authorize("/userbook/v1", &headers) {
        return rejection;
    }
    state.queries.lock().unwrap().push(("/userbook/v1".into(), params));
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_wishlist(State(state): State<Arc<ServerState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize("/wishlist/v1", &headers) {
        return rejection;
    }
    state.json_bodies.lock().unwrap().push(("/wishlist/v1".into(), body));
    StatusCode::OK.into_response()
}

/// Text fields by name; files as "file_name:content_type:len"
async fn read_multipart(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let len = field.bytes().await.unwrap().len();
                fields.insert(name, format!("{}:{}:{}", file_name, content_type, len));
            }
            None => {
                fields.insert(name, field.text().await.unwrap());
            }
        }
    }
    fields
}
