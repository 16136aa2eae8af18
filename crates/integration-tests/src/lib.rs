//! Integration tests for the Kickforge client.
//!
//! The tests drive the client crate end to end against [`FakeBackend`], an
//! in-process `axum` server that speaks the backend's REST dialect: session
//! cookies, `{user}`/`{design}`/`{order}` envelopes, Mongo-style `_id`s and
//! `{message, errors}` failure bodies.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kickforge-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `client_auth` - Registration, OTP, sign-in, session restore and expiry
//! - `client_designs` - Two-phase saves, deletes and reconciled listings
//! - `client_checkout` - Payment hand-off, verification and order records

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use kickforge_client::{AppState, ClientConfig, ClientStore};

/// Name of the backend's session cookie.
pub const SESSION_COOKIE: &str = "connect.sid";

/// The code every OTP email "contains".
pub const VALID_OTP: &str = "123456";

/// A registered account.
#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    email: String,
    password: String,
    verified: bool,
    phone: Option<String>,
    profile_image: Option<String>,
}

impl Account {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "email": self.email,
            "phone": self.phone,
            "profileImage": self.profile_image,
            "isVerified": self.verified,
        })
    }
}

#[derive(Debug, Default)]
struct Backend {
    accounts: HashMap<String, Account>,
    /// Session id to account email.
    sessions: HashMap<String, String>,
    /// Stored designs, each with `_id` and `userId`.
    designs: Vec<Value>,
    /// Gateway order id to amount.
    payment_orders: HashMap<String, u64>,
    orders: Vec<Value>,
    generate_calls: usize,
    resend_calls: usize,
    designs_down: bool,
    next_id: u64,
}

impl Backend {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn open_session(&mut self, email: &str) -> String {
        let sid = self.next_id("s%3Asession");
        self.sessions.insert(sid.clone(), email.to_owned());
        sid
    }

    fn account_for(&self, headers: &HeaderMap) -> Option<&Account> {
        let sid = session_id(headers)?;
        let email = self.sessions.get(&sid)?;
        self.accounts.get(email)
    }
}

type Shared = Arc<Mutex<Backend>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Backend> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process stand-in for the Kickforge REST backend.
///
/// The server runs until the value is dropped.
pub struct FakeBackend {
    url: Url,
    shared: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend on an ephemeral local port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start() -> Self {
        let shared = Shared::default();
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(Arc::clone(&shared));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            shared,
            server,
        }
    }

    /// The backend base URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Client configuration pointing at this backend, with a gateway key.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_api(self.url.clone());
        config.checkout.key_id = Some("rzp_test_kickforge".to_owned());
        config
    }

    /// A fresh client state with a private in-memory store.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn client(&self) -> AppState {
        AppState::with_store(self.config(), ClientStore::in_memory()).unwrap()
    }

    /// A client state over an existing store, as after an app restart.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be built.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn client_with_store(&self, store: ClientStore) -> AppState {
        AppState::with_store(self.config(), store).unwrap()
    }

    /// Register a verified account directly.
    pub fn add_account(&self, name: &str, email: &str, password: &str) -> String {
        let mut backend = lock(&self.shared);
        let id = backend.next_id("u");
        backend.accounts.insert(
            email.to_owned(),
            Account {
                id: id.clone(),
                name: name.to_owned(),
                email: email.to_owned(),
                password: password.to_owned(),
                verified: true,
                phone: None,
                profile_image: None,
            },
        );
        id
    }

    /// Store a raw design record as if saved by another client.
    pub fn insert_design(&self, design: Value) {
        lock(&self.shared).designs.push(design);
    }

    /// Stored design records.
    #[must_use]
    pub fn designs(&self) -> Vec<Value> {
        lock(&self.shared).designs.clone()
    }

    /// Recorded orders.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.shared).orders.clone()
    }

    /// How many times the image generator was called.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        lock(&self.shared).generate_calls
    }

    /// How many fresh codes were requested.
    #[must_use]
    pub fn resend_calls(&self) -> usize {
        lock(&self.shared).resend_calls
    }

    /// Invalidate every session, as when they expire server-side.
    pub fn expire_sessions(&self) {
        lock(&self.shared).sessions.clear();
    }

    /// Make the design endpoints answer 503 (or recover).
    pub fn set_designs_down(&self, down: bool) {
        lock(&self.shared).designs_down = down;
    }

    /// The signature the gateway would produce for a payment.
    #[must_use]
    pub fn signature(order_id: &str, payment_id: &str) -> String {
        format!("sig_{order_id}_{payment_id}")
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/verify-otp", post(verify_otp))
        .route("/api/auth/resend-otp", post(resend_otp))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/forgot-password", post(acknowledge))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/designs", get(list_designs).post(save_design))
        .route("/api/designs/{id}", delete(delete_design))
        .route("/api/profile", put(update_profile))
        .route("/api/profile/image", post(upload_profile_image))
        .route("/api/payment/create-order", post(create_payment_order))
        .route("/api/payment/verify", post(verify_payment))
        .route("/api/orders", post(create_order))
        .route("/api/generate", post(generate))
        .with_state(shared)
}

// =============================================================================
// Helpers
// =============================================================================

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_owned())
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn unauthorized() -> Response {
    failure(StatusCode::UNAUTHORIZED, "Not authorized, no valid session")
}

fn field(body: &Value, name: &str) -> String {
    body.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn signed_in(sid: &str, user: Value) -> Response {
    (
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly"),
        )],
        Json(json!({ "user": user })),
    )
        .into_response()
}

// =============================================================================
// Auth
// =============================================================================

async fn register(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = field(&body, "email");
    let mut backend = lock(&shared);
    if backend.accounts.contains_key(&email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "message": "Email already registered",
                "errors": { "email": "An account with this email already exists" },
            })),
        )
            .into_response();
    }

    let id = backend.next_id("u");
    backend.accounts.insert(
        email.clone(),
        Account {
            id,
            name: field(&body, "name"),
            email,
            password: field(&body, "password"),
            verified: false,
            phone: None,
            profile_image: None,
        },
    );
    Json(json!({ "message": "OTP sent to your email" })).into_response()
}

async fn verify_otp(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = field(&body, "email");
    if field(&body, "otp") != VALID_OTP {
        return failure(StatusCode::BAD_REQUEST, "Invalid or expired OTP");
    }

    let mut backend = lock(&shared);
    let Some(account) = backend.accounts.get_mut(&email) else {
        return failure(StatusCode::NOT_FOUND, "User not found");
    };
    account.verified = true;
    let user = account.to_json();
    let sid = backend.open_session(&email);
    signed_in(&sid, user)
}

async fn acknowledge(Json(_body): Json<Value>) -> Response {
    Json(json!({ "message": "OTP sent to your email" })).into_response()
}

async fn resend_otp(State(shared): State<Shared>, Json(_body): Json<Value>) -> Response {
    lock(&shared).resend_calls += 1;
    Json(json!({ "message": "OTP sent to your email" })).into_response()
}

async fn login(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = field(&body, "email");
    let mut backend = lock(&shared);
    let user = match backend.accounts.get(&email) {
        Some(account) if account.password == field(&body, "password") => account.to_json(),
        _ => return failure(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    };
    let sid = backend.open_session(&email);
    signed_in(&sid, user)
}

async fn logout(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(sid) = session_id(&headers) {
        lock(&shared).sessions.remove(&sid);
    }
    (
        [(
            header::SET_COOKIE,
            format!("{SESSION_COOKIE}=; Path=/; Max-Age=0"),
        )],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn me(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let backend = lock(&shared);
    backend.account_for(&headers).map_or_else(unauthorized, |account| {
        Json(json!({ "user": account.to_json() })).into_response()
    })
}

async fn reset_password(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    if field(&body, "otp") != VALID_OTP {
        return failure(StatusCode::BAD_REQUEST, "Invalid or expired OTP");
    }
    let mut backend = lock(&shared);
    let Some(account) = backend.accounts.get_mut(&field(&body, "email")) else {
        return failure(StatusCode::NOT_FOUND, "User not found");
    };
    account.password = field(&body, "password");
    Json(json!({ "message": "Password reset successful" })).into_response()
}

// =============================================================================
// Designs
// =============================================================================

async fn list_designs(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let backend = lock(&shared);
    if backend.designs_down {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable");
    }
    let Some(account) = backend.account_for(&headers) else {
        return unauthorized();
    };
    let designs: Vec<&Value> = backend
        .designs
        .iter()
        .filter(|d| d.get("userId").and_then(Value::as_str) == Some(account.id.as_str()))
        .collect();
    Json(json!({ "designs": designs })).into_response()
}

async fn save_design(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = lock(&shared);
    if backend.designs_down {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable");
    }
    let Some(owner) = backend.account_for(&headers).map(|a| a.id.clone()) else {
        return unauthorized();
    };
    if field(&body, "name").trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Design name is required",
                "errors": { "name": "is required" },
            })),
        )
            .into_response();
    }

    // Stored under a backend-assigned id, like a document database would.
    let mut stored = body;
    if let Value::Object(map) = &mut stored {
        map.remove("id");
        map.insert("_id".to_owned(), Value::String(backend.next_id("65f1")));
        map.insert("userId".to_owned(), Value::String(owner));
    }
    backend.designs.push(stored.clone());
    (StatusCode::CREATED, Json(json!({ "design": stored }))).into_response()
}

async fn delete_design(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let mut backend = lock(&shared);
    if backend.designs_down {
        return failure(StatusCode::SERVICE_UNAVAILABLE, "Database unavailable");
    }
    let Some(owner) = backend.account_for(&headers).map(|a| a.id.clone()) else {
        return unauthorized();
    };
    let before = backend.designs.len();
    backend.designs.retain(|d| {
        d.get("_id").and_then(Value::as_str) != Some(id.as_str())
            || d.get("userId").and_then(Value::as_str) != Some(owner.as_str())
    });
    if backend.designs.len() == before {
        return failure(StatusCode::NOT_FOUND, "Design not found");
    }
    Json(json!({ "message": "Design deleted" })).into_response()
}

// =============================================================================
// Profile
// =============================================================================

async fn update_profile(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = lock(&shared);
    let Some(email) = backend.account_for(&headers).map(|a| a.email.clone()) else {
        return unauthorized();
    };
    let Some(account) = backend.accounts.get_mut(&email) else {
        return unauthorized();
    };
    account.name = field(&body, "name");
    account.phone = body.get("phone").and_then(Value::as_str).map(ToOwned::to_owned);
    Json(json!({ "user": account.to_json() })).into_response()
}

async fn upload_profile_image(
    State(shared): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut received = None;
    while let Ok(Some(part)) = multipart.next_field().await {
        if part.name() == Some("image") {
            let file_name = part.file_name().unwrap_or("upload").to_owned();
            if let Ok(bytes) = part.bytes().await {
                received = Some((file_name, bytes.len()));
            }
        }
    }
    let Some((file_name, len)) = received.filter(|(_, len)| *len > 0) else {
        return failure(StatusCode::BAD_REQUEST, "No image uploaded");
    };

    let mut backend = lock(&shared);
    let Some(email) = backend.account_for(&headers).map(|a| a.email.clone()) else {
        return unauthorized();
    };
    let url = format!("https://cdn.kickforge.test/profiles/{len}-{file_name}");
    if let Some(account) = backend.accounts.get_mut(&email) {
        account.profile_image = Some(url.clone());
    }
    Json(json!({ "imageUrl": url })).into_response()
}

// =============================================================================
// Payments & orders
// =============================================================================

async fn create_payment_order(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let Some(amount) = body.get("amount").and_then(Value::as_u64).filter(|a| *a > 0) else {
        return failure(StatusCode::BAD_REQUEST, "Amount is required");
    };
    let currency = field(&body, "currency");
    let mut backend = lock(&shared);
    let id = backend.next_id("order_");
    backend.payment_orders.insert(id.clone(), amount);
    Json(json!({
        "order": { "id": id, "amount": amount, "currency": currency, "status": "created" }
    }))
    .into_response()
}

async fn verify_payment(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let order_id = field(&body, "razorpay_order_id");
    let payment_id = field(&body, "razorpay_payment_id");
    let known = lock(&shared).payment_orders.contains_key(&order_id);
    if known && field(&body, "razorpay_signature") == FakeBackend::signature(&order_id, &payment_id)
    {
        Json(json!({ "success": true, "message": "Payment verified" })).into_response()
    } else {
        Json(json!({ "success": false, "message": "Invalid signature" })).into_response()
    }
}

async fn create_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = lock(&shared);
    let owner = backend.account_for(&headers).map(|a| a.id.clone());
    let gateway_order = field(&body, "gatewayOrderId");
    if !backend.payment_orders.contains_key(&gateway_order) {
        return failure(StatusCode::BAD_REQUEST, "Unknown payment order");
    }

    let id = backend.next_id("ord");
    let mut stored = body;
    if let Value::Object(map) = &mut stored {
        map.insert("_id".to_owned(), Value::String(id.clone()));
        map.insert("userId".to_owned(), owner.map_or(Value::Null, Value::String));
        map.insert("status".to_owned(), Value::String("paid".to_owned()));
    }
    backend.orders.push(stored);
    (
        StatusCode::CREATED,
        Json(json!({ "order": { "_id": id, "status": "paid" } })),
    )
        .into_response()
}

// =============================================================================
// Generation
// =============================================================================

async fn generate(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    let prompt = field(&body, "prompt");
    if prompt.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Prompt is required");
    }
    let mut backend = lock(&shared);
    backend.generate_calls += 1;
    let n = backend.generate_calls;
    Json(json!({ "imageUrl": format!("https://cdn.kickforge.test/generated/{n}.png") }))
        .into_response()
}
