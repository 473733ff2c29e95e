//! In-process stand-in for the flower API.
//!
//! Speaks the same JSON as the real service for the endpoints the storefront
//! uses. Bearer tokens are checked on every call that carries one, so an
//! expired token is rejected even on public catalog endpoints, which is what
//! drives the storefront's refresh path.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

pub const USERNAME: &str = "anna";
pub const PASSWORD: &str = "secret";
pub const ACCESS_TOKEN: &str = "access-1";
pub const REFRESH_TOKEN: &str = "refresh-1";
pub const REFRESHED_ACCESS_TOKEN: &str = "access-2";
pub const ROTATED_REFRESH_TOKEN: &str = "refresh-2";
pub const CHECKOUT_URL: &str = "https://pay.example.com/c/pay/cs_test_a1b2c3#fragment";

/// Ids of the seeded orders.
pub const PENDING_ORDER: i64 = 7;
pub const COMPLETED_ORDER: i64 = 8;
pub const ORDER_WITHOUT_ADDRESS: i64 = 9;

/// One request as the API saw it. Paths are relative to `/api`.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct Inner {
    valid_access: HashSet<String>,
    /// Refresh token to the pair it rotates into. Each entry works once.
    refresh: HashMap<String, (String, String)>,
    flowers: Vec<Value>,
    orders: Vec<Value>,
    favorites: Vec<Value>,
    next_order_id: i64,
    next_favorite_id: i64,
    payment_status: String,
    order_error: Option<(StatusCode, Value)>,
    checkout_error: Option<(StatusCode, Value)>,
    requests: Vec<RecordedRequest>,
}

/// Handle to a running fake API.
#[derive(Clone)]
pub struct FakeApi {
    addr: SocketAddr,
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    /// Bind an ephemeral port and serve the seeded catalog.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let api = Self {
            addr,
            inner: Arc::new(Mutex::new(Inner::seeded())),
        };

        let app = Router::new().fallback(handle).with_state(api.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        api
    }

    /// Value for `FLORIST_API_URL`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests matching a method and path.
    #[must_use]
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    #[must_use]
    pub fn refresh_calls(&self) -> usize {
        self.requests_to(Method::POST, "/auth/token/refresh/").len()
    }

    /// Let every issued access token lapse; refresh tokens keep working.
    pub fn expire_access_tokens(&self) {
        self.lock().valid_access.clear();
    }

    /// Revoke every refresh token.
    pub fn revoke_refresh_tokens(&self) {
        self.lock().refresh.clear();
    }

    pub fn set_payment_status(&self, status: &str) {
        self.lock().payment_status = status.to_string();
    }

    /// Make `POST /orders/` fail with the given status and body.
    pub fn fail_orders(&self, status: StatusCode, body: Value) {
        self.lock().order_error = Some((status, body));
    }

    /// Make `POST /checkout/` fail with the given status and body.
    pub fn fail_checkout(&self, status: StatusCode, body: Value) {
        self.lock().checkout_error = Some((status, body));
    }

    /// Orders created through the API, seeded ones excluded.
    #[must_use]
    pub fn created_orders(&self) -> Vec<Value> {
        self.lock()
            .orders
            .iter()
            .filter(|o| o["id"].as_i64().is_some_and(|id| id > ORDER_WITHOUT_ADDRESS))
            .cloned()
            .collect()
    }

    /// Flower ids currently in the favorites.
    #[must_use]
    pub fn favorite_flower_ids(&self) -> Vec<i64> {
        self.lock()
            .favorites
            .iter()
            .filter_map(|f| f["flower"]["id"].as_i64())
            .collect()
    }
}

async fn handle(
    State(api): State<FakeApi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().strip_prefix("/api").unwrap_or(uri.path()).to_string();
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body: Option<Value> = serde_json::from_slice(&body).ok();

    let mut inner = api.lock();
    inner.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: authorization.clone(),
        body: body.clone(),
    });
    inner.respond(&method, &path, authorization.as_deref(), body.as_ref())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type", "code": "token_not_valid"})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

fn flower(id: i64, name: &str, price: &str, category: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("Fresh {name}"),
        "price": price,
        "image": null,
        "image_url": format!("http://media.example.com/flowers/{id}.jpg"),
        "category": {"id": 1, "name": category, "description": ""},
        "in_stock": true,
    })
}

#[must_use]
pub fn user() -> Value {
    json!({
        "id": 1,
        "username": USERNAME,
        "email": "anna@example.com",
        "first_name": "Anna",
        "last_name": "Petrova",
        "profile": {"phone": "+7 999 123-45-67"},
    })
}

fn line(flower: &Value, quantity: u32) -> Value {
    let mut line = flower.clone();
    line["quantity"] = json!(quantity);
    line
}

fn field(body: Option<&Value>, name: &str) -> String {
    body.and_then(|b| b[name].as_str()).unwrap_or_default().to_string()
}

impl Inner {
    fn seeded() -> Self {
        let flowers = vec![
            flower(1, "Rose", "500.00", "Roses"),
            flower(2, "Tulip", "120.00", "Tulips"),
            flower(3, "Lily", "249.50", "Lilies"),
        ];

        let order = |id: i64, status: &str, address: &str, items: Vec<Value>, total: &str| {
            json!({
                "id": id,
                "name": "Anna Petrova",
                "phone": "+7 999 123-45-67",
                "email": "anna@example.com",
                "address": address,
                "comment": "",
                "items": items,
                "total": total,
                "status": status,
                "created_at": "2025-03-08T10:15:00.123456+03:00",
            })
        };
        let orders = vec![
            order(
                PENDING_ORDER,
                "pending",
                "Nevsky prospect 1",
                vec![line(&flowers[0], 2), line(&flowers[1], 1)],
                "1120.00",
            ),
            order(
                COMPLETED_ORDER,
                "completed",
                "Nevsky prospect 1",
                vec![line(&flowers[2], 1)],
                "249.50",
            ),
            order(
                ORDER_WITHOUT_ADDRESS,
                "pending",
                "",
                vec![line(&flowers[0], 1)],
                "500.00",
            ),
        ];

        Self {
            valid_access: HashSet::from([ACCESS_TOKEN.to_string()]),
            refresh: HashMap::from([(
                REFRESH_TOKEN.to_string(),
                (
                    REFRESHED_ACCESS_TOKEN.to_string(),
                    ROTATED_REFRESH_TOKEN.to_string(),
                ),
            )]),
            flowers,
            orders,
            favorites: Vec::new(),
            next_order_id: 100,
            next_favorite_id: 1,
            payment_status: "paid".to_string(),
            order_error: None,
            checkout_error: None,
            requests: Vec::new(),
        }
    }

    fn respond(
        &mut self,
        method: &Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<&Value>,
    ) -> Response {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["auth", "login"]) => return self.login(body),
            ("POST", ["auth", "register"]) => return self.register(body),
            ("POST", ["auth", "token", "refresh"]) => return self.refresh(body),
            _ => {}
        }

        let signed_in = match authorization {
            None => false,
            Some(header) => {
                let token = header.strip_prefix("Bearer ").unwrap_or_default();
                if !self.valid_access.contains(token) {
                    return unauthorized();
                }
                true
            }
        };

        match (method.as_str(), segments.as_slice()) {
            ("GET", ["flowers"]) => Json(self.flowers.clone()).into_response(),
            ("GET", ["flowers", id]) => self.flower(id).map_or_else(not_found, |f| Json(f).into_response()),
            ("GET", ["payment-status", _]) => Json(json!({
                "status": self.payment_status,
                "order_status": "processing",
                "order_id": PENDING_ORDER,
            }))
            .into_response(),
            _ if !signed_in => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Authentication credentials were not provided."})),
            )
                .into_response(),
            ("GET", ["auth", "profile"]) => Json(user()).into_response(),
            ("GET", ["orders"]) => Json(self.orders.clone()).into_response(),
            ("POST", ["orders"]) => self.create_order(body),
            ("POST", ["checkout"]) => self.checkout(),
            ("GET", ["favorites"]) => Json(self.favorites.clone()).into_response(),
            ("POST", ["favorites"]) => self.add_favorite(body),
            ("DELETE", ["favorites", id]) => self.remove_favorite(id),
            _ => not_found(),
        }
    }

    fn flower(&self, id: &str) -> Option<Value> {
        self.flowers
            .iter()
            .find(|f| f["id"].to_string() == id)
            .cloned()
    }

    fn auth_response(&mut self, user: Value) -> Response {
        self.valid_access.insert(ACCESS_TOKEN.to_string());
        self.refresh.insert(
            REFRESH_TOKEN.to_string(),
            (
                REFRESHED_ACCESS_TOKEN.to_string(),
                ROTATED_REFRESH_TOKEN.to_string(),
            ),
        );
        Json(json!({
            "user": user,
            "tokens": {"access": ACCESS_TOKEN, "refresh": REFRESH_TOKEN},
        }))
        .into_response()
    }

    fn login(&mut self, body: Option<&Value>) -> Response {
        if field(body, "username") == USERNAME && field(body, "password") == PASSWORD {
            self.auth_response(user())
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            )
                .into_response()
        }
    }

    fn register(&mut self, body: Option<&Value>) -> Response {
        let username = field(body, "username");
        if username == "taken" {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"username": ["A user with that username already exists."]})),
            )
                .into_response();
        }
        if field(body, "password") != field(body, "password2") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"password": ["Password fields didn't match."]})),
            )
                .into_response();
        }

        let mut registered = user();
        registered["id"] = json!(2);
        registered["username"] = json!(username);
        registered["email"] = json!(field(body, "email"));
        registered["first_name"] = json!(field(body, "first_name"));
        registered["last_name"] = json!(field(body, "last_name"));
        self.auth_response(registered)
    }

    fn refresh(&mut self, body: Option<&Value>) -> Response {
        match self.refresh.remove(&field(body, "refresh")) {
            Some((access, refresh)) => {
                self.valid_access.insert(access.clone());
                Json(json!({"access": access, "refresh": refresh})).into_response()
            }
            None => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
            )
                .into_response(),
        }
    }

    fn create_order(&mut self, body: Option<&Value>) -> Response {
        if let Some((status, error)) = self.order_error.clone() {
            return (status, Json(error)).into_response();
        }

        let mut order = body.cloned().unwrap_or_else(|| json!({}));
        order["id"] = json!(self.next_order_id);
        order["status"] = json!("pending");
        order["created_at"] = json!("2025-03-08T12:00:00+03:00");
        self.next_order_id += 1;
        self.orders.push(order.clone());

        (StatusCode::CREATED, Json(order)).into_response()
    }

    fn checkout(&mut self) -> Response {
        if let Some((status, error)) = self.checkout_error.clone() {
            return (status, Json(error)).into_response();
        }

        Json(json!({
            "checkout_url": CHECKOUT_URL,
            "session_id": "cs_test_a1b2c3",
            "order_id": self.next_order_id,
        }))
        .into_response()
    }

    fn add_favorite(&mut self, body: Option<&Value>) -> Response {
        let flower_id = body.and_then(|b| b["flower_id"].as_i64()).unwrap_or_default();
        let Some(flower) = self.flower(&flower_id.to_string()) else {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"flower_id": ["Invalid pk - object does not exist."]})),
            )
                .into_response();
        };

        let favorite = json!({
            "id": self.next_favorite_id,
            "flower": flower,
            "created_at": "2025-03-08T12:00:00+03:00",
        });
        self.next_favorite_id += 1;
        self.favorites.push(favorite.clone());

        (StatusCode::CREATED, Json(favorite)).into_response()
    }

    fn remove_favorite(&mut self, id: &str) -> Response {
        let before = self.favorites.len();
        self.favorites.retain(|f| f["id"].to_string() != id);
        if self.favorites.len() == before {
            not_found()
        } else {
            StatusCode::NO_CONTENT.into_response()
        }
    }
}
