//! Stub REST API shared by the integration tests.
//!
//! Serves just enough of the inventory backend on `127.0.0.1:0` for the
//! real `reqwest` client to run end-to-end, and records what it was asked.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use tienda_client::{AdminConsole, ConsoleConfig, SessionContext};

pub const USERNAME: &str = "ana";
pub const PASSWORD: &str = "secreto";

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// A request the stub answered.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct StubState {
    /// `(branch_id, product_id) -> quantity`
    pub stock: HashMap<(i64, i64), i64>,
    pub calls: Vec<Recorded>,
    /// Every bearer token issued so far is accepted unless revoked.
    pub revoked: bool,
    pub fail_approval: bool,
    /// Caps the rows of a batched `/inventory/` reply, like a paginating
    /// backend would.
    pub inventory_page: Option<usize>,
    next_id: i64,
}

#[derive(Clone)]
pub struct Stub {
    pub addr: SocketAddr,
    state: Arc<Mutex<StubState>>,
}

impl Stub {
    pub async fn start() -> Stub {
        let state = Arc::new(Mutex::new(StubState {
            next_id: 100,
            ..Default::default()
        }));

        let app = Router::new()
            .route("/login", post(login))
            .route("/products", get(list_products))
            .route("/products/{id}/inventory", get(product_inventory))
            .route("/inventory/", get(inventory))
            .route("/sales", post(create_sale))
            .route("/sales/{id}/invoice", get(invoice))
            .route("/clients", post(create_client))
            .route("/clients/{id}", get(get_client))
            .route("/reports/broken", get(broken))
            .route("/suppliers/orders/", post(create_order))
            .route("/suppliers/orders/{id}/approve", post(approve_order))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Stub { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn console(&self) -> AdminConsole {
        let config = ConsoleConfig::with_base_url(self.base_url());
        AdminConsole::with_session(config, Arc::new(SessionContext::in_memory())).unwrap()
    }

    pub fn set_stock(&self, branch_id: i64, product_id: i64, quantity: i64) {
        self.lock().stock.insert((branch_id, product_id), quantity);
    }

    pub fn paginate_inventory(&self, rows: usize) {
        self.lock().inventory_page = Some(rows);
    }

    pub fn revoke_tokens(&self) {
        self.lock().revoked = true;
    }

    pub fn fail_approval(&self) {
        self.lock().fail_approval = true;
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }
}

/// A token for `username` as the stub would issue it.
pub fn issue_token(username: &str, role_id: i64, permissions: &[&str]) -> String {
    let permissions: serde_json::Map<String, Value> = permissions
        .iter()
        .map(|p| (p.to_string(), Value::Bool(true)))
        .collect();
    let claims = json!({
        "sub": username,
        "role_id": role_id,
        "permissions": permissions,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"stub-secret"),
    )
    .unwrap()
}

pub fn product_json(id: i64, name: &str, price: &str) -> Value {
    json!({
        "product_id": id,
        "barcode": format!("779{:04}", id),
        "name": name,
        "price": price,
        "category_id": 1,
        "unit_type": "unidad",
    })
}

// =============================================================================
// Handlers
// =============================================================================

type Shared = State<Arc<Mutex<StubState>>>;

fn record(
    state: &Arc<Mutex<StubState>>,
    method: &'static str,
    path: impl Into<String>,
    query: HashMap<String, String>,
    body: Value,
) {
    state.lock().unwrap().calls.push(Recorded {
        method,
        path: path.into(),
        query,
        body,
    });
}

fn authorize(state: &Arc<Mutex<StubState>>, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(_) if !state.lock().unwrap().revoked => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Token inválido o expirado" })),
        )),
    }
}

async fn login(State(state): Shared, Form(form): Form<HashMap<String, String>>) -> Reply {
    record(&state, "POST", "/login", HashMap::new(), json!(form));
    let username = form.get("username").map(String::as_str);
    let password = form.get("password").map(String::as_str);
    if username == Some(USERNAME) && password == Some(PASSWORD) {
        let token = issue_token(USERNAME, 2, &["sales", "inventory"]);
        Ok(Json(json!({ "access_token": token, "token_type": "bearer" })))
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Usuario o contraseña incorrectos" })),
        ))
    }
}

async fn list_products(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    authorize(&state, &headers)?;
    record(&state, "GET", "/products", query.clone(), Value::Null);

    let mut items = vec![
        product_json(1, "Arroz 1kg", "8.50"),
        product_json(2, "Aceite 900ml", "15.00"),
        product_json(3, "Azúcar 1kg", "7.20"),
    ];
    if let Some(search) = query.get("search") {
        items.retain(|p| {
            p["name"]
                .as_str()
                .is_some_and(|n| n.to_lowercase().contains(&search.to_lowercase()))
        });
    }
    // No skip/limit in the body; the client fills them in.
    Ok(Json(json!({ "items": items, "total": items.len() })))
}

async fn inventory(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    authorize(&state, &headers)?;
    record(&state, "GET", "/inventory/", query.clone(), Value::Null);

    let branch_id: i64 = query
        .get("branch_id")
        .and_then(|b| b.parse().ok())
        .unwrap_or_default();
    let ids: Vec<i64> = query
        .get("product_ids")
        .map(|ids| ids.split(',').filter_map(|id| id.parse().ok()).collect())
        .unwrap_or_default();

    let guard = state.lock().unwrap();
    let page = guard.inventory_page.unwrap_or(usize::MAX);
    let rows: Vec<Value> = ids
        .iter()
        .filter_map(|id| {
            guard.stock.get(&(branch_id, *id)).map(|qty| {
                json!({ "product_id": id, "branch_id": branch_id, "quantity": qty })
            })
        })
        .take(page)
        .collect();
    Ok(Json(Value::Array(rows)))
}

/// Rows at every branch, without `product_id` like the real endpoint.
async fn product_inventory(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    authorize(&state, &headers)?;
    record(
        &state,
        "GET",
        format!("/products/{}/inventory", id),
        HashMap::new(),
        Value::Null,
    );

    let guard = state.lock().unwrap();
    let mut rows: Vec<(i64, i64)> = guard
        .stock
        .iter()
        .filter(|((_, product_id), _)| *product_id == id)
        .map(|((branch_id, _), qty)| (*branch_id, *qty))
        .collect();
    rows.sort();
    let rows: Vec<Value> = rows
        .into_iter()
        .map(|(branch_id, qty)| json!({ "branch_id": branch_id, "quantity": qty }))
        .collect();
    Ok(Json(Value::Array(rows)))
}

async fn create_sale(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    authorize(&state, &headers)?;
    record(&state, "POST", "/sales", HashMap::new(), body.clone());

    let sale_id = {
        let mut guard = state.lock().unwrap();
        guard.next_id += 1;
        guard.next_id
    };
    Ok(Json(json!({
        "sale_id": sale_id,
        "invoice_number": format!("F-{:06}", sale_id),
        "status": "COMPLETADA",
        "discount": body["discount"],
        "branch_id": body["branch_id"],
    })))
}

async fn invoice(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Vec<u8>, (StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;
    record(&state, "GET", format!("/sales/{}/invoice", id), HashMap::new(), Value::Null);
    Ok(b"%PDF-1.4 factura".to_vec())
}

async fn create_client(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    authorize(&state, &headers)?;
    record(&state, "POST", "/clients", HashMap::new(), body);
    Err((
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "detail": [
                { "loc": ["body", "ci_nit"], "msg": "field required", "type": "missing" },
                { "loc": ["body", "email"], "msg": "value is not a valid email", "type": "value_error" }
            ]
        })),
    ))
}

async fn get_client(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    authorize(&state, &headers)?;
    Err((
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": format!("Cliente {} no encontrado", id) })),
    ))
}

async fn broken(State(state): Shared, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).map_err(|(status, _)| status)?;
    Err(StatusCode::BAD_GATEWAY)
}

async fn create_order(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    authorize(&state, &headers)?;
    record(&state, "POST", "/suppliers/orders/", HashMap::new(), body.clone());

    let order_id = {
        let mut guard = state.lock().unwrap();
        guard.next_id += 1;
        guard.next_id
    };
    Ok(Json(json!({
        "order_id": order_id,
        "supplier_id": body["supplier_id"],
        "branch_id": body["branch_id"],
        "status": "PENDING",
        "items": body["items"],
    })))
}

async fn approve_order(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;
    record(
        &state,
        "POST",
        format!("/suppliers/orders/{}/approve", id),
        HashMap::new(),
        Value::Null,
    );
    if state.lock().unwrap().fail_approval {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "Aprobación no disponible" })),
        ));
    }
    Ok(StatusCode::NO_CONTENT)
}
