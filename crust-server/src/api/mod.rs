//! API routes for crust-server
//!
//! One module per resource; every mutating endpoint sits behind the auth
//! middleware, and every response passes through the envelope layer that
//! stamps the request id into error bodies.

pub mod admin;
pub mod archive;
pub mod auth;
pub mod batches;
pub mod branches;
pub mod expenses;
pub mod health;
pub mod inventory;
pub mod notifications;
pub mod payments;
pub mod products;
pub mod sales;

use axum::body::Body;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use http_body_util::BodyExt;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::auth_middleware;
use crate::auth::rate_limit::{login_rate_limit, recovery_rate_limit};
use crate::state::AppState;

/// Per-request deadline for the regular API surface. Archive runs get their
/// own minutes-scale budget and sit outside this layer.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Auth routes (rate-limited, no bearer token)
    let login = Router::new()
        .route("/auth/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));
    let recovery = Router::new()
        .route("/auth/recover-admin-account", post(auth::recover_admin_account))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            recovery_rate_limit,
        ));

    // Branch-scoped and admin resources (bearer-authenticated)
    let protected = Router::new()
        .route("/sales", get(sales::list).post(sales::create))
        .route("/sales/{id}", get(sales::get))
        .route("/sales/{id}/void", post(sales::void))
        .route(
            "/inventory",
            get(inventory::list),
        )
        .route("/inventory/movements", get(inventory::movements))
        .route(
            "/inventory/{product_id}",
            put(inventory::adjust).delete(inventory::zero_out),
        )
        .route("/inventory/batches", get(batches::list).post(batches::create))
        .route("/inventory/batches/{id}", put(batches::edit))
        .route("/inventory/batches/{id}/void", post(batches::void))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route(
            "/products/categories",
            get(products::list_categories).post(products::create_category),
        )
        .route("/locations", get(branches::list).post(branches::create))
        .route("/locations/{id}", put(branches::update))
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/expenses/{id}",
            put(expenses::update).delete(expenses::delete),
        )
        .route("/payments", get(payments::list).post(payments::create))
        .route("/payments/{id}", axum::routing::delete(payments::delete))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route(
            "/notifications/rules",
            get(notifications::list_rules).post(notifications::create_rule),
        )
        .route(
            "/notifications/rules/{id}",
            put(notifications::update_rule).delete(notifications::delete_rule),
        )
        .route("/admin/staff", get(admin::list_staff).post(admin::create_staff))
        .route("/admin/staff/{id}", put(admin::update_staff))
        .route("/admin/staff/{id}/archive", post(admin::archive_staff))
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/admin/users/{id}", put(admin::update_user))
        .route(
            "/admin/users/{id}/status",
            axum::routing::patch(admin::set_user_status),
        )
        .route(
            "/archive/settings",
            get(archive::get_settings).put(archive::update_settings),
        )
        .route("/archive/runs", get(archive::list_runs))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    // Archive run is excluded from the 15 s budget; it holds the advisory
    // lock for the duration of the per-branch transactions.
    let archive_run = Router::new().route("/archive/run", post(archive::run));

    let authed = protected
        .merge(archive_run)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(login)
        .merge(recovery)
        .merge(authed)
        .layer(middleware::from_fn(inject_request_id))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.allowed_origins))
        .with_state(state)
}

/// Run validator-derive checks and fold field errors into the envelope's
/// `details`.
pub(crate) fn validate_payload<T: validator::Validate>(
    payload: &T,
) -> Result<(), shared::error::AppError> {
    payload.validate().map_err(|errors| {
        let mut err = shared::error::AppError::validation("Validation failed");
        for (field, field_errors) in errors.field_errors() {
            let reasons: Vec<String> = field_errors
                .iter()
                .map(|fe| fe.code.to_string())
                .collect();
            err = err.with_detail(field.to_string(), serde_json::json!(reasons));
        }
        err
    })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new();
    }
    let origins: Vec<_> = allowed_origins
        .iter()
        .filter_map(|o| o.parse::<http::HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// The single adapter that completes the error envelope: every 4xx/5xx JSON
/// body produced by [`shared::error::AppError`] gets the request id from the
/// `x-request-id` header stamped in.
async fn inject_request_id(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(shared::headers::REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = next.run(request).await;
    if !(response.status().is_client_error() || response.status().is_server_error()) {
        return response;
    }
    let Some(request_id) = request_id else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(mut value) if value.is_object() && value.get("code").is_some() => {
            value["requestId"] = serde_json::Value::String(request_id);
            let rewritten =
                serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec());
            // Length changed; let hyper recompute it
            parts.headers.remove(http::header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(rewritten))
        }
        _ => Response::from_parts(parts, Body::from(bytes)),
    }
}
