// HTTP boundary
//
// Routing, request parsing, and status-code mapping. No invariant logic
// lives here: the boundary rejects malformed input before any transaction
// begins, and everything else is delegated to the store and the engine.
// The router is built in the library so integration tests can drive it
// without binding a socket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::engine::{self, TransferRequest};
use crate::entities::{Account, Customer, Transfer};
use crate::error::LedgerError;
use crate::store;
use crate::validation;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }
}

/// Error wrapper carrying the variant -> status code mapping.
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            match &self.0 {
                LedgerError::Validation(_)
                | LedgerError::SelfTransfer
                | LedgerError::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub customer_id: Uuid,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

/// Transfer as it appears on the wire (the commit timestamp stays internal).
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
}

impl From<Transfer> for TransferResponse {
    fn from(transfer: Transfer) -> Self {
        Self {
            id: transfer.id,
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /customers
async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<Json<Customer>, ApiError> {
    let name = validation::normalize_customer_name(&payload.name)?;

    let conn = state.db.lock().unwrap();
    let customer = store::create_customer(&conn, &name)?;

    tracing::info!(customer_id = %customer.id, "customer created");
    Ok(Json(customer))
}

/// GET /customers/:id
async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = validation::parse_id(&id)?;
    let conn = state.db.lock().unwrap();
    Ok(Json(store::get_customer(&conn, id)?))
}

/// POST /accounts
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    validation::validate_initial_balance(payload.balance)?;

    let mut conn = state.db.lock().unwrap();
    let account = store::run_atomic(&mut conn, |tx| {
        store::create_account(tx, payload.customer_id, payload.balance)
    })?;

    tracing::info!(account_id = %account.id, customer_id = %account.customer_id, "account created");
    Ok(Json(account))
}

/// GET /accounts/:id
async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let id = validation::parse_id(&id)?;
    let conn = state.db.lock().unwrap();
    Ok(Json(store::get_account(&conn, id)?))
}

/// GET /accounts/:id/balance
async fn get_account_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let id = validation::parse_id(&id)?;
    let conn = state.db.lock().unwrap();
    let account = store::get_account(&conn, id)?;
    Ok(Json(BalanceResponse {
        balance: account.balance,
    }))
}

/// POST /transfers
async fn create_transfer(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    // Boundary validation: bad requests never reach the store. The engine
    // re-checks all of this inside its own transaction.
    validation::validate_amount(payload.amount)?;
    if payload.from_account_id == payload.to_account_id {
        return Err(LedgerError::SelfTransfer.into());
    }

    let request = TransferRequest {
        from_account_id: payload.from_account_id,
        to_account_id: payload.to_account_id,
        amount: payload.amount,
    };

    let mut conn = state.db.lock().unwrap();
    let transfer = match engine::execute(&mut conn, &request) {
        Ok(transfer) => transfer,
        Err(err) => {
            if let LedgerError::InsufficientFunds {
                available,
                requested,
            } = &err
            {
                tracing::warn!(
                    from = %request.from_account_id,
                    %available,
                    %requested,
                    "transfer rejected"
                );
            }
            return Err(err.into());
        }
    };

    tracing::info!(
        transfer_id = %transfer.id,
        from = %transfer.from_account_id,
        to = %transfer.to_account_id,
        amount = %transfer.amount,
        "transfer committed"
    );
    Ok(Json(transfer.into()))
}

/// GET /transfers/:id
async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransferResponse>, ApiError> {
    let id = validation::parse_id(&id)?;
    let conn = state.db.lock().unwrap();
    Ok(Json(store::get_transfer(&conn, id)?.into()))
}

/// GET /transfers/account/:id
async fn list_account_transfers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TransferResponse>>, ApiError> {
    let id = validation::parse_id(&id)?;
    let conn = state.db.lock().unwrap();
    let transfers = store::list_transfers_for_account(&conn, id)?;
    Ok(Json(transfers.into_iter().map(Into::into).collect()))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/customers", post(create_customer))
        .route("/customers/:id", get(get_customer))
        .route("/accounts", post(create_account))
        .route("/accounts/:id", get(get_account))
        .route("/accounts/:id/balance", get(get_account_balance))
        .route("/transfers", post(create_transfer))
        .route("/transfers/:id", get(get_transfer))
        .route("/transfers/account/:id", get(list_account_transfers))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
