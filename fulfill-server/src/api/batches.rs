//! 批次路由 - 加载订单、分配仓库、开启拣货会话
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /batches | POST | 加载批次，逐项分配仓库，创建拣货会话 |
//! | /batches/{session_id} | GET | 查询会话状态 |
//! | /batches/{session_id} | DELETE | 放弃会话 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use shared::models::{ItemStatus, Order};
use shared::note::NO_STOCK_NOTE;
use shared::sku::Sku;
use std::collections::HashSet;
use tracing::warn;

use crate::assignment::Assignment;
use crate::clients::ClientError;
use crate::core::ServerState;
use crate::picking::PickSession;
use crate::utils::{AppError, AppResponse, AppResult, ok};

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/batches", post(load_batch))
        .route(
            "/batches/{session_id}",
            get(session_status).delete(abandon_session),
        )
}

#[derive(Deserialize)]
pub struct LoadBatchRequest {
    /// Marketplace order identifiers selected by the operator's filter
    pub order_ids: Vec<String>,
}

/// Per-item assignment outcome shown to the operator
#[derive(Serialize)]
pub struct ItemAssignment {
    pub order_id: String,
    pub item_index: u32,
    pub sku: String,
    /// Winning depot alias; `None` when every depot is exhausted
    pub depot: Option<String>,
    /// Remaining quantity at the depot after the reservation
    pub resultant: Option<i64>,
}

#[derive(Serialize)]
pub struct LoadBatchResponse {
    pub session_id: String,
    pub units: usize,
    pub assignments: Vec<ItemAssignment>,
}

/// 加载批次：取订单 → 逐项分配仓库 → 播种拣货会话
async fn load_batch(
    State(state): State<ServerState>,
    Json(req): Json<LoadBatchRequest>,
) -> AppResult<Json<AppResponse<LoadBatchResponse>>> {
    if req.order_ids.is_empty() {
        return Err(AppError::validation("order_ids must not be empty"));
    }

    let mut batch: Vec<Order> = Vec::with_capacity(req.order_ids.len());
    for order_id in &req.order_ids {
        let order = state.marketplace.get_order(order_id).await.map_err(|e| match e {
            ClientError::Status { status: 404, .. } => {
                AppError::not_found(format!("Orden {order_id} no encontrada"))
            }
            other => AppError::from(other),
        })?;
        batch.push(order);
    }

    let mut assignments = Vec::new();
    let mut noted_orders: HashSet<String> = HashSet::new();
    for order in &batch {
        for (item_index, item) in order.items.iter().enumerate() {
            // Only promised-but-unfulfilled items get a depot decision
            if !matches!(item.status, ItemStatus::Unassigned | ItemStatus::Assigned) {
                continue;
            }

            let sku = Sku::parse(&item.sku)
                .map_err(|e| AppError::validation(format!("{}: {e}", order.id)))?;
            let decision = state
                .assigner
                .assign(
                    &sku,
                    item.quantity.max(1),
                    &order.id,
                    item_index as u32,
                    &HashSet::new(),
                )
                .await
                .map_err(|e| AppError::internal(e.to_string()))?;

            let (depot, resultant) = match &decision {
                Assignment::Assigned {
                    depot, resultant, ..
                } => (Some(state.catalog.alias_of(depot)), *resultant),
                Assignment::Exhausted { .. } => {
                    // Terminal state lives on the order note so later
                    // runs do not re-attempt the assignment
                    if !order.note.contains(NO_STOCK_NOTE) && noted_orders.insert(order.id.clone())
                    {
                        let note = if order.note.trim().is_empty() {
                            NO_STOCK_NOTE.to_string()
                        } else {
                            format!("{} {}", order.note.trim(), NO_STOCK_NOTE)
                        };
                        state
                            .marketplace
                            .write_note(&order.id, &note)
                            .await
                            .map_err(AppError::from)?;
                        warn!(order_id = %order.id, sku = %item.sku, "Item exhausted, terminal note written");
                    }
                    (None, None)
                }
            };

            assignments.push(ItemAssignment {
                order_id: order.id.clone(),
                item_index: item_index as u32,
                sku: item.sku.clone(),
                depot,
                resultant,
            });
        }
    }

    let session = PickSession::seed(
        &batch,
        &state.resolver,
        &state.catalog,
        state.config.reprint_cooldown_secs,
    )
    .await
    .map_err(AppError::from)?;

    let units = session.pending_count();
    let session_id = state.sessions.insert(session);

    Ok(ok(LoadBatchResponse {
        session_id,
        units,
        assignments,
    }))
}

#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub phase: crate::picking::SessionPhase,
    pub pending_units: usize,
    pub picked_units: usize,
}

async fn session_status(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<AppResponse<SessionStatusResponse>>> {
    let Some(session) = state.sessions.get(&session_id) else {
        return Err(AppError::not_found(format!(
            "Sesión {session_id} no encontrada"
        )));
    };

    let session = session.lock().await;
    Ok(ok(SessionStatusResponse {
        session_id,
        phase: session.phase(),
        pending_units: session.pending_count(),
        picked_units: session.picked_count(),
    }))
}

/// 放弃会话：未拣单元保持未拣状态
async fn abandon_session(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<AppResponse<()>>> {
    let Some(session) = state.sessions.get(&session_id) else {
        return Err(AppError::not_found(format!(
            "Sesión {session_id} no encontrada"
        )));
    };

    session.lock().await.abandon();
    state.sessions.remove(&session_id);

    Ok(ok(()))
}
