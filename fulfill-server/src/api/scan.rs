//! 扫码路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /sessions/{session_id}/scan | POST | 处理一次扫码 |
//!
//! The handler resolves the code, feeds the session state machine under
//! its lock, and enqueues the produced side effect for the fulfillment
//! worker. The HTTP reply never waits for the ERP or the printer.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::ServerState;
use crate::fulfillment::FulfillJob;
use crate::picking::{ScanOutcome, SessionPhase, SideEffect};
use crate::utils::{AppError, AppResponse, AppResult, ok_with_message};

pub fn router() -> Router<ServerState> {
    Router::new().route("/sessions/{session_id}/scan", post(scan))
}

#[derive(Deserialize)]
pub struct ScanRequest {
    /// Raw scanned code as read by the barcode gun
    pub code: String,
}

#[derive(Serialize)]
pub struct ScanResponse {
    /// Machine-readable outcome tag
    pub outcome: &'static str,
    pub pack: Option<String>,
    pub pack_complete: bool,
    /// Distinct product descriptions still pending in the pack
    pub remaining: Vec<String>,
    pub session_phase: SessionPhase,
    pub pending_units: usize,
}

async fn scan(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    Json(req): Json<ScanRequest>,
) -> AppResult<Json<AppResponse<ScanResponse>>> {
    let Some(session) = state.sessions.get(&session_id) else {
        return Err(AppError::not_found(format!(
            "Sesión {session_id} no encontrada"
        )));
    };

    let resolved = state.resolver.resolve(&req.code).await?;

    let (result, phase, pending) = {
        let mut session = session.lock().await;
        let result = session.scan(&req.code, resolved.as_ref(), Utc::now());
        (result, session.phase(), session.pending_count())
    };

    // A completed session has nothing left to scan; drop it from the
    // registry so the map does not grow for the life of the process
    if phase == SessionPhase::Completed {
        state.sessions.remove(&session_id);
    }

    dispatch_side_effect(&state, result.side_effect).await;

    let (outcome, pack, pack_complete, remaining) = describe_outcome(&result.outcome);
    let message = result.outcome.message();

    Ok(ok_with_message(
        ScanResponse {
            outcome,
            pack,
            pack_complete,
            remaining,
            session_phase: phase,
            pending_units: pending,
        },
        message,
    ))
}

/// Turn the scan side effect into a fulfillment job and enqueue it
async fn dispatch_side_effect(state: &ServerState, side_effect: SideEffect) {
    match side_effect {
        SideEffect::None => {}
        SideEffect::Fulfill {
            pack,
            order_id,
            item_index,
            sku,
            barcode,
            unit_index,
            description,
            shipping_ref,
        } => {
            let depot = match state.store.get_assignment(&order_id, item_index) {
                Ok(Some(record)) => record.depot,
                Ok(None) => None,
                Err(e) => {
                    error!(order_id = %order_id, error = %e, "Failed to load assignment for debit");
                    None
                }
            };

            let Some(depot) = depot else {
                // An unassigned unit can still be picked physically, but
                // there is no depot to debit from
                error!(order_id = %order_id, item_index, "Picked unit has no assigned depot, skipping debit");
                return;
            };

            let code = if barcode.is_empty() { sku.clone() } else { barcode };
            state
                .enqueue_fulfill(FulfillJob {
                    pack,
                    order_id,
                    sku,
                    code,
                    unit_index,
                    depot: Some(depot),
                    description,
                    shipping_ref,
                })
                .await;
        }
        SideEffect::ReprintLabel { pack, shipping_ref } => {
            state
                .enqueue_fulfill(FulfillJob {
                    pack: pack.clone(),
                    order_id: String::new(),
                    sku: String::new(),
                    code: String::new(),
                    unit_index: 0,
                    // Print-only: no depot, no debit
                    depot: None,
                    description: format!("Reimpresión {pack}"),
                    shipping_ref: Some(shipping_ref),
                })
                .await;
        }
    }
}

fn describe_outcome(
    outcome: &ScanOutcome,
) -> (&'static str, Option<String>, bool, Vec<String>) {
    match outcome {
        ScanOutcome::Matched {
            pack,
            pack_complete,
            remaining,
            ..
        } => (
            "matched",
            Some(pack.to_string()),
            *pack_complete,
            remaining.clone(),
        ),
        ScanOutcome::Reprint { pack } => ("reprint", Some(pack.to_string()), true, vec![]),
        ScanOutcome::ReprintTooSoon { pack, .. } => {
            ("reprint_too_soon", Some(pack.to_string()), true, vec![])
        }
        ScanOutcome::NotFound { .. } => ("not_found", None, false, vec![]),
        ScanOutcome::PossibleMismatch { .. } => ("possible_mismatch", None, false, vec![]),
        ScanOutcome::SessionClosed => ("session_closed", None, false, vec![]),
    }
}
