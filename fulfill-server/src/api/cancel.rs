//! 取消/重新分配路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /orders/{order_ref}/cancel | POST | 取消当前仓库并重新分配 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};

use crate::clients::ClientError;
use crate::core::ServerState;
use crate::reassign::{CancelError, ReassignOutcome};
use crate::utils::{AppError, AppResponse, AppResult, ok_with_message};

pub fn router() -> Router<ServerState> {
    Router::new().route("/orders/{order_ref}/cancel", post(cancel_order))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    /// Free-text reason written into the note ledger verbatim
    pub reason: String,
}

#[derive(Serialize)]
pub struct CancelResponse {
    /// reassigned | no_stock
    pub outcome: &'static str,
    /// Alias of the depot that was cancelled
    pub from: Option<String>,
    /// Alias of the new winning depot
    pub to: Option<String>,
    /// Remaining quantity at the new depot after the reservation
    pub resultant: Option<i64>,
}

async fn cancel_order(
    State(state): State<ServerState>,
    Path(order_ref): Path<String>,
    Json(req): Json<CancelRequest>,
) -> AppResult<Json<AppResponse<CancelResponse>>> {
    if req.reason.trim().is_empty() {
        return Err(AppError::validation("reason must not be empty"));
    }

    let outcome = state
        .reassigner
        .cancel(&order_ref, req.reason.trim())
        .await
        .map_err(map_cancel_error)?;

    let response = match outcome {
        ReassignOutcome::Reassigned {
            from,
            to,
            resultant,
        } => {
            let catalog = state.assigner.catalog();
            CancelResponse {
                outcome: "reassigned",
                from: from.map(|d| catalog.alias_of(&d)),
                to: Some(catalog.alias_of(&to)),
                resultant: Some(resultant),
            }
        }
        ReassignOutcome::NoStock => CancelResponse {
            outcome: "no_stock",
            from: None,
            to: None,
            resultant: None,
        },
    };

    let message = match response.outcome {
        "reassigned" => format!(
            "Reasignado a {}",
            response.to.as_deref().unwrap_or_default()
        ),
        _ => "Sin stock en ningún depósito".to_string(),
    };

    Ok(ok_with_message(response, message))
}

fn map_cancel_error(e: CancelError) -> AppError {
    match e {
        CancelError::MultiItemPack(_) => AppError::business_rule(e.to_string()),
        CancelError::EmptyOrder(_) | CancelError::Sku(_) => AppError::validation(e.to_string()),
        CancelError::Client(ClientError::Status { status: 404, body }) => {
            AppError::not_found(body)
        }
        CancelError::Client(inner) => AppError::from(inner),
        CancelError::Assign(inner) => AppError::internal(inner.to_string()),
        CancelError::Store(inner) => AppError::from(inner),
    }
}
