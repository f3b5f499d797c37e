use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Amount, CurrencyCode, UserId};
use crate::error::AppError;
use crate::orchestration::{FailedWrite, SettleRequest, SettlementReceipt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementBody {
    pub payer_id: String,
    pub payee_id: String,
    pub amount: Amount,
    pub currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub settlement_id: String,
    pub success: bool,
    pub fully_settled_transaction_ids: Vec<String>,
    pub partial_transaction_id: Option<String>,
    pub leftover_credit: Amount,
    pub failed_writes: Vec<FailedWriteBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWriteBody {
    pub collection: String,
    pub id: String,
    pub error: String,
    pub conflict: bool,
}

fn parse_user_id(field: &str, input: &str) -> Result<UserId, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(UserId::new(trimmed))
}

pub async fn post_settlement(
    State(state): State<AppState>,
    Json(body): Json<SettlementBody>,
) -> Result<Json<SettlementResponse>, AppError> {
    let payer = parse_user_id("payerId", &body.payer_id)?;
    let payee = parse_user_id("payeeId", &body.payee_id)?;
    if body.currency.trim().is_empty() {
        return Err(AppError::BadRequest("currency must not be empty".to_string()));
    }

    let receipt = state
        .coordinator
        .settle(SettleRequest {
            payer,
            payee,
            amount: body.amount,
            currency: CurrencyCode::new(body.currency),
        })
        .await?;

    Ok(Json(receipt.into()))
}

impl From<SettlementReceipt> for SettlementResponse {
    fn from(receipt: SettlementReceipt) -> Self {
        SettlementResponse {
            settlement_id: receipt.settlement_id,
            success: receipt.success,
            fully_settled_transaction_ids: receipt
                .fully_settled_transaction_ids
                .into_iter()
                .map(|id| id.0)
                .collect(),
            partial_transaction_id: receipt.partial_transaction_id.map(|id| id.0),
            leftover_credit: receipt.leftover_credit,
            failed_writes: receipt.failed_writes.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<FailedWrite> for FailedWriteBody {
    fn from(failed: FailedWrite) -> Self {
        FailedWriteBody {
            collection: failed.collection,
            id: failed.id,
            error: failed.error,
            conflict: failed.conflict,
        }
    }
}
