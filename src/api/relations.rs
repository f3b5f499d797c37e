use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{
    partition_by_balance, relation_doc_id, Amount, CurrencyCode, Relation, UserId,
};
use crate::error::AppError;
use crate::store::{collections, fetch_typed};

#[derive(Debug, Deserialize)]
pub struct RelationsQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSummary {
    pub counterparty: String,
    pub balance: Amount,
    pub last_interacted_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsResponse {
    pub currency: String,
    /// Counterparties who owe the user.
    pub positive: Vec<RelationSummary>,
    /// Counterparties the user owes.
    pub negative: Vec<RelationSummary>,
}

fn summarize(relation: &Relation, currency: &CurrencyCode) -> RelationSummary {
    RelationSummary {
        counterparty: relation.counterparty.as_str().to_string(),
        balance: relation.balance(currency),
        last_interacted_ms: relation.last_interacted.as_i64(),
    }
}

pub async fn get_relations(
    Path(user): Path<String>,
    Query(params): Query<RelationsQuery>,
    State(state): State<AppState>,
) -> Result<Json<RelationsResponse>, AppError> {
    let user = UserId::new(user);
    let currency = params
        .currency
        .map(CurrencyCode::new)
        .unwrap_or_else(|| CurrencyCode::new("USD"));

    let prefix = format!("{}:", user.as_str());
    let documents = state
        .store
        .list(collections::RELATIONS, &prefix)
        .await?;

    let mut relations = Vec::with_capacity(documents.len());
    for (_, doc) in documents {
        let relation: Relation = serde_json::from_value(doc.body)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        relations.push(relation);
    }

    let partitioned = partition_by_balance(relations, &currency);
    Ok(Json(RelationsResponse {
        currency: currency.as_str().to_string(),
        positive: partitioned
            .positive
            .iter()
            .map(|r| summarize(r, &currency))
            .collect(),
        negative: partitioned
            .negative
            .iter()
            .map(|r| summarize(r, &currency))
            .collect(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub currency: String,
    pub balance: Amount,
}

pub async fn get_balance(
    Path((user, counterparty)): Path<(String, String)>,
    Query(params): Query<RelationsQuery>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, AppError> {
    let user = UserId::new(user);
    let counterparty = UserId::new(counterparty);
    let currency = params
        .currency
        .map(CurrencyCode::new)
        .unwrap_or_else(|| CurrencyCode::new("USD"));

    let id = relation_doc_id(&user, &counterparty);
    let relation =
        fetch_typed::<Relation>(state.store.as_ref(), collections::RELATIONS, &id).await?;

    // An absent relation reads as a zero balance; lookups never fail.
    let balance = relation
        .map(|(r, _)| r.balance(&currency))
        .unwrap_or_else(Amount::zero);

    Ok(Json(BalanceResponse {
        currency: currency.as_str().to_string(),
        balance,
    }))
}
