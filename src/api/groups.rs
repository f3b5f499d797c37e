use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::api::AppState;
use crate::domain::{Amount, Group};
use crate::error::AppError;
use crate::store::{collections, fetch_typed};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    /// user id -> currency code -> net position within the group.
    pub balances: BTreeMap<String, BTreeMap<String, Amount>>,
}

pub async fn get_group(
    Path(group): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GroupResponse>, AppError> {
    let fetched =
        fetch_typed::<Group>(state.store.as_ref(), collections::GROUPS, &group).await?;

    let Some((group, _)) = fetched else {
        return Err(AppError::NotFound(format!("group {} not found", group)));
    };

    let balances = group
        .balances
        .into_iter()
        .map(|(user, by_currency)| {
            (
                user.0,
                by_currency
                    .into_iter()
                    .map(|(currency, amount)| (currency.0, amount))
                    .collect(),
            )
        })
        .collect();

    Ok(Json(GroupResponse {
        id: group.id.0,
        name: group.name,
        balances,
    }))
}
