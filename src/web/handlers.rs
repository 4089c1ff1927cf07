use axum::{
    Json,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
};

use super::{
    Result, WebError,
    models::{ApiMessage, ApiResponse, CountQuery, ItemCount, ItemRequest},
    state::AppState,
};
use crate::core::DocumentId;
use crate::document::Item;

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5000;

pub async fn healthcheck() -> Json<ApiResponse<ApiMessage>> {
    Json(ApiResponse {
        data: ApiMessage {
            message: "ok".to_string(),
        },
    })
}

/// Open items
pub async fn list_items(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Item>>>> {
    let query = state.items.query().field_eq("completed", false);
    let items = state.items.run_query(query).await?;
    Ok(Json(ApiResponse { data: items }))
}

pub async fn count_items(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<CountQuery>,
) -> Result<Json<ApiResponse<ItemCount>>> {
    let mut query = state.items.query();
    if let Some(completed) = params.completed {
        query = query.field_eq("completed", completed);
    }

    let count = state.items.run_count(query).await?;
    Ok(Json(ApiResponse {
        data: ItemCount { count },
    }))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<ItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Item>>)> {
    validate_item_request(&payload)?;

    let item = state
        .items
        .add(payload.into_item(DocumentId::EMPTY))
        .await?
        .ok_or_else(|| WebError::Internal("item could not be stored".to_string()))?;

    Ok((StatusCode::CREATED, Json(ApiResponse { data: item })))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Item>>> {
    let id = parse_id(&id)?;
    let item = state
        .items
        .get(id)
        .await?
        .ok_or_else(|| WebError::NotFound("item not found".to_string()))?;

    Ok(Json(ApiResponse { data: item }))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ItemRequest>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    validate_item_request(&payload)?;

    state.items.update(payload.into_item(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    if state.items.delete(id).await?.is_none() {
        return Err(WebError::NotFound("item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<DocumentId> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(WebError::Input("id must not be empty".to_string()));
    }

    let id = raw
        .parse::<DocumentId>()
        .map_err(|_| WebError::Input(format!("'{}' is not a valid item id", raw)))?;
    if id.is_empty() {
        return Err(WebError::Input("id must not be empty".to_string()));
    }
    Ok(id)
}

fn validate_item_request(payload: &ItemRequest) -> Result<()> {
    if payload.name.trim().is_empty() {
        return Err(WebError::Input("name must not be blank".to_string()));
    }
    if payload.name.len() > MAX_NAME_LEN {
        return Err(WebError::Input(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if let Some(description) = payload.description.as_deref()
        && description.len() > MAX_DESCRIPTION_LEN
    {
        return Err(WebError::Input(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(())
}
