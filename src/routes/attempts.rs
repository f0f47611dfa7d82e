use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::attempt_dto::{ResultListQuery, ResultListResponse, ResultResponse, SubmitAttemptPayload},
    error::{Error, Result},
    middleware::auth::Claims,
    AppState,
};

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptPayload>,
) -> Result<impl IntoResponse> {
    let result = state
        .scoring_service
        .score_attempt(claims.user_id()?, test_id, &payload.answers)
        .await?;
    Ok((StatusCode::CREATED, Json(ResultResponse::from(result))))
}

#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ResultListQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let (results, total) = state
        .scoring_service
        .list_results_for_user(claims.user_id()?, page, per_page)
        .await?;

    let total_pages = (total + per_page - 1) / per_page;
    Ok(Json(ResultListResponse {
        items: results.into_iter().map(ResultResponse::from).collect(),
        total,
        page,
        per_page,
        total_pages,
    }))
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let result = state.scoring_service.get_result(id).await?;
    if result.user_id != claims.user_id()? {
        return Err(Error::Forbidden(
            "Results are visible to their owner only".to_string(),
        ));
    }
    Ok(Json(ResultResponse::from(result)))
}
