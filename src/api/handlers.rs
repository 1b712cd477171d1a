// src/api/handlers.rs

use crate::api::{auth, types::*, ApiState};
use crate::core::types::RunOutcome;
use crate::rag::{DocType, RetrievalFilters};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

/// POST /api/v1/ask — Run one question through the engine.
pub async fn ask(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<AskRequest>,
) -> Result<Json<RunOutcome>, (StatusCode, Json<ErrorResponse>)> {
    auth::check_auth(state.token.as_deref(), &headers)?;

    if body.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Question cannot be empty".into(),
            }),
        ));
    }

    let filters = RetrievalFilters {
        year: body.year.clone(),
        doc_type: body.doc_type.as_deref().and_then(DocType::from_str_lenient),
    };

    match state.engine.invoke_with_filters(&body.question, filters).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) if e.is_fatal() => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
        Err(e) => {
            tracing::error!("ask request failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// GET /api/v1/tools — Tool catalog.
pub async fn list_tools(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ToolInfo>>, (StatusCode, Json<ErrorResponse>)> {
    auth::check_auth(state.token.as_deref(), &headers)?;

    let tools = state
        .registry
        .descriptions()
        .into_iter()
        .map(|(id, description)| ToolInfo { id, description })
        .collect();
    Ok(Json(tools))
}

/// GET /api/v1/runs — Recent run history, newest first.
pub async fn list_runs(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<RunSummary>>, (StatusCode, Json<ErrorResponse>)> {
    auth::check_auth(state.token.as_deref(), &headers)?;

    let Some(ref store) = state.store else {
        return Ok(Json(Vec::new()));
    };

    let rows = {
        let store = store.lock().map_err(|_| internal("history store poisoned"))?;
        store
            .list_runs(50)
            .map_err(|e| internal(&format!("history query failed: {e}")))?
    };

    let runs = rows
        .into_iter()
        .map(|r| RunSummary {
            run_id: r.run_id,
            question: r.question,
            terminated_by: r.terminated_by,
            iterations: r.iterations,
            final_score: r.final_score,
            elapsed_ms: r.elapsed_ms,
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(runs))
}

/// GET /api/v1/health — Simple health check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn internal(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}
