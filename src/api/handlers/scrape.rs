use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::AppError;
use crate::services::RunReport;
use crate::AppState;

/// ANY /scrape-heb-prices: run one scrape batch and report its summary.
///
/// `OPTIONS` is a no-op. Every other method starts a run.
pub async fn trigger(State(state): State<AppState>, method: Method) -> Result<Response, AppError> {
    if method == Method::OPTIONS {
        return Ok((StatusCode::OK, "ok").into_response());
    }

    let scraper = state.scraper()?;

    let Ok(guard) = Arc::clone(&state.run_guard).try_lock_owned() else {
        return Err(AppError::Conflict(
            "A price scrape run is already in progress".into(),
        ));
    };

    // The run owns the guard and outlives the request if the caller goes away.
    let run = tokio::spawn(async move {
        let _guard = guard;
        scraper.run().await
    });

    let report = run
        .await
        .map_err(|e| anyhow::anyhow!("price scrape task failed: {e}"))?
        .map_err(|e| {
            tracing::error!(run_id = %e.run_id, error = %e, "Price scrape aborted");
            AppError::BatchFetch { details: e.details }
        })?;

    let body = match report {
        RunReport::NoWork { run_id, .. } => json!({
            "message": "No products to scrape",
            "processed": 0,
            "run_id": run_id,
        }),
        RunReport::Completed(s) => json!({
            "status": "completed",
            "run_id": s.run_id,
            "processed": s.processed,
            "matched": s.matched,
            "not_found": s.not_found,
            "alerts_created": s.alerts_created,
            "errors": s.errors,
            "total_products_in_batch": s.total_products_in_batch,
            "log_folder": s.log_folder,
            "message": format!(
                "Processed {} products: {} matched, {} not found, {} alerts created, {} errors",
                s.processed, s.matched, s.not_found, s.alerts_created, s.errors
            ),
        }),
    };

    Ok((StatusCode::OK, Json(body)).into_response())
}
