use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

use crate::{
    AppState,
    error::StoreError,
    models::{Alert, Owner},
    services::alerts_service::{self, AlertUpdate, AlertsError, NewAlert},
};

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

fn bad_id() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad id" }))).into_response()
}

fn error_response(e: AlertsError) -> Response {
    match e {
        AlertsError::Invalid(fields) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "invalid alert", "fields": fields })),
        )
            .into_response(),
        AlertsError::NotFound => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": "alert not found" }))).into_response()
        }
        AlertsError::WrongStatus(..) => {
            (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response()
        }
        AlertsError::Store(StoreError::Stale(_)) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "alert was changed concurrently, reload and retry" })),
        )
            .into_response(),
        AlertsError::Store(err) => {
            tracing::error!(error = %err, "alert store failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("db error: {err}") })),
            )
                .into_response()
        }
    }
}

pub fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "owner_id": a.owner_id.to_hex(),
        "symbol": a.symbol,
        "operator": a.operator,
        "threshold": a.threshold,
        "condition": a.condition_description(),
        "status": a.status,
        "frequency": a.frequency,
        "cooldown_minutes": a.cooldown_minutes,
        "max_triggers": a.max_triggers,
        "trigger_count": a.trigger_count,
        "last_triggered_at": a.last_triggered_at,
        "notification_channels": a.notification_channels,
        "created_at": a.created_at,
        "updated_at": a.updated_at,
    })
}

fn alert_ok(status: StatusCode, a: &Alert) -> Response {
    (status, Json(alert_json(a))).into_response()
}

// GET /alerts
pub async fn get_alerts(State(state): State<AppState>, owner: Option<Extension<Owner>>) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };

    match alerts_service::list_owner_alerts(state.store.as_ref(), o.id).await {
        Ok(alerts) => {
            let items: Vec<serde_json::Value> = alerts.iter().map(alert_json).collect();
            (StatusCode::OK, Json(json!({ "alerts": items }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

// POST /alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    owner: Option<Extension<Owner>>,
    Json(input): Json<NewAlert>,
) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };

    let default_cooldown = state.settings.default_cooldown_minutes;
    match alerts_service::create_alert(state.store.as_ref(), o.id, input, default_cooldown).await {
        Ok(a) => alert_ok(StatusCode::CREATED, &a),
        Err(e) => error_response(e),
    }
}

// PUT /alerts/:id
pub async fn put_update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    owner: Option<Extension<Owner>>,
    Json(update): Json<AlertUpdate>,
) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::update_alert(state.store.as_ref(), o.id, oid, update).await {
        Ok(a) => alert_ok(StatusCode::OK, &a),
        Err(e) => error_response(e),
    }
}

// POST /alerts/:id/pause
pub async fn post_pause_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    owner: Option<Extension<Owner>>,
) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::pause_alert(state.store.as_ref(), o.id, oid).await {
        Ok(a) => alert_ok(StatusCode::OK, &a),
        Err(e) => error_response(e),
    }
}

// POST /alerts/:id/resume
pub async fn post_resume_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    owner: Option<Extension<Owner>>,
) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::resume_alert(state.store.as_ref(), o.id, oid).await {
        Ok(a) => alert_ok(StatusCode::OK, &a),
        Err(e) => error_response(e),
    }
}

// DELETE /alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    owner: Option<Extension<Owner>>,
) -> Response {
    let Some(Extension(o)) = owner else {
        return unauthorized();
    };
    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::delete_alert(state.store.as_ref(), o.id, oid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

// POST /alerts/evaluate
pub async fn post_evaluate(State(state): State<AppState>) -> Response {
    match state.engine.evaluate_all().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "evaluation cycle failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
