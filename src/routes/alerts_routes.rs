use axum::{Router, routing::{get, post, put}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/alerts",
            get(alerts_controller::get_alerts).post(alerts_controller::post_create_alert),
        )
        .route("/alerts/evaluate", post(alerts_controller::post_evaluate))
        .route(
            "/alerts/:id",
            put(alerts_controller::put_update_alert).delete(alerts_controller::delete_alert),
        )
        .route("/alerts/:id/pause", post(alerts_controller::post_pause_alert))
        .route("/alerts/:id/resume", post(alerts_controller::post_resume_alert))
}
