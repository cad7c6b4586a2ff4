use axum::{Router, routing::get};
use crate::{AppState, controllers::quotes_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/quotes", get(quotes_controller::get_quotes))
        .route("/quotes/stats", get(quotes_controller::get_quote_stats))
}
