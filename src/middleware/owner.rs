use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use mongodb::bson::oid::ObjectId;

use crate::models::Owner;

/// Set by the upstream gateway once it has authenticated the caller.
pub const OWNER_HEADER: &str = "x-owner-id";

fn owner_from_headers(headers: &HeaderMap) -> Option<Owner> {
    let raw = headers.get(OWNER_HEADER)?.to_str().ok()?;
    let id = ObjectId::parse_str(raw.trim()).ok()?;
    Some(Owner { id })
}

pub async fn inject_owner(mut req: Request, next: Next) -> Response {
    if let Some(owner) = owner_from_headers(req.headers()) {
        req.extensions_mut().insert(owner);
    }

    next.run(req).await
}
