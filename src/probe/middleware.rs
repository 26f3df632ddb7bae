//! Pass-through probe middleware.
//!
//! Answers the configured method + path (and the details path, if any) and
//! hands every other request to the next service unchanged.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::Response,
};

use crate::probe::handlers::{details_response, ProbeState};

pub async fn probe_middleware(
    State(state): State<ProbeState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if path == state.config.path
        && request
            .method()
            .as_str()
            .eq_ignore_ascii_case(&state.config.method)
    {
        return state.respond();
    }

    if *request.method() == Method::GET && state.config.details_path.as_deref() == Some(path) {
        return details_response(&state);
    }

    next.run(request).await
}
