use axum::extract::{ConnectInfo, Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::trace;
use waypoint_core::{RequestMeta, ShortKey};

use crate::client_ip::client_addr;
use crate::error::Result;
use crate::state::AppState;

/// Answers `302 Found` pointing at the destination of `short_key`.
pub async fn redirect_handler(
    State(state): State<AppState>,
    Path(short_key): Path<String>,
    request: Request,
) -> Result<Response> {
    let key = ShortKey::new(short_key)?;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let meta = request_meta(request.headers(), peer);

    let destination = state.engine().resolve(&key, meta).await?;
    trace!(key = %key, "Redirecting");

    Ok((StatusCode::FOUND, [(header::LOCATION, destination)]).into_response())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn request_meta(headers: &HeaderMap, peer: Option<SocketAddr>) -> RequestMeta {
    RequestMeta {
        referrer: header_str(headers, header::REFERER),
        user_agent: header_str(headers, header::USER_AGENT),
        client_addr: client_addr(headers, peer),
    }
}
