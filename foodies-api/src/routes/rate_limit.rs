use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

use foodies_shared::errors::{AppError, ErrorCode};

use crate::AppState;

/// Client key: first `X-Forwarded-For` hop, else the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fixed-window limit per client over `rate_limit_window_secs`.
///
/// Keys: `rl:{client}`. A Redis failure lets the request through.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(redis) = state.redis.as_ref().filter(|_| state.config.rate_limit_enabled) else {
        return next.run(req).await;
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = format!("rl:{}", client_key(req.headers(), peer));

    match redis
        .rate_limit_check(&key, state.config.rate_limit_max, state.config.rate_limit_window_secs)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(key = %key, "rate limit exceeded");
            AppError::new(
                ErrorCode::RateLimited,
                "Too many requests, please try again later.",
            )
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "rate limit check failed");
            next.run(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_ip() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(client_key(&HeaderMap::new(), Some(peer)), "192.0.2.1");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
