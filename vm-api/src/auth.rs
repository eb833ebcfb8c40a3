use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;

/// Principal established by the fronting auth proxy.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub username: String,
}

fn header_value(req: &Request, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| req.headers().get(*name))
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// Auth middleware - extracts the principal from proxy headers
///
/// `X-VM-User` is set by the auth proxy in production, `X-Forwarded-User` by
/// oauth2-proxy, and `X-User` is accepted for local development. Requests
/// without a usable principal get 401.
pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let username = header_value(&req, &["x-vm-user", "x-forwarded-user", "x-user"])
        .filter(|name| !name.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    debug!(user = %username, "Authenticated request");
    req.extensions_mut()
        .insert(AuthenticatedUser { username });

    Ok(next.run(req).await)
}
