use actix_web::http::header;
use actix_web::{web, HttpRequest};
use serde::Deserialize;

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// API token from `Authorization: Bearer …`, falling back to `?token=…`.
///
/// Browsers cannot set headers on a websocket upgrade, hence the query form.
pub fn request_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().token)
        .filter(|token| !token.is_empty())
}
