//! Cookie helper for clients that cannot set cookies themselves

use super::types::{CookieResponse, SetCookieQuery};
use crate::enrich::USER_ID_COOKIE;
use axum::{extract::Query, response::Json};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use tracing::debug;

/// Set the `user_id` cookie to the given value
pub async fn set_cookie(
    jar: CookieJar,
    Query(query): Query<SetCookieQuery>,
) -> (CookieJar, Json<CookieResponse>) {
    debug!("Setting {} cookie", USER_ID_COOKIE);

    let cookie = Cookie::build((USER_ID_COOKIE, query.user_id.clone()))
        .path("/")
        .build();

    (
        jar.add(cookie),
        Json(CookieResponse {
            message: "Cookie set".to_string(),
            value: query.user_id,
        }),
    )
}
