//! Request-context enrichment from cookies

use axum_extra::extract::CookieJar;
use parley_core::{ErrorContext, ParleyError, ParleyResult, RequestConfig};
use parley_rag::ConfigEnricher;

/// Cookie carrying the caller's user id
pub const USER_ID_COOKIE: &str = "user_id";

/// Copy `config`, setting `configurable.user_id` from the `user_id` cookie.
///
/// Any client-supplied user id is replaced. The value is not validated here;
/// the history resolver checks it when the log is resolved.
pub fn enrich(config: &RequestConfig, cookies: &CookieJar) -> ParleyResult<RequestConfig> {
    let user_id = cookies
        .get(USER_ID_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ParleyError::MissingIdentity {
            message: "No user id found. Please set a cookie named 'user_id'. \n\
                      If you use Swagger UI use /set-cookie/ GET API to set it."
                .to_string(),
            context: ErrorContext::new("enrich")
                .with_operation("read_cookie")
                .with_suggestion("Call GET /set-cookie/?user_id=<value> first"),
        })?;

    Ok(config.clone().with_user_id(user_id))
}

/// [`ConfigEnricher`] reading the identity from a request's cookies
pub struct CookieEnricher<'a> {
    cookies: &'a CookieJar,
}

impl<'a> CookieEnricher<'a> {
    pub fn new(cookies: &'a CookieJar) -> Self {
        Self { cookies }
    }
}

impl ConfigEnricher for CookieEnricher<'_> {
    fn enrich(&self, config: &RequestConfig) -> ParleyResult<RequestConfig> {
        enrich(config, self.cookies)
    }
}
