//! Request authentication.

/// Attach a bearer credential to an outgoing request.
pub fn add_auth_headers(request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
    request.bearer_auth(api_key.trim())
}
