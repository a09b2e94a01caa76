//! Endpoint URL assembly.

/// Join a configured base URL and an endpoint path with exactly one slash.
///
/// ```
/// use goblin_chat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.hunyuan.cloud.tencent.com/v1/", "/chat/completions"),
///     "https://api.hunyuan.cloud.tencent.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{base}/{endpoint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slashes_are_normalized_on_both_sides() {
        for (base, endpoint) in [
            ("http://localhost:8080/v1", "chat/completions"),
            ("http://localhost:8080/v1/", "chat/completions"),
            ("http://localhost:8080/v1///", "/chat/completions"),
            ("http://localhost:8080/v1", "///chat/completions"),
        ] {
            assert_eq!(
                construct_api_url(base, endpoint),
                "http://localhost:8080/v1/chat/completions",
                "base={base:?} endpoint={endpoint:?}"
            );
        }
    }
}
