//! Upstream response classifier
//!
//! Decides once, at the boundary, what an upstream response means. The rest
//! of the system only ever sees the resulting tagged union.

use serde_json::Value;

/// What an upstream HTTP response means for the retry controller
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// 2xx with a JSON body; carries the parsed payload
    Success(Value),
    /// 404 whose body contains the cold-start sentinel; worth retrying
    ColdStart,
    /// Any other non-2xx, or a 2xx that is not JSON; retrying will not help
    DefinitiveError,
}

/// Classify one upstream response.
///
/// The sentinel match is a case-insensitive substring check against 404
/// bodies only; it applies regardless of whether the body parses as JSON.
/// Transport failures never reach this function; the caller classifies them
/// before the response exists.
pub fn classify(status: u16, body_text: &str, sentinel: &str) -> Classification {
    if status == 404
        && body_text
            .to_ascii_lowercase()
            .contains(&sentinel.to_ascii_lowercase())
    {
        return Classification::ColdStart;
    }

    if (200..300).contains(&status) {
        match serde_json::from_str::<Value>(body_text) {
            Ok(json) => return Classification::Success(json),
            // 2xx with an unparseable body is a broken upstream contract
            Err(_) => return Classification::DefinitiveError,
        }
    }

    Classification::DefinitiveError
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SENTINEL: &str = "web endpoint is stopped";

    #[test]
    fn test_2xx_json_is_success() {
        let result = classify(200, r#"{"success":true,"data":1}"#, SENTINEL);
        assert_eq!(
            result,
            Classification::Success(json!({"success": true, "data": 1}))
        );
    }

    #[test]
    fn test_404_with_sentinel_is_cold_start() {
        let body = "the invoked WEB ENDPOINT IS STOPPED, try again shortly";
        assert_eq!(classify(404, body, SENTINEL), Classification::ColdStart);
    }

    #[test]
    fn test_404_without_sentinel_is_definitive() {
        assert_eq!(
            classify(404, "no such route", SENTINEL),
            Classification::DefinitiveError
        );
    }

    #[test]
    fn test_500_is_definitive_even_with_sentinel_text() {
        // Sentinel matching is gated on 404; a 500 is a real failure
        let body = "web endpoint is stopped";
        assert_eq!(classify(500, body, SENTINEL), Classification::DefinitiveError);
    }

    #[test]
    fn test_2xx_non_json_is_definitive() {
        assert_eq!(
            classify(200, "<html>oops</html>", SENTINEL),
            Classification::DefinitiveError
        );
    }

    #[test]
    fn test_cold_start_beats_json_parseability() {
        // A JSON 404 body carrying the sentinel still classifies as cold start
        let body = r#"{"error":"The invoked web endpoint is stopped"}"#;
        assert_eq!(classify(404, body, SENTINEL), Classification::ColdStart);
    }
}
