//! Recognition client — ships a canvas snapshot plus the current variable
//! bindings to the remote service and parses the structured response.
//!
//! The call is blocking and is always made from a background worker thread
//! (see `app.rs`); the UI thread never waits on the network.

use reqwest::blocking::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Fallback endpoint when `MATHBOARD_API_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8900";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolve the service base URL from the environment, once at startup.
pub fn service_base_url() -> String {
    let url = std::env::var("MATHBOARD_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    url.trim_end_matches('/').to_string()
}

// ============================================================================
// Wire types
// ============================================================================

/// One unit of the recognition response.  `assign == true` means the item
/// must be merged into the variable bindings before any display happens.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct RecognizedItem {
    pub expr: String,
    pub result: String,
    #[serde(default)]
    pub assign: bool,
}

/// `POST {base}/calculate` request body.
#[derive(serde::Serialize)]
struct CalculateRequest<'a> {
    image: &'a str,
    dict_of_vars: &'a HashMap<String, String>,
}

/// Response envelope.  The service also sends `message`/`status` fields;
/// they carry no information the client needs and are ignored.
#[derive(serde::Deserialize)]
struct CalculateResponse {
    data: Vec<RecognizedItem>,
}

// ============================================================================
// Client
// ============================================================================

pub struct RecognitionClient {
    client: Client,
    base_url: String,
}

impl RecognitionClient {
    pub fn new(base_url: String) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("mathboard recognition client")
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one recognition request.  Blocks until the service responds.
    ///
    /// Any failure (connect error, non-success status, malformed payload)
    /// comes back as a single error string; the caller drops the run whole,
    /// so no partial state ever leaks out of a failed response.
    pub fn submit(
        &self,
        image_data_url: &str,
        bindings: &HashMap<String, String>,
    ) -> Result<Vec<RecognizedItem>, String> {
        let body = CalculateRequest {
            image: image_data_url,
            dict_of_vars: bindings,
        };
        let response = self
            .client
            .post(format!("{}/calculate", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| format!("recognition request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("recognition service returned {}", status));
        }

        let parsed: CalculateResponse = response
            .json()
            .map_err(|e| format!("malformed recognition response: {}", e))?;
        Ok(parsed.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn request_body_uses_the_service_field_names() {
        let mut bindings = HashMap::new();
        bindings.insert("x".to_string(), "5".to_string());
        let body = CalculateRequest {
            image: "data:image/png;base64,AAAA",
            dict_of_vars: &bindings,
        };
        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["image"], "data:image/png;base64,AAAA");
        assert_eq!(json["dict_of_vars"]["x"], "5");
    }

    #[test]
    fn response_parsing_ignores_envelope_extras() {
        let raw = r#"{
            "message": "Image processed",
            "status": "success",
            "data": [
                {"expr": "2 + 2", "result": "4", "assign": false},
                {"expr": "x", "result": "5", "assign": true},
                {"expr": "y", "result": "7"}
            ]
        }"#;
        let parsed: CalculateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 3);
        assert!(parsed.data[1].assign);
        // `assign` defaults to false when the service omits it
        assert!(!parsed.data[2].assign);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        std::env::set_var("MATHBOARD_API_URL", "http://example.test:9000/");
        assert_eq!(service_base_url(), "http://example.test:9000");
        std::env::remove_var("MATHBOARD_API_URL");
        assert_eq!(service_base_url(), DEFAULT_BASE_URL);
    }

    /// Serve exactly one canned HTTP response on an ephemeral port.
    fn one_shot_server(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            // Drain the request: headers, then content-length bytes of body.
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let (mut header_end, mut content_len) = (None, 0usize);
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if header_end.is_none() {
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        header_end = Some(pos + 4);
                        let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                        for line in headers.lines() {
                            if let Some(v) = line.strip_prefix("content-length:") {
                                content_len = v.trim().parse().unwrap_or(0);
                            }
                        }
                    }
                }
                if let Some(end) = header_end {
                    if buf.len() >= end + content_len {
                        break;
                    }
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        });
        format!("http://{}", addr)
    }

    #[test]
    fn submit_parses_a_successful_response() {
        let base = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"message":"ok","data":[{"expr":"1+1","result":"2","assign":false}],"status":"success"}"#,
        );
        let client = RecognitionClient::new(base).unwrap();
        let items = client.submit("data:image/png;base64,AA==", &HashMap::new()).unwrap();
        assert_eq!(
            items,
            vec![RecognizedItem {
                expr: "1+1".to_string(),
                result: "2".to_string(),
                assign: false,
            }]
        );
    }

    #[test]
    fn submit_surfaces_a_server_error() {
        let base = one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"detail":"boom"}"#);
        let client = RecognitionClient::new(base).unwrap();
        let err = client
            .submit("data:image/png;base64,AA==", &HashMap::new())
            .unwrap_err();
        assert!(err.contains("500"), "unexpected error: {}", err);
    }

    #[test]
    fn submit_surfaces_a_malformed_payload() {
        let base = one_shot_server("HTTP/1.1 200 OK", "not json at all");
        let client = RecognitionClient::new(base).unwrap();
        let err = client
            .submit("data:image/png;base64,AA==", &HashMap::new())
            .unwrap_err();
        assert!(err.contains("malformed"), "unexpected error: {}", err);
    }
}
