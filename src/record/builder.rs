//! Record construction.
//!
//! # Responsibilities
//! - Snapshot request metadata before the request is handed on
//! - Snapshot response metadata once the handler is done
//! - Assemble the nested record with timing and body values
//!
//! # Design Decisions
//! - Header names are lowercase; repeated headers are joined with ","
//! - Non UTF-8 header values are decoded lossily
//! - Body values distinguish "not logged", skipped (null) and undecodable
//! - Errors raised while handling the request are newline-joined under
//!   `errors`, an empty string when there were none

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::ConnectInfo,
    http::{header, request, HeaderMap, Method, Response, StatusCode, Version},
};
use serde_json::{json, Map, Value};

use crate::http::body::decode_utf8;
use crate::record::Record;
use crate::rules::FieldMap;

pub const NOT_LOGGED: &str = "not logged";
pub const UNDECODABLE: &str = "error decoding body to UTF-8";
const UNKNOWN: &str = "unknown";

/// Request metadata captured on the way in.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub version: Version,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub client_address: Option<IpAddr>,
}

impl RequestSnapshot {
    /// Snapshot a request. The peer address comes from axum's `ConnectInfo`, when present.
    pub fn from_parts(parts: &request::Parts) -> Self {
        let client_address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self {
            method: parts.method.clone(),
            version: parts.version,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers.clone(),
            client_address,
        }
    }

    /// Dotted fields the forced-DEBUG rules are evaluated against.
    pub fn fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("request.method".into(), self.method.to_string());
        fields.insert("request.http_version".into(), version_str(self.version).into());
        fields.insert("request.path".into(), self.path.clone());
        fields.insert("request.query".into(), self.query.clone().unwrap_or_default());
        for (name, value) in normalize_headers(&self.headers) {
            fields.insert(format!("request.headers.{}", name), value);
        }
        fields.insert("x_client_address".into(), self.client_address_str());
        fields
    }

    pub fn client_address_str(&self) -> String {
        self.client_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Declared request size, 0 when there is no usable Content-Length.
    pub fn content_length(&self) -> u64 {
        content_length(&self.headers).unwrap_or(0)
    }
}

/// Response metadata captured on the way out.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Exact body size when the body knows it, else Content-Length.
    pub size: Option<u64>,
}

impl ResponseSnapshot {
    pub fn from_response(response: &Response<Body>) -> Self {
        let size = response
            .body()
            .size_hint()
            .exact()
            .or_else(|| content_length(response.headers()));

        Self {
            status: response.status(),
            headers: response.headers().clone(),
            size,
        }
    }
}

/// What the record says about a body.
#[derive(Debug, Clone, Default)]
pub enum BodyCapture {
    /// Severity below the body threshold.
    #[default]
    NotLogged,
    /// Body logging applies but nothing was read (bodiless method).
    Skipped,
    Captured(Bytes),
}

impl BodyCapture {
    fn to_value(&self) -> Value {
        match self {
            BodyCapture::NotLogged => Value::from(NOT_LOGGED),
            BodyCapture::Skipped => Value::Null,
            BodyCapture::Captured(bytes) => match decode_utf8(bytes) {
                Some(text) => Value::from(text),
                None => Value::from(UNDECODABLE),
            },
        }
    }
}

/// Assembles the nested record for one request/response pair.
pub struct RecordBuilder<'a> {
    request: &'a RequestSnapshot,
    response: &'a ResponseSnapshot,
    request_body: BodyCapture,
    response_body: BodyCapture,
    duration: Duration,
    errors: Vec<String>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(request: &'a RequestSnapshot, response: &'a ResponseSnapshot) -> Self {
        Self {
            request,
            response,
            request_body: BodyCapture::NotLogged,
            response_body: BodyCapture::NotLogged,
            duration: Duration::ZERO,
            errors: Vec::new(),
        }
    }

    pub fn request_body(mut self, body: BodyCapture) -> Self {
        self.request_body = body;
        self
    }

    pub fn response_body(mut self, body: BodyCapture) -> Self {
        self.response_body = body;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn build(self) -> Record {
        let request = self.request;
        let response = self.response;

        let value = json!({
            "duration": self.duration.as_secs_f64(),
            "x_client_address": request.client_address_str(),
            "errors": self.errors.join("\n"),
            "request": {
                "method": request.method.as_str(),
                "http_version": version_str(request.version),
                "path": request.path,
                "query": request.query.as_deref().unwrap_or(""),
                "headers": headers_object(&request.headers),
                "content": {
                    "value": self.request_body.to_value(),
                    "size": request.content_length(),
                    "mime_type": mime_type(&request.headers),
                },
            },
            "response": {
                "status": response.status.as_u16(),
                "headers": headers_object(&response.headers),
                "content": {
                    "value": self.response_body.to_value(),
                    "size": response.size,
                    "mime_type": mime_type(&response.headers),
                },
            },
        });

        match value {
            Value::Object(map) => Record::from(map),
            _ => Record::new(),
        }
    }
}

/// Lowercase header name → comma-joined values.
pub fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

fn headers_object(headers: &HeaderMap) -> Value {
    let map: Map<String, Value> = normalize_headers(headers)
        .into_iter()
        .map(|(name, value)| (name, Value::from(value)))
        .collect();
    Value::Object(map)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn mime_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn snapshot(request: Request<()>) -> RequestSnapshot {
        let (parts, _) = request.into_parts();
        RequestSnapshot::from_parts(&parts)
    }

    fn ok_response() -> ResponseSnapshot {
        let response = Response::builder()
            .status(StatusCode::CREATED)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"id":1}"#))
            .unwrap();
        ResponseSnapshot::from_response(&response)
    }

    #[test]
    fn test_request_fields() {
        let mut request = Request::builder()
            .method("POST")
            .uri("http://example.com/items?page=2")
            .header("User-Agent", "kube-probe/1.29")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 51000))));

        let fields = snapshot(request).fields();
        assert_eq!(fields["request.method"], "POST");
        assert_eq!(fields["request.path"], "/items");
        assert_eq!(fields["request.query"], "page=2");
        assert_eq!(fields["request.http_version"], "HTTP/1.1");
        assert_eq!(fields["request.headers.user-agent"], "kube-probe/1.29");
        assert_eq!(fields["request.headers.accept"], "text/html,application/json");
        assert_eq!(fields["x_client_address"], "10.0.0.7");
    }

    #[test]
    fn test_build_nested_record() {
        let request = snapshot(
            Request::builder()
                .method("POST")
                .uri("/items")
                .header("content-type", "text/plain")
                .header("content-length", "5")
                .body(())
                .unwrap(),
        );
        let response = ok_response();

        let record = RecordBuilder::new(&request, &response)
            .request_body(BodyCapture::Captured(Bytes::from_static(b"hello")))
            .response_body(BodyCapture::Captured(Bytes::from_static(br#"{"id":1}"#)))
            .duration(Duration::from_millis(250))
            .build();

        assert_eq!(record.get("duration"), Some(&json!(0.25)));
        assert_eq!(record.get("x_client_address"), Some(&json!("unknown")));
        assert_eq!(record.get("errors"), Some(&json!("")));
        assert_eq!(record.get_path("request.method"), Some(&json!("POST")));
        assert_eq!(record.get_path("request.query"), Some(&json!("")));
        assert_eq!(record.get_path("request.content.value"), Some(&json!("hello")));
        assert_eq!(record.get_path("request.content.size"), Some(&json!(5)));
        assert_eq!(record.get_path("request.content.mime_type"), Some(&json!("text/plain")));
        assert_eq!(record.get_path("response.status"), Some(&json!(201)));
        assert_eq!(record.get_path("response.content.value"), Some(&json!(r#"{"id":1}"#)));
        assert_eq!(record.get_path("response.content.size"), Some(&json!(8)));
        assert_eq!(
            record.get_path("response.headers.content-type"),
            Some(&json!("application/json"))
        );
    }

    #[test]
    fn test_body_values() {
        let request = snapshot(Request::builder().uri("/").body(()).unwrap());
        let response = ok_response();

        let record = RecordBuilder::new(&request, &response)
            .request_body(BodyCapture::Skipped)
            .build();
        assert_eq!(record.get_path("request.content.value"), Some(&Value::Null));
        assert_eq!(record.get_path("response.content.value"), Some(&json!(NOT_LOGGED)));
        assert_eq!(record.get_path("request.content.size"), Some(&json!(0)));
        assert_eq!(record.get_path("request.content.mime_type"), Some(&json!("unknown")));

        let record = RecordBuilder::new(&request, &response)
            .request_body(BodyCapture::Captured(Bytes::from_static(b"\xFF\x00\xFE")))
            .build();
        assert_eq!(record.get_path("request.content.value"), Some(&json!(UNDECODABLE)));
    }

    #[test]
    fn test_errors_joined() {
        let request = snapshot(Request::builder().uri("/").body(()).unwrap());
        let response = ok_response();

        let record = RecordBuilder::new(&request, &response)
            .errors(vec!["first".into(), "second".into()])
            .build();
        assert_eq!(record.get("errors"), Some(&json!("first\nsecond")));
    }

    #[test]
    fn test_response_size_falls_back_to_content_length() {
        let frames: Vec<Result<&'static str, std::io::Error>> = vec![Ok("a"), Ok("b")];
        let response = Response::builder()
            .header("content-length", "2")
            .body(Body::from_stream(futures_util::stream::iter(frames)))
            .unwrap();

        assert_eq!(ResponseSnapshot::from_response(&response).size, Some(2));
    }
}
