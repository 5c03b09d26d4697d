//! Access Log Middleware.
//! Builds one structured record per request/response pair and emits it.
//!
//! The response is returned as soon as the handler produces it. When bodies
//! are logged, the record is emitted once the response body has streamed
//! out (or the client went away), with up to `max_body_size` bytes of it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use crate::adapters::{panic_message, Adapter, AdapterChain, RedactHeaders};
use crate::config::schema::AccessLogConfig;
use crate::http::body::{is_bodiless, read_prefix, tap};
use crate::http::extra::ExtraLogs;
use crate::observability::emitter::{LogSink, Severity, TracingSink};
use crate::record::{BodyCapture, Record, RecordBuilder, RequestSnapshot, ResponseSnapshot};
use crate::rules::{RuleError, RuleSet};

/// Compiled, immutable access log settings shared by every request.
pub struct AccessLogger {
    config: AccessLogConfig,
    rules: RuleSet,
    adapters: AdapterChain,
    sink: Arc<dyn LogSink>,
}

impl AccessLogger {
    /// Compile the debug rules and install built-in adapters.
    ///
    /// Records go to [`TracingSink`] until another sink is set.
    pub fn new(config: AccessLogConfig) -> Result<Self, RuleError> {
        let rules = RuleSet::compile(&config.debug_requests)?;

        let mut adapters = AdapterChain::new();
        if !config.redact_headers.is_empty() {
            adapters.push(RedactHeaders::new(&config.redact_headers));
        }

        tracing::debug!(
            debug_rules = rules.len(),
            body_log_level = ?config.body_log_level,
            max_body_size = config.max_body_size,
            flatten = config.flatten,
            "Access logger configured"
        );

        Ok(Self {
            config,
            rules,
            adapters,
            sink: Arc::new(TracingSink),
        })
    }

    /// Append an adapter; adapters run in the order they are added.
    pub fn with_adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &AccessLogConfig {
        &self.config
    }

    pub fn adapters(&self) -> &AdapterChain {
        &self.adapters
    }

    /// True if any forced-DEBUG rule matches the request.
    pub fn is_forced_debug(&self, request: &RequestSnapshot) -> bool {
        !self.rules.is_empty() && self.rules.matches(&request.fields())
    }

    /// Request bodies are read only when body logging is on at all.
    pub fn captures_request_body(&self, method: &Method) -> bool {
        self.config.body_log_level.is_some() && !is_bodiless(method)
    }

    /// Run adapters, flatten if configured, and tag the level.
    pub fn finish(&self, request: &RequestSnapshot, mut record: Record, severity: Severity) -> Record {
        self.adapters.apply(request, &mut record);

        let mut record = if self.config.flatten {
            record.flatten()
        } else {
            record
        };
        record.insert("level", severity.as_str());
        record
    }

    /// Finish the record and hand it to the sink.
    pub fn emit(&self, request: &RequestSnapshot, record: Record, severity: Severity) {
        let record = self.finish(request, record, severity);
        self.sink.write(severity, &record);
    }
}

impl std::fmt::Debug for AccessLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLogger")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("adapters", &self.adapters)
            .finish()
    }
}

/// Everything needed to emit a record except the response body, which is
/// only known once it has streamed out.
struct PendingRecord {
    logger: Arc<AccessLogger>,
    request: RequestSnapshot,
    response: ResponseSnapshot,
    request_body: BodyCapture,
    duration: Duration,
    errors: Vec<String>,
    extra: ExtraLogs,
    severity: Severity,
}

impl PendingRecord {
    fn emit(self, response_body: BodyCapture) {
        let mut record = RecordBuilder::new(&self.request, &self.response)
            .request_body(self.request_body)
            .response_body(response_body)
            .duration(self.duration)
            .errors(self.errors)
            .build();
        record.merge(self.extra.take());

        self.logger.emit(&self.request, record, self.severity);
    }
}

pub async fn access_log_middleware(
    State(logger): State<Arc<AccessLogger>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let max_body_size = logger.config().max_body_size;

    // 1. Snapshot the request and evaluate forced-DEBUG rules
    let (mut parts, body) = request.into_parts();
    let snapshot = RequestSnapshot::from_parts(&parts);
    let forced_debug = logger.is_forced_debug(&snapshot);

    // 2. Capture the request body prefix, replaying it to the handler
    let (request_capture, body) = if logger.captures_request_body(&parts.method) {
        let (captured, body) = read_prefix(body, max_body_size).await;
        (Some(captured), body)
    } else {
        (None, body)
    };

    let extra = ExtraLogs::default();
    parts.extensions.insert(extra.clone());

    // 3. Run the handler; a panic becomes a 500 and an entry in `errors`
    let mut errors = Vec::new();
    let handled = AssertUnwindSafe(next.run(Request::from_parts(parts, body)))
        .catch_unwind()
        .await;
    let response = match handled {
        Ok(response) => response,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                method = %snapshot.method,
                path = %snapshot.path,
                error = %message,
                "Request handler panicked"
            );
            errors.push(format!("handler panicked: {}", message));
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    };
    let duration = started.elapsed();

    // 4. Resolve severity, then decide on bodies
    let severity = Severity::for_status(response.status(), forced_debug);
    let logs_bodies = logger.config().logs_bodies_at(severity);
    let request_body = match request_capture {
        Some(captured) if logs_bodies => BodyCapture::Captured(captured.bytes),
        None if logs_bodies => BodyCapture::Skipped,
        _ => BodyCapture::NotLogged,
    };

    let pending = PendingRecord {
        logger,
        request: snapshot,
        response: ResponseSnapshot::from_response(&response),
        request_body,
        duration,
        errors,
        extra,
        severity,
    };

    if !logs_bodies {
        pending.emit(BodyCapture::NotLogged);
        return response;
    }

    // 5. Stream the response out, emitting once its body is done
    let (mut parts, body) = response.into_parts();
    keep_content_length(&mut parts.headers, pending.response.size);
    let body = tap(body, max_body_size, move |captured| {
        pending.emit(BodyCapture::Captured(captured.bytes))
    });

    Response::from_parts(parts, body)
}

/// A tapped body no longer reports its size; keep a known length on the wire.
fn keep_content_length(headers: &mut HeaderMap, size: Option<u64>) {
    if headers.contains_key(header::CONTENT_LENGTH) {
        return;
    }
    if let Some(size) = size.filter(|size| *size > 0) {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
}
