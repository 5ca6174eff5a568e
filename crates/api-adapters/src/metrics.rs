//! Request counters exposed in OpenMetrics text at `/metrics`.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus_client::{
    encoding::{text::encode, EncodeLabelSet},
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

use crate::AppState;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub method: String,
    pub status: String,
}

#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    requests: Family<RequestLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("goodfeed");
        let requests = Family::<RequestLabels, Counter>::default();
        registry.register("http_requests", "Handled HTTP requests", requests.clone());
        Self { registry, requests }
    }

    pub fn record(&self, method: &str, status: StatusCode) {
        self.requests
            .get_or_create(&RequestLabels {
                method: method.to_string(),
                status: status.as_u16().to_string(),
            })
            .inc();
    }

    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

pub async fn track(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let response = next.run(request).await;
    state.metrics.record(&method, response.status());
    response
}

pub async fn export(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_requests_show_up_in_the_export() {
        let metrics = Metrics::new();
        metrics.record("GET", StatusCode::OK);
        metrics.record("GET", StatusCode::OK);
        metrics.record("POST", StatusCode::FORBIDDEN);

        let text = metrics.render().unwrap();
        assert!(text.contains("goodfeed_http_requests_total"));
        assert!(text.contains(r#"method="GET",status="200"} 2"#));
        assert!(text.contains(r#"method="POST",status="403"} 1"#));
    }
}
