// src/server/handler.rs
use hyper::{header, Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tower::Service;

use crate::metrics::MetricsRegistry;
use crate::scheduler::SchedulerHandle;

/// Routes the status endpoints onto a running scheduler.
#[derive(Clone)]
pub struct RequestHandler {
    scheduler: SchedulerHandle,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl RequestHandler {
    pub fn new(scheduler: SchedulerHandle, metrics: Option<Arc<MetricsRegistry>>) -> Self {
        Self { scheduler, metrics }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match (&method, path.as_str()) {
            (&Method::GET, "/status") => json(&self.scheduler.status().await),
            (&Method::GET, p) if p.starts_with("/history/") => {
                let host = &p["/history/".len()..];
                if self.scheduler.config().hosts().iter().any(|h| h == host) {
                    json(&self.scheduler.history(host))
                } else {
                    text(StatusCode::NOT_FOUND, "Unknown host")
                }
            }
            (&Method::POST, "/check") => {
                self.scheduler.request_immediate_check();
                text(StatusCode::ACCEPTED, "Check requested")
            }
            (&Method::GET, "/metrics") => self.metrics(),
            _ => text(StatusCode::NOT_FOUND, "Not Found"),
        }
    }

    fn metrics(&self) -> Response<Body> {
        let Some(registry) = &self.metrics else {
            return text(StatusCode::NOT_FOUND, "Metrics disabled");
        };

        match registry.gather() {
            Ok(body) => response(StatusCode::OK, "text/plain; version=0.0.4", Body::from(body)),
            Err(e) => {
                tracing::error!(%e, "failed to encode metrics");
                text(StatusCode::INTERNAL_SERVER_ERROR, "Metrics unavailable")
            }
        }
    }
}

fn response(status: StatusCode, content_type: &'static str, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
    response
}

fn text(status: StatusCode, message: &'static str) -> Response<Body> {
    response(status, "text/plain", Body::from(message))
}

fn json<T: Serialize>(value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => response(StatusCode::OK, "application/json", Body::from(body)),
        Err(e) => {
            tracing::error!(%e, "failed to serialize response");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Serialization error")
        }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = std::convert::Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::HostConfig;
    use crate::probe::mock::{Reply, ScriptedTransport};
    use crate::scheduler::Scheduler;
    use std::time::Duration;

    fn handler(metrics: Option<Arc<MetricsRegistry>>) -> (RequestHandler, Scheduler) {
        let transport = Arc::new(ScriptedTransport::new().always("a", Reply::Ok(20)));
        let config = HostConfig::new(
            ["a", "b"],
            Duration::from_millis(100),
            1,
            Duration::from_secs(1),
        )
        .unwrap();
        let collector = metrics.as_ref().map(|registry| registry.collector());
        let (scheduler, handle) = Scheduler::new(config, transport, collector);
        (RequestHandler::new(handle, metrics), scheduler)
    }

    async fn call(handler: &mut RequestHandler, method: Method, uri: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = handler.call(req).await.unwrap();
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_status_lists_every_host() {
        let (mut handler, _scheduler) = handler(None);

        let (status, body) = call(&mut handler, Method::GET, "/status").await;

        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["any_reachable"], false);
        assert_eq!(value["hosts"][0]["host"], "a");
        assert_eq!(value["hosts"][1]["latency_ms"], -1);
        assert_eq!(value["hosts"][1]["quality"], "unreachable");
    }

    #[tokio::test]
    async fn test_history_for_known_and_unknown_hosts() {
        let (mut handler, _scheduler) = handler(None);

        let (status, body) = call(&mut handler, Method::GET, "/history/a").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");

        let (status, _) = call(&mut handler, Method::GET, "/history/zzz").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_check_is_accepted() {
        let (mut handler, _scheduler) = handler(None);

        let (status, _) = call(&mut handler, Method::POST, "/check").await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = call(&mut handler, Method::GET, "/check").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let (mut handler, _scheduler) = handler(Some(registry));

        let (status, body) = call(&mut handler, Method::GET, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("netcheck_hosts_configured 2"));
    }
}
