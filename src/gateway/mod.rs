//! HTTP gateway: maps request verbs on `/{queue}` onto queue engine
//! operations and wraps results in the response envelope.
//!
//! PUT enqueues the request body, GET lists, POST dequeues. `/` serves the
//! help page. Any other verb on a queue path answers 405.

pub mod index;
pub mod response;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info};

use crate::engine::QueueEngine;
use crate::error::{Error, Result};
use crate::model::TaskList;
use crate::store::ScoreStore;
use crate::telemetry::metrics;
use crate::telemetry::request::{record_status, start_request_span};

use self::index::INDEX_PAGE;
use self::response::{
    DequeueBody, MSG_BAD_REQUEST, MSG_COUNT_ERROR, MSG_EMPTY_QUEUE, MSG_INSERT_ERROR,
    MSG_INTERNAL_ERROR, MSG_LIST_ERROR, MSG_METHOD_NOT_ALLOWED, MSG_POP_ERROR,
};

type AppState<S> = Arc<QueueEngine<S>>;

/// Build the gateway router around a shared engine.
pub fn router<S: ScoreStore + 'static>(engine: Arc<QueueEngine<S>>) -> Router {
    Router::new()
        .route("/", any(index))
        .route("/{*queue}", any(handle::<S>))
        .with_state(engine)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("gateway stopped");
    Ok(())
}

async fn index(method: Method) -> &'static str {
    info!(%method, path = "/", "request");
    INDEX_PAGE
}

async fn handle<S: ScoreStore + 'static>(
    State(engine): State<AppState<S>>,
    method: Method,
    queue: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    let queue = match queue {
        Ok(Path(queue)) => queue,
        Err(e) => {
            info!(%method, "request with undecodable path: {e}");
            return response::error(StatusCode::BAD_REQUEST, MSG_BAD_REQUEST);
        }
    };

    let span = start_request_span(method.as_str(), &queue);
    let resp = dispatch(&engine, &method, &queue, body)
        .instrument(span.clone())
        .await;

    let status = resp.status();
    record_status(&span, status.as_u16());
    metrics::request_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", i64::from(status.as_u16())),
        ],
    );
    resp
}

async fn dispatch<S: ScoreStore>(
    engine: &QueueEngine<S>,
    method: &Method,
    queue: &str,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    info!(%method, path = %format!("/{queue}"), "request");

    match *method {
        Method::PUT => {
            let body = match body {
                Ok(body) => body,
                Err(e) => {
                    error!("reading body: {e}");
                    return response::error(StatusCode::BAD_REQUEST, MSG_BAD_REQUEST);
                }
            };
            match engine.enqueue(queue, &body).await {
                Ok(enqueued) => {
                    metrics::record_queue_operation("enqueue", "ok");
                    response::ok(enqueued)
                }
                Err(e) => failure(queue, "enqueue", &e, MSG_INSERT_ERROR),
            }
        }
        Method::GET => {
            // Two reads so a failure names the one that broke
            let count = match engine.count(queue).await {
                Ok(count) => count,
                Err(e) => return failure(queue, "list", &e, MSG_COUNT_ERROR),
            };
            match engine.top(queue).await {
                Ok(keys) => {
                    metrics::record_queue_operation("list", "ok");
                    response::ok(TaskList { keys, count })
                }
                Err(e) => failure(queue, "list", &e, MSG_LIST_ERROR),
            }
        }
        Method::POST => match engine.dequeue(queue).await {
            Ok(dequeued) => {
                metrics::record_queue_operation("dequeue", "ok");
                response::ok(DequeueBody::from(dequeued))
            }
            Err(e) => failure(queue, "dequeue", &e, MSG_POP_ERROR),
        },
        _ => {
            let mut resp = response::error(StatusCode::METHOD_NOT_ALLOWED, MSG_METHOD_NOT_ALLOWED);
            resp.headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, PUT, POST"));
            resp
        }
    }
}

/// Map an engine error onto a status and a sanitized message, logging the
/// underlying cause.
fn failure(queue: &str, operation: &'static str, e: &Error, message: &str) -> Response {
    if e.is_empty_queue() {
        metrics::record_queue_operation(operation, "empty");
        return response::error(StatusCode::NOT_FOUND, MSG_EMPTY_QUEUE);
    }

    metrics::record_queue_operation(operation, "error");
    error!(queue, operation, "{e}");
    let message = match e {
        Error::MalformedStoreResult(_) => MSG_INTERNAL_ERROR,
        _ => message,
    };
    response::error(StatusCode::INTERNAL_SERVER_ERROR, message)
}
