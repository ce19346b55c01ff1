//! Scripted HTTP server for tests that go over the wire.
//!
//! Each request gets the next reply from the script, in order, whatever its
//! path. The server runs on its own tokio runtime in a background thread so
//! blocking clients can talk to it from the test thread.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;
use tokio::sync::oneshot;

const SCRIPT_EXHAUSTED: &str = r#"{"error":{"type":"script_exhausted","reason":"no reply left"}}"#;

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path and query string, e.g. `/logstash-*/_pit?keep_alive=10s`.
    pub uri: String,
    pub body: String,
}

impl Recorded {
    /// The body parsed as JSON, `Null` when it is not.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct Script {
    replies: VecDeque<(StatusCode, String)>,
    seen: Vec<Recorded>,
}

type SharedScript = Arc<Mutex<Script>>;

pub struct ScriptedServer {
    addr: SocketAddr,
    script: SharedScript,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ScriptedServer {
    /// Start serving `(status, body)` replies, one per request.
    pub fn start<'a, I>(replies: I) -> Self
    where
        I: IntoIterator<Item = (u16, &'a str)>,
    {
        let replies = replies
            .into_iter()
            .map(|(status, body)| {
                let status = StatusCode::from_u16(status).expect("valid status code");
                (status, body.to_string())
            })
            .collect();
        let script = Arc::new(Mutex::new(Script {
            replies,
            seen: Vec::new(),
        }));

        let app = Router::new().fallback(respond).with_state(script.clone());
        let (addr_tx, addr_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind to ephemeral port");
                addr_tx
                    .send(listener.local_addr().expect("local addr"))
                    .expect("report address");
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("server run");
            });
        });

        let addr = addr_rx.recv().expect("server thread started");
        Self {
            addr,
            script,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Serve every body with status 200.
    pub fn ok<'a, I>(bodies: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::start(bodies.into_iter().map(|body| (200, body)))
    }

    /// `host:port`, as given to `--host`.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().expect("script lock").seen.clone()
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn respond(
    State(script): State<SharedScript>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let (status, reply) = {
        let mut script = script.lock().expect("script lock");
        script.seen.push(Recorded {
            method: method.to_string(),
            uri: uri.to_string(),
            body,
        });
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| (StatusCode::INTERNAL_SERVER_ERROR, SCRIPT_EXHAUSTED.to_string()))
    };

    (status, [(header::CONTENT_TYPE, "application/json")], reply).into_response()
}
