use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// What the stub saw: the `Host` header and the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub host: String,
    pub path: String,
}

/// Local HTTP server standing in for a board. The handler gets the `Host`
/// header and the path and returns a status and body.
pub struct BoardStub {
    pub base_url: String,
    pub port: u16,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl BoardStub {
    pub fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &str) -> (u16, String) + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start board stub server");
        let addr = server.server_addr();
        let port = addr.clone().to_ip().expect("ip listener").port();
        let base_url = format!("http://{addr}");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_server = Arc::clone(&seen);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let host = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Host"))
                    .map(|header| header.value.as_str().to_owned())
                    .unwrap_or_default();
                let path = request.url().to_string();
                seen_by_server.lock().unwrap().push(SeenRequest {
                    host: host.clone(),
                    path: path.clone(),
                });

                let (status, body) = handler(&host, &path);
                let content_type = if body.trim_start().starts_with(['{', '[']) {
                    &b"application/json"[..]
                } else {
                    &b"text/html; charset=utf-8"[..]
                };
                let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type)
                    .expect("build header");
                let _ = request.respond(
                    tiny_http::Response::from_string(body)
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self {
            base_url,
            port,
            seen,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn paths(&self) -> Vec<String> {
        self.seen().into_iter().map(|seen| seen.path).collect()
    }
}

impl Drop for BoardStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn not_found() -> (u16, String) {
    (404, "not found".to_owned())
}
