//! bodyrest demo service.
//!
//! A small notes API whose handlers are registered through `BodyRest`:
//!
//! ```text
//! GET    /notes                    list notes
//! POST   /notes                    create a note (JSON body)
//! GET    /notes/{id}               fetch one note
//! PUT    /notes/{id}               replace a note (JSON body)
//! DELETE /notes/{id}               delete a note
//! POST   /notes/{id}/attachments   attach files (multipart form)
//! ```
//!
//! Binding failures are rendered as `{"message": "..."}` with the
//! failure status.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::StatusCode;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use bodyrest::config::loader::load_config;
use bodyrest::dispatch::{BodyRest, Json, MultipartForm, RegistrationError};
use bodyrest::http::{HandlerFunc, HttpServer, InboundRequest, ResponseWriter};
use bodyrest::lifecycle::Shutdown;
use bodyrest::observability::{logging, metrics};
use bodyrest::ServiceConfig;

#[derive(Parser)]
#[command(name = "bodyrest", about = "Notes API served through bodyrest dispatchers")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NewNote {
    title: String,
    body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Note {
    id: i64,
    title: String,
    body: String,
    tags: Vec<String>,
    attachments: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

#[derive(Default)]
struct NoteStore {
    next_id: i64,
    notes: BTreeMap<i64, Note>,
}

type SharedStore = Arc<Mutex<NoteStore>>;

fn lock(store: &SharedStore) -> MutexGuard<'_, NoteStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn respond<T: Serialize>(w: &mut ResponseWriter, status: StatusCode, value: &T) {
    w.write_status(status);
    if let Err(e) = w.write_json(value) {
        tracing::error!(error = %e, "Failed to encode response");
    }
}

fn not_found(w: &mut ResponseWriter, id: i64) {
    respond(
        w,
        StatusCode::NOT_FOUND,
        &ErrorBody {
            message: &format!("note {} not found", id),
        },
    );
}

fn render_error(w: &mut ResponseWriter, _r: &InboundRequest, status: StatusCode) {
    let message = status.canonical_reason().unwrap_or("request failed");
    respond(w, status, &ErrorBody { message });
}

/// Register every notes route on a server.
fn build_server(config: ServiceConfig, store: SharedStore) -> Result<HttpServer, RegistrationError> {
    let rest = BodyRest::new(&config.limits);
    rest.set_error_renderer(render_error);

    let list = {
        let store = store.clone();
        rest.handle_to(move || {
            let store = store.clone();
            HandlerFunc::new(move |w, _| {
                let notes: Vec<Note> = lock(&store).notes.values().cloned().collect();
                respond(w, StatusCode::OK, &notes);
            })
        })?
    };

    let create = {
        let store = store.clone();
        rest.handle_to(move |note: Json<NewNote>| {
            let store = store.clone();
            HandlerFunc::new(move |w, _| {
                let NewNote { title, body, tags } = note.into_inner();
                let mut store = lock(&store);
                store.next_id += 1;
                let note = Note {
                    id: store.next_id,
                    title,
                    body,
                    tags,
                    attachments: Vec::new(),
                };
                store.notes.insert(note.id, note.clone());
                respond(w, StatusCode::CREATED, &note);
            })
        })?
    };

    let fetch = {
        let store = store.clone();
        rest.handle_to(move |id: i64| {
            let store = store.clone();
            HandlerFunc::new(move |w, _| match lock(&store).notes.get(&id) {
                Some(note) => respond(w, StatusCode::OK, note),
                None => not_found(w, id),
            })
        })?
    };

    let replace = {
        let store = store.clone();
        rest.handle_to(move |id: i64, update: Json<NewNote>| {
            let store = store.clone();
            HandlerFunc::new(move |w, _| {
                let mut store = lock(&store);
                match store.notes.get_mut(&id) {
                    Some(note) => {
                        let NewNote { title, body, tags } = update.into_inner();
                        note.title = title;
                        note.body = body;
                        note.tags = tags;
                        respond(w, StatusCode::OK, &*note);
                    }
                    None => not_found(w, id),
                }
            })
        })?
    };

    let remove = {
        let store = store.clone();
        rest.handle_to(move |id: i64| {
            let store = store.clone();
            HandlerFunc::new(move |w, _| match lock(&store).notes.remove(&id) {
                Some(_) => w.write_status(StatusCode::NO_CONTENT),
                None => not_found(w, id),
            })
        })?
    };

    let attach = {
        let store = store.clone();
        rest.handle_to(move |id: i64, form: MultipartForm| {
            let store = store.clone();
            HandlerFunc::new(move |w, _| {
                let mut store = lock(&store);
                match store.notes.get_mut(&id) {
                    Some(note) => {
                        let names = form
                            .files
                            .values()
                            .flatten()
                            .map(|file| file.file_name.clone());
                        note.attachments.extend(names);
                        respond(w, StatusCode::CREATED, &*note);
                    }
                    None => not_found(w, id),
                }
            })
        })?
    };

    Ok(HttpServer::new(config)
        .get("/notes", list)
        .post("/notes", create)
        .get("/notes/{id}", fetch)
        .put("/notes/{id}", replace)
        .delete("/notes/{id}", remove)
        .post("/notes/{id}/attachments", attach))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!("bodyrest v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_body_bytes = config.limits.max_body_bytes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse::<SocketAddr>()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = build_server(config, SharedStore::default())?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    async fn call(
        server: &HttpServer,
        method: Method,
        uri: &str,
        content_type: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();
        let response = server.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn server() -> HttpServer {
        build_server(ServiceConfig::default(), SharedStore::default()).unwrap()
    }

    const JSON: &str = "application/json";

    #[tokio::test]
    async fn test_note_lifecycle() {
        let server = server();

        let (status, created) = call(
            &server,
            Method::POST,
            "/notes",
            JSON,
            r#"{"title":"groceries","body":"milk"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);

        let (status, fetched) = call(&server, Method::GET, "/notes/1", JSON, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["title"], "groceries");

        let (status, updated) = call(
            &server,
            Method::PUT,
            "/notes/1",
            JSON,
            r#"{"title":"groceries","body":"milk, eggs","tags":["home"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["tags"][0], "home");

        let (status, listed) = call(&server, Method::GET, "/notes", JSON, Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let (status, _) = call(&server, Method::DELETE, "/notes/1", JSON, Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, missing) = call(&server, Method::GET, "/notes/1", JSON, Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing["message"], "note 1 not found");
    }

    #[tokio::test]
    async fn test_binding_failures_rendered_as_json() {
        let server = server();

        let (status, body) = call(&server, Method::POST, "/notes", JSON, r#"{"title":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Bad Request");

        let (status, body) = call(&server, Method::GET, "/notes/abc", JSON, Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Bad Request");
    }

    #[tokio::test]
    async fn test_attachments_from_multipart_form() {
        let server = server();
        call(
            &server,
            Method::POST,
            "/notes",
            JSON,
            r#"{"title":"trip","body":"packing"}"#,
        )
        .await;

        let form = "--B\r\n\
                    Content-Disposition: form-data; name=\"file\"; filename=\"list.txt\"\r\n\
                    Content-Type: text/plain\r\n\r\n\
                    socks\r\n\
                    --B--\r\n";
        let (status, note) = call(
            &server,
            Method::POST,
            "/notes/1/attachments",
            "multipart/form-data; boundary=B",
            form,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(note["attachments"][0], "list.txt");
    }
}
