// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{ConfigError, GenerateError, RequestError, ServeError};
use crate::feed::{FeedDocument, Format};
use crate::generate::{generate_feed, generate_folder, generate_index};
use crate::links::LinkResolver;
use crate::metadata::TagReader;

const FOLDER_NOT_FOUND: &str = "Folder not found";

/// Shared state of the HTTP server.
///
/// Holds only immutable configuration; every request rescans the directory.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    tags: Arc<dyn TagReader>,
}

impl AppState {
    pub fn new(config: Config, tags: Arc<dyn TagReader>) -> Self {
        Self {
            config: Arc::new(config),
            tags,
        }
    }

    /// Links for a request: the public URL if configured, else the request's
    /// `Host` header, else the bind address
    fn links(&self, headers: &HeaderMap) -> Result<LinkResolver, ConfigError> {
        if self.config.public_url.is_none()
            && let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok())
            && let Ok(links) = LinkResolver::from_host_header(host)
        {
            return Ok(links);
        }

        self.config.links()
    }

    /// Run a generator on the blocking pool with the links for this request
    async fn run<T, F>(&self, headers: &HeaderMap, generate: F) -> Result<T, RequestError>
    where
        T: Send + 'static,
        F: FnOnce(&Config, &LinkResolver, &dyn TagReader) -> Result<T, GenerateError>
            + Send
            + 'static,
    {
        let links = self.links(headers)?;
        let config = Arc::clone(&self.config);
        let tags = Arc::clone(&self.tags);

        let result =
            tokio::task::spawn_blocking(move || generate(&config, &links, tags.as_ref())).await??;
        Ok(result)
    }
}

impl IntoResponse for FeedDocument {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type())], self.body).into_response()
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Build the router for the configured mode.
///
/// Single feed: `/` is the RSS feed and `/web` its listing. Folder feeds:
/// `/` and `/web` show the folder index, `/feed/{folder}` and
/// `/web/{folder}` the per-folder documents. Audio files and covers are
/// served from `/static` in both modes.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.root);

    let routes = if state.config.feed.folder_feeds {
        Router::new()
            .route("/", get(folder_index))
            .route("/web", get(folder_index))
            .route("/feed/{folder}", get(folder_feed))
            .route("/web/{folder}", get(folder_web))
    } else {
        Router::new()
            .route("/", get(feed))
            .route("/web", get(web))
    };

    routes
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process exits
pub async fn serve(config: Config, tags: Arc<dyn TagReader>) -> Result<(), ServeError> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(%addr, root = %config.root.display(), "Listening");
    serve_listener(listener, AppState::new(config, tags)).await
}

/// Serve on an already bound listener
pub async fn serve_listener(listener: TcpListener, state: AppState) -> Result<(), ServeError> {
    axum::serve(listener, router(state).into_make_service())
        .await
        .map_err(ServeError::Server)
}

async fn feed(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<FeedDocument, RequestError> {
    state
        .run(&headers, |config, links, tags| {
            generate_feed(config, links, tags, Format::Xml)
        })
        .await
}

async fn web(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<FeedDocument, RequestError> {
    state
        .run(&headers, |config, links, tags| {
            generate_feed(config, links, tags, Format::Html)
        })
        .await
}

async fn folder_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<FeedDocument, RequestError> {
    state.run(&headers, generate_index).await
}

async fn folder_feed(
    State(state): State<AppState>,
    Path(folder): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    folder_document(state, folder, headers, Format::Xml).await
}

async fn folder_web(
    State(state): State<AppState>,
    Path(folder): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RequestError> {
    folder_document(state, folder, headers, Format::Html).await
}

async fn folder_document(
    state: AppState,
    folder: String,
    headers: HeaderMap,
    format: Format,
) -> Result<Response, RequestError> {
    let document = state
        .run(&headers, move |config, links, tags| {
            generate_folder(config, links, tags, &folder, format)
        })
        .await?;

    Ok(match document {
        Some(document) => document.into_response(),
        None => (StatusCode::NOT_FOUND, FOLDER_NOT_FOUND).into_response(),
    })
}
