//! HTTP front-end: the submission form and the bulk processing endpoint.

mod form;
mod views;

use crate::dispatch::{BulkRequest, Channel, Dispatcher};
use crate::error::IoError;
use crate::prelude::*;
use crate::shorten::ShortenMode;
use crate::{err_ctx, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use form::BulkForm;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_host")]
    host: IpAddr,

    #[serde(default = "default_port")]
    port: u16,

    /// Maximum size of the whole multipart body
    #[serde(default = "default_max_body_bytes")]
    max_body_bytes: usize,
}

fn default_host() -> IpAddr {
    [0, 0, 0, 0].into()
}

fn default_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) uploads_dir: PathBuf,
}

pub(crate) fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/process-bulk", post(process_bulk))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub(crate) async fn serve(config: Config, state: AppState) -> Result {
    let addr = SocketAddr::new(config.host, config.port);

    let server = axum::Server::try_bind(&addr).map_err(err_ctx!(IoError::BindListener { addr }))?;

    info!(%addr, "Listening for HTTP requests");

    server
        .serve(router(state, config.max_body_bytes).into_make_service())
        .await
        .map_err(err_ctx!(IoError::Serve))
}

async fn index(State(state): State<AppState>) -> Response {
    html_or_error(views::index(state.dispatcher.catalog().ids()))
}

fn html_or_error(page: Result<String>) -> Response {
    match page {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!(err = tracing_err(&err), "Failed to render the page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: failed to render the page ({})", err.id()),
            )
                .into_response()
        }
    }
}

/// Responds right after the form is validated. The batch is processed in
/// the background.
#[instrument(skip_all)]
async fn process_bulk(State(state): State<AppState>, multipart: Multipart) -> Response {
    let form = match BulkForm::read(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!(err = tracing_err(&err), "Rejecting malformed bulk form");
            return (StatusCode::BAD_REQUEST, format!("Error: {err}")).into_response();
        }
    };

    let channel = Channel::from_name(&form.channel);

    let upload = match (form.image, channel.requires_upload()) {
        (None, true) => {
            return (
                StatusCode::BAD_REQUEST,
                "Error: No image file uploaded for this channel.",
            )
                .into_response()
        }
        (Some(bytes), true) => match form::save_upload(&state.uploads_dir, &bytes).await {
            Ok(path) => Some(path),
            Err(err) => {
                error!(err = tracing_err(&err), "Failed to save the uploaded image");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: failed to save the uploaded image ({})", err.id()),
                )
                    .into_response();
            }
        },
        (_, false) => None,
    };

    let request = BulkRequest {
        server: form.server,
        channel,
        bulk_text: form.bulk_text,
        mode: ShortenMode::from_form_value(&form.select_type),
        ad_types: form.ad_types,
        label: form.label,
        upload,
    };

    info!(
        server = %request.server,
        channel = request.channel.name(),
        ad_types = ?request.ad_types,
        "Accepted bulk request"
    );

    let page = views::success(&request.server, &request.bulk_text);

    state.dispatcher.spawn_batch(request);

    html_or_error(page)
}
