//! Administrative HTTP surface for mutating the translation table.
//!
//! Bodies are parsed as raw JSON and fields pulled out by hand so a
//! missing field reports `400` with the conventional error envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::overlay::TranslationFs;

/// Port the admin API listens on.
pub const ADMIN_PORT: u16 = 6000;

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
    message: String,
}

impl StatusBody {
    fn success(message: &str) -> Json<Self> {
        Json(Self { status: "success", message: message.to_owned() })
    }

    fn error(message: &str) -> Json<Self> {
        Json(Self { status: "error", message: message.to_owned() })
    }
}

#[derive(Serialize)]
struct ListBody {
    translations: Vec<(String, String)>,
}

/// Build the admin router over a shared facade.
pub fn router(fs: Arc<TranslationFs>) -> Router {
    Router::new()
        .route("/add_translation", post(add_translation))
        .route("/remove_translation", post(remove_translation))
        .route("/list_translations", get(list_translations))
        .route("/purge_all_translations", post(purge_all_translations))
        .with_state(fs)
}

/// Serve the admin API until the process exits.
pub async fn serve(fs: Arc<TranslationFs>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", ADMIN_PORT)).await?;
    info!("admin API listening on port {ADMIN_PORT}");
    axum::serve(listener, router(fs)).await
}

fn field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

async fn add_translation(
    State(fs): State<Arc<TranslationFs>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<StatusBody>) {
    info!("received add_translation request: {body}");
    let (Some(original), Some(translated)) = (field(&body, "original"), field(&body, "translated"))
    else {
        return (
            StatusCode::BAD_REQUEST,
            StatusBody::error("Missing 'original' or 'translated' in request"),
        );
    };
    match fs.add_translation(original, translated).await {
        Ok(()) => (StatusCode::OK, StatusBody::success("Translation added successfully")),
        Err(err) => {
            error!("add_translation failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, StatusBody::error("Failed to add translation"))
        }
    }
}

async fn remove_translation(
    State(fs): State<Arc<TranslationFs>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<StatusBody>) {
    info!("received remove_translation request: {body}");
    let Some(original) = field(&body, "original") else {
        return (StatusCode::BAD_REQUEST, StatusBody::error("Missing 'original' in request"));
    };
    match fs.remove_translation(original).await {
        Ok(()) => (StatusCode::OK, StatusBody::success("Translation removed successfully")),
        Err(err) => {
            error!("remove_translation failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, StatusBody::error("Failed to remove translation"))
        }
    }
}

async fn list_translations(State(fs): State<Arc<TranslationFs>>) -> Json<ListBody> {
    info!("received list_translations request");
    let translations = fs.list_translations().await.unwrap_or_default();
    Json(ListBody { translations })
}

async fn purge_all_translations(
    State(fs): State<Arc<TranslationFs>>,
) -> (StatusCode, Json<StatusBody>) {
    info!("received purge_all_translations request");
    match fs.purge_all_translations().await {
        Ok(()) => (StatusCode::OK, StatusBody::success("All translations purged successfully")),
        Err(err) => {
            error!("purge_all_translations failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, StatusBody::error("Failed to purge translations"))
        }
    }
}
