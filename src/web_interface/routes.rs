use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::BufMut;
use chrono::Local;
use futures_util::{pin_mut, TryStreamExt};
use log::{debug, error, warn};
use rust_embed::RustEmbed;
use warp::http::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use warp::http::StatusCode;
use warp::multipart::FormData;
use warp::{reply, Filter, Rejection, Reply};

use super::types::*;
use crate::error_handling::types::StorageError;
use crate::report::{build_acuse, ACUSE_FILE_NAME};
use crate::storage::storage_trait::Storage;
use crate::task_management::TaskManager;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/web/"]
struct WebAssets;

/// GET /
pub fn index_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        match WebAssets::get("index.html") {
            Some(page) => Ok::<_, Rejection>(
                reply::html(String::from_utf8_lossy(&page.data).into_owned()).into_response(),
            ),
            None => {
                error!("Embedded index.html missing");
                Ok::<_, Rejection>(json_error(StatusCode::NOT_FOUND, MSG_FILE_NOT_FOUND))
            }
        }
    })
}

/// GET /static/:file
pub fn static_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("static" / String)
        .and(warp::get())
        .and_then(move |raw_name: String| {
            let storage = storage.clone();
            async move {
                let Some(name) = decode_segment(&raw_name) else {
                    return Ok::<_, Rejection>(json_error(
                        StatusCode::NOT_FOUND,
                        MSG_FILE_NOT_FOUND,
                    ));
                };
                let res = match storage.read_static(&name) {
                    Ok(bytes) => {
                        let mime = mime_guess::from_path(&name).first_or_octet_stream();
                        reply::with_header(bytes, "Content-Type", mime.as_ref()).into_response()
                    }
                    Err(e) => storage_error_reply(&e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// POST /upload
pub fn upload_route(
    tasks: Arc<TaskManager>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(max_upload_bytes))
        .and_then(move |form: FormData| {
            let tasks = tasks.clone();
            async move { Ok::<_, Rejection>(handle_upload(form, tasks).await) }
        })
}

/// POST /upload with a body that is not `multipart/form-data` carries no file at all.
pub fn upload_without_form_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone
{
    warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::optional::<String>("content-type"))
        .and_then(|content_type: Option<String>| async move {
            let is_form = content_type.is_some_and(|ct| {
                ct.trim_start()
                    .to_ascii_lowercase()
                    .starts_with("multipart/form-data")
            });
            if is_form {
                // Left to the multipart route and its rejections
                return Err(warp::reject::not_found());
            }
            Ok(json_error(StatusCode::BAD_REQUEST, MSG_NO_FILE_FIELD))
        })
}

/// OPTIONS preflight for any route: every origin, method and requested header is allowed.
pub fn preflight_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::options()
        .and(warp::header::optional::<String>("access-control-request-headers"))
        .map(|requested: Option<String>| {
            let mut res = StatusCode::OK.into_response();
            let headers = res.headers_mut();
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(CORS_METHODS),
            );
            if let Some(value) = requested.and_then(|h| HeaderValue::from_str(&h).ok()) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
            res
        })
}

/// GET /status/:task_id
pub fn status_route(
    tasks: Arc<TaskManager>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("status" / String)
        .and(warp::get())
        .and_then(move |task_id: String| {
            let tasks = tasks.clone();
            async move { Ok::<_, Rejection>(reply::json(&tasks.status(&task_id))) }
        })
}

/// GET /download/:filename
pub fn download_route(
    storage: Arc<dyn Storage>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("download" / String)
        .and(warp::get())
        .and_then(move |raw_name: String| {
            let storage = storage.clone();
            async move {
                let Some(name) = decode_segment(&raw_name) else {
                    return Ok::<_, Rejection>(json_error(
                        StatusCode::NOT_FOUND,
                        MSG_FILE_NOT_FOUND,
                    ));
                };
                let res = match storage.read_download(&name) {
                    Ok(bytes) => {
                        let mime = mime_guess::from_path(&name).first_or_octet_stream();
                        attachment(bytes, mime.as_ref(), &name)
                    }
                    Err(e) => storage_error_reply(&e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /acuse_errores/:task_id
pub fn acuse_route(
    tasks: Arc<TaskManager>,
    logo_path: PathBuf,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("acuse_errores" / String)
        .and(warp::get())
        .and_then(move |task_id: String| {
            let tasks = tasks.clone();
            let logo_path = logo_path.clone();
            async move {
                let Some((errors, nombre_corto)) = tasks.errors(&task_id) else {
                    return Ok::<_, Rejection>(json_error(StatusCode::NOT_FOUND, MSG_NO_ERRORS));
                };

                let generated_at = Local::now().naive_local();
                let rendered = tokio::task::spawn_blocking(move || {
                    build_acuse(&errors, &nombre_corto, Some(logo_path.as_path()), generated_at)
                })
                .await;

                let res = match rendered {
                    Ok(Ok(pdf)) => attachment(pdf, "application/pdf", ACUSE_FILE_NAME),
                    Ok(Err(e)) => {
                        error!("[{}] Acuse could not be rendered: {}", task_id, e);
                        json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
                    }
                    Err(e) => {
                        error!("[{}] Acuse worker failed: {}", task_id, e);
                        json_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
                    }
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /health
pub fn health_route(
    tasks: Arc<TaskManager>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let tasks = tasks.clone();
            async move {
                Ok::<_, Rejection>(reply::json(&HealthResponse {
                    status: "ok",
                    tasks: tasks.task_count(),
                }))
            }
        })
}

/// Turns rejections into the JSON error payload used by every route.
pub async fn handle_rejection(err: Rejection) -> Result<reply::Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, MSG_FILE_NOT_FOUND)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, MSG_TOO_LARGE)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, MSG_METHOD_NOT_ALLOWED)
    } else {
        debug!("Request rejected: {:?}", err);
        (StatusCode::BAD_REQUEST, MSG_BAD_REQUEST)
    };
    Ok(json_error(status, message))
}

enum UploadField {
    Missing,
    Found {
        file_name: Option<String>,
        data: Vec<u8>,
    },
}

async fn handle_upload(form: FormData, tasks: Arc<TaskManager>) -> reply::Response {
    let field = match read_upload_field(form).await {
        Ok(field) => field,
        Err(e) => {
            warn!("Multipart body could not be read: {}", e);
            return json_error(StatusCode::BAD_REQUEST, MSG_BAD_REQUEST);
        }
    };

    let (file_name, data) = match field {
        UploadField::Missing => return json_error(StatusCode::BAD_REQUEST, MSG_NO_FILE_FIELD),
        UploadField::Found {
            file_name: Some(name),
            data,
        } if !name.is_empty() => (name, data),
        UploadField::Found { .. } => {
            return json_error(StatusCode::BAD_REQUEST, MSG_NO_FILE_SELECTED)
        }
    };

    let path = match tasks.storage().save_upload(&file_name, &data) {
        Ok(path) => path,
        Err(e) => {
            error!("Upload {} could not be stored: {}", file_name, e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL);
        }
    };
    let task_id = tasks.submit(path);
    debug!("[{}] Accepted {} ({} bytes)", task_id, file_name, data.len());

    reply::json(&UploadResponse { task_id }).into_response()
}

async fn read_upload_field(form: FormData) -> Result<UploadField, warp::Error> {
    pin_mut!(form);
    while let Some(part) = form.try_next().await? {
        if part.name() != UPLOAD_FIELD {
            continue;
        }
        let file_name = part.filename().map(str::to_string);
        let data = part
            .stream()
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.put(chunk);
                Ok::<_, warp::Error>(acc)
            })
            .await?;
        return Ok(UploadField::Found { file_name, data });
    }
    Ok(UploadField::Missing)
}

fn json_error(status: StatusCode, message: &str) -> reply::Response {
    reply::with_status(
        reply::json(&ApiError {
            error: message.to_string(),
        }),
        status,
    )
    .into_response()
}

fn storage_error_reply(err: &StorageError) -> reply::Response {
    match err {
        StorageError::NotFound(_) | StorageError::InvalidName(_) => {
            json_error(StatusCode::NOT_FOUND, MSG_FILE_NOT_FOUND)
        }
        other => {
            error!("Storage failure: {}", other);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
        }
    }
}

fn attachment(bytes: Vec<u8>, content_type: &str, file_name: &str) -> reply::Response {
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    reply::with_header(
        reply::with_header(bytes, "Content-Type", content_type),
        "Content-Disposition",
        disposition,
    )
    .into_response()
}

/// Percent-decodes a path segment. `None` when the bytes are not UTF-8.
fn decode_segment(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|name| name.into_owned())
}
