//! CV upload endpoints.
//!
//! `POST /api/cv` accepts either a raw `application/pdf` body or a
//! `multipart/form-data` request with one file field. With `?defer=true`
//! the payload is parked unscanned and a rescan job is enqueued instead.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::processor::RescanJob;
use crate::server::AppState;
use cvgate_core::{IntakeError, ScanVerdict, UploadRequest, INCOMING_CONTAINER};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Optional original filename for raw-body uploads.
    pub filename: Option<String>,
    /// Park the payload for deferred scanning instead of scanning inline.
    #[serde(default)]
    pub defer: bool,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub blob_name: String,
    pub verdict: ScanVerdict,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// POST /api/cv — receive one CV upload.
pub async fn upload_cv(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    request: Request,
) -> Response {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let upload = if content_type.starts_with("multipart/form-data") {
        let multipart = match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart,
            Err(rejection) => return rejection.into_response(),
        };
        match read_file_field(multipart).await {
            Ok(upload) => upload,
            Err(err) => return intake_error_response(&err),
        }
    } else {
        let bytes = match Bytes::from_request(request, &()).await {
            Ok(bytes) => bytes,
            Err(rejection) => return rejection.into_response(),
        };
        let mut upload = UploadRequest::new(bytes.to_vec(), content_type);
        if let Some(filename) = params.filename.clone() {
            upload = upload.with_filename(filename);
        }
        upload
    };

    if params.defer {
        park_and_enqueue(&state, upload).await
    } else {
        match state.intake.process(upload).await {
            Ok(stored) => (
                StatusCode::OK,
                Json(UploadResponse {
                    message: format!("CV stored as {}", stored.blob_name),
                    blob_name: stored.blob_name,
                    verdict: stored.verdict,
                }),
            )
                .into_response(),
            Err(err) => intake_error_response(&err),
        }
    }
}

async fn park_and_enqueue(state: &AppState, upload: UploadRequest) -> Response {
    let blob_name = match state.intake.park(upload).await {
        Ok(blob_name) => blob_name,
        Err(err) => return intake_error_response(&err),
    };

    if state
        .rescan_tx
        .send(RescanJob {
            blob_name: blob_name.clone(),
        })
        .await
        .is_err()
    {
        error!(blob_name = %blob_name, "rescan processor is not running");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "upload parked but the scan processor is unavailable",
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": format!("CV parked as {blob_name}, scan pending"),
            "blob_name": blob_name,
        })),
    )
        .into_response()
}

/// GET /api/cv/:name/status — ledger row for a stored object.
pub async fn upload_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.ledger.get(&name).await {
        Ok(Some(entry)) => (StatusCode::OK, Json(entry)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no scan record for this name"),
        Err(e) => {
            error!(blob_name = %name, error = format!("{e:#}"), "ledger lookup failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to look up scan status",
            )
        }
    }
}

/// POST /api/cv/:name/rescan — enqueue a deferred scan of a parked object.
pub async fn enqueue_rescan(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    match state.store.exists(INCOMING_CONTAINER, &name).await {
        Ok(true) => {}
        Ok(false) => {
            return error_response(StatusCode::NOT_FOUND, "no parked upload under this name")
        }
        Err(e) => {
            error!(blob_name = %name, error = format!("{e:#}"), "storage lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable");
        }
    }

    if state
        .rescan_tx
        .send(RescanJob {
            blob_name: name.clone(),
        })
        .await
        .is_err()
    {
        error!(blob_name = %name, "rescan processor is not running");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "scan processor is unavailable",
        );
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": format!("rescan of {name} enqueued") })),
    )
        .into_response()
}

/// Pull the single file field out of a multipart body.
async fn read_file_field(mut multipart: Multipart) -> Result<UploadRequest, IntakeError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IntakeError::MalformedBody(e.to_string()))?
    {
        let is_file = field.file_name().is_some() || field.name() == Some("file");
        if !is_file {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| IntakeError::MalformedBody(e.to_string()))?;

        let content_type = declared.unwrap_or_else(|| {
            match filename
                .as_deref()
                .is_some_and(|f| f.to_ascii_lowercase().ends_with(".pdf"))
            {
                true => "application/pdf".to_string(),
                false => "application/octet-stream".to_string(),
            }
        });

        let mut upload = UploadRequest::new(bytes.to_vec(), content_type);
        if let Some(filename) = filename {
            upload = upload.with_filename(filename);
        }
        return Ok(upload);
    }

    Err(IntakeError::MissingFile)
}

/// Map a pipeline error onto a response. Client errors keep their specific
/// message; dependency and unexpected faults are logged in full and answered
/// with a generic body.
fn intake_error_response(err: &IntakeError) -> Response {
    if err.is_client_error() {
        info!(error = %err, "upload rejected");
        error_response(StatusCode::BAD_REQUEST, &err.to_string())
    } else {
        error!(error = %err, detail = ?err, "upload failed");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error while processing the upload",
        )
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400_with_specific_message() {
        let resp = intake_error_response(&IntakeError::EmptyUpload);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn dependency_faults_map_to_500() {
        let resp = intake_error_response(&IntakeError::Storage("disk full".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = intake_error_response(&IntakeError::Scanner("dll fault".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
