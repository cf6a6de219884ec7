//! HTTP surface, served through `lambda_http`.
//!
//! | Method | Path            | Result                                        |
//! |--------|-----------------|-----------------------------------------------|
//! | POST   | `/upload`       | multipart upload → [`ResultRecord`] JSON      |
//! | POST   | `/download-pdf` | [`ReportSpec`] JSON → `application/pdf`       |
//! | GET    | `/history`      | every stored [`ResultRecord`]                 |
//! | GET    | `/ping`         | `{"status": "running"}`                       |
//! | OPTIONS| any             | CORS preflight                                |
//!
//! Every route also answers under `/api`. Failures become `{"error": "..."}`
//! bodies built from the error's client-safe message; the full error is only
//! logged.
//!
//! [`ResultRecord`]: crate::record::ResultRecord

use crate::context::AppContext;
use crate::error::ValidationError;
use crate::ingest::IngestRequest;
use crate::pipeline::validate::UploadedFile;
use crate::record::ReportSpec;
use crate::report::report_filename;
use lambda_http::{
    http::{header::HeaderValue, Method, StatusCode},
    Body, Error, Request, Response,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Route one request.
pub async fn handle(event: Request, ctx: &AppContext) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = route_path(event.uri().path());
    info!("{} {}", method, event.uri().path());

    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let resp = match (&method, path) {
        (&Method::GET, "/ping") => {
            json_response(StatusCode::OK, &serde_json::json!({"status": "running"}))
        }
        (&Method::POST, "/upload") => upload(&event, ctx).await,
        (&Method::POST, "/download-pdf") => download_pdf(event.body(), ctx).await,
        (&Method::GET, "/history") => json_response(StatusCode::OK, &ctx.history.read_all().await),
        (_, "/ping" | "/upload" | "/download-pdf" | "/history") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    }?;

    Ok(with_cors_headers(resp))
}

/// Strip the optional `/api` prefix and any trailing slash.
fn route_path(raw: &str) -> &str {
    let path = match raw.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => raw,
    };
    match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    }
}

async fn upload(event: &Request, ctx: &AppContext) -> Result<Response<Body>, Error> {
    let content_type = event
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let request =
        match parse_upload(content_type, body_bytes(event.body()), ctx.config.max_upload_bytes).await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Rejected upload request: {}", e);
                return error_response(status(e.status()), &e.public_message());
            }
        };

    match ctx.orchestrator.ingest(request).await {
        Ok(record) => json_response(StatusCode::OK, &record),
        Err(e) => {
            if e.status() >= 500 {
                error!("Upload processing failed: {}", e);
            }
            error_response(status(e.status()), &e.public_message())
        }
    }
}

async fn download_pdf(body: &Body, ctx: &AppContext) -> Result<Response<Body>, Error> {
    let spec: ReportSpec = match serde_json::from_slice(body_bytes(body)) {
        Ok(spec) => spec,
        Err(e) => {
            warn!("Failed to parse report request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid report request");
        }
    };

    match ctx.renderer.render(&spec).await {
        Ok(pdf) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/pdf")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", report_filename(&spec.damage_type)),
            )
            .body(Body::Binary(pdf))
            .map_err(Box::new)?),
        Err(e) => {
            error!("PDF generation failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.public_message())
        }
    }
}

/// Parse a `multipart/form-data` body into an [`IngestRequest`].
///
/// Reads the `file` part plus the optional `damage_type` and `custom_damage`
/// text fields; unknown parts are ignored. A missing `file` part is left for
/// the validator to report.
pub async fn parse_upload(
    content_type: &str,
    body: &[u8],
    limit: usize,
) -> Result<IngestRequest, ValidationError> {
    if body.len() > limit {
        return Err(ValidationError::TooLarge {
            size: body.len(),
            limit,
        });
    }

    let malformed = |e: multer::Error| ValidationError::MalformedRequest(e.to_string());
    let boundary = multer::parse_boundary(content_type).map_err(malformed)?;
    let owned = body.to_vec();
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(owned) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut request = IngestRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(malformed)?;
                request.file = Some(UploadedFile::new(filename, bytes.to_vec()));
            }
            Some("damage_type") => request.damage_type = Some(field.text().await.map_err(malformed)?),
            Some("custom_damage") => {
                request.custom_damage = Some(field.text().await.map_err(malformed)?)
            }
            _ => {}
        }
    }
    Ok(request)
}

fn body_bytes(body: &Body) -> &[u8] {
    match body {
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes.as_slice(),
        Body::Empty => &[],
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn json_response<T: Serialize>(code: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(code)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

fn error_response(code: StatusCode, message: &str) -> Result<Response<Body>, Error> {
    json_response(code, &serde_json::json!({ "error": message }))
}

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    resp
}
