//! Reading submitted forms: `multipart/form-data` via multer, anything else
//! as `application/x-www-form-urlencoded`.

use actix_web::{HttpRequest, http::header, web::Bytes};
use multer::{Constraints, Multipart, SizeLimit};

use yatube_core::forms::FormData;
use yatube_core::ports::UploadedFile;

use crate::middleware::error::{AppError, AppResult};

pub async fn read_form(req: &HttpRequest, body: Bytes, max_bytes: usize) -> AppResult<FormData> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        read_multipart(content_type, body, max_bytes).await
    } else {
        Ok(read_urlencoded(&body))
    }
}

fn read_urlencoded(body: &[u8]) -> FormData {
    let mut data = FormData::new();
    for (name, value) in url::form_urlencoded::parse(body) {
        data.insert_field(name, value);
    }
    data
}

fn multipart_err(err: multer::Error) -> AppError {
    match err {
        multer::Error::StreamSizeExceeded { limit } | multer::Error::FieldSizeExceeded { limit, .. } => {
            AppError::PayloadTooLarge(format!("Upload exceeds {} bytes", limit))
        }
        other => AppError::BadRequest(format!("Malformed multipart body: {}", other)),
    }
}

async fn read_multipart(content_type: &str, body: Bytes, max_bytes: usize) -> AppResult<FormData> {
    let boundary = multer::parse_boundary(content_type).map_err(multipart_err)?;
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(max_bytes as u64));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut data = FormData::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_err)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field.bytes().await.map_err(multipart_err)?;
                data.insert_file(
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            None => {
                let value = field.text().await.map_err(multipart_err)?;
                data.insert_field(name, value);
            }
        }
    }

    tracing::debug!(fields = data.fields().len(), "Parsed multipart form");
    Ok(data)
}
