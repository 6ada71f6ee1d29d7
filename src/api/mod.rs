pub mod catchers;
pub mod fairings;
pub mod handlers;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Error as JsonError;
use serde_json::json;
use std::io::{Cursor, ErrorKind};

#[derive(Debug)]
pub struct AppError {
    pub status: Status,
    pub error: anyhow::Error,
}

impl AppError {
    pub fn new(status: Status, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    /// Map a rejected JSON body: a body cut off at the `json` limit is 413,
    /// well-formed JSON of the wrong shape is a validation error (422),
    /// anything else a bad request (400).
    pub fn from_body_error(err: JsonError<'_>) -> Self {
        match &err {
            JsonError::Io(io_error) if io_error.kind() == ErrorKind::UnexpectedEof => Self::new(
                Status::PayloadTooLarge,
                anyhow::anyhow!("Request body is too large"),
            ),
            JsonError::Parse(_, parse_error) if parse_error.is_data() => Self::new(
                Status::UnprocessableEntity,
                anyhow::anyhow!("Invalid request body: {}", err),
            ),
            _ => Self::new(
                Status::BadRequest,
                anyhow::anyhow!("Invalid request body: {}", err),
            ),
        }
    }
}

#[rocket::async_trait]
impl<'r, 'o: 'r> Responder<'r, 'o> for AppError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'o> {
        let body = json!({
            "detail": format!("{:#}", self.error),
        })
        .to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl<E> From<E> for AppError
where
    anyhow::Error: From<E>,
{
    fn from(err: E) -> Self {
        AppError {
            status: Status::InternalServerError,
            error: anyhow::Error::from(err),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    type StringMap = HashMap<String, String>;

    #[test]
    fn body_errors_map_to_statuses() {
        let truncated = JsonError::Io(io::Error::new(
            ErrorKind::UnexpectedEof,
            "data limit exceeded",
        ));
        let err = AppError::from_body_error(truncated);
        assert_eq!(err.status, Status::PayloadTooLarge);
        assert_eq!(err.error.to_string(), "Request body is too large");

        let source = r#"{"image_url": 5}"#;
        let shape = serde_json::from_str::<StringMap>(source).unwrap_err();
        let err = AppError::from_body_error(JsonError::Parse(source, shape));
        assert_eq!(err.status, Status::UnprocessableEntity);

        let source = "{not json";
        let syntax = serde_json::from_str::<StringMap>(source).unwrap_err();
        let err = AppError::from_body_error(JsonError::Parse(source, syntax));
        assert_eq!(err.status, Status::BadRequest);
    }
}
