use std::fmt::{Display, Formatter};

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{self, Deserialize, Serialize};
use serde_json::json;

const CONTENT_TYPE: &str = "application/problem+json";
const TYPE_URL: &str = "https://api.playmaker.app/problems";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Problem {
        BadRequest(String),
        Conflict(String),
        InternalServerError(String),
        NotFound(String),
        Unauthorized(String),
}

impl Problem {
        pub fn status(&self) -> StatusCode {
                match self {
                        Problem::BadRequest(_) => StatusCode::BAD_REQUEST,
                        Problem::Conflict(_) => StatusCode::CONFLICT,
                        Problem::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                        Problem::NotFound(_) => StatusCode::NOT_FOUND,
                        Problem::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                }
        }

        pub fn detail(&self) -> &str {
                match self {
                        Problem::BadRequest(detail)
                        | Problem::Conflict(detail)
                        | Problem::InternalServerError(detail)
                        | Problem::NotFound(detail)
                        | Problem::Unauthorized(detail) => detail,
                }
        }

        fn slug_and_title(&self) -> (&'static str, &'static str) {
                match self {
                        Problem::BadRequest(_) => ("bad-request", "Bad Request"),
                        Problem::Conflict(_) => ("conflict", "Conflict"),
                        Problem::InternalServerError(_) => ("internal-server-error", "Internal Server Error"),
                        Problem::NotFound(_) => ("not-found", "Not Found"),
                        Problem::Unauthorized(_) => ("unauthorized", "Unauthorized"),
                }
        }
}

impl Display for Problem {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let (_, title) = self.slug_and_title();
                write!(f, "{}: {}", title, self.detail())
        }
}

impl std::error::Error for Problem {}

impl IntoResponse for Problem {
        fn into_response(self) -> Response {
                let status = self.status();
                let (slug, title) = self.slug_and_title();

                let mut response = (
                        status,
                        Json(json!({
                            "type": format!("{}/{}", TYPE_URL, slug),
                            "title": title,
                            "status": status.as_u16(),
                            "detail": self.detail(),
                        })),
                )
                        .into_response();
                response.headers_mut().insert(header::CONTENT_TYPE, header::HeaderValue::from_static(CONTENT_TYPE));
                response
        }
}
