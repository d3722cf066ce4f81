// Copyright 2025 OpenObserve Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// HTTP response
/// code 200 is success
/// code 400 is error
/// code 404 is not found
/// code 500 is internal server error
/// message is the message or error message
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HttpResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl HttpResponse {
    pub fn message(code: u16, message: impl ToString) -> Self {
        HttpResponse {
            code,
            message: message.to_string(),
            error_detail: None,
        }
    }

    pub fn error(code: u16, error: impl ToString) -> Self {
        HttpResponse {
            code,
            message: error.to_string(),
            error_detail: None,
        }
    }

    /// Send a normal response in json format.
    pub fn json(body: impl Serialize) -> Response {
        (StatusCode::OK, Json(serde_json::json!(body))).into_response()
    }

    /// Send a normal response in plain text.
    pub fn text(body: impl ToString) -> Response {
        (StatusCode::OK, body.to_string()).into_response()
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
