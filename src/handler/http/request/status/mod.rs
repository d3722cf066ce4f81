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

use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::meta::http::HttpResponse as MetaHttpResponse;

#[derive(Serialize, ToSchema)]
pub struct HealthzResponse {
    pub status: String,
}

/// Healthz
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Status",
    operation_id = "Healthz",
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = HealthzResponse),
    ),
)]
pub async fn healthz() -> Response {
    MetaHttpResponse::json(HealthzResponse {
        status: "ok".to_string(),
    })
}

/// Prometheus metrics exposition
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Status",
    operation_id = "Metrics",
    responses(
        (status = 200, description = "Success", content_type = "text/plain", body = String),
    ),
)]
pub async fn metrics() -> Response {
    MetaHttpResponse::text(config::metrics::gather())
}
