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
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::{
    AppState,
    request::{bridge, status},
};

pub mod openapi;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let bridge_routes = Router::new()
        .route("/status", get(bridge::status))
        .route("/alarms", get(bridge::alarms))
        .route("/alarms/resend", post(bridge::resend))
        .route("/nodes", get(bridge::nodes))
        .route("/nodes/{id}", get(bridge::node_by_id))
        .route("/clear", post(bridge::clear))
        .route("/alertmanager/status", get(bridge::alertmanager_status));

    Router::new()
        .route("/healthz", get(status::healthz))
        .route("/metrics", get(status::metrics))
        .nest("/api/v1/bridge", bridge_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-doc/openapi.json", openapi::ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}
