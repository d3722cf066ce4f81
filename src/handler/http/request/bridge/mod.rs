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

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use config::utils::time;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::meta::http::HttpResponse as MetaHttpResponse, handler::http::AppState,
};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatus {
    pub timestamp: String,
    pub active_alarms: usize,
    pub cached_nodes: usize,
    pub alertmanager_url: String,
    pub alertmanager_enabled: bool,
    pub alertmanager_healthy: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSummary {
    pub alarm_id: i64,
    pub uei: String,
    pub severity: String,
    pub node_label: String,
    pub last_sent: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    pub id: i64,
    pub label: String,
    pub foreign_source: String,
    pub foreign_id: String,
    pub location: String,
    pub categories: Vec<String>,
    pub metadata_count: usize,
}

/// Bridge status
#[utoipa::path(
    get,
    path = "/status",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeStatus",
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = BridgeStatus),
    ),
)]
pub async fn status(State(state): State<AppState>) -> Response {
    let cfg = config::get_config();
    MetaHttpResponse::json(BridgeStatus {
        timestamp: time::now_rfc3339(),
        active_alarms: state.table.len(),
        cached_nodes: state.nodes.len(),
        alertmanager_url: cfg.alertmanager.url.clone(),
        alertmanager_enabled: state.sink.enabled(),
        alertmanager_healthy: state.sink.healthy().await,
    })
}

/// Active alarm table, one summary per reduction key
#[utoipa::path(
    get,
    path = "/alarms",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeAlarms",
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = Object),
    ),
)]
pub async fn alarms(State(state): State<AppState>) -> Response {
    let summaries: BTreeMap<String, AlarmSummary> = state
        .table
        .iter_snapshot()
        .into_iter()
        .map(|(reduction_key, cached)| {
            let summary = AlarmSummary {
                alarm_id: cached.alarm.id,
                uei: cached.alarm.uei.clone(),
                severity: cached.alarm.severity.to_string(),
                node_label: cached
                    .alarm
                    .node_criteria
                    .as_ref()
                    .map(|c| c.node_label.clone())
                    .unwrap_or_default(),
                last_sent: time::millis_to_rfc3339(cached.last_sent).unwrap_or_default(),
            };
            (reduction_key, summary)
        })
        .collect();
    MetaHttpResponse::json(summaries)
}

/// Node cache summaries
#[utoipa::path(
    get,
    path = "/nodes",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeNodes",
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = Vec<NodeSummary>),
    ),
)]
pub async fn nodes(State(state): State<AppState>) -> Response {
    let mut summaries: Vec<NodeSummary> = state
        .nodes
        .snapshot()
        .into_iter()
        .map(|node| NodeSummary {
            id: node.id,
            label: node.label.clone(),
            foreign_source: node.foreign_source.clone(),
            foreign_id: node.foreign_id.clone(),
            location: node.location.clone(),
            categories: node.categories.clone(),
            metadata_count: node.flat_metadata.len(),
        })
        .collect();
    summaries.sort_by_key(|n| n.id);
    MetaHttpResponse::json(summaries)
}

/// Full enriched node by database id
#[utoipa::path(
    get,
    path = "/nodes/{id}",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeNodeById",
    params(
        ("id" = i64, Path, description = "Node database id"),
    ),
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = crate::common::meta::node::Node),
        (status = 404, description = "Not Found", content_type = "application/json", body = MetaHttpResponse),
    ),
)]
pub async fn node_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.nodes.get_by_id(id) {
        Some(node) => MetaHttpResponse::json(node.as_ref()),
        None => MetaHttpResponse::error(
            StatusCode::NOT_FOUND.as_u16(),
            format!("node not found: {id}"),
        )
        .into_response(),
    }
}

/// Trigger one resend cycle now
#[utoipa::path(
    post,
    path = "/alarms/resend",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeResend",
    responses(
        (status = 200, description = "Success", content_type = "text/plain", body = String),
    ),
)]
pub async fn resend(State(state): State<AppState>) -> Response {
    let sent = state.table.resend_all();
    log::info!("[HTTP] manual resend triggered, {sent} alerts queued");
    MetaHttpResponse::text(format!("resend triggered for {sent} alerts"))
}

/// Empty both caches
#[utoipa::path(
    post,
    path = "/clear",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeClear",
    responses(
        (status = 200, description = "Success", content_type = "text/plain", body = String),
    ),
)]
pub async fn clear(State(state): State<AppState>) -> Response {
    state.table.clear();
    state.nodes.clear();
    log::info!("[HTTP] caches cleared");
    MetaHttpResponse::text("caches cleared")
}

/// Proxied alertmanager status body
#[utoipa::path(
    get,
    path = "/alertmanager/status",
    context_path = "/api/v1/bridge",
    tag = "Bridge",
    operation_id = "BridgeAlertmanagerStatus",
    responses(
        (status = 200, description = "Success", content_type = "application/json", body = String),
    ),
)]
pub async fn alertmanager_status(State(state): State<AppState>) -> Response {
    let body = state.sink.status_body().await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
