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

use utoipa::OpenApi;

use crate::{
    common::meta::{self, http::HttpResponse},
    handler::http::request::{bridge, status},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        status::healthz,
        status::metrics,
        bridge::status,
        bridge::alarms,
        bridge::resend,
        bridge::nodes,
        bridge::node_by_id,
        bridge::clear,
        bridge::alertmanager_status,
    ),
    components(schemas(
        HttpResponse,
        status::HealthzResponse,
        bridge::BridgeStatus,
        bridge::AlarmSummary,
        bridge::NodeSummary,
        meta::node::Node,
        meta::node::IpInterface,
        meta::node::SnmpInterface,
    )),
    tags(
        (name = "Status", description = "Process liveness and metrics"),
        (name = "Bridge", description = "Read-only bridge state and manual triggers"),
    ),
    info(
        title = "OpenNMS Alertmanager Bridge",
        description = "Bridges OpenNMS alarm and node streams into Prometheus Alertmanager",
    ),
)]
pub struct ApiDoc;
