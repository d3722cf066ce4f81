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

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::{alarm_cache::ActiveAlarmTable, node_cache::NodeCache, sink::AlertSink};

pub mod request;
pub mod router;

#[derive(Clone)]
pub struct AppState {
    pub nodes: Arc<NodeCache>,
    pub table: Arc<ActiveAlarmTable>,
    pub sink: Arc<AlertSink>,
}

/// Bind and serve the admin surface. A bind failure is a startup error and
/// is fatal to the process.
pub async fn run(state: AppState, token: CancellationToken) -> Result<(), anyhow::Error> {
    let cfg = config::get_config();
    let addr = if cfg.http.addr.is_empty() {
        format!("0.0.0.0:{}", cfg.http.port)
    } else {
        format!("{}:{}", cfg.http.addr, cfg.http.port)
    };
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("[HTTP] admin server listening on {addr}");
    let app = router::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    log::info!("[HTTP] admin server stopped");
    Ok(())
}
