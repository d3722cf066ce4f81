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

use std::{sync::Arc, time::Duration};

use onms_alertmanager_bridge::{
    handler::{self, http::AppState},
    job,
    service::{
        alarm_cache::ActiveAlarmTable,
        consumer,
        mapper::MapperSettings,
        node_cache::NodeCache,
        sink::AlertSink,
    },
};
use tokio_util::sync::CancellationToken;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("INFO"));
    let cfg = config::get_config();
    log::info!(
        "[MAIN] starting onms-alertmanager-bridge, alertmanager {} (enabled: {})",
        cfg.alertmanager.url,
        cfg.alertmanager.enabled
    );

    // components are wired here once, no runtime discovery
    let nodes = Arc::new(NodeCache::new());
    let sink = Arc::new(AlertSink::new(&cfg.alertmanager)?);
    let table = Arc::new(ActiveAlarmTable::new(
        nodes.clone(),
        sink.clone(),
        MapperSettings::from_config(&cfg),
        (cfg.alert.resolved_retention * 1000) as i64,
    ));

    let alarm_consumer = consumer::create_consumer(&cfg.kafka, &cfg.kafka.alarms_topic)?;
    let node_consumer = consumer::create_consumer(&cfg.kafka, &cfg.kafka.nodes_topic)?;

    let token = CancellationToken::new();
    let mut tasks = Vec::new();
    tasks.extend(consumer::spawn_node_consumer(
        node_consumer,
        nodes.clone(),
        token.clone(),
    )?);
    tasks.extend(consumer::spawn_alarm_consumer(
        alarm_consumer,
        table.clone(),
        token.clone(),
    )?);

    let job_table = table.clone();
    let job_token = token.clone();
    let job_handle = tokio::spawn(async move { job::run(job_table, job_token).await });

    let state = AppState { nodes, table, sink };
    let mut http_handle = tokio::spawn(handler::http::run(state, token.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("[MAIN] shutdown signal received");
        }
        res = &mut http_handle => {
            // the admin server never exits on its own unless binding or
            // serving failed, and that is fatal
            res??;
            return Err(anyhow::anyhow!("admin http server exited unexpectedly"));
        }
    }

    token.cancel();
    let drain = async {
        for task in tasks {
            let _ = task.await;
        }
        let _ = job_handle.await;
        let _ = http_handle.await;
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        log::warn!("[MAIN] grace period expired, abandoning in-flight work");
    }
    log::info!("[MAIN] bye");
    Ok(())
}
