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

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::service::alarm_cache::ActiveAlarmTable;

/// Re-push every live alert on a fixed cadence so the aggregator never
/// garbage-collects an alarm that is still firing. Each tick snapshots and
/// sends on its own, overlapping sends are absorbed by the aggregator's
/// dedup.
pub async fn run(
    table: Arc<ActiveAlarmTable>,
    token: CancellationToken,
) -> Result<(), anyhow::Error> {
    let period = time::Duration::from_secs(config::get_config().alert.resend_interval);
    log::info!("[RESEND] scheduler started, period {period:?}");
    let mut interval = time::interval(period);
    interval.tick().await; // the zeroth tick fires immediately
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let sent = table.resend_all();
                if sent > 0 {
                    log::debug!("[RESEND] re-emitted {sent} alerts");
                }
            }
        }
    }
    log::info!("[RESEND] scheduler stopped");
    Ok(())
}
