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

use crate::service::alarm_cache::ActiveAlarmTable;

mod resend;

pub async fn run(
    table: Arc<ActiveAlarmTable>,
    token: CancellationToken,
) -> Result<(), anyhow::Error> {
    resend::run(table, token).await
}
