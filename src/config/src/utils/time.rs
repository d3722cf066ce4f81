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

use chrono::{DateTime, SecondsFormat, Utc};

#[inline(always)]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[inline(always)]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format an epoch-millisecond timestamp as RFC3339 UTC with a `Z` suffix,
/// the shape the alertmanager v2 ingest contract expects.
#[inline(always)]
pub fn millis_to_rfc3339(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[inline(always)]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_to_rfc3339() {
        assert_eq!(
            millis_to_rfc3339(1700000000000).unwrap(),
            "2023-11-14T22:13:20Z"
        );
        assert_eq!(millis_to_rfc3339(0).unwrap(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_now_rfc3339_has_zulu_suffix() {
        assert!(now_rfc3339().ends_with('Z'));
    }
}
