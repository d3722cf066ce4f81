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

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const ALERTNAME_LABEL: &str = "alertname";

/// One alert in the alertmanager v2 ingest contract. The label set is the
/// deduplication identity downstream; `BTreeMap` keeps serialization
/// deterministic so re-mapping the same alarm yields byte-identical JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(rename = "startsAt", skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    /// presence means resolved
    #[serde(rename = "endsAt", skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    #[serde(rename = "generatorURL", default, skip_serializing_if = "String::is_empty")]
    pub generator_url: String,
}

impl Alert {
    pub fn is_resolved(&self) -> bool {
        self.ends_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use config::utils::json;

    use super::*;

    #[test]
    fn test_empty_fields_are_omitted_from_wire_shape() {
        let mut alert = Alert::default();
        alert
            .labels
            .insert(ALERTNAME_LABEL.to_string(), "opennms_test".to_string());
        let body = json::to_string(&alert).unwrap();
        assert_eq!(body, r#"{"labels":{"alertname":"opennms_test"}}"#);
    }

    #[test]
    fn test_ends_at_marks_resolved() {
        let mut alert = Alert::default();
        assert!(!alert.is_resolved());
        alert.ends_at = Some("2023-11-14T22:13:20Z".to_string());
        assert!(alert.is_resolved());
    }
}
