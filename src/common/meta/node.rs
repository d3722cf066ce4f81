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

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct IpInterface {
    pub id: i64,
    pub ip_address: String,
    pub if_index: Option<i32>,
    /// `P` primary, `S` secondary, `N` not eligible
    pub primary_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SnmpInterface {
    pub id: i64,
    pub if_index: Option<i32>,
    pub if_descr: String,
    pub if_type: Option<i32>,
    pub if_name: String,
    pub if_speed: i64,
    pub phys_addr: String,
    pub admin_status: String,
    pub oper_status: String,
    pub if_alias: String,
}

/// A monitored-node inventory snapshot as it arrives on the nodes topic.
/// Records replace each other wholesale, there is no merge.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    pub id: i64,
    pub foreign_source: String,
    pub foreign_id: String,
    pub location: String,
    pub label: String,
    /// epoch milliseconds
    pub create_time: i64,
    pub sys_contact: String,
    pub sys_description: String,
    pub sys_object_id: String,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_interfaces: Vec<IpInterface>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snmp_interfaces: Vec<SnmpInterface>,
    /// two-level custom metadata, context -> key -> value
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, BTreeMap<String, String>>,
    /// derived `context:key` -> value mapping, rebuilt on decode
    #[serde(skip)]
    pub flat_metadata: BTreeMap<String, String>,
}

impl Node {
    /// The node's identity on the nodes topic: `fs:fid` when both halves are
    /// present, the decimal database id otherwise.
    pub fn identity_key(&self) -> String {
        if !self.foreign_source.is_empty() && !self.foreign_id.is_empty() {
            format!("{}:{}", self.foreign_source, self.foreign_id)
        } else {
            self.id.to_string()
        }
    }

    /// Precompute the flat metadata view so every alarm enrichment does not
    /// walk the two-level map again.
    pub fn with_flat_metadata(mut self) -> Self {
        self.flat_metadata = self
            .metadata
            .iter()
            .flat_map(|(context, entries)| {
                entries
                    .iter()
                    .map(move |(k, v)| (format!("{context}:{k}"), v.clone()))
            })
            .collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use config::utils::json;

    use super::*;

    #[test]
    fn test_identity_key_prefers_foreign_pair() {
        let node = Node {
            id: 10,
            foreign_source: "fs".to_string(),
            foreign_id: "n10".to_string(),
            ..Default::default()
        };
        assert_eq!(node.identity_key(), "fs:n10");
    }

    #[test]
    fn test_identity_key_falls_back_to_id() {
        let node = Node {
            id: 10,
            foreign_source: "fs".to_string(),
            ..Default::default()
        };
        assert_eq!(node.identity_key(), "10");
    }

    #[test]
    fn test_flat_metadata() {
        let node: Node = json::from_str(
            r#"{"id":1,"label":"n","metadata":{"requisition":{"rack":"r12","row":"b"},"asset":{"owner":"net-ops"}}}"#,
        )
        .unwrap();
        let node = node.with_flat_metadata();
        assert_eq!(node.flat_metadata.len(), 3);
        assert_eq!(node.flat_metadata["requisition:rack"], "r12");
        assert_eq!(node.flat_metadata["asset:owner"], "net-ops");
    }
}
