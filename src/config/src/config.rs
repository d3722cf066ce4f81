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

use arc_swap::ArcSwap;
use dotenv_config::EnvConfig;
use dotenvy::dotenv_override;
use once_cell::sync::Lazy;

pub type RwHashMap<K, V> = dashmap::DashMap<K, V>;

static CONFIG: Lazy<ArcSwap<Config>> = Lazy::new(|| ArcSwap::from(Arc::new(init())));

pub fn get_config() -> Arc<Config> {
    CONFIG.load().clone()
}

#[derive(EnvConfig)]
pub struct Config {
    pub http: Http,
    pub kafka: Kafka,
    pub alertmanager: Alertmanager,
    pub alert: Alert,
    pub opennms: OpenNms,
}

#[derive(EnvConfig)]
pub struct Http {
    #[env_config(name = "OAB_HTTP_PORT", default = 9080)]
    pub port: u16,
    #[env_config(name = "OAB_HTTP_ADDR", default = "")]
    pub addr: String,
}

#[derive(EnvConfig)]
pub struct Kafka {
    #[env_config(name = "OAB_KAFKA_BROKERS", default = "localhost:9092")]
    pub brokers: String,
    #[env_config(name = "OAB_KAFKA_GROUP_ID", default = "onms-alertmanager-bridge")]
    pub group_id: String,
    #[env_config(name = "OAB_KAFKA_ALARMS_TOPIC", default = "alarms")]
    pub alarms_topic: String,
    #[env_config(name = "OAB_KAFKA_NODES_TOPIC", default = "nodes")]
    pub nodes_topic: String,
    #[env_config(name = "OAB_KAFKA_SESSION_TIMEOUT", default = 6000)] // in milliseconds
    pub session_timeout_ms: u64,
}

#[derive(EnvConfig)]
pub struct Alertmanager {
    #[env_config(name = "OAB_ALERTMANAGER_URL", default = "http://localhost:9093")]
    pub url: String,
    #[env_config(name = "OAB_ALERTMANAGER_API_PATH", default = "/api/v2/alerts")]
    pub api_path: String,
    #[env_config(name = "OAB_ALERTMANAGER_ENABLED", default = true)]
    pub enabled: bool,
    #[env_config(name = "OAB_ALERTMANAGER_CONNECT_TIMEOUT", default = 5)] // in seconds
    pub connect_timeout: u64,
    #[env_config(name = "OAB_ALERTMANAGER_READ_TIMEOUT", default = 30)] // in seconds
    pub read_timeout: u64,
    #[env_config(name = "OAB_ALERTMANAGER_RETRY_MAX_ATTEMPTS", default = 3)]
    pub retry_max_attempts: u32,
    #[env_config(name = "OAB_ALERTMANAGER_RETRY_BACKOFF", default = 1)] // initial, in seconds
    pub retry_backoff: u64,
}

#[derive(EnvConfig)]
pub struct Alert {
    #[env_config(name = "OAB_ALERT_RESEND_INTERVAL", default = 60)] // in seconds
    pub resend_interval: u64,
    #[env_config(name = "OAB_ALERT_RESOLVED_RETENTION", default = 300)] // in seconds, 0 disables
    pub resolved_retention: u64,
    // comma list of key=value pairs, e.g. "env=prod,region=us-east-1"
    #[env_config(name = "OAB_ALERT_STATIC_LABELS", default = "")]
    pub static_labels: String,
    // comma list of mapped severity names, empty means all
    #[env_config(name = "OAB_ALERT_INCLUDE_SEVERITIES", default = "")]
    pub include_severities: String,
    #[env_config(name = "OAB_ALERT_EXCLUDE_UEIS", default = "")]
    pub exclude_ueis: String,
    #[env_config(name = "OAB_ALERT_INCLUDE_NODE_METADATA", default = true)]
    pub include_node_metadata: bool,
    #[env_config(name = "OAB_ALERT_NODE_METADATA_PREFIX", default = "node_meta_")]
    pub node_metadata_prefix: String,
    #[env_config(name = "OAB_ALERT_INCLUDE_NODE_CATEGORIES", default = true)]
    pub include_node_categories: bool,
    #[env_config(name = "OAB_ALERT_CATEGORIES_LABEL", default = "opennms_categories")]
    pub categories_label: String,
    #[env_config(name = "OAB_ALERT_INCLUDE_NODE_DETAILS", default = false)]
    pub include_node_details: bool,
    #[env_config(name = "OAB_ALERT_NODE_DETAILS_KEY", default = "opennms_node")]
    pub node_details_key: String,
    #[env_config(name = "OAB_ALERT_INCLUDE_DESCRIPTION", default = true)]
    pub include_description: bool,
    #[env_config(name = "OAB_ALERT_INCLUDE_OPERATOR_INSTRUCTIONS", default = true)]
    pub include_operator_instructions: bool,
}

#[derive(EnvConfig)]
pub struct OpenNms {
    #[env_config(name = "OAB_OPENNMS_BASE_URL", default = "http://localhost:8980/opennms")]
    pub base_url: String,
}

pub fn init() -> Config {
    dotenv_override().ok();
    let mut cfg = Config::init().unwrap();
    if let Err(e) = check_config(&mut cfg) {
        panic!("config check error: {e}");
    }
    cfg
}

fn check_config(cfg: &mut Config) -> Result<(), anyhow::Error> {
    if cfg.alertmanager.enabled && cfg.alertmanager.url.is_empty() {
        return Err(anyhow::anyhow!(
            "OAB_ALERTMANAGER_URL must be set when the alertmanager is enabled"
        ));
    }
    // trailing slashes break url joining
    cfg.alertmanager.url = cfg.alertmanager.url.trim_end_matches('/').to_string();
    cfg.opennms.base_url = cfg.opennms.base_url.trim_end_matches('/').to_string();
    if !cfg.alertmanager.api_path.starts_with('/') {
        cfg.alertmanager.api_path = format!("/{}", cfg.alertmanager.api_path);
    }
    if cfg.alertmanager.retry_max_attempts == 0 {
        cfg.alertmanager.retry_max_attempts = 1;
    }
    if cfg.alert.resend_interval == 0 {
        return Err(anyhow::anyhow!("OAB_ALERT_RESEND_INTERVAL must be > 0"));
    }
    if cfg.kafka.alarms_topic.is_empty() || cfg.kafka.nodes_topic.is_empty() {
        return Err(anyhow::anyhow!(
            "OAB_KAFKA_ALARMS_TOPIC and OAB_KAFKA_NODES_TOPIC must be set"
        ));
    }
    if cfg.kafka.alarms_topic == cfg.kafka.nodes_topic {
        return Err(anyhow::anyhow!(
            "alarms and nodes topics must not be the same topic"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = init();
        assert_eq!(cfg.alertmanager.api_path, "/api/v2/alerts");
        assert!(cfg.alertmanager.retry_max_attempts >= 1);
        assert!(cfg.alert.resend_interval > 0);
        assert!(!cfg.alertmanager.url.ends_with('/'));
    }

    #[test]
    fn test_check_config_rejects_same_topic() {
        let mut cfg = Config::init().unwrap();
        cfg.kafka.alarms_topic = "t".to_string();
        cfg.kafka.nodes_topic = "t".to_string();
        assert!(check_config(&mut cfg).is_err());
    }

    #[test]
    fn test_check_config_normalizes_api_path() {
        let mut cfg = Config::init().unwrap();
        cfg.alertmanager.api_path = "api/v2/alerts".to_string();
        cfg.alertmanager.url = "http://am:9093/".to_string();
        check_config(&mut cfg).unwrap();
        assert_eq!(cfg.alertmanager.api_path, "/api/v2/alerts");
        assert_eq!(cfg.alertmanager.url, "http://am:9093");
    }
}
