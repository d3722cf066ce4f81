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

//! Readers for the two compacted input topics. Every partition gets its own
//! reader task, so a decode backlog on one partition never delays the
//! others; within a partition, dispatch order is the stream's order. A nil
//! or empty payload is a tombstone for the record key.

use std::{sync::Arc, time::Duration};

use config::{metrics, utils::json};
use rdkafka::{
    ClientConfig, Message,
    consumer::{
        Consumer, DefaultConsumerContext, StreamConsumer,
        stream_consumer::StreamPartitionQueue,
    },
    message::BorrowedMessage,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    common::meta::{alarm::Alarm, node::Node},
    service::{alarm_cache::ActiveAlarmTable, node_cache::NodeCache},
};

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

pub fn create_consumer(
    kafka: &config::Kafka,
    topic: &str,
) -> Result<Arc<StreamConsumer>, anyhow::Error> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &kafka.brokers)
        .set("group.id", format!("{}-{topic}", kafka.group_id))
        .set("session.timeout.ms", kafka.session_timeout_ms.to_string())
        .set("enable.auto.commit", "true")
        // the caches rebuild from the compacted log on every restart
        .set("auto.offset.reset", "earliest")
        .create()?;
    consumer.subscribe(&[topic])?;
    Ok(Arc::new(consumer))
}

pub fn decode_alarm(payload: &[u8]) -> Result<Alarm, json::Error> {
    json::from_slice(payload)
}

pub fn decode_node(payload: &[u8]) -> Result<Node, json::Error> {
    json::from_slice::<Node>(payload).map(Node::with_flat_metadata)
}

pub fn spawn_alarm_consumer(
    consumer: Arc<StreamConsumer>,
    table: Arc<ActiveAlarmTable>,
    token: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, anyhow::Error> {
    let topic = config::get_config().kafka.alarms_topic.clone();
    spawn_partition_readers(consumer, topic, token, move |topic, msg| {
        handle_alarm_record(topic, msg, &table)
    })
}

pub fn spawn_node_consumer(
    consumer: Arc<StreamConsumer>,
    nodes: Arc<NodeCache>,
    token: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, anyhow::Error> {
    let topic = config::get_config().kafka.nodes_topic.clone();
    spawn_partition_readers(consumer, topic, token, move |topic, msg| {
        handle_node_record(topic, msg, &nodes)
    })
}

fn partition_ids(consumer: &StreamConsumer, topic: &str) -> Result<Vec<i32>, anyhow::Error> {
    let metadata = consumer.fetch_metadata(Some(topic), METADATA_TIMEOUT)?;
    let partitions: Vec<i32> = metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .map(|t| t.partitions().iter().map(|p| p.id()).collect())
        .unwrap_or_default();
    if partitions.is_empty() {
        return Err(anyhow::anyhow!("no partitions found for topic {topic}"));
    }
    Ok(partitions)
}

/// Split the consumer into one queue per partition and spawn a reader task
/// for each. Partition discovery failing here is a startup error and
/// bubbles up as fatal.
fn spawn_partition_readers<F>(
    consumer: Arc<StreamConsumer>,
    topic: String,
    token: CancellationToken,
    handle: F,
) -> Result<Vec<JoinHandle<()>>, anyhow::Error>
where
    F: Fn(&str, &BorrowedMessage<'_>) + Clone + Send + Sync + 'static,
{
    let partitions = partition_ids(&consumer, &topic)?;
    log::info!(
        "[KAFKA] consumer started on topic {topic} with {} partition readers",
        partitions.len()
    );
    let mut tasks = Vec::with_capacity(partitions.len() + 1);
    for partition in partitions {
        let queue = consumer
            .split_partition_queue(&topic, partition)
            .ok_or_else(|| anyhow::anyhow!("cannot split queue for {topic}[{partition}]"))?;
        tasks.push(tokio::spawn(run_partition_reader(
            queue,
            topic.clone(),
            partition,
            token.clone(),
            handle.clone(),
        )));
    }
    // the base consumer still has to be polled to serve rebalances and
    // errors; with every partition split off it never yields a message
    tasks.push(tokio::spawn(drive_base_consumer(consumer, topic, token)));
    Ok(tasks)
}

async fn run_partition_reader<F>(
    queue: StreamPartitionQueue<DefaultConsumerContext>,
    topic: String,
    partition: i32,
    token: CancellationToken,
    handle: F,
) where
    F: Fn(&str, &BorrowedMessage<'_>),
{
    log::debug!("[KAFKA] reader started for {topic}[{partition}]");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            res = queue.recv() => match res {
                Ok(msg) => handle(&topic, &msg),
                Err(e) => {
                    log::error!("[KAFKA] receive error on {topic}[{partition}]: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
    log::debug!("[KAFKA] reader stopped for {topic}[{partition}]");
}

async fn drive_base_consumer(
    consumer: Arc<StreamConsumer>,
    topic: String,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            res = consumer.recv() => match res {
                Ok(msg) => log::error!(
                    "[KAFKA] unexpected message on the main queue for {topic}[{}]",
                    msg.partition()
                ),
                Err(e) => {
                    log::error!("[KAFKA] {topic} consumer error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
    log::info!("[KAFKA] consumer stopped for topic {topic}");
}

fn record_key(msg: &BorrowedMessage<'_>) -> String {
    msg.key()
        .map(|k| String::from_utf8_lossy(k).into_owned())
        .unwrap_or_default()
}

fn handle_alarm_record(topic: &str, msg: &BorrowedMessage<'_>, table: &ActiveAlarmTable) {
    metrics::RECORDS_RECEIVED.with_label_values(&[topic]).inc();
    let key = record_key(msg);
    match msg.payload() {
        None | Some([]) => {
            metrics::TOMBSTONES_RECEIVED.with_label_values(&[topic]).inc();
            log::debug!("[KAFKA] alarm tombstone for {key}");
            table.on_tombstone(&key);
        }
        Some(payload) => match decode_alarm(payload) {
            Ok(alarm) => {
                metrics::RECORDS_PARSED.with_label_values(&[topic]).inc();
                table.upsert(alarm);
            }
            Err(e) => {
                // decode failures drop the record, the compacted log will
                // replay a newer value for the key eventually
                metrics::RECORD_PARSE_ERRORS.with_label_values(&[topic]).inc();
                log::warn!(
                    "[KAFKA] undecodable alarm record {topic}[{}]@{}: {e}",
                    msg.partition(),
                    msg.offset()
                );
            }
        },
    }
}

fn handle_node_record(topic: &str, msg: &BorrowedMessage<'_>, nodes: &NodeCache) {
    metrics::RECORDS_RECEIVED.with_label_values(&[topic]).inc();
    let key = record_key(msg);
    match msg.payload() {
        None | Some([]) => {
            metrics::TOMBSTONES_RECEIVED.with_label_values(&[topic]).inc();
            log::debug!("[KAFKA] node tombstone for {key}");
            nodes.remove(&key);
        }
        Some(payload) => match decode_node(payload) {
            Ok(node) => {
                metrics::RECORDS_PARSED.with_label_values(&[topic]).inc();
                nodes.put(node);
            }
            Err(e) => {
                metrics::RECORD_PARSE_ERRORS.with_label_values(&[topic]).inc();
                log::warn!(
                    "[KAFKA] undecodable node record {topic}[{}]@{}: {e}",
                    msg.partition(),
                    msg.offset()
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_alarm() {
        let alarm = decode_alarm(
            br#"{"id":1,"reductionKey":"rk1","uei":"uei.opennms.org/nodes/nodeDown","severity":"MAJOR","type":1,"firstEventTime":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(alarm.id, 1);
        assert_eq!(alarm.first_event_time, 1700000000000);
        assert!(decode_alarm(b"not json").is_err());
    }

    #[test]
    fn test_decode_node_flattens_metadata() {
        let node = decode_node(
            br#"{"id":10,"label":"router-1","metadata":{"requisition":{"rack":"r12"}}}"#,
        )
        .unwrap();
        assert_eq!(node.flat_metadata["requisition:rack"], "r12");
        assert!(decode_node(b"{").is_err());
    }
}
