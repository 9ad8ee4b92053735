//! Sample-data fixtures (`load-sample-input-data`/`load-sample-output-data`):
//! turns a flat test-data JSON file into submission or result messages ready
//! to hand to a [`QueueAdapter`](crate::queue::QueueAdapter).

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::queue::{AttributeValue, Attributes};

#[derive(Debug, Deserialize)]
struct SampleRecord {
    #[serde(rename = "package id")]
    package_id: String,
    source: String,
    #[serde(rename = "target system")]
    target_system: Option<String>,
    #[serde(rename = "collection handle")]
    collection_handle: Option<String>,
    #[serde(rename = "metadata location")]
    metadata_location: Option<String>,
    #[serde(default)]
    files: Vec<SampleFile>,
    result: Option<String>,
    handle: Option<String>,
    modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SampleFile {
    name: Option<String>,
    location: Option<String>,
    description: Option<String>,
    #[serde(rename = "bitstream name")]
    bitstream_name: Option<String>,
    uuid: Option<String>,
    checksum: Option<Value>,
}

/// One loaded fixture record: the attributes and JSON body ready to send.
pub struct LoadedMessage {
    pub attributes: Attributes,
    pub body: Value,
}

/// Parse a fixture file into submission messages, each stamped with
/// `output_queue` so the worker knows where to publish its result.
pub fn submission_messages_from_file(
    contents: &str,
    output_queue: &str,
) -> Result<Vec<LoadedMessage>, serde_json::Error> {
    let records: HashMap<String, SampleRecord> = serde_json::from_str(contents)?;
    let mut messages: Vec<_> = records.into_values().collect_in_order();

    Ok(messages
        .drain(..)
        .map(|record| submission_message(&record, output_queue))
        .collect())
}

/// Parse a fixture file into result messages (used to seed a result queue
/// for manual inspection via `load-sample-output-data`).
pub fn result_messages_from_file(contents: &str) -> Result<Vec<LoadedMessage>, serde_json::Error> {
    let records: HashMap<String, SampleRecord> = serde_json::from_str(contents)?;
    let mut messages: Vec<_> = records.into_values().collect_in_order();

    Ok(messages.drain(..).map(result_message).collect())
}

fn submission_message(record: &SampleRecord, output_queue: &str) -> LoadedMessage {
    let mut attributes = Attributes::new();
    attributes.insert("PackageID".to_string(), AttributeValue::string(&record.package_id));
    attributes.insert("SubmissionSource".to_string(), AttributeValue::string(&record.source));
    attributes.insert("OutputQueue".to_string(), AttributeValue::string(output_queue));

    let files: Vec<Value> = record
        .files
        .iter()
        .map(|file| {
            let mut entry = serde_json::Map::new();
            if let Some(name) = &file.name {
                entry.insert("BitstreamName".to_string(), json!(name));
            }
            if let Some(location) = &file.location {
                entry.insert("FileLocation".to_string(), json!(location));
            }
            if let Some(description) = &file.description {
                entry.insert("BitstreamDescription".to_string(), json!(description));
            }
            Value::Object(entry)
        })
        .collect();

    let body = json!({
        "SubmissionSystem": record.target_system,
        "CollectionHandle": record.collection_handle,
        "MetadataLocation": record.metadata_location,
        "Files": files,
    });

    LoadedMessage { attributes, body }
}

fn result_message(record: SampleRecord) -> LoadedMessage {
    let mut attributes = Attributes::new();
    attributes.insert("PackageID".to_string(), AttributeValue::string(&record.package_id));
    attributes.insert("SubmissionSource".to_string(), AttributeValue::string(&record.source));

    let bitstreams: Vec<Value> = record
        .files
        .iter()
        .map(|file| {
            let mut entry = serde_json::Map::new();
            if let Some(name) = &file.bitstream_name {
                entry.insert("BitstreamName".to_string(), json!(name));
            }
            if let Some(uuid) = &file.uuid {
                entry.insert("BitstreamUUID".to_string(), json!(uuid));
            }
            if let Some(checksum) = &file.checksum {
                entry.insert("BitstreamChecksum".to_string(), checksum.clone());
            }
            Value::Object(entry)
        })
        .collect();

    let body = json!({
        "ResultType": record.result,
        "ItemHandle": record.handle,
        "lastModified": record.modified,
        "Bitstreams": bitstreams,
    });

    LoadedMessage { attributes, body }
}

/// `HashMap::into_values()` has no stable order; fixtures are keyed by an
/// arbitrary id in the source file, so sort by that id for deterministic
/// `create_queue`/load ordering in tests and CLI output.
trait CollectInOrder {
    fn collect_in_order(self) -> Vec<SampleRecord>;
}

impl<I: Iterator<Item = SampleRecord>> CollectInOrder for I {
    fn collect_in_order(self) -> Vec<SampleRecord> {
        let mut records: Vec<_> = self.collect();
        records.sort_by(|a, b| a.package_id.cmp(&b.package_id));
        records
    }
}
