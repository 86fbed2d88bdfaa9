use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub activity_name: String,
    pub activity_description: String,
    /// Milliseconds since the Unix epoch.
    pub start_time_unix: i64,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub software_version: BTreeMap<String, String>,
    #[serde(default)]
    pub input_data: BTreeMap<String, String>,
    #[serde(default)]
    pub output_data: BTreeMap<String, String>,
}

impl ProvenanceRecord {
    pub fn with_input(mut self, key: &str, value: impl Into<String>) -> Self {
        self.input_data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_output(mut self, key: &str, value: impl Into<String>) -> Self {
        self.output_data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_software_version(mut self, versions: BTreeMap<String, String>) -> Self {
        self.software_version = versions;
        self
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_time_unix)
    }
}

/// Wall-clock start plus a monotonic clock for the duration.
#[derive(Debug, Clone, Copy)]
pub struct StepTimer {
    started_at: DateTime<Utc>,
    started: Instant,
}

impl StepTimer {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Stops the timer and produces a record with empty data maps.
    pub fn finish(&self, activity_name: &str, activity_description: &str) -> ProvenanceRecord {
        ProvenanceRecord {
            activity_name: activity_name.to_string(),
            activity_description: activity_description.to_string(),
            start_time_unix: self.started_at.timestamp_millis(),
            processing_time_ms: self.elapsed_ms(),
            parameters: BTreeMap::new(),
            software_version: BTreeMap::new(),
            input_data: BTreeMap::new(),
            output_data: BTreeMap::new(),
        }
    }
}

/// Ordered list of records, serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvenanceChain {
    records: Vec<ProvenanceRecord>,
}

impl ProvenanceChain {
    pub fn records(&self) -> &[ProvenanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&ProvenanceRecord> {
        self.records.last()
    }

    pub(crate) fn push(&mut self, record: ProvenanceRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_finish_records_start_and_name() {
        let timer = StepTimer::start();
        let record = timer
            .finish("download", "Download input data")
            .with_output("file_path", "/tmp/x.tar.gz");

        assert_eq!(record.activity_name, "download");
        assert_eq!(
            record.start_time_unix,
            timer.started_at().timestamp_millis()
        );
        assert_eq!(record.output_data["file_path"], "/tmp/x.tar.gz");
        assert!(record.input_data.is_empty());
        assert_eq!(
            record.started_at().unwrap().timestamp_millis(),
            timer.started_at().timestamp_millis()
        );
    }

    #[test]
    fn test_record_json_field_names() {
        let record = StepTimer::start().finish("a", "b").with_input("k", "v");
        let json = serde_json::to_value(&record).unwrap();

        for key in [
            "activity_name",
            "activity_description",
            "start_time_unix",
            "processing_time_ms",
            "parameters",
            "software_version",
            "input_data",
            "output_data",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(json["input_data"]["k"], "v");
    }

    #[test]
    fn test_chain_serializes_as_array() {
        let mut chain = ProvenanceChain::default();
        chain.push(StepTimer::start().finish("first", ""));
        chain.push(StepTimer::start().finish("second", ""));

        let json = serde_json::to_value(&chain).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["activity_name"], "first");
        assert_eq!(array[1]["activity_name"], "second");
    }
}
