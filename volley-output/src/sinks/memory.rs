//! In-memory sink, used when telemetry is wanted without a backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::sink::{Labels, SinkError, TelemetryEntry, TelemetrySink};

/// Keeps every pushed line in memory
#[derive(Debug, Default)]
pub struct InMemorySink {
    entries: Mutex<Vec<TelemetryEntry>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TelemetryEntry> {
        self.entries.lock().clone()
    }

    /// Entries whose `label` equals `value`
    pub fn entries_with(&self, label: &str, value: &str) -> Vec<TelemetryEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.labels.get(label).map(String::as_str) == Some(value))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl TelemetrySink for InMemorySink {
    async fn push(
        &self,
        labels: &Labels,
        timestamp: DateTime<Utc>,
        line: String,
    ) -> Result<(), SinkError> {
        self.entries.lock().push(TelemetryEntry {
            labels: labels.clone(),
            timestamp,
            line,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_filter_by_label() {
        let sink = InMemorySink::new();
        let mut stats = Labels::new();
        stats.insert("test_data_type".to_string(), "stats".to_string());
        let mut responses = Labels::new();
        responses.insert("test_data_type".to_string(), "responses".to_string());

        sink.push(&stats, Utc::now(), "{}".to_string()).await.unwrap();
        sink.push(&responses, Utc::now(), "{}".to_string()).await.unwrap();
        sink.push(&responses, Utc::now(), "{}".to_string()).await.unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.entries_with("test_data_type", "responses").len(), 2);
        assert_eq!(sink.entries_with("test_data_type", "stats").len(), 1);
        assert!(sink.entries_with("gen_name", "x").is_empty());
    }
}
