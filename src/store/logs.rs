//! Live log ring (spec §3 "Live log ring", §4.6 SSE logs endpoint).
//!
//! Bounded in-memory buffer of worker log lines per deployment, written by
//! worker callbacks and drained by SSE log subscribers.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::{LogLevel, LogLine};

struct Ring {
    lines: VecDeque<(Instant, LogLine)>,
}

/// Process-local live log ring, keyed by deployment id.
pub struct LiveLogRing {
    rings: DashMap<String, Ring>,
    capacity: usize,
    ttl: Duration,
}

impl LiveLogRing {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            rings: DashMap::new(),
            capacity,
            ttl,
        }
    }

    pub fn push(&self, deployment_id: &str, line: LogLine) {
        let mut ring = self
            .rings
            .entry(deployment_id.to_string())
            .or_insert_with(|| Ring { lines: VecDeque::new() });
        ring.lines.push_back((Instant::now(), line));
        while ring.lines.len() > self.capacity {
            ring.lines.pop_front();
        }
    }

    /// Return log lines appended after `since`, pruning anything past TTL.
    pub fn since(
        &self,
        deployment_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Vec<LogLine> {
        let Some(mut ring) = self.rings.get_mut(deployment_id) else {
            return Vec::new();
        };
        let now = Instant::now();
        let ttl = self.ttl;
        ring.lines.retain(|(t, _)| now.duration_since(*t) < ttl);
        ring.lines
            .iter()
            .filter(|(_, l)| l.timestamp > since)
            .map(|(_, l)| l.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(msg: &str) -> LogLine {
        LogLine {
            timestamp: chrono::Utc::now(),
            level: LogLevel::Info,
            message: msg.to_string(),
        }
    }

    #[test]
    fn bounded_by_capacity() {
        let ring = LiveLogRing::new(3, Duration::from_secs(60));
        for i in 0..10 {
            ring.push("dep_1", line(&format!("line {i}")));
        }
        let all = ring.since("dep_1", chrono::Utc::now() - chrono::Duration::seconds(60));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn since_filters_by_timestamp() {
        let ring = LiveLogRing::new(10, Duration::from_secs(60));
        let cutoff = chrono::Utc::now();
        std::thread::sleep(Duration::from_millis(5));
        ring.push("dep_1", line("after cutoff"));
        let recent = ring.since("dep_1", cutoff);
        assert_eq!(recent.len(), 1);
    }
}
