//! Usage statistics derived from the execution history.

use crate::tools::history::ExecutionResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate counters over the retained history. Read-only view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub average_response_time_ms: f64,
    pub tools_used: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Stateless collector; recomputation is bounded by the history capacity.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsageStatsCollector;

impl UsageStatsCollector {
    /// Compute stats over results ordered newest first.
    pub fn compute<'a, I>(&self, results: I) -> UsageStats
    where
        I: IntoIterator<Item = &'a ExecutionResult>,
    {
        let mut stats = UsageStats {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            average_response_time_ms: 0.0,
            tools_used: BTreeMap::new(),
            last_used: None,
        };
        let mut total_time_ms: u64 = 0;

        for result in results {
            stats.total_requests += 1;
            if result.success {
                stats.successful_requests += 1;
            } else {
                stats.failed_requests += 1;
            }
            total_time_ms = total_time_ms.saturating_add(result.execution_time_ms);
            *stats.tools_used.entry(result.tool_id.clone()).or_default() += 1;
            stats.last_used = Some(match stats.last_used {
                Some(seen) if seen >= result.timestamp => seen,
                _ => result.timestamp,
            });
        }

        if stats.total_requests > 0 {
            stats.average_response_time_ms = total_time_ms as f64 / stats.total_requests as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::history::ExecutionHistory;
    use crate::types::ExecutionId;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_stats_correctness() {
        let mut history = ExecutionHistory::default();
        history.append(ExecutionResult::success(
            ExecutionId::new(),
            "github",
            "search",
            json!({}),
            100,
        ));
        history.append(ExecutionResult::failure(
            ExecutionId::new(),
            "exa",
            "search",
            "boom",
            300,
        ));

        let stats = UsageStatsCollector.compute(history.iter());
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert!((stats.average_response_time_ms - 200.0).abs() < f64::EPSILON);
        assert_eq!(stats.tools_used.get("github"), Some(&1));
        assert_eq!(stats.tools_used.get("exa"), Some(&1));
        assert_eq!(stats.last_used, history.newest().map(|r| r.timestamp));
    }

    #[test]
    fn test_empty_history() {
        let history = ExecutionHistory::default();
        let stats = UsageStatsCollector.compute(history.iter());
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.average_response_time_ms, 0.0);
        assert!(stats.tools_used.is_empty());
        assert!(stats.last_used.is_none());
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut history = ExecutionHistory::default();
        for n in 0..5 {
            history.append(ExecutionResult::success(
                ExecutionId::new(),
                "filesystem",
                "list",
                json!(n),
                n * 10,
            ));
        }
        let first = UsageStatsCollector.compute(history.iter());
        let second = UsageStatsCollector.compute(history.iter());
        assert_eq!(first, second);
        assert_eq!(first.tools_used.get("filesystem"), Some(&5));
    }

    #[test]
    fn test_wire_shape() {
        let stats = UsageStatsCollector.compute(std::iter::empty());
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalRequests"], 0);
        assert_eq!(value["averageResponseTimeMs"], 0.0);
        assert!(value["toolsUsed"].as_object().unwrap().is_empty());
    }
}
