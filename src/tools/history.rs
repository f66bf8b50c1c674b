//! Execution history - bounded, newest-first ledger of invocation results.

use crate::types::ExecutionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Number of results retained by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Outcome of one tool invocation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub execution_id: ExecutionId,
    pub tool_id: String,
    pub action: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionResult {
    pub fn success(
        execution_id: ExecutionId,
        tool_id: &str,
        action: &str,
        data: Value,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            execution_id,
            tool_id: tool_id.to_string(),
            action: action.to_string(),
            success: true,
            data: Some(data),
            error: None,
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        execution_id: ExecutionId,
        tool_id: &str,
        action: &str,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            execution_id,
            tool_id: tool_id.to_string(),
            action: action.to_string(),
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only ledger with FIFO eviction at the tail.
///
/// Index 0 is the most recently appended result.
#[derive(Debug)]
pub struct ExecutionHistory {
    entries: VecDeque<ExecutionResult>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a result as the newest entry, evicting the oldest beyond capacity.
    pub fn append(&mut self, result: ExecutionResult) {
        self.entries.push_front(result);
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::trace!(execution_id = %evicted.execution_id, "history entry evicted");
            }
        }
    }

    /// Results for one tool, newest first.
    pub fn by_tool(&self, tool_id: &str) -> Vec<ExecutionResult> {
        self.entries
            .iter()
            .filter(|r| r.tool_id == tool_id)
            .cloned()
            .collect()
    }

    pub fn get(&self, execution_id: &str) -> Option<&ExecutionResult> {
        self.entries
            .iter()
            .find(|r| r.execution_id.as_str() == execution_id)
    }

    pub fn newest(&self) -> Option<&ExecutionResult> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.entries.iter()
    }

    /// Owned copy of all entries, newest first.
    pub fn snapshot(&self) -> Vec<ExecutionResult> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn result(tool_id: &str, n: u64) -> ExecutionResult {
        ExecutionResult::success(ExecutionId::new(), tool_id, "run", json!({ "n": n }), n)
    }

    #[test]
    fn test_newest_first() {
        let mut history = ExecutionHistory::default();
        let first = result("github", 1);
        let last = result("exa", 2);
        history.append(first.clone());
        history.append(last.clone());

        assert_eq!(history.newest(), Some(&last));
        assert_eq!(history.snapshot(), vec![last, first]);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut history = ExecutionHistory::default();
        let oldest = result("github", 0);
        history.append(oldest.clone());
        for n in 1..=50 {
            history.append(result("exa", n));
        }

        assert_eq!(history.len(), 50);
        assert!(history.get(oldest.execution_id.as_str()).is_none());
        assert!(history.by_tool("github").is_empty());
        assert_eq!(history.snapshot().last().unwrap().execution_time_ms, 1);
    }

    #[test]
    fn test_by_tool_preserves_order() {
        let mut history = ExecutionHistory::default();
        for n in 0..6 {
            let tool = if n % 2 == 0 { "github" } else { "exa" };
            history.append(result(tool, n));
        }
        let times: Vec<u64> = history
            .by_tool("github")
            .iter()
            .map(|r| r.execution_time_ms)
            .collect();
        assert_eq!(times, vec![4, 2, 0]);
    }

    #[test]
    fn test_get_and_clear() {
        let mut history = ExecutionHistory::default();
        let r = result("github", 7);
        history.append(r.clone());
        assert_eq!(history.get(r.execution_id.as_str()), Some(&r));

        history.clear();
        assert!(history.is_empty());
        assert!(history.get(r.execution_id.as_str()).is_none());
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = ExecutionHistory::new(0);
        history.append(result("a", 1));
        history.append(result("a", 2));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.newest().unwrap().execution_time_ms, 2);
    }

    #[test]
    fn test_result_wire_shape() {
        let r = ExecutionResult::failure(ExecutionId::new(), "exa", "search", "timeout", 60_000);
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "timeout");
        assert_eq!(value["executionTimeMs"], 60_000);
        assert_eq!(value["toolId"], "exa");
        assert!(value.get("data").is_none());
    }

    proptest! {
        #[test]
        fn prop_len_never_exceeds_capacity(count in 0usize..200, capacity in 1usize..80) {
            let mut history = ExecutionHistory::new(capacity);
            for n in 0..count {
                history.append(result("t", n as u64));
            }
            prop_assert_eq!(history.len(), count.min(capacity));
            if count > 0 {
                prop_assert_eq!(history.newest().unwrap().execution_time_ms, (count - 1) as u64);
            }
        }
    }
}
