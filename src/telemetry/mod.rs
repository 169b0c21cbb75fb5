//! Telemetry for llm-tools
//!
//! Collects chain step events, retrieval counts and backend token usage.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::Usage;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Chain events
    StepStarted {
        index: usize,
        step: String,
        timestamp: Instant,
    },
    StepCompleted {
        index: usize,
        step: String,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },

    // Retrieval events
    DocumentsRetrieved {
        count: usize,
        timestamp: Instant,
    },

    // Backend events
    BackendCall {
        model: String,
        usage: Usage,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub steps_executed: usize,
    pub steps_succeeded: usize,
    pub steps_failed: usize,
    pub retrievals: usize,
    pub documents_retrieved: usize,
    pub backend_calls: usize,
    pub usage: Usage,
}

/// Telemetry collector, cheap to clone and shared between clones
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Instant,
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::StepStarted { .. } => {
                    stats.steps_executed += 1;
                }
                TelemetryEvent::StepCompleted { success, .. } => {
                    if *success {
                        stats.steps_succeeded += 1;
                    } else {
                        stats.steps_failed += 1;
                    }
                }
                TelemetryEvent::DocumentsRetrieved { count, .. } => {
                    stats.retrievals += 1;
                    stats.documents_retrieved += count;
                }
                TelemetryEvent::BackendCall { usage, .. } => {
                    stats.backend_calls += 1;
                    stats.usage += *usage;
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Shorthand for a backend call event
    pub fn record_usage(&self, model: &str, usage: Usage) {
        self.record(TelemetryEvent::BackendCall {
            model: model.to_string(),
            usage,
            timestamp: Instant::now(),
        });
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Accumulated token usage
    pub fn total_usage(&self) -> Usage {
        lock(&self.stats).usage
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Step success rate, 1.0 when nothing ran
    pub fn step_success_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.steps_succeeded + stats.steps_failed;
        if total == 0 {
            1.0
        } else {
            stats.steps_succeeded as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
