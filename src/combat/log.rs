//! Event logging
//!
//! Records all simulation events for display and post-run analysis.

use bevy::prelude::*;

/// A single entry in the event log
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Timestamp in simulation time (seconds since sim start)
    pub timestamp: f32,
    /// The type of event
    pub kind: LogEventKind,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEventKind {
    /// Damage dealt
    Damage,
    /// Projectile hit a target
    Hit,
    /// Buff applied or refreshed
    BuffApplied,
    /// Buff removed or expired
    BuffRemoved,
    /// Target died
    Death,
    /// A buff hook or effect handler failed (contained)
    Fault,
    /// Simulation event (start, end, volley fired, etc.)
    SimEvent,
}

/// The event log resource storing all events
#[derive(Resource, Default)]
pub struct EventLog {
    /// All log entries in chronological order
    pub entries: Vec<LogEntry>,
    /// Current simulation time
    pub sim_time: f32,
}

impl EventLog {
    /// Clear the log for a new run
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sim_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, kind: LogEventKind, message: String) {
        self.entries.push(LogEntry {
            timestamp: self.sim_time,
            kind,
            message,
        });
    }

    /// Get entries filtered by event kind
    pub fn filter_by_kind(&self, kind: LogEventKind) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// Count entries of a given kind
    pub fn count_of(&self, kind: LogEventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&LogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_records_timestamp() {
        let mut log = EventLog::default();
        log.sim_time = 2.5;
        log.log(LogEventKind::Damage, "test".to_string());
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].timestamp, 2.5);
    }

    #[test]
    fn test_filter_by_kind() {
        let mut log = EventLog::default();
        log.log(LogEventKind::Damage, "a".to_string());
        log.log(LogEventKind::Death, "b".to_string());
        log.log(LogEventKind::Damage, "c".to_string());

        assert_eq!(log.filter_by_kind(LogEventKind::Damage).len(), 2);
        assert_eq!(log.count_of(LogEventKind::Death), 1);
    }

    #[test]
    fn test_recent_returns_last_entries_in_order() {
        let mut log = EventLog::default();
        for i in 0..5 {
            log.log(LogEventKind::SimEvent, format!("event {}", i));
        }

        let recent = log.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "event 3");
        assert_eq!(recent[1].message, "event 4");
    }

    #[test]
    fn test_clear_resets_time_and_entries() {
        let mut log = EventLog::default();
        log.sim_time = 10.0;
        log.log(LogEventKind::SimEvent, "x".to_string());
        log.clear();
        assert!(log.entries.is_empty());
        assert_eq!(log.sim_time, 0.0);
    }
}
