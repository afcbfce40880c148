use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::events::{EventBus, FleetEvent};
use crate::chain::TxHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: OffsetDateTime,
    pub message: String,
    pub severity: Severity,
    pub transaction_reference: Option<TxHandle>,
}

impl LogEntry {
    pub fn explorer_link(&self, explorer_base: &str) -> Option<String> {
        let base = explorer_base.trim().trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        self.transaction_reference
            .map(|hash| format!("{base}/tx/{hash}"))
    }
}

/// 只追加的操作日志；追加与事件发布在同一把锁内完成，日志顺序即事件顺序。
pub struct Journal {
    entries: Mutex<Vec<LogEntry>>,
    bus: Arc<EventBus>,
}

impl Journal {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            bus,
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(Severity::Info, message.into(), None);
    }

    pub fn success(&self, message: impl Into<String>, reference: Option<TxHandle>) {
        self.append(Severity::Success, message.into(), reference);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(Severity::Warning, message.into(), None);
    }

    pub fn error(&self, message: impl Into<String>, reference: Option<TxHandle>) {
        self.append(Severity::Error, message.into(), reference);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    fn append(&self, severity: Severity, message: String, reference: Option<TxHandle>) {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: OffsetDateTime::now_utc(),
            message,
            severity,
            transaction_reference: reference,
        };

        let tx_hash = entry.transaction_reference.map(|hash| hash.to_string());
        match severity {
            Severity::Info | Severity::Success => info!(
                target: "fleet::log",
                severity = %severity,
                tx_hash = tx_hash.as_deref().unwrap_or(""),
                "{}",
                entry.message
            ),
            Severity::Warning => warn!(
                target: "fleet::log",
                severity = %severity,
                "{}",
                entry.message
            ),
            Severity::Error => error!(
                target: "fleet::log",
                severity = %severity,
                tx_hash = tx_hash.as_deref().unwrap_or(""),
                "{}",
                entry.message
            ),
        }

        let mut entries = self.entries.lock();
        entries.push(entry.clone());
        self.bus.publish(FleetEvent::Log(entry));
    }
}
