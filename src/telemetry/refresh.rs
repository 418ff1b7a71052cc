use std::fmt;

use jiff::Timestamp;
use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// What caused a refresh attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    Initialize,
    OnDemand,
    Scheduled,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Initialize => write!(f, "initialize"),
            RefreshTrigger::OnDemand => write!(f, "on_demand"),
            RefreshTrigger::Scheduled => write!(f, "scheduled"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    trigger: RefreshTrigger,
}

impl RefreshTelemetry {
    pub fn new(trigger: RefreshTrigger) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            trigger,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger
    }

    pub fn emit_start(&self, at: Timestamp) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            timestamp = %at,
            "refresh.start"
        );
    }

    /// A waiter found that another caller's refresh already settled the token.
    pub fn emit_joined(&self, succeeded: bool) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            succeeded,
            "refresh.joined"
        );
    }

    pub fn emit_success(&self, expires_at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            expires_at = %expires_at,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &Error, at: Timestamp) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            timestamp = %at,
            error = %error,
            "refresh.failure"
        );
    }
}
