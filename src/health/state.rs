//! Process health state and transition records.
//!
//! # States
//! - Starting: optional warm-up marker, never produced by the rules
//! - Happy: nominal
//! - Warn: a soft limit was reached; escalation countdown is running
//! - Unhappy: terminal, the process should be replaced
//! - Custom: any other name assigned directly by the host
//!
//! # State Transitions
//! ```text
//! Happy → Warn:     soft limit reached
//! Happy → Unhappy:  hard limit reached, time limit reached
//! Warn  → Unhappy:  hard limit reached, escalation timeout
//! Unhappy → *:      never
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Health of the monitored process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum HealthState {
    Starting,
    Happy,
    Warn,
    Unhappy,
    Custom(String),
}

impl HealthState {
    pub fn as_str(&self) -> &str {
        match self {
            HealthState::Starting => "STARTING",
            HealthState::Happy => "HAPPY",
            HealthState::Warn => "WARN",
            HealthState::Unhappy => "UNHAPPY",
            HealthState::Custom(name) => name,
        }
    }

    /// Once entered, the state can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, HealthState::Unhappy)
    }

    pub fn is_happy(&self) -> bool {
        matches!(self, HealthState::Happy)
    }

    /// Numeric encoding used by the state gauge.
    pub(crate) fn gauge_value(&self) -> f64 {
        match self {
            HealthState::Happy => 0.0,
            HealthState::Warn => 1.0,
            HealthState::Unhappy => 2.0,
            HealthState::Starting | HealthState::Custom(_) => -1.0,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HealthState {
    fn from(name: &str) -> Self {
        match name {
            "STARTING" => HealthState::Starting,
            "HAPPY" => HealthState::Happy,
            "WARN" => HealthState::Warn,
            "UNHAPPY" => HealthState::Unhappy,
            other => HealthState::Custom(other.to_string()),
        }
    }
}

impl From<String> for HealthState {
    fn from(name: String) -> Self {
        match HealthState::from(name.as_str()) {
            HealthState::Custom(_) => HealthState::Custom(name),
            known => known,
        }
    }
}

impl From<HealthState> for String {
    fn from(state: HealthState) -> Self {
        match state {
            HealthState::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for HealthState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HealthState::from(s))
    }
}

/// Machine-readable tag naming the rule behind a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Code {
    UncaughtExceptions,
    UnhandledRejections,
    Memory,
    EventLoop,
    TimeLimit,
    Escalation,
    Manual,
    Other(String),
}

impl Code {
    pub fn as_str(&self) -> &str {
        match self {
            Code::UncaughtExceptions => "uncaughtExceptions",
            Code::UnhandledRejections => "unhandledRejections",
            Code::Memory => "memory",
            Code::EventLoop => "eventLoop",
            Code::TimeLimit => "timeLimit",
            Code::Escalation => "escalation",
            Code::Manual => "manual",
            Code::Other(code) => code,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Code {
    fn from(code: &str) -> Self {
        match code {
            "uncaughtExceptions" => Code::UncaughtExceptions,
            "unhandledRejections" => Code::UnhandledRejections,
            "memory" => Code::Memory,
            "eventLoop" => Code::EventLoop,
            "timeLimit" => Code::TimeLimit,
            "escalation" => Code::Escalation,
            "manual" => Code::Manual,
            other => Code::Other(other.to_string()),
        }
    }
}

impl From<String> for Code {
    fn from(code: String) -> Self {
        Code::from(code.as_str())
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.as_str().to_string()
    }
}

/// A committed state change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub state: HealthState,
    pub previous: HealthState,
    pub reason: String,
    pub code: Code,
}
