//! Release cycle state machine of one group.
//!
//! CLOSED -> OPEN -> (COLLECTED) -> CLOSED. Transition methods check everything
//! before mutating, so a failed call leaves the cycle exactly as it was.

use crate::domain::{DomainError, ResponseCollectionState, ResponseCollector};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default minimum number of days between two newsletters.
pub const DEFAULT_MIN_INTERVAL_DAYS: u32 = 30;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleState {
    Closed,
    Open,
    /// Every expected responder answered. Still a collection window.
    Collected,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleState::Closed => "CLOSED",
            CycleState::Open => "OPEN",
            CycleState::Collected => "COLLECTED",
        })
    }
}

impl CycleState {
    /// Submissions are taken in OPEN and COLLECTED.
    pub fn accepts_responses(self) -> bool {
        matches!(self, CycleState::Open | CycleState::Collected)
    }
}

/// Minimum-interval rule between releases, evaluated at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseGate {
    pub next_release_at: Option<DateTime<Utc>>,
    /// Whole days left, rounded up. 0 once a release is allowed.
    pub days_left: i64,
    pub can_release: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseCycle {
    pub group_id: String,
    /// Incremented every time questions are released; keys responses and newsletters.
    pub cycle_number: u32,
    pub state: CycleState,
    /// Set only by a successful newsletter generation.
    pub last_release_at: Option<DateTime<Utc>>,
    pub min_interval_days: u32,
    pub collection: ResponseCollectionState,
}

impl ReleaseCycle {
    pub fn new(group_id: impl Into<String>, min_interval_days: u32) -> Self {
        Self {
            group_id: group_id.into(),
            cycle_number: 0,
            state: CycleState::Closed,
            last_release_at: None,
            min_interval_days,
            collection: ResponseCollectionState::default(),
        }
    }

    /// Derived from the state, so it can never disagree with it.
    pub fn accepting_responses(&self) -> bool {
        self.state.accepts_responses()
    }

    pub fn release_gate(&self, now: DateTime<Utc>) -> ReleaseGate {
        let Some(last) = self.last_release_at else {
            return ReleaseGate {
                next_release_at: None,
                days_left: 0,
                can_release: true,
            };
        };
        let next = last + Duration::days(i64::from(self.min_interval_days));
        let remaining = (next - now).num_seconds();
        let days_left = if remaining <= 0 {
            0
        } else {
            (remaining + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
        };
        ReleaseGate {
            next_release_at: Some(next),
            days_left,
            can_release: now >= next,
        }
    }

    /// CLOSED -> OPEN. Starts a fresh collection with `members` as the expected responders.
    pub fn open<I, S>(&mut self, members: I) -> Result<(), DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.state != CycleState::Closed {
            return Err(DomainError::AlreadyOpen);
        }
        self.collection = ResponseCollectionState::new(members);
        self.cycle_number += 1;
        self.state = CycleState::Open;
        Ok(())
    }

    /// Check that `responder_id` may submit right now.
    pub fn ensure_accepting(&self, responder_id: &str) -> Result<(), DomainError> {
        if !self.accepting_responses() {
            return Err(DomainError::AlreadyClosed);
        }
        if self.collection.has_responded(responder_id) {
            return Err(DomainError::DuplicateSubmission(responder_id.to_string()));
        }
        Ok(())
    }

    /// Record one submission. OPEN -> COLLECTED once every expected responder answered.
    pub fn accept(&mut self, responder_id: &str) -> Result<CycleState, DomainError> {
        self.ensure_accepting(responder_id)?;
        let mut collector = ResponseCollector::new(&mut self.collection);
        collector.record_response(responder_id)?;
        if self.state == CycleState::Open && collector.is_complete() {
            self.state = CycleState::Collected;
        }
        Ok(self.state)
    }

    /// Check that a newsletter may be generated at `now`.
    pub fn ensure_can_release(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.accepting_responses() {
            return Err(DomainError::AlreadyClosed);
        }
        let gate = self.release_gate(now);
        match gate.next_release_at {
            Some(next_release_at) if !gate.can_release => Err(DomainError::TooSoon {
                days_left: gate.days_left,
                next_release_at,
            }),
            _ => Ok(()),
        }
    }

    /// OPEN/COLLECTED -> CLOSED after a successful compile. Stops accepting and
    /// stamps the release time in the same step.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_can_release(now)?;
        self.state = CycleState::Closed;
        self.last_release_at = Some(now);
        Ok(())
    }
}
