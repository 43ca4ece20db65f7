//! Per-cycle record of who is expected to answer and who already did.

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};

/// Expected responders are fixed when the cycle opens (membership order, no
/// duplicates). Received responders are kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCollectionState {
    pub expected_responder_ids: Vec<String>,
    pub received_responder_ids: Vec<String>,
}

impl ResponseCollectionState {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut expected: Vec<String> = Vec::new();
        for member in members {
            let member = member.into();
            if !expected.contains(&member) {
                expected.push(member);
            }
        }
        Self {
            expected_responder_ids: expected,
            received_responder_ids: Vec::new(),
        }
    }
}

/// Read/record view over a `ResponseCollectionState`. Holds no state of its own.
pub struct ResponseCollector<'a> {
    state: &'a mut ResponseCollectionState,
}

impl<'a> ResponseCollector<'a> {
    pub fn new(state: &'a mut ResponseCollectionState) -> Self {
        Self { state }
    }

    /// Record a response. Fails without touching state if the responder already responded.
    pub fn record_response(&mut self, responder_id: &str) -> Result<(), DomainError> {
        if self.has_responded(responder_id) {
            return Err(DomainError::DuplicateSubmission(responder_id.to_string()));
        }
        self.state
            .received_responder_ids
            .push(responder_id.to_string());
        Ok(())
    }

    pub fn has_responded(&self, responder_id: &str) -> bool {
        has_responded(self.state, responder_id)
    }

    pub fn completion_ratio(&self) -> f64 {
        completion_ratio(self.state)
    }

    pub fn outstanding_responders(&self) -> Vec<String> {
        outstanding_responders(self.state)
    }

    pub fn is_complete(&self) -> bool {
        is_complete(self.state)
    }
}

impl ResponseCollectionState {
    pub fn has_responded(&self, responder_id: &str) -> bool {
        has_responded(self, responder_id)
    }

    /// Share of expected responders that responded. Late joiners do not count, so the
    /// ratio never exceeds 1.0. With nobody expected the cycle counts as complete.
    pub fn completion_ratio(&self) -> f64 {
        completion_ratio(self)
    }

    /// Expected responders without a response, in membership order.
    pub fn outstanding_responders(&self) -> Vec<String> {
        outstanding_responders(self)
    }

    pub fn is_complete(&self) -> bool {
        is_complete(self)
    }

    pub fn expected_count(&self) -> usize {
        self.expected_responder_ids.len()
    }

    pub fn received_count(&self) -> usize {
        self.received_responder_ids.len()
    }
}

fn has_responded(state: &ResponseCollectionState, responder_id: &str) -> bool {
    state
        .received_responder_ids
        .iter()
        .any(|id| id == responder_id)
}

fn completion_ratio(state: &ResponseCollectionState) -> f64 {
    let expected = state.expected_responder_ids.len();
    if expected == 0 {
        return 1.0;
    }
    let answered = state
        .expected_responder_ids
        .iter()
        .filter(|id| has_responded(state, id))
        .count();
    answered as f64 / expected as f64
}

fn outstanding_responders(state: &ResponseCollectionState) -> Vec<String> {
    state
        .expected_responder_ids
        .iter()
        .filter(|id| !has_responded(state, id))
        .cloned()
        .collect()
}

fn is_complete(state: &ResponseCollectionState) -> bool {
    state
        .expected_responder_ids
        .iter()
        .all(|id| has_responded(state, id))
}
