use std::collections::HashSet;

use crate::models::ConfirmationStatus;

/// Upper-cased, trimmed (course, turn, campus) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExclusionKey {
    course: String,
    turn: String,
    campus: String,
}

pub fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

impl ExclusionKey {
    pub fn new(course: &str, turn: &str, campus: &str) -> Self {
        Self {
            course: normalize(course),
            turn: normalize(turn),
            campus: normalize(campus),
        }
    }
}

/// Classes flagged administratively as not confirmed.
#[derive(Debug, Clone, Default)]
pub struct ExclusionIndex {
    keys: HashSet<ExclusionKey>,
}

impl ExclusionIndex {
    pub fn new<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = ExclusionKey>,
    {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_unconfirmed(&self, course: &str, turn: &str, campus: &str) -> bool {
        self.keys.contains(&ExclusionKey::new(course, turn, campus))
    }

    /// Membership alone decides the verdict; enrollment counts never do.
    pub fn resolve(&self, course: &str, turn: &str, campus: &str) -> ConfirmationStatus {
        if self.is_unconfirmed(course, turn, campus) {
            ConfirmationStatus::Unconfirmed
        } else {
            ConfirmationStatus::Confirmed
        }
    }
}
