//! Group-based access policy applied after the backend accepts

use crate::client::{BackendResult, Outcome};
use std::collections::BTreeSet;

pub const MISSING_REQUIRED_GROUP: &str = "missing required group";

/// Does a group held by the user match a configured group name?
///
/// Names compare case-insensitively. A held SPN such as
/// `admins@idm.example.com` also matches its local part `admins`.
pub fn group_matches(held: &str, wanted: &str) -> bool {
    if held.eq_ignore_ascii_case(wanted) {
        return true;
    }
    match held.split_once('@') {
        Some((local, _)) => local.eq_ignore_ascii_case(wanted),
        None => false,
    }
}

pub fn holds_group(groups: &BTreeSet<String>, wanted: &str) -> bool {
    groups.iter().any(|held| group_matches(held, wanted))
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    required_groups: Vec<String>,
}

impl AccessPolicy {
    pub fn new(required_groups: Vec<String>) -> Self {
        AccessPolicy { required_groups }
    }

    /// True when the groups satisfy the policy; an empty policy admits all
    pub fn permits(&self, groups: &BTreeSet<String>) -> bool {
        self.required_groups.is_empty()
            || self.required_groups.iter().any(|wanted| holds_group(groups, wanted))
    }

    /// Downgrade an accept that fails the policy to a reject
    pub fn apply(&self, result: BackendResult) -> BackendResult {
        match result.outcome {
            Outcome::Accept if !self.permits(&result.groups) => {
                BackendResult::reject(Some(MISSING_REQUIRED_GROUP.to_string()))
            }
            _ => result,
        }
    }
}
