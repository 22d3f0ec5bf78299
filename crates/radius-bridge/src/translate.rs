//! Response translator
//!
//! Turns a [`BackendResult`] into the attributes FreeRADIUS puts in its
//! reply. Translation is a pure function of the result and the mapping, so
//! the same result always yields the same attributes in the same order.

use crate::client::{BackendResult, Outcome};
use crate::policy::{group_matches, holds_group};
use radius_proto::{AttributePair, AttributeType, TUNNEL_MEDIUM_IEEE_802, TUNNEL_TYPE_VLAN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered reply attributes
pub type ReplyAttributes = Vec<AttributePair>;

/// One attribute emitted for a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTemplate {
    pub attribute: String,
    pub value: String,
}

/// Assign a VLAN to members of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanGroup {
    pub group: String,
    pub vlan: u16,
}

/// How groups become reply attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMapping {
    /// Attribute carrying the group name for groups without an explicit
    /// entry (default: "Filter-Id", null disables)
    #[serde(default = "default_group_attribute")]
    pub group_attribute: Option<String>,

    /// Explicit attributes per group name
    #[serde(default)]
    pub group_attributes: BTreeMap<String, Vec<AttributeTemplate>>,

    /// VLAN for accepted users not covered by `vlan_groups`
    #[serde(default)]
    pub default_vlan: Option<u16>,

    /// Checked in order, first held group wins
    #[serde(default)]
    pub vlan_groups: Vec<VlanGroup>,
}

fn default_group_attribute() -> Option<String> {
    Some(AttributeType::FilterId.name().to_string())
}

impl Default for ReplyMapping {
    fn default() -> Self {
        ReplyMapping {
            group_attribute: default_group_attribute(),
            group_attributes: BTreeMap::new(),
            default_vlan: None,
            vlan_groups: vec![],
        }
    }
}

fn valid_vlan(vlan: u16) -> bool {
    (1..=4094).contains(&vlan)
}

impl ReplyMapping {
    pub fn validate(&self) -> Result<(), String> {
        if self
            .group_attribute
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err("reply.group_attribute cannot be empty".to_string());
        }

        for (group, templates) in &self.group_attributes {
            if templates.iter().any(|t| t.attribute.trim().is_empty()) {
                return Err(format!("reply.group_attributes[{}] has an empty attribute name", group));
            }
        }

        if let Some(vlan) = self.default_vlan {
            if !valid_vlan(vlan) {
                return Err(format!("reply.default_vlan {} out of range 1-4094", vlan));
            }
        }

        for entry in &self.vlan_groups {
            if !valid_vlan(entry.vlan) {
                return Err(format!(
                    "reply.vlan_groups[{}] VLAN {} out of range 1-4094",
                    entry.group, entry.vlan
                ));
            }
        }

        Ok(())
    }

    fn templates_for(&self, held: &str) -> Option<&[AttributeTemplate]> {
        self.group_attributes
            .get(held)
            .or_else(|| {
                self.group_attributes
                    .iter()
                    .find(|(wanted, _)| group_matches(held, wanted))
                    .map(|(_, templates)| templates)
            })
            .map(Vec::as_slice)
    }
}

/// Decision plus the attributes that go with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub accept: bool,
    pub attributes: ReplyAttributes,
}

impl Reply {
    pub fn reject() -> Self {
        Reply {
            accept: false,
            attributes: vec![],
        }
    }
}

/// Translate a backend result into a reply
pub fn translate(result: &BackendResult, mapping: &ReplyMapping) -> Reply {
    match result.outcome {
        Outcome::Accept => Reply {
            accept: true,
            attributes: accept_attributes(result, mapping),
        },
        Outcome::Reject | Outcome::Error => Reply::reject(),
    }
}

fn accept_attributes(result: &BackendResult, mapping: &ReplyMapping) -> ReplyAttributes {
    let mut attributes = ReplyAttributes::new();

    for group in &result.groups {
        match mapping.templates_for(group) {
            Some(templates) => attributes.extend(
                templates
                    .iter()
                    .map(|t| AttributePair::new(t.attribute.clone(), t.value.clone())),
            ),
            None => {
                if let Some(ref name) = mapping.group_attribute {
                    attributes.push(AttributePair::new(name.clone(), group.clone()));
                }
            }
        }
    }

    let vlan = mapping
        .vlan_groups
        .iter()
        .find(|entry| holds_group(&result.groups, &entry.group))
        .map(|entry| entry.vlan)
        .or(mapping.default_vlan);

    if let Some(vlan) = vlan {
        attributes.push(AttributePair::typed(AttributeType::TunnelType, TUNNEL_TYPE_VLAN));
        attributes.push(AttributePair::typed(
            AttributeType::TunnelMediumType,
            TUNNEL_MEDIUM_IEEE_802,
        ));
        attributes.push(AttributePair::typed(
            AttributeType::TunnelPrivateGroupId,
            vlan.to_string(),
        ));
    }

    attributes
}
