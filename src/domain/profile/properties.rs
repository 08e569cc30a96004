//! Property model and joining rules
//!
//! A program's effective property set is the union of its component PRF and
//! the implementation-specific PRF, with properties classified by kind and
//! mode. The classification decides how each property reaches the child:
//! command-line construct properties and writable exec properties become
//! launch arguments, remaining construct properties are passed to
//! `initializeProperties`, and writable configure properties to `configure`.

use serde::{Deserialize, Serialize};

/// How a property participates in the child lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Factory,
    Exec,
    Construct,
    Configure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyMode {
    ReadOnly,
    #[default]
    ReadWrite,
    WriteOnly,
}

/// A resolved id/value pair as delivered to a child
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    /// None models a nil value; nil-valued properties are never delivered
    pub value: Option<String>,
}

impl PropertyValue {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
        }
    }

    pub fn nil(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: None,
        }
    }
}

/// A property definition from a PRF document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub name: String,
    pub kind: PropertyKind,
    #[serde(default)]
    pub mode: PropertyMode,
    /// Construct properties marked command-line become launch arguments
    #[serde(default)]
    pub command_line: bool,
    #[serde(default)]
    pub value: Option<String>,
}

impl Property {
    pub fn is_read_only(&self) -> bool {
        self.mode == PropertyMode::ReadOnly
    }
}

/// The joined property set of one program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySet {
    properties: Vec<Property>,
}

impl PropertySet {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Union with another set; entries from `other` replace same-id entries
    pub fn join(&mut self, other: &PropertySet) {
        for prop in &other.properties {
            match self.properties.iter_mut().find(|p| p.id == prop.id) {
                Some(existing) => *existing = prop.clone(),
                None => self.properties.push(prop.clone()),
            }
        }
    }

    /// Apply an instantiation override; unknown ids are ignored
    pub fn override_value(&mut self, value: &PropertyValue) {
        if let Some(prop) = self.properties.iter_mut().find(|p| p.id == value.id) {
            prop.value = value.value.clone();
        }
    }

    /// Construct properties delivered to `initializeProperties`
    /// (non-nil, not command-line)
    pub fn non_nil_construct(&self) -> Vec<PropertyValue> {
        self.properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Construct && !p.command_line)
            .filter_map(|p| {
                p.value
                    .as_ref()
                    .map(|v| PropertyValue::new(p.id.as_str(), v.as_str()))
            })
            .collect()
    }

    /// Configure properties delivered to `configure`
    /// (non-nil, writable)
    pub fn non_nil_configure(&self) -> Vec<PropertyValue> {
        self.properties
            .iter()
            .filter(|p| p.kind == PropertyKind::Configure && !p.is_read_only())
            .filter_map(|p| {
                p.value
                    .as_ref()
                    .map(|v| PropertyValue::new(p.id.as_str(), v.as_str()))
            })
            .collect()
    }

    /// Launch arguments: writable exec properties plus command-line construct
    /// properties, in definition order
    pub fn exec_parameters(&self) -> Vec<(String, String)> {
        self.properties
            .iter()
            .filter(|p| match p.kind {
                PropertyKind::Exec => !p.is_read_only(),
                PropertyKind::Construct => p.command_line,
                _ => false,
            })
            .filter_map(|p| p.value.as_ref().map(|v| (p.id.clone(), v.clone())))
            .collect()
    }
}
