//! FILENAME: core/engine/src/value_tree.rs
//! PURPOSE: The mutable form-value tree and dotted-path navigation.
//! CONTEXT: The hosting form owns this tree. The engine reads it through
//! `resolve` and only the host writes to it, through `set_leaf`, which
//! never restructures the tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WriteError;

/// A single node of the form: a leaf value or a group of named children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
    Group(FormValues),
}

impl FieldValue {
    pub fn is_group(&self) -> bool {
        matches!(self, FieldValue::Group(_))
    }

    pub fn as_group(&self) -> Option<&FormValues> {
        match self {
            FieldValue::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<FormValues> for FieldValue {
    fn from(group: FormValues) -> Self {
        FieldValue::Group(group)
    }
}

/// Identifier -> value mapping for one level of the form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues {
    entries: BTreeMap<String, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from the host's JSON form state.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Builder-style insert, used by hosts and tests to seed a tree.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a dotted path such as `"a.b.c"`, one segment per level.
    /// Returns None if any segment is missing or descends into a leaf.
    pub fn resolve(&self, path: &str) -> Option<&FieldValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;

        for segment in segments {
            current = current.as_group()?.entries.get(segment)?;
        }

        Some(current)
    }

    /// Writes a leaf at `path`. Every parent segment must already exist
    /// and be a group. An existing group is never replaced.
    pub fn set_leaf(&mut self, path: &str, value: FieldValue) -> Result<(), WriteError> {
        if path.is_empty() {
            return Err(WriteError::EmptyPath);
        }

        let (parent_path, key) = match path.rsplit_once('.') {
            Some((parent, key)) => (Some(parent), key),
            None => (None, path),
        };

        let parent = match parent_path {
            None => self,
            Some(parent_path) => self.group_mut(parent_path)?,
        };

        if matches!(parent.entries.get(key), Some(FieldValue::Group(_))) {
            return Err(WriteError::GroupTarget(path.to_string()));
        }

        parent.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn group_mut(&mut self, path: &str) -> Result<&mut FormValues, WriteError> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current.entries.get_mut(segment) {
                Some(FieldValue::Group(group)) => group,
                _ => return Err(WriteError::MissingPath(path.to_string())),
            };
        }
        Ok(current)
    }
}
