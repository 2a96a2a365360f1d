//! Known-probe registry
//!
//! The probe info service answers with a JSON object keyed by
//! kind-prefixed identifiers (`scalar/...`, `histogram/...`). Only the keys
//! matter here.

use super::ProbeName;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeSet;

/// Raw registry keys as returned by the probe info service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeRegistry {
    keys: BTreeSet<String>,
}

impl ProbeRegistry {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the service payload.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            Error::MalformedRegistry(format!("registry is not valid JSON: {e}"))
        })?;
        match value {
            Value::Object(map) => Ok(Self {
                keys: map.into_iter().map(|(key, _)| key).collect(),
            }),
            _ => Err(Error::MalformedRegistry(
                "expected a JSON object keyed by probe identifier".to_string(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Normalized names of every probe of one kind (`"scalar/"`, `"histogram/"`).
    pub fn probe_names(&self, kind_prefix: &str) -> BTreeSet<ProbeName> {
        self.keys
            .iter()
            .filter_map(|key| ProbeName::from_registry_key(key, kind_prefix))
            .collect()
    }
}
