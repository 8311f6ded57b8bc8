//! Scenarios: canned request-to-response rules
//!
//! A scenario pins the full response for every request matching its
//! `"METHOD /path"` key. Matching scenarios win over section handling
//! unconditionally; the mock pipeline is never consulted.

use crate::pattern::PathPattern;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One canned response rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Primary key; minted by the registry when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// `"METHOD /path"`; the path part may contain `*` / `**`
    pub request_path: String,
    /// Response status code
    pub status_code: u16,
    /// Response content type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Optional Location header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Additional response headers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Response body
    #[serde(default)]
    pub data: String,
}

/// A scenario compiled for matching, with its creation sequence for
/// tie-breaking
#[derive(Debug)]
struct CompiledScenario {
    scenario: Scenario,
    method: String,
    pattern: PathPattern,
    seq: u64,
}

impl CompiledScenario {
    fn compile(scenario: Scenario, seq: u64) -> Result<Self> {
        let (method, path) = scenario
            .request_path
            .split_once(' ')
            .ok_or_else(|| {
                Error::invalid_request(format!(
                    "request path '{}' must be 'METHOD /path'",
                    scenario.request_path
                ))
            })?;
        if method.is_empty() || !path.starts_with('/') {
            return Err(Error::invalid_request(format!(
                "request path '{}' must be 'METHOD /path'",
                scenario.request_path
            )));
        }
        // Scenario paths always compare case-sensitively.
        let pattern = PathPattern::compile(path, true)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        let method = method.to_string();
        Ok(Self {
            scenario,
            method,
            pattern,
            seq,
        })
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    scenarios: HashMap<String, CompiledScenario>,
    next_seq: u64,
}

/// UUID-keyed scenario registry behind its own read-write lock
#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    inner: RwLock<RegistryInner>,
}

impl ScenarioRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scenario, minting a uuid when none is supplied. An existing
    /// scenario with the same uuid is replaced. Returns the stored scenario
    /// with its uuid filled in.
    pub async fn insert(&self, mut scenario: Scenario) -> Result<Scenario> {
        let uuid = match scenario.uuid.clone() {
            Some(uuid) if !uuid.is_empty() => uuid,
            _ => Uuid::new_v4().to_string(),
        };
        scenario.uuid = Some(uuid.clone());

        let mut inner = self.inner.write().await;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let compiled = CompiledScenario::compile(scenario.clone(), seq)?;
        debug!(uuid = %uuid, request_path = %scenario.request_path, "scenario installed");
        inner.scenarios.insert(uuid, compiled);
        Ok(scenario)
    }

    /// Replace the scenario stored under `uuid`. The path uuid is
    /// authoritative; any differing uuid in the payload is overwritten.
    /// Fails with not-found when no scenario has that uuid.
    pub async fn replace(&self, uuid: &str, mut scenario: Scenario) -> Result<Scenario> {
        scenario.uuid = Some(uuid.to_string());
        let mut inner = self.inner.write().await;
        let seq = match inner.scenarios.get(uuid) {
            Some(existing) => existing.seq,
            None => return Err(Error::not_found(format!("scenario {uuid}"))),
        };
        let compiled = CompiledScenario::compile(scenario.clone(), seq)?;
        inner.scenarios.insert(uuid.to_string(), compiled);
        Ok(scenario)
    }

    /// Fetch one scenario by uuid.
    pub async fn get(&self, uuid: &str) -> Option<Scenario> {
        let inner = self.inner.read().await;
        inner.scenarios.get(uuid).map(|c| c.scenario.clone())
    }

    /// All scenarios in creation order.
    pub async fn list(&self) -> Vec<Scenario> {
        let inner = self.inner.read().await;
        let mut compiled: Vec<&CompiledScenario> = inner.scenarios.values().collect();
        compiled.sort_by_key(|c| c.seq);
        compiled.iter().map(|c| c.scenario.clone()).collect()
    }

    /// Remove a scenario. Returns whether one existed.
    pub async fn remove(&self, uuid: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.scenarios.remove(uuid).is_some()
    }

    /// Number of installed scenarios.
    pub async fn len(&self) -> usize {
        self.inner.read().await.scenarios.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Find the scenario matching `(method, path)`. The most specific
    /// pattern wins; among equally specific patterns the one created first
    /// wins. Method comparison is case-sensitive.
    pub async fn match_request(&self, method: &str, path: &str) -> Option<Scenario> {
        let inner = self.inner.read().await;
        inner
            .scenarios
            .values()
            .filter(|c| c.method == method && c.pattern.matches(path))
            .max_by_key(|c| (c.pattern.specificity(), std::cmp::Reverse(c.seq)))
            .map(|c| c.scenario.clone())
    }
}
