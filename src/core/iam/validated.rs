//! Policy engine that validates documents before accepting them

use super::{Decision, OneOrMany, Policy, PolicyEngine, PolicySchema, Request};
use crate::core::config::EngineOptions;
use crate::core::error::Result;
use serde::Deserialize;

/// Wraps a [`PolicyEngine`], validating every document against a
/// [`PolicySchema`] built from the engine's registered operator names
///
/// Unknown condition operators are rejected here at `add` time.
///
/// # Examples
///
/// ```
/// use pbac::{EngineOptions, Request, ValidatedPolicyEngine};
/// use serde_json::json;
///
/// let options = EngineOptions::new().with_condition("EqualsFoo", |actual, expected| {
///     expected.as_bool() == Some(true) && actual.and_then(|a| a.as_str()) == Some("foo")
/// });
/// let mut engine = ValidatedPolicyEngine::with_options(options);
///
/// engine
///     .add(&json!({
///         "Version": "2012-10-17",
///         "Statement": [{
///             "Effect": "Allow",
///             "Action": "iam:DeactivateMFADevice",
///             "Condition": {"EqualsFoo": {"aws:username": true}}
///         }]
///     }))
///     .unwrap();
///
/// assert!(engine
///     .add(&json!({"Version": "2012-10-17", "Statement": {"Effect": "Permit"}}))
///     .is_err());
///
/// let request = Request::new("iam:DeactivateMFADevice", "")
///     .with_variable("aws", "username", "foo");
/// assert!(engine.evaluate(&request));
/// ```
#[derive(Debug)]
pub struct ValidatedPolicyEngine {
    engine: PolicyEngine,
    schema: PolicySchema,
}

impl ValidatedPolicyEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let engine = PolicyEngine::with_options(Vec::new(), options);
        let schema = PolicySchema::new(engine.registry().names());
        ValidatedPolicyEngine { engine, schema }
    }

    /// Build an engine from initial documents
    ///
    /// Fails without constructing anything if any document is invalid.
    pub fn with_policies<'a>(
        documents: impl IntoIterator<Item = &'a serde_json::Value>,
        options: EngineOptions,
    ) -> Result<Self> {
        let mut engine = Self::with_options(options);
        engine.add_all(documents)?;
        Ok(engine)
    }

    /// Validate and add a policy document
    pub fn add(&mut self, document: &serde_json::Value) -> Result<()> {
        self.schema.validate(document)?;
        let policy = parse(document)?;
        self.engine.add(policy);
        Ok(())
    }

    /// Validate every document, then add them all
    ///
    /// Nothing is added if any document is invalid.
    pub fn add_all<'a>(
        &mut self,
        documents: impl IntoIterator<Item = &'a serde_json::Value>,
    ) -> Result<usize> {
        let documents: Vec<&serde_json::Value> = documents.into_iter().collect();
        self.schema.validate_all(documents.iter().copied())?;

        let policies = documents
            .into_iter()
            .map(parse)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let count = policies.len();
        self.engine.add_all(policies);
        Ok(count)
    }

    /// Validate and add a JSON document or array of documents
    pub fn add_json(&mut self, json: &str) -> Result<usize> {
        let OneOrMany(documents) = serde_json::from_str::<OneOrMany<serde_json::Value>>(json)?;
        self.add_all(&documents)
    }

    /// Validate and add an already-built policy
    pub fn add_policy(&mut self, policy: Policy) -> Result<()> {
        let document = serde_json::to_value(&policy)?;
        self.schema.validate(&document)?;
        self.engine.add(policy);
        Ok(())
    }

    pub fn evaluate(&self, request: &Request) -> bool {
        self.engine.evaluate(request)
    }

    pub fn decide(&self, request: &Request) -> Decision {
        self.engine.decide(request)
    }

    /// The wrapped engine
    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn schema(&self) -> &PolicySchema {
        &self.schema
    }
}

impl Default for ValidatedPolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(document: &serde_json::Value) -> serde_json::Result<Policy> {
    Policy::deserialize(document)
}
