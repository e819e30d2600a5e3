//! Policy evaluation engine with deny precedence
//!
//! Evaluates a request against every statement of every held policy:
//! - Explicit deny takes precedence over allow
//! - Anything not explicitly allowed is denied
//! - Statements are scanned in policy insertion order, then statement order
//!
//! The engine is immutable during evaluation, so a built engine can be
//! shared across threads behind an `Arc` and evaluated concurrently.
//! `add` takes `&mut self`; callers serialize mutation.

use super::{
    ConditionRegistry, Effect, OneOrMany, PatternCache, Policy, Request, StatementEvaluator,
};
use crate::core::config::{EngineConfig, EngineOptions};
use crate::core::error::Result;
use std::fmt;

/// Location of a statement within an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRef {
    /// Index of the policy, in insertion order
    pub policy: usize,
    /// Index of the statement within its policy
    pub statement: usize,
    pub sid: Option<String>,
}

impl fmt::Display for StatementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sid {
            Some(sid) => write!(f, "policy[{}].statement[{}] ({})", self.policy, self.statement, sid),
            None => write!(f, "policy[{}].statement[{}]", self.policy, self.statement),
        }
    }
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// An Allow statement matched and no Deny statement did
    Allow(StatementRef),
    /// A Deny statement matched
    ExplicitDeny(StatementRef),
    /// Nothing matched
    ImplicitDeny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// The statement that decided the outcome, if any
    pub fn statement(&self) -> Option<&StatementRef> {
        match self {
            Decision::Allow(r) | Decision::ExplicitDeny(r) => Some(r),
            Decision::ImplicitDeny => None,
        }
    }
}

/// Policy evaluation engine
pub struct PolicyEngine {
    policies: Vec<Policy>,
    registry: ConditionRegistry,
    patterns: PatternCache,
    config: EngineConfig,
}

impl PolicyEngine {
    /// Create an engine with the built-in condition operators
    pub fn new(policies: impl IntoIterator<Item = Policy>) -> Self {
        Self::with_options(policies, EngineOptions::default())
    }

    /// Create an engine with custom condition operators and configuration
    ///
    /// The condition registry is built here once and never changes.
    pub fn with_options(policies: impl IntoIterator<Item = Policy>, options: EngineOptions) -> Self {
        let EngineOptions { config, conditions } = options;
        let registry = ConditionRegistry::new(conditions, config.operator_precedence);

        let mut engine = PolicyEngine {
            policies: Vec::new(),
            registry,
            patterns: PatternCache::new(config.pattern_cache_capacity),
            config,
        };
        engine.add_all(policies);
        engine
    }

    /// Append a policy
    pub fn add(&mut self, policy: Policy) {
        tracing::debug!(
            "Adding policy #{} with {} statements",
            self.policies.len(),
            policy.statements().len()
        );
        self.policies.push(policy);
    }

    /// Append policies in order
    pub fn add_all(&mut self, policies: impl IntoIterator<Item = Policy>) {
        for policy in policies {
            self.add(policy);
        }
    }

    /// Parse and append a JSON policy document or array of documents
    ///
    /// Returns the number of policies added. Nothing is added on error.
    pub fn add_json(&mut self, json: &str) -> Result<usize> {
        let OneOrMany(policies) = serde_json::from_str::<OneOrMany<Policy>>(json)?;
        let count = policies.len();
        self.add_all(policies);
        Ok(count)
    }

    /// Is the request allowed?
    ///
    /// # Examples
    ///
    /// ```
    /// use pbac::{Policy, PolicyEngine, Request, Statement};
    ///
    /// let policy = Policy::new().with_statement(
    ///     Statement::allow()
    ///         .with_actions(["s3:GetObject"])
    ///         .with_resources(["arn:aws:s3:::public/*"]),
    /// );
    /// let engine = PolicyEngine::new([policy]);
    ///
    /// assert!(engine.evaluate(&Request::new("s3:GetObject", "arn:aws:s3:::public/a.txt")));
    /// assert!(!engine.evaluate(&Request::new("s3:PutObject", "arn:aws:s3:::public/a.txt")));
    /// ```
    pub fn evaluate(&self, request: &Request) -> bool {
        self.decide(request).is_allowed()
    }

    /// Evaluate and report which statement decided the outcome
    pub fn decide(&self, request: &Request) -> Decision {
        // Allow statements are never inspected once a Deny matches
        let decision = if let Some(found) = self.find_match(&Effect::Deny, request) {
            Decision::ExplicitDeny(found)
        } else if let Some(found) = self.find_match(&Effect::Allow, request) {
            Decision::Allow(found)
        } else {
            Decision::ImplicitDeny
        };

        tracing::debug!(
            action = %request.action,
            resource = %request.resource,
            "Decision: {:?}",
            decision
        );
        decision
    }

    /// First statement in flattening order matching `effect`
    fn find_match(&self, effect: &Effect, request: &Request) -> Option<StatementRef> {
        let evaluator = StatementEvaluator::new(&self.registry, &self.patterns);

        self.policies
            .iter()
            .enumerate()
            .flat_map(|(p, policy)| {
                policy
                    .statements()
                    .iter()
                    .enumerate()
                    .map(move |(s, statement)| (p, s, statement))
            })
            .find(|(_, _, statement)| evaluator.matches(statement, effect, request))
            .map(|(policy, statement, found)| StatementRef {
                policy,
                statement,
                sid: found.sid.clone(),
            })
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop all compiled patterns
    pub fn clear_pattern_cache(&self) {
        self.patterns.clear();
    }

    /// Number of compiled patterns currently cached
    pub fn pattern_cache_len(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("policies", &self.policies.len())
            .field("operators", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::Statement;

    #[test]
    fn test_simple_allow() {
        let policy = Policy::new().with_statement(
            Statement::allow()
                .with_actions(["s3:GetObject"])
                .with_resources(["arn:aws:s3:::public/*"]),
        );
        let engine = PolicyEngine::new([policy]);

        assert!(engine.evaluate(&Request::new("s3:GetObject", "arn:aws:s3:::public/file.txt")));
        assert!(!engine.evaluate(&Request::new("s3:PutObject", "arn:aws:s3:::public/file.txt")));
        assert!(!engine.evaluate(&Request::new("s3:GetObject", "arn:aws:s3:::private/file.txt")));
    }

    #[test]
    fn test_deny_precedence() {
        let policy = Policy::new()
            .with_statement(Statement::allow().with_actions(["*"]).with_resources(["*"]))
            .with_statement(
                Statement::deny()
                    .with_sid("NoSecrets")
                    .with_actions(["*"])
                    .with_resources(["arn:aws:s3:::secret/*"]),
            );
        let engine = PolicyEngine::new([policy]);

        assert!(engine.evaluate(&Request::new("s3:GetObject", "arn:aws:s3:::public/file.txt")));

        let decision = engine.decide(&Request::new("s3:GetObject", "arn:aws:s3:::secret/key"));
        assert_eq!(
            decision,
            Decision::ExplicitDeny(StatementRef {
                policy: 0,
                statement: 1,
                sid: Some("NoSecrets".to_string()),
            })
        );
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_deny_in_later_policy_overrides() {
        let allow = Policy::new().with_statement(Statement::allow().with_actions(["*"]));
        let deny = Policy::new().with_statement(Statement::deny().with_actions(["iam:*"]));

        let mut engine = PolicyEngine::new([allow]);
        assert!(engine.evaluate(&Request::new("iam:CreateUser", "r")));

        engine.add(deny);
        assert!(!engine.evaluate(&Request::new("iam:CreateUser", "r")));
        assert!(engine.evaluate(&Request::new("s3:GetObject", "r")));
    }

    #[test]
    fn test_default_deny() {
        let engine = PolicyEngine::default();
        let decision = engine.decide(&Request::new("s3:GetObject", "r"));
        assert_eq!(decision, Decision::ImplicitDeny);
        assert!(decision.statement().is_none());
    }

    #[test]
    fn test_first_match_reported() {
        let policy = Policy::new()
            .with_statement(Statement::allow().with_sid("First").with_actions(["s3:*"]))
            .with_statement(Statement::allow().with_sid("Second").with_actions(["s3:Get*"]));
        let engine = PolicyEngine::new([policy]);

        let decision = engine.decide(&Request::new("s3:GetObject", "r"));
        assert_eq!(decision.statement().and_then(|r| r.sid.as_deref()), Some("First"));
        assert_eq!(decision.statement().unwrap().to_string(), "policy[0].statement[0] (First)");
    }

    #[test]
    fn test_add_json_single_and_many() {
        let mut engine = PolicyEngine::default();

        let added = engine
            .add_json(r#"{"Version":"2012-10-17","Statement":{"Effect":"Allow","Action":"s3:*"}}"#)
            .unwrap();
        assert_eq!(added, 1);

        let added = engine
            .add_json(
                r#"[
                    {"Version":"2012-10-17","Statement":[{"Effect":"Deny","Action":"s3:Delete*"}]},
                    {"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"iam:Get*"}]}
                ]"#,
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(engine.policies().len(), 3);

        assert!(engine.evaluate(&Request::new("s3:GetObject", "r")));
        assert!(!engine.evaluate(&Request::new("s3:DeleteObject", "r")));
        assert!(engine.evaluate(&Request::new("iam:GetUser", "r")));
    }

    #[test]
    fn test_add_json_invalid_adds_nothing() {
        let mut engine = PolicyEngine::default();
        assert!(engine.add_json("{not json").is_err());
        assert!(engine.add_json(r#"[{"Statement":[{"Effect":"Allow"}]}, 42]"#).is_err());
        assert!(engine.policies().is_empty());
    }

    #[test]
    fn test_pattern_cache_reused() {
        let policy = Policy::new().with_statement(Statement::allow().with_actions(["s3:Get*"]));
        let engine = PolicyEngine::new([policy]);

        for _ in 0..10 {
            assert!(engine.evaluate(&Request::new("s3:GetObject", "r")));
        }
        assert_eq!(engine.pattern_cache_len(), 1);

        engine.clear_pattern_cache();
        assert_eq!(engine.pattern_cache_len(), 0);
        assert!(engine.evaluate(&Request::new("s3:GetObject", "r")));
    }

    #[test]
    fn test_idempotent() {
        let policy = Policy::new().with_statement(
            Statement::allow()
                .with_actions(["iam:*"])
                .with_condition("StringLike", "aws:username", "a*"),
        );
        let engine = PolicyEngine::new([policy]);
        let request = Request::new("iam:GetUser", "r").with_variable("aws", "username", "alice");

        let first = engine.decide(&request);
        assert_eq!(engine.decide(&request), first);
        assert!(first.is_allowed());
    }
}
