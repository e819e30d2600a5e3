//! # pbac - Policy-Based Access Control
//!
//! `pbac` decides whether a request is permitted by a set of policy documents
//! written in the AWS IAM policy language.
//!
//! - **Deny overrides allow**: any matching Deny statement wins; anything not
//!   explicitly allowed is denied
//! - **Wildcards** (`*`, `?`) in actions and resources
//! - **Variables**: `${aws:username}` in resources is interpolated per request
//! - **Conditions**: String, Numeric, Date, Bool, Binary, IpAddress and Null
//!   operators, each with `IfExists`, `ForAllValues:` and `ForAnyValue:` forms
//! - **Custom operators** scoped to one engine instance
//! - **Validation**: [`ValidatedPolicyEngine`] checks documents before accepting them
//!
//! ## Quick Start
//!
//! ```rust
//! use pbac::{EngineOptions, PolicyEngine, Request, Result};
//!
//! # fn main() -> Result<()> {
//! let options = EngineOptions::new().with_condition("EqualsFoo", |actual, expected| {
//!     expected.as_bool() == Some(true) && actual.and_then(|a| a.as_str()) == Some("foo")
//! });
//! let mut engine = PolicyEngine::with_options(Vec::new(), options);
//!
//! engine.add_json(
//!     r#"{
//!         "Version": "2012-10-17",
//!         "Statement": [{
//!             "Effect": "Allow",
//!             "Action": ["iam:DeactivateMFADevice"],
//!             "Resource": ["arn:aws:iam:::mfa/${aws:username}"],
//!             "Condition": {"EqualsFoo": {"aws:username": true}}
//!         }]
//!     }"#,
//! )?;
//!
//! let foo = Request::new("iam:DeactivateMFADevice", "arn:aws:iam:::mfa/foo")
//!     .with_variable("aws", "username", "foo");
//! assert!(engine.evaluate(&foo));
//!
//! let bar = Request::new("iam:DeactivateMFADevice", "arn:aws:iam:::mfa/bar")
//!     .with_variable("aws", "username", "bar");
//! assert!(!engine.evaluate(&bar));
//! # Ok(())
//! # }
//! ```
//!
//! Evaluation takes `&self`, so a built engine can be shared behind an
//! [`Arc`](std::sync::Arc) and queried from many threads. Adding policies
//! takes `&mut self`.

pub mod core;

pub use crate::core::{
    config::{EngineConfig, EngineOptions, OperatorPrecedence},
    error::{PbacError, Result},
    iam::{
        BuiltinOperator, ConditionBlock, ConditionOperator, ConditionRegistry, CustomPredicate,
        Decision, Effect, Modifier, OneOrMany, PatternCache, PatternMatcher, Policy,
        PolicyEngine, PolicySchema, Predicate, PrincipalMap, Request, Statement,
        StatementEvaluator, StatementRef, ValidatedPolicyEngine, Value, VariableResolver,
        Variables, DEFAULT_PATTERN_CACHE_CAPACITY, POLICY_VERSION, SUPPORTED_VERSIONS,
    },
};
