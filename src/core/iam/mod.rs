//! Policy-based access control
//!
//! Provides fine-grained access control with:
//! - JSON policy documents in the AWS IAM policy language
//! - Allow/Deny statements with explicit deny precedence and default deny
//! - Wildcard pattern matching for actions and resources
//! - `${namespace:key}` variable interpolation in resources
//! - Condition operators (String, Numeric, Date, Bool, Binary, IpAddress, Null)
//!   with `IfExists`, `ForAllValues:` and `ForAnyValue:` variants
//! - Custom condition operators scoped to an engine instance
//! - Optional structural validation of documents before they are accepted

mod cache;
mod condition;
mod engine;
mod evaluator;
mod pattern;
mod policy;
mod registry;
mod request;
mod schema;
mod validated;
mod value;
mod variables;

pub use cache::{PatternCache, DEFAULT_PATTERN_CACHE_CAPACITY};
pub use condition::BuiltinOperator;
pub use engine::{Decision, PolicyEngine, StatementRef};
pub use evaluator::StatementEvaluator;
pub use pattern::PatternMatcher;
pub use policy::{
    ConditionBlock, Effect, OneOrMany, Policy, PrincipalMap, Statement, POLICY_VERSION,
};
pub use registry::{ConditionOperator, ConditionRegistry, CustomPredicate, Modifier, Predicate};
pub use request::Request;
pub use schema::{PolicySchema, SUPPORTED_VERSIONS};
pub use validated::ValidatedPolicyEngine;
pub use value::Value;
pub use variables::{VariableResolver, Variables};
