//! IAM Policy document structure
//!
//! Policies define which actions are allowed or denied on which resources,
//! for which principals and under which conditions. The JSON format follows
//! the AWS IAM policy language:
//!
//! ```json
//! {
//!   "Version": "2012-10-17",
//!   "Statement": [{
//!     "Effect": "Allow",
//!     "Action": ["iam:DeactivateMFADevice"],
//!     "Resource": ["arn:aws:iam:::mfa/${aws:username}"],
//!     "Condition": {"Bool": {"aws:MultiFactorAuthPresent": true}}
//!   }]
//! }
//! ```

use super::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

/// Default policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Effect of a policy statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Allow the action
    Allow,
    /// Deny the action (takes precedence over Allow)
    Deny,
    /// Any other value; such a statement never matches
    Other(String),
}

impl Effect {
    pub fn as_str(&self) -> &str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
            Effect::Other(s) => s,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "Allow" => Effect::Allow,
            "Deny" => Effect::Deny,
            _ => Effect::Other(s),
        })
    }
}

/// A field that may be written as a single item or an array of items
#[derive(Debug, Clone, PartialEq)]
pub struct OneOrMany<T>(pub Vec<T>);

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany(Vec::new())
    }
}

impl<T> Deref for OneOrMany<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany(items)
    }
}

impl<'a, T> IntoIterator for &'a OneOrMany<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Serialize> Serialize for OneOrMany<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Many(Vec<T>),
            One(T),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Many(items) => OneOrMany(items),
            Repr::One(item) => OneOrMany(vec![item]),
        })
    }
}

/// Principal attribute key (e.g. `"AWS"`) to accepted identifiers
pub type PrincipalMap = BTreeMap<String, OneOrMany<String>>;

/// Operator name to `{variable reference: expected value(s)}`
pub type ConditionBlock = BTreeMap<String, BTreeMap<String, Value>>;

/// A single policy statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Statement ID (optional, informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Effect of this statement
    pub effect: Effect,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<PrincipalMap>,

    /// Action patterns (supports wildcards)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_action: Option<OneOrMany<String>>,

    /// Resource patterns (supports wildcards and `${ns:key}` variables)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<OneOrMany<String>>,

    /// Optional conditions for when this statement applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionBlock>,
}

fn strings<I, S>(items: I) -> OneOrMany<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    OneOrMany(items.into_iter().map(Into::into).collect())
}

impl Statement {
    /// Create a new statement with no clauses
    pub fn new(effect: Effect) -> Self {
        Statement {
            sid: None,
            effect,
            principal: None,
            not_principal: None,
            action: None,
            not_action: None,
            resource: None,
            not_resource: None,
            condition: None,
        }
    }

    pub fn allow() -> Self {
        Self::new(Effect::Allow)
    }

    pub fn deny() -> Self {
        Self::new(Effect::Deny)
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action = Some(strings(actions));
        self
    }

    pub fn with_not_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_action = Some(strings(actions));
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource = Some(strings(resources));
        self
    }

    pub fn with_not_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_resource = Some(strings(resources));
        self
    }

    /// Add principal identifiers under `key` (e.g. `"AWS"`)
    pub fn with_principal<I, S>(mut self, key: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.principal
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), strings(ids));
        self
    }

    pub fn with_not_principal<I, S>(mut self, key: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.not_principal
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), strings(ids));
        self
    }

    /// Add a condition entry `operator: {variable: expected}`
    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        variable: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        self.condition
            .get_or_insert_with(BTreeMap::new)
            .entry(operator.into())
            .or_default()
            .insert(variable.into(), expected.into());
        self
    }
}

/// Complete IAM policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    /// Policy format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Policy statements, in evaluation order
    pub statement: OneOrMany<Statement>,
}

fn default_version() -> String {
    POLICY_VERSION.to_string()
}

impl Policy {
    /// Create a new empty policy
    pub fn new() -> Self {
        Policy {
            version: default_version(),
            statement: OneOrMany::default(),
        }
    }

    /// Add a statement to this policy
    pub fn add_statement(&mut self, statement: Statement) {
        self.statement.0.push(statement);
    }

    /// Builder form of [`add_statement`](Self::add_statement)
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.add_statement(statement);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statement
    }

    /// Parse policy from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize policy to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_creation() {
        let mut policy = Policy::new();
        assert_eq!(policy.statements().len(), 0);

        policy.add_statement(
            Statement::allow()
                .with_actions(["s3:GetObject"])
                .with_resources(["arn:aws:s3:::public/*"]),
        );

        assert_eq!(policy.statements().len(), 1);
        assert_eq!(policy.version, POLICY_VERSION);
    }

    #[test]
    fn test_policy_json_roundtrip() {
        let policy = Policy::new().with_statement(
            Statement::allow()
                .with_sid("ReadPublic")
                .with_actions(["s3:GetObject", "s3:ListBucket"])
                .with_resources(["arn:aws:s3:::public/*"])
                .with_condition("Bool", "aws:SecureTransport", true),
        );

        let json = policy.to_json().unwrap();
        let parsed = Policy::from_json(&json).unwrap();

        assert_eq!(parsed, policy);
        assert_eq!(parsed.statements()[0].effect, Effect::Allow);
        assert_eq!(parsed.statements()[0].action.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_string_or_array_fields() {
        let policy: Policy = serde_json::from_value(json!({
            "Version": "2012-10-17",
            "Statement": {
                "Effect": "Deny",
                "Action": "s3:DeleteObject",
                "Resource": ["arn:aws:s3:::a/*", "arn:aws:s3:::b/*"],
                "Principal": {"AWS": "arn:aws:iam::123:root"}
            }
        }))
        .unwrap();

        let stmt = &policy.statements()[0];
        assert_eq!(stmt.effect, Effect::Deny);
        assert_eq!(&stmt.action.as_ref().unwrap()[..], &["s3:DeleteObject".to_string()]);
        assert_eq!(stmt.resource.as_ref().unwrap().len(), 2);
        assert_eq!(stmt.principal.as_ref().unwrap()["AWS"].len(), 1);
    }

    #[test]
    fn test_unknown_effect_preserved() {
        let stmt: Statement = serde_json::from_value(json!({"Effect": "Maybe"})).unwrap();
        assert_eq!(stmt.effect, Effect::Other("Maybe".to_string()));
        assert_eq!(serde_json::to_value(&stmt).unwrap(), json!({"Effect": "Maybe"}));
    }

    #[test]
    fn test_condition_values() {
        let stmt: Statement = serde_json::from_value(json!({
            "Effect": "Allow",
            "Condition": {
                "StringEquals": {"aws:username": ["alice", "bob"]},
                "NumericLessThan": {"app:age": 18}
            }
        }))
        .unwrap();

        let condition = stmt.condition.unwrap();
        assert_eq!(condition["StringEquals"]["aws:username"].as_slice().len(), 2);
        assert_eq!(condition["NumericLessThan"]["app:age"], Value::Number(18.0));
    }

    #[test]
    fn test_missing_version_defaults() {
        let policy: Policy =
            serde_json::from_value(json!({"Statement": [{"Effect": "Allow"}]})).unwrap();
        assert_eq!(policy.version, POLICY_VERSION);
    }
}
