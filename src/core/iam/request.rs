//! Request context evaluated against policies

use super::{Value, Variables};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single authorization question: may `principal` perform `action` on
/// `resource` given `variables`?
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    pub action: String,
    pub resource: String,
    /// Principal attributes, e.g. `{"AWS": "arn:aws:iam::123:user/alice"}`
    pub principal: BTreeMap<String, Value>,
    /// Runtime variables grouped by namespace
    pub variables: Variables,
}

impl Request {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Request {
            action: action.into(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Set a principal attribute
    pub fn with_principal(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.principal.insert(key.into(), value.into());
        self
    }

    /// Set `namespace:key` in the request variables
    ///
    /// A namespace previously set to a non-map value is replaced.
    pub fn with_variable(
        mut self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let slot = self
            .variables
            .entry(namespace.into())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(BTreeMap::new());
        }
        if let Value::Map(map) = slot {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Replace the whole variables context
    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::VariableResolver;
    use serde_json::json;

    #[test]
    fn test_with_variable() {
        let request = Request::new("iam:GetUser", "arn:aws:iam:::user/alice")
            .with_variable("aws", "username", "alice")
            .with_variable("aws", "MultiFactorAuthPresent", true);

        assert_eq!(
            VariableResolver::lookup("aws:username", &request.variables),
            Some(&Value::from("alice"))
        );
        assert_eq!(
            VariableResolver::lookup("aws:MultiFactorAuthPresent", &request.variables),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_with_variable_replaces_scalar_namespace() {
        let mut variables = Variables::new();
        variables.insert("aws".to_string(), Value::from("oops"));

        let request = Request::new("a", "r")
            .with_variables(variables)
            .with_variable("aws", "username", "bob");
        assert_eq!(
            VariableResolver::lookup("aws:username", &request.variables),
            Some(&Value::from("bob"))
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let request: Request = serde_json::from_value(json!({
            "action": "s3:GetObject",
            "principal": {"AWS": ["arn:1", "arn:2"]}
        }))
        .unwrap();

        assert_eq!(request.action, "s3:GetObject");
        assert!(request.resource.is_empty());
        assert_eq!(request.principal["AWS"].as_slice().len(), 2);
        assert!(request.variables.is_empty());
    }
}
