//! Policy variables (`${namespace:key}`)
//!
//! Requests carry variables grouped by namespace, e.g.
//! `{"aws": {"username": "alice"}}`. Resource patterns may embed
//! `${aws:username}` placeholders, and condition blocks reference variables
//! by the bare `aws:username` form.

use super::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Request variables: namespace -> value (normally a `Value::Map` of keys)
pub type Variables = BTreeMap<String, Value>;

/// Resolves variable references against a request's variables
pub struct VariableResolver;

impl VariableResolver {
    /// Look up a `namespace:key` reference
    ///
    /// Returns `None` when the namespace is missing, is not a map, or does
    /// not define the key. Anything after a second `:` is ignored.
    pub fn lookup<'a>(reference: &str, variables: &'a Variables) -> Option<&'a Value> {
        let mut parts = reference.split(':');
        let namespace = parts.next()?;
        let key = parts.next()?;

        variables.get(namespace)?.as_map()?.get(key)
    }

    /// Replace every `${namespace:key}` placeholder in `value`
    ///
    /// Placeholders that do not resolve are left in place verbatim.
    ///
    /// # Examples
    /// ```
    /// use pbac::{Value, VariableResolver, Variables};
    /// use std::collections::BTreeMap;
    ///
    /// let mut aws = BTreeMap::new();
    /// aws.insert("username".to_string(), Value::from("alice"));
    /// let mut variables = Variables::new();
    /// variables.insert("aws".to_string(), Value::Map(aws));
    ///
    /// assert_eq!(
    ///     VariableResolver::interpolate("arn:aws:iam:::user/${aws:username}", &variables),
    ///     "arn:aws:iam:::user/alice"
    /// );
    /// assert_eq!(
    ///     VariableResolver::interpolate("arn:aws:iam:::user/${aws:username}", &Variables::new()),
    ///     "arn:aws:iam:::user/${aws:username}"
    /// );
    /// ```
    pub fn interpolate<'v>(value: &'v str, variables: &Variables) -> Cow<'v, str> {
        if !value.contains("${") {
            return Cow::Borrowed(value);
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            let body = &rest[start + 2..];
            // The reference must be at least one character long
            let end = body
                .char_indices()
                .skip(1)
                .find(|&(_, c)| c == '}')
                .map(|(i, _)| i);

            let Some(end) = end else {
                break;
            };

            out.push_str(&rest[..start]);
            let reference = &body[..end];
            match Self::lookup(reference, variables) {
                Some(resolved) => out.push_str(&resolved.to_string()),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &body[end + 1..];
        }

        out.push_str(rest);
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(v: serde_json::Value) -> Variables {
        match Value::from(v) {
            Value::Map(m) => m,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_lookup() {
        let variables = vars(json!({"aws": {"username": "alice", "MultiFactorAuthPresent": true}}));

        assert_eq!(
            VariableResolver::lookup("aws:username", &variables),
            Some(&Value::from("alice"))
        );
        assert_eq!(
            VariableResolver::lookup("aws:MultiFactorAuthPresent", &variables),
            Some(&Value::Bool(true))
        );
        assert_eq!(VariableResolver::lookup("aws:missing", &variables), None);
        assert_eq!(VariableResolver::lookup("s3:prefix", &variables), None);
        assert_eq!(VariableResolver::lookup("aws", &variables), None);
    }

    #[test]
    fn test_lookup_namespace_not_a_map() {
        let variables = vars(json!({"aws": "flat"}));
        assert_eq!(VariableResolver::lookup("aws:username", &variables), None);
    }

    #[test]
    fn test_interpolate() {
        let variables = vars(json!({"aws": {"username": "alice"}}));
        assert_eq!(
            VariableResolver::interpolate("arn:aws:iam:::user/${aws:username}", &variables),
            "arn:aws:iam:::user/alice"
        );
    }

    #[test]
    fn test_interpolate_fails_open() {
        let template = "arn:aws:iam:::user/${aws:username}";
        assert_eq!(
            VariableResolver::interpolate(template, &Variables::new()),
            template
        );
    }

    #[test]
    fn test_interpolate_multiple() {
        let variables = vars(json!({"aws": {"username": "bob", "userid": 7}}));
        assert_eq!(
            VariableResolver::interpolate("${aws:username}/${aws:missing}/${aws:userid}", &variables),
            "bob/${aws:missing}/7"
        );
    }

    #[test]
    fn test_interpolate_unterminated() {
        let variables = vars(json!({"aws": {"username": "bob"}}));
        assert_eq!(
            VariableResolver::interpolate("prefix/${aws:username", &variables),
            "prefix/${aws:username"
        );
        assert_eq!(VariableResolver::interpolate("${}", &variables), "${}");
    }

    #[test]
    fn test_interpolate_without_placeholders_borrows() {
        let result = VariableResolver::interpolate("arn:aws:s3:::bucket/*", &Variables::new());
        assert!(matches!(result, Cow::Borrowed(_)));
    }
}
