//! Structural validation of policy documents
//!
//! Checks a candidate JSON document before it is accepted by an engine. The
//! set of valid `Condition` keys is supplied by the caller (normally every
//! name in the engine's [`ConditionRegistry`](super::ConditionRegistry)), so
//! custom operators and their derived variants are accepted.
//!
//! Errors carry a JSON-pointer-like path to the offending element, e.g.
//! `/Statement/0/Effect`.

use crate::core::error::{PbacError, Result};
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;

/// Accepted `Version` values
pub const SUPPORTED_VERSIONS: [&str; 2] = ["2012-10-17", "2008-10-17"];

const POLICY_KEYS: [&str; 2] = ["Version", "Statement"];

const STATEMENT_KEYS: [&str; 9] = [
    "Sid",
    "Effect",
    "Principal",
    "NotPrincipal",
    "Action",
    "NotAction",
    "Resource",
    "NotResource",
    "Condition",
];

/// Policy document validator
#[derive(Debug, Clone)]
pub struct PolicySchema {
    operators: BTreeSet<String>,
}

impl PolicySchema {
    /// Create a validator accepting the given condition operator names
    pub fn new<I, S>(operator_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PolicySchema {
            operators: operator_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Condition operator names this schema accepts
    pub fn operator_names(&self) -> impl Iterator<Item = &str> {
        self.operators.iter().map(String::as_str)
    }

    /// Validate a single policy document
    pub fn validate(&self, document: &Json) -> Result<()> {
        self.validate_at("", document)
    }

    /// Validate every document, stopping at the first failure
    ///
    /// Paths are prefixed with the document's index, e.g. `/1/Statement`.
    pub fn validate_all<'a>(&self, documents: impl IntoIterator<Item = &'a Json>) -> Result<()> {
        for (i, document) in documents.into_iter().enumerate() {
            self.validate_at(&format!("/{}", i), document)?;
        }
        Ok(())
    }

    fn validate_at(&self, path: &str, document: &Json) -> Result<()> {
        let root = object(path, document)?;
        reject_unknown_keys(path, root, &POLICY_KEYS)?;

        let version_path = format!("{}/Version", path);
        match root.get("Version") {
            None => return Err(PbacError::validation(version_path, "missing required property")),
            Some(Json::String(v)) if SUPPORTED_VERSIONS.contains(&v.as_str()) => {}
            Some(Json::String(v)) => {
                return Err(PbacError::validation(
                    version_path,
                    format!("unsupported version {:?}", v),
                ))
            }
            Some(_) => return Err(PbacError::validation(version_path, "expected a string")),
        }

        let statement_path = format!("{}/Statement", path);
        match root.get("Statement") {
            None => Err(PbacError::validation(statement_path, "missing required property")),
            Some(Json::Array(statements)) if statements.is_empty() => Err(PbacError::validation(
                statement_path,
                "expected at least one statement",
            )),
            Some(Json::Array(statements)) => {
                for (i, statement) in statements.iter().enumerate() {
                    self.validate_statement(&format!("{}/{}", statement_path, i), statement)?;
                }
                Ok(())
            }
            Some(statement) => self.validate_statement(&statement_path, statement),
        }
    }

    fn validate_statement(&self, path: &str, statement: &Json) -> Result<()> {
        let statement = object(path, statement)?;
        reject_unknown_keys(path, statement, &STATEMENT_KEYS)?;

        if let Some(sid) = statement.get("Sid") {
            if !sid.is_string() {
                return Err(PbacError::validation(format!("{}/Sid", path), "expected a string"));
            }
        }

        let effect_path = format!("{}/Effect", path);
        match statement.get("Effect") {
            None => return Err(PbacError::validation(effect_path, "missing required property")),
            Some(Json::String(e)) if e == "Allow" || e == "Deny" => {}
            Some(_) => {
                return Err(PbacError::validation(
                    effect_path,
                    "expected \"Allow\" or \"Deny\"",
                ))
            }
        }

        for key in ["Action", "NotAction", "Resource", "NotResource"] {
            if let Some(value) = statement.get(key) {
                string_or_strings(&format!("{}/{}", path, key), value)?;
            }
        }

        for key in ["Principal", "NotPrincipal"] {
            if let Some(value) = statement.get(key) {
                let principal_path = format!("{}/{}", path, key);
                for (name, ids) in object(&principal_path, value)? {
                    string_or_strings(&format!("{}/{}", principal_path, name), ids)?;
                }
            }
        }

        if let Some(condition) = statement.get("Condition") {
            let condition_path = format!("{}/Condition", path);
            for (operator, entries) in object(&condition_path, condition)? {
                let operator_path = format!("{}/{}", condition_path, operator);
                if !self.operators.contains(operator) {
                    return Err(PbacError::validation(
                        operator_path,
                        format!("unknown condition operator {:?}", operator),
                    ));
                }
                object(&operator_path, entries)?;
            }
        }

        Ok(())
    }
}

fn object<'a>(path: &str, value: &'a Json) -> Result<&'a Map<String, Json>> {
    value
        .as_object()
        .ok_or_else(|| PbacError::validation(display_path(path), "expected an object"))
}

fn string_or_strings(path: &str, value: &Json) -> Result<()> {
    match value {
        Json::String(_) => Ok(()),
        Json::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    return Err(PbacError::validation(
                        format!("{}/{}", path, i),
                        "expected a string",
                    ));
                }
            }
            Ok(())
        }
        _ => Err(PbacError::validation(path, "expected a string or an array of strings")),
    }
}

fn reject_unknown_keys(path: &str, value: &Map<String, Json>, known: &[&str]) -> Result<()> {
    match value.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(PbacError::validation(
            format!("{}/{}", path, key),
            "unknown property",
        )),
        None => Ok(()),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
