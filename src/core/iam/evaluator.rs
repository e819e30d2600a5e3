//! Single-statement matching
//!
//! A statement matches a request when its effect equals the effect being
//! searched for and every clause it carries holds. Absent clauses are
//! vacuously satisfied.

use super::{
    BuiltinOperator, ConditionBlock, ConditionRegistry, Effect, PatternCache, PrincipalMap,
    Request, Statement, Value, VariableResolver, Variables,
};

/// Matches statements against requests
///
/// Borrows the engine's registry and pattern cache, so it is cheap to build
/// per call.
#[derive(Debug, Clone, Copy)]
pub struct StatementEvaluator<'a> {
    registry: &'a ConditionRegistry,
    patterns: &'a PatternCache,
}

impl<'a> StatementEvaluator<'a> {
    pub fn new(registry: &'a ConditionRegistry, patterns: &'a PatternCache) -> Self {
        StatementEvaluator { registry, patterns }
    }

    /// Does `statement` contribute `effect` to the decision for `request`?
    pub fn matches(&self, statement: &Statement, effect: &Effect, request: &Request) -> bool {
        if statement.effect != *effect || matches!(effect, Effect::Other(_)) {
            return false;
        }

        if let Some(principals) = &statement.principal {
            if !principal_matches(principals, request) {
                tracing::trace!(sid = ?statement.sid, "Principal did not match");
                return false;
            }
        }
        if let Some(excluded) = &statement.not_principal {
            if principal_excluded(excluded, request) {
                tracing::trace!(sid = ?statement.sid, "Principal excluded by NotPrincipal");
                return false;
            }
        }

        if let Some(resources) = &statement.resource {
            if !self.any_resource_matches(resources, request) {
                tracing::trace!(sid = ?statement.sid, "Resource did not match");
                return false;
            }
        }
        if let Some(resources) = &statement.not_resource {
            if self.any_resource_matches(resources, request) {
                tracing::trace!(sid = ?statement.sid, "Resource excluded by NotResource");
                return false;
            }
        }

        if let Some(actions) = &statement.action {
            if !self.any_action_matches(actions, &request.action) {
                tracing::trace!(sid = ?statement.sid, "Action did not match");
                return false;
            }
        }
        if let Some(actions) = &statement.not_action {
            if self.any_action_matches(actions, &request.action) {
                tracing::trace!(sid = ?statement.sid, "Action excluded by NotAction");
                return false;
            }
        }

        match &statement.condition {
            Some(block) => self.conditions_hold(block, &request.variables),
            None => true,
        }
    }

    /// Resource patterns are interpolated before matching
    fn any_resource_matches(&self, patterns: &[String], request: &Request) -> bool {
        patterns.iter().any(|pattern| {
            let pattern = VariableResolver::interpolate(pattern, &request.variables);
            self.patterns.matches(&request.resource, &pattern)
        })
    }

    fn any_action_matches(&self, patterns: &[String], action: &str) -> bool {
        patterns
            .iter()
            .any(|pattern| self.patterns.matches(action, pattern))
    }

    /// Every `(operator, variable)` entry must hold
    fn conditions_hold(&self, block: &ConditionBlock, variables: &Variables) -> bool {
        for (name, entries) in block {
            let Some(operator) = self.registry.resolve(name) else {
                tracing::warn!("Unknown condition operator {}, statement does not match", name);
                return false;
            };
            if entries.is_empty() {
                tracing::trace!("Condition operator {} has no entries", name);
                return false;
            }

            for (variable, expected) in entries {
                let actual = VariableResolver::lookup(variable, variables);
                let holds = if operator.is_quantified() {
                    operator.test_cached(actual, expected, self.patterns)
                } else {
                    expected
                        .as_slice()
                        .iter()
                        .any(|candidate| operator.test_cached(actual, candidate, self.patterns))
                };

                if !holds {
                    tracing::trace!("Condition {} on {} failed", name, variable);
                    return false;
                }
            }
        }
        true
    }
}

fn string_equals(actual: &Value, ids: &[String]) -> bool {
    ids.iter()
        .any(|id| BuiltinOperator::StringEquals.evaluate(Some(actual), &Value::from(id.as_str())))
}

/// Pairs of (request values, configured ids) for keys present on both sides
fn principal_pairs<'r>(
    principals: &'r PrincipalMap,
    request: &'r Request,
) -> impl Iterator<Item = (&'r Value, &'r [String])> {
    request.principal.iter().filter_map(move |(key, value)| {
        let ids = principals.get(key)?;
        if ids.is_empty() || value.is_empty() {
            return None;
        }
        Some((value, &ids[..]))
    })
}

/// `ForAnyValue:StringEquals` on any shared key
fn principal_matches(principals: &PrincipalMap, request: &Request) -> bool {
    principal_pairs(principals, request)
        .any(|(value, ids)| value.as_slice().iter().any(|v| string_equals(v, ids)))
}

/// `ForAllValues:StringEquals` on any shared key
fn principal_excluded(excluded: &PrincipalMap, request: &Request) -> bool {
    principal_pairs(excluded, request)
        .any(|(value, ids)| value.as_slice().iter().all(|v| string_equals(v, ids)))
}
