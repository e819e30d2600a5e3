//! Condition operator registry
//!
//! Maps operator names to predicates. The registry is built once per engine
//! from the built-in operators plus any custom operators, and every base
//! operator `Op` is expanded at build time into four entries:
//!
//! - `Op` - the predicate itself
//! - `OpIfExists` - passes when the key is absent, otherwise `Op`
//! - `ForAllValues:Op` - every actual value matches some expected value
//! - `ForAnyValue:Op` - some actual value matches some expected value

use super::{BuiltinOperator, PatternCache, Value};
use crate::core::config::OperatorPrecedence;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied operator predicate over `(actual, expected)`
pub type CustomPredicate = Arc<dyn Fn(Option<&Value>, &Value) -> bool + Send + Sync>;

const FOR_ALL_VALUES: &str = "ForAllValues:";
const FOR_ANY_VALUE: &str = "ForAnyValue:";
const IF_EXISTS: &str = "IfExists";

/// A base predicate: built-in or custom
#[derive(Clone)]
pub enum Predicate {
    Builtin(BuiltinOperator),
    Custom(CustomPredicate),
}

impl Predicate {
    pub fn test(&self, actual: Option<&Value>, expected: &Value) -> bool {
        self.test_in(actual, expected, None)
    }

    fn test_in(
        &self,
        actual: Option<&Value>,
        expected: &Value,
        patterns: Option<&PatternCache>,
    ) -> bool {
        match (self, patterns) {
            (Predicate::Builtin(op), Some(cache)) => op.evaluate_cached(actual, expected, cache),
            (Predicate::Builtin(op), None) => op.evaluate(actual, expected),
            (Predicate::Custom(f), _) => f(actual, expected),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Builtin(op) => write!(f, "Builtin({})", op),
            Predicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How a registered entry lifts its base predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// The base predicate as-is
    Plain,
    /// Vacuously true when the key is absent
    IfExists,
    /// Universal quantifier over the actual values
    ForAllValues,
    /// Existential quantifier over the actual values
    ForAnyValue,
}

/// A resolved registry entry
#[derive(Debug, Clone)]
pub struct ConditionOperator {
    base: Predicate,
    modifier: Modifier,
}

impl ConditionOperator {
    fn new(base: Predicate, modifier: Modifier) -> Self {
        ConditionOperator { base, modifier }
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// Quantified operators receive the whole expected-value set at once
    pub fn is_quantified(&self) -> bool {
        matches!(self.modifier, Modifier::ForAllValues | Modifier::ForAnyValue)
    }

    /// Apply the operator
    ///
    /// For quantified operators a scalar `actual` is treated as a one-element
    /// set, as is a scalar `expected`.
    pub fn test(&self, actual: Option<&Value>, expected: &Value) -> bool {
        self.test_in(actual, expected, None)
    }

    /// Apply the operator, compiling wildcard operands through `patterns`
    pub fn test_cached(
        &self,
        actual: Option<&Value>,
        expected: &Value,
        patterns: &PatternCache,
    ) -> bool {
        self.test_in(actual, expected, Some(patterns))
    }

    fn test_in(
        &self,
        actual: Option<&Value>,
        expected: &Value,
        patterns: Option<&PatternCache>,
    ) -> bool {
        let base = |a: Option<&Value>, b: &Value| self.base.test_in(a, b, patterns);
        match self.modifier {
            Modifier::Plain => base(actual, expected),
            Modifier::IfExists => actual.is_none() || base(actual, expected),
            Modifier::ForAllValues => quantified_actuals(actual)
                .iter()
                .all(|a| expected.as_slice().iter().any(|b| base(*a, b))),
            Modifier::ForAnyValue => quantified_actuals(actual)
                .iter()
                .any(|a| expected.as_slice().iter().any(|b| base(*a, b))),
        }
    }
}

/// Coerce the actual operand of a quantified operator to a sequence
fn quantified_actuals(actual: Option<&Value>) -> Vec<Option<&Value>> {
    match actual {
        Some(value) => value.as_slice().iter().map(Some).collect(),
        None => vec![None],
    }
}

/// Frozen mapping from operator name to operator
#[derive(Debug, Clone)]
pub struct ConditionRegistry {
    operators: HashMap<String, ConditionOperator>,
}

impl ConditionRegistry {
    /// Registry holding only the built-in operators and their variants
    pub fn builtin() -> Self {
        Self::new(Vec::new(), OperatorPrecedence::default())
    }

    /// Build a registry from the built-ins plus `custom` operators
    ///
    /// Custom operators are merged before variant expansion, so they gain
    /// `IfExists`, `ForAllValues:` and `ForAnyValue:` forms. Name collisions
    /// with built-ins are resolved by `precedence`.
    pub fn new(
        custom: impl IntoIterator<Item = (String, CustomPredicate)>,
        precedence: OperatorPrecedence,
    ) -> Self {
        let mut bases: BTreeMap<String, Predicate> = BuiltinOperator::ALL
            .iter()
            .map(|op| (op.name().to_string(), Predicate::Builtin(*op)))
            .collect();

        for (name, predicate) in custom {
            let collides = matches!(bases.get(&name), Some(Predicate::Builtin(_)));
            match (collides, precedence) {
                (true, OperatorPrecedence::BuiltinsWin) => {
                    tracing::warn!("Custom condition operator {} ignored: built-in takes precedence", name);
                }
                (true, OperatorPrecedence::CustomWins) => {
                    tracing::warn!("Custom condition operator {} replaces the built-in", name);
                    bases.insert(name, Predicate::Custom(predicate));
                }
                (false, _) => {
                    bases.insert(name, Predicate::Custom(predicate));
                }
            }
        }

        let mut operators = HashMap::with_capacity(bases.len() * 4);
        for (name, base) in &bases {
            operators.insert(name.clone(), ConditionOperator::new(base.clone(), Modifier::Plain));
        }
        // Derived names never shadow a base operator of the same name
        for (name, base) in bases {
            let derived = [
                (format!("{}{}", name, IF_EXISTS), Modifier::IfExists),
                (format!("{}{}", FOR_ALL_VALUES, name), Modifier::ForAllValues),
                (format!("{}{}", FOR_ANY_VALUE, name), Modifier::ForAnyValue),
            ];
            for (derived_name, modifier) in derived {
                operators
                    .entry(derived_name)
                    .or_insert_with(|| ConditionOperator::new(base.clone(), modifier));
            }
        }

        tracing::debug!("Condition registry built with {} operators", operators.len());
        ConditionRegistry { operators }
    }

    /// Look up an operator by name
    pub fn resolve(&self, name: &str) -> Option<&ConditionOperator> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// All registered operator names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
