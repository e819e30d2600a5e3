//! Property-based tests for evaluation invariants
//!
//! Uses proptest to check the decision rules hold across random requests

use pbac::{Decision, PatternMatcher, Policy, PolicyEngine, Request, Statement};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,12}"
}

fn action() -> impl Strategy<Value = String> {
    (segment(), segment()).prop_map(|(service, name)| format!("{}:{}", service, name))
}

proptest! {
    #[test]
    fn prop_deny_overrides_allow(
        action in action(),
        resource in "[a-zA-Z0-9:/._-]{0,40}",
        allow_first in any::<bool>()
    ) {
        let allow = Statement::allow().with_actions([action.as_str()]).with_resources(["*"]);
        let deny = Statement::deny().with_actions(["*"]).with_resources([resource.as_str()]);

        let policy = if allow_first {
            Policy::new().with_statement(allow).with_statement(deny)
        } else {
            Policy::new().with_statement(deny).with_statement(allow)
        };
        let engine = PolicyEngine::new([policy]);

        let decision = engine.decide(&Request::new(action, resource));
        prop_assert!(matches!(decision, Decision::ExplicitDeny(_)), "got {:?}", decision);
    }

    #[test]
    fn prop_default_deny(action in action(), resource in "[a-z/]{0,30}") {
        prop_assume!(action != "never:Matches");
        let policy = Policy::new().with_statement(
            Statement::allow()
                .with_actions(["never:Matches"])
                .with_resources(["arn:none"]),
        );
        let engine = PolicyEngine::new([policy]);

        prop_assert_eq!(engine.decide(&Request::new(action, resource)), Decision::ImplicitDeny);
    }

    #[test]
    fn prop_empty_engine_denies(action in action(), resource in ".*") {
        prop_assert!(!PolicyEngine::default().evaluate(&Request::new(action, resource)));
    }

    #[test]
    fn prop_literal_pattern_matches_itself(s in "[ -~]{0,40}") {
        let escaped: String = s.chars().filter(|c| *c != '*' && *c != '?').collect();
        prop_assert!(PatternMatcher::matches(&escaped, &escaped));
    }

    #[test]
    fn prop_star_suffix(prefix in "[a-z:]{0,10}", rest in "[ -~]{0,20}") {
        let pattern = format!("{}*", prefix);
        let input = format!("{}{}", prefix, rest);
        prop_assert!(PatternMatcher::matches(&input, &pattern));
    }

    #[test]
    fn prop_question_mark_is_single_char(prefix in "[a-z]{0,10}", c in "[a-z]", extra in "[a-z]{1,5}") {
        let pattern = format!("{}?", prefix);
        let one = format!("{}{}", prefix, c);
        let longer = format!("{}{}{}", prefix, c, extra);
        prop_assert!(PatternMatcher::matches(&one, &pattern));
        prop_assert!(!PatternMatcher::matches(&longer, &pattern));
        prop_assert!(!PatternMatcher::matches(&prefix, &pattern));
    }
}
