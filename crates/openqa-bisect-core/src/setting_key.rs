//! Naming convention for job settings that carry bisectable incident lists.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_ELIGIBLE_KEY_PATTERN: &str = r"^[A-Z0-9_]+_TEST_(ISSUES|REPOS)$";
pub const COMMON_ISSUES_KEY: &str = "COMMON_TEST_ISSUES";

const ISSUES_SUFFIX: &str = "_TEST_ISSUES";
const REPOS_SUFFIX: &str = "_TEST_REPOS";

static DEFAULT_ELIGIBLE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(DEFAULT_ELIGIBLE_KEY_PATTERN).expect("eligible key regex should compile")
});

/// Decides which settings keys take part in bisection.
#[derive(Debug, Clone)]
pub struct EligibleKeyRule {
    pattern: Regex,
    reserved: BTreeSet<String>,
}

impl Default for EligibleKeyRule {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_ELIGIBLE_KEY_RE.clone(),
            reserved: BTreeSet::from([COMMON_ISSUES_KEY.to_string()]),
        }
    }
}

impl EligibleKeyRule {
    pub fn new(pattern: Regex, reserved: impl IntoIterator<Item = String>) -> Self {
        Self {
            pattern,
            reserved: reserved.into_iter().collect(),
        }
    }

    pub fn is_eligible(&self, key: &str) -> bool {
        !self.reserved.contains(key) && self.pattern.is_match(key)
    }

    /// Return true when `key` is an issues key whose repos sibling is in `keys`.
    pub fn is_superseded<'a>(
        &self,
        key: &str,
        mut keys: impl Iterator<Item = &'a String>,
    ) -> bool {
        let Some(product) = key.strip_suffix(ISSUES_SUFFIX) else {
            return false;
        };
        let sibling = format!("{product}{REPOS_SUFFIX}");
        keys.any(|candidate| *candidate == sibling)
    }
}

#[cfg(test)]
mod tests {
    use super::{EligibleKeyRule, COMMON_ISSUES_KEY};
    use regex::Regex;

    #[test]
    fn unit_default_rule_accepts_issue_and_repo_keys() {
        let rule = EligibleKeyRule::default();
        assert!(rule.is_eligible("OS_TEST_ISSUES"));
        assert!(rule.is_eligible("SLE_MODULE_TEST_REPOS"));
        assert!(!rule.is_eligible("OS_TEST_ISSUE"));
        assert!(!rule.is_eligible("os_test_issues"));
        assert!(!rule.is_eligible("MAINT_TEST_REPO"));
        assert!(!rule.is_eligible("INCIDENT_ID"));
    }

    #[test]
    fn regression_default_rule_rejects_the_common_context_key() {
        assert!(!EligibleKeyRule::default().is_eligible(COMMON_ISSUES_KEY));
    }

    #[test]
    fn functional_custom_rule_narrows_eligible_prefix() {
        let rule = EligibleKeyRule::new(
            Regex::new(r"^OS_TEST_ISSUES$").expect("regex"),
            Vec::<String>::new(),
        );
        assert!(rule.is_eligible("OS_TEST_ISSUES"));
        assert!(!rule.is_eligible("OTHER_TEST_ISSUES"));
    }

    #[test]
    fn unit_issues_key_is_superseded_only_by_its_own_repos_sibling() {
        let rule = EligibleKeyRule::default();
        let keys = ["OS_TEST_REPOS".to_string(), "SDK_TEST_ISSUES".to_string()];
        assert!(rule.is_superseded("OS_TEST_ISSUES", keys.iter()));
        assert!(!rule.is_superseded("SDK_TEST_ISSUES", keys.iter()));
        assert!(!rule.is_superseded("OS_TEST_REPOS", keys.iter()));
    }
}
