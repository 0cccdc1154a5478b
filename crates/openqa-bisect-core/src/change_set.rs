//! Investigation diff parsing.
//!
//! The platform renders the settings difference between a failing job and its
//! last good ancestor as unified-diff text over pretty-printed JSON. Relevant
//! lines look like `+ "OS_TEST_ISSUES": "1,2,3",`. The grammar is line oriented
//! and tolerant: anything that does not match, names an ineligible key, or
//! carries a non-numeric incident token is skipped without failing the parse.
//!
//! Only keys that appear on both sides of the diff and list more incidents
//! after the change than before count as changed. A key that only shows up on
//! the `+` side, or whose list was swapped or shrunk, is left out.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::incident::{parse_incident_list, IncidentSet};
use crate::setting_key::EligibleKeyRule;

static DIFF_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?P<polarity>[+-])\s*"(?P<key>[^"]+)"\s*:\s*"(?P<value>[^"]*)",?\s*$"#)
        .expect("diff line regex should compile")
});

/// Added and removed incidents of one settings key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyChange {
    pub removed: IncidentSet,
    pub added: IncidentSet,
}

impl KeyChange {
    /// Incidents introduced by the change (`added ∖ removed`).
    pub fn net_new(&self) -> IncidentSet {
        self.added.difference(&self.removed).copied().collect()
    }
}

/// Per-key incident changes extracted from one investigation diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    keys: BTreeMap<String, KeyChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn get(&self, key: &str) -> Option<&KeyChange> {
        self.keys.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Keys in ascending order with their changes.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyChange)> {
        self.keys.iter()
    }

    /// Every incident that is new across all keys.
    pub fn net_new_incidents(&self) -> IncidentSet {
        self.keys.values().flat_map(|change| change.net_new()).collect()
    }
}

impl FromIterator<(String, KeyChange)> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = (String, KeyChange)>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// Both sides of one key as seen in the diff; `None` when a side is missing.
#[derive(Debug, Default)]
struct DiffSides {
    removed: Option<IncidentSet>,
    added: Option<IncidentSet>,
}

impl DiffSides {
    fn into_growing_change(self) -> Option<KeyChange> {
        let (removed, added) = (self.removed?, self.added?);
        (added.len() > removed.len()).then_some(KeyChange { removed, added })
    }
}

/// Parse investigation diff text into a [`ChangeSet`].
pub fn extract_change_set(diff: &str, rule: &EligibleKeyRule) -> ChangeSet {
    let mut keys: BTreeMap<String, DiffSides> = BTreeMap::new();
    for line in diff.lines() {
        let Some(captures) = DIFF_LINE_RE.captures(line) else {
            continue;
        };
        let key = &captures["key"];
        if !rule.is_eligible(key) {
            continue;
        }
        let Ok(incidents) = parse_incident_list(&captures["value"]) else {
            continue;
        };
        let entry = keys.entry(key.to_string()).or_default();
        if &captures["polarity"] == "+" {
            entry.added.get_or_insert_with(IncidentSet::new).extend(incidents);
        } else {
            entry.removed.get_or_insert_with(IncidentSet::new).extend(incidents);
        }
    }

    let mut keys = keys
        .into_iter()
        .filter_map(|(key, sides)| sides.into_growing_change().map(|change| (key, change)))
        .collect::<BTreeMap<_, _>>();
    let superseded = keys
        .keys()
        .filter(|key| rule.is_superseded(key, keys.keys()))
        .cloned()
        .collect::<Vec<_>>();
    for key in superseded {
        keys.remove(&key);
    }
    ChangeSet { keys }
}

#[cfg(test)]
mod tests {
    use super::{extract_change_set, ChangeSet, KeyChange};
    use crate::incident::{Incident, IncidentSet};
    use crate::setting_key::EligibleKeyRule;
    use proptest::prelude::*;

    fn incidents(ids: &[u64]) -> IncidentSet {
        ids.iter().copied().map(Incident::new).collect()
    }

    #[test]
    fn functional_extract_change_set_collects_added_and_removed_sets() {
        let diff = "- \"OS_TEST_ISSUES\": \"1,2,3,4\",\n+ \"OS_TEST_ISSUES\": \"1,2,3,4,5\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        let expected = ChangeSet::from_iter([(
            "OS_TEST_ISSUES".to_string(),
            KeyChange {
                removed: incidents(&[1, 2, 3, 4]),
                added: incidents(&[1, 2, 3, 4, 5]),
            },
        )]);
        assert_eq!(changes, expected);
        assert_eq!(changes.net_new_incidents(), incidents(&[5]));
    }

    #[test]
    fn functional_extract_change_set_ignores_ineligible_keys() {
        let diff = "\
- \"OS_TEST_ISSUES\": \"1,2\",
+ \"OS_TEST_ISSUES\": \"1,2,3\",
- \"BUILD\": \"20220101-1\",
+ \"BUILD\": \"20220102-1\",
+ \"OS_TEST_ISSUES_OLD\": \"7,8\",
+ \"COMMON_TEST_ISSUES\": \"1,2,3\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        assert_eq!(changes.len(), 1);
        assert!(changes.contains_key("OS_TEST_ISSUES"));
    }

    #[test]
    fn functional_extract_change_set_keeps_only_keys_that_grew_on_both_sides() {
        let diff = "- \"OS_TEST_ISSUES\": \"1,2,3,4\",\n+ \"OS_TEST_ISSUES\": \"1,2,3,4,5\",\n- \"OTHER_TEST_ISSUES\": \"23\",\n+ \"OTHER_TEST_ISSUES\": \"24\",\n+ \"DUMMY_TEST_ISSUES\": \"25,26,27\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        let expected = ChangeSet::from_iter([(
            "OS_TEST_ISSUES".to_string(),
            KeyChange {
                removed: incidents(&[1, 2, 3, 4]),
                added: incidents(&[1, 2, 3, 4, 5]),
            },
        )]);
        assert_eq!(changes, expected);
    }

    #[test]
    fn regression_extract_change_set_drops_shrunk_and_removed_only_keys() {
        let diff = "\
- \"OS_TEST_ISSUES\": \"1,2,3\",
+ \"OS_TEST_ISSUES\": \"1,2\",
- \"SDK_TEST_ISSUES\": \"7,8\",";
        assert!(extract_change_set(diff, &EligibleKeyRule::default()).is_empty());
    }

    #[test]
    fn regression_extract_change_set_keeps_key_whose_removed_side_was_empty() {
        let diff = "- \"SDK_TEST_ISSUES\": \"\",\n+ \"SDK_TEST_ISSUES\": \"24\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        assert_eq!(changes.net_new_incidents(), incidents(&[24]));
    }

    #[test]
    fn integration_extract_change_set_prefers_repos_over_issues_of_same_product() {
        let diff = "- \"OS_TEST_ISSUES\": \"1,2,3,4\",\n- \"OS_TEST_REPOS\": \"1,2,3,4\",\n+ \"OS_TEST_ISSUES\": \"1,2,3,4,5\",\n+ \"OS_TEST_REPOS\": \"1,2,3,4,5\",\n- \"OTHER_TEST_ISSUES\": \"23\",\n+ \"OTHER_TEST_ISSUES\": \"24\",\n+ \"DUMMY_TEST_ISSUES\": \"25,26,27\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        let expected = ChangeSet::from_iter([(
            "OS_TEST_REPOS".to_string(),
            KeyChange {
                removed: incidents(&[1, 2, 3, 4]),
                added: incidents(&[1, 2, 3, 4, 5]),
            },
        )]);
        assert_eq!(changes, expected);
    }

    #[test]
    fn regression_extract_change_set_skips_malformed_lines() {
        let diff = "\
- \"OS_TEST_ISSUES\": \"x\",
- \"OS_TEST_ISSUES\": \"\",
+ \"OS_TEST_ISSUES\": \"1,2,abc\",
+ OS_TEST_ISSUES: \"4\",
+ \"OS_TEST_ISSUES\": 5,
  \"OS_TEST_ISSUES\": \"6\",
+ \"OS_TEST_ISSUES\": \"7, 8,\",";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        let change = changes.get("OS_TEST_ISSUES").expect("one valid line");
        assert_eq!(change.added, incidents(&[7, 8]));
        assert!(change.removed.is_empty());
    }

    #[test]
    fn regression_extract_change_set_accepts_spaced_colon_and_missing_comma() {
        let diff = "-   \"OS_TEST_ISSUES\" : \"1\",\n+   \"OS_TEST_ISSUES\" : \"1,2\"";
        let changes = extract_change_set(diff, &EligibleKeyRule::default());
        assert_eq!(changes.net_new_incidents(), incidents(&[2]));
    }

    #[test]
    fn unit_extract_change_set_of_empty_text_is_empty() {
        assert!(extract_change_set("", &EligibleKeyRule::default()).is_empty());
        assert!(extract_change_set("no diff here\n", &EligibleKeyRule::default()).is_empty());
    }

    #[test]
    fn unit_key_change_with_identical_sides_has_no_net_new() {
        let change = KeyChange {
            removed: incidents(&[3, 4]),
            added: incidents(&[4, 3]),
        };
        assert!(change.net_new().is_empty());
    }

    fn diff_line_strategy() -> impl Strategy<Value = String> {
        let key = prop_oneof![
            Just("OS_TEST_ISSUES".to_string()),
            Just("SDK_TEST_REPOS".to_string()),
            Just("BUILD".to_string()),
            Just("OS_TEST_ISSUES_X".to_string()),
            "[A-Z_]{1,12}",
        ];
        let polarity = prop_oneof![Just('+'), Just('-'), Just(' ')];
        let values = prop::collection::vec(0u64..50, 0..6);
        (polarity, key, values).prop_map(|(polarity, key, values)| {
            let joined = values
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("{polarity} \"{key}\": \"{joined}\",")
        })
    }

    proptest! {
        #[test]
        fn property_extract_change_set_only_returns_eligible_keys(
            lines in prop::collection::vec(diff_line_strategy(), 0..16)
        ) {
            let rule = EligibleKeyRule::default();
            let changes = extract_change_set(&lines.join("\n"), &rule);
            for (key, _) in changes.iter() {
                prop_assert!(rule.is_eligible(key));
            }
        }

        #[test]
        fn property_extract_change_set_is_idempotent_and_order_independent(
            lines in prop::collection::vec(diff_line_strategy(), 0..16)
        ) {
            let rule = EligibleKeyRule::default();
            let text = lines.join("\n");
            let first = extract_change_set(&text, &rule);
            let second = extract_change_set(&text, &rule);
            prop_assert_eq!(&first, &second);

            let mut reversed = lines.clone();
            reversed.reverse();
            prop_assert_eq!(first, extract_change_set(&reversed.join("\n"), &rule));
        }

        #[test]
        fn property_extract_change_set_never_panics_on_arbitrary_text(text in any::<String>()) {
            let _ = extract_change_set(&text, &EligibleKeyRule::default());
        }
    }
}
