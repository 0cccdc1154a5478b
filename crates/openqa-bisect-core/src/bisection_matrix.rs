//! Leave-one-out clone matrix.
//!
//! Every bisection incident yields exactly one candidate that re-runs the job
//! with that single incident removed. Bisection incidents are the net-new
//! incidents of each changed key plus, for eligible keys the diff does not
//! mention, every incident of a key that carries more than one. Candidates are
//! ordered by key, then by incident.

use std::collections::{BTreeMap, BTreeSet};

use crate::change_set::ChangeSet;
use crate::exclusion_policy::{INVESTIGATE_ORIGIN_SETTING, INVESTIGATE_TEST_MARKER};
use crate::incident::{join_incidents, Incident, IncidentSet};
use crate::job_model::{JobRecord, JobUrl};
use crate::setting_key::{EligibleKeyRule, COMMON_ISSUES_KEY};

pub const BISECT_NAME_PREFIX: &str = "bisect_without_";
pub const TEST_SETTING: &str = "TEST";
pub const MAINT_TEST_REPO_SETTING: &str = "MAINT_TEST_REPO";

/// One clone variant of the origin job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BisectCandidate {
    pub key: String,
    pub incident: Incident,
    pub test_name: String,
    pub overlay: Vec<(String, String)>,
}

impl BisectCandidate {
    pub fn name_suffix(&self) -> String {
        format!("{BISECT_NAME_PREFIX}{}", self.incident)
    }

    /// Overlay rendered as `KEY=value` clone arguments.
    pub fn setting_args(&self) -> Vec<String> {
        self.overlay
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    pub fn overlay_value(&self, key: &str) -> Option<&str> {
        self.overlay
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BisectionMatrix {
    candidates: Vec<BisectCandidate>,
}

impl BisectionMatrix {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BisectCandidate> {
        self.candidates.iter()
    }

    pub fn candidates(&self) -> &[BisectCandidate] {
        &self.candidates
    }
}

impl<'a> IntoIterator for &'a BisectionMatrix {
    type Item = &'a BisectCandidate;
    type IntoIter = std::slice::Iter<'a, BisectCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

fn current_incidents(
    changes: &ChangeSet,
    job: &JobRecord,
    rule: &EligibleKeyRule,
) -> BTreeMap<String, IncidentSet> {
    let mut current = job
        .settings
        .keys()
        .filter(|key| rule.is_eligible(key))
        .map(|key| (key.clone(), job.setting_incidents(key)))
        .collect::<BTreeMap<_, _>>();
    for (key, change) in changes.iter() {
        current
            .entry(key.clone())
            .or_insert_with(|| change.added.clone());
    }
    current
}

fn bisection_incidents(
    changes: &ChangeSet,
    current: &BTreeMap<String, IncidentSet>,
    job: &JobRecord,
    rule: &EligibleKeyRule,
) -> BTreeMap<String, IncidentSet> {
    let mut selected = BTreeMap::new();
    for (key, change) in changes.iter() {
        let mut incidents = change.net_new();
        if job.settings.contains_key(key) {
            if let Some(values) = current.get(key) {
                incidents.retain(|incident| values.contains(incident));
            }
        }
        selected.insert(key.clone(), incidents);
    }
    for (key, values) in current {
        if !changes.contains_key(key) && values.len() > 1 {
            selected.insert(key.clone(), values.clone());
        }
    }

    let superseded = selected
        .keys()
        .filter(|key| rule.is_superseded(key, selected.keys()))
        .cloned()
        .collect::<Vec<_>>();
    for key in superseded {
        selected.remove(&key);
    }
    selected
}

fn without(values: &IncidentSet, incident: Incident) -> String {
    join_incidents(values.iter().filter(|value| **value != incident))
}

/// Derive the ordered leave-one-out candidates for `job`.
pub fn generate_bisection_matrix(
    changes: &ChangeSet,
    job: &JobRecord,
    origin: &JobUrl,
    rule: &EligibleKeyRule,
) -> BisectionMatrix {
    let current = current_incidents(changes, job, rule);
    let in_play = current.values().flatten().copied().collect::<IncidentSet>();
    let selected = bisection_incidents(changes, &current, job, rule);

    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    for (key, incidents) in &selected {
        for incident in incidents {
            if !seen.insert(*incident) {
                continue;
            }
            let primary = current.get(key).cloned().unwrap_or_default();
            let mut overlay = vec![(key.clone(), without(&primary, *incident))];
            overlay.extend(
                current
                    .iter()
                    .filter(|(other, values)| *other != key && values.contains(incident))
                    .map(|(other, values)| (other.clone(), without(values, *incident))),
            );
            let test_name = format!(
                "{}{INVESTIGATE_TEST_MARKER}{BISECT_NAME_PREFIX}{incident}",
                job.test
            );
            overlay.push((COMMON_ISSUES_KEY.to_string(), without(&in_play, *incident)));
            overlay.push((TEST_SETTING.to_string(), test_name.clone()));
            overlay.push((INVESTIGATE_ORIGIN_SETTING.to_string(), origin.to_string()));
            overlay.push((MAINT_TEST_REPO_SETTING.to_string(), String::new()));
            candidates.push(BisectCandidate {
                key: key.clone(),
                incident: *incident,
                test_name,
                overlay,
            });
        }
    }
    BisectionMatrix { candidates }
}
