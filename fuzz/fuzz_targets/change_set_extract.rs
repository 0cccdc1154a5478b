#![no_main]

use std::collections::BTreeMap;

use libfuzzer_sys::fuzz_target;
use openqa_bisect_core::{
    extract_change_set, generate_bisection_matrix, EligibleKeyRule, JobRecord, JobUrl,
};

fuzz_target!(|data: &[u8]| {
    let diff = String::from_utf8_lossy(data);
    let rule = EligibleKeyRule::default();
    let changes = extract_change_set(&diff, &rule);
    assert!(changes.iter().all(|(key, _)| rule.is_eligible(key)));

    let settings = changes
        .iter()
        .map(|(key, change)| {
            let value = change
                .added
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            (key.clone(), value)
        })
        .collect::<BTreeMap<_, _>>();
    let job = JobRecord {
        id: 1,
        test: "fuzz".to_string(),
        group: None,
        result: Some("failed".to_string()),
        priority: 50,
        clone_id: None,
        parents: BTreeMap::new(),
        settings,
    };
    let Ok(origin) = JobUrl::parse("https://openqa.example/tests/1") else {
        return;
    };
    let matrix = generate_bisection_matrix(&changes, &job, &origin, &rule);
    assert!(matrix.len() <= changes.net_new_incidents().len());
});
