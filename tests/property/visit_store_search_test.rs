//! Property-based tests for VisitStore search.
//!
//! Recording a visit and then searching by its title always finds it, for
//! arbitrary URLs and titles.

use chrono::Utc;
use proptest::prelude::*;

use history_aggregator::database::Database;
use history_aggregator::managers::visit_store::{VisitStore, VisitStoreTrait};

/// Strategy for generating valid URL strings.
fn arb_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-z][a-z0-9]{2,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net"), Just(".io")],
        proptest::option::of("/[a-z0-9]{1,10}"),
    )
        .prop_map(|(scheme, host, tld, path)| {
            format!("{}://{}{}{}", scheme, host, tld, path.unwrap_or_default())
        })
}

/// Titles including LIKE wildcards, which must match literally.
fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 %_]{1,30}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn record_then_search_by_title_finds_visit(url in arb_url(), title in arb_title()) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let mut store = VisitStore::new(db.connection());

        store
            .record_visit(&url, Some(&title), Utc::now())
            .expect("record_visit should succeed for valid inputs");

        let results = store.search(&title, 10).expect("search should succeed");

        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(results[0].url(), url.as_str());
        prop_assert_eq!(results[0].title(), Some(title.as_str()));
    }
}
