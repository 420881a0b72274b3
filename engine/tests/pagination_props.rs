//! Property tests for the find_many pipeline.

use proptest::prelude::*;
use schoolhub_engine::{ManualClock, QueryOptions, SortOrder, Store};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

fn store_with(rows: &[(u8, String)]) -> Store {
    let mut store = Store::with_clock(Arc::new(ManualClock::new(0)));
    for (grade, name) in rows {
        store
            .create("students", json!({"grade": grade, "name": name}))
            .unwrap();
    }
    store
}

fn sort_order() -> impl Strategy<Value = SortOrder> {
    prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)]
}

proptest! {
    #[test]
    fn pages_concatenate_to_the_full_result(
        rows in prop::collection::vec((0u8..5, "[a-c]{0,3}"), 0..60),
        limit in 1usize..12,
        order in sort_order(),
        grade in prop::option::of(0u8..5),
    ) {
        let store = store_with(&rows);

        let mut base = QueryOptions::new().sort_by("name", order);
        if let Some(grade) = grade {
            base = base.filter("grade", json!(grade));
        }

        let everything = store.find_many("students", &base.clone().paginate(1, usize::MAX));
        let total_pages = store.find_many("students", &base.clone().paginate(1, limit))
            .pagination
            .total_pages;

        let mut concatenated = Vec::new();
        for page in 1..=total_pages {
            let result = store.find_many("students", &base.clone().paginate(page, limit));
            prop_assert_eq!(result.pagination.has_prev, page > 1);
            prop_assert_eq!(result.pagination.has_next, page < total_pages);
            concatenated.extend(result.records);
        }

        prop_assert_eq!(&concatenated, &everything.records);

        let unique: HashSet<_> = concatenated.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(unique.len(), concatenated.len());
        prop_assert_eq!(concatenated.len(), everything.pagination.total);
    }

    #[test]
    fn descending_is_reverse_of_ascending_up_to_ties(
        rows in prop::collection::vec((0u8..4, "[a-b]{1,2}"), 0..40),
    ) {
        let store = store_with(&rows);
        let all = |order| {
            store
                .find_many("students", &QueryOptions::new().sort_by("grade", order).paginate(1, usize::MAX))
                .records
                .iter()
                .map(|r| r.fields["grade"].as_u64().unwrap())
                .collect::<Vec<_>>()
        };

        let mut asc = all(SortOrder::Asc);
        let desc = all(SortOrder::Desc);
        asc.reverse();
        prop_assert_eq!(asc, desc);
    }
}
