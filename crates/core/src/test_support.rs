// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::activity::ActivitySample;

/// Proptest strategies for checkpointed state.
pub mod strategies {
    use crate::job::{HealPhase, JobId, JobState, ListRef, SearchFilters};
    use proptest::prelude::*;

    pub fn arb_heal_phase() -> impl Strategy<Value = HealPhase> {
        prop_oneof![
            Just(HealPhase::None),
            Just(HealPhase::Enumeration),
            Just(HealPhase::ItemAnalysis),
        ]
    }

    pub fn arb_filters() -> impl Strategy<Value = SearchFilters> {
        ("[A-Za-z0-9 ]{1,24}", any::<Option<String>>(), any::<Option<String>>())
            .prop_map(|(target, role, location)| SearchFilters { target, role, location })
    }

    fn arb_list_ref() -> impl Strategy<Value = Option<ListRef>> {
        proptest::option::of("lst-[a-z0-9]{4,12}".prop_map(ListRef::from))
    }

    pub fn arb_job_state() -> impl Strategy<Value = JobState> {
        (
            ("job-[a-zA-Z0-9_-]{4,19}", arb_filters(), "\\PC{0,16}"),
            (any::<u16>(), any::<u8>(), any::<Option<String>>(), any::<Option<String>>()),
            (arb_heal_phase(), any::<Option<String>>(), arb_list_ref(), arb_list_ref()),
            any::<u64>(),
        )
            .prop_map(
                |(
                    (id, filters, credentials_ref),
                    (resume_index, recursion_count, entity, location),
                    (heal_phase, heal_reason, partial_list_ref, enumeration_ref),
                    created_at_ms,
                )| JobState {
                    id: JobId::from(id),
                    filters,
                    credentials_ref,
                    resume_index: resume_index as usize,
                    recursion_count: recursion_count as u32,
                    extracted_entity_id: entity,
                    extracted_location_id: location,
                    heal_phase,
                    heal_reason,
                    partial_list_ref,
                    enumeration_ref,
                    created_at_ms,
                },
            )
    }
}

/// Build samples from `(hour, day, week)` tuples.
pub fn samples(counts: &[(u32, u32, u32)]) -> Vec<ActivitySample> {
    counts.iter().map(|&(hour, day, week)| ActivitySample::new(hour, day, week)).collect()
}
