//! Property-based tests for interning.
//!
//! Uses proptest to generate definition streams and verify the store's
//! invariants hold.

use perfdefs_core::definitions::{GroupDef, RegionDef, StringDef};
use perfdefs_core::prelude::*;
use perfdefs_core::paths::simplify_path;
use proptest::prelude::*;
use std::collections::HashMap;

/// Short strings from a small alphabet, so duplicates are common.
fn name() -> impl Strategy<Value = String> {
    "[a-c]{0,3}"
}

/// Strategy for the identity fields of a region.
fn region_fields() -> impl Strategy<Value = (String, u32, u32, bool)> {
    (name(), 0u32..3, 0u32..3, any::<bool>())
}

fn define_region(definitions: &Definitions, fields: &(String, u32, u32, bool)) -> RegionHandle {
    let (name, begin_line, length, user) = fields;
    let paradigm = if *user {
        ParadigmType::User
    } else {
        ParadigmType::Compiler
    };
    definitions
        .new_region(
            Some(name),
            None,
            Handle::INVALID,
            *begin_line,
            begin_line + length,
            paradigm,
            RegionType::Function,
        )
        .unwrap()
}

fn manager() -> Definitions {
    Definitions::new(DefinitionsConfig::default()).unwrap()
}

proptest! {
    /// Equal field tuples intern to one handle, distinct ones to distinct handles
    #[test]
    fn region_dedup_is_idempotent(regions in prop::collection::vec(region_fields(), 1..40)) {
        let definitions = manager();
        let mut seen: HashMap<(String, u32, u32, bool), RegionHandle> = HashMap::new();
        for fields in &regions {
            let handle = define_region(&definitions, fields);
            let first = *seen.entry(fields.clone()).or_insert(handle);
            prop_assert_eq!(handle, first);
        }
        prop_assert_eq!(definitions.lock().count::<RegionDef>() as usize, seen.len());
    }

    /// Equal definitions always share a hash value
    #[test]
    fn equal_groups_hash_equal(
        members in prop::collection::vec(0u32..4, 0..6),
        group_name in name(),
    ) {
        let definitions = manager();
        let wide: Vec<u64> = members.iter().map(|&member| u64::from(member)).collect();
        let narrow = definitions
            .new_group_from_32(GroupType::Locations, Some(&group_name), &members)
            .unwrap();
        let native = definitions
            .new_group(GroupType::Locations, Some(&group_name), &wide)
            .unwrap();
        let other = definitions
            .new_group(GroupType::Metrics, Some(&group_name), &wide)
            .unwrap();

        let local = definitions.lock();
        prop_assert_eq!(narrow, native);
        prop_assert_eq!(local.hash_value(narrow), local.hash_value(native));
        prop_assert_ne!(narrow, other);
        prop_assert_eq!(local.count::<GroupDef>(), 2);
    }

    /// Rejected duplicates leave no trace in the arena
    #[test]
    fn rollback_releases_duplicates(names in prop::collection::vec(name(), 0..60)) {
        let noisy = manager();
        for value in &names {
            noisy.new_string(value).unwrap();
        }

        let clean = manager();
        let mut unique: Vec<&String> = Vec::new();
        for value in &names {
            if !unique.contains(&value) {
                unique.push(value);
                clean.new_string(value).unwrap();
            }
        }

        let noisy = noisy.lock();
        let clean = clean.lock();
        prop_assert_eq!(noisy.used_bytes(), clean.used_bytes());
        prop_assert_eq!(
            noisy.stats().live_allocations(),
            clean.stats().live_allocations()
        );
        prop_assert_eq!(
            noisy.stats().rollbacks - clean.stats().rollbacks,
            (names.len() - unique.len()) as u64
        );
    }

    /// Creation order is first-construction order with increasing sequence numbers
    #[test]
    fn iteration_follows_first_construction(names in prop::collection::vec(name(), 0..60)) {
        let definitions = manager();
        let mut first_seen: Vec<StringHandle> = vec![definitions.new_string("").unwrap()];
        for value in &names {
            let handle = definitions.new_string(value).unwrap();
            if !first_seen.contains(&handle) {
                first_seen.push(handle);
            }
        }

        let local = definitions.lock();
        let walked: Vec<(StringHandle, u32)> = local
            .iter::<StringDef>()
            .map(|(handle, _)| (handle, local.sequence_number(handle)))
            .collect();
        let handles: Vec<StringHandle> = walked.iter().map(|&(handle, _)| handle).collect();
        prop_assert_eq!(handles, first_seen);
        for (index, &(_, sequence_number)) in walked.iter().enumerate() {
            prop_assert_eq!(sequence_number as usize, index);
        }
    }

    /// Interned paths read back in simplified form
    #[test]
    fn paths_round_trip(segments in prop::collection::vec("[a-b]{1,2}|\\.|\\.\\.", 1..6)) {
        let definitions = manager();
        let path = format!("/{}", segments.join("/"));
        let first = definitions.new_string_path(&path).unwrap();
        let second = definitions.new_string_path(&path).unwrap();
        prop_assert_eq!(first, second);
        let expected = simplify_path(&path);
        prop_assert_eq!(&*definitions.string(first), expected.as_str());
    }
}
