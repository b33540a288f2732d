//! Property-based tests for AttachmentCoordinator.
//!
//! Random sequences of gallery edits, each saved directly or inside a
//! transaction that commits or rolls back, must never leave orphaned or
//! dangling files behind.

use std::collections::HashSet;

use bytes::Bytes;
use proptest::prelude::*;

use super::*;
use crate::attachment::{Attachment, ColumnValue};
use crate::storage::StorageService;
use crate::transaction::TransactionContext;

const GALLERY: &str = "gallery";

/// How one save is resolved.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Direct,
    Commit,
    Rollback,
}

#[derive(Debug, Clone)]
struct Edit {
    keep_mask: u8,
    fresh: usize,
    outcome: Outcome,
}

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Direct),
        Just(Outcome::Commit),
        Just(Outcome::Rollback),
    ]
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    (any::<u8>(), 0..3_usize, arb_outcome()).prop_map(|(keep_mask, fresh, outcome)| Edit {
        keep_mask,
        fresh,
        outcome,
    })
}

async fn apply(
    coordinator: &AttachmentCoordinator<StorageService>,
    tracker: &AttachmentTracker,
    edit: &Edit,
    seen: &mut HashSet<String>,
) {
    let durable = tracker.durable(GALLERY);
    let mut next: Vec<Attachment> = durable
        .attachments()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < 8 && edit.keep_mask & (1 << i) != 0)
        .map(|(_, a)| a.clone())
        .collect();
    for n in 0..edit.fresh {
        next.push(Attachment::from_bytes(
            Bytes::from(vec![1_u8; n + 1]),
            "photo.jpg",
        ));
    }
    seen.extend(next.iter().map(|a| a.name().to_string()));
    tracker.set_new(GALLERY, ColumnValue::from(next));

    coordinator
        .before_save(tracker)
        .await
        .expect("memory store accepts writes");

    match edit.outcome {
        Outcome::Direct => coordinator.after_save(tracker, None).await,
        Outcome::Commit | Outcome::Rollback => {
            let tx = TransactionContext::new();
            coordinator.after_save(tracker, Some(&tx)).await;
            if matches!(edit.outcome, Outcome::Commit) {
                tx.commit().await;
            } else {
                tx.rollback().await;
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After every resolved save the store holds exactly the durable files.
    #[test]
    fn prop_store_matches_durable_value(edits in prop::collection::vec(arb_edit(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        runtime.block_on(async {
            let store = Arc::new(StorageService::memory().expect("memory store"));
            let coordinator =
                AttachmentCoordinator::new(Arc::clone(&store), vec![AttachmentColumn::multiple(GALLERY)]);
            let tracker = AttachmentTracker::new();
            tracker.capture(GALLERY, ColumnValue::Empty);
            let mut seen = HashSet::new();

            for edit in &edits {
                apply(&coordinator, &tracker, edit, &mut seen).await;

                let durable: HashSet<String> =
                    tracker.durable(GALLERY).names().into_iter().collect();
                for name in &seen {
                    prop_assert_eq!(
                        store.exists(name).await,
                        durable.contains(name),
                        "file {} after {:?}",
                        name,
                        edit.outcome
                    );
                }
                prop_assert!(!tracker.is_dirty());
            }
            Ok(())
        })?;
    }
}
