//! Reconciliation engine
//!
//! Decides insert vs replace for each record from identifier membership,
//! issues the call and classifies the result. A failed call becomes a skip for
//! that record and never stops the batch; retries belong to the facade.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use relay_common::types::NamingPolicy;
use tracing::{debug, instrument, warn};

use super::mapper::CustomerRecord;
use super::report::KeyedOutcome;
use crate::clients::ObjectStore;

/// Where reconciled documents are written
#[derive(Debug, Clone, Copy)]
pub struct ReconcileTarget<'a> {
    pub db: &'a str,
    pub collection: &'a str,
    pub naming: NamingPolicy,
}

/// Reconcile one record against the identifier snapshot
pub async fn reconcile_record(
    object_store: &dyn ObjectStore,
    target: ReconcileTarget<'_>,
    existing: &HashSet<String>,
    key: String,
    record: CustomerRecord,
) -> KeyedOutcome {
    let document = record.to_document(target.naming);

    if existing.contains(&record.id) {
        match object_store
            .replace(target.db, target.collection, &record.id, &document)
            .await
        {
            Ok(_) => KeyedOutcome::updated(key),
            Err(err) => {
                warn!(id = %record.id, error = %err, "Replace failed, skipping record");
                KeyedOutcome::skipped(key, format!("replace failed: {err}"))
            },
        }
    } else {
        match object_store
            .insert(target.db, target.collection, &record.id, &document)
            .await
        {
            Ok(_) => KeyedOutcome::inserted(key),
            Err(err) => {
                warn!(id = %record.id, error = %err, "Insert failed, skipping record");
                KeyedOutcome::skipped(key, format!("insert failed: {err}"))
            },
        }
    }
}

/// Reconcile a batch, at most `concurrency` calls in flight.
///
/// Outcomes come back in input order. With `concurrency` 1 each call is
/// awaited before the next one is issued.
#[instrument(skip_all, fields(records = records.len(), concurrency = concurrency))]
pub async fn reconcile_all(
    object_store: &dyn ObjectStore,
    target: ReconcileTarget<'_>,
    existing: &HashSet<String>,
    records: Vec<(String, CustomerRecord)>,
    concurrency: usize,
) -> Vec<KeyedOutcome> {
    let outcomes: Vec<KeyedOutcome> = stream::iter(records)
        .map(|(key, record)| reconcile_record(object_store, target, existing, key, record))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    debug!(outcomes = outcomes.len(), "Reconciliation finished");
    outcomes
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::clients::RemoteError;
    use crate::import::report::{ImportStatus, RecordOutcome};
    use crate::import::testing::{FakeObjectStore, StoreCall};

    fn record(id: &str) -> (String, CustomerRecord) {
        (
            id.to_string(),
            CustomerRecord {
                id: id.to_string(),
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                age: Some(24),
                street_address: "1234 Main St".to_string(),
            },
        )
    }

    fn target() -> ReconcileTarget<'static> {
        ReconcileTarget {
            db: "crm",
            collection: "customers",
            naming: NamingPolicy::CamelCase,
        }
    }

    #[tokio::test]
    async fn test_membership_decides_insert_or_replace() {
        let store = FakeObjectStore::default();
        let existing = HashSet::from(["1".to_string()]);

        let outcomes =
            reconcile_all(&store, target(), &existing, vec![record("1"), record("2")], 1).await;

        assert_eq!(outcomes[0], KeyedOutcome::updated("1"));
        assert_eq!(outcomes[1], KeyedOutcome::inserted("2"));
        assert_eq!(
            store.calls(),
            vec![StoreCall::Replace("1".into()), StoreCall::Insert("2".into())]
        );
    }

    #[tokio::test]
    async fn test_remote_failure_skips_only_that_record() {
        let store = FakeObjectStore::default().failing_on(
            "2",
            RemoteError::Status {
                service: "object-store".into(),
                status: 409,
                detail: "document exists".into(),
            },
        );

        let outcomes = reconcile_all(
            &store,
            target(),
            &HashSet::new(),
            vec![record("1"), record("2"), record("3")],
            1,
        )
        .await;

        assert_eq!(outcomes[0].outcome, RecordOutcome::Imported(ImportStatus::Inserted));
        match &outcomes[1].outcome {
            RecordOutcome::Skipped(reason) => {
                assert!(reason.contains("409"));
                assert!(reason.contains("document exists"));
            },
            other => panic!("expected skip, got {other:?}"),
        }
        assert_eq!(outcomes[2].outcome, RecordOutcome::Imported(ImportStatus::Inserted));
    }

    #[tokio::test]
    async fn test_open_circuit_is_an_ordinary_skip() {
        let store = FakeObjectStore::default().failing_on(
            "1",
            RemoteError::CircuitOpen {
                service: "object-store".into(),
            },
        );

        let outcomes = reconcile_all(&store, target(), &HashSet::new(), vec![record("1")], 1).await;

        assert!(matches!(
            &outcomes[0].outcome,
            RecordOutcome::Skipped(reason) if reason.contains("circuit breaker is open")
        ));
    }

    #[tokio::test]
    async fn test_worker_pool_keeps_input_order() {
        let store = FakeObjectStore::default();
        let existing = HashSet::from(["3".to_string()]);
        let records: Vec<_> = (1..=8).map(|i| record(&i.to_string())).collect();

        let sequential = reconcile_all(&store, target(), &existing, records.clone(), 1).await;
        let pooled = reconcile_all(&store, target(), &existing, records, 4).await;

        assert_eq!(sequential, pooled);
        assert_eq!(pooled[2], KeyedOutcome::updated("3"));
    }
}
