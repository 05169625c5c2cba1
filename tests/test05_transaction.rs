mod common;

use std::panic::{AssertUnwindSafe, catch_unwind};

use common::{StubConnector, lookup_responder};
use sql_persistor::prelude::*;

fn persistor() -> Persistor<StubConnector> {
    Persistor::new(StubConnector::new(lookup_responder()), AssetTree::new()).with_sleep(|_| {})
}

#[test]
fn commit_scope_commits_then_closes() -> Result<(), PersistorError> {
    let persistor = persistor();
    let result = persistor.commit(|cur| execute_query(cur, "select 1 as a"))?;
    assert_eq!(result.len(), 1);
    assert_eq!(
        persistor.connector().journal.events(),
        ["connect", "cursor", "commit", "close"]
    );
    Ok(())
}

#[test]
fn commit_scope_rolls_back_and_returns_original_error() {
    let persistor = persistor();
    let err = persistor
        .commit(|cur| {
            execute_rendered(cur, "select 1 as a")?;
            execute_rendered(cur, "insert into missing values (1)")
        })
        .unwrap_err();
    assert!(
        matches!(err, PersistorError::ExecutionError(ref m) if m.contains("insert into missing"))
    );
    assert_eq!(
        persistor.connector().journal.events(),
        ["connect", "cursor", "rollback", "close"]
    );
}

#[test]
fn rollback_scope_always_rolls_back() -> Result<(), PersistorError> {
    let persistor = persistor();
    persistor.rollback(|cur| execute_rendered(cur, "select 1 as b"))?;
    let err = persistor
        .rollback(|cur| execute_rendered(cur, "drop table nothing"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(
        persistor.connector().journal.events(),
        [
            "connect", "cursor", "rollback", "close", "connect", "cursor", "rollback", "close",
        ]
    );
    Ok(())
}

#[test]
fn panic_inside_scope_still_releases_connection() {
    let persistor = persistor();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        persistor.commit(|_cur| -> Result<(), PersistorError> { panic!("caller bug") })
    }));
    assert!(outcome.is_err());
    assert_eq!(
        persistor.connector().journal.events(),
        ["connect", "cursor", "rollback", "close"]
    );
}

#[test]
fn query_builder_from_persistor_uses_its_cache() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let options = PersistorOptions::builder()
        .cache_dir(dir.path())
        .chunk_size(1)
        .finish()?;
    let persistor = Persistor::with_options(
        StubConnector::new(lookup_responder()),
        AssetTree::new(),
        options,
    )?;
    let keys = common::cohort_keys([0, 1, 2]);

    for _ in 0..2 {
        let ids = persistor.rollback(|cur| {
            persistor
                .query(cur, common::COHORT)
                .keys(&keys)
                .by("cohort")
                .select()
        })?;
        assert_eq!(common::int_column(&ids, "id"), vec![0, 1, 2]);
    }
    let executed = persistor
        .connector()
        .journal
        .entries()
        .iter()
        .filter(|e| e.starts_with("execute: "))
        .count();
    assert_eq!(executed, 3);
    Ok(())
}
