mod common;

use common::{StubConnector, fragment_responder};
use sql_persistor::prelude::*;

fn fragments() -> AssetTree {
    let mut tree = AssetTree::new();
    tree.insert("a", "select 1 as a where %(dry_run)s = 1")
        .insert("b", "select broken from nowhere")
        .insert("c", "insert into c select id from ({cohort}) k where %(dry_run)s = 0");
    tree
}

fn persistor(sql: AssetTree) -> Persistor<StubConnector> {
    Persistor::new(StubConnector::new(fragment_responder()), sql).with_sleep(|_| {})
}

#[test]
fn dry_run_names_every_failing_fragment() {
    let persistor = persistor(fragments());
    let err = persistor
        .dry_run(&Parameters::new(), &[ErrorKind::Execution])
        .unwrap_err();

    let PersistorError::DryRunError(failures) = &err else {
        panic!("expected a dry run error, got {err}");
    };
    let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["b"]);
    assert_eq!(err.to_string(), "Dry run failed for b");

    let executions = persistor.connector().journal.executions();
    assert_eq!(
        executions,
        [
            "select 1 as a where 1 = 1",
            "select broken from nowhere",
            "insert into c select id from () k where 1 = 0",
        ]
    );
}

#[test]
fn each_fragment_runs_under_its_own_rollback() -> Result<(), PersistorError> {
    let mut tree = AssetTree::new();
    tree.insert("a", "select 1").insert("c", "select 2");
    let persistor = persistor(tree);
    persistor.dry_run(&Parameters::new(), &[ErrorKind::Execution])?;
    assert_eq!(
        persistor.connector().journal.events(),
        [
            "connect", "cursor", "rollback", "close", "connect", "cursor", "rollback", "close",
        ]
    );
    Ok(())
}

#[test]
fn unexpected_failures_abort_the_walk() {
    let persistor = persistor(fragments());
    let err = persistor
        .dry_run(&Parameters::new(), &[ErrorKind::Template])
        .unwrap_err();
    assert!(matches!(err, PersistorError::ExecutionError(_)));
    assert_eq!(persistor.connector().journal.executions().len(), 2);
}

#[test]
fn caller_dry_run_value_is_overridden() -> Result<(), PersistorError> {
    let persistor = persistor(AssetTree::new());
    let parameters = Parameters::from([("dry_run".to_string(), RowValues::Int(0))]);
    persistor.dry_run_query("delete from t where %(dry_run)s = 0", &parameters)?;
    assert_eq!(
        persistor.connector().journal.executions(),
        ["delete from t where 1 = 0"]
    );
    Ok(())
}

#[test]
fn extant_validates_and_formats_table_names() -> Result<(), PersistorError> {
    let mut tree = AssetTree::new();
    tree.insert("extant", "select 1 from {table} limit 0");
    let persistor = persistor(tree);

    assert_eq!(persistor.extant("public.runs")?, "select 1 from public.runs limit 0");
    let err = persistor.extant("runs; drop table runs").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Template);
    assert!(err.to_string().contains("Not a sql identifier"));
    Ok(())
}

#[test]
fn extant_requires_the_fragment() {
    let err = persistor(AssetTree::new()).extant("runs").unwrap_err();
    assert!(matches!(err, PersistorError::TemplateError(_)));
}

#[test]
fn check_reports_all_missing_tables() {
    let mut tree = AssetTree::new();
    tree.insert("extant", "select 1 from {table} limit 0");
    let persistor = persistor(tree);

    let err = persistor
        .check(
            &["runs", "broken_predictions", "broken_features"],
            &[ErrorKind::Execution],
        )
        .unwrap_err();
    let PersistorError::MissingTables(tables) = &err else {
        panic!("expected missing tables, got {err}");
    };
    assert_eq!(tables, &["broken_predictions", "broken_features"]);
    assert_eq!(persistor.connector().journal.executions().len(), 3);
}
