#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sql_persistor::prelude::*;

pub type Table = (Vec<String>, Vec<Vec<RowValues>>);
pub type Responder = Arc<dyn Fn(&str) -> Result<Table, PersistorError> + Send + Sync>;

pub const COHORT: &str = "
with cohort as (
    select cast(null as int) as id
    {cohort}
)
select id from cohort where id is not null";

/// Shared, ordered record of everything the stubs were asked to do.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Statements executed, in order.
    pub fn executions(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("execute: ").map(str::to_string))
            .collect()
    }

    /// Transaction events (`cursor`, `commit`, `rollback`, `close`), in order.
    pub fn events(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| !e.starts_with("execute: "))
            .collect()
    }
}

/// Naive literal quoting, good enough for the stubs.
pub fn quote_literal(value: &RowValues) -> Result<String, PersistorError> {
    Ok(match value {
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Text(s) => format!("'{}'", s.replace('\'', "''")),
        RowValues::Bool(b) => (if *b { "true" } else { "false" }).to_string(),
        RowValues::Null => "NULL".to_string(),
        RowValues::Timestamp(ts) => format!("'{}'", ts.format("%F %T")),
        RowValues::JSON(j) => format!("'{}'", j.to_string().replace('\'', "''")),
        RowValues::Blob(_) => {
            return Err(PersistorError::ParameterError(
                "stub cursor cannot quote blobs".into(),
            ));
        }
    })
}

fn ids(column: &str, values: &[i64]) -> Table {
    (
        vec![column.to_string()],
        values.iter().map(|v| vec![RowValues::Int(*v)]).collect(),
    )
}

/// Rendered statements the stubs know how to answer.
pub fn lookup() -> BTreeMap<String, Table> {
    let mut d = BTreeMap::new();
    for column in ["a", "b", "c", "d", "extant"] {
        d.insert(format!("select 1 as {column}"), ids(column, &[1]));
    }
    d.insert(
        "
with cohort as (
    select cast(null as int) as id
    union all select 0
    union all select 1
    union all select 2
)
select id from cohort where id is not null"
            .to_string(),
        ids("id", &[0, 1, 2]),
    );
    for id in 0..3 {
        d.insert(
            format!(
                "
with cohort as (
    select cast(null as int) as id
    union all select {id}
)
select id from cohort where id is not null"
            ),
            ids("id", &[id]),
        );
    }
    d.insert(COHORT.replace("{cohort}", ""), ids("id", &[]));
    d
}

/// Answer from [`lookup`]; anything else is an execution error.
pub fn lookup_responder() -> Responder {
    let table = lookup();
    Arc::new(move |sql: &str| {
        table
            .get(sql)
            .cloned()
            .ok_or_else(|| PersistorError::ExecutionError(format!("unexpected query: {sql}")))
    })
}

/// Any statement containing `broken` fails; everything else returns no rows.
pub fn fragment_responder() -> Responder {
    Arc::new(|sql: &str| -> Result<Table, PersistorError> {
        if sql.contains("broken") {
            Err(PersistorError::ExecutionError(format!("syntax error near {sql}")))
        } else {
            Ok((vec!["ok".to_string()], Vec::new()))
        }
    })
}

pub struct StubCursor {
    journal: Journal,
    responder: Responder,
    description: Option<Vec<String>>,
    rows: Vec<Vec<RowValues>>,
}

impl StubCursor {
    pub fn new(journal: Journal, responder: Responder) -> Self {
        Self {
            journal,
            responder,
            description: None,
            rows: Vec::new(),
        }
    }
}

impl Cursor for StubCursor {
    fn execute(&mut self, sql: &str) -> Result<(), PersistorError> {
        self.journal.push(format!("execute: {sql}"));
        let (columns, rows) = (self.responder)(sql)?;
        self.description = Some(columns);
        self.rows = rows;
        Ok(())
    }

    fn description(&self) -> Option<&[String]> {
        self.description.as_deref()
    }

    fn fetchall(&mut self) -> Result<Vec<Vec<RowValues>>, PersistorError> {
        Ok(std::mem::take(&mut self.rows))
    }

    fn quote(&self, value: &RowValues) -> Result<String, PersistorError> {
        quote_literal(value)
    }
}

pub struct StubConnection {
    journal: Journal,
    responder: Responder,
}

impl Connection for StubConnection {
    fn cursor(&mut self) -> Result<Box<dyn Cursor + '_>, PersistorError> {
        self.journal.push("cursor");
        Ok(Box::new(StubCursor::new(
            self.journal.clone(),
            Arc::clone(&self.responder),
        )))
    }

    fn commit(&mut self) -> Result<(), PersistorError> {
        self.journal.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), PersistorError> {
        self.journal.push("rollback");
        Ok(())
    }

    fn close(self) -> Result<(), PersistorError> {
        self.journal.push("close");
        Ok(())
    }
}

/// Connector that refuses the first `failures` attempts.
pub struct StubConnector {
    pub journal: Journal,
    responder: Responder,
    failures: usize,
    attempts: AtomicUsize,
}

impl StubConnector {
    pub fn new(responder: Responder) -> Self {
        Self::failing(responder, 0)
    }

    pub fn failing(responder: Responder, failures: usize) -> Self {
        Self {
            journal: Journal::default(),
            responder,
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for StubConnector {
    type Connection = StubConnection;

    fn connect(&self) -> Result<StubConnection, PersistorError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(PersistorError::ConnectionError(format!(
                "connection refused (attempt {attempt})"
            )));
        }
        self.journal.push("connect");
        Ok(StubConnection {
            journal: self.journal.clone(),
            responder: Arc::clone(&self.responder),
        })
    }
}

pub fn stub_cursor(responder: Responder) -> (StubCursor, Journal) {
    let journal = Journal::default();
    (StubCursor::new(journal.clone(), responder), journal)
}

pub fn cohort_keys(ids: impl IntoIterator<Item = i64>) -> Keys {
    Keys::from([("cohort".to_string(), ids.into_iter().collect::<KeySet>())])
}

pub fn int_column(result: &ResultSet, name: &str) -> Vec<i64> {
    result
        .column(name)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_int().copied())
        .collect()
}
