//! In-memory driver used by the unit tests. Every call is recorded so tests can
//! check ordering and that teardown ran exactly once.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    backend::{Backend, Connection, ConnectionUrl, Cursor, Engine, Execution, Field, Statement},
    error::{ConfigurationError, ExecutionError},
    options::{ExecutionOptions, Options},
};

#[derive(Default, Clone)]
pub(crate) struct Events(Rc<RefCell<Vec<String>>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub(crate) fn all(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == event).count()
    }
}

#[derive(Clone)]
pub(crate) enum FakeResult {
    NoRows,
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Field>>,
        /// Fail instead of producing the row at this index.
        fail_at: Option<usize>,
    },
    FailOnExecute,
}

impl FakeResult {
    pub(crate) fn rows(columns: &[&str], rows: Vec<Vec<Field>>) -> Self {
        FakeResult::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            fail_at: None,
        }
    }
}

#[derive(Clone)]
pub(crate) struct FakeBackend {
    pub(crate) events: Events,
    pub(crate) result: FakeResult,
    pub(crate) missing: bool,
    /// Rows handed out by cursors so far.
    pub(crate) fetched: Rc<Cell<usize>>,
}

impl FakeBackend {
    pub(crate) fn new(result: FakeResult) -> Self {
        Self {
            events: Events::default(),
            result,
            missing: false,
            fetched: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn missing() -> Self {
        Self {
            missing: true,
            ..Self::new(FakeResult::NoRows)
        }
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn create_engine(
        &self,
        _: &ConnectionUrl,
        options: &Options,
    ) -> Result<Box<dyn Engine>, ConfigurationError> {
        if self.missing {
            return Err(ConfigurationError::MissingBackend {
                dialect: "fake".to_string(),
                guidance: "install the fake driver".to_string(),
            });
        }
        self.events
            .push(format!("create_engine:{}", options.len()));
        Ok(Box::new(self.clone()))
    }
}

impl Engine for FakeBackend {
    fn connect(&self) -> Result<Box<dyn Connection + '_>, ExecutionError> {
        self.events.push("connect");
        Ok(Box::new(FakeConnection {
            backend: self.clone(),
        }))
    }

    fn dispose(&mut self) {
        self.events.push("dispose");
    }
}

struct FakeConnection {
    backend: FakeBackend,
}

impl Connection for FakeConnection {
    fn apply_execution_options(
        &mut self,
        options: &ExecutionOptions,
    ) -> Result<(), ExecutionError> {
        self.backend.events.push(format!(
            "options:no_parameters={},stream_results={}",
            options.no_parameters, options.stream_results
        ));
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, ExecutionError> {
        self.backend.events.push(format!("prepare:{}", sql));
        Ok(Box::new(FakeStatement {
            backend: &self.backend,
        }))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        self.backend.events.push("close");
        Ok(())
    }
}

struct FakeStatement<'c> {
    backend: &'c FakeBackend,
}

impl Statement for FakeStatement<'_> {
    fn execute(&mut self) -> Result<Execution<'_>, ExecutionError> {
        self.backend.events.push("execute");
        match &self.backend.result {
            FakeResult::NoRows => Ok(Execution::NoRows { affected: 3 }),
            FakeResult::FailOnExecute => Err(ExecutionError::Driver("syntax error".into())),
            FakeResult::Rows {
                columns,
                rows,
                fail_at,
            } => Ok(Execution::Rows(Box::new(FakeCursor {
                columns: columns.clone(),
                rows: rows.clone().into_iter(),
                index: 0,
                fail_at: *fail_at,
                fetched: self.backend.fetched.clone(),
            }))),
        }
    }
}

struct FakeCursor {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<Field>>,
    index: usize,
    fail_at: Option<usize>,
    fetched: Rc<Cell<usize>>,
}

impl Cursor for FakeCursor {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Field>>, ExecutionError> {
        if self.fail_at == Some(self.index) {
            return Err(ExecutionError::Driver("connection lost".into()));
        }
        self.index += 1;
        let row = self.rows.next();
        if row.is_some() {
            self.fetched.set(self.fetched.get() + 1);
        }
        Ok(row)
    }
}
