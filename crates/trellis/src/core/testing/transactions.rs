use std::{cell::RefCell, rc::Rc};

use crate::core::{commands::Cancelled, transaction::ChangeTransactions};

/// One call observed by [`RecordingTransactions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// A transaction was opened with this description.
    Open(String),
    /// The open transaction was committed.
    Commit,
    /// The open transaction was cancelled.
    Cancel,
}

/// How a scripted failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// The user cancelled.
    Cancel,
    /// An unexpected fault.
    Fault,
}

impl Failure {
    /// Build the error this failure is reported as.
    fn error(self) -> anyhow::Error {
        match self {
            Self::Cancel => Cancelled.into(),
            Self::Fault => anyhow::anyhow!("journal fault"),
        }
    }
}

/// A journal that records every call and can be scripted to fail. Clones
/// share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransactions {
    /// Shared event log.
    log: Rc<RefCell<Vec<TxEvent>>>,
    /// Fail `open` this way.
    fail_open: Option<Failure>,
    /// Fail `commit` this way.
    fail_commit: Option<Failure>,
}

impl RecordingTransactions {
    /// A journal that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open` fail.
    pub fn fail_open(mut self, failure: Failure) -> Self {
        self.fail_open = Some(failure);
        self
    }

    /// Make `commit` fail.
    pub fn fail_commit(mut self, failure: Failure) -> Self {
        self.fail_commit = Some(failure);
        self
    }

    /// Stop failing.
    pub fn heal(&mut self) {
        self.fail_open = None;
        self.fail_commit = None;
    }

    /// Return the recorded events.
    pub fn events(&self) -> Vec<TxEvent> {
        self.log.borrow().clone()
    }

    /// Is a transaction currently open?
    pub fn is_open(&self) -> bool {
        matches!(self.log.borrow().last(), Some(TxEvent::Open(_)))
    }
}

impl ChangeTransactions for RecordingTransactions {
    fn open(&mut self, description: &str) -> anyhow::Result<()> {
        if let Some(f) = self.fail_open {
            return Err(f.error());
        }
        self.log.borrow_mut().push(TxEvent::Open(description.to_string()));
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(TxEvent::Commit);
        match self.fail_commit {
            Some(f) => Err(f.error()),
            None => Ok(()),
        }
    }

    fn cancel(&mut self) {
        self.log.borrow_mut().push(TxEvent::Cancel);
    }
}
