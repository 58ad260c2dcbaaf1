use scopeguard::ScopeGuard;
use tracing::debug;

use crate::core::{id::ContainerId, model::Model};

/// The undo journal a navigation-triggered mutation runs inside.
///
/// Contract: `open`, then mutate, then `commit` on success or `cancel` on
/// failure. A transaction is never left open past the call that opened it.
pub trait ChangeTransactions {
    /// Open a transaction.
    fn open(&mut self, description: &str) -> anyhow::Result<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> anyhow::Result<()>;

    /// Cancel the open transaction.
    fn cancel(&mut self);
}

/// A journal that accepts everything and records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransactions;

impl ChangeTransactions for NoTransactions {
    fn open(&mut self, _description: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn cancel(&mut self) {}
}

/// Model mutations made inside a transaction, undone if it fails.
#[derive(Debug, Default)]
pub struct Rollback {
    /// Containers whose open state changed, with their previous state.
    opened: Vec<(ContainerId, bool)>,
}

impl Rollback {
    /// Show or hide a dropdown, remembering its previous state.
    pub fn set_open(
        &mut self,
        model: &mut Model,
        container: ContainerId,
        open: bool,
    ) -> crate::core::error::Result<()> {
        let was = model.set_open(container, open)?;
        if was != open {
            self.opened.push((container, was));
        }
        Ok(())
    }

    /// Number of recorded mutations.
    pub fn len(&self) -> usize {
        self.opened.len()
    }

    /// Did the transaction change anything?
    pub fn is_empty(&self) -> bool {
        self.opened.is_empty()
    }

    /// Undo every recorded mutation, newest first.
    fn undo(self, model: &mut Model) {
        for (container, was) in self.opened.into_iter().rev() {
            // The container may have vanished; nothing to restore then.
            if let Err(e) = model.set_open(container, was) {
                debug!(?container, error = %e, "rollback skipped a removed container");
            }
        }
    }
}

/// Run `f` inside a transaction. On failure the transaction is cancelled
/// and every mutation recorded in the [`Rollback`] is undone.
pub fn with_transaction<R>(
    transactions: &mut dyn ChangeTransactions,
    model: &mut Model,
    description: &str,
    f: impl FnOnce(&mut Model, &mut Rollback) -> anyhow::Result<R>,
) -> anyhow::Result<R> {
    transactions.open(description)?;
    let guard = scopeguard::guard(transactions, |tx| tx.cancel());

    let mut rollback = Rollback::default();
    let result = f(model, &mut rollback).and_then(|value| {
        let tx = ScopeGuard::into_inner(guard);
        match tx.commit() {
            Ok(()) => Ok(value),
            Err(e) => {
                tx.cancel();
                Err(e)
            }
        }
    });

    if result.is_err() {
        debug!(description, undone = rollback.len(), "transaction rolled back");
        rollback.undo(model);
    }
    result
}
