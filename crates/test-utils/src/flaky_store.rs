use std::sync::atomic::{AtomicI64, Ordering};

use calcdag::errors::{CalcError, Result};
use calcdag::store::{Expression, StoreTx, TaskStore, Unit};
use calcdag::types::{ExpressionId, OwnerId, UnitId};

const UNLIMITED: i64 = -1;

/// A [`TaskStore`] wrapper that starts failing writes with
/// `StoreUnavailable` once a configurable budget is used up.
///
/// Reads always succeed, so the failure lands mid-transaction, after some
/// writes of the same transaction have already been staged.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    /// Writes still allowed; `UNLIMITED` disables injection.
    budget: AtomicI64,
}

impl<S: TaskStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            budget: AtomicI64::new(UNLIMITED),
        }
    }

    /// Allow `writes` more successful writes, then fail every write.
    pub fn fail_writes_after(&self, writes: usize) {
        self.budget.store(writes as i64, Ordering::SeqCst);
    }

    /// Stop injecting failures.
    pub fn heal(&self) {
        self.budget.store(UNLIMITED, Ordering::SeqCst);
    }
}

impl<S: TaskStore> TaskStore for FlakyStore<S> {
    fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R>,
    {
        self.inner.transaction(|tx| {
            let mut flaky = FlakyTx {
                inner: tx,
                budget: &self.budget,
            };
            f(&mut flaky)
        })
    }
}

struct FlakyTx<'a> {
    inner: &'a mut dyn StoreTx,
    budget: &'a AtomicI64,
}

impl FlakyTx<'_> {
    fn spend(&self, what: &str) -> Result<()> {
        let left = self.budget.load(Ordering::SeqCst);
        if left == UNLIMITED {
            return Ok(());
        }
        if left == 0 {
            return Err(CalcError::StoreUnavailable(format!(
                "injected failure on {what}"
            )));
        }
        self.budget.store(left - 1, Ordering::SeqCst);
        Ok(())
    }
}

impl StoreTx for FlakyTx<'_> {
    fn insert_expression(&mut self, expression: Expression) -> Result<()> {
        self.spend("insert_expression")?;
        self.inner.insert_expression(expression)
    }

    fn expression(&self, id: ExpressionId) -> Result<Option<Expression>> {
        self.inner.expression(id)
    }

    fn put_expression(&mut self, expression: Expression) -> Result<()> {
        self.spend("put_expression")?;
        self.inner.put_expression(expression)
    }

    fn expressions_of_owner(&self, owner: OwnerId) -> Result<Vec<Expression>> {
        self.inner.expressions_of_owner(owner)
    }

    fn allocate_unit_id(&mut self) -> Result<UnitId> {
        self.inner.allocate_unit_id()
    }

    fn insert_unit(&mut self, unit: Unit) -> Result<()> {
        self.spend("insert_unit")?;
        self.inner.insert_unit(unit)
    }

    fn unit(&self, id: UnitId) -> Result<Option<Unit>> {
        self.inner.unit(id)
    }

    fn put_unit(&mut self, unit: Unit) -> Result<()> {
        self.spend("put_unit")?;
        self.inner.put_unit(unit)
    }

    fn units_of_expression(&self, id: ExpressionId) -> Result<Vec<Unit>> {
        self.inner.units_of_expression(id)
    }

    fn open_units(&self) -> Result<Vec<Unit>> {
        self.inner.open_units()
    }
}
