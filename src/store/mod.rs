// src/store/mod.rs

//! Task store abstraction.
//!
//! The scheduler never touches storage directly. It runs each operation as a
//! closure inside [`TaskStore::transaction`], against the primitive reads and
//! writes of [`StoreTx`]. A transaction's writes become visible only if the
//! closure returns `Ok`; any error (including `StoreUnavailable` raised by
//! the store itself) discards them, so no unit is ever left half-transitioned.
//!
//! - [`memory`] is the in-process arena-with-index implementation.

pub mod memory;

use std::fmt::Debug;
use std::time::Instant;

use serde::Serialize;

use crate::errors::Result;
use crate::types::{
    ExpressionId, ExpressionStatus, Operand, Operation, OwnerId, UnitId, UnitStatus,
};

pub use memory::MemoryStore;

/// Persisted expression record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub id: ExpressionId,
    pub owner: OwnerId,
    pub raw: String,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
    /// Set once the expression has been planned.
    pub terminal_unit: Option<UnitId>,
    /// Why the expression ended in `Error`, if it did.
    pub error: Option<String>,
}

impl Expression {
    pub fn pending(owner: OwnerId, raw: impl Into<String>) -> Self {
        Self {
            id: ExpressionId::new(),
            owner,
            raw: raw.into(),
            status: ExpressionStatus::Pending,
            result: None,
            terminal_unit: None,
            error: None,
        }
    }
}

/// Persisted unit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: UnitId,
    pub expression_id: ExpressionId,
    pub operation: Operation,
    pub lhs: Operand,
    pub rhs: Operand,
    pub status: UnitStatus,
    pub result: Option<f64>,
    pub error: Option<String>,
    /// Number of times the unit has been handed to a worker.
    pub claims: u32,
    /// When the current claim may be taken over by another worker.
    #[serde(skip)]
    pub lease_deadline: Option<Instant>,
}

impl Unit {
    pub fn waiting(
        id: UnitId,
        expression_id: ExpressionId,
        operation: Operation,
        lhs: Operand,
        rhs: Operand,
    ) -> Self {
        Self {
            id,
            expression_id,
            operation,
            lhs,
            rhs,
            status: UnitStatus::Waiting,
            result: None,
            error: None,
            claims: 0,
            lease_deadline: None,
        }
    }

    /// Ids of the units this one depends on.
    pub fn dependencies(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.lhs.unit_ref().into_iter().chain(self.rhs.unit_ref())
    }
}

/// Primitive operations available inside a transaction.
pub trait StoreTx {
    fn insert_expression(&mut self, expression: Expression) -> Result<()>;
    fn expression(&self, id: ExpressionId) -> Result<Option<Expression>>;
    fn put_expression(&mut self, expression: Expression) -> Result<()>;
    /// Expressions of one owner, in submission order.
    fn expressions_of_owner(&self, owner: OwnerId) -> Result<Vec<Expression>>;

    /// Reserve the next unit id. Ids are strictly increasing.
    fn allocate_unit_id(&mut self) -> Result<UnitId>;
    fn insert_unit(&mut self, unit: Unit) -> Result<()>;
    fn unit(&self, id: UnitId) -> Result<Option<Unit>>;
    fn put_unit(&mut self, unit: Unit) -> Result<()>;
    /// Units of one expression, ascending by id.
    fn units_of_expression(&self, id: ExpressionId) -> Result<Vec<Unit>>;
    /// Every `Waiting` or `InProgress` unit, ascending by id.
    fn open_units(&self) -> Result<Vec<Unit>>;
}

/// A transactional, key-indexed table of expressions and units.
pub trait TaskStore: Send + Sync + Debug {
    /// Run `f` atomically. Concurrent transactions are serializable.
    fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R>;
}

impl<S: TaskStore> TaskStore for std::sync::Arc<S> {
    fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R>,
    {
        (**self).transaction(f)
    }
}
