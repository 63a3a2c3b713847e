// src/store/memory.rs

//! In-memory task store.
//!
//! Units live in an append-only arena with an id index; a separate ordered
//! set tracks the units that are still open (`Waiting` or `InProgress`), so
//! claiming never scans finished work.
//!
//! One mutex serializes transactions. Inside a transaction, writes go to an
//! overlay that is merged into the tables only when the closure succeeds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use tracing::trace;

use crate::errors::{CalcError, Result};
use crate::store::{Expression, StoreTx, TaskStore, Unit};
use crate::types::{ExpressionId, OwnerId, UnitId, UnitStatus};

#[derive(Debug, Default)]
struct Tables {
    expressions: HashMap<ExpressionId, Expression>,
    by_owner: BTreeMap<OwnerId, Vec<ExpressionId>>,
    arena: Vec<Unit>,
    index: HashMap<UnitId, usize>,
    by_expression: HashMap<ExpressionId, Vec<UnitId>>,
    open: BTreeSet<UnitId>,
    last_unit_id: u64,
}

impl Tables {
    fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.index.get(&id).map(|&slot| &self.arena[slot])
    }

    fn apply(&mut self, writes: WriteSet) {
        for id in writes.new_expressions {
            if let Some(expr) = writes.expressions.get(&id) {
                self.by_owner.entry(expr.owner).or_default().push(id);
            }
        }
        self.expressions.extend(writes.expressions);

        for (id, unit) in writes.units {
            if is_open(unit.status) {
                self.open.insert(id);
            } else {
                self.open.remove(&id);
            }

            match self.index.get(&id) {
                Some(&slot) => self.arena[slot] = unit,
                None => {
                    self.by_expression
                        .entry(unit.expression_id)
                        .or_default()
                        .push(id);
                    self.index.insert(id, self.arena.len());
                    self.arena.push(unit);
                }
            }
        }

        self.last_unit_id = writes.last_unit_id;
    }
}

fn is_open(status: UnitStatus) -> bool {
    matches!(status, UnitStatus::Waiting | UnitStatus::InProgress)
}

/// Staged writes of one transaction.
struct WriteSet {
    expressions: HashMap<ExpressionId, Expression>,
    new_expressions: Vec<ExpressionId>,
    units: BTreeMap<UnitId, Unit>,
    last_unit_id: u64,
}

struct MemoryTx<'a> {
    base: &'a Tables,
    writes: WriteSet,
}

impl<'a> MemoryTx<'a> {
    fn new(base: &'a Tables) -> Self {
        Self {
            base,
            writes: WriteSet {
                expressions: HashMap::new(),
                new_expressions: Vec::new(),
                units: BTreeMap::new(),
                last_unit_id: base.last_unit_id,
            },
        }
    }

    fn unit_ref(&self, id: UnitId) -> Option<&Unit> {
        self.writes.units.get(&id).or_else(|| self.base.unit(id))
    }

    fn expression_ref(&self, id: ExpressionId) -> Option<&Expression> {
        self.writes
            .expressions
            .get(&id)
            .or_else(|| self.base.expressions.get(&id))
    }
}

impl StoreTx for MemoryTx<'_> {
    fn insert_expression(&mut self, expression: Expression) -> Result<()> {
        if self.expression_ref(expression.id).is_some() {
            return Err(CalcError::StoreUnavailable(format!(
                "duplicate expression id {}",
                expression.id
            )));
        }
        self.writes.new_expressions.push(expression.id);
        self.writes.expressions.insert(expression.id, expression);
        Ok(())
    }

    fn expression(&self, id: ExpressionId) -> Result<Option<Expression>> {
        Ok(self.expression_ref(id).cloned())
    }

    fn put_expression(&mut self, expression: Expression) -> Result<()> {
        if self.expression_ref(expression.id).is_none() {
            return Err(CalcError::ExpressionNotFound(expression.id));
        }
        self.writes.expressions.insert(expression.id, expression);
        Ok(())
    }

    fn expressions_of_owner(&self, owner: OwnerId) -> Result<Vec<Expression>> {
        let committed = self.base.by_owner.get(&owner).into_iter().flatten();
        let staged = self.writes.new_expressions.iter();

        Ok(committed
            .chain(staged)
            .filter_map(|id| self.expression_ref(*id))
            .filter(|expr| expr.owner == owner)
            .cloned()
            .collect())
    }

    fn allocate_unit_id(&mut self) -> Result<UnitId> {
        self.writes.last_unit_id += 1;
        Ok(UnitId(self.writes.last_unit_id))
    }

    fn insert_unit(&mut self, unit: Unit) -> Result<()> {
        if unit.id.0 > self.writes.last_unit_id {
            return Err(CalcError::StoreUnavailable(format!(
                "unit id {} was never allocated",
                unit.id
            )));
        }
        if self.unit_ref(unit.id).is_some() {
            return Err(CalcError::StoreUnavailable(format!(
                "duplicate unit id {}",
                unit.id
            )));
        }
        if self.expression_ref(unit.expression_id).is_none() {
            return Err(CalcError::ExpressionNotFound(unit.expression_id));
        }
        self.writes.units.insert(unit.id, unit);
        Ok(())
    }

    fn unit(&self, id: UnitId) -> Result<Option<Unit>> {
        Ok(self.unit_ref(id).cloned())
    }

    fn put_unit(&mut self, unit: Unit) -> Result<()> {
        if self.unit_ref(unit.id).is_none() {
            return Err(CalcError::UnitNotFound(unit.id));
        }
        self.writes.units.insert(unit.id, unit);
        Ok(())
    }

    fn units_of_expression(&self, id: ExpressionId) -> Result<Vec<Unit>> {
        let mut ids: BTreeSet<UnitId> = self
            .base
            .by_expression
            .get(&id)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        ids.extend(
            self.writes
                .units
                .values()
                .filter(|u| u.expression_id == id)
                .map(|u| u.id),
        );

        Ok(ids
            .into_iter()
            .filter_map(|uid| self.unit_ref(uid).cloned())
            .collect())
    }

    fn open_units(&self) -> Result<Vec<Unit>> {
        let mut ids: BTreeSet<UnitId> = self.base.open.clone();
        ids.extend(self.writes.units.keys().copied());

        Ok(ids
            .into_iter()
            .filter_map(|id| self.unit_ref(id))
            .filter(|u| is_open(u.status))
            .cloned()
            .collect())
    }
}

/// Mutex-guarded in-memory [`TaskStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for MemoryStore {
    fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn StoreTx) -> Result<R>,
    {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| CalcError::StoreUnavailable("store lock poisoned".to_string()))?;

        let (result, writes) = {
            let mut tx = MemoryTx::new(&tables);
            let result = f(&mut tx)?;
            (result, tx.writes)
        };

        trace!(
            expressions = writes.expressions.len(),
            units = writes.units.len(),
            "committing transaction"
        );
        tables.apply(writes);
        Ok(result)
    }
}
