// src/scheduler/core.rs

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, TimingTable};
use crate::errors::{CalcError, Result};
use crate::planner::{self, Plan};
use crate::scheduler::assignment::{TaskAssignment, WorkArgs};
use crate::scheduler::state::{completed_value, is_claimable, transition};
use crate::store::{Expression, StoreTx, TaskStore, Unit};
use crate::types::{
    EvaluationMode, ExpressionId, ExpressionStatus, Operand, Operation, OwnerId, UnitId,
    UnitStatus,
};

#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub mode: EvaluationMode,
    pub timing: TimingTable,
    /// Claim lease. `None` keeps a claimed unit reserved forever.
    pub lease: Option<Duration>,
}

impl SchedulerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            mode: cfg.scheduler.mode,
            timing: cfg.timing.clone(),
            lease: cfg.scheduler.lease(),
        }
    }
}

/// Dispatch and completion state machine over a [`TaskStore`].
///
/// Every public operation is one store transaction, so claims, results and
/// expression finalization are serialized by the store and never observed
/// half-applied.
#[derive(Debug)]
pub struct Scheduler<S: TaskStore> {
    store: S,
    options: SchedulerOptions,
    /// Woken whenever an expression reaches `Done` or `Error`.
    finished: Notify,
}

impl<S: TaskStore> Scheduler<S> {
    pub fn new(store: S, options: SchedulerOptions) -> Self {
        Self {
            store,
            options,
            finished: Notify::new(),
        }
    }

    pub fn from_config(store: S, cfg: &ConfigFile) -> Self {
        Self::new(store, SchedulerOptions::from_config(cfg))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record a new expression for `owner` together with its units.
    ///
    /// The expression and every unit are written in one transaction, so a
    /// failed submit leaves nothing behind. A malformed expression is stored
    /// with status `Error` and the `MalformedExpression` error is returned.
    pub fn submit(&self, owner: OwnerId, raw: &str) -> Result<ExpressionId> {
        let mut expression = Expression::pending(owner, raw);
        let id = expression.id;

        let plan = match self.stage(raw) {
            Ok(plan) => plan,
            Err(err @ CalcError::MalformedExpression(_)) => {
                warn!(expression_id = %id, %owner, raw, error = %err, "rejecting malformed expression");
                expression.status = ExpressionStatus::Error;
                expression.error = Some(err.to_string());
                self.store.transaction(|tx| tx.insert_expression(expression))?;
                self.finished.notify_waiters();
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let terminal = self.store.transaction(|tx| {
            tx.insert_expression(expression)?;
            stage_units(tx, id, &plan)
        })?;
        info!(
            expression_id = %id,
            %owner,
            raw,
            mode = ?self.options.mode,
            units = plan.len(),
            terminal = %terminal,
            "expression submitted"
        );
        Ok(id)
    }

    /// Plan and commit the units of an expression that is still `Pending`.
    ///
    /// Returns the terminal unit id. Either every unit of the plan is
    /// committed or none is.
    pub fn plan(&self, expression_id: ExpressionId, raw: &str) -> Result<UnitId> {
        let plan = self.checked(expression_id, self.stage(raw))?;
        self.commit_plan(expression_id, &plan)
    }

    /// Units for `raw` in the configured mode. Malformed text is rejected in
    /// both modes.
    fn stage(&self, raw: &str) -> Result<Plan> {
        let plan = planner::plan(raw)?;
        Ok(match self.options.mode {
            EvaluationMode::Decomposed => plan,
            EvaluationMode::Whole => Plan::whole_expression(),
        })
    }

    fn checked(&self, expression_id: ExpressionId, planned: Result<Plan>) -> Result<Plan> {
        match planned {
            Err(err @ CalcError::MalformedExpression(_)) => {
                warn!(expression_id = %expression_id, error = %err, "rejecting malformed expression");
                self.fail_expression(expression_id, err.to_string())?;
                Err(err)
            }
            other => other,
        }
    }

    fn fail_expression(&self, expression_id: ExpressionId, reason: String) -> Result<()> {
        self.store.transaction(|tx| {
            let mut expression = load_expression(tx, expression_id)?;
            expression.status = ExpressionStatus::Error;
            expression.error = Some(reason);
            tx.put_expression(expression)
        })?;
        self.finished.notify_waiters();
        Ok(())
    }

    fn commit_plan(&self, expression_id: ExpressionId, plan: &Plan) -> Result<UnitId> {
        let terminal = self
            .store
            .transaction(|tx| stage_units(tx, expression_id, plan))?;

        debug!(
            expression_id = %expression_id,
            units = plan.len(),
            terminal = %terminal,
            "plan committed"
        );
        Ok(terminal)
    }

    /// Claim the lowest-id ready unit, if any.
    pub fn claim_next(&self) -> Result<Option<TaskAssignment>> {
        self.claim_next_at(Instant::now())
    }

    /// [`Self::claim_next`] with an explicit clock, for lease handling.
    pub fn claim_next_at(&self, now: Instant) -> Result<Option<TaskAssignment>> {
        let lease = self.options.lease;
        let timing = &self.options.timing;

        let claimed = self.store.transaction(|tx| {
            let mut expressions: HashMap<ExpressionId, Expression> = HashMap::new();

            for mut unit in tx.open_units()? {
                if !is_claimable(&unit, now) {
                    continue;
                }

                if !expressions.contains_key(&unit.expression_id) {
                    let expression = load_expression(tx, unit.expression_id)?;
                    expressions.insert(unit.expression_id, expression);
                }
                let Some(expression) = expressions.get(&unit.expression_id) else {
                    continue;
                };
                if expression.status == ExpressionStatus::Error {
                    continue;
                }

                let Some(args) = work_args(tx, &unit, expression)? else {
                    continue;
                };

                let reclaimed = unit.status == UnitStatus::InProgress;
                if !reclaimed {
                    transition(&mut unit, UnitStatus::InProgress)?;
                }
                unit.claims += 1;
                unit.lease_deadline = lease.map(|d| now + d);
                tx.put_unit(unit.clone())?;

                return Ok(Some((
                    TaskAssignment {
                        unit_id: unit.id,
                        expression_id: unit.expression_id,
                        operation: unit.operation,
                        args,
                        operation_time_ms: timing.millis_for(unit.operation),
                    },
                    reclaimed,
                    unit.claims,
                )));
            }
            Ok(None)
        })?;

        Ok(claimed.map(|(assignment, reclaimed, claims)| {
            if reclaimed {
                warn!(
                    unit_id = %assignment.unit_id,
                    expression_id = %assignment.expression_id,
                    claims,
                    "lease expired; unit reclaimed"
                );
            } else {
                debug!(
                    unit_id = %assignment.unit_id,
                    expression_id = %assignment.expression_id,
                    operation = %assignment.operation,
                    "unit claimed"
                );
            }
            assignment
        }))
    }

    /// Record the value computed for an in-progress unit and finalize its
    /// expression if this was the last open unit.
    pub fn submit_result(&self, unit_id: UnitId, value: f64) -> Result<()> {
        let finished = self.store.transaction(|tx| {
            let mut unit = tx.unit(unit_id)?.ok_or(CalcError::UnitNotFound(unit_id))?;
            transition(&mut unit, UnitStatus::Done)?;
            unit.result = Some(value);
            unit.lease_deadline = None;
            let expression_id = unit.expression_id;
            tx.put_unit(unit)?;

            finalize_if_complete(tx, expression_id)
        })?;

        debug!(unit_id = %unit_id, value, "unit done");
        if let Some((expression_id, result)) = finished {
            info!(expression_id = %expression_id, result, "expression done");
            self.finished.notify_waiters();
        }
        Ok(())
    }

    /// Mark an in-progress unit and its expression as failed.
    ///
    /// Sibling units are left as they are; none of them is dispatched again.
    pub fn report_failure(&self, unit_id: UnitId, reason: &str) -> Result<()> {
        let expression_id = self.store.transaction(|tx| {
            let mut unit = tx.unit(unit_id)?.ok_or(CalcError::UnitNotFound(unit_id))?;
            transition(&mut unit, UnitStatus::Error)?;
            unit.error = Some(reason.to_string());
            unit.lease_deadline = None;
            let expression_id = unit.expression_id;
            tx.put_unit(unit)?;

            let mut expression = load_expression(tx, expression_id)?;
            if !expression.status.is_terminal() {
                expression.status = ExpressionStatus::Error;
                expression.error = Some(format!("unit {unit_id}: {reason}"));
                tx.put_expression(expression)?;
            }
            Ok(expression_id)
        })?;

        warn!(unit_id = %unit_id, expression_id = %expression_id, reason, "unit failed");
        self.finished.notify_waiters();
        Ok(())
    }

    pub fn expression(&self, id: ExpressionId) -> Result<Expression> {
        self.store.transaction(|tx| load_expression(tx, id))
    }

    /// Like [`Self::expression`], but only if `owner` submitted it.
    pub fn expression_for_owner(&self, owner: OwnerId, id: ExpressionId) -> Result<Expression> {
        let expression = self.expression(id)?;
        if expression.owner != owner {
            return Err(CalcError::ExpressionNotFound(id));
        }
        Ok(expression)
    }

    pub fn expressions_of(&self, owner: OwnerId) -> Result<Vec<Expression>> {
        self.store.transaction(|tx| tx.expressions_of_owner(owner))
    }

    /// Units of an expression, ascending by id.
    pub fn units_of(&self, expression_id: ExpressionId) -> Result<Vec<Unit>> {
        self.store.transaction(|tx| {
            load_expression(tx, expression_id)?;
            tx.units_of_expression(expression_id)
        })
    }

    pub fn unit(&self, id: UnitId) -> Result<Unit> {
        self.store
            .transaction(|tx| tx.unit(id)?.ok_or(CalcError::UnitNotFound(id)))
    }

    /// Wait until the expression is `Done` or `Error`.
    pub async fn wait_for(&self, id: ExpressionId) -> Result<Expression> {
        loop {
            let notified = self.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let expression = self.expression(id)?;
            if expression.status.is_terminal() {
                return Ok(expression);
            }
            notified.await;
        }
    }
}

fn load_expression(tx: &dyn StoreTx, id: ExpressionId) -> Result<Expression> {
    tx.expression(id)?.ok_or(CalcError::ExpressionNotFound(id))
}

/// Insert the units of `plan` for a `Pending` expression and move it to
/// `InProgress`. Returns the terminal unit id.
fn stage_units(tx: &mut dyn StoreTx, expression_id: ExpressionId, plan: &Plan) -> Result<UnitId> {
    let mut expression = load_expression(tx, expression_id)?;
    if expression.status != ExpressionStatus::Pending {
        return Err(CalcError::Other(anyhow::anyhow!(
            "expression {expression_id} is already {}",
            expression.status
        )));
    }

    let mut ids: Vec<UnitId> = Vec::with_capacity(plan.len());
    for planned in plan.units() {
        let id = tx.allocate_unit_id()?;
        tx.insert_unit(Unit::waiting(
            id,
            expression_id,
            planned.operation,
            planned.lhs.resolve(&ids),
            planned.rhs.resolve(&ids),
        ))?;
        ids.push(id);
    }

    let terminal = ids[plan.terminal()];
    expression.terminal_unit = Some(terminal);
    expression.status = ExpressionStatus::InProgress;
    tx.put_expression(expression)?;
    Ok(terminal)
}

/// Operand values for `unit`, or `None` while a referenced unit is not done.
fn work_args(tx: &dyn StoreTx, unit: &Unit, expression: &Expression) -> Result<Option<WorkArgs>> {
    match unit.operation {
        Operation::Whole => Ok(Some(WorkArgs::Whole {
            expression: expression.raw.clone(),
        })),
        Operation::Binary(_) => {
            let (Some(lhs), Some(rhs)) = (
                operand_value(tx, unit.lhs)?,
                operand_value(tx, unit.rhs)?,
            ) else {
                return Ok(None);
            };
            Ok(Some(WorkArgs::Binary { lhs, rhs }))
        }
    }
}

fn operand_value(tx: &dyn StoreTx, operand: Operand) -> Result<Option<f64>> {
    match operand {
        Operand::Literal(v) => Ok(Some(v)),
        Operand::Unit(id) => {
            let dep = tx.unit(id)?.ok_or(CalcError::UnitNotFound(id))?;
            Ok(match dep.status {
                UnitStatus::Done => dep.result,
                _ => None,
            })
        }
    }
}

fn finalize_if_complete(
    tx: &mut dyn StoreTx,
    expression_id: ExpressionId,
) -> Result<Option<(ExpressionId, f64)>> {
    let mut expression = load_expression(tx, expression_id)?;
    if expression.status != ExpressionStatus::InProgress {
        return Ok(None);
    }

    let units = tx.units_of_expression(expression_id)?;
    let Some(value) = completed_value(&units) else {
        return Ok(None);
    };

    expression.status = ExpressionStatus::Done;
    expression.result = Some(value);
    tx.put_expression(expression)?;
    Ok(Some((expression_id, value)))
}
