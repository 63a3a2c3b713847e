// src/scheduler/state.rs

//! Pure decisions over store records. Everything here is evaluated inside a
//! store transaction by [`super::Scheduler`].

use std::time::Instant;

use crate::errors::{CalcError, Result};
use crate::store::Unit;
use crate::types::UnitStatus;

/// Whether `unit` can be handed to a worker at `now`, ignoring dependencies.
///
/// `InProgress` units qualify only when their lease has run out.
pub fn is_claimable(unit: &Unit, now: Instant) -> bool {
    match unit.status {
        UnitStatus::InProgress => unit.lease_deadline.is_some_and(|deadline| deadline <= now),
        status => status.can_transition_to(UnitStatus::InProgress),
    }
}

/// Move `unit` to `next`, or report a `Conflict` naming its current status.
pub fn transition(unit: &mut Unit, next: UnitStatus) -> Result<()> {
    if unit.status.can_transition_to(next) {
        unit.status = next;
        Ok(())
    } else {
        Err(CalcError::Conflict {
            unit: unit.id,
            status: unit.status.to_string(),
        })
    }
}

/// Value of a finished expression: `Some` only if every unit is `Done`, in
/// which case it is the result of the unit with the highest id.
///
/// `units` must be ascending by id.
pub fn completed_value(units: &[Unit]) -> Option<f64> {
    if units.is_empty() || units.iter().any(|u| u.status != UnitStatus::Done) {
        return None;
    }
    units.last().and_then(|terminal| terminal.result)
}
