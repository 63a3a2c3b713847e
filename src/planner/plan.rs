// src/planner/plan.rs

//! Staged decomposition output.
//!
//! A [`Plan`] is a scratch buffer of units addressed by local index. Nothing
//! reaches the store until the whole plan has been built, so a failed
//! decomposition leaves no orphaned units behind.

use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{CalcError, Result};
use crate::grammar::apply_operator;
use crate::types::{Operand, Operation, Operator, UnitId};

/// Operand of a staged unit: a literal, or the local index of an earlier unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StagedOperand {
    Literal(f64),
    Staged(usize),
}

impl StagedOperand {
    /// Map a staged operand onto store ids, `ids[i]` being the id assigned to
    /// local unit `i`.
    pub fn resolve(self, ids: &[UnitId]) -> Operand {
        match self {
            StagedOperand::Literal(v) => Operand::Literal(v),
            StagedOperand::Staged(i) => Operand::Unit(ids[i]),
        }
    }

    fn staged_ref(self) -> Option<usize> {
        match self {
            StagedOperand::Literal(_) => None,
            StagedOperand::Staged(i) => Some(i),
        }
    }
}

impl fmt::Display for StagedOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagedOperand::Literal(v) => write!(f, "{v}"),
            StagedOperand::Staged(i) => write!(f, "T{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUnit {
    pub operation: Operation,
    pub lhs: StagedOperand,
    pub rhs: StagedOperand,
}

impl PlannedUnit {
    pub fn binary(op: Operator, lhs: StagedOperand, rhs: StagedOperand) -> Self {
        Self {
            operation: Operation::Binary(op),
            lhs,
            rhs,
        }
    }

    /// Units this one waits on.
    pub fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.lhs.staged_ref().into_iter().chain(self.rhs.staged_ref())
    }
}

/// Units in creation (= dependency) order, plus the index of the terminal unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    units: Vec<PlannedUnit>,
    terminal: usize,
}

impl Plan {
    /// A single unit that evaluates the raw expression in one go.
    pub fn whole_expression() -> Self {
        Self {
            units: vec![PlannedUnit {
                operation: Operation::Whole,
                lhs: StagedOperand::Literal(0.0),
                rhs: StagedOperand::Literal(0.0),
            }],
            terminal: 0,
        }
    }

    /// Seal a set of staged units.
    ///
    /// Every reference must point at an earlier unit; this is the only place
    /// cycles are looked for; once committed, ascending ids are enough.
    pub fn from_units(units: Vec<PlannedUnit>, terminal: usize) -> Result<Self> {
        if terminal >= units.len() {
            return Err(CalcError::malformed(format!(
                "terminal unit T{terminal} was never created"
            )));
        }
        if terminal + 1 != units.len() {
            return Err(CalcError::malformed(format!(
                "terminal unit T{terminal} is not the last unit created"
            )));
        }

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (idx, unit) in units.iter().enumerate() {
            graph.add_node(idx);
            for dep in unit.dependencies() {
                if dep >= idx {
                    return Err(CalcError::malformed(format!(
                        "unit T{idx} references T{dep}, which is not created before it"
                    )));
                }
                graph.add_edge(dep, idx, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(CalcError::malformed(format!(
                "cycle detected in unit graph involving T{}",
                cycle.node_id()
            )));
        }

        Ok(Self { units, terminal })
    }

    pub fn units(&self) -> &[PlannedUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn terminal(&self) -> usize {
        self.terminal
    }

    /// Dispatch wave of each unit: 0 for units with only literal operands,
    /// otherwise one more than the deepest dependency. Units in the same
    /// wave can run concurrently.
    pub fn waves(&self) -> Vec<usize> {
        let mut waves: Vec<usize> = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let wave = unit.dependencies().map(|d| waves[d] + 1).max().unwrap_or(0);
            waves.push(wave);
        }
        waves
    }

    /// Fold the plan bottom-up without any scheduling.
    pub fn evaluate(&self) -> Result<f64> {
        let mut values: Vec<f64> = Vec::with_capacity(self.units.len());
        for (idx, unit) in self.units.iter().enumerate() {
            let value = match unit.operation {
                Operation::Binary(op) => {
                    let lhs = operand_value(&values, unit.lhs);
                    let rhs = operand_value(&values, unit.rhs);
                    apply_operator(op, lhs, rhs)?
                }
                Operation::Whole => {
                    return Err(CalcError::ExecutionError(format!(
                        "unit T{idx} is a whole-expression unit and cannot be folded"
                    )));
                }
            };
            values.push(value);
        }
        Ok(values[self.terminal])
    }
}

fn operand_value(values: &[f64], operand: StagedOperand) -> f64 {
    match operand {
        StagedOperand::Literal(v) => v,
        StagedOperand::Staged(i) => values[i],
    }
}
