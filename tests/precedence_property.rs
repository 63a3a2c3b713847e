// tests/precedence_property.rs

mod common;
use crate::common::builders::SchedulerBuilder;
use crate::common::evaluate_with;

use proptest::prelude::*;

use calcdag::errors::CalcError;
use calcdag::planner;
use calcdag::types::ExpressionStatus;

#[derive(Debug, Clone)]
enum Ast {
    Num(u8),
    Neg(Box<Ast>),
    Bin(char, Box<Ast>, Box<Ast>),
}

impl Ast {
    /// Reference value; `None` on division by zero.
    fn value(&self) -> Option<f64> {
        match self {
            Ast::Num(n) => Some(f64::from(*n)),
            Ast::Neg(inner) => inner.value().map(|v| 0.0 - v),
            Ast::Bin(op, l, r) => {
                let (l, r) = (l.value()?, r.value()?);
                match op {
                    '+' => Some(l + r),
                    '-' => Some(l - r),
                    '*' => Some(l * r),
                    _ if r == 0.0 => None,
                    _ => Some(l / r),
                }
            }
        }
    }

    /// Fully parenthesised rendering, so evaluation order is unambiguous.
    fn render(&self) -> String {
        match self {
            Ast::Num(n) => n.to_string(),
            Ast::Neg(inner) => format!("-{}", inner.render_operand()),
            Ast::Bin(op, l, r) => format!("({}{op}{})", l.render(), r.render()),
        }
    }

    fn render_operand(&self) -> String {
        match self {
            Ast::Num(_) | Ast::Bin(..) => self.render(),
            Ast::Neg(_) => format!("({})", self.render()),
        }
    }
}

fn ast() -> impl Strategy<Value = Ast> {
    let leaf = (0u8..20).prop_map(Ast::Num);
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|a| Ast::Neg(Box::new(a))),
            (
                prop::sample::select(vec!['+', '-', '*', '/']),
                inner.clone(),
                inner
            )
                .prop_map(|(op, l, r)| Ast::Bin(op, Box::new(l), Box::new(r))),
        ]
    })
}

/// Flat infix without parentheses, evaluated with `*`/`/` before `+`/`-`,
/// both left to right.
fn flat() -> impl Strategy<Value = (String, Option<f64>)> {
    (
        0u8..20,
        prop::collection::vec((prop::sample::select(vec!['+', '-', '*', '/']), 0u8..20), 0..8),
    )
        .prop_map(|(first, rest)| {
            let mut text = first.to_string();
            for (op, n) in &rest {
                text.push(*op);
                text.push_str(&n.to_string());
            }
            (text, reference_flat(first, &rest))
        })
}

fn reference_flat(first: u8, rest: &[(char, u8)]) -> Option<f64> {
    let mut terms: Vec<(char, f64)> = vec![('+', f64::from(first))];
    for &(op, n) in rest {
        let n = f64::from(n);
        match op {
            '*' | '/' => {
                let last = terms.last_mut()?;
                if op == '/' && n == 0.0 {
                    return None;
                }
                last.1 = if op == '*' { last.1 * n } else { last.1 / n };
            }
            _ => terms.push((op, n)),
        }
    }
    let mut acc = terms[0].1;
    for &(op, v) in &terms[1..] {
        acc = if op == '+' { acc + v } else { acc - v };
    }
    Some(acc)
}

proptest! {
    #[test]
    fn flat_plans_match_precedence_evaluation((text, expected) in flat()) {
        match (planner::evaluate(&text), expected) {
            (Ok(got), Some(want)) => prop_assert_eq!(got, want, "{}", text),
            (Err(CalcError::ExecutionError(_)), None) => {}
            (got, want) => prop_assert!(false, "{}: got {:?}, want {:?}", text, got, want),
        }
    }

    #[test]
    fn nested_plans_match_tree_evaluation(tree in ast()) {
        let text = tree.render();
        let expected = tree.value();
        match (planner::evaluate(&text), expected) {
            (Ok(got), Some(want)) => prop_assert_eq!(got, want, "{}", text),
            (Err(CalcError::ExecutionError(_)), None) => {}
            (got, want) => prop_assert!(false, "{}: got {:?}, want {:?}", text, got, want),
        }
    }

    #[test]
    fn plans_reference_only_earlier_units(tree in ast()) {
        let plan = planner::plan(&tree.render()).unwrap();
        prop_assert_eq!(plan.terminal(), plan.len() - 1);
        for (idx, unit) in plan.units().iter().enumerate() {
            for dep in unit.dependencies() {
                prop_assert!(dep < idx);
            }
        }
    }

    #[test]
    fn scheduled_result_equals_direct_result(tree in ast()) {
        let scheduler = SchedulerBuilder::new().build();
        let text = tree.render();
        let (_, status, result) = evaluate_with(&scheduler, &text);
        match tree.value() {
            Some(want) => {
                prop_assert_eq!(status, ExpressionStatus::Done);
                prop_assert_eq!(result, Some(want));
            }
            None => prop_assert_eq!(status, ExpressionStatus::Error),
        }
    }
}
