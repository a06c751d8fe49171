//! Last-use liveness of locals over a linear body.
//!
//! A local is live at a point when some later statement that can still run
//! reads it before every path to that read overwrites it. Branch arms are
//! tracked so a read in the `else` arm does not keep a loan from the `then`
//! arm alive.

use crate::compiler_frontend::hir::hir_nodes::{
    HirExpression, HirExpressionKind, HirPlace, HirStatement, HirStatementKind, IndexOperand,
    LocalId, ProgramPoint, Projection,
};
use rustc_hash::FxHashMap;

// (point of the `If`, inside the else arm)
type Arm = (ProgramPoint, bool);

#[derive(Debug, Clone, Default)]
pub(crate) struct Liveness {
    arms: Vec<Vec<Arm>>,
    uses: FxHashMap<LocalId, Vec<ProgramPoint>>,
    kills: FxHashMap<LocalId, Vec<ProgramPoint>>,
}

impl Liveness {
    pub(crate) fn compute(statements: &[HirStatement]) -> Self {
        let mut liveness = Self {
            arms: Vec::with_capacity(statements.len()),
            ..Self::default()
        };
        let mut open: Vec<Arm> = Vec::new();

        for (point, statement) in statements.iter().enumerate() {
            match &statement.kind {
                HirStatementKind::If { condition } => {
                    liveness.arms.push(open.clone());
                    liveness.expression_uses(condition, point);
                    open.push((point, false));
                }
                HirStatementKind::Else => {
                    if let Some(arm) = open.last_mut() {
                        arm.1 = true;
                    }
                    liveness.arms.push(open[..open.len().saturating_sub(1)].to_vec());
                }
                HirStatementKind::EndIf => {
                    open.pop();
                    liveness.arms.push(open.clone());
                }
                kind => {
                    liveness.arms.push(open.clone());
                    liveness.statement_uses(kind, point);
                }
            }
        }

        liveness
    }

    /// Whether `local` may still be read at or after `at`
    pub(crate) fn is_live(&self, local: LocalId, at: ProgramPoint) -> bool {
        let Some(uses) = self.uses.get(&local) else {
            return false;
        };
        let kills = self.kills.get(&local).map(Vec::as_slice).unwrap_or_default();

        uses.iter()
            .filter(|used| **used >= at && self.reachable(at, **used))
            .any(|used| {
                !kills
                    .iter()
                    .any(|killed| {
                        at <= *killed && killed < used && self.always_runs_after(at, *killed)
                    })
            })
    }

    /// Every point that reads `local`, in order
    pub(crate) fn uses_of(&self, local: LocalId) -> &[ProgramPoint] {
        self.uses.get(&local).map(Vec::as_slice).unwrap_or_default()
    }

    // Two points in different arms of the same `if` never run one after the other
    fn reachable(&self, from: ProgramPoint, to: ProgramPoint) -> bool {
        let (Some(from_arms), Some(to_arms)) = (self.arms.get(from), self.arms.get(to)) else {
            return true;
        };

        !from_arms.iter().any(|(branch, in_else)| {
            to_arms
                .iter()
                .any(|(other, other_else)| branch == other && in_else != other_else)
        })
    }

    // `later` is not nested in a branch that `earlier` is outside of
    fn always_runs_after(&self, earlier: ProgramPoint, later: ProgramPoint) -> bool {
        let (Some(earlier_arms), Some(later_arms)) = (self.arms.get(earlier), self.arms.get(later))
        else {
            return false;
        };

        later_arms.len() <= earlier_arms.len() && earlier_arms.starts_with(later_arms)
    }

    fn statement_uses(&mut self, kind: &HirStatementKind, point: ProgramPoint) {
        match kind {
            HirStatementKind::Let { local, value } => {
                if let Some(value) = value {
                    self.expression_uses(value, point);
                }
                self.record_kill(*local, point);
            }
            HirStatementKind::Assign { target, value } => {
                self.expression_uses(value, point);
                if target.is_root() {
                    self.record_kill(target.root, point);
                } else {
                    self.place_uses(target, point);
                }
            }
            HirStatementKind::CompoundAssign { target, value } => {
                self.expression_uses(value, point);
                self.place_uses(target, point);
            }
            HirStatementKind::Expression(value) | HirStatementKind::Return(Some(value)) => {
                self.expression_uses(value, point);
            }
            HirStatementKind::If { condition } => self.expression_uses(condition, point),
            HirStatementKind::Return(None)
            | HirStatementKind::EnterScope(_)
            | HirStatementKind::ExitScope(_)
            | HirStatementKind::Else
            | HirStatementKind::EndIf => {}
        }
    }

    fn expression_uses(&mut self, expression: &HirExpression, point: ProgramPoint) {
        match &expression.kind {
            HirExpressionKind::Literal | HirExpressionKind::StrLiteral => {}
            HirExpressionKind::Copy(place)
            | HirExpressionKind::Move(place)
            | HirExpressionKind::Read(place)
            | HirExpressionKind::Borrow { place, .. } => self.place_uses(place, point),
            HirExpressionKind::BorrowTemporary(inner)
            | HirExpressionKind::Cast(inner)
            | HirExpressionKind::Project(inner)
            | HirExpressionKind::Unary { value: inner, .. } => self.expression_uses(inner, point),
            HirExpressionKind::Call { args, .. }
            | HirExpressionKind::Aggregate(args)
            | HirExpressionKind::Format(args) => {
                for arg in args {
                    self.expression_uses(arg, point);
                }
            }
            HirExpressionKind::Binary { left, right, .. } => {
                self.expression_uses(left, point);
                self.expression_uses(right, point);
            }
        }
    }

    fn place_uses(&mut self, place: &HirPlace, point: ProgramPoint) {
        self.record_use(place.root, point);

        for projection in &place.projections {
            if let Projection::Index(IndexOperand::Dynamic(operands)) = projection {
                for operand in operands {
                    self.expression_uses(operand, point);
                }
            }
        }
    }

    fn record_use(&mut self, local: LocalId, point: ProgramPoint) {
        let uses = self.uses.entry(local).or_default();
        if uses.last() != Some(&point) {
            uses.push(point);
        }
    }

    fn record_kill(&mut self, local: LocalId, point: ProgramPoint) {
        self.kills.entry(local).or_default().push(point);
    }
}
