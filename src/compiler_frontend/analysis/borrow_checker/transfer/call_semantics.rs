//! Call transfer.
//!
//! Arguments are evaluated in order, except a two-phase receiver (`v.push(v.len())`)
//! whose `&mut` autoref is taken only after the other arguments. The result holds
//! the loans of the arguments the callee's signature ties to its output. Loans
//! made for the call that the result does not hold end when the call returns.

use crate::borrow_log;
use crate::compiler_frontend::analysis::borrow_checker::state::{BorrowState, LoanId, LoanSet};
use crate::compiler_frontend::analysis::borrow_checker::types::FunctionReturnAliasSummary;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::hir::hir_nodes::{FunctionId, HirExpression};

use super::FunctionTransfer;

impl FunctionTransfer<'_, '_> {
    pub(super) fn eval_call(
        &mut self,
        function: FunctionId,
        args: &[HirExpression],
        two_phase: bool,
        returns_reference: bool,
        state: &mut BorrowState,
    ) -> Result<LoanSet, CompilerError> {
        let first_new_loan = self.tables.loans.len();

        let order = if two_phase && args.len() > 1 {
            (1..args.len()).chain(std::iter::once(0)).collect::<Vec<_>>()
        } else {
            (0..args.len()).collect()
        };

        let mut arg_loans = vec![LoanSet::new(); args.len()];
        for index in order {
            arg_loans[index] = self.eval(&args[index], state)?;
        }

        let result = if returns_reference {
            self.result_loans(function, &arg_loans)
        } else {
            LoanSet::new()
        };

        for index in first_new_loan..self.tables.loans.len() {
            let loan = LoanId(index as u32);
            if !result.contains(&loan) && state.end_loan(loan) {
                self.tables.record_end(loan, self.point);
            }
        }

        borrow_log!(
            "{}: call to fn#{} at {} returns {} loan(s)",
            self.diagnostics.function_name(),
            function.0,
            self.point,
            result.len()
        );

        Ok(result)
    }

    fn result_loans(&self, function: FunctionId, arg_loans: &[LoanSet]) -> LoanSet {
        let alias = self
            .context
            .return_aliases
            .get(function.0 as usize)
            .unwrap_or(&FunctionReturnAliasSummary::Unknown);

        match alias {
            FunctionReturnAliasSummary::Fresh => LoanSet::new(),
            FunctionReturnAliasSummary::AliasParams(params) => params
                .iter()
                .filter_map(|index| arg_loans.get(*index))
                .flatten()
                .copied()
                .collect(),
            FunctionReturnAliasSummary::Unknown => arg_loans.iter().flatten().copied().collect(),
        }
    }
}
