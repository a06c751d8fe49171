//! Statement and block lowering.
//!
//! Blocks become `EnterScope`/`ExitScope` pairs and `if`/`else` becomes
//! `If`/`Else`/`EndIf` markers, so a function body is one flat list.
//! A block's tail value is written wherever the surrounding code wants it:
//! discarded, returned, or assigned to a local (`let x = if .. { a } else { b };`).

use crate::compiler_frontend::ast::ast_nodes::{
    Block, Expression, ExpressionKind, Statement, StatementKind, Ty,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::compiler_frontend::hir::hir_builder::HirBuilder;
use crate::compiler_frontend::hir::hir_nodes::{
    HirExpression, HirExpressionKind, HirPlace, HirStatementKind,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::{return_rule_error, return_type_error};

/// Where the value of a block's tail expression goes
#[derive(Debug, Clone)]
pub(crate) enum BlockTarget {
    Discard,
    Return,
    Assign(HirPlace),
}

impl BlockTarget {
    fn needs_value(&self) -> bool {
        !matches!(self, BlockTarget::Discard)
    }
}

impl HirBuilder<'_, '_> {
    /// Lowers a block in its own scope. Returns true when every path through it returns.
    pub(super) fn lower_block(
        &mut self,
        block: &Block,
        target: &BlockTarget,
    ) -> Result<bool, CompilerError> {
        self.enter_scope(block.location);

        let mut diverged = false;
        let mut warned = false;

        for statement in &block.statements {
            if diverged && !warned {
                self.warn_unreachable(statement.location);
                warned = true;
            }
            diverged |= self.lower_statement(statement)?;
        }

        match &block.tail {
            Some(tail) => {
                if diverged && !warned {
                    self.warn_unreachable(tail.location);
                }
                diverged |= self.lower_tail(tail, target)?;
            }
            None if !diverged => self.lower_missing_tail(block, target)?,
            None => {}
        }

        self.exit_scope(block.close);
        Ok(diverged)
    }

    fn warn_unreachable(&mut self, location: TextLocation) {
        let warning = CompilerWarning::new(
            &self.function.display_name,
            location,
            WarningKind::UnreachableCode,
            self.file_path(),
        );
        self.warnings.push(warning);
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<bool, CompilerError> {
        let location = statement.location;

        match &statement.kind {
            StatementKind::Let {
                name,
                mutable,
                ty,
                value,
            } => {
                let declared = ty.as_ref().map(|ty| self.declared_type(ty));

                match value {
                    // The local is filled in by each arm, its name is only visible afterwards
                    Some(Expression {
                        kind:
                            ExpressionKind::If {
                                condition,
                                then_block,
                                else_block,
                            },
                        location: if_location,
                    }) => {
                        let ty = declared.unwrap_or(Ty::Unknown);
                        let local = self.new_local(*name, ty.clone(), *mutable, location);
                        self.push_statement(HirStatementKind::Let { local, value: None }, location);

                        let target = BlockTarget::Assign(HirPlace::local(local, ty));
                        self.lower_if(
                            condition,
                            then_block,
                            else_block.as_ref(),
                            &target,
                            *if_location,
                        )?;
                        self.bind_name(local);
                    }

                    Some(value) => {
                        // Lowered before the new name exists, so `let x = x + 1;` reads the old x
                        let value = self.lower_value(value)?;
                        let ty = match declared {
                            Some(ty) if !matches!(ty, Ty::Unknown) => ty,
                            _ => value.ty.clone(),
                        };
                        let local = self.new_local(*name, ty, *mutable, location);
                        self.push_statement(
                            HirStatementKind::Let {
                                local,
                                value: Some(value),
                            },
                            location,
                        );
                        self.bind_name(local);
                    }

                    None => {
                        let ty = declared.unwrap_or(Ty::Unknown);
                        let local = self.new_local(*name, ty, *mutable, location);
                        self.push_statement(HirStatementKind::Let { local, value: None }, location);
                        self.bind_name(local);
                    }
                }

                Ok(false)
            }

            StatementKind::Assign { target, value } => {
                let value = self.lower_value(value)?;
                let target = self.lower_assign_target(target)?;

                if target.is_root() {
                    self.refine_local_type(target.root, &value.ty);
                }

                self.push_statement(HirStatementKind::Assign { target, value }, location);
                Ok(false)
            }

            StatementKind::CompoundAssign { target, value, .. } => {
                let value = self.lower_value(value)?;
                let target = self.lower_assign_target(target)?;
                self.push_statement(HirStatementKind::CompoundAssign { target, value }, location);
                Ok(false)
            }

            StatementKind::Expression(Expression {
                kind:
                    ExpressionKind::If {
                        condition,
                        then_block,
                        else_block,
                    },
                location,
            }) => self.lower_if(
                condition,
                then_block,
                else_block.as_ref(),
                &BlockTarget::Discard,
                *location,
            ),

            StatementKind::Expression(expression) => {
                let value = self.lower_value(expression)?;
                self.push_statement(HirStatementKind::Expression(value), location);
                Ok(false)
            }

            StatementKind::Return(value) => {
                let value = match value {
                    Some(value) => Some(self.lower_value(value)?),
                    None => None,
                };
                self.push_statement(HirStatementKind::Return(value), location);
                Ok(true)
            }

            StatementKind::Block(block) => self.lower_block(block, &BlockTarget::Discard),
        }
    }

    /// The left side of `=` and `op=`. Writing to a local directly needs it to be `mut`,
    /// writing through a reference does not.
    fn lower_assign_target(&mut self, target: &Expression) -> Result<HirPlace, CompilerError> {
        let Some(place) = self.lower_place(target)? else {
            return_rule_error!("Invalid left-hand side of assignment", target.location, {
                CompilationStage => "HIR Lowering",
                PrimarySuggestion => "Only variables, fields, indexes and dereferences can be assigned to",
            })
        };

        if !place.has_deref() {
            self.mark_mutated(place.root);
        }

        Ok(place)
    }

    fn lower_tail(
        &mut self,
        tail: &Expression,
        target: &BlockTarget,
    ) -> Result<bool, CompilerError> {
        if let ExpressionKind::If {
            condition,
            then_block,
            else_block,
        } = &tail.kind
        {
            return self.lower_if(condition, then_block, else_block.as_ref(), target, tail.location);
        }

        let value = self.lower_value(tail)?;
        self.write_to_target(value, target, tail.location);
        Ok(matches!(target, BlockTarget::Return))
    }

    fn write_to_target(
        &mut self,
        value: HirExpression,
        target: &BlockTarget,
        location: TextLocation,
    ) {
        match target {
            BlockTarget::Discard => {
                self.push_statement(HirStatementKind::Expression(value), location)
            }
            BlockTarget::Return => {
                self.push_statement(HirStatementKind::Return(Some(value)), location)
            }
            BlockTarget::Assign(place) => {
                if place.is_root() {
                    self.refine_local_type(place.root, &value.ty);
                }
                self.push_statement(
                    HirStatementKind::Assign {
                        target: place.clone(),
                        value,
                    },
                    location,
                );
            }
        }
    }

    fn lower_missing_tail(
        &mut self,
        block: &Block,
        target: &BlockTarget,
    ) -> Result<(), CompilerError> {
        match target {
            BlockTarget::Discard => Ok(()),
            BlockTarget::Return => {
                let expected = self.function.signature.return_type.display(self.string_table);
                return_type_error!(
                    format!("Mismatched types, expected '{expected}' but this block evaluates to '()'"),
                    block.location,
                    {
                        CompilationStage => "HIR Lowering",
                        ExpectedType => expected,
                        FoundType => "()",
                        PrimarySuggestion => "Remove the ';' after the last expression or add a return",
                    }
                )
            }
            BlockTarget::Assign(_) => {
                let unit = HirExpression::new(HirExpressionKind::Literal, Ty::Unit, block.location);
                self.write_to_target(unit, target, block.location);
                Ok(())
            }
        }
    }

    /// Returns true when both arms return
    pub(super) fn lower_if(
        &mut self,
        condition: &Expression,
        then_block: &Block,
        else_block: Option<&Block>,
        target: &BlockTarget,
        location: TextLocation,
    ) -> Result<bool, CompilerError> {
        if else_block.is_none() && target.needs_value() {
            return_type_error!("An 'if' without an 'else' cannot produce a value", location, {
                CompilationStage => "HIR Lowering",
                ExpectedType => "a value from both branches",
                FoundType => "()",
                PrimarySuggestion => "Add an 'else' branch",
            })
        }

        let condition = self.lower_value(condition)?;
        self.push_statement(HirStatementKind::If { condition }, location);

        let then_diverged = self.lower_block(then_block, target)?;
        self.push_statement(HirStatementKind::Else, location);

        let else_diverged = match else_block {
            Some(block) => self.lower_block(block, target)?,
            None => false,
        };
        self.push_statement(HirStatementKind::EndIf, location);

        Ok(then_diverged && else_diverged)
    }
}
