//! HIR Builder
//!
//! Responsible for lowering the AST -> HIR.
//!
//! This stage:
//! - Resolves every name to a local or function
//! - Decides how each place is used (copy, move, read, borrow, autoref)
//! - Linearizes blocks and if/else into marker statements
//! - Reports unused variables, unused `mut` and unreachable code
//!
//! This stage does NOT:
//! - Track ownership or permissions
//! - Resolve lifetimes
//!
//! Those happen in the borrow checker.

use crate::compiler_frontend::ast::ast_nodes::{Ast, Block, FunctionDefinition, Ty};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::compiler_frontend::datatypes::{TypeTable, substitute};
use crate::compiler_frontend::hir::hir_statement::BlockTarget;
use crate::compiler_frontend::hir::hir_nodes::{
    FunctionId, FunctionSignature, HirFunction, HirLocal, HirModule, HirStatement,
    HirStatementKind, LocalId, ScopeId, SignatureParam,
};
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::{hir_log, return_rule_error, settings};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Everything the HIR stage produced for one file.
/// Functions that failed to lower keep their signature but have no body.
#[derive(Debug, Default)]
pub struct HirLowering {
    pub module: HirModule,
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

// -----------
// Entry Point
// -----------
pub fn lower_module(
    ast: &Ast,
    type_table: &TypeTable,
    string_table: &mut StringTable,
    file_path: &Path,
) -> HirLowering {
    let mut lowering = HirLowering::default();
    let mut functions = FunctionIndex::default();

    // Declaration pass, so calls can refer to functions declared later in the file
    for definition in &ast.functions {
        let id = FunctionId(lowering.module.functions.len() as u32);
        let function = declare_function(id, definition, type_table, string_table);

        let key = (definition.owner, definition.name);
        if functions.by_key.contains_key(&key) {
            lowering.errors.push(
                CompilerError::new_rule_error(
                    format!("Function '{}' is defined more than once", function.display_name),
                    definition.location,
                )
                .with_function(function.display_name.clone())
                .with_file_path(file_path.to_path_buf()),
            );
        } else {
            functions.by_key.insert(key, id);
            if definition.has_receiver {
                functions.methods_by_name.entry(definition.name).or_default().push(id);
            }
        }

        lowering.module.functions.push(function);
    }

    // Body pass
    for (index, definition) in ast.functions.iter().enumerate() {
        let Some(body) = &definition.body else {
            continue;
        };

        let function = &lowering.module.functions[index];
        if functions.by_key.get(&(definition.owner, definition.name)) != Some(&function.id) {
            continue;
        }

        let context = ModuleContext {
            module: &lowering.module,
            functions: &functions,
            type_table,
            file_path,
        };

        let mut builder = HirBuilder::new(&context, function, string_table);
        match builder.lower_body(body) {
            Ok(()) => {
                let params = builder.params();
                let (statements, locals, warnings) = builder.finish();
                hir_log!(
                    "lowered '{}' into {} statements and {} locals",
                    function.display_name,
                    statements.len(),
                    locals.len()
                );

                if !definition.from_prelude {
                    lowering.warnings.extend(warnings);
                }

                let function = &mut lowering.module.functions[index];
                function.locals = locals;
                function.params = params;
                function.body = Some(statements);
            }
            Err(error) => {
                let display_name = function.display_name.clone();
                lowering.errors.push(
                    error
                        .with_function(display_name)
                        .with_file_path(file_path.to_path_buf()),
                );
            }
        }
    }

    lowering
}

fn declare_function(
    id: FunctionId,
    definition: &FunctionDefinition,
    type_table: &TypeTable,
    string_table: &StringTable,
) -> HirFunction {
    let self_type = definition
        .owner
        .map(|owner| type_table.self_type(owner, &definition.owner_generics));

    let mut generics = definition.owner_generics.clone();
    generics.extend(definition.generics.iter().copied());

    // Generic parameters stay generic in a declared signature, they are bound per call site
    let unbound = generics
        .iter()
        .map(|generic| (*generic, Ty::Generic(*generic)))
        .collect::<FxHashMap<_, _>>();

    let params = definition
        .params
        .iter()
        .map(|param| SignatureParam {
            name: param.name,
            ty: substitute(&param.ty, self_type.as_ref(), &unbound),
            mutable: param.mutable,
            location: param.location,
        })
        .collect::<Vec<_>>();

    let return_type = substitute(&definition.return_type, self_type.as_ref(), &unbound);

    let display_name = match definition.owner {
        Some(owner) => format!(
            "{}::{}",
            string_table.resolve(owner),
            string_table.resolve(definition.name)
        ),
        None => string_table.resolve(definition.name).to_owned(),
    };

    HirFunction {
        id,
        owner: definition.owner,
        display_name,
        signature: FunctionSignature {
            params,
            return_type,
            lifetimes: definition.lifetimes.clone(),
            generics,
            has_receiver: definition.has_receiver,
        },
        locals: Vec::new(),
        params: Vec::new(),
        body: None,
        location: definition.location,
        from_prelude: definition.from_prelude,
    }
}

#[derive(Debug, Default)]
pub(super) struct FunctionIndex {
    pub by_key: FxHashMap<(Option<StringId>, StringId), FunctionId>,
    pub methods_by_name: FxHashMap<StringId, Vec<FunctionId>>,
}

/// Read only tables shared by every function being lowered
pub(super) struct ModuleContext<'a> {
    pub module: &'a HirModule,
    pub functions: &'a FunctionIndex,
    pub type_table: &'a TypeTable,
    pub file_path: &'a Path,
}

impl ModuleContext<'_> {
    pub(super) fn function(&self, id: FunctionId) -> &HirFunction {
        &self.module.functions[id.0 as usize]
    }

    pub(super) fn lookup(&self, owner: Option<StringId>, name: StringId) -> Option<FunctionId> {
        self.functions.by_key.get(&(owner, name)).copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct LocalUsage {
    pub used: bool,
    pub mutated: bool,
}

#[derive(Debug)]
pub(super) struct ScopeFrame {
    pub id: ScopeId,
    pub names: FxHashMap<StringId, LocalId>,
}

// -------------------
// HIR Builder Context
// -------------------
//
// One builder lowers one function body. Statements are appended in program order,
// so lowering an expression may push statements of its own (if expressions in
// value position) before the statement that uses the value.
pub(super) struct HirBuilder<'a, 'b> {
    pub(super) context: &'a ModuleContext<'a>,
    pub(super) function: &'a HirFunction,
    pub(super) string_table: &'b mut StringTable,

    pub(super) locals: Vec<HirLocal>,
    pub(super) usage: Vec<LocalUsage>,
    pub(super) scopes: Vec<ScopeFrame>,
    pub(super) next_scope_id: u32,
    pub(super) statements: Vec<HirStatement>,
    pub(super) warnings: Vec<CompilerWarning>,
}

impl<'a, 'b> HirBuilder<'a, 'b> {
    pub(super) fn new(
        context: &'a ModuleContext<'a>,
        function: &'a HirFunction,
        string_table: &'b mut StringTable,
    ) -> Self {
        Self {
            context,
            function,
            string_table,
            locals: Vec::with_capacity(settings::MINIMUM_LIKELY_LOCALS),
            usage: Vec::with_capacity(settings::MINIMUM_LIKELY_LOCALS),
            scopes: Vec::new(),
            next_scope_id: 0,
            statements: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(super) fn type_table(&self) -> &'a TypeTable {
        self.context.type_table
    }

    pub(super) fn file_path(&self) -> PathBuf {
        self.context.file_path.to_path_buf()
    }

    pub(super) fn finish(self) -> (Vec<HirStatement>, Vec<HirLocal>, Vec<CompilerWarning>) {
        let mut warnings = self.warnings;

        for (local, usage) in self.locals.iter().zip(&self.usage) {
            let name = self.string_table.resolve(local.name);
            if local.synthetic || name.starts_with('_') || name == "self" {
                continue;
            }

            if !usage.used {
                let kind = if local.param_index.is_some() {
                    WarningKind::UnusedFunctionParameter
                } else {
                    WarningKind::UnusedVariable
                };
                warnings.push(CompilerWarning::new(
                    name,
                    local.location,
                    kind,
                    self.context.file_path.to_path_buf(),
                ));
            } else if local.mutable && !usage.mutated {
                warnings.push(CompilerWarning::new(
                    name,
                    local.location,
                    WarningKind::UnusedMutable,
                    self.context.file_path.to_path_buf(),
                ));
            }
        }

        (self.statements, self.locals, warnings)
    }

    pub(super) fn push_statement(&mut self, kind: HirStatementKind, location: TextLocation) {
        self.statements.push(HirStatement { kind, location });
    }

    // -----------------
    // Scopes and locals
    // -----------------
    pub(super) fn enter_scope(&mut self, location: TextLocation) -> ScopeId {
        let id = ScopeId(self.next_scope_id);
        self.next_scope_id += 1;
        self.scopes.push(ScopeFrame {
            id,
            names: FxHashMap::default(),
        });
        self.push_statement(HirStatementKind::EnterScope(id), location);
        id
    }

    pub(super) fn exit_scope(&mut self, location: TextLocation) {
        if let Some(frame) = self.scopes.pop() {
            self.push_statement(HirStatementKind::ExitScope(frame.id), location);
        }
    }

    fn current_scope(&self) -> ScopeId {
        self.scopes.last().map(|frame| frame.id).unwrap_or(ScopeId(0))
    }

    /// Creates a local in the current scope without making its name visible yet.
    pub(super) fn new_local(
        &mut self,
        name: StringId,
        ty: Ty,
        mutable: bool,
        location: TextLocation,
    ) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(HirLocal {
            id,
            name,
            ty,
            mutable,
            scope: self.current_scope(),
            param_index: None,
            synthetic: false,
            location,
        });
        self.usage.push(LocalUsage::default());
        id
    }

    /// Makes a local visible by name, shadowing any earlier binding with the same name.
    pub(super) fn bind_name(&mut self, local: LocalId) {
        let name = self.locals[local.0 as usize].name;
        if let Some(frame) = self.scopes.last_mut() {
            frame.names.insert(name, local);
        }
    }

    pub(super) fn new_synthetic_local(&mut self, ty: Ty, location: TextLocation) -> LocalId {
        let name = self.string_table.intern("<if>");
        let id = self.new_local(name, ty, false, location);
        self.locals[id.0 as usize].synthetic = true;
        id
    }

    pub(super) fn resolve_name(
        &mut self,
        name: StringId,
        location: TextLocation,
    ) -> Result<LocalId, CompilerError> {
        let found = self
            .scopes
            .iter()
            .rev()
            .find_map(|frame| frame.names.get(&name).copied());

        match found {
            Some(local) => {
                self.usage[local.0 as usize].used = true;
                Ok(local)
            }
            None => {
                return_rule_error!(
                    format!(
                        "Cannot find value '{}' in this scope",
                        self.string_table.resolve(name)
                    ),
                    location,
                    {
                        CompilationStage => "HIR Lowering",
                        VariableName => self.string_table.resolve(name),
                        PrimarySuggestion => "Declare the variable with 'let' before using it",
                    }
                )
            }
        }
    }

    pub(super) fn local_ty(&self, local: LocalId) -> &Ty {
        &self.locals[local.0 as usize].ty
    }

    pub(super) fn mark_mutated(&mut self, local: LocalId) {
        self.usage[local.0 as usize].mutated = true;
    }

    /// `let x;` locals get their type from the first value assigned to them
    pub(super) fn refine_local_type(&mut self, local: LocalId, ty: &Ty) {
        let slot = &mut self.locals[local.0 as usize].ty;
        if matches!(slot, Ty::Unknown) {
            *slot = ty.clone();
        }
    }

    // -----------
    // Function body
    // -----------
    pub(super) fn lower_body(
        &mut self,
        body: &Block,
    ) -> Result<(), CompilerError> {
        let function = self.function;

        // Parameters live in their own scope around the body block
        self.enter_scope(function.location);
        for (index, param) in function.signature.params.iter().enumerate() {
            let local = self.new_local(param.name, param.ty.clone(), param.mutable, param.location);
            self.locals[local.0 as usize].param_index = Some(index);
            self.bind_name(local);
        }

        let target = if matches!(function.signature.return_type, Ty::Unit) {
            BlockTarget::Discard
        } else {
            BlockTarget::Return
        };

        self.lower_block(body, &target)?;
        self.exit_scope(body.close);

        Ok(())
    }

    pub(super) fn params(&self) -> Vec<LocalId> {
        self.locals
            .iter()
            .filter(|local| local.param_index.is_some())
            .map(|local| local.id)
            .collect()
    }
}
