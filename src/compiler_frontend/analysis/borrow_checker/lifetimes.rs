//! Signature lifetimes.
//!
//! Works out which parameters a function's returned references can borrow from.
//! Callers use this to hand the right argument loans to the call result, and the
//! function itself uses it to decide which parameters may flow out of its body.
//!
//! Elision follows the usual three rules:
//!  1. every elided input lifetime is a separate lifetime
//!  2. with exactly one input lifetime, outputs get that lifetime
//!  3. with a `&self` or `&mut self` receiver, outputs get the receiver's lifetime
//!
//! Anything else that returns a borrowed value is ambiguous.

use crate::compiler_frontend::analysis::borrow_checker::types::FunctionReturnAliasSummary;
use crate::compiler_frontend::ast::ast_nodes::Ty;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::TypeTable;
use crate::compiler_frontend::hir::hir_nodes::HirFunction;
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::new_compiler_error;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifetimeName {
    Static,
    Named(StringId),

    // Not written, or written as '_
    Elided,
}

#[derive(Debug, Clone, Copy)]
struct InputLifetime {
    param: usize,
    name: LifetimeName,
}

pub(crate) fn resolve_return_alias(
    function: &HirFunction,
    type_table: &TypeTable,
    string_table: &StringTable,
) -> (FunctionReturnAliasSummary, Option<CompilerError>) {
    match LifetimeResolver::new(function, type_table, string_table).resolve() {
        Ok(summary) => (summary, None),
        Err(error) => (FunctionReturnAliasSummary::Unknown, Some(error)),
    }
}

struct LifetimeResolver<'a> {
    function: &'a HirFunction,
    type_table: &'a TypeTable,
    string_table: &'a StringTable,
}

impl<'a> LifetimeResolver<'a> {
    fn new(
        function: &'a HirFunction,
        type_table: &'a TypeTable,
        string_table: &'a StringTable,
    ) -> Self {
        Self {
            function,
            type_table,
            string_table,
        }
    }

    fn resolve(&self) -> Result<FunctionReturnAliasSummary, CompilerError> {
        let signature = &self.function.signature;

        let mut inputs = Vec::new();
        for (index, param) in signature.params.iter().enumerate() {
            let mut names = Vec::new();
            self.collect_lifetimes(&param.ty, &mut names);
            for name in names {
                self.check_declared(name)?;
                inputs.push(InputLifetime { param: index, name });
            }
        }

        let mut outputs = Vec::new();
        self.collect_lifetimes(&signature.return_type, &mut outputs);

        let mut aliases = BTreeSet::new();

        for output in outputs {
            match output {
                LifetimeName::Static => {}
                LifetimeName::Named(name) => {
                    self.check_declared(output)?;

                    let tied = inputs
                        .iter()
                        .filter(|input| input.name == LifetimeName::Named(name))
                        .map(|input| input.param)
                        .collect::<Vec<_>>();

                    if tied.is_empty() {
                        let name = self.string_table.resolve(name);
                        return Err(self.ambiguous(
                            format!(
                                "Lifetime '{name} in the return type of '{}' is not tied to any parameter",
                                self.function.display_name
                            ),
                            format!("Use '{name} on the parameter the result borrows from"),
                        ));
                    }
                    aliases.extend(tied);
                }
                LifetimeName::Elided => {
                    aliases.extend(self.elided_output(&inputs)?);
                }
            }
        }

        // A generic result can be instantiated with a reference
        for generic in &signature.generics {
            if !mentions_generic(&signature.return_type, *generic) {
                continue;
            }
            for (index, param) in signature.params.iter().enumerate() {
                if mentions_generic(&param.ty, *generic) {
                    aliases.insert(index);
                }
            }
        }

        if aliases.is_empty() {
            Ok(FunctionReturnAliasSummary::Fresh)
        } else {
            Ok(FunctionReturnAliasSummary::AliasParams(aliases.into_iter().collect()))
        }
    }

    fn elided_output(&self, inputs: &[InputLifetime]) -> Result<Vec<usize>, CompilerError> {
        let signature = &self.function.signature;

        if let [only] = distinct_lifetimes(inputs).as_slice() {
            return Ok(only.clone());
        }

        let receiver_is_reference = signature.has_receiver
            && signature
                .params
                .first()
                .is_some_and(|receiver| receiver.ty.is_reference());
        if receiver_is_reference {
            return Ok(vec![0]);
        }

        if inputs.is_empty() {
            return Err(self.ambiguous(
                format!(
                    "Missing lifetime specifier: '{}' returns a borrowed value, but there is no parameter for it to be borrowed from",
                    self.function.display_name
                ),
                String::from("Return an owned value instead, or use the 'static lifetime for string literals"),
            ));
        }

        let candidates = inputs
            .iter()
            .map(|input| format!("'{}'", self.param_name(input.param)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join(" or ");

        Err(self.ambiguous(
            format!(
                "Missing lifetime specifier: the signature of '{}' does not say whether the returned reference is borrowed from {candidates}",
                self.function.display_name
            ),
            String::from("Introduce a named lifetime parameter, like fn name<'a>(x: &'a T, y: &'a T) -> &'a T"),
        ))
    }

    fn check_declared(&self, name: LifetimeName) -> Result<(), CompilerError> {
        let LifetimeName::Named(id) = name else {
            return Ok(());
        };

        if self.function.signature.lifetimes.contains(&id) {
            return Ok(());
        }

        let name = self.string_table.resolve(id);
        Err(self.ambiguous(
            format!("Use of undeclared lifetime name '{name}"),
            format!("Declare it with <'{name}> after the function name"),
        ))
    }

    fn collect_lifetimes(&self, ty: &Ty, out: &mut Vec<LifetimeName>) {
        match ty {
            Ty::Reference { lifetime, inner, .. } => {
                out.push(self.lifetime_name(*lifetime));
                self.collect_lifetimes(inner, out);
            }
            Ty::Named {
                name,
                lifetimes,
                args,
            } => {
                if lifetimes.is_empty() {
                    // `Parser` for a `struct Parser<'a>` elides each of its lifetimes
                    let declared = self
                        .type_table
                        .struct_layout(*name)
                        .map(|layout| layout.lifetimes.len())
                        .unwrap_or(0);
                    out.extend(std::iter::repeat_n(LifetimeName::Elided, declared));
                } else {
                    out.extend(
                        lifetimes
                            .iter()
                            .map(|lifetime| self.lifetime_name(Some(*lifetime))),
                    );
                }

                for arg in args {
                    self.collect_lifetimes(arg, out);
                }
            }
            Ty::Tuple(items) => {
                for item in items {
                    self.collect_lifetimes(item, out);
                }
            }
            Ty::Array { element, .. } => self.collect_lifetimes(element, out),
            Ty::Generic(_) | Ty::SelfType | Ty::Unit | Ty::Unknown => {}
        }
    }

    fn lifetime_name(&self, lifetime: Option<StringId>) -> LifetimeName {
        let names = &self.type_table.names;
        match lifetime {
            None => LifetimeName::Elided,
            Some(id) if id == names.anonymous_lifetime => LifetimeName::Elided,
            Some(id) if id == names.static_lifetime => LifetimeName::Static,
            Some(id) => LifetimeName::Named(id),
        }
    }

    fn param_name(&self, index: usize) -> &str {
        self.function
            .signature
            .params
            .get(index)
            .map(|param| self.string_table.resolve(param.name))
            .unwrap_or("_")
    }

    fn ambiguous(&self, msg: String, suggestion: String) -> CompilerError {
        new_compiler_error!(AmbiguousLifetime, msg, self.function.location, {
            CompilationStage => "Lifetime Resolution",
            LifetimeHint => "Outputs borrow from the only input lifetime, or from &self in methods",
            PrimarySuggestion => suggestion,
        })
        .with_function(self.function.display_name.clone())
    }
}

/// Parameters grouped by input lifetime. Every elided lifetime is its own group,
/// a named one covers every parameter that uses it.
fn distinct_lifetimes(inputs: &[InputLifetime]) -> Vec<Vec<usize>> {
    let mut groups: Vec<(LifetimeName, Vec<usize>)> = Vec::new();

    for input in inputs {
        let existing = match input.name {
            LifetimeName::Elided => None,
            name => groups.iter_mut().find(|(group, _)| *group == name),
        };

        match existing {
            Some((_, params)) => {
                if !params.contains(&input.param) {
                    params.push(input.param);
                }
            }
            None => groups.push((input.name, vec![input.param])),
        }
    }

    groups.into_iter().map(|(_, params)| params).collect()
}

fn mentions_generic(ty: &Ty, generic: StringId) -> bool {
    match ty {
        Ty::Generic(name) => *name == generic,
        Ty::Reference { inner, .. } => mentions_generic(inner, generic),
        Ty::Named { args, .. } => args.iter().any(|arg| mentions_generic(arg, generic)),
        Ty::Tuple(items) => items.iter().any(|item| mentions_generic(item, generic)),
        Ty::Array { element, .. } => mentions_generic(element, generic),
        Ty::SelfType | Ty::Unit | Ty::Unknown => false,
    }
}
