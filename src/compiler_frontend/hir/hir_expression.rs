//! HIR Expression Lowering
//!
//! Turns AST expressions into HIR expressions. This is where every use of a
//! place gets its access kind:
//! - values are copied or moved depending on their type
//! - operands of comparisons and formatting macros are only read
//! - method receivers are auto-referenced the way their `self` parameter asks for
//! - field and index access looks through references and boxes

use crate::compiler_frontend::ast::ast_nodes::{Expression, ExpressionKind, Ty};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::datatypes::{bind_generics, substitute};
use crate::compiler_frontend::hir::hir_builder::HirBuilder;
use crate::compiler_frontend::hir::hir_nodes::{
    BorrowKind, DerefKind, FunctionId, HirExpression, HirExpressionKind, HirPlace, HirStatementKind,
    IndexOperand, Projection,
};
use crate::compiler_frontend::hir::hir_statement::BlockTarget;
use crate::compiler_frontend::string_interning::StringId;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::{hir_log, return_rule_error, return_type_error};
use rustc_hash::FxHashMap;

// Macros whose arguments are only read, and the type they evaluate to
const FORMAT_MACROS: [(&str, bool); 11] = [
    ("format", true),
    ("println", false),
    ("print", false),
    ("eprintln", false),
    ("eprint", false),
    ("panic", false),
    ("assert", false),
    ("assert_eq", false),
    ("assert_ne", false),
    ("write", false),
    ("writeln", false),
];

/// Variables, fields, indexes and dereferences of those.
/// Anything else is a temporary value with no place to borrow from.
pub(super) fn is_place_syntax(expression: &Expression) -> bool {
    match &expression.kind {
        ExpressionKind::Variable(_) => true,
        ExpressionKind::Field { base, .. } | ExpressionKind::Index { base, .. } => {
            is_place_syntax(base)
        }
        ExpressionKind::Deref(inner) => is_place_syntax(inner),
        _ => false,
    }
}

/// Names captured inline by a format string, like `x` in "{x}" or "{x:?}"
pub(super) fn format_captures(text: &str) -> Vec<&str> {
    let mut captures = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        rest = &rest[open + 1..];
        if rest.starts_with('{') {
            rest = &rest[1..];
            continue;
        }

        let Some(close) = rest.find('}') else {
            break;
        };

        let inner = &rest[..close];
        let name = inner.split(':').next().unwrap_or_default().trim();
        let is_identifier = name
            .chars()
            .next()
            .is_some_and(|first| first.is_alphabetic() || first == '_')
            && name.chars().all(|c| c.is_alphanumeric() || c == '_');

        if is_identifier {
            captures.push(name);
        }
        rest = &rest[close + 1..];
    }

    captures
}

impl HirBuilder<'_, '_> {
    // ----------
    // Type names
    // ----------
    fn primitive(&mut self, name: &str) -> Ty {
        Ty::named(self.string_table.intern(name))
    }

    /// The type `Self` stands for in the current function. The receiver carries the
    /// impl block's generic arguments when there is one.
    fn current_self_type(&self) -> Option<Ty> {
        let owner = self.function.owner?;
        let signature = &self.function.signature;

        if signature.has_receiver
            && let Some(receiver) = signature.params.first()
        {
            let mut ty = &receiver.ty;
            while let Ty::Reference { inner, .. } = ty {
                ty = inner;
            }
            return Some(ty.clone());
        }

        Some(self.type_table().self_type(owner, &[]))
    }

    /// A type written inside the function body, with `Self` replaced
    pub(super) fn declared_type(&self, ty: &Ty) -> Ty {
        let generics = self
            .function
            .signature
            .generics
            .iter()
            .map(|generic| (*generic, Ty::Generic(*generic)))
            .collect::<FxHashMap<_, _>>();

        substitute(ty, self.current_self_type().as_ref(), &generics)
    }

    // ------
    // Values
    // ------
    pub(super) fn lower_value(
        &mut self,
        expression: &Expression,
    ) -> Result<HirExpression, CompilerError> {
        let location = expression.location;

        let (kind, ty) = match &expression.kind {
            ExpressionKind::Int(_) => (HirExpressionKind::Literal, self.primitive("i32")),
            ExpressionKind::Float(_) => (HirExpressionKind::Literal, self.primitive("f64")),
            ExpressionKind::Bool(_) => (HirExpressionKind::Literal, self.primitive("bool")),
            ExpressionKind::Char(_) => (HirExpressionKind::Literal, self.primitive("char")),
            ExpressionKind::Unit => (HirExpressionKind::Literal, Ty::Unit),

            ExpressionKind::Str(_) => {
                let names = &self.type_table().names;
                let ty = Ty::Reference {
                    lifetime: Some(names.static_lifetime),
                    mutable: false,
                    inner: Box::new(Ty::named(names.str_)),
                };
                (HirExpressionKind::StrLiteral, ty)
            }

            ExpressionKind::Variable(_)
            | ExpressionKind::Field { .. }
            | ExpressionKind::Index { .. }
            | ExpressionKind::Deref(_) => {
                if let Some(place) = self.lower_place(expression)? {
                    return Ok(self.place_value(place, location));
                }
                return self.lower_projected_temporary(expression);
            }

            ExpressionKind::Borrow { mutable, value } => {
                return self.lower_borrow(value, *mutable, location);
            }

            ExpressionKind::Call { path, args } => return self.lower_call(path, args, location),

            ExpressionKind::MethodCall {
                receiver,
                method,
                args,
            } => return self.lower_method_call(receiver, *method, args, location),

            ExpressionKind::Macro { name, args } => return self.lower_macro(*name, args, location),

            ExpressionKind::StructLiteral { name, fields, base } => {
                return self.lower_struct_literal(*name, fields, base.as_deref(), location);
            }

            ExpressionKind::Tuple(items) => {
                let values = self.lower_values(items)?;
                let ty = Ty::Tuple(values.iter().map(|value| value.ty.clone()).collect());
                (HirExpressionKind::Aggregate(values), ty)
            }

            ExpressionKind::Array(items) => {
                let values = self.lower_values(items)?;
                let ty = Ty::Array {
                    element: Box::new(
                        values
                            .first()
                            .map(|value| value.ty.clone())
                            .unwrap_or(Ty::Unknown),
                    ),
                    length: Some(values.len() as u64),
                };
                (HirExpressionKind::Aggregate(values), ty)
            }

            // A range outside of an index, like `0..n` passed as a value
            ExpressionKind::Range { start, end } => {
                let mut values = Vec::new();
                for bound in [start, end].into_iter().flatten() {
                    values.push(self.lower_value(bound)?);
                }
                (HirExpressionKind::Aggregate(values), Ty::Unknown)
            }

            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => {
                if operator.is_comparison() {
                    let left = self.lower_read(left)?;
                    let right = self.lower_read(right)?;
                    let ty = self.primitive("bool");
                    (
                        HirExpressionKind::Binary {
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        ty,
                    )
                } else {
                    let left = self.lower_value(left)?;
                    let right = self.lower_value(right)?;
                    let ty = if operator.is_logical() {
                        self.primitive("bool")
                    } else if matches!(left.ty, Ty::Unknown) {
                        right.ty.clone()
                    } else {
                        left.ty.clone()
                    };
                    (
                        HirExpressionKind::Binary {
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        ty,
                    )
                }
            }

            ExpressionKind::Unary { value, .. } => {
                let value = self.lower_value(value)?;
                let ty = value.ty.clone();
                (
                    HirExpressionKind::Unary {
                        value: Box::new(value),
                    },
                    ty,
                )
            }

            ExpressionKind::Cast { value, ty } => {
                let value = self.lower_value(value)?;
                (HirExpressionKind::Cast(Box::new(value)), self.declared_type(ty))
            }

            // An if in value position gets a temporary local that both arms assign to
            ExpressionKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let local = self.new_synthetic_local(Ty::Unknown, location);
                self.push_statement(HirStatementKind::Let { local, value: None }, location);

                let target = BlockTarget::Assign(HirPlace::local(local, Ty::Unknown));
                self.lower_if(condition, then_block, else_block.as_ref(), &target, location)?;

                let place = HirPlace::local(local, self.local_ty(local).clone());
                return Ok(self.place_value(place, location));
            }
        };

        Ok(HirExpression::new(kind, ty, location))
    }

    fn lower_values(
        &mut self,
        expressions: &[Expression],
    ) -> Result<Vec<HirExpression>, CompilerError> {
        expressions
            .iter()
            .map(|expression| self.lower_value(expression))
            .collect()
    }

    /// Using a place as a value copies it when its type allows, otherwise moves it.
    pub(super) fn place_value(&self, place: HirPlace, location: TextLocation) -> HirExpression {
        let ty = place.ty.clone();
        let kind = if self.type_table().is_copy(&ty) {
            HirExpressionKind::Copy(place)
        } else {
            HirExpressionKind::Move(place)
        };
        HirExpression::new(kind, ty, location)
    }

    /// A shared access that does not keep the value, like the operands of `==`
    pub(super) fn lower_read(
        &mut self,
        expression: &Expression,
    ) -> Result<HirExpression, CompilerError> {
        match self.lower_place(expression)? {
            Some(place) => {
                let ty = place.ty.clone();
                Ok(HirExpression::new(HirExpressionKind::Read(place), ty, expression.location))
            }
            None => self.lower_value(expression),
        }
    }

    // Field, index or deref of something that is not a place, like `make_pair().0`
    fn lower_projected_temporary(
        &mut self,
        expression: &Expression,
    ) -> Result<HirExpression, CompilerError> {
        let location = expression.location;

        let (base, ty) = match &expression.kind {
            ExpressionKind::Field { base, field } => {
                let base = self.lower_value(base)?;
                let ty = self
                    .type_table()
                    .field_type(&peel_references(&base.ty), *field, self.string_table)
                    .unwrap_or(Ty::Unknown);
                (base, ty)
            }
            ExpressionKind::Index { base, index } => {
                let range = matches!(index.kind, ExpressionKind::Range { .. });
                let base = self.lower_value(base)?;
                let ty = self
                    .type_table()
                    .element_type(&peel_references(&base.ty), range)
                    .unwrap_or(Ty::Unknown);

                // The index operand is still evaluated
                self.lower_value(index)?;
                (base, ty)
            }
            ExpressionKind::Deref(inner) => {
                let base = self.lower_value(inner)?;
                let ty = self.type_table().deref_type(&base.ty).unwrap_or(Ty::Unknown);
                (base, ty)
            }
            _ => return self.lower_value(expression),
        };

        Ok(HirExpression::new(HirExpressionKind::Project(Box::new(base)), ty, location))
    }

    // ------
    // Places
    // ------

    /// Resolves a place expression. Returns None for expressions that are not places.
    pub(super) fn lower_place(
        &mut self,
        expression: &Expression,
    ) -> Result<Option<HirPlace>, CompilerError> {
        if !is_place_syntax(expression) {
            return Ok(None);
        }

        let location = expression.location;

        let place = match &expression.kind {
            ExpressionKind::Variable(name) => {
                let local = self.resolve_name(*name, location)?;
                HirPlace::local(local, self.local_ty(local).clone())
            }

            ExpressionKind::Field { base, field } => {
                let Some(place) = self.lower_place(base)? else {
                    return Ok(None);
                };
                let place = self.auto_deref(place);

                let ty = match &place.ty {
                    Ty::Unknown => Ty::Unknown,
                    base_ty => match self
                        .type_table()
                        .field_type(base_ty, *field, self.string_table)
                    {
                        Some(ty) => ty,
                        None => {
                            let type_name = base_ty.display(self.string_table);
                            let field_name = self.string_table.resolve(*field);
                            return_type_error!(
                                format!("No field '{field_name}' on type '{type_name}'"),
                                location,
                                {
                                    CompilationStage => "HIR Lowering",
                                    FoundType => type_name,
                                    VariableName => field_name,
                                }
                            )
                        }
                    },
                };

                place.project(Projection::Field(*field), ty)
            }

            ExpressionKind::Index { base, index } => {
                let Some(place) = self.lower_place(base)? else {
                    return Ok(None);
                };
                let place = self.auto_deref(place);

                let range = matches!(index.kind, ExpressionKind::Range { .. });
                let operand = match &index.kind {
                    ExpressionKind::Int(value) => IndexOperand::Constant(*value),
                    ExpressionKind::Range { start, end } => {
                        let mut operands = Vec::new();
                        for bound in [start, end].into_iter().flatten() {
                            operands.push(self.lower_value(bound)?);
                        }
                        IndexOperand::Dynamic(operands)
                    }
                    _ => IndexOperand::Dynamic(vec![self.lower_value(index)?]),
                };

                let Some(ty) = self.type_table().element_type(&place.ty, range) else {
                    let type_name = place.ty.display(self.string_table);
                    return_type_error!(format!("Cannot index into a value of type '{type_name}'"), location, {
                        CompilationStage => "HIR Lowering",
                        FoundType => type_name,
                    })
                };

                place.project(Projection::Index(operand), ty)
            }

            ExpressionKind::Deref(inner) => {
                let Some(place) = self.lower_place(inner)? else {
                    return Ok(None);
                };

                let (Some(kind), Some(ty)) = (
                    self.deref_kind(&place.ty),
                    self.type_table().deref_type(&place.ty),
                )
                else {
                    let type_name = place.ty.display(self.string_table);
                    return_type_error!(format!("Type '{type_name}' cannot be dereferenced"), location, {
                        CompilationStage => "HIR Lowering",
                        FoundType => type_name,
                    })
                };

                place.project(Projection::Deref(kind), ty)
            }

            _ => return Ok(None),
        };

        Ok(Some(place))
    }

    fn deref_kind(&self, ty: &Ty) -> Option<DerefKind> {
        match ty {
            Ty::Reference { mutable: true, .. } => Some(DerefKind::Unique),
            Ty::Reference { mutable: false, .. } | Ty::Unknown => Some(DerefKind::Shared),
            Ty::Named { name, .. } if *name == self.type_table().names.boxed => {
                Some(DerefKind::Boxed)
            }
            _ => None,
        }
    }

    /// Field access, indexing and method receivers look through any number of references and boxes
    pub(super) fn auto_deref(&self, mut place: HirPlace) -> HirPlace {
        while !matches!(place.ty, Ty::Unknown)
            && let (Some(kind), Some(ty)) = (
                self.deref_kind(&place.ty),
                self.type_table().deref_type(&place.ty),
            )
        {
            place = place.project(Projection::Deref(kind), ty);
        }
        place
    }

    // -------
    // Borrows
    // -------
    fn lower_borrow(
        &mut self,
        value: &Expression,
        mutable: bool,
        location: TextLocation,
    ) -> Result<HirExpression, CompilerError> {
        match self.lower_place(value)? {
            Some(place) => {
                let kind = if mutable {
                    if !place.has_deref() {
                        self.mark_mutated(place.root);
                    }
                    BorrowKind::Unique
                } else {
                    BorrowKind::Shared
                };

                let ty = Ty::reference(place.ty.clone(), mutable);
                Ok(HirExpression::new(HirExpressionKind::Borrow { place, kind }, ty, location))
            }

            // `&&x` borrows the temporary reference made by the inner `&x`
            None if matches!(value.kind, ExpressionKind::Borrow { .. }) => {
                let value = self.lower_value(value)?;
                let ty = Ty::reference(value.ty.clone(), mutable);
                Ok(HirExpression::new(
                    HirExpressionKind::BorrowTemporary(Box::new(value)),
                    ty,
                    location,
                ))
            }

            None => {
                return_rule_error!("Cannot borrow a value that has no place", value.location, {
                    CompilationStage => "HIR Lowering",
                    BorrowKind => if mutable { "Unique" } else { "Shared" },
                    PrimarySuggestion => "Bind the value to a variable with 'let' and borrow the variable",
                })
            }
        }
    }

    // -----
    // Calls
    // -----
    fn lower_call(
        &mut self,
        path: &[StringId],
        args: &[Expression],
        location: TextLocation,
    ) -> Result<HirExpression, CompilerError> {
        // Tuple struct constructors look like calls
        if let [name] = path
            && self.context.lookup(None, *name).is_none()
            && let Some(layout) = self.type_table().struct_layout(*name)
        {
            if layout.fields.len() != args.len() {
                return_rule_error!(
                    format!(
                        "'{}' has {} fields but {} were supplied",
                        self.string_table.resolve(*name),
                        layout.fields.len(),
                        args.len()
                    ),
                    location,
                    {
                        CompilationStage => "HIR Lowering",
                    }
                )
            }

            let values = self.lower_values(args)?;
            let ty = Ty::Named {
                name: *name,
                lifetimes: layout.lifetimes.clone(),
                args: Vec::new(),
            };
            return Ok(HirExpression::new(HirExpressionKind::Aggregate(values), ty, location));
        }

        let function_id = self.resolve_function_path(path, location)?;
        let context = self.context;
        let function = context.function(function_id);

        self.check_arity(function_id, function.signature.params.len(), args.len(), location)?;

        let mut lowered = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&function.signature.params) {
            lowered.push(self.lower_argument(arg, &param.ty)?);
        }

        Ok(self.finish_call(function_id, lowered, false, location))
    }

    fn resolve_function_path(
        &mut self,
        path: &[StringId],
        location: TextLocation,
    ) -> Result<FunctionId, CompilerError> {
        let names = &self.type_table().names;

        if let [.., owner, name] = path {
            let owner = if *owner == names.self_type {
                self.function.owner.unwrap_or(*owner)
            } else {
                *owner
            };

            if let Some(id) = self.context.lookup(Some(owner), *name) {
                return Ok(id);
            }

            // `String::len` and friends are declared on str
            if owner == names.string
                && let Some(id) = self.context.lookup(Some(names.str_), *name)
            {
                return Ok(id);
            }
        }

        // `std::mem::drop(x)` resolves to the free function `drop`
        if let Some(name) = path.last()
            && let Some(id) = self.context.lookup(None, *name)
        {
            return Ok(id);
        }

        let written = path
            .iter()
            .map(|segment| self.string_table.resolve(*segment))
            .collect::<Vec<_>>()
            .join("::");

        return_rule_error!(format!("Cannot find function '{written}' in this scope"), location, {
            CompilationStage => "HIR Lowering",
            VariableName => written,
        })
    }

    fn check_arity(
        &self,
        function_id: FunctionId,
        expected: usize,
        supplied: usize,
        location: TextLocation,
    ) -> Result<(), CompilerError> {
        if expected == supplied {
            return Ok(());
        }

        let function = self.context.function(function_id);
        return_rule_error!(
            format!(
                "'{}' takes {expected} argument{} but {supplied} {} supplied",
                function.display_name,
                if expected == 1 { "" } else { "s" },
                if supplied == 1 { "was" } else { "were" },
            ),
            location,
            {
                CompilationStage => "HIR Lowering",
                PrimarySuggestion => format!("Check the signature of '{}'", function.display_name),
            }
        )
    }

    /// A `&mut` parameter given a `&mut` variable reborrows it instead of moving the reference out.
    fn lower_argument(
        &mut self,
        arg: &Expression,
        param_ty: &Ty,
    ) -> Result<HirExpression, CompilerError> {
        if !param_ty.is_mutable_reference() {
            return self.lower_value(arg);
        }

        match self.lower_place(arg)? {
            Some(place) if place.ty.is_mutable_reference() => {
                let ty = place.ty.clone();
                let inner = self.type_table().deref_type(&ty).unwrap_or(Ty::Unknown);
                let place = place.project(Projection::Deref(DerefKind::Unique), inner);
                Ok(HirExpression::new(
                    HirExpressionKind::Borrow {
                        place,
                        kind: BorrowKind::Unique,
                    },
                    ty,
                    arg.location,
                ))
            }
            Some(place) => Ok(self.place_value(place, arg.location)),
            None => self.lower_value(arg),
        }
    }

    /// Binds generic parameters from the argument types and works out the result type.
    fn finish_call(
        &mut self,
        function_id: FunctionId,
        args: Vec<HirExpression>,
        two_phase: bool,
        location: TextLocation,
    ) -> HirExpression {
        let context = self.context;
        let function = context.function(function_id);
        let type_table = self.type_table();

        let mut bindings = FxHashMap::default();
        for (param, arg) in function.signature.params.iter().zip(&args) {
            bind_generics(&param.ty, &arg.ty, type_table.names.vec, &mut bindings);
        }

        let ty = substitute(&function.signature.return_type, None, &bindings);
        let returns_reference = type_table.contains_reference(&ty);

        hir_log!(
            "call to '{}' returns {}{}",
            function.display_name,
            ty.display(self.string_table),
            if returns_reference { " (may hold loans)" } else { "" }
        );

        HirExpression::new(
            HirExpressionKind::Call {
                function: function_id,
                args,
                two_phase,
                returns_reference,
            },
            ty,
            location,
        )
    }

    fn lower_method_call(
        &mut self,
        receiver: &Expression,
        method: StringId,
        args: &[Expression],
        location: TextLocation,
    ) -> Result<HirExpression, CompilerError> {
        let receiver_place = self.lower_place(receiver)?;
        let receiver_value = match receiver_place {
            Some(_) => None,
            None => Some(self.lower_value(receiver)?),
        };

        let receiver_ty = match (&receiver_place, &receiver_value) {
            (Some(place), _) => place.ty.clone(),
            (None, Some(value)) => value.ty.clone(),
            (None, None) => Ty::Unknown,
        };

        let function_id = self.resolve_method(&receiver_ty, method, location)?;
        let context = self.context;
        let function = context.function(function_id);

        let Some(self_param) = function
            .signature
            .params
            .first()
            .filter(|_| function.signature.has_receiver)
        else {
            return_rule_error!(
                format!("'{}' is an associated function, not a method", function.display_name),
                location,
                {
                    CompilationStage => "HIR Lowering",
                    PrimarySuggestion => format!("Call it as '{}(..)'", function.display_name),
                }
            )
        };

        self.check_arity(function_id, function.signature.params.len() - 1, args.len(), location)?;

        let mut two_phase = false;
        let receiver = match (&self_param.ty, receiver_place, receiver_value) {
            // &self and &mut self autoref the receiver
            (Ty::Reference { mutable, .. }, Some(place), _) => {
                let place = self.auto_deref(place);
                let kind = if *mutable {
                    if !place.has_deref() {
                        self.mark_mutated(place.root);
                    }
                    two_phase = true;
                    BorrowKind::Unique
                } else {
                    BorrowKind::Shared
                };

                let ty = Ty::reference(place.ty.clone(), *mutable);
                HirExpression::new(HirExpressionKind::Borrow { place, kind }, ty, receiver.location)
            }

            (Ty::Reference { .. }, None, Some(value)) if value.ty.is_reference() => value,

            (Ty::Reference { mutable, .. }, None, Some(value)) => {
                let ty = Ty::reference(value.ty.clone(), *mutable);
                HirExpression::new(
                    HirExpressionKind::BorrowTemporary(Box::new(value)),
                    ty,
                    receiver.location,
                )
            }

            // self by value
            (_, Some(place), _) => {
                let place = self.auto_deref(place);
                self.place_value(place, receiver.location)
            }
            (_, None, Some(value)) => value,
            (_, None, None) => {
                HirExpression::new(HirExpressionKind::Literal, Ty::Unknown, receiver.location)
            }
        };

        let mut lowered = Vec::with_capacity(args.len() + 1);
        lowered.push(receiver);
        for (arg, param) in args.iter().zip(&function.signature.params[1..]) {
            lowered.push(self.lower_argument(arg, &param.ty)?);
        }

        Ok(self.finish_call(function_id, lowered, two_phase, location))
    }

    fn resolve_method(
        &mut self,
        receiver_ty: &Ty,
        method: StringId,
        location: TextLocation,
    ) -> Result<FunctionId, CompilerError> {
        let names = &self.type_table().names;

        if let Some(owner) = self.type_table().method_owner(receiver_ty) {
            if let Some(id) = self.context.lookup(Some(owner), method) {
                return Ok(id);
            }

            if owner == names.string
                && let Some(id) = self.context.lookup(Some(names.str_), method)
            {
                return Ok(id);
            }
        }

        // Receivers of unknown type still resolve when only one impl has the method
        if let Some([only]) = self
            .context
            .functions
            .methods_by_name
            .get(&method)
            .map(Vec::as_slice)
        {
            return Ok(*only);
        }

        let method_name = self.string_table.resolve(method).to_owned();
        let type_name = receiver_ty.display(self.string_table);
        return_rule_error!(
            format!("No method named '{method_name}' found for type '{type_name}'"),
            location,
            {
                CompilationStage => "HIR Lowering",
                FoundType => type_name,
                VariableName => method_name,
            }
        )
    }

    // ------
    // Macros
    // ------
    fn lower_macro(
        &mut self,
        name: StringId,
        args: &[Expression],
        location: TextLocation,
    ) -> Result<HirExpression, CompilerError> {
        let macro_name = self.string_table.resolve(name).to_owned();

        if macro_name == "vec" {
            let values = self.lower_values(args)?;
            let element = values.first().map(|value| value.ty.clone()).unwrap_or(Ty::Unknown);
            let ty = Ty::Named {
                name: self.type_table().names.vec,
                lifetimes: Vec::new(),
                args: vec![element],
            };
            return Ok(HirExpression::new(HirExpressionKind::Aggregate(values), ty, location));
        }

        let writes_destination = macro_name == "write" || macro_name == "writeln";

        let mut operands = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            if index == 0 && writes_destination {
                operands.push(self.lower_write_destination(arg)?);
                continue;
            }

            if let ExpressionKind::Str(text) = arg.kind {
                let text = self.string_table.resolve(text).to_owned();
                for captured in format_captures(&text) {
                    let captured = self.string_table.intern(captured);
                    let local = self.resolve_name(captured, arg.location)?;
                    let place = HirPlace::local(local, self.local_ty(local).clone());
                    let ty = place.ty.clone();
                    operands.push(HirExpression::new(
                        HirExpressionKind::Read(place),
                        ty,
                        arg.location,
                    ));
                }
            }

            operands.push(self.lower_read(arg)?);
        }

        let ty = match FORMAT_MACROS.iter().find(|(known, _)| *known == macro_name) {
            Some((_, true)) => Ty::named(self.type_table().names.string),
            Some((_, false)) => Ty::Unit,
            None => Ty::Unknown,
        };

        Ok(HirExpression::new(HirExpressionKind::Format(operands), ty, location))
    }

    // `write!(s, ..)` writes into its first argument
    fn lower_write_destination(
        &mut self,
        arg: &Expression,
    ) -> Result<HirExpression, CompilerError> {
        let Some(place) = self.lower_place(arg)? else {
            return self.lower_value(arg);
        };

        let place = self.auto_deref(place);
        if !place.has_deref() {
            self.mark_mutated(place.root);
        }

        let ty = Ty::reference(place.ty.clone(), true);
        Ok(HirExpression::new(
            HirExpressionKind::Borrow {
                place,
                kind: BorrowKind::Unique,
            },
            ty,
            arg.location,
        ))
    }

    // ---------------
    // Struct literals
    // ---------------
    fn lower_struct_literal(
        &mut self,
        name: StringId,
        fields: &[(StringId, Expression)],
        base: Option<&Expression>,
        location: TextLocation,
    ) -> Result<HirExpression, CompilerError> {
        let type_table = self.type_table();
        let Some(layout) = type_table.struct_layout(name) else {
            let struct_name = self.string_table.resolve(name);
            return_type_error!(format!("Cannot find struct '{struct_name}'"), location, {
                CompilationStage => "HIR Lowering",
                FoundType => struct_name,
            })
        };

        // Written fields are evaluated in source order
        let mut values = Vec::with_capacity(layout.fields.len());
        for (field, value) in fields {
            if layout.field(*field).is_none() {
                let struct_name = self.string_table.resolve(name).to_owned();
                let field_name = self.string_table.resolve(*field).to_owned();
                return_type_error!(
                    format!("Struct '{struct_name}' has no field named '{field_name}'"),
                    value.location,
                    {
                        CompilationStage => "HIR Lowering",
                        FoundType => struct_name,
                        VariableName => field_name,
                    }
                )
            }
            values.push(self.lower_value(value)?);
        }

        let base_place = match base {
            Some(base) => match self.lower_place(base)? {
                Some(place) => Some(self.auto_deref(place)),
                None => {
                    return_rule_error!("The '..' base of a struct literal has to be a variable or field", base.location, {
                        CompilationStage => "HIR Lowering",
                        PrimarySuggestion => "Bind the base value to a variable first",
                    })
                }
            },
            None => None,
        };

        // Then every field that was not written comes from the base
        for definition in &layout.fields {
            if fields.iter().any(|(written, _)| *written == definition.name) {
                continue;
            }

            let Some(base_place) = &base_place else {
                let struct_name = self.string_table.resolve(name).to_owned();
                let field_name = self.string_table.resolve(definition.name).to_owned();
                return_type_error!(
                    format!("Missing field '{field_name}' in initializer of '{struct_name}'"),
                    location,
                    {
                        CompilationStage => "HIR Lowering",
                        VariableName => field_name,
                        PrimarySuggestion => "Write the field out or add a '..base' value",
                    }
                )
            };

            let field_place = base_place
                .clone()
                .project(Projection::Field(definition.name), definition.ty.clone());
            values.push(self.place_value(field_place, location));
        }

        let ty = Ty::Named {
            name,
            lifetimes: layout.lifetimes.clone(),
            args: Vec::new(),
        };
        Ok(HirExpression::new(HirExpressionKind::Aggregate(values), ty, location))
    }
}

fn peel_references(ty: &Ty) -> Ty {
    match ty {
        Ty::Reference { inner, .. } => peel_references(inner),
        _ => ty.clone(),
    }
}
