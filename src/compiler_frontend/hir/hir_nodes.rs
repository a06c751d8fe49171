//! ============================================================
//!                         HIR Nodes
//! ============================================================
//! A resolved, linear representation of snippet functions.
//!  - Every name is resolved to a LocalId or FunctionId
//!  - Every place use says how it is used: copy, move, read or borrow
//!  - Scopes and branches are explicit marker statements
//!  - A program point is the index of a statement in its function body
//!
//! The borrow checker walks the body in program point order, so nothing in
//! here is a tree once it leaves an expression.

use crate::compiler_frontend::ast::ast_nodes::Ty;
use crate::compiler_frontend::string_interning::StringId;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use std::fmt;

// ============================================================
// Stable IDs
// ============================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// Index of a statement in a function body
pub type ProgramPoint = usize;

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local#{}", self.0)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

// ============================================================
// Module
// ============================================================
#[derive(Debug, Clone, Default)]
pub struct HirModule {
    /// Prelude declarations first, then user functions in declaration order
    pub functions: Vec<HirFunction>,
}

impl HirModule {
    /// User written functions in declaration order
    pub fn checked_functions(&self) -> impl Iterator<Item = &HirFunction> {
        self.functions.iter().filter(|function| !function.from_prelude)
    }
}

// ============================================================
// Functions
// ============================================================
#[derive(Debug, Clone)]
pub struct HirFunction {
    pub id: FunctionId,
    pub owner: Option<StringId>,

    // "Owner::name" or "name"
    pub display_name: String,
    pub signature: FunctionSignature,

    // Locals are indexed by LocalId, params come first
    pub locals: Vec<HirLocal>,
    pub params: Vec<LocalId>,
    pub body: Option<Vec<HirStatement>>,
    pub location: TextLocation,
    pub from_prelude: bool,
}

impl HirFunction {
    pub fn local(&self, id: LocalId) -> &HirLocal {
        &self.locals[id.0 as usize]
    }

    pub fn statements(&self) -> &[HirStatement] {
        self.body.as_deref().unwrap_or_default()
    }
}

/// The declared shape of a function, with `Self` already replaced by the owner type.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub params: Vec<SignatureParam>,
    pub return_type: Ty,

    // Declared on the function or on its impl block
    pub lifetimes: Vec<StringId>,
    pub generics: Vec<StringId>,
    pub has_receiver: bool,
}

#[derive(Debug, Clone)]
pub struct SignatureParam {
    pub name: StringId,
    pub ty: Ty,
    pub mutable: bool,
    pub location: TextLocation,
}

#[derive(Debug, Clone)]
pub struct HirLocal {
    pub id: LocalId,
    pub name: StringId,
    pub ty: Ty,
    pub mutable: bool,
    pub scope: ScopeId,

    // Index into the signature params for parameters
    pub param_index: Option<usize>,

    // Compiler made temporaries for if expressions in value position
    pub synthetic: bool,
    pub location: TextLocation,
}

// ============================================================
// Places
// ============================================================

/// How a dereference reaches its target. This decides whether the
/// target can be written to or moved out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerefKind {
    Shared,
    Unique,
    Boxed,
}

#[derive(Debug, Clone)]
pub enum IndexOperand {
    Constant(i64),

    // Any other index, including ranges. The operands are evaluated before the access.
    Dynamic(Vec<HirExpression>),
}

#[derive(Debug, Clone)]
pub enum Projection {
    Deref(DerefKind),
    Field(StringId),
    Index(IndexOperand),
}

#[derive(Debug, Clone)]
pub struct HirPlace {
    pub root: LocalId,
    pub projections: Vec<Projection>,
    pub ty: Ty,
}

impl HirPlace {
    pub fn local(root: LocalId, ty: Ty) -> Self {
        Self {
            root,
            projections: Vec::new(),
            ty,
        }
    }

    pub fn project(mut self, projection: Projection, ty: Ty) -> Self {
        self.projections.push(projection);
        self.ty = ty;
        self
    }

    pub fn is_root(&self) -> bool {
        self.projections.is_empty()
    }

    pub fn has_deref(&self) -> bool {
        self.projections
            .iter()
            .any(|projection| matches!(projection, Projection::Deref(_)))
    }
}

// ============================================================
// Statements
// ============================================================
#[derive(Debug, Clone)]
pub struct HirStatement {
    pub kind: HirStatementKind,
    pub location: TextLocation,
}

#[derive(Debug, Clone)]
pub enum HirStatementKind {
    EnterScope(ScopeId),

    // Every local declared in the scope dies here
    ExitScope(ScopeId),

    // `let x;` has no value and leaves x uninitialized
    Let {
        local: LocalId,
        value: Option<HirExpression>,
    },
    Assign {
        target: HirPlace,
        value: HirExpression,
    },

    // `target op= value` reads and writes the target
    CompoundAssign {
        target: HirPlace,
        value: HirExpression,
    },
    Expression(HirExpression),
    Return(Option<HirExpression>),

    // Both arms always exist, an `if` without `else` has an empty else arm
    If {
        condition: HirExpression,
    },
    Else,
    EndIf,
}

// ============================================================
// Expressions
// ============================================================
#[derive(Debug, Clone)]
pub struct HirExpression {
    pub kind: HirExpressionKind,
    pub ty: Ty,
    pub location: TextLocation,
}

impl HirExpression {
    pub fn new(kind: HirExpressionKind, ty: Ty, location: TextLocation) -> Self {
        Self { kind, ty, location }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorrowKind {
    Shared,
    Unique,
}

#[derive(Debug, Clone)]
pub enum HirExpressionKind {
    // Numbers, bools, chars and ()
    Literal,

    // String literals are &'static str, they hold no loans
    StrLiteral,

    Copy(HirPlace),
    Move(HirPlace),

    // A temporary shared access whose result is not kept,
    // like the operands of `==` or the arguments of `println!`
    Read(HirPlace),
    Borrow {
        place: HirPlace,
        kind: BorrowKind,
    },

    // `String::from("a").len()` borrows a temporary, which holds whatever the value holds
    BorrowTemporary(Box<HirExpression>),

    Call {
        function: FunctionId,
        args: Vec<HirExpression>,

        // The receiver's `&mut` autoref is taken after the other arguments are evaluated
        two_phase: bool,

        // Whether the result type can carry loans back to the caller
        returns_reference: bool,
    },

    // Struct literals, tuples, arrays and vec![..]
    Aggregate(Vec<HirExpression>),

    // format!, println! and friends
    Format(Vec<HirExpression>),

    Binary {
        left: Box<HirExpression>,
        right: Box<HirExpression>,
    },
    Unary {
        value: Box<HirExpression>,
    },
    Cast(Box<HirExpression>),

    // Field, index or deref of a value that has no place, like `make_pair().0`
    Project(Box<HirExpression>),
}
