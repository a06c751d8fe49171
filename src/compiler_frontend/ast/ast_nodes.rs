use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;

/// Everything declared in one snippet file (plus the prelude once merged).
#[derive(Debug, Clone, Default)]
pub struct Ast {
    pub copy_types: Vec<(StringId, TextLocation)>,
    pub structs: Vec<StructDefinition>,
    pub functions: Vec<FunctionDefinition>,
}

impl Ast {
    /// Appends another parsed file, used to put the prelude in front of user code
    pub fn merge(&mut self, other: Ast) {
        self.copy_types.extend(other.copy_types);
        self.structs.extend(other.structs);
        self.functions.extend(other.functions);
    }
}

#[derive(Debug, Clone)]
pub struct StructDefinition {
    pub name: StringId,
    pub lifetimes: Vec<StringId>,
    pub fields: Vec<FieldDefinition>,
    pub location: TextLocation,
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: StringId,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: StringId,

    // The `impl` block this function was declared in, and that block's type parameters
    pub owner: Option<StringId>,
    pub owner_generics: Vec<StringId>,
    pub lifetimes: Vec<StringId>,
    pub generics: Vec<StringId>,

    // `self`, `&self` and `&mut self` are stored as the first param
    pub has_receiver: bool,
    pub params: Vec<Param>,
    pub return_type: Ty,

    // None for signature-only declarations such as the prelude
    pub body: Option<Block>,
    pub location: TextLocation,
    pub from_prelude: bool,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: StringId,
    pub mutable: bool,
    pub ty: Ty,
    pub location: TextLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Named {
        name: StringId,
        lifetimes: Vec<StringId>,
        args: Vec<Ty>,
    },
    Reference {
        lifetime: Option<StringId>,
        mutable: bool,
        inner: Box<Ty>,
    },
    Tuple(Vec<Ty>),

    // [T] and [T; N]
    Array {
        element: Box<Ty>,
        length: Option<u64>,
    },

    // A generic parameter of the enclosing function
    Generic(StringId),
    SelfType,
    Unit,
    Unknown,
}

impl Ty {
    pub fn named(name: StringId) -> Ty {
        Ty::Named {
            name,
            lifetimes: Vec::new(),
            args: Vec::new(),
        }
    }

    pub fn reference(inner: Ty, mutable: bool) -> Ty {
        Ty::Reference {
            lifetime: None,
            mutable,
            inner: Box::new(inner),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Ty::Reference { .. })
    }

    pub fn is_mutable_reference(&self) -> bool {
        matches!(self, Ty::Reference { mutable: true, .. })
    }

    pub fn display(&self, string_table: &StringTable) -> String {
        match self {
            Ty::Named {
                name,
                lifetimes,
                args,
            } => {
                let mut generic_parts = lifetimes
                    .iter()
                    .map(|lifetime| format!("'{}", string_table.resolve(*lifetime)))
                    .collect::<Vec<_>>();
                generic_parts.extend(args.iter().map(|arg| arg.display(string_table)));

                if generic_parts.is_empty() {
                    string_table.resolve(*name).to_owned()
                } else {
                    format!(
                        "{}<{}>",
                        string_table.resolve(*name),
                        generic_parts.join(", ")
                    )
                }
            }
            Ty::Reference {
                lifetime,
                mutable,
                inner,
            } => {
                let lifetime = lifetime
                    .map(|id| format!("'{} ", string_table.resolve(id)))
                    .unwrap_or_default();
                let mutability = if *mutable { "mut " } else { "" };
                format!("&{lifetime}{mutability}{}", inner.display(string_table))
            }
            Ty::Tuple(items) => format!(
                "({})",
                items
                    .iter()
                    .map(|item| item.display(string_table))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Ty::Array { element, length } => match length {
                Some(length) => format!("[{}; {length}]", element.display(string_table)),
                None => format!("[{}]", element.display(string_table)),
            },
            Ty::Generic(name) => string_table.resolve(*name).to_owned(),
            Ty::SelfType => String::from("Self"),
            Ty::Unit => String::from("()"),
            Ty::Unknown => String::from("_"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Statement>,

    // Final expression without a trailing ';'
    pub tail: Option<Box<Expression>>,
    pub location: TextLocation,

    // The closing '}', where the block's locals are dropped
    pub close: TextLocation,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: TextLocation,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Let {
        name: StringId,
        mutable: bool,
        ty: Option<Ty>,
        value: Option<Expression>,
    },
    Assign {
        target: Expression,
        value: Expression,
    },
    CompoundAssign {
        target: Expression,
        value: Expression,
    },
    Expression(Expression),
    Return(Option<Expression>),
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: TextLocation,
}

impl Expression {
    pub fn new(kind: ExpressionKind, location: TextLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(StringId),
    Char(char),
    Unit,

    // Includes `self`
    Variable(StringId),

    // Named fields and tuple fields (`pair.0` is stored as field "0")
    Field {
        base: Box<Expression>,
        field: StringId,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Range {
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
    },
    Deref(Box<Expression>),
    Borrow {
        mutable: bool,
        value: Box<Expression>,
    },

    // `longest(a, b)` has the path [longest], `String::from(x)` has [String, from]
    Call {
        path: Vec<StringId>,
        args: Vec<Expression>,
    },
    MethodCall {
        receiver: Box<Expression>,
        method: StringId,
        args: Vec<Expression>,
    },
    Macro {
        name: StringId,
        args: Vec<Expression>,
    },
    StructLiteral {
        name: StringId,
        fields: Vec<(StringId, Expression)>,

        // `..base` fills every field that was not written out
        base: Option<Box<Expression>>,
    },
    Tuple(Vec<Expression>),
    Array(Vec<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        value: Box<Expression>,
    },
    Cast {
        value: Box<Expression>,
        ty: Ty,
    },
    If {
        condition: Box<Expression>,
        then_block: Block,
        else_block: Option<Block>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    EqualTo,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOperator {
    /// Comparisons take their operands by reference, arithmetic takes them by value
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::EqualTo
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}
