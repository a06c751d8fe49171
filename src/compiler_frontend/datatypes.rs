//! Type facts the borrow checker needs and nothing more:
//! copy-ness, field, element and deref types, and whether a value can hold a loan.
//!
//! There is no inference here. Types come from annotations, signatures and literals,
//! and anything the table cannot work out is `Ty::Unknown`, which is treated as a
//! non-copy value with no references inside it.

use crate::compiler_frontend::ast::ast_nodes::{Ast, FieldDefinition, StructDefinition, Ty};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::string_interning::{StringId, StringTable};
use crate::return_rule_error;
use rustc_hash::{FxHashMap, FxHashSet};

/// Interned names of the library types the table knows about.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinNames {
    pub string: StringId,
    pub str_: StringId,
    pub vec: StringId,
    pub option: StringId,
    pub boxed: StringId,
    pub self_type: StringId,
    pub static_lifetime: StringId,
    pub anonymous_lifetime: StringId,
}

impl BuiltinNames {
    pub fn new(string_table: &mut StringTable) -> Self {
        Self {
            string: string_table.intern("String"),
            str_: string_table.intern("str"),
            vec: string_table.intern("Vec"),
            option: string_table.intern("Option"),
            boxed: string_table.intern("Box"),
            self_type: string_table.intern("Self"),
            static_lifetime: string_table.intern("static"),
            anonymous_lifetime: string_table.intern("_"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructLayout {
    pub lifetimes: Vec<StringId>,
    pub fields: Vec<FieldDefinition>,
}

impl StructLayout {
    pub fn field(&self, name: StringId) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct TypeTable {
    pub names: BuiltinNames,
    copy_types: FxHashSet<StringId>,
    structs: FxHashMap<StringId, StructLayout>,
}

impl TypeTable {
    /// Registers every `copy` declaration and struct of the (prelude merged) AST,
    /// plus the extra copy type names from the config file.
    pub fn new(
        ast: &Ast,
        extra_copy_types: &[String],
        string_table: &mut StringTable,
    ) -> Result<Self, CompilerError> {
        let names = BuiltinNames::new(string_table);

        let mut copy_types = ast
            .copy_types
            .iter()
            .map(|(name, _)| *name)
            .collect::<FxHashSet<_>>();

        for name in extra_copy_types {
            copy_types.insert(string_table.intern(name));
        }

        let mut structs = FxHashMap::default();
        for definition in &ast.structs {
            let StructDefinition {
                name,
                lifetimes,
                fields,
                location,
            } = definition;

            if structs.contains_key(name) {
                return_rule_error!(
                    format!("Struct '{}' is defined more than once", string_table.resolve(*name)),
                    *location,
                    {
                        CompilationStage => "Type Collection",
                        VariableName => string_table.resolve(*name),
                    }
                )
            }

            structs.insert(
                *name,
                StructLayout {
                    lifetimes: lifetimes.clone(),
                    fields: fields.clone(),
                },
            );
        }

        Ok(Self {
            names,
            copy_types,
            structs,
        })
    }

    pub fn struct_layout(&self, name: StringId) -> Option<&StructLayout> {
        self.structs.get(&name)
    }

    /// Whether a value of this type is copied instead of moved.
    pub fn is_copy(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Named { name, args, .. } => {
                if self.copy_types.contains(name) {
                    return true;
                }

                // Option<&T> and Option<i32> are copy, Option<String> is not
                *name == self.names.option && args.iter().all(|arg| self.is_copy(arg))
            }
            Ty::Reference { mutable, .. } => !mutable,
            Ty::Tuple(items) => items.iter().all(|item| self.is_copy(item)),
            Ty::Array {
                element,
                length: Some(_),
            } => self.is_copy(element),
            Ty::Unit => true,
            Ty::Array { length: None, .. } | Ty::Generic(_) | Ty::SelfType | Ty::Unknown => false,
        }
    }

    /// Type of `base.field`. Tuple fields are named "0", "1", ...
    pub fn field_type(&self, base: &Ty, field: StringId, string_table: &StringTable) -> Option<Ty> {
        match base {
            Ty::Named { name, .. } => self
                .structs
                .get(name)
                .and_then(|layout| layout.field(field))
                .map(|definition| definition.ty.clone()),
            Ty::Tuple(items) => {
                let index = string_table.resolve(field).parse::<usize>().ok()?;
                items.get(index).cloned()
            }
            _ => None,
        }
    }

    /// Type of `base[i]`, or of `base[a..b]` when `range` is set.
    pub fn element_type(&self, base: &Ty, range: bool) -> Option<Ty> {
        match base {
            Ty::Array { element, .. } => Some(if range {
                Ty::Array {
                    element: element.clone(),
                    length: None,
                }
            } else {
                (**element).clone()
            }),

            Ty::Named { name, args, .. } if *name == self.names.vec => {
                let element = args.first().cloned().unwrap_or(Ty::Unknown);
                Some(if range {
                    Ty::Array {
                        element: Box::new(element),
                        length: None,
                    }
                } else {
                    element
                })
            }

            // Strings can only be sliced
            Ty::Named { name, .. }
                if range && (*name == self.names.string || *name == self.names.str_) =>
            {
                Some(Ty::named(self.names.str_))
            }

            Ty::Unknown => Some(Ty::Unknown),
            _ => None,
        }
    }

    /// Type of `*base`
    pub fn deref_type(&self, base: &Ty) -> Option<Ty> {
        match base {
            Ty::Reference { inner, .. } => Some((**inner).clone()),
            Ty::Named { name, args, .. } if *name == self.names.boxed => {
                Some(args.first().cloned().unwrap_or(Ty::Unknown))
            }
            Ty::Unknown => Some(Ty::Unknown),
            _ => None,
        }
    }

    /// Whether a value of this type can keep a borrow alive.
    pub fn contains_reference(&self, ty: &Ty) -> bool {
        self.contains_reference_inner(ty, &mut FxHashSet::default())
    }

    fn contains_reference_inner(&self, ty: &Ty, visited: &mut FxHashSet<StringId>) -> bool {
        match ty {
            Ty::Reference { .. } => true,
            Ty::Named {
                name,
                lifetimes,
                args,
            } => {
                if !lifetimes.is_empty()
                    || args.iter().any(|arg| self.contains_reference_inner(arg, visited))
                {
                    return true;
                }

                let Some(layout) = self.structs.get(name) else {
                    return false;
                };
                if !layout.lifetimes.is_empty() {
                    return true;
                }

                // Recursive structs only need to be looked at once
                if !visited.insert(*name) {
                    return false;
                }
                layout
                    .fields
                    .iter()
                    .any(|field| self.contains_reference_inner(&field.ty, visited))
            }
            Ty::Tuple(items) => items
                .iter()
                .any(|item| self.contains_reference_inner(item, visited)),
            Ty::Array { element, .. } => self.contains_reference_inner(element, visited),
            Ty::Generic(_) | Ty::SelfType | Ty::Unit | Ty::Unknown => false,
        }
    }

    /// The `impl` block that method calls on this receiver type are looked up in.
    /// References are looked through and slices share the `Vec` methods.
    pub fn method_owner(&self, receiver: &Ty) -> Option<StringId> {
        match receiver {
            Ty::Reference { inner, .. } => self.method_owner(inner),
            Ty::Named { name, args, .. } if *name == self.names.boxed => {
                args.first().and_then(|inner| self.method_owner(inner))
            }
            Ty::Named { name, .. } => Some(*name),
            Ty::Array { .. } => Some(self.names.vec),
            _ => None,
        }
    }

    /// The type `Self` stands for inside an impl block
    pub fn self_type(&self, owner: StringId, owner_generics: &[StringId]) -> Ty {
        let lifetimes = self
            .structs
            .get(&owner)
            .map(|layout| layout.lifetimes.clone())
            .unwrap_or_default();

        Ty::Named {
            name: owner,
            lifetimes,
            args: owner_generics.iter().map(|generic| Ty::Generic(*generic)).collect(),
        }
    }
}

/// Replaces `Self` and generic parameters in a declared type.
pub fn substitute(ty: &Ty, self_type: Option<&Ty>, generics: &FxHashMap<StringId, Ty>) -> Ty {
    match ty {
        Ty::SelfType => self_type.cloned().unwrap_or(Ty::Unknown),
        Ty::Generic(name) => generics.get(name).cloned().unwrap_or(Ty::Unknown),
        Ty::Named {
            name,
            lifetimes,
            args,
        } => Ty::Named {
            name: *name,
            lifetimes: lifetimes.clone(),
            args: args
                .iter()
                .map(|arg| substitute(arg, self_type, generics))
                .collect(),
        },
        Ty::Reference {
            lifetime,
            mutable,
            inner,
        } => Ty::Reference {
            lifetime: *lifetime,
            mutable: *mutable,
            inner: Box::new(substitute(inner, self_type, generics)),
        },
        Ty::Tuple(items) => Ty::Tuple(
            items
                .iter()
                .map(|item| substitute(item, self_type, generics))
                .collect(),
        ),
        Ty::Array { element, length } => Ty::Array {
            element: Box::new(substitute(element, self_type, generics)),
            length: *length,
        },
        Ty::Unit | Ty::Unknown => ty.clone(),
    }
}

/// Matches a declared parameter type against the type of the argument,
/// recording what each generic parameter stands for. First binding wins.
pub fn bind_generics(
    declared: &Ty,
    actual: &Ty,
    vec_name: StringId,
    bindings: &mut FxHashMap<StringId, Ty>,
) {
    match (declared, actual) {
        (Ty::Generic(name), _) => {
            if !matches!(actual, Ty::Unknown) {
                bindings.entry(*name).or_insert_with(|| actual.clone());
            }
        }

        (Ty::Reference { inner: declared, .. }, Ty::Reference { inner: actual, .. }) => {
            bind_generics(declared, actual, vec_name, bindings)
        }

        // `&self` on a Vec method called through an owned receiver after autoref
        (Ty::Reference { inner: declared, .. }, _) => {
            bind_generics(declared, actual, vec_name, bindings)
        }

        (Ty::Named { name, args, .. }, Ty::Named {
            name: actual_name,
            args: actual_args,
            ..
        }) if name == actual_name => {
            for (declared, actual) in args.iter().zip(actual_args) {
                bind_generics(declared, actual, vec_name, bindings);
            }
        }

        // Slices and arrays use the Vec<T> methods
        (Ty::Named { name, args, .. }, Ty::Array { element, .. }) if *name == vec_name => {
            if let Some(declared) = args.first() {
                bind_generics(declared, element, vec_name, bindings);
            }
        }

        (Ty::Array { element: declared, .. }, Ty::Array { element: actual, .. }) => {
            bind_generics(declared, actual, vec_name, bindings)
        }

        (Ty::Tuple(declared), Ty::Tuple(actual)) => {
            for (declared, actual) in declared.iter().zip(actual) {
                bind_generics(declared, actual, vec_name, bindings);
            }
        }

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler_frontend::ast::parser::parse_ast;
    use crate::compiler_frontend::ast::prelude::parse_prelude;
    use crate::compiler_frontend::tokenizer::tokenizer::tokenize;

    fn table(source: &str) -> (TypeTable, StringTable) {
        let mut string_table = StringTable::new();
        let mut ast = parse_prelude(&mut string_table).expect("prelude");
        let tokens = tokenize(source, &mut string_table).expect("tokens");
        ast.merge(parse_ast(tokens, &mut string_table, false).expect("ast"));
        let table = TypeTable::new(&ast, &[String::from("Meters")], &mut string_table).expect("table");
        (table, string_table)
    }

    fn named(name: &str, string_table: &mut StringTable) -> Ty {
        Ty::named(string_table.intern(name))
    }

    #[test]
    fn copy_types() {
        let (table, mut string_table) = table("struct Point { x: i32, y: i32 } copy Point;");

        let i32_ty = named("i32", &mut string_table);
        let string_ty = named("String", &mut string_table);

        assert!(table.is_copy(&i32_ty));
        assert!(table.is_copy(&named("Point", &mut string_table)));
        assert!(table.is_copy(&named("Meters", &mut string_table)));
        assert!(!table.is_copy(&string_ty));
        assert!(table.is_copy(&Ty::reference(string_ty.clone(), false)));
        assert!(!table.is_copy(&Ty::reference(string_ty.clone(), true)));
        assert!(table.is_copy(&Ty::Tuple(vec![i32_ty.clone(), i32_ty.clone()])));
        assert!(!table.is_copy(&Ty::Tuple(vec![i32_ty, string_ty])));
    }

    #[test]
    fn struct_lifetimes_make_values_hold_references() {
        let (table, mut string_table) = table(
            "struct Excerpt<'a> { part: &'a str }
             struct Wrapper { inner: Excerpt }
             struct Plain { name: String }",
        );

        assert!(table.contains_reference(&named("Excerpt", &mut string_table)));
        assert!(table.contains_reference(&named("Wrapper", &mut string_table)));
        assert!(!table.contains_reference(&named("Plain", &mut string_table)));
    }

    #[test]
    fn element_and_field_types() {
        let (table, mut string_table) = table("struct Pair(String, i32);");

        let string_ty = named("String", &mut string_table);
        let vec_of_strings = Ty::Named {
            name: string_table.intern("Vec"),
            lifetimes: Vec::new(),
            args: vec![string_ty.clone()],
        };

        assert_eq!(table.element_type(&vec_of_strings, false), Some(string_ty.clone()));
        assert_eq!(
            table.element_type(&string_ty, true),
            Some(named("str", &mut string_table))
        );
        assert_eq!(table.element_type(&string_ty, false), None);

        let zero = string_table.intern("0");
        assert_eq!(
            table.field_type(&named("Pair", &mut string_table), zero, &string_table),
            Some(string_ty)
        );
    }

    #[test]
    fn generics_bind_through_references_and_slices() {
        let mut string_table = StringTable::new();
        let t = string_table.intern("T");
        let vec = string_table.intern("Vec");
        let i32_ty = Ty::named(string_table.intern("i32"));

        let declared = Ty::reference(
            Ty::Named {
                name: vec,
                lifetimes: Vec::new(),
                args: vec![Ty::Generic(t)],
            },
            false,
        );
        let actual = Ty::Array {
            element: Box::new(i32_ty.clone()),
            length: Some(3),
        };

        let mut bindings = FxHashMap::default();
        bind_generics(&declared, &actual, vec, &mut bindings);
        assert_eq!(bindings.get(&t), Some(&i32_ty));
    }
}
