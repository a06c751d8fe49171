pub(crate) mod hir_builder;
pub(crate) mod hir_nodes;

// Private parts of the hir lowering
mod hir_expression;
mod hir_statement;

#[cfg(test)]
mod tests;
