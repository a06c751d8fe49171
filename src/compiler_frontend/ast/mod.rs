pub(crate) mod ast_nodes;
pub(crate) mod expressions;
pub(crate) mod parser;
pub(crate) mod prelude;
pub(crate) mod statements;

#[cfg(test)]
mod tests;
