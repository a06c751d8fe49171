pub(crate) mod borrow_checker;
