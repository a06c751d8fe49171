mod borrow_checker_fact_tests;
mod borrow_checker_property_tests;
mod borrow_checker_tests;
