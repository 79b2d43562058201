#![allow(dead_code)]

mod builder;
mod interpreter;

pub use builder::{PlanBuilder, lit, lit_bool, lit_str};
pub use interpreter::{Database, Row, apply_filter, execute, sorted};
use sluice_common::error::Result;

pub fn assert_error_contains<T>(result: Result<T>, keywords: &[&str]) {
    match result {
        Ok(_) => panic!("Expected error but got Ok result"),
        Err(e) => {
            let error_msg = e.to_string().to_lowercase();
            let found = keywords
                .iter()
                .any(|keyword| error_msg.contains(&keyword.to_lowercase()));
            assert!(
                found,
                "Error message '{}' does not contain any of the expected keywords: {:?}",
                e, keywords
            );
        }
    }
}

/// Asserts that two row sets hold the same rows, ignoring order.
pub fn assert_same_rows(actual: Vec<Row>, expected: Vec<Row>) {
    let actual = sorted(actual);
    let expected = sorted(expected);
    assert_eq!(
        actual, expected,
        "row sets differ\n  actual:   {:?}\n  expected: {:?}",
        actual, expected
    );
}
