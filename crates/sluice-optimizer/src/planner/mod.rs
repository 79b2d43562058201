pub mod null_rejection;
pub mod predicate;
pub mod predicate_pushdown;
pub mod rule_based;
