mod outer_to_inner_join;

pub use outer_to_inner_join::simplify_outer_joins;
