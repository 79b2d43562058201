mod common;

use common::filter_root;
use proptest::prelude::*;
use sluice::ir::{Column, Expr, JoinType, LogicalPlan, ScalarFunction};
use sluice_test_utils::{Database, PlanBuilder, Row, execute, lit, sorted};

/// Predicate shape over the columns `a.id, a.v, b.id, b.x, c.id, c.w`,
/// indexed 0..6.
#[derive(Debug, Clone)]
enum Pred {
    CmpLit(ScalarFunction, usize, i64),
    CmpCols(ScalarFunction, usize, usize),
    IsNull(usize),
    IfNullEq(usize, i64, i64),
    Not(Box<Pred>),
    And(Box<Pred>, Box<Pred>),
    Or(Box<Pred>, Box<Pred>),
}

impl Pred {
    fn to_expr(&self, columns: &[Column]) -> Expr {
        let col = |i: &usize| Expr::column(columns[*i].clone());
        match self {
            Pred::CmpLit(func, c, v) => Expr::function(*func, vec![col(c), lit(*v)]),
            Pred::CmpCols(func, l, r) => Expr::function(*func, vec![col(l), col(r)]),
            Pred::IsNull(c) => Expr::is_null(col(c)),
            Pred::IfNullEq(c, default, v) => Expr::eq(
                Expr::function(ScalarFunction::IfNull, vec![col(c), lit(*default)]),
                lit(*v),
            ),
            Pred::Not(p) => Expr::not(p.to_expr(columns)),
            Pred::And(l, r) => Expr::and(l.to_expr(columns), r.to_expr(columns)),
            Pred::Or(l, r) => Expr::or(l.to_expr(columns), r.to_expr(columns)),
        }
    }
}

fn comparison() -> impl Strategy<Value = ScalarFunction> {
    prop_oneof![
        Just(ScalarFunction::Eq),
        Just(ScalarFunction::NotEq),
        Just(ScalarFunction::Lt),
        Just(ScalarFunction::GtEq),
        Just(ScalarFunction::NullEq),
    ]
}

fn predicate() -> impl Strategy<Value = Pred> {
    let leaf = prop_oneof![
        (comparison(), 0..6usize, 0i64..4).prop_map(|(f, c, v)| Pred::CmpLit(f, c, v)),
        (comparison(), 0..6usize, 0..6usize).prop_map(|(f, l, r)| Pred::CmpCols(f, l, r)),
        (0..6usize).prop_map(Pred::IsNull),
        (0..6usize, 0i64..4, 0i64..4).prop_map(|(c, d, v)| Pred::IfNullEq(c, d, v)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|p| Pred::Not(Box::new(p))),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Pred::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| Pred::Or(Box::new(l), Box::new(r))),
        ]
    })
}

fn join_type() -> impl Strategy<Value = JoinType> {
    prop_oneof![
        Just(JoinType::Inner),
        Just(JoinType::LeftOuter),
        Just(JoinType::RightOuter),
    ]
}

fn table() -> impl Strategy<Value = Vec<Row>> {
    let cell = proptest::option::of(0i64..4);
    prop::collection::vec((cell.clone(), cell), 0..5)
        .prop_map(|rows| rows.iter().map(|(x, y)| common::row(&[*x, *y])).collect())
}

/// `(a ⋈ b) ⋈ c` joined on `a.id = b.id` and `b.id = c.id`.
fn three_way(lower: JoinType, upper: JoinType) -> (LogicalPlan, Vec<Column>) {
    let mut b = PlanBuilder::new();
    let a = b.scan("a", &["id", "v"]);
    let t = b.scan("b", &["id", "x"]);
    let c = b.scan("c", &["id", "w"]);
    let columns = vec![
        b.column(a, "id"),
        b.column(a, "v"),
        b.column(t, "id"),
        b.column(t, "x"),
        b.column(c, "id"),
        b.column(c, "w"),
    ];
    let on_ab = vec![Expr::eq(b.col(a, "a.id"), b.col(t, "b.id"))];
    let ab = b.join_on(a, t, lower, on_ab);
    let on_abc = vec![Expr::eq(b.col(t, "b.id"), b.col(c, "c.id"))];
    let abc = b.join_on(ab, c, upper, on_abc);
    (b.finish(abc), columns)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn optimized_plan_accepts_same_rows(
        lower in join_type(),
        upper in join_type(),
        preds in prop::collection::vec(predicate(), 0..4),
        a in table(),
        b in table(),
        c in table(),
    ) {
        let db = Database::new()
            .with_table("a", a)
            .with_table("b", b)
            .with_table("c", c);
        let (mut plan, columns) = three_way(lower, upper);
        let predicates: Vec<Expr> = preds.iter().map(|p| p.to_expr(&columns)).collect();

        let expected = filter_root(&mut plan, predicates, &db);
        sluice::optimize(&mut plan).unwrap();
        plan.check_links().unwrap();
        let actual = execute(&plan, &db).unwrap();

        prop_assert_eq!(sorted(actual), sorted(expected), "plan after push-down:\n{}", plan);
    }

    #[test]
    fn push_down_is_deterministic(
        lower in join_type(),
        upper in join_type(),
        preds in prop::collection::vec(predicate(), 0..4),
    ) {
        let db = Database::new()
            .with_table("a", vec![])
            .with_table("b", vec![])
            .with_table("c", vec![]);
        let mut rendered = Vec::new();
        for _ in 0..2 {
            let (mut plan, columns) = three_way(lower, upper);
            let predicates: Vec<Expr> = preds.iter().map(|p| p.to_expr(&columns)).collect();
            filter_root(&mut plan, predicates, &db);
            sluice::optimize(&mut plan).unwrap();
            rendered.push(plan.to_string());
        }
        prop_assert_eq!(&rendered[0], &rendered[1]);
    }
}
