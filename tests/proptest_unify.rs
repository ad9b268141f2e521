//! Property tests for matching and unification invariants.

use std::convert::Infallible;
use std::rc::Rc;

use proptest::prelude::*;
use quarry::{instantiate, pattern_match, unify, Frame, Term};

/// Resolve bound variables and leave unbound ones in place.
fn walk(expr: &Rc<Term>, frame: &Frame) -> Rc<Term> {
    let resolved: Result<_, Infallible> =
        instantiate(expr, frame, &|v, _| Ok(Rc::new(Term::Var(v.clone()))));
    match resolved {
        Ok(term) => term,
        Err(never) => match never {},
    }
}

fn arb_ground() -> impl Strategy<Value = Rc<Term>> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["a", "b", "c", "f", "g"]).prop_map(|s| Term::symbol(s)),
        (0i64..4).prop_map(|n| Term::int(n)),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop::collection::vec(inner, 0..3).prop_map(|items| Term::list(items))
    })
}

fn arb_pattern() -> impl Strategy<Value = Rc<Term>> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["a", "b", "c", "f", "g"]).prop_map(|s| Term::symbol(s)),
        (0i64..4).prop_map(|n| Term::int(n)),
        prop::sample::select(vec!["x", "y", "z"]).prop_map(|v| Term::var(v)),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop::collection::vec(inner, 0..3).prop_map(|items| Term::list(items))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// A successful match makes the pattern instantiate to the datum.
    #[test]
    fn match_soundness(pattern in arb_pattern(), datum in arb_ground()) {
        if let Some(frame) = pattern_match(&pattern, &datum, &Frame::empty()) {
            prop_assert_eq!(walk(&pattern, &frame), datum);
        }
    }

    /// Unification fails in one direction iff it fails in the other, and a
    /// successful frame instantiates both sides to the same term.
    #[test]
    fn unify_symmetry(p1 in arb_pattern(), p2 in arb_pattern()) {
        let forward = unify(&p1, &p2, &Frame::empty());
        let backward = unify(&p2, &p1, &Frame::empty());
        prop_assert_eq!(forward.is_none(), backward.is_none());

        if let Some(frame) = forward {
            prop_assert_eq!(walk(&p1, &frame), walk(&p2, &frame));
        }
        if let Some(frame) = backward {
            prop_assert_eq!(walk(&p1, &frame), walk(&p2, &frame));
        }
    }

    /// Re-unifying already-unified terms changes nothing.
    #[test]
    fn unify_idempotence(p1 in arb_pattern(), p2 in arb_pattern()) {
        if let Some(frame) = unify(&p1, &p2, &Frame::empty()) {
            let again = unify(&p1, &p2, &frame);
            prop_assert_eq!(again, Some(frame));
        }
    }

    /// A variable never unifies with a pair containing it.
    #[test]
    fn occurs_check_rejects_containing_terms(filler in arb_pattern()) {
        let x = Term::var("x");
        let containing = Term::list(vec![Term::symbol("f"), x.clone(), filler]);
        prop_assert!(unify(&x, &containing, &Frame::empty()).is_none());
        prop_assert!(unify(&containing, &x, &Frame::empty()).is_none());
    }

    /// Matching ground terms is exact equality.
    #[test]
    fn ground_match_is_equality(t1 in arb_ground(), t2 in arb_ground()) {
        let matched = pattern_match(&t1, &t2, &Frame::empty()).is_some();
        prop_assert_eq!(matched, t1 == t2);
    }
}
