use std::rc::Rc;

use crate::ast::{Term, Var};
use crate::frame::Frame;

/// One-sided match of a pattern against a datum from the database.
///
/// The datum is treated as containing no variables: a variable appearing in
/// the datum is inert structure and matches only the identical variable in
/// the pattern. Returns the extended frame, or `None` on mismatch.
pub fn pattern_match(pattern: &Rc<Term>, datum: &Rc<Term>, frame: &Frame) -> Option<Frame> {
    if pattern == datum {
        return Some(frame.clone());
    }
    match (&**pattern, &**datum) {
        (Term::Var(var), _) => extend_if_consistent(var, datum, frame),
        (Term::Pair(p_head, p_tail), Term::Pair(d_head, d_tail)) => {
            let frame = pattern_match(p_head, d_head, frame)?;
            pattern_match(p_tail, d_tail, &frame)
        }
        _ => None,
    }
}

fn extend_if_consistent(var: &Var, datum: &Rc<Term>, frame: &Frame) -> Option<Frame> {
    match frame.lookup(var) {
        Some(bound) => {
            let bound = bound.clone();
            pattern_match(&bound, datum, frame)
        }
        None => Some(frame.extend(var.clone(), datum.clone())),
    }
}

/// Symmetric unification: variables may appear on both sides.
///
/// Produces the extended frame, or `None` when the terms admit no common
/// instance under the current bindings.
pub fn unify(p1: &Rc<Term>, p2: &Rc<Term>, frame: &Frame) -> Option<Frame> {
    if p1 == p2 {
        return Some(frame.clone());
    }
    match (&**p1, &**p2) {
        (Term::Var(var), _) => extend_if_possible(var, p2, frame),
        (_, Term::Var(var)) => extend_if_possible(var, p1, frame),
        (Term::Pair(h1, t1), Term::Pair(h2, t2)) => {
            let frame = unify(h1, h2, frame)?;
            unify(t1, t2, &frame)
        }
        _ => None,
    }
}

fn extend_if_possible(var: &Var, val: &Rc<Term>, frame: &Frame) -> Option<Frame> {
    if let Some(bound) = frame.lookup(var) {
        let bound = bound.clone();
        return unify(&bound, val, frame);
    }
    if let Term::Var(other) = &**val {
        if let Some(bound) = frame.lookup(other) {
            let bound = bound.clone();
            let var_term = Rc::new(Term::Var(var.clone()));
            return unify(&var_term, &bound, frame);
        }
    }
    if depends_on(val, var, frame) {
        // Equations like ?x = (f ?x) have no finite solution; admitting the
        // binding would make the frame cyclic and instantiation diverge.
        return None;
    }
    Some(frame.extend(var.clone(), val.clone()))
}

/// Does `expr` contain `var` under the bindings of `frame`?
pub fn depends_on(expr: &Rc<Term>, var: &Var, frame: &Frame) -> bool {
    match &**expr {
        Term::Var(v) => {
            if v == var {
                return true;
            }
            match frame.lookup(v) {
                Some(bound) => {
                    let bound = bound.clone();
                    depends_on(&bound, var, frame)
                }
                None => false,
            }
        }
        Term::Pair(head, tail) => {
            depends_on(head, var, frame) || depends_on(tail, var, frame)
        }
        _ => false,
    }
}
