use std::rc::Rc;

use crate::ast::{Term, Var};

/// Rewrite every symbol whose printed form begins with `?` into a pattern
/// variable, walking pairs structurally. Non-symbol atoms are unchanged.
///
/// This is the read-side half of the surface convention: the reader produces
/// plain symbols, and queries pass through here before evaluation.
pub fn expand_question_marks(term: &Rc<Term>) -> Rc<Term> {
    match &**term {
        Term::Constant(_) => match term.as_symbol() {
            Some(s) if s.len() > 1 && s.starts_with('?') => {
                Rc::new(Term::Var(Var::new(&s[1..])))
            }
            _ => term.clone(),
        },
        Term::Pair(head, tail) => Term::cons(
            expand_question_marks(head),
            expand_question_marks(tail),
        ),
        _ => term.clone(),
    }
}

/// Render a variable back to its surface symbol: `?x` for a user variable,
/// `?x-7` for a variable renamed by rule application 7.
pub fn contract_question_mark(var: &Var) -> Rc<Term> {
    Term::symbol(var.to_string())
}
