use std::fmt;
use std::rc::Rc;

use crate::ast::{Term, Var};

/// A substitution environment: a persistent chain of variable bindings.
///
/// `extend` prepends and never mutates, so frames produced for different
/// alternatives share their common tail. `lookup` returns the first binding
/// whose variable matches by identity; bindings may chain (a variable bound
/// to another variable), and resolution walks the chain.
///
/// Matching and unification report failure as `Option::None` rather than
/// through a sentinel frame; every consumer short-circuits with `?`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    head: Option<Rc<Binding>>,
}

#[derive(Debug, PartialEq)]
struct Binding {
    var: Var,
    val: Rc<Term>,
    rest: Option<Rc<Binding>>,
}

impl Frame {
    pub fn empty() -> Frame {
        Frame { head: None }
    }

    /// First binding for `var`, or `None` if unbound.
    pub fn lookup(&self, var: &Var) -> Option<&Rc<Term>> {
        let mut cur = self.head.as_ref();
        while let Some(binding) = cur {
            if &binding.var == var {
                return Some(&binding.val);
            }
            cur = binding.rest.as_ref();
        }
        None
    }

    /// Prepend a binding. The caller guarantees `var` is unbound in `self`;
    /// no consistency check happens here.
    pub fn extend(&self, var: Var, val: Rc<Term>) -> Frame {
        Frame {
            head: Some(Rc::new(Binding {
                var,
                val,
                rest: self.head.clone(),
            })),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Bindings, most recent first.
    pub fn bindings(&self) -> Bindings<'_> {
        Bindings { cur: self.head.as_ref() }
    }
}

pub struct Bindings<'a> {
    cur: Option<&'a Rc<Binding>>,
}

impl<'a> Iterator for Bindings<'a> {
    type Item = (&'a Var, &'a Rc<Term>);

    fn next(&mut self) -> Option<Self::Item> {
        let binding = self.cur?;
        self.cur = binding.rest.as_ref();
        Some((&binding.var, &binding.val))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, val)) in self.bindings().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} = {val}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_most_recent_binding_first() {
        let x = Var::new("x");
        let frame = Frame::empty().extend(x.clone(), Term::symbol("a"));
        assert_eq!(frame.lookup(&x), Some(&Term::symbol("a")));
        assert_eq!(frame.lookup(&Var::new("y")), None);
    }

    #[test]
    fn extension_shares_tails() {
        let base = Frame::empty().extend(Var::new("x"), Term::symbol("a"));
        let left = base.extend(Var::new("y"), Term::symbol("b"));
        let right = base.extend(Var::new("y"), Term::symbol("c"));

        assert_eq!(left.lookup(&Var::new("x")), Some(&Term::symbol("a")));
        assert_eq!(right.lookup(&Var::new("x")), Some(&Term::symbol("a")));
        assert_eq!(left.lookup(&Var::new("y")), Some(&Term::symbol("b")));
        assert_eq!(right.lookup(&Var::new("y")), Some(&Term::symbol("c")));
    }

    #[test]
    fn bindings_chain_through_variables() {
        let x = Var::new("x");
        let y = Var::new("y");
        let frame = Frame::empty()
            .extend(y.clone(), Term::symbol("val"))
            .extend(x.clone(), Rc::new(Term::Var(y.clone())));

        // x resolves to ?y, which in turn resolves to val.
        let bound = frame.lookup(&x).unwrap();
        let chained = bound.as_var().unwrap();
        assert_eq!(frame.lookup(chained), Some(&Term::symbol("val")));
    }

    #[test]
    fn distinct_generations_do_not_collide() {
        let user = Var::new("x");
        let fresh = Var { name: "x".into(), gen: 3 };
        let frame = Frame::empty().extend(fresh.clone(), Term::symbol("a"));
        assert_eq!(frame.lookup(&user), None);
        assert_eq!(frame.lookup(&fresh), Some(&Term::symbol("a")));
    }
}
