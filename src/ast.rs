use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;

/// An atomic constant: a bare symbol or a literal scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Symbol(String),
    Int(BigInt),
    Str(String),
}

/// A pattern variable.
///
/// `gen` is 0 for variables typed by the user; rule application stamps a
/// fresh nonzero generation onto every variable of the applied rule, so two
/// applications of the same rule never share a variable identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub gen: u64,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var { name: name.into(), gen: 0 }
    }
}

/// A term: constant, variable, cons pair, or the empty list.
///
/// Compound terms are right-nested pairs ending in `Nil`, i.e. proper lists.
/// Equality is value equality on constants, structural on pairs, and
/// (name, generation) identity on variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Constant(Constant),
    Var(Var),
    Pair(Rc<Term>, Rc<Term>),
    Nil,
}

impl Term {
    pub fn symbol(s: impl Into<String>) -> Rc<Term> {
        Rc::new(Term::Constant(Constant::Symbol(s.into())))
    }

    pub fn int(i: impl Into<BigInt>) -> Rc<Term> {
        Rc::new(Term::Constant(Constant::Int(i.into())))
    }

    pub fn string(s: impl Into<String>) -> Rc<Term> {
        Rc::new(Term::Constant(Constant::Str(s.into())))
    }

    /// A user-level variable (generation 0).
    pub fn var(name: impl Into<String>) -> Rc<Term> {
        Rc::new(Term::Var(Var::new(name)))
    }

    pub fn nil() -> Rc<Term> {
        Rc::new(Term::Nil)
    }

    pub fn cons(head: Rc<Term>, tail: Rc<Term>) -> Rc<Term> {
        Rc::new(Term::Pair(head, tail))
    }

    /// Build a proper list: right-nested pairs ending in `Nil`.
    pub fn list<I>(items: I) -> Rc<Term>
    where
        I: IntoIterator<Item = Rc<Term>>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Term::nil(), |tail, head| Term::cons(head, tail))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Term::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Term::Constant(Constant::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Term::Constant(Constant::Int(i)) => Some(i),
            _ => None,
        }
    }

    /// Flatten a proper list into its items; `None` for anything else
    /// (including dotted pairs).
    pub fn list_items(&self) -> Option<Vec<Rc<Term>>> {
        let mut items = vec![];
        let mut cur = self;
        loop {
            match cur {
                Term::Nil => return Some(items),
                Term::Pair(head, tail) => {
                    items.push(head.clone());
                    cur = tail;
                }
                _ => return None,
            }
        }
    }

    /// Head of a pair, if this is one.
    pub fn head(&self) -> Option<&Rc<Term>> {
        match self {
            Term::Pair(head, _) => Some(head),
            _ => None,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.gen == 0 {
            write!(f, "?{}", self.name)
        } else {
            write!(f, "?{}-{}", self.name, self.gen)
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Symbol(s) => write!(f, "{s}"),
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Constant(c) => write!(f, "{c}"),
            Term::Var(v) => write!(f, "{v}"),
            Term::Nil => write!(f, "()"),
            Term::Pair(head, tail) => {
                write!(f, "({head}")?;
                let mut cur = tail;
                loop {
                    match &**cur {
                        Term::Nil => break,
                        Term::Pair(h, t) => {
                            write!(f, " {h}")?;
                            cur = t;
                        }
                        other => {
                            write!(f, " . {other}")?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
        }
    }
}
