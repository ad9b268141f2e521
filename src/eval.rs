use std::convert::Infallible;
use std::rc::Rc;

use log::trace;
use thiserror::Error;

use crate::ast::{Term, Var};
use crate::db::{Database, Rule};
use crate::frame::Frame;
use crate::stream::{Delayed, Iter, Stream};
use crate::syntax::contract_question_mark;
use crate::unify::{pattern_match, unify};

/// Fatal evaluation errors. Match and unification failures are routine and
/// never produce one of these; they just contribute nothing to the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid rule: {0}")]
    InvalidRule(String),
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),
    #[error("unbound variable {var} in predicate call {call}")]
    UnboundInPredicate { var: String, call: String },
    #[error("unknown predicate: {0}")]
    UnknownPredicate(String),
    #[error("predicate {name} failed: {message}")]
    Predicate { name: String, message: String },
}

/// A parsed query form. Parsing a term into this closed set happens before
/// evaluation (and at rule-add time for bodies), so a malformed query is
/// rejected eagerly instead of somewhere down a lazy stream.
#[derive(Debug, Clone)]
pub enum Query {
    /// A pattern matched against assertions and rule conclusions.
    Simple(Rc<Term>),
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
    /// A host-predicate filter: `(lisp-value pred arg ...)`, holding the
    /// `(pred arg ...)` call.
    Predicate(Rc<Term>),
    /// `(always-true)`: passes every frame through.
    True,
}

impl Query {
    pub fn from_term(term: &Rc<Term>) -> Result<Query, EvalError> {
        match &**term {
            Term::Pair(head, tail) => {
                if let Some(tag) = head.as_symbol() {
                    match tag {
                        "and" => return Ok(Query::And(subqueries(term, tail)?)),
                        "or" => return Ok(Query::Or(subqueries(term, tail)?)),
                        "not" => {
                            let items = operands(term, tail)?;
                            return match items.as_slice() {
                                [operand] => {
                                    Ok(Query::Not(Box::new(Query::from_term(operand)?)))
                                }
                                _ => Err(EvalError::InvalidQuery(term.to_string())),
                            };
                        }
                        "lisp-value" => {
                            let items = operands(term, tail)?;
                            return match items.split_first() {
                                Some((name, _)) if name.as_symbol().is_some() => {
                                    Ok(Query::Predicate(tail.clone()))
                                }
                                _ => Err(EvalError::InvalidQuery(term.to_string())),
                            };
                        }
                        "always-true" => return Ok(Query::True),
                        _ => {}
                    }
                }
                Ok(Query::Simple(term.clone()))
            }
            // A lone variable is a legal (if extravagant) pattern: it
            // matches every assertion and every rule conclusion.
            Term::Var(_) => Ok(Query::Simple(term.clone())),
            _ => Err(EvalError::InvalidQuery(term.to_string())),
        }
    }
}

fn operands(query: &Rc<Term>, tail: &Rc<Term>) -> Result<Vec<Rc<Term>>, EvalError> {
    tail.list_items()
        .ok_or_else(|| EvalError::InvalidQuery(query.to_string()))
}

fn subqueries(query: &Rc<Term>, tail: &Rc<Term>) -> Result<Vec<Query>, EvalError> {
    operands(query, tail)?
        .iter()
        .map(Query::from_term)
        .collect()
}

pub type EvalResult = Result<Frame, EvalError>;

/// The evaluator's working currency: a lazy stream of alternative frames.
/// The frame-dependent fatal errors travel through it as `Err` elements.
pub type FrameStream = Stream<EvalResult>;

/// Evaluate a query over a stream of input frames.
pub fn qeval(db: &Database, query: &Query, frames: FrameStream) -> FrameStream {
    match query {
        Query::Simple(pattern) => simple_query(db, pattern, frames),
        Query::And(conjuncts) => conjoin(db, conjuncts, frames),
        Query::Or(disjuncts) => disjoin(db, disjuncts, frames),
        Query::Not(operand) => negate(db, operand, frames),
        Query::Predicate(call) => filter_by_predicate(db, call, frames),
        Query::True => frames,
    }
}

/// For each input frame: assertion matches first, then (once those are
/// exhausted) rule applications. Results for different input frames are
/// interleaved fairly by `flatmap`.
fn simple_query(db: &Database, pattern: &Rc<Term>, frames: FrameStream) -> FrameStream {
    let db = db.clone();
    let pattern = pattern.clone();
    frames.flatmap(move |res| match res {
        Err(e) => Stream::singleton(Err(e)),
        Ok(frame) => {
            let rules = {
                let db = db.clone();
                let pattern = pattern.clone();
                let frame = frame.clone();
                Delayed::new(move || apply_rules(&db, &pattern, &frame))
            };
            find_assertions(&db, &pattern, &frame).append_delayed(rules)
        }
    })
}

/// Frames extending `frame` by a database-assertion match.
fn find_assertions(db: &Database, pattern: &Rc<Term>, frame: &Frame) -> FrameStream {
    let pattern = pattern.clone();
    let frame = frame.clone();
    db.fetch_assertions(&pattern)
        .flatmap(move |datum| match pattern_match(&pattern, &datum, &frame) {
            Some(extended) => Stream::singleton(Ok(extended)),
            None => Stream::empty(),
        })
}

/// Frames produced by applying every candidate rule to `frame`.
fn apply_rules(db: &Database, pattern: &Rc<Term>, frame: &Frame) -> FrameStream {
    let candidates = db.fetch_rules(pattern);
    let db = db.clone();
    let pattern = pattern.clone();
    let frame = frame.clone();
    candidates.flatmap(move |rule| apply_a_rule(&db, &rule, &pattern, &frame))
}

/// One rule application: draw a fresh generation, alpha-rename the rule,
/// unify the query pattern with the renamed conclusion, and on success
/// evaluate the renamed body in the unified frame.
fn apply_a_rule(db: &Database, rule: &Rule, pattern: &Rc<Term>, frame: &Frame) -> FrameStream {
    let gen = db.next_generation();
    let conclusion = rename_term(&rule.conclusion, gen);
    match unify(pattern, &conclusion, frame) {
        None => Stream::empty(),
        Some(unified) => {
            trace!("rule {} fires as generation {gen}", rule.conclusion);
            let body = rename_query(&rule.body, gen);
            qeval(db, &body, Stream::singleton(Ok(unified)))
        }
    }
}

/// Stamp `gen` onto every variable of the term.
fn rename_term(term: &Rc<Term>, gen: u64) -> Rc<Term> {
    match &**term {
        Term::Var(var) => Rc::new(Term::Var(Var {
            name: var.name.clone(),
            gen,
        })),
        Term::Pair(head, tail) => Term::cons(rename_term(head, gen), rename_term(tail, gen)),
        _ => term.clone(),
    }
}

fn rename_query(query: &Query, gen: u64) -> Query {
    match query {
        Query::Simple(pattern) => Query::Simple(rename_term(pattern, gen)),
        Query::And(qs) => Query::And(qs.iter().map(|q| rename_query(q, gen)).collect()),
        Query::Or(qs) => Query::Or(qs.iter().map(|q| rename_query(q, gen)).collect()),
        Query::Not(q) => Query::Not(Box::new(rename_query(q, gen))),
        Query::Predicate(call) => Query::Predicate(rename_term(call, gen)),
        Query::True => Query::True,
    }
}

/// Thread the frame stream through the conjuncts left to right.
fn conjoin(db: &Database, conjuncts: &[Query], frames: FrameStream) -> FrameStream {
    match conjuncts.split_first() {
        None => frames,
        Some((first, rest)) => conjoin(db, rest, qeval(db, first, frames)),
    }
}

/// Fair disjunction: interleave the first disjunct's answers with the rest.
fn disjoin(db: &Database, disjuncts: &[Query], frames: FrameStream) -> FrameStream {
    match disjuncts.split_first() {
        None => Stream::empty(),
        Some((first, rest)) => {
            let head = qeval(db, first, frames.clone());
            let db = db.clone();
            let rest = rest.to_vec();
            head.interleave_delayed(Delayed::new(move || disjoin(&db, &rest, frames.clone())))
        }
    }
}

/// Negation as failure: a frame passes iff the operand produces nothing for
/// the singleton stream of that frame. Cannot generate bindings, and is only
/// meaningful relative to what the database already rules in.
fn negate(db: &Database, operand: &Query, frames: FrameStream) -> FrameStream {
    let db = db.clone();
    let operand = operand.clone();
    frames.flatmap(move |res| match res {
        Err(e) => Stream::singleton(Err(e)),
        Ok(frame) => {
            let attempt = qeval(&db, &operand, Stream::singleton(Ok(frame.clone())));
            match attempt.split() {
                None => Stream::singleton(Ok(frame)),
                Some((Ok(_), _)) => Stream::empty(),
                Some((Err(e), _)) => Stream::singleton(Err(e)),
            }
        }
    })
}

/// Host-predicate filter: instantiate the call (every pattern variable must
/// be bound), apply the registered predicate, keep the frame iff it answers
/// true.
fn filter_by_predicate(db: &Database, call: &Rc<Term>, frames: FrameStream) -> FrameStream {
    let db = db.clone();
    let call = call.clone();
    frames.flatmap(move |res| match res {
        Err(e) => Stream::singleton(Err(e)),
        Ok(frame) => match host_call(&db, &call, &frame) {
            Ok(true) => Stream::singleton(Ok(frame)),
            Ok(false) => Stream::empty(),
            Err(e) => Stream::singleton(Err(e)),
        },
    })
}

fn host_call(db: &Database, call: &Rc<Term>, frame: &Frame) -> Result<bool, EvalError> {
    let ground = instantiate(call, frame, &|var: &Var, _: &Frame| {
        Err(EvalError::UnboundInPredicate {
            var: var.to_string(),
            call: call.to_string(),
        })
    })?;
    let items = ground
        .list_items()
        .ok_or_else(|| EvalError::InvalidQuery(ground.to_string()))?;
    let (name, args) = items
        .split_first()
        .ok_or_else(|| EvalError::InvalidQuery(ground.to_string()))?;
    let name = name
        .as_symbol()
        .ok_or_else(|| EvalError::InvalidQuery(ground.to_string()))?;
    db.apply_predicate(name, args)
}

/// Resolve `expr` under `frame`, walking binding chains. Unbound variables
/// go through `unbound`, which either substitutes a placeholder term or
/// signals an error.
pub fn instantiate<E>(
    expr: &Rc<Term>,
    frame: &Frame,
    unbound: &impl Fn(&Var, &Frame) -> Result<Rc<Term>, E>,
) -> Result<Rc<Term>, E> {
    match &**expr {
        Term::Var(var) => match frame.lookup(var) {
            Some(bound) => {
                let bound = bound.clone();
                instantiate(&bound, frame, unbound)
            }
            None => unbound(var, frame),
        },
        Term::Pair(head, tail) => Ok(Term::cons(
            instantiate(head, frame, unbound)?,
            instantiate(tail, frame, unbound)?,
        )),
        _ => Ok(expr.clone()),
    }
}

/// Resolve for display: unbound variables become their surface symbols
/// (`?x`, `?x-7`).
pub fn resolve(expr: &Rc<Term>, frame: &Frame) -> Rc<Term> {
    let resolved: Result<_, Infallible> =
        instantiate(expr, frame, &|var, _| Ok(contract_question_mark(var)));
    match resolved {
        Ok(term) => term,
        Err(never) => match never {},
    }
}

/// Lazy answers to a query: each pulled frame is instantiated into a copy of
/// the original query expression. No evaluation happens before the first
/// `next()`.
pub struct Answers {
    expr: Rc<Term>,
    query: Query,
    db: Database,
    frames: Option<Iter<EvalResult>>,
}

impl Iterator for Answers {
    type Item = Result<Rc<Term>, EvalError>;

    fn next(&mut self) -> Option<Self::Item> {
        let db = &self.db;
        let query = &self.query;
        let frames = self.frames.get_or_insert_with(|| {
            qeval(db, query, Stream::singleton(Ok(Frame::empty()))).iter()
        });
        let res = frames.next()?;
        Some(res.map(|frame| resolve(&self.expr, &frame)))
    }
}

impl Database {
    /// Pose a query. The expression is validated eagerly; evaluation itself
    /// is lazy and driven by pulling from the returned iterator.
    pub fn query(&self, expr: &Rc<Term>) -> Result<Answers, EvalError> {
        let query = Query::from_term(expr)?;
        Ok(Answers {
            expr: expr.clone(),
            query,
            db: self.clone(),
            frames: None,
        })
    }
}
