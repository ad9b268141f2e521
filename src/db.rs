use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;
use num_bigint::BigInt;

use crate::ast::{Constant, Term};
use crate::eval::{EvalError, Query};
use crate::stream::{Delayed, Stream};

/// Head-symbol key under which assertions and rules are filed. Rules whose
/// conclusion starts with a variable go under `Wildcard` and are consulted
/// on every indexed fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Symbol(String),
    Wildcard,
}

/// A Horn-style rule: a conclusion pattern and a body query. A rule stated
/// without a body gets the always-true query.
#[derive(Debug, Clone)]
pub struct Rule {
    pub conclusion: Rc<Term>,
    pub body: Query,
}

/// A named host predicate for the predicate-filter query form. Receives
/// fully-instantiated argument terms and answers true or false.
pub type PredicateFn = Rc<dyn Fn(&[Rc<Term>]) -> Result<bool, String>>;

/// The knowledge base: append-only registers of assertions and rules, a
/// head-symbol index over both, the host-predicate registry, and the
/// rule-application generation counter.
///
/// Registers are lazy streams yielding most-recently-added first. Cloning a
/// database is cheap and snapshots the registers: streams captured inside an
/// in-flight evaluation are unaffected by later adds. The generation counter
/// is shared across clones so nested rule applications keep drawing fresh
/// ids.
#[derive(Clone)]
pub struct Database {
    assertions: Stream<Rc<Term>>,
    rules: Stream<Rc<Rule>>,
    assertion_index: IndexMap<IndexKey, Stream<Rc<Term>>>,
    rule_index: IndexMap<IndexKey, Stream<Rc<Rule>>>,
    predicates: HashMap<String, PredicateFn>,
    generation: Rc<Cell<u64>>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Database {
            assertions: Stream::empty(),
            rules: Stream::empty(),
            assertion_index: IndexMap::new(),
            rule_index: IndexMap::new(),
            predicates: builtin_predicates(),
            generation: Rc::new(Cell::new(0)),
        }
    }

    /// Add a rule or an assertion. `(rule CONCLUSION)` and
    /// `(rule CONCLUSION BODY)` become rules; anything else is an assertion
    /// and must be a pair. The body is validated into a query here, so a
    /// malformed body is rejected at add time.
    pub fn add(&mut self, item: &Rc<Term>) -> Result<(), EvalError> {
        match rule_parts(item) {
            Some(parts) => self.add_rule(parts),
            None => self.add_assertion(item),
        }
    }

    fn add_rule(&mut self, parts: Vec<Rc<Term>>) -> Result<(), EvalError> {
        let (conclusion, body) = match parts.as_slice() {
            [conclusion] => (conclusion.clone(), Query::True),
            [conclusion, body] => (conclusion.clone(), Query::from_term(body)?),
            _ => {
                let mut form = vec![Term::symbol("rule")];
                form.extend(parts);
                return Err(EvalError::InvalidRule(Term::list(form).to_string()));
            }
        };
        debug!("add rule: {conclusion}");

        let rule = Rc::new(Rule { conclusion, body });
        // Index first, master register second: anything visible in the
        // master is already indexed.
        if let Some(key) = index_key_of(&rule.conclusion) {
            let bucket = self.rule_index.entry(key).or_default();
            *bucket = Stream::cons(rule.clone(), Delayed::ready(bucket.clone()));
        }
        self.rules = Stream::cons(rule, Delayed::ready(self.rules.clone()));
        Ok(())
    }

    fn add_assertion(&mut self, assertion: &Rc<Term>) -> Result<(), EvalError> {
        if !matches!(&**assertion, Term::Pair(_, _)) {
            return Err(EvalError::InvalidAssertion(assertion.to_string()));
        }
        debug!("add assertion: {assertion}");

        if let Some(key) = index_key_of(assertion) {
            let bucket = self.assertion_index.entry(key).or_default();
            *bucket = Stream::cons(assertion.clone(), Delayed::ready(bucket.clone()));
        }
        self.assertions =
            Stream::cons(assertion.clone(), Delayed::ready(self.assertions.clone()));
        Ok(())
    }

    /// Candidate assertions for a pattern: the keyed bucket when the head is
    /// a constant symbol, otherwise the full register.
    pub fn fetch_assertions(&self, pattern: &Rc<Term>) -> Stream<Rc<Term>> {
        match index_key_of(pattern) {
            Some(IndexKey::Symbol(s)) => self
                .assertion_index
                .get(&IndexKey::Symbol(s))
                .cloned()
                .unwrap_or_default(),
            _ => self.assertions.clone(),
        }
    }

    /// Candidate rules for a pattern. An indexed fetch appends the wildcard
    /// bucket: rules with variable-headed conclusions apply to anything.
    pub fn fetch_rules(&self, pattern: &Rc<Term>) -> Stream<Rc<Rule>> {
        match index_key_of(pattern) {
            Some(IndexKey::Symbol(s)) => {
                let keyed = self
                    .rule_index
                    .get(&IndexKey::Symbol(s))
                    .cloned()
                    .unwrap_or_default();
                let wild = self
                    .rule_index
                    .get(&IndexKey::Wildcard)
                    .cloned()
                    .unwrap_or_default();
                keyed.append_delayed(Delayed::ready(wild))
            }
            _ => self.rules.clone(),
        }
    }

    pub fn assertions(&self) -> Stream<Rc<Term>> {
        self.assertions.clone()
    }

    pub fn rules(&self) -> Stream<Rc<Rule>> {
        self.rules.clone()
    }

    /// Draw a fresh generation id for one rule application.
    pub(crate) fn next_generation(&self) -> u64 {
        let gen = self.generation.get() + 1;
        self.generation.set(gen);
        gen
    }

    /// Register a named host predicate, replacing any previous one.
    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&[Rc<Term>]) -> Result<bool, String> + 'static,
    ) {
        self.predicates.insert(name.into(), Rc::new(f));
    }

    pub(crate) fn apply_predicate(
        &self,
        name: &str,
        args: &[Rc<Term>],
    ) -> Result<bool, EvalError> {
        let f = self
            .predicates
            .get(name)
            .ok_or_else(|| EvalError::UnknownPredicate(name.to_string()))?;
        f(args).map_err(|message| EvalError::Predicate {
            name: name.to_string(),
            message,
        })
    }
}

/// `Some(parts)` when the item is a `(rule ...)` form.
fn rule_parts(item: &Rc<Term>) -> Option<Vec<Rc<Term>>> {
    let head = item.head()?;
    if head.as_symbol() != Some("rule") {
        return None;
    }
    let mut items = item.list_items()?;
    items.remove(0);
    Some(items)
}

/// Index key of a pattern: its head constant symbol, `Wildcard` for a
/// variable head, `None` for anything unindexable.
pub(crate) fn index_key_of(pattern: &Rc<Term>) -> Option<IndexKey> {
    match &**pattern.head()? {
        Term::Constant(Constant::Symbol(s)) => Some(IndexKey::Symbol(s.clone())),
        Term::Var(_) => Some(IndexKey::Wildcard),
        _ => None,
    }
}

fn builtin_predicates() -> HashMap<String, PredicateFn> {
    let mut map: HashMap<String, PredicateFn> = HashMap::new();
    map.insert("=".into(), Rc::new(all_equal));
    map.insert("<".into(), comparison(&[Ordering::Less]));
    map.insert(">".into(), comparison(&[Ordering::Greater]));
    map.insert("<=".into(), comparison(&[Ordering::Less, Ordering::Equal]));
    map.insert(">=".into(), comparison(&[Ordering::Greater, Ordering::Equal]));
    map
}

/// Structural equality across all arguments.
fn all_equal(args: &[Rc<Term>]) -> Result<bool, String> {
    Ok(args.windows(2).all(|w| w[0] == w[1]))
}

/// Exact integer comparison chained across the argument list.
fn comparison(accept: &'static [Ordering]) -> PredicateFn {
    Rc::new(move |args: &[Rc<Term>]| {
        let mut nums: Vec<&BigInt> = Vec::with_capacity(args.len());
        for arg in args {
            match arg.as_int() {
                Some(i) => nums.push(i),
                None => return Err(format!("expects integers, got {arg}")),
            }
        }
        Ok(nums.windows(2).all(|w| accept.contains(&w[0].cmp(w[1]))))
    })
}
