mod ast;
mod parser;
mod syntax;
mod stream;
mod frame;
mod unify;
mod db;
mod eval;

pub use ast::{Constant, Term, Var};
pub use parser::{parse_expr, parse_program, ParseError};
pub use syntax::{contract_question_mark, expand_question_marks};
pub use stream::{Delayed, Stream};
pub use frame::Frame;
pub use unify::{depends_on, pattern_match, unify};
pub use db::{Database, IndexKey, PredicateFn, Rule};
pub use eval::{
    instantiate,
    qeval,
    resolve,
    Answers,
    EvalError,
    EvalResult,
    FrameStream,
    Query,
};
