use std::rc::Rc;

use num_bigint::BigInt;
use pest::iterators::Pair;
use pest::Parser as PestParser; // trait (gives SexprParser::parse)
use pest_derive::Parser; // derive macro (generates Rule enum + impl)
use thiserror::Error;

use crate::ast::Term;

#[derive(Parser)]
#[grammar = "sexpr.pest"]
struct SexprParser;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parse error: {0}")]
    Pest(#[from] Box<pest::error::Error<Rule>>),
    #[error("unexpected rule: {0:?}")]
    Unexpected(Rule),
    #[error("not an integer: {0}")]
    BadInteger(String),
}

/// Parse a whole program: zero or more expressions.
pub fn parse_program(input: &str) -> Result<Vec<Rc<Term>>, ParseError> {
    let mut pairs = SexprParser::parse(Rule::program, input).map_err(Box::new)?;
    let program = pairs.next().ok_or(ParseError::Unexpected(Rule::program))?;

    let mut out = vec![];
    for item in program.into_inner() {
        if item.as_rule() == Rule::EOI {
            continue;
        }
        out.push(build_term(item)?);
    }
    Ok(out)
}

/// Parse a single expression; trailing input is an error.
pub fn parse_expr(input: &str) -> Result<Rc<Term>, ParseError> {
    let mut exprs = parse_program(input)?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        _ => Err(ParseError::Unexpected(Rule::program)),
    }
}

fn build_term(pair: Pair<Rule>) -> Result<Rc<Term>, ParseError> {
    match pair.as_rule() {
        Rule::list => build_list(pair),
        Rule::integer => {
            let text = pair.as_str();
            let n: BigInt = text
                .parse()
                .map_err(|_| ParseError::BadInteger(text.to_string()))?;
            Ok(Term::int(n))
        }
        Rule::string => {
            let inner = pair
                .into_inner()
                .next()
                .ok_or(ParseError::Unexpected(Rule::string))?;
            Ok(Term::string(unescape_string(inner.as_str())))
        }
        Rule::symbol => Ok(Term::symbol(pair.as_str())),
        r => Err(ParseError::Unexpected(r)),
    }
}

fn build_list(pair: Pair<Rule>) -> Result<Rc<Term>, ParseError> {
    let mut items = vec![];
    let mut dotted_tail = None;

    for p in pair.into_inner() {
        if p.as_rule() == Rule::dotted {
            let inner = p
                .into_inner()
                .next()
                .ok_or(ParseError::Unexpected(Rule::dotted))?;
            dotted_tail = Some(build_term(inner)?);
        } else {
            items.push(build_term(p)?);
        }
    }

    let tail = dotted_tail.unwrap_or_else(Term::nil);
    Ok(items
        .into_iter()
        .rev()
        .fold(tail, |tail, head| Term::cons(head, tail)))
}

fn unescape_string(s: &str) -> String {
    s.replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_lists() {
        let t = parse_expr("(job (bitdiddle ben) (computer wizard))").unwrap();
        let items = t.list_items().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_symbol(), Some("job"));
        assert_eq!(items[1].list_items().unwrap().len(), 2);
    }

    #[test]
    fn parses_integers_and_strings() {
        let t = parse_expr("(salary ben 60000 \"usd\")").unwrap();
        let items = t.list_items().unwrap();
        assert_eq!(items[2].as_int().map(|i| i.to_string()), Some("60000".into()));
        assert_eq!(items[3].to_string(), "\"usd\"");
    }

    #[test]
    fn question_marked_symbols_lex_as_one_token() {
        let t = parse_expr("(job ?who)").unwrap();
        let items = t.list_items().unwrap();
        assert_eq!(items[1].as_symbol(), Some("?who"));
    }

    #[test]
    fn parses_dotted_pairs() {
        let t = parse_expr("(a . b)").unwrap();
        assert_eq!(t.to_string(), "(a . b)");
        assert!(t.list_items().is_none());
    }

    #[test]
    fn skips_comments_and_parses_a_program() {
        let exprs = parse_program(
            "; facts\n(parent a b)\n(parent b c) ; inline\n",
        )
        .unwrap();
        assert_eq!(exprs.len(), 2);
    }

    #[test]
    fn negative_integers_and_bare_minus() {
        let t = parse_expr("(-12 - >=)").unwrap();
        let items = t.list_items().unwrap();
        assert_eq!(items[0].as_int().map(|i| i.to_string()), Some("-12".into()));
        assert_eq!(items[1].as_symbol(), Some("-"));
        assert_eq!(items[2].as_symbol(), Some(">="));
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(parse_expr("(a (b c)").is_err());
        assert!(parse_expr("(a) (b)").is_err());
    }
}
