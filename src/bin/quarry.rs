use std::io::Read;
use std::{env, fs, io};
use std::rc::Rc;

use quarry::{expand_question_marks, parse_program, Database, Term};

/// Driver loop: read a program, add `(assert! ITEM)` forms to the database,
/// evaluate everything else as a query and print one instantiated result
/// per line. Fatal errors are reported and the loop resumes with the next
/// expression.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths: Vec<String> = env::args().skip(1).collect();

    let input = if paths.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        let mut buf = String::new();
        for path in &paths {
            buf.push_str(&fs::read_to_string(path)?);
            buf.push('\n');
        }
        buf
    };

    // 1) Read the whole program up front.
    let exprs = parse_program(&input)?;

    // 2) Process each expression in order.
    let mut db = Database::new();
    for raw in &exprs {
        let expr = expand_question_marks(raw);
        match assertion_body(&expr) {
            Some(item) => {
                if let Err(e) = db.add(&item) {
                    eprintln!("error: {e}");
                }
            }
            None => run_query(&db, &expr),
        }
    }

    Ok(())
}

/// `Some(ITEM)` when the expression is `(assert! ITEM)`.
fn assertion_body(expr: &Rc<Term>) -> Option<Rc<Term>> {
    if expr.head()?.as_symbol() != Some("assert!") {
        return None;
    }
    match expr.list_items()?.as_slice() {
        [_, item] => Some(item.clone()),
        _ => None,
    }
}

fn run_query(db: &Database, expr: &Rc<Term>) {
    let answers = match db.query(expr) {
        Ok(answers) => answers,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };

    for answer in answers {
        match answer {
            Ok(result) => println!("{result}"),
            Err(e) => {
                eprintln!("error: {e}");
                return;
            }
        }
    }
}
