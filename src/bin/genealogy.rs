use quarry::{expand_question_marks, parse_expr, parse_program, Database};

const FAMILY: &str = "
(parent abraham isaac)
(parent isaac jacob)
(parent jacob joseph)
(rule (ancestor ?x ?y) (parent ?x ?y))
(rule (ancestor ?x ?y) (and (parent ?x ?z) (ancestor ?z ?y)))
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Load facts and rules.
    let mut db = Database::new();
    for item in parse_program(FAMILY)? {
        db.add(&expand_question_marks(&item))?;
    }

    // 2) Everyone Abraham is an ancestor of.
    let query = expand_question_marks(&parse_expr("(ancestor abraham ?who)")?);
    println!(":> {query}");
    for answer in db.query(&query)? {
        println!("{}", answer?);
    }

    // 3) Everyone in Joseph's line.
    let query = expand_question_marks(&parse_expr("(ancestor ?who joseph)")?);
    println!(":> {query}");
    for answer in db.query(&query)? {
        println!("{}", answer?);
    }

    Ok(())
}
