//! Build conditions and inspect the SQL they produce. No database needed.

use pgmeta::{Condition, Op, Quote, Rhs, Select};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Flat AND/OR groups.
    let mut c = Condition::new();
    c.add_and("status", Rhs::value("active"))?
        .add_and("age", Rhs::value(18_i32))?
        .add_or("role", Rhs::value("admin"))?;
    let stmt = c.clause().expect("non-empty");
    println!("template: {}", stmt.sql());
    println!("postgres: {}", stmt.to_pg_sql());
    println!("params:   {}", stmt.params().len());

    // Arrays rewrite equality to IN, ranges bind both bounds.
    let mut c = Condition::new();
    c.add_and("id", Rhs::list(vec![1_i64, 2, 3]))?
        .add_and_with("created", Rhs::list(vec![2023, 2025]), Op::Between, Quote::Right)?
        .add_and_with("deleted_at", Rhs::null(), Op::NotEqual, Quote::Right)?;
    println!("\n{}", c.clause().expect("non-empty").sql());

    // Nesting: a condition as the left operand becomes a parenthesized group.
    let mut inner = Condition::new();
    inner
        .add_and("kind", Rhs::value("sale"))?
        .add_and("total", Rhs::value(100_i64))?;
    let mut outer = Condition::new();
    outer.add_and("region", Rhs::value("eu"))?;
    outer.add_or(inner, Rhs::null())?;
    println!("\n{}", outer.clause().expect("non-empty").sql());

    // Sub-selects nest as parenthesized fragments.
    let sub = Select::from("orders")?.columns(["user_id"]);
    let mut c = Condition::new();
    c.add_and("id", Rhs::select(sub))?;
    println!("\n{}", c.clause().expect("non-empty").sql());

    Ok(())
}
