//! Compiles user-written boolean filter expressions, e.g.
//! `'age' > 25 AND 'name' LIKE "A%"`, into parameterized SQL WHERE
//! fragments plus the ordered list of typed values to bind.
//!
//! ```rust
//! use dbcond::builder::ConditionBuilder;
//! use dbcond::grammar::default_grammar;
//! use dbcond::value::{Field, FieldDef, FieldType};
//!
//! let age = FieldDef::new("age", "\"age_col\"", FieldType::Integer);
//! let fields: Vec<&dyn Field> = vec![&age];
//!
//! let builder = ConditionBuilder::new(default_grammar());
//! let cond = builder.build_condition("'age' > 25", &fields).unwrap();
//! assert_eq!(cond.sql, " \"age_col\" > ?");
//! assert_eq!(cond.values.len(), 1);
//! ```

pub mod builder;
pub mod grammar;
pub mod lex;
pub mod resolver;
pub mod token;
pub mod value;
