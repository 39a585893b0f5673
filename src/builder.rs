//! The condition builder: a single pass over the token stream that emits
//! a SQL WHERE fragment and the ordered bound-value list beside it.
//!
//! The builder never interpolates literal text into the SQL: every
//! literal becomes a `?` placeholder and a [Value] appended to the bound
//! list, in left-to-right source order. That ordering is the contract the
//! prepared-statement executor relies on.

use crate::grammar::Grammar;
use crate::lex::{self, Tokenizer};
use crate::token::{self, Token, classify};
use crate::value::{self, Field, Value, bind};

/// The compiled result: a WHERE-clause fragment with `?` placeholders and
/// the values to bind, one per placeholder, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub sql: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lexical(lex::Error),
    Classify(token::Error),
    Bind(value::BindError),
    /// A function-call bracket outside a call, or a grouping bracket
    /// right after a function name.
    BracketMismatch(String),
    /// A close bracket with no open bracket to match.
    UnbalancedClose,
    /// Bracket depth was not zero at end of input.
    UnterminatedGroup,
    /// A separator or close bracket where an argument should be.
    MissingArgument,
    /// The argument separator outside any function call.
    SeparatorOutsideCall,
    /// Two literals with nothing between them.
    AdjacentLiterals,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical(e) => write!(f, "Lexical error: {e}"),
            Self::Classify(e) => write!(f, "{e}"),
            Self::Bind(e) => write!(f, "{e}"),
            Self::BracketMismatch(tok) => write!(f, "Invalid bracket in expression: {tok}"),
            Self::UnbalancedClose => {
                write!(f, "Close bracket with no matching open bracket")
            }
            Self::UnterminatedGroup => write!(f, "Unclosed bracket in expression"),
            Self::MissingArgument => write!(f, "Argument is missing"),
            Self::SeparatorOutsideCall => {
                write!(f, "Argument separator outside a function call")
            }
            Self::AdjacentLiterals => write!(f, "A literal can't follow another literal"),
        }
    }
}

impl std::error::Error for Error {}

impl From<lex::Error> for Error {
    fn from(value: lex::Error) -> Self {
        Self::Lexical(value)
    }
}

impl From<token::Error> for Error {
    fn from(value: token::Error) -> Self {
        Self::Classify(value)
    }
}

impl From<value::BindError> for Error {
    fn from(value: value::BindError) -> Self {
        Self::Bind(value)
    }
}

/// Compiles condition expressions against a grammar. Holds no per-parse
/// state, so one builder serves any number of concurrent compiles.
#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'g> {
    grammar: &'g Grammar,
}

impl<'g> ConditionBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Compiles `expression` into a WHERE fragment plus bound values.
    /// `fields` is the list of fields a `'...'` reference may name.
    ///
    /// Fails on the first lexical, syntactic, field-lookup or conversion
    /// error; no partial SQL is ever returned.
    pub fn build_condition(
        &self,
        expression: &str,
        fields: &[&dyn Field],
    ) -> Result<Condition, Error> {
        let mut tokens = Tokenizer::new(
            expression,
            self.grammar.delimiters(),
            self.grammar.decimal_point(),
        );
        let mut sql = String::new();
        let mut values: Vec<Value> = Vec::new();
        // One entry per open bracket; true when it opened a function call.
        let mut brackets: Vec<bool> = Vec::new();
        let mut previous: Option<Token> = None;
        let mut last_field: Option<&dyn Field> = None;

        while let Some(raw) = tokens.next_token()? {
            let token = classify(self.grammar, previous.as_ref(), raw, fields)?;
            match token {
                Token::OpenBracket(pair) => {
                    // A function's argument list must use a function-call
                    //  bracket; everywhere else only grouping brackets
                    //  are legal.
                    let after_function = matches!(previous, Some(Token::Function(_)));
                    let legal = if after_function {
                        self.grammar.is_function_bracket(pair.open())
                    } else {
                        self.grammar.is_expression_bracket(pair.open())
                    };
                    if !legal {
                        return Err(Error::BracketMismatch(raw.to_string()));
                    }
                    sql.push('(');
                    brackets.push(after_function);
                }
                Token::CloseBracket(_) => {
                    if previous.is_none() || brackets.is_empty() {
                        return Err(Error::UnbalancedClose);
                    }
                    if matches!(previous, Some(Token::ArgumentSeparator)) {
                        return Err(Error::MissingArgument);
                    }
                    sql.push(')');
                    brackets.pop();
                }
                Token::ArgumentSeparator => {
                    if brackets.last() != Some(&true) {
                        return Err(Error::SeparatorOutsideCall);
                    }
                    if matches!(
                        previous,
                        None | Some(Token::OpenBracket(_)) | Some(Token::ArgumentSeparator)
                    ) {
                        return Err(Error::MissingArgument);
                    }
                    sql.push(',');
                }
                Token::Function(function) => {
                    sql.push_str(function.name());
                }
                Token::Operator(op) => {
                    sql.push(' ');
                    sql.push_str(op.sql_symbol());
                }
                Token::Field(field) => {
                    sql.push(' ');
                    sql.push_str(field.mapping());
                    last_field = Some(field);
                }
                Token::Literal(text) => {
                    if matches!(previous, Some(Token::Literal(_))) {
                        return Err(Error::AdjacentLiterals);
                    }
                    let value = bind(self.grammar, text, last_field)?;
                    sql.push_str(" ?");
                    values.push(value);
                }
            }
            previous = Some(token);
        }
        if !brackets.is_empty() {
            return Err(Error::UnterminatedGroup);
        }
        Ok(Condition { sql, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Function, Grammar, Parameters, PrecedenceProfile, default_grammar};
    use crate::value::{BindError, FieldDef, FieldType, Scalar};

    fn form_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("age", "\"age_col\"", FieldType::Integer),
            FieldDef::new("name", "\"name_col\"", FieldType::Text),
            FieldDef::new("balance", "\"balance\"", FieldType::Double),
        ]
    }

    fn build(expression: &str) -> Result<Condition, Error> {
        build_with(default_grammar(), expression)
    }

    fn build_with(grammar: &Grammar, expression: &str) -> Result<Condition, Error> {
        let fields = form_fields();
        let refs: Vec<&dyn Field> = fields.iter().map(|f| f as &dyn Field).collect();
        ConditionBuilder::new(grammar).build_condition(expression, &refs)
    }

    /// A grammar with functions registered, for the call-syntax tests.
    fn grammar_with_functions() -> Grammar {
        let mut params = Parameters::standard(PrecedenceProfile::Standard);
        params.add_function(Function::new("UPPER", 1, 1));
        params.add_function(Function::new("COALESCE", 1, 2));
        Grammar::new(params).unwrap()
    }

    #[test]
    fn integer_comparison() {
        let cond = build("'age' > 25").unwrap();
        assert!(cond.sql.ends_with("\"age_col\" > ?"), "got: {}", cond.sql);
        assert_eq!(cond.values.len(), 1);
        assert_eq!(cond.values[0].column, "\"age_col\"");
        assert_eq!(cond.values[0].data, Some(Scalar::Int(25)));
    }

    #[test]
    fn string_literal_binds_as_text() {
        let cond = build(r#"'name' = "Bob""#).unwrap();
        assert!(cond.sql.ends_with("\"name_col\" = ?"));
        assert_eq!(cond.values[0].data, Some(Scalar::Text("Bob".to_string())));
    }

    #[test]
    fn sql_symbol_substitution() {
        let cond = build("'age' != 30").unwrap();
        assert!(cond.sql.contains("<>"), "got: {}", cond.sql);
        assert!(!cond.sql.contains("!="));
    }

    #[test]
    fn placeholders_match_values_in_source_order() {
        let cond = build(r#"('age' > 25 AND 'name' LIKE "A%") OR 'balance' <= 10.5"#).unwrap();
        let placeholders = cond.sql.matches('?').count();
        assert_eq!(placeholders, 3);
        assert_eq!(cond.values.len(), 3);
        assert_eq!(cond.values[0].data, Some(Scalar::Int(25)));
        assert_eq!(cond.values[1].data, Some(Scalar::Text("A%".to_string())));
        assert_eq!(cond.values[2].data, Some(Scalar::Double(10.5)));
        // No literal text leaks into the SQL
        assert!(!cond.sql.contains("25"));
        assert!(!cond.sql.contains("A%"));
    }

    #[test]
    fn deterministic_output() {
        let a = build("'age' >= 18 AND 'name' = \"Ada\"").unwrap();
        let b = build("'age' >= 18 AND 'name' = \"Ada\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn null_constant_binds_as_typed_null() {
        let cond = build("'name' = $NULL$").unwrap();
        assert!(cond.sql.ends_with("\"name_col\" = ?"));
        assert_eq!(cond.values[0].column, "\"name_col\"");
        assert_eq!(cond.values[0].data, None);
    }

    #[test]
    fn literal_typed_by_the_last_seen_field() {
        let cond = build("'age' = 1 OR 'name' = \"x\" AND 'balance' > 2").unwrap();
        assert_eq!(cond.values[2].column, "\"balance\"");
        assert_eq!(cond.values[2].data, Some(Scalar::Double(2.0)));
    }

    #[test]
    fn unary_minus_emits_before_placeholder() {
        let cond = build("'age' = -1").unwrap();
        assert!(cond.sql.ends_with("\"age_col\" = - ?"), "got: {}", cond.sql);
        assert_eq!(cond.values[0].data, Some(Scalar::Int(1)));
    }

    #[test]
    fn leading_literal_cannot_be_typed() {
        let err = build("-1 + 2").unwrap_err();
        assert_eq!(
            err,
            Error::Bind(BindError::NoFieldContext {
                literal: "1".to_string()
            })
        );
    }

    #[test]
    fn untypable_bare_word_fails() {
        // `IS` is neither a constant nor a valid integer for `age`
        let err = build("'age' IS").unwrap_err();
        assert!(matches!(err, Error::Bind(BindError::Convert(_))), "{err:?}");
    }

    #[test]
    fn unknown_field_fails() {
        let err = build("'salary' > 100").unwrap_err();
        assert_eq!(
            err,
            Error::Classify(token::Error::FieldNotFound("salary".to_string()))
        );
    }

    #[test]
    fn unbalanced_close_fails() {
        assert_eq!(build("'age' > )").unwrap_err(), Error::UnbalancedClose);
        assert_eq!(build(")").unwrap_err(), Error::UnbalancedClose);
    }

    #[test]
    fn unterminated_group_fails() {
        assert_eq!(build("('age' > 25").unwrap_err(), Error::UnterminatedGroup);
    }

    #[test]
    fn adjacent_literals_fail() {
        assert_eq!(build("'age' > 25 30").unwrap_err(), Error::AdjacentLiterals);
    }

    #[test]
    fn separator_outside_function_call_fails() {
        assert_eq!(
            build("('age' = 25, 30)").unwrap_err(),
            Error::SeparatorOutsideCall
        );
        assert_eq!(
            build("'age' = 25, 30").unwrap_err(),
            Error::SeparatorOutsideCall
        );
    }

    #[test]
    fn grouping_parens_emit() {
        let cond = build("('age' > 25)").unwrap();
        assert_eq!(cond.sql, "( \"age_col\" > ?)");
    }

    #[test]
    fn function_call_passes_through() {
        let g = grammar_with_functions();
        let cond = build_with(&g, r#"UPPER('name') = "BOB""#).unwrap();
        assert_eq!(cond.sql, "UPPER( \"name_col\") = ?");
        assert_eq!(cond.values[0].data, Some(Scalar::Text("BOB".to_string())));
    }

    #[test]
    fn separator_inside_function_call() {
        let g = grammar_with_functions();
        let cond = build_with(&g, r#"COALESCE('name', "none") = "x""#).unwrap();
        assert_eq!(cond.sql, "COALESCE( \"name_col\", ?) = ?");
        assert_eq!(cond.values.len(), 2);
    }

    #[test]
    fn dangling_separator_fails() {
        let g = grammar_with_functions();
        assert_eq!(
            build_with(&g, "COALESCE('name',)").unwrap_err(),
            Error::MissingArgument
        );
        assert_eq!(
            build_with(&g, "COALESCE(,'name')").unwrap_err(),
            Error::MissingArgument
        );
    }

    #[test]
    fn bracket_namespaces_are_distinct() {
        // Functions call with square brackets; parens only group.
        let mut params = Parameters::new();
        params
            .add_operator(crate::grammar::Operator::new(
                "=",
                2,
                crate::grammar::Associativity::Left,
                2,
                "=",
            ))
            .add_function(Function::new("UPPER", 1, 1))
            .add_function_bracket(crate::grammar::BracketPair::new("[", "]"))
            .add_expression_bracket(crate::grammar::BracketPair::parentheses());
        let g = Grammar::new(params).unwrap();

        // Grouping bracket right after a function name
        assert_eq!(
            build_with(&g, "UPPER('name')").unwrap_err(),
            Error::BracketMismatch("(".to_string())
        );
        // Function bracket with no function before it
        assert_eq!(
            build_with(&g, "['name']").unwrap_err(),
            Error::BracketMismatch("[".to_string())
        );
        // And the legal pairing works
        let cond = build_with(&g, "UPPER['name'] = \"A\"").unwrap();
        assert_eq!(cond.sql, "UPPER( \"name_col\") = ?");
    }

    #[test]
    fn excel_profile_compiles_identically() {
        // Precedence only matters to the registry; the emitted SQL keeps
        //  the source order either way.
        let excel = Grammar::new(Parameters::standard(PrecedenceProfile::ExcelLike)).unwrap();
        let a = build("'age' = -1").unwrap();
        let b = build_with(&excel, "'age' = -1").unwrap();
        assert_eq!(a.sql, b.sql);
    }

    #[test]
    fn empty_expression_compiles_empty() {
        let cond = build("").unwrap();
        assert_eq!(cond.sql, "");
        assert!(cond.values.is_empty());
    }

    #[test]
    fn unterminated_quote_surfaces_as_lexical() {
        assert!(matches!(build("'age").unwrap_err(), Error::Lexical(_)));
    }

    #[test]
    fn concurrent_parses_share_one_grammar() {
        let results: Vec<_> = std::thread::scope(|scope| {
            (0..8)
                .map(|i| {
                    scope.spawn(move || {
                        let expr = format!("'age' > {i} AND 'name' = \"u{i}\"");
                        build(&expr).unwrap()
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });
        for (i, cond) in results.iter().enumerate() {
            assert_eq!(cond.values[0].data, Some(Scalar::Int(i as i32)));
        }
    }
}
