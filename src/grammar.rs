//! The grammar registry: the fixed table of operators, functions, constants
//! and bracket pairs a [crate::builder::ConditionBuilder] recognizes.
//!
//! A [Grammar] is built once from a [Parameters] set and is immutable
//! afterwards, so a single instance can be shared by any number of
//! concurrent parses. [default_grammar] does exactly that for the
//! predefined table.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Name of the predefined NULL constant.
pub const NULL: &str = "$NULL$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Where the unary minus sits relative to the other operators.
///
/// The standard profile gives it precedence 5 (binds tighter than `*` and
/// `/`); the Excel-like profile raises it to 7.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrecedenceProfile {
    #[default]
    Standard,
    ExcelLike,
}

/// An infix or prefix operator. The symbol written in the expression may
/// differ from the symbol emitted into SQL (`!=` becomes `<>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    symbol: String,
    operand_count: u8,
    associativity: Associativity,
    precedence: u8,
    sql_symbol: String,
}

impl Operator {
    pub fn new(
        symbol: &str,
        operand_count: u8,
        associativity: Associativity,
        precedence: u8,
        sql_symbol: &str,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            operand_count,
            associativity,
            precedence,
            sql_symbol: sql_symbol.to_string(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn operand_count(&self) -> u8 {
        self.operand_count
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }

    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    pub fn sql_symbol(&self) -> &str {
        &self.sql_symbol
    }
}

/// A SQL function the builder passes through by name. The argument counts
/// are metadata only; they are not enforced during a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    name: String,
    min_args: u8,
    max_args: u8,
}

impl Function {
    pub fn new(name: &str, min_args: u8, max_args: u8) -> Self {
        Self {
            name: name.to_string(),
            min_args,
            max_args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_args(&self) -> u8 {
        self.min_args
    }

    pub fn max_args(&self) -> u8 {
        self.max_args
    }
}

/// A named symbolic value. Unlike a literal it has no fixed text; it
/// resolves against the field in context at bind time. Only [NULL] is
/// predefined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    name: String,
}

impl Constant {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_null(&self) -> bool {
        self.name == NULL
    }
}

/// An open/close symbol pair. Function-call brackets and
/// expression-grouping brackets live in separate namespaces even when they
/// share symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPair {
    open: String,
    close: String,
}

impl BracketPair {
    pub fn new(open: &str, close: &str) -> Self {
        Self {
            open: open.to_string(),
            close: close.to_string(),
        }
    }

    pub fn parentheses() -> Self {
        Self::new("(", ")")
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

/// Raised while building a [Grammar]. These are configuration mistakes and
/// abort construction; they can never surface from a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// More than two operators registered under one symbol.
    TooManyHomonyms(String),
    /// Two operators share a symbol but take the same number of operands,
    /// so one token of lookback cannot tell them apart.
    IndistinguishableHomonyms(String),
}

impl std::fmt::Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooManyHomonyms(sym) => {
                write!(f, "More than two operators registered for symbol '{sym}'")
            }
            Self::IndistinguishableHomonyms(sym) => {
                write!(
                    f,
                    "Operators sharing symbol '{sym}' must differ in operand count"
                )
            }
        }
    }
}

impl std::error::Error for GrammarError {}

/// The mutable collection side of the registry: everything a [Grammar] is
/// built from. `standard` yields the predefined table.
#[derive(Debug, Clone)]
pub struct Parameters {
    operators: Vec<Operator>,
    functions: Vec<Function>,
    constants: Vec<Constant>,
    function_brackets: Vec<BracketPair>,
    expression_brackets: Vec<BracketPair>,
    argument_separator: String,
    decimal_point: u8,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::new()
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self {
            operators: Vec::new(),
            functions: Vec::new(),
            constants: Vec::new(),
            function_brackets: Vec::new(),
            expression_brackets: Vec::new(),
            argument_separator: ",".to_string(),
            decimal_point: b'.',
        }
    }

    /// The whole predefined set: arithmetic, comparisons, `LIKE`, the
    /// logical operators, the `$NULL$` constant and parentheses in both
    /// bracket namespaces.
    pub fn standard(profile: PrecedenceProfile) -> Self {
        use Associativity::{Left, Right};

        let negate_precedence = match profile {
            PrecedenceProfile::Standard => 5,
            PrecedenceProfile::ExcelLike => 7,
        };

        let mut params = Self::new();
        for op in [
            Operator::new("-", 1, Right, negate_precedence, "-"),
            Operator::new("-", 2, Left, 3, "-"),
            Operator::new("+", 2, Left, 3, "+"),
            Operator::new("*", 2, Left, 4, "*"),
            Operator::new("/", 2, Left, 4, "/"),
            Operator::new("%", 2, Left, 4, "%"),
            Operator::new("=", 2, Left, 2, "="),
            Operator::new("!=", 2, Left, 2, "<>"),
            Operator::new(">", 2, Left, 2, ">"),
            Operator::new(">=", 2, Left, 2, ">="),
            Operator::new("<", 2, Left, 2, "<"),
            Operator::new("<=", 2, Left, 2, "<="),
            Operator::new("LIKE", 2, Left, 2, "LIKE"),
            Operator::new("AND", 2, Left, 1, "AND"),
            Operator::new("OR", 2, Left, 1, "OR"),
            Operator::new("NOT", 1, Right, 2, "NOT"),
        ] {
            params.add_operator(op);
        }
        params.add_constant(Constant::new(NULL));
        params.add_function_bracket(BracketPair::parentheses());
        params.add_expression_bracket(BracketPair::parentheses());
        params
    }

    pub fn add_operator(&mut self, op: Operator) -> &mut Self {
        self.operators.push(op);
        self
    }

    pub fn add_function(&mut self, f: Function) -> &mut Self {
        self.functions.push(f);
        self
    }

    pub fn add_constant(&mut self, c: Constant) -> &mut Self {
        self.constants.push(c);
        self
    }

    pub fn add_function_bracket(&mut self, pair: BracketPair) -> &mut Self {
        self.function_brackets.push(pair);
        self
    }

    pub fn add_expression_bracket(&mut self, pair: BracketPair) -> &mut Self {
        self.expression_brackets.push(pair);
        self
    }

    pub fn set_argument_separator(&mut self, sep: &str) -> &mut Self {
        self.argument_separator = sep.to_string();
        self
    }

    pub fn set_decimal_point(&mut self, point: u8) -> &mut Self {
        self.decimal_point = point;
        self
    }
}

/// The built, read-only registry. Operators are grouped by symbol so that
/// homonyms (unary vs binary `-`) can be resolved from parse context;
/// both bracket namespaces are indexed by open and close symbol alike.
#[derive(Debug)]
pub struct Grammar {
    operators: HashMap<String, Vec<Operator>>,
    functions: HashMap<String, Function>,
    constants: HashMap<String, Constant>,
    function_brackets: HashMap<String, BracketPair>,
    expression_brackets: HashMap<String, BracketPair>,
    argument_separator: String,
    /// Every delimiter the tokenizer splits on, longest first.
    delimiters: Vec<String>,
    decimal_point: u8,
}

impl Grammar {
    pub fn new(params: Parameters) -> Result<Self, GrammarError> {
        let mut delimiters: Vec<String> = Vec::new();

        let mut function_brackets = HashMap::new();
        for pair in &params.function_brackets {
            function_brackets.insert(pair.open.clone(), pair.clone());
            function_brackets.insert(pair.close.clone(), pair.clone());
            delimiters.push(pair.open.clone());
            delimiters.push(pair.close.clone());
        }

        let mut expression_brackets = HashMap::new();
        for pair in &params.expression_brackets {
            expression_brackets.insert(pair.open.clone(), pair.clone());
            expression_brackets.insert(pair.close.clone(), pair.clone());
            delimiters.push(pair.open.clone());
            delimiters.push(pair.close.clone());
        }

        let mut operators: HashMap<String, Vec<Operator>> = HashMap::new();
        for op in params.operators {
            delimiters.push(op.symbol.clone());
            let known = operators.entry(op.symbol.clone()).or_default();
            known.push(op);
            if known.len() > 1 {
                validate_homonyms(known)?;
            }
        }

        let mut functions = HashMap::new();
        for f in params.functions {
            functions.insert(f.name.clone(), f);
        }

        let mut constants = HashMap::new();
        for c in params.constants {
            constants.insert(c.name.clone(), c);
        }

        delimiters.push(params.argument_separator.clone());
        delimiters.sort();
        delimiters.dedup();
        // Longest first, so the tokenizer never splits `>=` into `>` `=`.
        delimiters.sort_by_key(|d| std::cmp::Reverse(d.len()));

        Ok(Self {
            operators,
            functions,
            constants,
            function_brackets,
            expression_brackets,
            argument_separator: params.argument_separator,
            delimiters,
            decimal_point: params.decimal_point,
        })
    }

    pub fn operators(&self, symbol: &str) -> Option<&[Operator]> {
        self.operators.get(symbol).map(Vec::as_slice)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name)
    }

    /// Looks up a bracket symbol in the expression namespace first, then
    /// the function namespace.
    pub fn bracket_pair(&self, symbol: &str) -> Option<&BracketPair> {
        self.expression_brackets
            .get(symbol)
            .or_else(|| self.function_brackets.get(symbol))
    }

    pub fn is_function_bracket(&self, symbol: &str) -> bool {
        self.function_brackets.contains_key(symbol)
    }

    pub fn is_expression_bracket(&self, symbol: &str) -> bool {
        self.expression_brackets.contains_key(symbol)
    }

    pub fn argument_separator(&self) -> &str {
        &self.argument_separator
    }

    /// Delimiter substrings for the tokenizer, sorted longest first.
    pub fn delimiters(&self) -> &[String] {
        &self.delimiters
    }

    pub fn decimal_point(&self) -> u8 {
        self.decimal_point
    }
}

/// Homonym operators share an input symbol. One token of lookback can only
/// distinguish arity, so at most two are allowed and they must differ in
/// operand count.
fn validate_homonyms(operators: &[Operator]) -> Result<(), GrammarError> {
    let symbol = || operators[0].symbol.clone();
    if operators.len() > 2 {
        return Err(GrammarError::TooManyHomonyms(symbol()));
    }
    if let [a, b] = operators
        && a.operand_count == b.operand_count
    {
        return Err(GrammarError::IndistinguishableHomonyms(symbol()));
    }
    Ok(())
}

/// The shared registry for the standard profile, built on first use.
pub fn default_grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        Grammar::new(Parameters::standard(PrecedenceProfile::Standard))
            .expect("predefined grammar is valid")
    })
}
