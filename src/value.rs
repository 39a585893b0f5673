//! Typed values bound into the prepared statement, the [Field] contract
//! they are converted through, and the binder that resolves a literal
//! token against the field in context.

use chrono::{NaiveDate, NaiveDateTime};

use crate::grammar::Grammar;

/// The payload of a bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i32),
    Long(i64),
    Double(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// A converted literal, tagged with the column it binds against. The
/// ordered sequence of these produced by a parse is the positional
/// parameter list for the prepared statement; `data: None` is SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub column: String,
    pub data: Option<Scalar>,
}

/// A literal that could not be converted to the field's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertError {
    pub field: String,
    pub literal: String,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Incorrect value for field {}: {}",
            self.field, self.literal
        )
    }
}

impl std::error::Error for ConvertError {}

/// The form-field contract the compiler works against. Implementations
/// are owned by the surrounding application; [FieldDef] is the stock one.
pub trait Field {
    /// Stable identifier, matched against `'...'` references.
    fn id(&self) -> &str;

    /// The SQL column expression this field resolves to.
    fn mapping(&self) -> &str;

    /// Converts literal text to a typed value; `None` means SQL NULL.
    fn from_string(&self, text: Option<&str>) -> Result<Value, ConvertError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Long,
    Double,
    Text,
    Boolean,
    Date,
    DateTime,
}

/// A plain column-backed field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    id: String,
    column: String,
    ty: FieldType,
}

impl FieldDef {
    pub fn new(id: &str, column: &str, ty: FieldType) -> Self {
        Self {
            id: id.to_string(),
            column: column.to_string(),
            ty,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    fn incorrect(&self, text: &str) -> ConvertError {
        ConvertError {
            field: self.id.clone(),
            literal: text.to_string(),
        }
    }
}

impl Field for FieldDef {
    fn id(&self) -> &str {
        &self.id
    }

    fn mapping(&self) -> &str {
        &self.column
    }

    fn from_string(&self, text: Option<&str>) -> Result<Value, ConvertError> {
        let Some(text) = text else {
            return Ok(Value {
                column: self.column.clone(),
                data: None,
            });
        };
        let data = match self.ty {
            FieldType::Integer => text
                .parse::<i32>()
                .map(Scalar::Int)
                .map_err(|_| self.incorrect(text))?,
            FieldType::Long => text
                .parse::<i64>()
                .map(Scalar::Long)
                .map_err(|_| self.incorrect(text))?,
            FieldType::Double => text
                .parse::<f64>()
                .map(Scalar::Double)
                .map_err(|_| self.incorrect(text))?,
            FieldType::Text => Scalar::Text(text.to_string()),
            FieldType::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Scalar::Bool(true),
                "false" | "f" | "0" => Scalar::Bool(false),
                _ => return Err(self.incorrect(text)),
            },
            FieldType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Scalar::Date)
                .map_err(|_| self.incorrect(text))?,
            FieldType::DateTime => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .map(Scalar::DateTime)
                .map_err(|_| self.incorrect(text))?,
        };
        Ok(Value {
            column: self.column.clone(),
            data: Some(data),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A literal appeared before any field reference, so there is no type
    /// to convert it against.
    NoFieldContext { literal: String },
    Convert(ConvertError),
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFieldContext { literal } => {
                write!(f, "No field to type literal against: {literal}")
            }
            Self::Convert(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BindError {}

impl From<ConvertError> for BindError {
    fn from(value: ConvertError) -> Self {
        Self::Convert(value)
    }
}

/// Resolves a literal token to a bound [Value].
///
/// The `$NULL$` constant becomes a null value typed to the field in
/// context; everything else goes through that field's `from_string`
/// conversion. Without a field in context the literal cannot be typed.
pub fn bind(
    grammar: &Grammar,
    literal: &str,
    last_field: Option<&dyn Field>,
) -> Result<Value, BindError> {
    if grammar.constant(literal).is_some_and(|c| c.is_null())
        && let Some(field) = last_field
    {
        return Ok(field.from_string(None)?);
    }
    let field = last_field.ok_or_else(|| BindError::NoFieldContext {
        literal: literal.to_string(),
    })?;
    Ok(field.from_string(Some(literal))?)
}
