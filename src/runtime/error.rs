use thiserror::Error;

/// Errors raised while driving a lowered computation.
///
/// All of these come from embedded expressions or from the values they
/// produce; a stop-now signal is a normal outcome, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    #[error("type mismatch in `{op}`: expected {expected}, found {found}")]
    TypeMismatch {
        op: String,
        expected: &'static str,
        found: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in `{0}`")]
    Overflow(&'static str),

    #[error("range step must not be zero")]
    ZeroStep,

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{name}` takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown record type `{0}`")]
    UnknownType(String),

    #[error("record `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("record `{type_name}` is missing field `{field}`")]
    MissingField { type_name: String, field: String },

    #[error("value of type {0} has no fold implementation")]
    NotFoldable(String),

    #[error("value of type {0} cannot drive a `for` loop; use `@yieldfrom` to fold it")]
    NotIterable(String),

    #[error("{name}: {message}")]
    Native { name: String, message: String },

    #[error("item produced outside a producer body")]
    ItemInScript,
}

impl EvalError {
    pub fn native(name: &str, message: impl Into<String>) -> Self {
        EvalError::Native {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
