use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// The three fatal error families the driver reports to the user. Every
/// `RuntimeError` variant maps onto exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Name,
    Type,
    Fault,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Name => write!(f, "NAME"),
            ErrorKind::Type => write!(f, "TYPE"),
            ErrorKind::Fault => write!(f, "FAULT"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    #[error("Unknown variable `{name}`")]
    #[diagnostic(code(slate::runtime::unknown_variable))]
    UnknownVariable { name: String },

    #[error("Unknown function `{name}` taking {arity} argument(s)")]
    #[diagnostic(code(slate::runtime::unknown_function))]
    UnknownFunction { name: String, arity: usize },

    #[error("Object `{objref}` has no method `{name}`")]
    #[diagnostic(code(slate::runtime::unknown_method))]
    UnknownMethod { objref: String, name: String },

    #[error("Object `{name}` has no field `{field}`")]
    #[diagnostic(code(slate::runtime::unknown_field))]
    UnknownField { name: String, field: String },

    #[error("Function name `{name}` is ambiguous")]
    #[diagnostic(code(slate::runtime::ambiguous_function))]
    AmbiguousFunction { name: String },

    #[error("No `main` function was found")]
    #[diagnostic(code(slate::runtime::missing_main))]
    MissingMain,

    #[error("`{name}` takes at most one prompt argument")]
    #[diagnostic(code(slate::runtime::prompt_arity))]
    PromptArity { name: String },

    #[error("Type mismatch: {message}")]
    #[diagnostic(code(slate::runtime::type_mismatch))]
    TypeMismatch { message: String },

    #[error("Variable `{name}` is not an object")]
    #[diagnostic(code(slate::runtime::not_an_object))]
    NotAnObject { name: String },

    #[error("`proto` must be an object or nil, got {type_name}")]
    #[diagnostic(code(slate::runtime::invalid_proto))]
    InvalidProto { type_name: &'static str },

    #[error("`{name}` is not callable with {arity} argument(s)")]
    #[diagnostic(code(slate::runtime::not_callable))]
    NotCallable { name: String, arity: usize },

    #[error("Condition must be bool or int, got {type_name}")]
    #[diagnostic(code(slate::runtime::invalid_condition))]
    InvalidCondition { type_name: &'static str },

    #[error("Reference parameter `{name}` requires a variable argument")]
    #[diagnostic(code(slate::runtime::invalid_ref_argument))]
    InvalidRefArgument { name: String },

    #[error("Input requested but none is available")]
    #[diagnostic(code(slate::runtime::input_exhausted))]
    InputExhausted,

    #[error("Expected an integer input, got `{line}`")]
    #[diagnostic(code(slate::runtime::malformed_input))]
    MalformedInput { line: String },

    #[error("Division by zero")]
    #[diagnostic(code(slate::runtime::division_by_zero))]
    DivisionByZero,

    #[error("`proto` chain contains a cycle")]
    #[diagnostic(code(slate::runtime::proto_cycle))]
    ProtoCycle,
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::UnknownVariable { .. }
            | RuntimeError::UnknownFunction { .. }
            | RuntimeError::UnknownMethod { .. }
            | RuntimeError::UnknownField { .. }
            | RuntimeError::AmbiguousFunction { .. }
            | RuntimeError::MissingMain
            | RuntimeError::PromptArity { .. } => ErrorKind::Name,
            RuntimeError::TypeMismatch { .. }
            | RuntimeError::NotAnObject { .. }
            | RuntimeError::InvalidProto { .. }
            | RuntimeError::NotCallable { .. }
            | RuntimeError::InvalidCondition { .. }
            | RuntimeError::InvalidRefArgument { .. } => ErrorKind::Type,
            RuntimeError::InputExhausted
            | RuntimeError::MalformedInput { .. }
            | RuntimeError::DivisionByZero
            | RuntimeError::ProtoCycle => ErrorKind::Fault,
        }
    }
}
