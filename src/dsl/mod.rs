//! Definition documents: schema types, parser, and structural validation.
//!
//! The engine core only consumes [`FlowSchema`]; any front-end that
//! produces that shape can replace the bundled parser.

mod parser;
mod schema;
mod validator;

pub use parser::{parse_definition, DslFormat};
pub use schema::{
    FieldOptionSchema, FieldSchema, FieldValidationSchema, FlowSchema, FormSchema, NodeSchema,
    PropertySchema, TransitionSchema,
};
pub use validator::validate_schema;
