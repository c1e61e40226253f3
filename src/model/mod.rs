//! Persisted record types and engine result shapes.

mod flow;
mod form;
mod instance;
mod operating;
mod result;
mod types;

pub use flow::{Flow, Node, NodeAssignment, NodeProperty, Transition};
pub use form::{FieldOption, FieldProperty, FieldValidation, Form, FormField};
pub use instance::{FlowInstance, NodeCandidate, NodeInstance, NodeTiming};
pub use operating::{FormBatch, NodeBatch};
pub use result::{HandleResult, NextNode, TodoItem};
pub use types::{FlowFlag, FlowInstanceStatus, FlowStatus, NodeInstanceStatus, NodeType};
