//! # Procflow — a lightweight business-process workflow engine
//!
//! `procflow` executes versioned process definitions: a deployed flow is a
//! directed graph of start events, user tasks, parallel gateways, and end
//! or terminate events, connected by guarded transitions. Flow instances
//! advance one completed node at a time; user tasks rest until a candidate
//! completes them, and guards plus candidate assignments are evaluated by
//! a pluggable expression engine.
//!
//! - **Deployment**: YAML or JSON definitions, versioned per flow code;
//!   re-deploying an already-stored version is a no-op.
//! - **Routing**: depth-first traversal with join suppression for user
//!   tasks, pending-branch guards before parallel joins, and terminate
//!   events that end the instance regardless of open branches.
//! - **Expressions**: the [`Execer`] trait races evaluation against a
//!   cancellation token; [`BasicExecer`] covers comparison and membership
//!   guards over the input payload.
//! - **Persistence**: everything goes through the [`FlowStore`] trait;
//!   [`MemoryFlowStore`] is the bundled in-memory implementation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use procflow::{BasicExecer, DslFormat, Engine, MemoryFlowStore};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new(
//!         Arc::new(MemoryFlowStore::new()),
//!         Arc::new(BasicExecer::new()),
//!     );
//!     let yaml = std::fs::read_to_string("flow.yaml").unwrap();
//!     engine.deploy(&yaml, DslFormat::Yaml).await.unwrap();
//!     let result = engine
//!         .start_flow(
//!             CancellationToken::new(),
//!             "leave",
//!             "start",
//!             "F001",
//!             r#"{"day":1}"#,
//!         )
//!         .await
//!         .unwrap();
//!     println!("ended: {}", result.is_end);
//! }
//! ```

pub mod dsl;
pub mod engine;
pub mod error;
pub mod expression;
pub mod model;
pub mod runtime;
pub mod service;
pub mod store;

pub use dsl::{parse_definition, validate_schema, DslFormat, FlowSchema};
pub use engine::{Engine, NodeRouter, RouterOptions};
pub use error::FlowError;
pub use expression::{build_exp_context, BasicExecer, Execer};
pub use model::{
    Flow, FlowInstance, FlowInstanceStatus, HandleResult, NextNode, Node, NodeInstance,
    NodeInstanceStatus, NodeType, TodoItem,
};
pub use runtime::{IdGenerator, RuntimeContext, TimeProvider};
pub use service::FlowService;
pub use store::{FlowStore, MemoryFlowStore};
