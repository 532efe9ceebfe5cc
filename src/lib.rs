#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod builder;
mod computation;
mod error;
mod graph;
mod node;
pub mod ops;
mod schema;
mod shared;
pub mod tracer;

pub use builder::*;
pub use computation::*;
pub use error::*;
pub use graph::*;
pub use node::*;
pub use schema::*;
pub use shared::*;
pub use tracer::{EvalEvent, EventCollector, InvalidationReason, NoopTracer, Tracer};

#[cfg(feature = "tracing")]
pub use tracer::TracingTracer;
