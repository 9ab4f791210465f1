//! flatc-batch - batch compilation of FlatBuffers schemas
//!
//! Runs an external schema compiler (`flatc`) once per schema file:
//! - Invocations run strictly in order, one at a time
//! - A schema the compiler rejects is reported and the batch continues
//! - A compiler that cannot be launched aborts the batch

pub mod batch;
pub mod config;
pub mod error;
pub mod fakes;
pub mod input;
pub mod invocation;
pub mod runner;
pub mod telemetry;

// Re-export key types
pub use batch::{AbortReason, BatchReport, BatchRunner, ItemResult, ItemStatus};
pub use config::BatchConfig;
pub use error::{BatchError, ConfigError, InputError, InvokeError};
pub use input::{ChainedSource, InputSource, ListFileSource, PathListSource};
pub use invocation::{Invocation, SchemaInput};
pub use runner::{CompilerInvoker, InvocationOutput, ProcessInvoker};
pub use telemetry::init_tracing;
