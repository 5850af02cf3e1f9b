//! dw-star - Embedded Starlark expression runtime for Driftwood
//!
//! Wraps the `starlark` crate with the engine's execution context
//! (`config` / `env` / `target` / `this` / `ref` plus macro namespaces),
//! the host value conversion layer, the macro loader and registry, and the
//! bounded evaluator-thread pool.

pub mod context;
pub mod error;
pub mod macros;
pub mod pool;
pub mod value;

pub use context::{ContextSpec, ExecutionContext, TargetInfo, ThisInfo};
pub use error::{EvalError, StarError, StarResult};
pub use macros::{load_and_register, MacroModule, MacroRegistry, RESERVED_NAMESPACES};
pub use pool::{EvalResult, EvalTask, ParallelExecutor, ThreadPool, DEFAULT_POOL_SIZE};
pub use value::ScriptValue;

// Re-exported so downstream crates (the renderer) can hold raw runtime
// values without depending on `starlark` directly.
pub use starlark::values::Value;
