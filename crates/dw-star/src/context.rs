//! Per-model execution context for template rendering.
//!
//! A [`ContextSpec`] is the host-side, thread-safe description of one
//! model's globals: `config`, `env`, `target`, `this`, the resolved `ref`
//! table, and the macro registry. [`ContextSpec::build`] materializes it
//! into an [`ExecutionContext`] owning a live Starlark module; every
//! expression of one model render evaluates against that module with a
//! fresh evaluator.

use crate::error::{EvalError, StarError, StarResult};
use crate::macros::MacroRegistry;
use crate::value::ScriptValue;
use starlark::environment::{Globals, Module};
use starlark::eval::Evaluator;
use starlark::syntax::{AstModule, Dialect};
use starlark::values::structs::AllocStruct;
use starlark::values::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The `target` record exposed to templates (`target.type`, `target.schema`,
/// `target.database`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub db_type: String,
    pub schema: String,
    pub database: String,
}

/// The `this` record exposed to templates (`this.name`, `this.schema`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThisInfo {
    pub name: String,
    pub schema: String,
}

/// `ref()` is defined in Starlark itself, closing over the injected
/// `_ref_map` of harvested references. Anything outside that map was
/// dynamically constructed and is rejected at render time.
const REF_PRELUDE: &str = r#"
def ref(name):
    if type(name) != "string":
        fail("ref() argument must be a string, got " + type(name))
    if name not in _ref_map:
        fail("ref() arguments must be static string literals naming a referenced model; '" + name + "' is not one")
    return _ref_map[name]
"#;

/// Host-side description of one model's globals. `Send + Sync`; workers
/// build their own live context from it.
#[derive(Debug, Clone)]
pub struct ContextSpec {
    /// Frontmatter mapping exposed as `config`
    pub config: ScriptValue,
    /// Active environment name exposed as `env`
    pub env: String,
    /// Target record, when connected
    pub target: Option<TargetInfo>,
    /// Current-model record
    pub this: Option<ThisInfo>,
    /// Harvested reference name -> physical identifier
    pub ref_targets: BTreeMap<String, String>,
    /// Loaded macro namespaces
    pub macros: Arc<MacroRegistry>,
}

impl ContextSpec {
    /// A minimal spec with an empty config and no macros.
    pub fn bare(env: &str) -> Self {
        Self {
            config: ScriptValue::Dict(Vec::new()),
            env: env.to_string(),
            target: None,
            this: None,
            ref_targets: BTreeMap::new(),
            macros: Arc::new(MacroRegistry::new()),
        }
    }

    /// Materialize a live execution context.
    pub fn build(&self) -> StarResult<ExecutionContext> {
        let module = Module::new();
        let globals = Globals::standard();

        {
            let heap = module.heap();
            module.set("config", self.config.alloc(heap));
            module.set("env", heap.alloc(self.env.as_str()));

            if let Some(target) = &self.target {
                let record = heap.alloc(AllocStruct([
                    ("type", heap.alloc(target.db_type.as_str())),
                    ("schema", heap.alloc(target.schema.as_str())),
                    ("database", heap.alloc(target.database.as_str())),
                ]));
                module.set("target", record);
            }

            if let Some(this) = &self.this {
                let record = heap.alloc(AllocStruct([
                    ("name", heap.alloc(this.name.as_str())),
                    ("schema", heap.alloc(this.schema.as_str())),
                ]));
                module.set("this", record);
            }

            let ref_map = ScriptValue::Dict(
                self.ref_targets
                    .iter()
                    .map(|(k, v)| (k.as_str().into(), v.as_str().into()))
                    .collect(),
            );
            module.set("_ref_map", ref_map.alloc(heap));

            // Macro namespaces become frozen attribute-bearing records.
            for (namespace, macro_module) in self.macros.iter() {
                let mut fields: Vec<(&str, Value)> = Vec::with_capacity(macro_module.exports.len());
                for export in &macro_module.exports {
                    let owned = macro_module
                        .module
                        .get(export)
                        .map_err(|e| StarError::Internal(e.to_string()))?;
                    fields.push((export.as_str(), owned.owned_value(module.frozen_heap())));
                }
                let record = heap.alloc(AllocStruct(fields));
                module.set(namespace, record);
            }
        }

        let ctx = ExecutionContext {
            module,
            globals,
            frame_id: std::cell::Cell::new(0),
        };
        ctx.eval_source(REF_PRELUDE, "<ref>", 0)
            .map_err(|e| StarError::Internal(e.to_string()))?;
        Ok(ctx)
    }
}

/// A live per-model evaluation context. Single-threaded; one is built per
/// model render (or per worker in the parallel executor).
pub struct ExecutionContext {
    module: Module,
    globals: Globals,
    /// Monotonic id for locals frames, so each gets a fresh binding name.
    frame_id: std::cell::Cell<usize>,
}

impl ExecutionContext {
    /// The heap backing this context's values.
    pub fn heap(&self) -> &starlark::values::Heap {
        self.module.heap()
    }

    /// Expression mode: evaluate to a runtime value.
    ///
    /// `locals` shadow globals for the duration of this evaluation only.
    /// They are bound as parameters of a throwaway function frame, never as
    /// module bindings, so a loop variable is unbound again the moment its
    /// block ends.
    pub fn eval_expr<'v>(
        &'v self,
        expr: &str,
        file: &str,
        line: usize,
        locals: &[(String, Value<'v>)],
    ) -> Result<Value<'v>, EvalError> {
        if expr.trim().is_empty() {
            return Err(EvalError::new(file, line, expr, "empty expression"));
        }

        if locals.is_empty() {
            return self.eval_source(expr, file, line);
        }

        // Innermost binding wins when a nested loop reuses a name.
        let mut params: Vec<&str> = Vec::with_capacity(locals.len());
        let mut args: Vec<Value<'v>> = Vec::with_capacity(locals.len());
        for (name, value) in locals {
            if let Some(idx) = params.iter().position(|p| *p == name.as_str()) {
                args[idx] = *value;
            } else {
                params.push(name.as_str());
                args.push(*value);
            }
        }

        let frame = self.frame_id.get();
        self.frame_id.set(frame + 1);
        let frame_name = format!("_dw_frame_{frame}");
        let source = format!(
            "def {frame_name}({params}):\n    return ({expr})\n{frame_name}",
            params = params.join(", "),
        );

        let function = self
            .eval_source(&source, file, line)
            .map_err(|e| EvalError::new(file, line, expr, &e.message))?;

        let mut eval = Evaluator::new(&self.module);
        eval.eval_function(function, &args, &[])
            .map_err(|e| EvalError::new(file, line, expr, &e.to_string()))
    }

    /// Stringified expression mode: evaluate, then render with `str()`
    /// semantics for textual interpolation.
    pub fn eval_expr_string<'v>(
        &'v self,
        expr: &str,
        file: &str,
        line: usize,
        locals: &[(String, Value<'v>)],
    ) -> Result<String, EvalError> {
        let value = self.eval_expr(expr, file, line, locals)?;
        Ok(value.to_str())
    }

    /// Evaluate and marshal the result into a host value.
    pub fn eval_value(&self, expr: &str, file: &str, line: usize) -> Result<ScriptValue, EvalError> {
        let value = self.eval_expr(expr, file, line, &[])?;
        Ok(ScriptValue::from_value(value))
    }

    fn eval_source<'v>(
        &'v self,
        source: &str,
        file: &str,
        line: usize,
    ) -> Result<Value<'v>, EvalError> {
        let ast = AstModule::parse(file, source.to_owned(), &Dialect::Standard)
            .map_err(|e| EvalError::new(file, line, source, &e.to_string()))?;
        let mut eval = Evaluator::new(&self.module);
        eval.eval_module(ast, &self.globals)
            .map_err(|e| EvalError::new(file, line, source, &e.to_string()))
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
