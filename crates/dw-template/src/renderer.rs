//! Template renderer: interprets the AST against an execution context.

use crate::error::{TemplateError, TemplateResult};
use crate::parser::{parse_string, Node, Template};
use dw_star::{ContextSpec, ExecutionContext, Value};

/// Renders a parsed template with an execution context.
///
/// Holds no shared mutable state; loop bindings are kept in a scope vector
/// copied into each iteration, so mutations never propagate back out.
pub struct Renderer<'v> {
    ctx: &'v ExecutionContext,
    locals: Vec<(String, Value<'v>)>,
}

impl<'v> Renderer<'v> {
    pub fn new(ctx: &'v ExecutionContext) -> Self {
        Self {
            ctx,
            locals: Vec::new(),
        }
    }

    /// Execute the template and return the rendered SQL.
    pub fn render(&mut self, template: &Template) -> TemplateResult<String> {
        let mut out = String::new();
        self.render_nodes(&template.nodes, &mut out, &template.file)?;
        Ok(out)
    }

    fn render_nodes(&mut self, nodes: &[Node], out: &mut String, file: &str) -> TemplateResult<()> {
        for node in nodes {
            self.render_node(node, out, file)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &Node, out: &mut String, file: &str) -> TemplateResult<()> {
        match node {
            Node::Text { text, .. } => out.push_str(text),

            Node::Expr { expr, pos } => {
                let rendered = self
                    .ctx
                    .eval_expr_string(expr, file, pos.line, &self.locals)?;
                out.push_str(&rendered);
            }

            Node::For { var, iter, body, pos } => {
                let iter_value = self.ctx.eval_expr(iter, file, pos.line, &self.locals)?;

                let elements: Vec<Value<'v>> = iter_value
                    .iterate(self.ctx.heap())
                    .map_err(|_| TemplateError::CannotIterate {
                        file: file.to_string(),
                        line: pos.line,
                        column: pos.column,
                        type_name: iter_value.get_type().to_string(),
                    })?
                    .collect();

                for element in elements {
                    // child scope: a copy of the parent locals plus the
                    // loop binding, discarded after the iteration
                    let mut child = Renderer {
                        ctx: self.ctx,
                        locals: self.locals.clone(),
                    };
                    child.locals.push((var.clone(), element));
                    child.render_nodes(body, out, file)?;
                }
            }

            Node::If {
                branches,
                else_body,
                ..
            } => {
                for branch in branches {
                    let condition = self.ctx.eval_expr(
                        &branch.condition,
                        file,
                        branch.pos.line,
                        &self.locals,
                    )?;
                    if condition.to_bool() {
                        return self.render_nodes(&branch.body, out, file);
                    }
                }
                if let Some(body) = else_body {
                    return self.render_nodes(body, out, file);
                }
            }
        }
        Ok(())
    }
}

/// Convenience: parse and render a template string against a context spec.
pub fn render_string(input: &str, file: &str, spec: &ContextSpec) -> TemplateResult<String> {
    let template = parse_string(input, file)?;
    let ctx = spec
        .build()
        .map_err(|e| dw_star::EvalError::new(file, 0, "<context>", &e.to_string()))?;
    let mut renderer = Renderer::new(&ctx);
    renderer.render(&template)
}

#[cfg(test)]
#[path = "renderer_test.rs"]
mod tests;
