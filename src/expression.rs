use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::rendering_context::RenderingContext;
use serde_json::Value;

pub const PAGE_NUMBER_PARAM: &str = "pageNum";

/// Resolves parameterized attribute strings against run-time data.
pub trait ExpressionResolver: Send + Sync {
    /// Replaces every parameter reference in `template`. Unresolvable references
    /// are errors unless `fallback` is supplied.
    fn evaluate(
        &self,
        ctx: &RenderingContext,
        data: &DataContext,
        template: &str,
        fallback: Option<&str>,
    ) -> Result<String, BlockPrintError>;
}

/// `${name}` substitution. Names are dotted paths looked up in the block's data
/// first and the render-wide data second; `${pageNum}` is the current page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    fn resolve_param(
        &self,
        ctx: &RenderingContext,
        data: &DataContext,
        name: &str,
    ) -> Option<String> {
        if name == PAGE_NUMBER_PARAM {
            return Some(ctx.current_page().to_string());
        }
        data.lookup(name)
            .or_else(|| ctx.data().lookup(name))
            .map(format_value)
    }
}

impl ExpressionResolver for TemplateResolver {
    fn evaluate(
        &self,
        ctx: &RenderingContext,
        data: &DataContext,
        template: &str,
        fallback: Option<&str>,
    ) -> Result<String, BlockPrintError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            rest = &rest[start + 2..];

            let Some(end) = rest.find('}') else {
                return match fallback {
                    Some(value) => Ok(value.to_string()),
                    None => Err(BlockPrintError::expression(
                        template,
                        "unclosed parameter reference",
                    )),
                };
            };

            let name = rest[..end].trim();
            match self.resolve_param(ctx, data, name) {
                Some(value) => out.push_str(&value),
                None => match fallback {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(BlockPrintError::expression(
                            template,
                            format!("unknown parameter '{}'", name),
                        ));
                    }
                },
            }
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn parse_number(template: &str, resolved: &str) -> Result<f64, BlockPrintError> {
    let trimmed = resolved.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BlockPrintError::expression(
            template,
            format!("'{}' is not a number", trimmed),
        )),
    }
}
