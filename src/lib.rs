mod block;
mod canvas;
mod columns;
mod data_context;
mod debug;
mod doc_template;
mod error;
mod expression;
mod flowable;
mod frame;
mod grid;
mod layout;
mod metrics;
mod rendering_context;
mod table_config;
mod types;

pub use block::{Block, MapBlock, TextBlock};
pub use canvas::{Canvas, Command, Document, Page};
pub use columns::ColumnsBlock;
pub use data_context::DataContext;
pub use doc_template::{DocTemplate, META_PAGE_LAYOUT_KEY};
pub use error::BlockPrintError;
pub use expression::{ExpressionResolver, PAGE_NUMBER_PARAM, TemplateResolver};
pub use flowable::{FlowTarget, Flowable, MapFrame, Paragraph, Story, TextAlign};
pub use frame::{AddResult, Frame};
pub use grid::{Grid, GridBuilder, GridCell, TableBuilder};
pub use layout::{Layout, PageLayout};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use rendering_context::{DeferredContent, DeferredDraw, RenderingContext};
pub use table_config::{CellConfig, CellStyle, TableConfig};
pub use types::{Color, Margins, Pt, Rect, Size};

use debug::DebugLogger;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

/// Renders validated layouts into recorded documents.
///
/// A `BlockPrint` is immutable once built and may render any number of
/// layouts; every render gets its own [`RenderingContext`].
pub struct BlockPrint {
    page_size: Size,
    margins: Margins,
    default_spacing_after: Pt,
    resolver: Arc<dyn ExpressionResolver>,
    table_builder: Arc<dyn TableBuilder>,
    debug: Option<Arc<DebugLogger>>,
}

impl BlockPrint {
    pub fn builder() -> BlockPrintBuilder {
        BlockPrintBuilder::new()
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn render(&self, layout: &Layout, data: Value) -> Result<Document, BlockPrintError> {
        let (document, _) = self.render_with_metrics(layout, data)?;
        Ok(document)
    }

    /// Validates `layout`, then renders each page layout from a fresh page.
    /// Nothing is drawn when validation fails.
    pub fn render_with_metrics(
        &self,
        layout: &Layout,
        data: Value,
    ) -> Result<(Document, DocumentMetrics), BlockPrintError> {
        layout.validate()?;

        let mut ctx = RenderingContext::new(DataContext::new(data))
            .with_resolver(Arc::clone(&self.resolver))
            .with_table_builder(Arc::clone(&self.table_builder))
            .with_default_spacing_after(self.default_spacing_after);
        let template = DocTemplate::new(self.page_size, self.margins).with_debug(self.debug.clone());
        let mut canvas = Canvas::new(self.page_size);
        let mut metrics = DocumentMetrics::default();
        let root_data = DataContext::default();

        let result = layout.pages().iter().try_for_each(|page| {
            ctx.set_current_page(canvas.page_number());
            if let Some(logger) = self.debug.as_deref() {
                logger.log_event(
                    "render.page_layout",
                    json!({
                        "layout": page.name(),
                        "page": canvas.page_number(),
                        "blocks": page.blocks().len(),
                    }),
                );
                logger.increment("render.page_layout", 1);
            }

            let mut story = Story::new();
            page.render(&root_data, &mut story, &mut ctx)?;
            let deferred = ctx.take_deferred_draws();
            if let Some(logger) = self.debug.as_deref() {
                logger.log_event(
                    "render.deferred_registered",
                    json!({
                        "layout": page.name(),
                        "flowables": story.len(),
                        "deferred": deferred.len(),
                    }),
                );
                logger.increment("render.deferred_registered", deferred.len() as u64);
            }
            template.compose(&mut canvas, page.name(), story, deferred, &mut metrics)
        });

        self.emit_debug_summary("render");
        result?;
        Ok((canvas.finish(), metrics))
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

pub struct BlockPrintBuilder {
    page_size: Size,
    margins: Margins,
    default_spacing_after: Pt,
    resolver: Arc<dyn ExpressionResolver>,
    table_builder: Arc<dyn TableBuilder>,
    debug_path: Option<PathBuf>,
}

impl BlockPrintBuilder {
    pub fn new() -> Self {
        Self {
            page_size: Size::a4(),
            margins: Margins::all(36.0),
            default_spacing_after: Pt::ZERO,
            resolver: Arc::new(TemplateResolver),
            table_builder: Arc::new(GridBuilder),
            debug_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.margins = Margins::all(value);
        self
    }

    pub fn default_spacing_after(mut self, spacing: f32) -> Self {
        self.default_spacing_after = Pt::from_f32(spacing);
        self
    }

    /// Writes JSONL render events to `path`; the file is created by `build()`.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn ExpressionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn table_builder(mut self, builder: Arc<dyn TableBuilder>) -> Self {
        self.table_builder = builder;
        self
    }

    pub fn build(self) -> Result<BlockPrint, BlockPrintError> {
        if self.page_size.width <= Pt::ZERO || self.page_size.height <= Pt::ZERO {
            return Err(BlockPrintError::InvalidConfiguration(format!(
                "page size must be positive (got {}x{}pt)",
                self.page_size.width.to_f32(),
                self.page_size.height.to_f32()
            )));
        }
        let m = self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < Pt::ZERO) {
            return Err(BlockPrintError::InvalidConfiguration(
                "margins must be non-negative".to_string(),
            ));
        }
        if m.left + m.right >= self.page_size.width || m.top + m.bottom >= self.page_size.height {
            return Err(BlockPrintError::InvalidConfiguration(
                "margins leave no room for content".to_string(),
            ));
        }
        if self.default_spacing_after < Pt::ZERO {
            return Err(BlockPrintError::InvalidConfiguration(
                "default_spacing_after must be non-negative".to_string(),
            ));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(BlockPrint {
            page_size: self.page_size,
            margins: self.margins,
            default_spacing_after: self.default_spacing_after,
            resolver: self.resolver,
            table_builder: self.table_builder,
            debug,
        })
    }
}

impl Default for BlockPrintBuilder {
    fn default() -> Self {
        Self::new()
    }
}
