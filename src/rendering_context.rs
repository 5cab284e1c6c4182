use crate::canvas::Canvas;
use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::expression::{ExpressionResolver, TemplateResolver, parse_number};
use crate::flowable::{Flowable, MapFrame};
use crate::grid::{Grid, GridBuilder, TableBuilder};
use crate::types::{Pt, Rect};
use std::sync::Arc;

pub enum DeferredContent {
    /// Grid snapshot built at render time plus the sizing applied when painted.
    Grid {
        grid: Option<Grid>,
        width: Pt,
        widths: Option<Vec<u32>>,
    },
    Map(MapFrame),
}

/// Content painted at a page coordinate once the page is finalized.
/// `(x, y)` is the top-left corner in page space.
pub struct DeferredDraw {
    x: Pt,
    y: Pt,
    content: DeferredContent,
}

impl DeferredDraw {
    pub fn grid(x: Pt, y: Pt, width: Pt, grid: Option<Grid>, widths: Option<Vec<u32>>) -> Self {
        Self {
            x,
            y,
            content: DeferredContent::Grid {
                grid,
                width,
                widths,
            },
        }
    }

    pub fn map(x: Pt, y: Pt, frame: MapFrame) -> Self {
        Self {
            x,
            y,
            content: DeferredContent::Map(frame),
        }
    }

    pub fn position(&self) -> (Pt, Pt) {
        (self.x, self.y)
    }

    pub fn content(&self) -> &DeferredContent {
        &self.content
    }

    /// Paints onto the page being finalized inside its own graphics state.
    /// Returns `false` when there was nothing to paint.
    pub fn draw(self, canvas: &mut Canvas) -> Result<bool, BlockPrintError> {
        let (x, y) = (self.x, self.y);
        match self.content {
            DeferredContent::Grid { grid: None, .. } => Ok(false),
            DeferredContent::Grid {
                grid: Some(mut grid),
                width,
                widths,
            } => {
                grid.set_total_width(width);
                grid.lock_width();
                if let Some(widths) = widths {
                    grid.set_widths(&widths)?;
                }
                canvas.save_state();
                let height = grid.write_selected_rows(canvas, 0, None, x, y);
                canvas.restore_state();
                canvas.record_bounds(Rect {
                    x,
                    y: y - height,
                    width,
                    height,
                });
                Ok(true)
            }
            DeferredContent::Map(frame) => {
                let size = frame.size();
                canvas.save_state();
                frame.draw(canvas, x, y, size.width);
                canvas.restore_state();
                canvas.record_bounds(Rect {
                    x,
                    y: y - size.height,
                    width: size.width,
                    height: size.height,
                });
                Ok(true)
            }
        }
    }
}

/// Per-render state threaded through the block tree. Create one per render.
pub struct RenderingContext {
    data: DataContext,
    resolver: Arc<dyn ExpressionResolver>,
    table_builder: Arc<dyn TableBuilder>,
    default_spacing_after: Pt,
    current_page: usize,
    deferred: Vec<DeferredDraw>,
}

impl RenderingContext {
    pub fn new(data: DataContext) -> Self {
        Self {
            data,
            resolver: Arc::new(TemplateResolver),
            table_builder: Arc::new(GridBuilder),
            default_spacing_after: Pt::ZERO,
            current_page: 1,
            deferred: Vec::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ExpressionResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_table_builder(mut self, builder: Arc<dyn TableBuilder>) -> Self {
        self.table_builder = builder;
        self
    }

    pub fn with_default_spacing_after(mut self, spacing: Pt) -> Self {
        self.default_spacing_after = spacing;
        self
    }

    /// Render-wide data, consulted after the data handed to each block.
    pub fn data(&self) -> &DataContext {
        &self.data
    }

    pub fn resolver(&self) -> Arc<dyn ExpressionResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn table_builder(&self) -> Arc<dyn TableBuilder> {
        Arc::clone(&self.table_builder)
    }

    pub fn default_spacing_after(&self) -> Pt {
        self.default_spacing_after
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, page_number: usize) {
        self.current_page = page_number;
    }

    pub fn evaluate(
        &self,
        data: &DataContext,
        template: &str,
        fallback: Option<&str>,
    ) -> Result<String, BlockPrintError> {
        self.resolver.evaluate(self, data, template, fallback)
    }

    pub fn evaluate_number(&self, data: &DataContext, template: &str) -> Result<f64, BlockPrintError> {
        let resolved = self.evaluate(data, template, None)?;
        parse_number(template, &resolved)
    }

    pub fn register_deferred_draw(&mut self, draw: DeferredDraw) {
        self.deferred.push(draw);
    }

    pub fn pending_draws(&self) -> usize {
        self.deferred.len()
    }

    /// Drains the queue in registration order.
    pub fn take_deferred_draws(&mut self) -> Vec<DeferredDraw> {
        std::mem::take(&mut self.deferred)
    }
}
