use crate::canvas::Canvas;
use crate::debug::DebugLogger;
use crate::error::BlockPrintError;
use crate::flowable::Story;
use crate::frame::{AddResult, Frame};
use crate::metrics::{DocumentMetrics, PageMetrics};
use crate::rendering_context::DeferredDraw;
use crate::types::{Margins, Pt, Rect, Size};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

pub const META_PAGE_LAYOUT_KEY: &str = "page_layout";

/// Paginates the story of one page layout and finalizes its pages.
pub struct DocTemplate {
    page_size: Size,
    margins: Margins,
    debug: Option<Arc<DebugLogger>>,
}

impl DocTemplate {
    pub fn new(page_size: Size, margins: Margins) -> Self {
        Self {
            page_size,
            margins,
            debug: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<Arc<DebugLogger>>) -> Self {
        self.debug = debug;
        self
    }

    pub fn content_rect(&self) -> Rect {
        self.margins.content_rect(self.page_size)
    }

    /// Flows `story` from the top of the canvas' current page, breaking pages
    /// as needed. The last page is finalized with `deferred` painted over the
    /// flow content in queue order, then shown.
    pub fn compose(
        &self,
        canvas: &mut Canvas,
        layout_name: &str,
        story: Story,
        deferred: Vec<DeferredDraw>,
        metrics: &mut DocumentMetrics,
    ) -> Result<(), BlockPrintError> {
        let rect = self.content_rect();
        if rect.height <= Pt::ZERO || rect.width <= Pt::ZERO {
            return Err(BlockPrintError::UnplaceableFlowable(format!(
                "page layout '{}' has an empty content box ({}x{}pt)",
                layout_name,
                rect.width.to_f32(),
                rect.height.to_f32()
            )));
        }

        let mut frame = Frame::new(rect);
        let mut page_start = Instant::now();
        let mut page_flowables = 0usize;
        canvas.meta(META_PAGE_LAYOUT_KEY, layout_name);

        let mut queue: VecDeque<_> = story.into_items().into();
        while let Some(flowable) = queue.pop_front() {
            let name = flowable.debug_name();
            match frame.add(flowable, canvas) {
                AddResult::Placed => page_flowables += 1,
                AddResult::Overflow(remaining) => {
                    if let Some(logger) = self.debug.as_deref() {
                        logger.log_event(
                            "page.break",
                            json!({
                                "from_page": canvas.page_number(),
                                "layout": layout_name,
                                "flowable": name,
                            }),
                        );
                        logger.increment("page.break", 1);
                    }
                    self.finish_page(
                        canvas,
                        layout_name,
                        page_flowables,
                        Vec::new(),
                        metrics,
                        page_start,
                    )?;
                    frame = Frame::new(rect);
                    page_flowables = 0;
                    page_start = Instant::now();
                    canvas.meta(META_PAGE_LAYOUT_KEY, layout_name);
                    queue.push_front(remaining);
                }
            }
        }

        self.finish_page(
            canvas,
            layout_name,
            page_flowables,
            deferred,
            metrics,
            page_start,
        )
    }

    fn finish_page(
        &self,
        canvas: &mut Canvas,
        layout_name: &str,
        page_flowables: usize,
        deferred: Vec<DeferredDraw>,
        metrics: &mut DocumentMetrics,
        page_start: Instant,
    ) -> Result<(), BlockPrintError> {
        let page_number = canvas.page_number();
        let mut deferred_count = 0usize;
        for draw in deferred {
            let (x, y) = draw.position();
            let painted = draw.draw(canvas)?;
            if painted {
                deferred_count += 1;
            }
            if let Some(logger) = self.debug.as_deref() {
                logger.log_event(
                    "page.deferred_draw",
                    json!({
                        "page": page_number,
                        "x": x.to_f32(),
                        "y": y.to_f32(),
                        "painted": painted,
                    }),
                );
                logger.increment("page.deferred_draw", 1);
            }
        }

        let elapsed = page_start.elapsed().as_secs_f64() * 1000.0;
        metrics.total_render_ms += elapsed;
        metrics.pages.push(PageMetrics {
            page_number,
            layout_name: layout_name.to_string(),
            render_ms: elapsed,
            command_count: canvas.current_command_count(),
            flowable_count: page_flowables,
            deferred_count,
        });
        if let Some(logger) = self.debug.as_deref() {
            logger.log_event(
                "page.finish",
                json!({
                    "page": page_number,
                    "layout": layout_name,
                    "flowables": page_flowables,
                    "deferred": deferred_count,
                    "commands": canvas.current_command_count(),
                }),
            );
            logger.increment("page.finish", 1);
        }
        canvas.show_page();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::flowable::{FlowTarget, Paragraph};
    use crate::grid::{Grid, GridCell};
    use crate::table_config::CellStyle;

    fn template() -> DocTemplate {
        // 100pt of usable height.
        DocTemplate::new(
            Size {
                width: Pt::from_i32(200),
                height: Pt::from_i32(140),
            },
            Margins::all(20.0),
        )
    }

    fn story(lines: usize) -> Story {
        let mut story = Story::new();
        for index in 0..lines {
            story.add(Box::new(Paragraph::new(&format!("line {index}"), Pt::from_i32(10))));
        }
        story
    }

    fn overlay(text: &str) -> DeferredDraw {
        let mut cell = GridCell::new(CellStyle::default());
        cell.add(Box::new(Paragraph::new(text, Pt::from_i32(10))));
        let mut grid = Grid::new(1);
        grid.add_cell(cell);
        DeferredDraw::grid(Pt::from_i32(5), Pt::from_i32(135), Pt::from_i32(50), Some(grid), None)
    }

    #[test]
    fn story_breaks_across_pages() {
        let mut canvas = Canvas::new(template().page_size);
        let mut metrics = DocumentMetrics::default();
        template()
            .compose(&mut canvas, "main", story(10), Vec::new(), &mut metrics)
            .expect("compose");
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].texts().len(), 8);
        assert_eq!(doc.pages[1].texts(), vec!["line 8", "line 9"]);
        assert_eq!(doc.pages[1].meta_values(META_PAGE_LAYOUT_KEY), vec!["main"]);
        let flowables: Vec<usize> = metrics.pages.iter().map(|p| p.flowable_count).collect();
        assert_eq!(flowables, vec![8, 2]);
    }

    #[test]
    fn deferred_draws_paint_last_over_the_final_page() {
        let mut canvas = Canvas::new(template().page_size);
        let mut metrics = DocumentMetrics::default();
        template()
            .compose(
                &mut canvas,
                "main",
                story(10),
                vec![overlay("first"), overlay("second")],
                &mut metrics,
            )
            .expect("compose");
        let doc = canvas.finish();
        assert!(doc.pages[0].texts().iter().all(|t| t.starts_with("line")));
        assert_eq!(
            doc.pages[1].texts(),
            vec!["line 8", "line 9", "first", "second"]
        );
        assert_eq!(metrics.pages[1].deferred_count, 2);
        assert_eq!(metrics.pages[0].deferred_count, 0);
    }

    #[test]
    fn empty_story_still_finalizes_a_page() {
        let mut canvas = Canvas::new(template().page_size);
        let mut metrics = DocumentMetrics::default();
        template()
            .compose(&mut canvas, "overlay-only", Story::new(), vec![overlay("x")], &mut metrics)
            .expect("compose");
        let doc = canvas.finish();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].texts(), vec!["x"]);
        assert!(doc.pages[0].commands.iter().any(|cmd| matches!(cmd, Command::Meta { key, .. } if key == META_PAGE_LAYOUT_KEY)));
    }

    #[test]
    fn zero_content_box_is_unplaceable() {
        let template = DocTemplate::new(Size::a4(), Margins::all(500.0));
        let mut canvas = Canvas::new(Size::a4());
        let err = template
            .compose(&mut canvas, "main", story(1), Vec::new(), &mut DocumentMetrics::default())
            .err()
            .expect("empty content box");
        assert!(matches!(err, BlockPrintError::UnplaceableFlowable(_)));
    }
}
