use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::flowable::{FlowTarget, MapFrame, Paragraph, TextAlign};
use crate::rendering_context::{DeferredDraw, RenderingContext};
use crate::types::Pt;

/// A node of the layout tree.
///
/// Flow-mode blocks append to `target`; absolute-mode blocks register a
/// [`DeferredDraw`] on the context and leave `target` untouched. `validate`
/// must succeed before the first `render`.
pub trait Block: Send + Sync {
    fn render(
        &self,
        data: &DataContext,
        target: &mut dyn FlowTarget,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError>;

    fn validate(&self) -> Result<(), BlockPrintError>;

    fn is_absolute(&self) -> bool {
        false
    }

    /// First map block in declaration order. `None` matches any map block.
    fn find_map_block(&self, _name: Option<&str>) -> Option<&MapBlock> {
        None
    }

    fn is_visible(&self, _ctx: &RenderingContext, _data: &DataContext) -> bool {
        true
    }

    /// Own trailing spacing; `None` falls back to the context default.
    fn spacing_after(&self) -> Option<Pt> {
        None
    }
}

pub(crate) fn effective_spacing_after(block: &dyn Block, ctx: &RenderingContext) -> Pt {
    block
        .spacing_after()
        .unwrap_or_else(|| ctx.default_spacing_after())
}

// Block data wins over render data when it has the key at all.
pub(crate) fn condition_holds(condition: Option<&str>, ctx: &RenderingContext, data: &DataContext) -> bool {
    let Some(key) = condition else {
        return true;
    };
    if data.lookup(key).is_some() {
        data.is_truthy(key)
    } else {
        ctx.data().is_truthy(key)
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    text: String,
    font_size: Pt,
    align: TextAlign,
    condition: Option<String>,
    spacing_after: Option<Pt>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_size: Pt::from_i32(10),
            align: TextAlign::Left,
            condition: None,
            spacing_after: None,
        }
    }

    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Pt::from_f32(size);
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_condition(mut self, key: impl Into<String>) -> Self {
        self.condition = Some(key.into());
        self
    }

    pub fn with_spacing_after(mut self, spacing: f32) -> Self {
        self.spacing_after = Some(Pt::from_f32(spacing));
        self
    }
}

impl Block for TextBlock {
    fn render(
        &self,
        data: &DataContext,
        target: &mut dyn FlowTarget,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError> {
        let text = ctx.evaluate(data, &self.text, None)?;
        let paragraph = Paragraph::new(&text, self.font_size)
            .with_align(self.align)
            .with_spacing_after(effective_spacing_after(self, ctx));
        target.add(Box::new(paragraph));
        Ok(())
    }

    fn validate(&self) -> Result<(), BlockPrintError> {
        if self.font_size <= Pt::ZERO {
            return Err(BlockPrintError::invalid_value(
                "fontSize",
                format!("{} (must be positive)", self.font_size.to_f32()),
            ));
        }
        Ok(())
    }

    fn is_visible(&self, ctx: &RenderingContext, data: &DataContext) -> bool {
        condition_holds(self.condition.as_deref(), ctx, data)
    }

    fn spacing_after(&self) -> Option<Pt> {
        self.spacing_after
    }
}

/// Reserves the frame a named map is drawn into.
#[derive(Debug, Clone)]
pub struct MapBlock {
    name: Option<String>,
    width: Pt,
    height: Pt,
    absolute_x: Option<String>,
    absolute_y: Option<String>,
    condition: Option<String>,
    spacing_after: Option<Pt>,
}

impl MapBlock {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            name: None,
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
            absolute_x: None,
            absolute_y: None,
            condition: None,
            spacing_after: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_absolute_position(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.absolute_x = Some(x.into());
        self.absolute_y = Some(y.into());
        self
    }

    pub fn with_absolute_x(mut self, x: impl Into<String>) -> Self {
        self.absolute_x = Some(x.into());
        self
    }

    pub fn with_condition(mut self, key: impl Into<String>) -> Self {
        self.condition = Some(key.into());
        self
    }

    pub fn with_spacing_after(mut self, spacing: f32) -> Self {
        self.spacing_after = Some(Pt::from_f32(spacing));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn frame(&self) -> MapFrame {
        MapFrame::new(self.name.clone(), self.width, self.height)
    }
}

impl Block for MapBlock {
    fn render(
        &self,
        data: &DataContext,
        target: &mut dyn FlowTarget,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError> {
        match (&self.absolute_x, &self.absolute_y) {
            (Some(x), Some(y)) => {
                let x = ctx.evaluate_number(data, x)?;
                let y = ctx.evaluate_number(data, y)?;
                ctx.register_deferred_draw(DeferredDraw::map(
                    Pt::from_f64(x),
                    Pt::from_f64(y),
                    self.frame(),
                ));
            }
            _ => {
                let spacing = effective_spacing_after(self, ctx);
                target.add(Box::new(self.frame().with_spacing_after(spacing)));
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), BlockPrintError> {
        if self.width <= Pt::ZERO {
            return Err(BlockPrintError::invalid_value(
                "width",
                format!("{} (must be positive)", self.width.to_f32()),
            ));
        }
        if self.height <= Pt::ZERO {
            return Err(BlockPrintError::invalid_value(
                "height",
                format!("{} (must be positive)", self.height.to_f32()),
            ));
        }
        if self.absolute_x.is_some() != self.absolute_y.is_some() {
            return Err(BlockPrintError::invalid_value(
                "absoluteX or absoluteY",
                "both must be defined or none",
            ));
        }
        Ok(())
    }

    fn is_absolute(&self) -> bool {
        self.absolute_x.is_some() && self.absolute_y.is_some()
    }

    fn find_map_block(&self, name: Option<&str>) -> Option<&MapBlock> {
        match name {
            None => Some(self),
            Some(name) => (self.name.as_deref() == Some(name)).then_some(self),
        }
    }

    fn is_visible(&self, ctx: &RenderingContext, data: &DataContext) -> bool {
        condition_holds(self.condition.as_deref(), ctx, data)
    }

    fn spacing_after(&self) -> Option<Pt> {
        self.spacing_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{Flowable, Story};
    use serde_json::json;

    fn ctx() -> RenderingContext {
        RenderingContext::new(DataContext::new(json!({"mapTitle": "Overview", "enabled": 1})))
            .with_default_spacing_after(Pt::from_i32(6))
    }

    #[test]
    fn text_resolves_parameters_into_a_paragraph() {
        let mut ctx = ctx();
        let mut story = Story::new();
        TextBlock::new("${mapTitle}: ${zone}")
            .render(&DataContext::new(json!({"zone": "North"})), &mut story, &mut ctx)
            .expect("render");
        assert_eq!(story.len(), 1);
        let paragraph = story
            .iter()
            .next()
            .and_then(|item| item.as_any().downcast_ref::<Paragraph>())
            .expect("paragraph");
        assert_eq!(paragraph.lines(), &["Overview: North".to_string()]);
        assert_eq!(paragraph.spacing_after(), Pt::from_i32(6));
    }

    #[test]
    fn text_errors_propagate() {
        let mut ctx = ctx();
        let mut story = Story::new();
        let err = TextBlock::new("${unknown}")
            .render(&DataContext::default(), &mut story, &mut ctx)
            .expect_err("missing parameter");
        assert!(matches!(err, BlockPrintError::Expression { .. }));
        assert!(story.is_empty());
    }

    #[test]
    fn text_font_size_must_be_positive() {
        let err = TextBlock::new("x").with_font_size(0.0).validate().expect_err("zero");
        assert_eq!(err.field(), Some("fontSize"));
        assert!(TextBlock::new("x").validate().is_ok());
    }

    #[test]
    fn condition_reads_block_data_before_render_data() {
        let ctx = ctx();
        let block = TextBlock::new("x").with_condition("enabled");
        assert!(block.is_visible(&ctx, &DataContext::default()));
        assert!(!block.is_visible(&ctx, &DataContext::new(json!({"enabled": false}))));
        assert!(!TextBlock::new("x").with_condition("absent").is_visible(&ctx, &DataContext::default()));
    }

    #[test]
    fn map_dimensions_and_position_are_validated() {
        let err = MapBlock::new(0.0, 10.0).validate().expect_err("width");
        assert_eq!(err.field(), Some("width"));
        let err = MapBlock::new(10.0, -1.0).validate().expect_err("height");
        assert_eq!(err.field(), Some("height"));
        let err = MapBlock::new(10.0, 10.0)
            .with_absolute_x("5")
            .validate()
            .expect_err("half position");
        assert_eq!(err.field(), Some("absoluteX or absoluteY"));
        assert!(!MapBlock::new(10.0, 10.0).with_absolute_x("5").is_absolute());
    }

    #[test]
    fn flow_map_appends_a_frame() {
        let mut ctx = ctx();
        let mut story = Story::new();
        MapBlock::new(300.0, 200.0)
            .with_name("main")
            .with_spacing_after(2.0)
            .render(&DataContext::default(), &mut story, &mut ctx)
            .expect("render");
        let frame = story
            .iter()
            .next()
            .and_then(|item| item.as_any().downcast_ref::<MapFrame>())
            .expect("frame");
        assert_eq!(frame.name(), Some("main"));
        assert_eq!(frame.spacing_after(), Pt::from_i32(2));
        assert_eq!(ctx.pending_draws(), 0);
    }

    #[test]
    fn absolute_map_is_deferred() {
        let mut ctx = ctx();
        let mut story = Story::new();
        MapBlock::new(300.0, 200.0)
            .with_absolute_position("${x}", "700")
            .render(&DataContext::new(json!({"x": 25})), &mut story, &mut ctx)
            .expect("render");
        assert!(story.is_empty());
        let draws = ctx.take_deferred_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].position(), (Pt::from_i32(25), Pt::from_i32(700)));
    }

    #[test]
    fn absolute_map_position_must_be_numeric() {
        let mut ctx = ctx();
        let err = MapBlock::new(300.0, 200.0)
            .with_absolute_position("${mapTitle}", "700")
            .render(&DataContext::default(), &mut Story::new(), &mut ctx)
            .expect_err("not numeric");
        assert!(err.to_string().contains("is not a number"));
        assert_eq!(ctx.pending_draws(), 0);
    }

    #[test]
    fn map_lookup_by_name() {
        let map = MapBlock::new(1.0, 1.0).with_name("main");
        assert!(map.find_map_block(None).is_some());
        assert!(map.find_map_block(Some("main")).is_some());
        assert!(map.find_map_block(Some("inset")).is_none());
        assert!(MapBlock::new(1.0, 1.0).find_map_block(Some("main")).is_none());
    }
}
