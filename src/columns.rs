use crate::block::{Block, MapBlock, condition_holds, effective_spacing_after};
use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::flowable::FlowTarget;
use crate::grid::NESTED_ABSOLUTE_REASON;
use crate::rendering_context::{DeferredDraw, RenderingContext};
use crate::table_config::TableConfig;
use crate::types::Pt;

/// Lays its items out in a grid, either in the flow or as an absolute overlay.
///
/// Absolute mode needs `absoluteX`, `absoluteY` and `width` together; they are
/// expressions resolved at render time. The grid's top-left corner lands on
/// `(absoluteX, absoluteY)` in page space.
pub struct ColumnsBlock {
    items: Vec<Box<dyn Block>>,
    widths: Option<Vec<u32>>,
    absolute_x: Option<String>,
    absolute_y: Option<String>,
    width: Option<String>,
    nb_columns: Option<usize>,
    config: Option<TableConfig>,
    condition: Option<String>,
    spacing_after: Option<Pt>,
}

impl ColumnsBlock {
    pub fn new(items: Vec<Box<dyn Block>>) -> Self {
        Self {
            items,
            widths: None,
            absolute_x: None,
            absolute_y: None,
            width: None,
            nb_columns: None,
            config: None,
            condition: None,
            spacing_after: None,
        }
    }

    pub fn with_widths(mut self, widths: Vec<u32>) -> Self {
        self.widths = Some(widths);
        self
    }

    pub fn with_nb_columns(mut self, nb_columns: usize) -> Self {
        self.nb_columns = Some(nb_columns);
        self
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = Some(config);
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

    pub fn with_absolute_x(mut self, x: impl Into<String>) -> Self {
        self.absolute_x = Some(x.into());
        self
    }

    pub fn with_absolute_y(mut self, y: impl Into<String>) -> Self {
        self.absolute_y = Some(y.into());
        self
    }

    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    pub fn with_absolute_position(
        self,
        x: impl Into<String>,
        y: impl Into<String>,
        width: impl Into<String>,
    ) -> Self {
        self.with_absolute_x(x).with_absolute_y(y).with_width(width)
    }

    pub fn items(&self) -> &[Box<dyn Block>] {
        &self.items
    }

    fn absolute_attributes(&self) -> Option<(&str, &str, &str)> {
        match (&self.absolute_x, &self.absolute_y, &self.width) {
            (Some(x), Some(y), Some(width)) => Some((x.as_str(), y.as_str(), width.as_str())),
            _ => None,
        }
    }

    fn render_absolute(
        &self,
        (x, y, width): (&str, &str, &str),
        data: &DataContext,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError> {
        let x = ctx.evaluate_number(data, x)?;
        let y = ctx.evaluate_number(data, y)?;
        let width = ctx.evaluate_number(data, width)?;

        let builder = ctx.table_builder();
        let grid = builder.build(
            &self.items,
            data,
            ctx,
            self.nb_columns,
            self.config.as_ref(),
        )?;
        ctx.register_deferred_draw(DeferredDraw::grid(
            Pt::from_f64(x),
            Pt::from_f64(y),
            Pt::from_f64(width),
            grid,
            self.widths.clone(),
        ));
        Ok(())
    }
}

impl Block for ColumnsBlock {
    fn render(
        &self,
        data: &DataContext,
        target: &mut dyn FlowTarget,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError> {
        if let Some(attributes) = self.absolute_attributes() {
            return self.render_absolute(attributes, data, ctx);
        }

        let builder = ctx.table_builder();
        let Some(mut grid) = builder.build(
            &self.items,
            data,
            ctx,
            self.nb_columns,
            self.config.as_ref(),
        )?
        else {
            return Ok(());
        };
        if let Some(widths) = &self.widths {
            grid.set_widths(widths)?;
        }
        grid.set_spacing_after(effective_spacing_after(self, ctx));
        target.add(Box::new(grid));
        Ok(())
    }

    fn validate(&self) -> Result<(), BlockPrintError> {
        if self.items.is_empty() {
            return Err(BlockPrintError::invalid_value("items", "[]"));
        }

        let defined = [&self.absolute_x, &self.absolute_y, &self.width]
            .iter()
            .filter(|attr| attr.is_some())
            .count();
        if defined != 0 && defined != 3 {
            return Err(BlockPrintError::invalid_value(
                "absoluteX, absoluteY or width",
                "all of them must be defined or none",
            ));
        }

        if let Some(columns) = self.nb_columns {
            if columns > self.items.len() {
                return Err(BlockPrintError::invalid_value(
                    "nbColumns",
                    format!("{} (more columns than the {} items)", columns, self.items.len()),
                ));
            }
        }

        for item in &self.items {
            item.validate()?;
            if item.is_absolute() {
                return Err(BlockPrintError::invalid_value(
                    "items",
                    NESTED_ABSOLUTE_REASON,
                ));
            }
        }

        if let Some(config) = &self.config {
            config.validate()?;
        }
        Ok(())
    }

    fn is_absolute(&self) -> bool {
        self.absolute_attributes().is_some()
    }

    fn find_map_block(&self, name: Option<&str>) -> Option<&MapBlock> {
        self.items.iter().find_map(|item| item.find_map_block(name))
    }

    fn is_visible(&self, ctx: &RenderingContext, data: &DataContext) -> bool {
        condition_holds(self.condition.as_deref(), ctx, data)
    }

    fn spacing_after(&self) -> Option<Pt> {
        self.spacing_after
    }
}
