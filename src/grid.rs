use crate::block::Block;
use crate::canvas::Canvas;
use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::flowable::{FlowTarget, Flowable};
use crate::rendering_context::RenderingContext;
use crate::table_config::{CellStyle, TableConfig};
use crate::types::{Pt, Size};
use std::any::Any;

pub(crate) const NESTED_ABSOLUTE_REASON: &str =
    "cannot put an absolute block in a columns or table block";

/// Builds the grid a columns/table block lays its children into.
pub trait TableBuilder: Send + Sync {
    /// Renders every visible item into one cell, row-major across the columns.
    /// `None` means there is nothing to render.
    fn build(
        &self,
        items: &[Box<dyn Block>],
        data: &DataContext,
        ctx: &mut RenderingContext,
        nb_columns: Option<usize>,
        config: Option<&TableConfig>,
    ) -> Result<Option<Grid>, BlockPrintError>;
}

/// Default builder. Without an explicit column count every visible item gets
/// its own column.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder;

impl TableBuilder for GridBuilder {
    fn build(
        &self,
        items: &[Box<dyn Block>],
        data: &DataContext,
        ctx: &mut RenderingContext,
        nb_columns: Option<usize>,
        config: Option<&TableConfig>,
    ) -> Result<Option<Grid>, BlockPrintError> {
        let visible: Vec<&dyn Block> = items
            .iter()
            .map(|item| item.as_ref())
            .filter(|item| item.is_visible(&*ctx, data))
            .collect();
        let columns = nb_columns.unwrap_or(visible.len());
        if columns == 0 || visible.is_empty() {
            return Ok(None);
        }
        if columns > items.len() {
            return Err(BlockPrintError::invalid_value(
                "nbColumns",
                format!("{} (more columns than the {} items)", columns, items.len()),
            ));
        }

        let style_for = |index: usize| {
            config
                .map(|config| config.style_for(index / columns, index % columns))
                .unwrap_or_default()
        };

        let mut grid = Grid::new(columns);
        for (index, item) in visible.into_iter().enumerate() {
            if item.is_absolute() {
                return Err(BlockPrintError::invalid_value(
                    "items",
                    NESTED_ABSOLUTE_REASON,
                ));
            }
            let mut cell = GridCell::new(style_for(index));
            item.render(data, &mut cell, ctx)?;
            grid.add_cell(cell);
        }
        while grid.cell_count() % columns != 0 {
            let cell = GridCell::new(style_for(grid.cell_count()));
            grid.add_cell(cell);
        }
        Ok(Some(grid))
    }
}

pub struct GridCell {
    content: Vec<Box<dyn Flowable>>,
    style: CellStyle,
}

impl GridCell {
    pub fn new(style: CellStyle) -> Self {
        Self {
            content: Vec::new(),
            style,
        }
    }

    pub fn style(&self) -> &CellStyle {
        &self.style
    }

    pub fn content(&self) -> &[Box<dyn Flowable>] {
        &self.content
    }

    fn height(&self, width: Pt) -> Pt {
        let inner_width = (width - self.style.padding * 2).max(Pt::ZERO);
        let last = self.content.len().saturating_sub(1);
        let content: Pt = self
            .content
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let height = item.wrap(inner_width).height;
                if index < last {
                    height + item.spacing_after()
                } else {
                    height
                }
            })
            .sum();
        content + self.style.padding * 2
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y_top: Pt, width: Pt, height: Pt) {
        let style = self.style;
        if let Some(color) = style.background {
            canvas.set_fill_color(color);
            canvas.draw_rect(x, y_top - height, width, height);
            canvas.fill();
        }

        let inner_x = x + style.padding;
        let inner_width = (width - style.padding * 2).max(Pt::ZERO);
        let mut cursor = y_top - style.padding;
        for item in &self.content {
            item.draw(canvas, inner_x, cursor, inner_width);
            cursor -= item.wrap(inner_width).height + item.spacing_after();
        }

        if style.border_width > Pt::ZERO {
            canvas.set_stroke_color(style.border_color);
            canvas.set_line_width(style.border_width);
            canvas.draw_rect(x, y_top - height, width, height);
            canvas.stroke();
        }
    }
}

impl FlowTarget for GridCell {
    fn add(&mut self, flowable: Box<dyn Flowable>) {
        self.content.push(flowable);
    }
}

/// Row/column container produced from the children of a columns block.
pub struct Grid {
    columns: usize,
    rows: Vec<Vec<GridCell>>,
    relative_widths: Vec<u32>,
    total_width: Option<Pt>,
    locked_width: bool,
    width_percentage: u32,
    spacing_after: Pt,
}

impl Grid {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            relative_widths: vec![1; columns],
            total_width: None,
            locked_width: false,
            width_percentage: 100,
            spacing_after: Pt::ZERO,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.rows.get(row)?.get(col)
    }

    pub fn add_cell(&mut self, cell: GridCell) {
        match self.rows.last_mut() {
            Some(row) if row.len() < self.columns => row.push(cell),
            _ => self.rows.push(vec![cell]),
        }
    }

    /// Sets column weights. The count must match the column count.
    pub fn set_widths(&mut self, widths: &[u32]) -> Result<(), BlockPrintError> {
        if widths.len() != self.columns {
            return Err(BlockPrintError::invalid_value(
                "widths",
                format!(
                    "{} widths given for {} columns",
                    widths.len(),
                    self.columns
                ),
            ));
        }
        if widths.iter().all(|w| *w == 0) {
            return Err(BlockPrintError::invalid_value(
                "widths",
                "at least one width must be positive",
            ));
        }
        self.relative_widths = widths.to_vec();
        Ok(())
    }

    pub fn relative_widths(&self) -> &[u32] {
        &self.relative_widths
    }

    pub fn set_total_width(&mut self, width: Pt) {
        self.total_width = Some(width);
    }

    pub fn total_width(&self) -> Option<Pt> {
        self.total_width
    }

    pub fn lock_width(&mut self) {
        self.locked_width = true;
    }

    pub fn is_width_locked(&self) -> bool {
        self.locked_width
    }

    /// Share of the available width used when the width is not locked.
    pub fn set_width_percentage(&mut self, percentage: u32) -> Result<(), BlockPrintError> {
        if !(1..=100).contains(&percentage) {
            return Err(BlockPrintError::invalid_value(
                "widthPercentage",
                format!("{} (must be between 1 and 100)", percentage),
            ));
        }
        self.width_percentage = percentage;
        Ok(())
    }

    pub fn set_spacing_after(&mut self, spacing: Pt) {
        self.spacing_after = spacing;
    }

    fn table_width(&self, avail_width: Pt) -> Pt {
        match self.total_width {
            Some(width) if self.locked_width => width,
            _ => avail_width.mul_ratio(self.width_percentage as i64, 100),
        }
    }

    /// Splits `table_width` by the relative widths; the last column absorbs rounding.
    pub fn column_widths(&self, table_width: Pt) -> Vec<Pt> {
        let total: i64 = self.relative_widths.iter().map(|w| *w as i64).sum();
        let mut widths = Vec::with_capacity(self.columns);
        let mut used = Pt::ZERO;
        for (index, weight) in self.relative_widths.iter().enumerate() {
            let width = if index + 1 == self.columns {
                table_width - used
            } else {
                table_width.mul_ratio(*weight as i64, total)
            };
            used += width;
            widths.push(width);
        }
        widths
    }

    fn row_heights(&self, col_widths: &[Pt]) -> Vec<Pt> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(col_widths)
                    .map(|(cell, width)| cell.height(*width))
                    .fold(Pt::ZERO, Pt::max)
            })
            .collect()
    }

    pub fn height(&self, avail_width: Pt) -> Pt {
        let widths = self.column_widths(self.table_width(avail_width));
        self.row_heights(&widths).iter().sum()
    }

    /// Paints rows `start..end` (`None` = through the last row) with the
    /// top-left corner at `(x, y_top)`. Needs a total width. Returns the painted
    /// height.
    pub fn write_selected_rows(
        &self,
        canvas: &mut Canvas,
        start: usize,
        end: Option<usize>,
        x: Pt,
        y_top: Pt,
    ) -> Pt {
        let width = self.total_width.unwrap_or(Pt::ZERO);
        let end = end.unwrap_or(self.rows.len()).min(self.rows.len());
        self.paint_rows(canvas, start..end, x, y_top, width)
    }

    fn paint_rows(
        &self,
        canvas: &mut Canvas,
        rows: std::ops::Range<usize>,
        x: Pt,
        y_top: Pt,
        table_width: Pt,
    ) -> Pt {
        let col_widths = self.column_widths(table_width);
        let heights = self.row_heights(&col_widths);
        let mut cursor = y_top;
        for index in rows {
            let (Some(row), Some(height)) = (self.rows.get(index), heights.get(index)) else {
                break;
            };
            let mut cell_x = x;
            for (cell, width) in row.iter().zip(&col_widths) {
                cell.draw(canvas, cell_x, cursor, *width, *height);
                cell_x += *width;
            }
            cursor -= *height;
        }
        y_top - cursor
    }
}

impl Flowable for Grid {
    fn wrap(&self, avail_width: Pt) -> Size {
        Size {
            width: self.table_width(avail_width),
            height: self.height(avail_width),
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y_top: Pt, avail_width: Pt) {
        let width = self.table_width(avail_width);
        self.paint_rows(canvas, 0..self.rows.len(), x, y_top, width);
    }

    fn spacing_after(&self) -> Pt {
        self.spacing_after
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{MapBlock, TextBlock};
    use crate::canvas::Command;
    use crate::flowable::Paragraph;
    use crate::table_config::CellConfig;
    use crate::types::Color;
    use serde_json::json;

    fn text_cell(text: &str) -> GridCell {
        let mut cell = GridCell::new(CellStyle::default());
        cell.add(Box::new(Paragraph::new(text, Pt::from_i32(10))));
        cell
    }

    fn texts(items: &[&str]) -> Vec<Box<dyn Block>> {
        items
            .iter()
            .map(|text| Box::new(TextBlock::new(*text)) as Box<dyn Block>)
            .collect()
    }

    fn ctx() -> RenderingContext {
        RenderingContext::new(DataContext::new(json!({"show": false})))
    }

    #[test]
    fn cells_fill_rows_left_to_right() {
        let mut grid = Grid::new(2);
        for text in ["a", "b", "c"] {
            grid.add_cell(text_cell(text));
        }
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell_count(), 3);
        assert!(grid.cell(1, 0).is_some());
        assert!(grid.cell(1, 1).is_none());
    }

    #[test]
    fn widths_must_match_column_count() {
        let mut grid = Grid::new(2);
        let err = grid.set_widths(&[1, 2, 3]).expect_err("mismatch");
        assert_eq!(err.field(), Some("widths"));
        assert!(grid.set_widths(&[0, 0]).is_err());
        assert_eq!(grid.relative_widths(), &[1, 1]);

        grid.set_widths(&[1, 2]).expect("matching widths");
        assert_eq!(grid.relative_widths(), &[1, 2]);
    }

    #[test]
    fn column_widths_follow_weights() {
        let mut grid = Grid::new(2);
        grid.set_widths(&[1, 2]).expect("widths");
        assert_eq!(
            grid.column_widths(Pt::from_i32(300)),
            vec![Pt::from_i32(100), Pt::from_i32(200)]
        );

        let even = Grid::new(3).column_widths(Pt::from_i32(100));
        assert_eq!(even.iter().sum::<Pt>(), Pt::from_i32(100));
        assert_eq!(even[2].to_milli_i64(), 33_334);
    }

    #[test]
    fn locked_width_ignores_available_width() {
        let mut grid = Grid::new(1);
        grid.add_cell(text_cell("x"));
        grid.set_total_width(Pt::from_i32(120));
        assert_eq!(grid.wrap(Pt::from_i32(500)).width, Pt::from_i32(500));
        grid.lock_width();
        assert_eq!(grid.wrap(Pt::from_i32(500)).width, Pt::from_i32(120));
    }

    #[test]
    fn unlocked_width_is_a_share_of_the_available_width() {
        let mut grid = Grid::new(1);
        grid.add_cell(text_cell("x"));
        assert!(grid.set_width_percentage(0).is_err());
        assert!(grid.set_width_percentage(101).is_err());
        grid.set_width_percentage(50).expect("percentage");
        assert_eq!(grid.wrap(Pt::from_i32(300)).width, Pt::from_i32(150));

        grid.set_total_width(Pt::from_i32(120));
        grid.lock_width();
        assert_eq!(grid.wrap(Pt::from_i32(300)).width, Pt::from_i32(120));
    }

    #[test]
    fn row_height_is_tallest_cell_plus_padding() {
        let style = CellStyle {
            padding: Pt::from_i32(3),
            ..CellStyle::default()
        };
        let mut grid = Grid::new(2);
        let mut tall = GridCell::new(style);
        tall.add(Box::new(Paragraph::new("one\ntwo", Pt::from_i32(10))));
        grid.add_cell(tall);
        grid.add_cell(text_cell("short"));
        assert_eq!(grid.height(Pt::from_i32(200)), Pt::from_i32(30));
    }

    #[test]
    fn write_selected_rows_paints_a_row_range() {
        let config = TableConfig::new(vec![CellConfig::new().with_border(1.0, Color::BLACK)]);
        let mut grid = Grid::new(1);
        for text in ["first", "second", "third"] {
            let mut cell = GridCell::new(config.style_for(0, 0));
            cell.add(Box::new(Paragraph::new(text, Pt::from_i32(10))));
            grid.add_cell(cell);
        }
        grid.set_total_width(Pt::from_i32(80));

        let mut canvas = Canvas::new(Size::a4());
        let painted = grid.write_selected_rows(
            &mut canvas,
            1,
            None,
            Pt::from_i32(10),
            Pt::from_i32(400),
        );
        assert_eq!(painted, Pt::from_i32(24));
        let page = canvas.current_page();
        assert_eq!(page.texts(), vec!["second", "third"]);
        assert!(page.commands.contains(&Command::DrawRect {
            x: Pt::from_i32(10),
            y: Pt::from_i32(388),
            width: Pt::from_i32(80),
            height: Pt::from_i32(12),
        }));
    }

    #[test]
    fn builder_pads_the_last_row() {
        let mut ctx = ctx();
        let grid = GridBuilder
            .build(&texts(&["a", "b", "c"]), &DataContext::default(), &mut ctx, Some(2), None)
            .expect("build")
            .expect("grid");
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell_count(), 4);
        assert!(grid.cell(1, 1).is_some_and(|cell| cell.content().is_empty()));
    }

    #[test]
    fn builder_defaults_to_one_column_per_visible_item() {
        let mut ctx = ctx();
        let mut items = texts(&["a", "b"]);
        items.push(Box::new(TextBlock::new("hidden").with_condition("show")));
        let grid = GridBuilder
            .build(&items, &DataContext::default(), &mut ctx, None, None)
            .expect("build")
            .expect("grid");
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.row_count(), 1);
    }

    #[test]
    fn builder_yields_nothing_without_columns_or_cells() {
        let mut ctx = ctx();
        let data = DataContext::default();
        let none = GridBuilder
            .build(&texts(&["a"]), &data, &mut ctx, Some(0), None)
            .expect("build");
        assert!(none.is_none());

        let hidden: Vec<Box<dyn Block>> =
            vec![Box::new(TextBlock::new("x").with_condition("show"))];
        let none = GridBuilder.build(&hidden, &data, &mut ctx, Some(2), None).expect("build");
        assert!(none.is_none());
    }

    #[test]
    fn builder_rejects_more_columns_than_items() {
        let mut ctx = ctx();
        let err = GridBuilder
            .build(&texts(&["a"]), &DataContext::default(), &mut ctx, Some(usize::MAX), None)
            .err()
            .expect("oversized column count");
        assert_eq!(err.field(), Some("nbColumns"));
    }

    #[test]
    fn builder_applies_cell_config() {
        let mut ctx = ctx();
        let config = TableConfig::new(vec![CellConfig::new().for_col(1).with_padding(4.0)]);
        let grid = GridBuilder
            .build(&texts(&["a", "b"]), &DataContext::default(), &mut ctx, Some(2), Some(&config))
            .expect("build")
            .expect("grid");
        let padding = |col| grid.cell(0, col).map(|cell| cell.style().padding);
        assert_eq!(padding(0), Some(Pt::ZERO));
        assert_eq!(padding(1), Some(Pt::from_i32(4)));
    }

    #[test]
    fn builder_rejects_absolute_items() {
        let mut ctx = ctx();
        let items: Vec<Box<dyn Block>> = vec![Box::new(
            MapBlock::new(100.0, 100.0).with_absolute_position("0", "0"),
        )];
        let err = GridBuilder
            .build(&items, &DataContext::default(), &mut ctx, Some(1), None)
            .err()
            .expect("absolute item");
        assert_eq!(err.field(), Some("items"));
        assert_eq!(ctx.pending_draws(), 0);
    }
}
