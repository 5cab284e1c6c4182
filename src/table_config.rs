use crate::error::BlockPrintError;
use crate::types::{Color, Pt};

/// Resolved styling for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    pub border_width: Pt,
    pub border_color: Color,
    pub padding: Pt,
    pub background: Option<Color>,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            border_width: Pt::ZERO,
            border_color: Color::BLACK,
            padding: Pt::ZERO,
            background: None,
        }
    }
}

/// One styling rule. Unset selectors match every row or column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellConfig {
    pub row: Option<usize>,
    pub col: Option<usize>,
    pub border_width: Option<Pt>,
    pub border_color: Option<Color>,
    pub padding: Option<Pt>,
    pub background_color: Option<Color>,
}

impl CellConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn for_col(mut self, col: usize) -> Self {
        self.col = Some(col);
        self
    }

    pub fn with_border(mut self, width: f32, color: Color) -> Self {
        self.border_width = Some(Pt::from_f32(width));
        self.border_color = Some(color);
        self
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = Some(Pt::from_f32(padding));
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    fn matches(&self, row: usize, col: usize) -> bool {
        self.row.is_none_or(|r| r == row) && self.col.is_none_or(|c| c == col)
    }

    fn apply(&self, style: &mut CellStyle) {
        if let Some(width) = self.border_width {
            style.border_width = width;
        }
        if let Some(color) = self.border_color {
            style.border_color = color;
        }
        if let Some(padding) = self.padding {
            style.padding = padding;
        }
        if let Some(color) = self.background_color {
            style.background = Some(color);
        }
    }

    fn validate(&self) -> Result<(), BlockPrintError> {
        if let Some(width) = self.border_width {
            if width < Pt::ZERO {
                return Err(BlockPrintError::invalid_value(
                    "borderWidth",
                    format!("{} (must not be negative)", width.to_f32()),
                ));
            }
        }
        if let Some(padding) = self.padding {
            if padding < Pt::ZERO {
                return Err(BlockPrintError::invalid_value(
                    "padding",
                    format!("{} (must not be negative)", padding.to_f32()),
                ));
            }
        }
        Ok(())
    }
}

/// Styling for the cells of a columns/table grid. Later rules win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableConfig {
    cells: Vec<CellConfig>,
}

impl TableConfig {
    pub fn new(cells: Vec<CellConfig>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CellConfig] {
        &self.cells
    }

    pub fn validate(&self) -> Result<(), BlockPrintError> {
        self.cells.iter().try_for_each(CellConfig::validate)
    }

    pub fn style_for(&self, row: usize, col: usize) -> CellStyle {
        let mut style = CellStyle::default();
        for rule in self.cells.iter().filter(|rule| rule.matches(row, col)) {
            rule.apply(&mut style);
        }
        style
    }
}
