use crate::canvas::Canvas;
use crate::types::{Color, Pt, Rect, Size};
use std::any::Any;

pub(crate) const META_MAP_KEY: &str = "map";

/// Average glyph advance as a fraction of the font size. Text is never shaped;
/// this only feeds horizontal alignment.
const AVERAGE_ADVANCE: f32 = 0.5;
const LEADING: f32 = 1.2;

/// Laid-out content produced by rendering a block.
///
/// `y_top` passed to `draw` is the top edge of the slot the flowable occupies,
/// in page space (y grows upwards).
pub trait Flowable: Send + Sync {
    fn wrap(&self, avail_width: Pt) -> Size;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y_top: Pt, avail_width: Pt);

    /// Vertical gap left below the flowable in flow mode.
    fn spacing_after(&self) -> Pt {
        Pt::ZERO
    }

    fn debug_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_any(&self) -> &dyn Any;
}

/// The current flow insertion point: a page story or a grid cell.
pub trait FlowTarget {
    fn add(&mut self, flowable: Box<dyn Flowable>);
}

#[derive(Default)]
pub struct Story {
    items: Vec<Box<dyn Flowable>>,
}

impl Story {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Flowable> {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn into_items(self) -> Vec<Box<dyn Flowable>> {
        self.items
    }
}

impl FlowTarget for Story {
    fn add(&mut self, flowable: Box<dyn Flowable>) {
        self.items.push(flowable);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    lines: Vec<String>,
    font_size: Pt,
    align: TextAlign,
    spacing_after: Pt,
}

impl Paragraph {
    pub fn new(text: &str, font_size: Pt) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            font_size,
            align: TextAlign::Left,
            spacing_after: Pt::ZERO,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_spacing_after(mut self, spacing: Pt) -> Self {
        self.spacing_after = spacing;
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn leading(&self) -> Pt {
        self.font_size * LEADING
    }

    fn estimated_width(&self, line: &str) -> Pt {
        self.font_size * (line.chars().count() as f32 * AVERAGE_ADVANCE)
    }
}

impl Flowable for Paragraph {
    fn wrap(&self, avail_width: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.leading() * self.lines.len() as i32,
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y_top: Pt, avail_width: Pt) {
        canvas.set_font_size(self.font_size);
        canvas.set_fill_color(Color::BLACK);
        let leading = self.leading();
        for (index, line) in self.lines.iter().enumerate() {
            let slack = (avail_width - self.estimated_width(line)).max(Pt::ZERO);
            let line_x = match self.align {
                TextAlign::Left => x,
                TextAlign::Center => x + slack / 2,
                TextAlign::Right => x + slack,
            };
            let baseline = y_top - leading * index as i32 - self.font_size;
            canvas.draw_string(line_x, baseline, line.clone());
        }
    }

    fn spacing_after(&self) -> Pt {
        self.spacing_after
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Placeholder frame reserving the area a map is drawn into.
#[derive(Debug, Clone)]
pub struct MapFrame {
    name: Option<String>,
    width: Pt,
    height: Pt,
    spacing_after: Pt,
}

impl MapFrame {
    pub fn new(name: Option<String>, width: Pt, height: Pt) -> Self {
        Self {
            name,
            width,
            height,
            spacing_after: Pt::ZERO,
        }
    }

    pub fn with_spacing_after(mut self, spacing: Pt) -> Self {
        self.spacing_after = spacing;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

impl Flowable for MapFrame {
    fn wrap(&self, avail_width: Pt) -> Size {
        Size {
            width: self.width.min(avail_width),
            height: self.height,
        }
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y_top: Pt, _avail_width: Pt) {
        let rect = Rect {
            x,
            y: y_top - self.height,
            width: self.width,
            height: self.height,
        };
        canvas.meta(META_MAP_KEY, self.name.clone().unwrap_or_default());
        canvas.set_stroke_color(Color::BLACK);
        canvas.set_line_width(Pt::from_f32(1.0));
        canvas.draw_rect(rect.x, rect.y, rect.width, rect.height);
        canvas.stroke();
    }

    fn spacing_after(&self) -> Pt {
        self.spacing_after
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
