use crate::canvas::Canvas;
use crate::flowable::Flowable;
use crate::types::{Pt, Rect};

pub enum AddResult {
    Placed,
    Overflow(Box<dyn Flowable>),
}

/// Page content box filled top to bottom.
pub struct Frame {
    rect: Rect,
    cursor: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor).max(Pt::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.cursor <= Pt::ZERO
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        let size = flowable.wrap(avail_width);

        // An overfull flowable on an empty frame is placed anyway so
        // pagination keeps moving forward.
        if size.height > avail_height && !self.is_empty() {
            return AddResult::Overflow(flowable);
        }

        let y_top = self.rect.top() - self.cursor;
        flowable.draw(canvas, self.rect.x, y_top, avail_width);
        canvas.record_bounds(Rect {
            x: self.rect.x,
            y: y_top - size.height,
            width: size.width,
            height: size.height,
        });
        self.cursor = (self.cursor + size.height + flowable.spacing_after()).min(self.rect.height);
        AddResult::Placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::Paragraph;
    use crate::types::Size;

    fn frame() -> Frame {
        Frame::new(Rect {
            x: Pt::from_i32(20),
            y: Pt::from_i32(20),
            width: Pt::from_i32(200),
            height: Pt::from_i32(30),
        })
    }

    fn line(text: &str) -> Box<dyn Flowable> {
        Box::new(Paragraph::new(text, Pt::from_i32(10)).with_spacing_after(Pt::from_i32(2)))
    }

    #[test]
    fn places_from_the_top_with_spacing() {
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame();
        assert!(matches!(frame.add(line("a"), &mut canvas), AddResult::Placed));
        assert!(matches!(frame.add(line("b"), &mut canvas), AddResult::Placed));
        assert_eq!(frame.remaining_height(), Pt::from_i32(2));

        let tops: Vec<Pt> = canvas.current_page().recorded_bounds().iter().map(Rect::top).collect();
        assert_eq!(tops, vec![Pt::from_i32(50), Pt::from_i32(36)]);
    }

    #[test]
    fn overflow_returns_the_flowable() {
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame();
        frame.add(line("a"), &mut canvas);
        frame.add(line("b"), &mut canvas);
        match frame.add(line("c"), &mut canvas) {
            AddResult::Overflow(flowable) => assert_eq!(flowable.wrap(Pt::from_i32(200)).height, Pt::from_i32(12)),
            AddResult::Placed => panic!("third line should not fit"),
        }
    }

    #[test]
    fn overfull_flowable_is_placed_on_an_empty_frame() {
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame();
        let tall: Box<dyn Flowable> = Box::new(Paragraph::new("1\n2\n3\n4", Pt::from_i32(10)));
        assert!(matches!(frame.add(tall, &mut canvas), AddResult::Placed));
        assert_eq!(frame.remaining_height(), Pt::ZERO);
        assert!(!frame.is_empty());
    }
}
