use crate::block::{Block, MapBlock};
use crate::data_context::DataContext;
use crate::error::BlockPrintError;
use crate::flowable::FlowTarget;
use crate::rendering_context::RenderingContext;

/// Blocks laid out from the top of a fresh page. Root blocks may be absolute.
pub struct PageLayout {
    name: String,
    blocks: Vec<Box<dyn Block>>,
}

impl PageLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: impl Block + 'static) -> Self {
        self.blocks.push(Box::new(block));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Box<dyn Block>] {
        &self.blocks
    }

    pub fn validate(&self) -> Result<(), BlockPrintError> {
        if self.blocks.is_empty() {
            return Err(BlockPrintError::invalid_value(
                "blocks",
                format!("[] in page '{}'", self.name),
            ));
        }
        self.blocks.iter().try_for_each(|block| block.validate())
    }

    /// Renders the visible blocks in declaration order.
    pub fn render(
        &self,
        data: &DataContext,
        target: &mut dyn FlowTarget,
        ctx: &mut RenderingContext,
    ) -> Result<(), BlockPrintError> {
        for block in &self.blocks {
            if block.is_visible(ctx, data) {
                block.render(data, target, ctx)?;
            }
        }
        Ok(())
    }

    pub fn find_map_block(&self, name: Option<&str>) -> Option<&MapBlock> {
        self.blocks.iter().find_map(|block| block.find_map_block(name))
    }
}

#[derive(Default)]
pub struct Layout {
    pages: Vec<PageLayout>,
}

impl Layout {
    pub fn new(pages: Vec<PageLayout>) -> Self {
        Self { pages }
    }

    pub fn with_page(mut self, page: PageLayout) -> Self {
        self.pages.push(page);
        self
    }

    pub fn pages(&self) -> &[PageLayout] {
        &self.pages
    }

    pub fn validate(&self) -> Result<(), BlockPrintError> {
        if self.pages.is_empty() {
            return Err(BlockPrintError::invalid_value("pages", "[]"));
        }
        self.pages.iter().try_for_each(PageLayout::validate)
    }

    pub fn find_map_block(&self, name: Option<&str>) -> Option<&MapBlock> {
        self.pages.iter().find_map(|page| page.find_map_block(name))
    }
}
