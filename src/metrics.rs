#[derive(Debug, Clone, Default)]
pub struct PageMetrics {
    pub page_number: usize,
    pub layout_name: String,
    pub render_ms: f64,
    pub command_count: usize,
    pub flowable_count: usize,
    /// Absolute overlays painted while finalizing the page.
    pub deferred_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    pub total_render_ms: f64,
}
