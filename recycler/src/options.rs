use std::sync::Arc;

use crate::recycler::Recycler;

/// A callback fired when the recycler's internal state changes.
pub type OnChangeCallback = Arc<dyn Fn(&Recycler) + Send + Sync>;

/// Configuration for [`crate::Recycler`].
///
/// Cheap to clone: the only heavy field is the `on_change` callback, which is
/// stored in an `Arc`.
#[derive(Clone)]
pub struct RecyclerOptions {
    /// Assumed height for not-yet-measured items, in pixels.
    pub estimate_item_height: f64,

    /// Extra rows rendered beyond the viewport, in item-height multiples.
    pub overscan: usize,

    /// When enabled, mounted items are measured each cycle and their real
    /// heights feed back into the layout.
    pub dynamic_heights: bool,

    /// When enabled, the running average of measured heights replaces the
    /// fixed estimate for unmeasured items.
    pub adaptive_estimate: bool,

    /// Optional callback fired when the recycler's state changes.
    pub on_change: Option<OnChangeCallback>,
}

impl RecyclerOptions {
    pub fn new() -> Self {
        Self {
            estimate_item_height: 36.0,
            overscan: 8,
            dynamic_heights: true,
            adaptive_estimate: true,
            on_change: None,
        }
    }

    pub fn with_estimate_item_height(mut self, estimate_item_height: f64) -> Self {
        self.estimate_item_height = estimate_item_height;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_dynamic_heights(mut self, dynamic_heights: bool) -> Self {
        self.dynamic_heights = dynamic_heights;
        self
    }

    pub fn with_adaptive_estimate(mut self, adaptive_estimate: bool) -> Self {
        self.adaptive_estimate = adaptive_estimate;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&Recycler) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }
}

impl Default for RecyclerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecyclerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecyclerOptions")
            .field("estimate_item_height", &self.estimate_item_height)
            .field("overscan", &self.overscan)
            .field("dynamic_heights", &self.dynamic_heights)
            .field("adaptive_estimate", &self.adaptive_estimate)
            .finish_non_exhaustive()
    }
}
