use std::cell::Cell;
use std::cmp;
use std::sync::Arc;

use crate::fenwick::Fenwick;
use crate::heights::HeightModel;
use crate::{Align, RecyclerOptions, Viewport, Window};

/// The headless core of the list recycler.
///
/// This type owns the layout state exclusively: the prefix-sum height index,
/// the measured-height model, the committed window, and mirrored scroll
/// geometry. It is intentionally UI-agnostic:
/// - It holds no host or element objects.
/// - An adapter layer feeds it geometry, scroll offsets, and measurements.
/// - Mount/unmount bookkeeping lives in the `recycler-adapter` crate.
#[derive(Clone, Debug)]
pub struct Recycler {
    options: RecyclerOptions,
    count: usize,
    model: HeightModel,
    sums: Fenwick,
    window: Window,
    scroll_offset: f64,
    viewport: Viewport,
    scroll_margin: f64,

    notify_depth: Cell<usize>,
    notify_pending: Cell<bool>,
}

impl Recycler {
    pub fn new(options: RecyclerOptions) -> Self {
        let model = HeightModel::new(options.estimate_item_height, options.adaptive_estimate);
        rdebug!(
            overscan = options.overscan,
            dynamic = options.dynamic_heights,
            "Recycler::new"
        );
        Self {
            options,
            count: 0,
            model,
            sums: Fenwick::new(0),
            window: Window::EMPTY,
            scroll_offset: 0.0,
            viewport: Viewport::default(),
            scroll_margin: 0.0,
            notify_depth: Cell::new(0),
            notify_pending: Cell::new(false),
        }
    }

    pub fn options(&self) -> &RecyclerOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RecyclerOptions) {
        let sizing_changed = self.options.estimate_item_height != options.estimate_item_height
            || self.options.adaptive_estimate != options.adaptive_estimate;
        self.options = options;
        if sizing_changed {
            self.model
                .set_sizing(self.options.estimate_item_height, self.options.adaptive_estimate);
            self.model.refresh();
            self.rebuild_sums();
        }
        self.notify();
    }

    pub fn set_on_change(&mut self, on_change: Option<impl Fn(&Recycler) + Send + Sync + 'static>) {
        self.options.on_change = on_change.map(|f| Arc::new(f) as _);
        self.notify();
    }

    fn notify_now(&self) {
        if let Some(cb) = &self.options.on_change {
            cb(self);
        }
    }

    fn notify(&self) {
        if self.notify_depth.get() > 0 {
            self.notify_pending.set(true);
            return;
        }
        self.notify_now();
    }

    /// Batches multiple updates into a single `on_change` notification.
    ///
    /// Recommended for adapters: a typical cycle updates viewport, margin, and
    /// scroll offset together, and the callback may drive rendering.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        let depth = self.notify_depth.get();
        self.notify_depth.set(depth.saturating_add(1));

        f(self);

        let depth = self.notify_depth.get();
        debug_assert!(depth > 0, "notify_depth underflow");
        let next = depth.saturating_sub(1);
        self.notify_depth.set(next);

        if next == 0 && self.notify_pending.replace(false) {
            self.notify_now();
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Full reset of the layout index for a (possibly new) item count and
    /// visibility mapping.
    ///
    /// Measured heights survive in the cache; the committed window resets so
    /// the next cycle re-reconciles from scratch.
    pub fn rebuild(&mut self, count: usize, is_visible: impl Fn(usize) -> bool) {
        rdebug!(count, "Recycler::rebuild");
        self.count = count;
        self.model.rebuild(count, is_visible);
        self.rebuild_sums();
        self.window = Window::EMPTY;
        self.notify();
    }

    fn rebuild_sums(&mut self) {
        self.sums = Fenwick::from_heights(self.model.effective_heights());
    }

    /// Feeds one measured outer height into the model and, when the change is
    /// material, into the prefix-sum index.
    ///
    /// Returns whether the layout actually changed.
    pub fn record_measurement(&mut self, index: usize, height: f64) -> bool {
        if index >= self.count {
            return false;
        }
        match self.model.record_measurement(index, height) {
            Some(delta) => {
                rtrace!(index, height, delta, "record_measurement");
                self.sums.add(index, delta);
                self.notify();
                true
            }
            None => false,
        }
    }

    pub fn estimate(&self) -> f64 {
        self.model.estimate()
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.model.is_visible(index)
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.model.is_measured(index)
    }

    /// Effective height of an item: zero when invisible, measured height when
    /// known, the current estimate otherwise.
    pub fn item_height(&self, index: usize) -> Option<f64> {
        (index < self.count).then(|| self.model.effective_height(index))
    }

    pub fn item_start(&self, index: usize) -> Option<f64> {
        (index < self.count).then(|| self.scroll_margin + self.sums.prefix_sum(index))
    }

    pub fn item_end(&self, index: usize) -> Option<f64> {
        let start = self.item_start(index)?;
        let size = self.item_height(index)?;
        Some(start + size)
    }

    /// Sum of the effective heights of all items.
    pub fn total_height(&self) -> f64 {
        self.sums.total()
    }

    /// Sum of effective heights over `[0..count]`, for callers that position
    /// absolutely against the list start.
    pub fn prefix_height(&self, count: usize) -> f64 {
        self.sums.prefix_sum(count)
    }

    /// Sum of effective heights over the inclusive index range `[lo, hi]`.
    pub fn range_height(&self, lo: usize, hi: usize) -> f64 {
        self.sums.range_sum(lo, hi)
    }

    /// Largest item count that fits within `target` pixels from the list
    /// start. Negative targets clamp to zero.
    pub fn count_within(&self, target: f64) -> usize {
        self.sums.count_within(target)
    }

    /// First visible item at or after `index`, skipping runs of invisible
    /// items.
    pub fn first_visible_at_or_after(&self, index: usize) -> Option<usize> {
        (index..self.count).find(|&i| self.model.is_visible(i))
    }

    /// Maps an absolute offset (including the scroll margin) to an item index.
    pub fn index_at_offset(&self, offset: f64) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let off = (offset - self.scroll_margin).max(0.0);
        Some(self.sums.count_within(off).min(self.count - 1))
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll_margin(&self) -> f64 {
        self.scroll_margin
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.notify();
    }

    /// Where the list starts inside the scroll container (e.g. after a search
    /// box or other popup chrome).
    pub fn set_scroll_margin(&mut self, scroll_margin: f64) {
        if self.scroll_margin == scroll_margin {
            return;
        }
        self.scroll_margin = scroll_margin.max(0.0);
        self.notify();
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        let offset = offset.max(0.0);
        if self.scroll_offset == offset {
            return;
        }
        rtrace!(offset, "set_scroll_offset");
        self.scroll_offset = offset;
        self.notify();
    }

    pub fn set_scroll_offset_clamped(&mut self, offset: f64) {
        let clamped = self.clamp_scroll_offset(offset);
        self.set_scroll_offset(clamped);
    }

    /// Applies viewport geometry and scroll offset in a single coalesced
    /// update.
    pub fn apply_scroll_frame(&mut self, viewport: Viewport, scroll_offset: f64) {
        self.batch_update(|r| {
            r.set_viewport(viewport);
            r.set_scroll_offset(scroll_offset);
        });
    }

    pub fn max_scroll_offset(&self) -> f64 {
        (self.scroll_margin + self.total_height() - self.viewport.height).max(0.0)
    }

    pub fn clamp_scroll_offset(&self, offset: f64) -> f64 {
        offset.clamp(0.0, self.max_scroll_offset())
    }

    /// The currently committed window.
    pub fn window(&self) -> Window {
        self.window
    }

    /// Computes the mount window for the current geometry.
    pub fn compute_window(&self) -> Window {
        self.compute_window_for(self.scroll_offset, self.viewport)
    }

    /// Computes the mount window for an explicit scroll offset and viewport.
    ///
    /// The range spans from the first visible item above the viewport (by the
    /// overscan margin, in item-height multiples) through the last item whose
    /// start falls within the viewport plus the overscan margin. Runs of
    /// invisible items are skipped when locating the start.
    pub fn compute_window_for(&self, scroll_offset: f64, viewport: Viewport) -> Window {
        let count = self.count;
        if count == 0 || viewport.height <= 0.0 {
            return Window::EMPTY;
        }

        let max_scroll = (self.scroll_margin + self.total_height() - viewport.height).max(0.0);
        let scroll = scroll_offset.clamp(0.0, max_scroll);
        let off = (scroll - self.scroll_margin).max(0.0);

        let Some(anchor) = self.first_visible_at_or_after(self.sums.count_within(off)) else {
            return Window::EMPTY;
        };

        let overscan_px = self.options.overscan as f64 * self.model.estimate();

        let start = self
            .first_visible_at_or_after(self.sums.count_within(off - overscan_px))
            .unwrap_or(anchor);
        let end = cmp::min(
            count - 1,
            self.sums
                .count_within(off + viewport.effective_height() + overscan_px),
        );
        let end = cmp::max(end, start);

        Window {
            start,
            end: end + 1,
        }
    }

    /// Commits a computed window, returning whether it differs from the
    /// previous one. An unchanged window is the cycle's no-op throttle: no
    /// mount/unmount work and no padding writes should follow.
    pub fn commit_window(&mut self, window: Window) -> bool {
        if self.window == window {
            return false;
        }
        rtrace!(start = window.start, end = window.end, "commit_window");
        self.window = window;
        self.notify();
        true
    }

    /// Placeholder heights above and below the committed window.
    pub fn padding(&self) -> (f64, f64) {
        self.padding_for(self.window)
    }

    pub fn padding_for(&self, window: Window) -> (f64, f64) {
        if window.is_empty() {
            return (0.0, 0.0);
        }
        let top = self.sums.prefix_sum(window.start);
        let bottom = self.total_height() - self.sums.prefix_sum(window.end);
        (top, bottom.max(0.0))
    }

    /// Computes the (clamped) scroll offset that brings an item into view.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let index = index.min(self.count - 1);
        let start = self.scroll_margin + self.sums.prefix_sum(index);
        let size = self.model.effective_height(index);
        let end = start + size;
        let view = self.viewport.height;
        let header = self.viewport.header;

        let target = match align {
            Align::Start => start - header,
            Align::End => end - view,
            Align::Center => start + size / 2.0 - (header + view) / 2.0,
            Align::Auto => {
                let cur = self.scroll_offset;
                if start >= cur + header && end <= cur + view {
                    cur
                } else if start < cur + header {
                    start - header
                } else {
                    end - view
                }
            }
        };

        self.clamp_scroll_offset(target)
    }

    /// Programmatically scrolls to an index and returns the applied offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> f64 {
        let offset = self.scroll_to_index_offset(index, align);
        self.set_scroll_offset(offset);
        offset
    }

    /// Number of items with a cached measurement.
    pub fn measurement_cache_len(&self) -> usize {
        let mut n = 0;
        self.model.for_each_cached(|_, _| n += 1);
        n
    }

    /// Exports the measured-height cache (useful for persistence across popup
    /// open/close cycles).
    pub fn export_measurements(&self) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        self.model.for_each_cached(|i, h| out.push((i, h)));
        out
    }

    /// Replaces the measured-height cache and re-derives the layout from it.
    pub fn import_measurements(&mut self, entries: impl IntoIterator<Item = (usize, f64)>) {
        self.model.clear_measurements();
        let mut n = 0usize;
        for (index, height) in entries {
            self.model.insert_cached(index, height);
            n += 1;
        }
        rdebug!(entries = n, "import_measurements");
        self.model.refresh();
        self.rebuild_sums();
        self.notify();
    }

    /// Drops all cached measurements, reverting every item to the estimate.
    pub fn reset_measurements(&mut self) {
        self.model.clear_measurements();
        self.rebuild_sums();
        self.notify();
    }
}
