/// Measured-height changes below this threshold are treated as layout noise
/// and never reach the prefix-sum index.
pub(crate) const MEASURE_EPSILON: f64 = 0.5;

/// Per-item measured-height cache plus the adaptive height estimator.
///
/// The model materializes one *effective* height per item (zero for invisible
/// items, measured height when known, estimate otherwise) so the prefix-sum
/// index can be kept exactly consistent with it through incremental updates.
#[derive(Clone, Debug)]
pub(crate) struct HeightModel {
    /// Dense cache, `None` until the item has been measured. Entries survive
    /// visibility flips; the array is resized, never sparsely shrunk.
    cache: Vec<Option<f64>>,
    visible: Vec<bool>,
    effective: Vec<f64>,
    measured_sum: f64,
    measured_count: usize,
    fixed_estimate: f64,
    adaptive: bool,
}

impl HeightModel {
    pub(crate) fn new(fixed_estimate: f64, adaptive: bool) -> Self {
        Self {
            cache: Vec::new(),
            visible: Vec::new(),
            effective: Vec::new(),
            measured_sum: 0.0,
            measured_count: 0,
            fixed_estimate: fixed_estimate.max(1.0),
            adaptive,
        }
    }

    pub(crate) fn set_sizing(&mut self, fixed_estimate: f64, adaptive: bool) {
        self.fixed_estimate = fixed_estimate.max(1.0);
        self.adaptive = adaptive;
    }

    /// The height assumed for not-yet-measured visible items.
    pub(crate) fn estimate(&self) -> f64 {
        if self.adaptive && self.measured_count > 0 {
            (self.measured_sum / self.measured_count as f64).max(1.0)
        } else {
            self.fixed_estimate
        }
    }

    /// Visibility defaults to `true` for indexes the model has not seen.
    pub(crate) fn is_visible(&self, index: usize) -> bool {
        self.visible.get(index).copied().unwrap_or(true)
    }

    pub(crate) fn is_measured(&self, index: usize) -> bool {
        self.cache.get(index).is_some_and(Option::is_some)
    }

    /// Height contributed to the prefix-sum index: zero when invisible,
    /// measured height when known, the current estimate otherwise.
    pub(crate) fn effective_height(&self, index: usize) -> f64 {
        self.effective.get(index).copied().unwrap_or(0.0)
    }

    pub(crate) fn effective_heights(&self) -> &[f64] {
        &self.effective
    }

    /// Records a measured outer height.
    ///
    /// Returns the delta to apply to the prefix-sum index, or `None` when the
    /// change stayed under [`MEASURE_EPSILON`] (or the item is invisible, in
    /// which case the cache still absorbs the measurement but the index
    /// contribution stays zero).
    pub(crate) fn record_measurement(&mut self, index: usize, height: f64) -> Option<f64> {
        if index >= self.cache.len() {
            debug_assert!(
                index < self.cache.len(),
                "measurement out of range (idx={index}, len={})",
                self.cache.len()
            );
            return None;
        }

        let height = height.max(0.0);
        match self.cache[index] {
            Some(prev) => {
                if (height - prev).abs() < MEASURE_EPSILON {
                    return None;
                }
                self.cache[index] = Some(height);
                if self.visible[index] {
                    self.measured_sum += height - prev;
                }
            }
            None => {
                self.cache[index] = Some(height);
                if self.visible[index] {
                    self.measured_count += 1;
                    self.measured_sum += height;
                }
            }
        }

        if !self.visible[index] {
            return None;
        }

        let delta = height - self.effective[index];
        if delta.abs() < MEASURE_EPSILON {
            return None;
        }
        self.effective[index] = height;
        Some(delta)
    }

    /// Wholesale rebuild after an item-count or bulk visibility change.
    ///
    /// Per-item incremental stat tracking is unreliable across bulk flips, so
    /// `measured_sum`/`measured_count` are recomputed by scanning the visible
    /// cached entries before effective heights are re-materialized.
    pub(crate) fn rebuild(&mut self, count: usize, is_visible: impl Fn(usize) -> bool) {
        self.cache.resize(count, None);
        self.visible.clear();
        self.visible.reserve(count);
        for i in 0..count {
            self.visible.push(is_visible(i));
        }
        self.recompute_stats();
        self.materialize();
    }

    /// Re-derives stats and effective heights from the current cache and
    /// visibility, without touching either.
    pub(crate) fn refresh(&mut self) {
        self.recompute_stats();
        self.materialize();
    }

    pub(crate) fn insert_cached(&mut self, index: usize, height: f64) {
        if let Some(slot) = self.cache.get_mut(index) {
            *slot = Some(height.max(0.0));
        }
    }

    pub(crate) fn clear_measurements(&mut self) {
        self.cache.iter_mut().for_each(|slot| *slot = None);
        self.refresh();
    }

    pub(crate) fn for_each_cached(&self, mut f: impl FnMut(usize, f64)) {
        for (i, slot) in self.cache.iter().enumerate() {
            if let Some(h) = slot {
                f(i, *h);
            }
        }
    }

    fn recompute_stats(&mut self) {
        self.measured_sum = 0.0;
        self.measured_count = 0;
        for (i, slot) in self.cache.iter().enumerate() {
            if !self.visible[i] {
                continue;
            }
            if let Some(h) = slot {
                self.measured_sum += h;
                self.measured_count += 1;
            }
        }
    }

    fn materialize(&mut self) {
        let estimate = self.estimate();
        let count = self.cache.len();
        self.effective.clear();
        self.effective.reserve(count);
        for i in 0..count {
            if !self.visible[i] {
                self.effective.push(0.0);
            } else {
                self.effective.push(self.cache[i].unwrap_or(estimate));
            }
        }
    }
}
