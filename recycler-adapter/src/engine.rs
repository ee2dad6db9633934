use std::collections::BTreeMap;
use std::mem;

use recycler::{Align, Recycler, RecyclerOptions, Window, anchor_correction, capture_anchor};

use crate::{BindError, ListAdapter, ViewHost};

/// Bounded number of measure → re-window passes per cycle. Measurement is
/// idempotent, so the loop settles well before this.
const MAX_SETTLE_PASSES: usize = 4;

/// The event-driven engine binding a [`Recycler`] core to a host.
///
/// One instance per bound list. The host forwards scroll events, resize
/// signals, and render-opportunity ticks; the engine coalesces them into at
/// most one recompute per tick and never blocks:
/// - [`Engine::on_scroll`] / [`Engine::notify_resize`] /
///   [`Engine::notify_visibility_changed`] arm pending flags.
/// - [`Engine::tick`] drains them, running the window → reconcile → measure →
///   anchor-correct cycle.
///
/// `suspend`/`resume` pause reactive recompute for bulk operations; a
/// synchronous [`Engine::hard_refresh`] still rebuilds the index while
/// suspended.
pub struct Engine<A, H>
where
    A: ListAdapter,
    H: ViewHost<Element = A::Element>,
{
    core: Recycler,
    adapter: Option<A>,
    host: Option<H>,
    mounted: BTreeMap<usize, A::Element>,
    pending_recompute: bool,
    pending_measure: bool,
    pending_refresh: bool,
    in_recompute: bool,
    reconciling: bool,
    suspended: bool,
    recomputes: usize,
}

impl<A, H> Engine<A, H>
where
    A: ListAdapter,
    H: ViewHost<Element = A::Element>,
{
    pub fn new(options: RecyclerOptions) -> Self {
        Self {
            core: Recycler::new(options),
            adapter: None,
            host: None,
            mounted: BTreeMap::new(),
            pending_recompute: false,
            pending_measure: false,
            pending_refresh: false,
            in_recompute: false,
            reconciling: false,
            suspended: false,
            recomputes: 0,
        }
    }

    pub fn recycler(&self) -> &Recycler {
        &self.core
    }

    pub fn recycler_mut(&mut self) -> &mut Recycler {
        &mut self.core
    }

    pub fn adapter(&self) -> Option<&A> {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> Option<&mut A> {
        self.adapter.as_mut()
    }

    pub fn is_bound(&self) -> bool {
        self.host.is_some()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Number of currently mounted elements.
    pub fn mounted_len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_mounted(&self, index: usize) -> bool {
        self.mounted.contains_key(&index)
    }

    /// Total recompute cycles run; useful for diagnostics.
    pub fn recompute_count(&self) -> usize {
        self.recomputes
    }

    /// Attaches the engine to a host and data source.
    ///
    /// Builds the scaffold, resolves the scroll container (a missing
    /// container is fatal), syncs the layout index, and performs the initial
    /// layout.
    pub fn bind_host(&mut self, host: H, adapter: A) -> Result<(), BindError> {
        if self.host.is_some() {
            return Err(BindError::AlreadyBound);
        }
        let Some(viewport) = host.scroll_viewport() else {
            return Err(BindError::MissingScrollContainer);
        };

        let mut host = host;
        host.build_scaffold();
        let margin = host.list_top();
        let offset = host.scroll_offset();
        self.core.batch_update(|r| {
            r.set_viewport(viewport);
            r.set_scroll_margin(margin);
            r.set_scroll_offset(offset.max(0.0));
        });
        rdebug!(count = adapter.item_count(), "bind_host");
        self.adapter = Some(adapter);
        self.host = Some(host);
        self.suspended = false;

        self.refresh_data();
        self.run_recompute();
        Ok(())
    }

    /// Scroll event ingestion; coalesced into one recompute per tick, ignored
    /// while suspended.
    pub fn on_scroll(&mut self) {
        if self.suspended || self.host.is_none() {
            return;
        }
        self.pending_recompute = true;
    }

    /// Exogenous resize signal (e.g. an external layout shift); schedules one
    /// coalesced re-measurement pass. Ignored while the reconciler itself is
    /// inserting/removing nodes, since insertion can trigger a resize
    /// notification.
    pub fn notify_resize(&mut self) {
        if self.suspended || self.reconciling || self.host.is_none() {
            return;
        }
        self.pending_measure = true;
    }

    /// Bulk visibility change notification (e.g. a filter was applied);
    /// schedules a full reset + rebuild.
    pub fn notify_visibility_changed(&mut self) {
        if self.host.is_none() {
            return;
        }
        self.pending_refresh = true;
    }

    /// Drains pending work; call once per render opportunity.
    pub fn tick(&mut self) {
        if self.suspended || self.in_recompute || self.host.is_none() {
            return;
        }
        if self.pending_refresh {
            self.pending_refresh = false;
            self.pending_recompute = false;
            self.pending_measure = false;
            self.hard_refresh();
            return;
        }
        if self.pending_recompute || self.pending_measure {
            self.pending_recompute = false;
            self.pending_measure = false;
            self.run_recompute();
        }
    }

    /// Pauses reactive recompute and cancels pending work.
    pub fn suspend(&mut self) {
        self.suspended = true;
        self.pending_recompute = false;
        self.pending_measure = false;
    }

    /// Resumes reactive recompute, scheduling exactly one recompute.
    pub fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        self.pending_recompute = true;
    }

    /// Full reset + rebuild of the layout index from the adapter, then (when
    /// not suspended) a synchronous recompute.
    pub fn hard_refresh(&mut self) {
        if self.host.is_none() {
            return;
        }
        rdebug!("hard_refresh");
        self.refresh_data();
        if self.suspended {
            return; // the index is current; resume schedules the render pass
        }
        self.run_recompute();
    }

    /// Forces an item into the mounted window (a probe mount), optionally
    /// scrolling to it.
    pub fn ensure_item_rendered(&mut self, index: usize, scroll_into_view: bool) {
        if self.host.is_none() || index >= self.core.count() {
            return;
        }
        if self.core.is_visible(index) && !self.mounted.contains_key(&index) {
            self.reconciling = true;
            self.mount(index);
            self.reconciling = false;
            if self.core.options().dynamic_heights {
                let measured = match (self.host.as_ref(), self.mounted.get(&index)) {
                    (Some(host), Some(element)) => Some(host.measure(element)),
                    _ => None,
                };
                if let Some(height) = measured {
                    self.core.record_measurement(index, height);
                }
            }
        }
        if scroll_into_view {
            let target = self.core.scroll_to_index_offset(index, Align::Auto);
            self.apply_scroll_target(target);
        }
    }

    /// Scrolls so the item's top aligns with the container, clamped to the
    /// valid scroll range.
    pub fn scroll_to_index(&mut self, index: usize) {
        if self.host.is_none() {
            return;
        }
        let target = self.core.scroll_to_index_offset(index, Align::Start);
        self.apply_scroll_target(target);
    }

    /// Detaches from the host: unmounts everything and drops the host and
    /// adapter, keeping the engine reusable for a future `bind_host`. The
    /// scaffold stays with the host.
    pub fn dispose(&mut self) {
        self.unbind(false);
    }

    /// Terminal teardown, including scaffold removal.
    pub fn destroy(&mut self) {
        self.unbind(true);
    }

    fn unbind(&mut self, remove_scaffold: bool) {
        self.pending_recompute = false;
        self.pending_measure = false;
        self.pending_refresh = false;
        self.in_recompute = false;
        self.reconciling = false;
        self.suspended = false;
        let mounted = mem::take(&mut self.mounted);
        if let Some(host) = self.host.as_mut() {
            for element in mounted.values() {
                host.remove(element);
            }
            host.set_padding(0.0, 0.0);
            if remove_scaffold {
                host.remove_scaffold();
            }
        }
        self.host = None;
        self.adapter = None;
        self.core.rebuild(0, |_| true);
    }

    fn refresh_data(&mut self) {
        if let Some(adapter) = self.adapter.as_ref() {
            let count = adapter.item_count();
            self.core.rebuild(count, |i| adapter.is_visible(i));
        }
    }

    fn apply_scroll_target(&mut self, target: f64) {
        if let Some(host) = self.host.as_mut() {
            host.set_scroll_offset(target);
        }
        self.core.set_scroll_offset(target);
        self.pending_recompute = true;
    }

    fn sync_geometry(&mut self) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        // A vanished container mid-flight keeps the previous geometry; the
        // next bind resolves it afresh.
        let Some(viewport) = host.scroll_viewport() else {
            return;
        };
        let margin = host.list_top();
        let offset = host.scroll_offset();
        self.core.batch_update(|r| {
            r.set_viewport(viewport);
            r.set_scroll_margin(margin);
            r.set_scroll_offset(offset.max(0.0));
        });
    }

    fn run_recompute(&mut self) {
        if self.in_recompute || self.host.is_none() || self.adapter.is_none() {
            return;
        }
        self.in_recompute = true;
        self.recomputes += 1;

        self.sync_geometry();
        let anchor = capture_anchor(&self.core);

        let mut heights_changed = false;
        for _ in 0..MAX_SETTLE_PASSES {
            let window = self.core.compute_window();
            if self.core.commit_window(window) {
                self.reconcile(window);
                self.write_padding();
            }
            if !self.core.options().dynamic_heights || !self.measure_mounted() {
                break;
            }
            heights_changed = true;
        }

        if heights_changed {
            self.write_padding();
            if let Some(anchor) = anchor {
                if let Some(target) = anchor_correction(&self.core, anchor) {
                    rtrace!(index = anchor.index, to = target, "anchor correction");
                    if let Some(host) = self.host.as_mut() {
                        host.set_scroll_offset(target);
                    }
                    self.core.set_scroll_offset(target);
                    let window = self.core.compute_window();
                    if self.core.commit_window(window) {
                        self.reconcile(window);
                        self.write_padding();
                    }
                }
            }
        }

        self.in_recompute = false;
    }

    fn measure_mounted(&mut self) -> bool {
        let Some(host) = self.host.as_ref() else {
            return false;
        };
        let mut changed = false;
        for (&index, element) in self.mounted.iter() {
            if !self.core.is_visible(index) {
                continue;
            }
            let height = host.measure(element);
            if self.core.record_measurement(index, height) {
                changed = true;
            }
        }
        changed
    }

    fn reconcile(&mut self, window: Window) {
        self.reconciling = true;

        // Invisible items are unmounted regardless of range.
        let stale: Vec<usize> = self
            .mounted
            .keys()
            .copied()
            .filter(|&i| !window.contains(i) || !self.core.is_visible(i))
            .collect();
        for index in stale {
            if let Some(element) = self.mounted.remove(&index) {
                if let Some(host) = self.host.as_mut() {
                    host.remove(&element);
                }
            }
        }

        for index in window.start..window.end {
            if !self.core.is_visible(index) || self.mounted.contains_key(&index) {
                continue;
            }
            self.mount(index);
        }

        self.reconciling = false;
    }

    fn mount(&mut self, index: usize) {
        let Some(adapter) = self.adapter.as_mut() else {
            return;
        };
        let element = adapter.view_holder(index);
        adapter.on_view_holder(index, &element);
        // The next-higher mounted index supplies the insertion anchor; an
        // absent neighbor means append.
        let before = self.mounted.range(index + 1..).next().map(|(_, el)| el);
        if let Some(host) = self.host.as_mut() {
            host.insert_before(&element, before);
        }
        self.mounted.insert(index, element);
    }

    fn write_padding(&mut self) {
        let (top, bottom) = self.core.padding();
        if let Some(host) = self.host.as_mut() {
            host.set_padding(top, bottom);
        }
    }
}
