use crate::Recycler;

/// Corrections at or below this are sub-pixel noise and not worth a scroll
/// write.
const MIN_CORRECTION: f64 = 0.5;

/// Corrections at or above this indicate a genuine user scroll, which must
/// not be fought.
const MAX_CORRECTION: f64 = 100.0;

/// A per-cycle snapshot of the first visible item at the current scroll
/// position, used to keep that item visually stable while heights shift
/// underneath it.
///
/// Not persisted between cycles: capture before a recompute, apply after.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor {
    pub index: usize,
    /// Signed distance from the live scroll offset to the anchor's start;
    /// preserving it preserves where the anchor appears on screen.
    pub delta: f64,
}

/// Captures the first visible item at the current scroll offset.
///
/// Returns `None` when the list is empty or nothing at/after the offset is
/// visible.
pub fn capture_anchor(r: &Recycler) -> Option<ScrollAnchor> {
    let scroll = r.scroll_offset();
    let off = (scroll - r.scroll_margin()).max(0.0);
    let index = r.first_visible_at_or_after(r.count_within(off))?;
    let start = r.item_start(index)?;
    Some(ScrollAnchor {
        index,
        delta: start - scroll,
    })
}

/// Computes the corrected scroll offset that restores the anchor's on-screen
/// position after heights changed.
///
/// Returns `None` when no correction should be applied: the anchor no longer
/// resolves, the required correction is sub-pixel, or it is large enough to
/// be a real scroll.
pub fn anchor_correction(r: &Recycler, anchor: ScrollAnchor) -> Option<f64> {
    let start = r.item_start(anchor.index)?;
    let target = r.clamp_scroll_offset(start - anchor.delta);
    let correction = target - r.scroll_offset();
    if correction.abs() <= MIN_CORRECTION || correction.abs() >= MAX_CORRECTION {
        return None;
    }
    Some(target)
}
