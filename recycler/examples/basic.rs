//! Computes mount windows for a large option list, no host required.
use recycler::{Recycler, RecyclerOptions, Viewport};

fn main() {
    let mut r = Recycler::new(RecyclerOptions::new().with_overscan(4));
    r.rebuild(100_000, |_| true);
    r.set_viewport(Viewport::new(400.0));

    for offset in [0.0, 5_000.0, 1_000_000_000.0] {
        r.set_scroll_offset_clamped(offset);
        let w = r.compute_window();
        r.commit_window(w);
        let (top, bottom) = r.padding();
        println!(
            "offset {:>12.1}: window [{}, {}), padding {top:.0}/{bottom:.0}",
            r.scroll_offset(),
            w.start,
            w.end
        );
    }

    // A measured item feeds straight back into the layout.
    r.record_measurement(2, 120.0);
    println!("total after measuring item 2: {:.0}", r.total_height());
}
