//! Drives the engine against a tiny in-memory host, the way a dropdown
//! binding would: bind, scroll, filter, tear down.
use std::cell::RefCell;
use std::rc::Rc;

use recycler::{RecyclerOptions, Viewport};
use recycler_adapter::{Engine, ListAdapter, ViewHost};

#[derive(Default)]
struct Dom {
    order: Vec<usize>,
    heights: Vec<f64>,
    scroll: f64,
    padding: (f64, f64),
}

#[derive(Clone)]
struct Host(Rc<RefCell<Dom>>);

impl ViewHost for Host {
    type Element = usize;

    fn scroll_viewport(&self) -> Option<Viewport> {
        Some(Viewport::new(300.0))
    }

    fn scroll_offset(&self) -> f64 {
        self.0.borrow().scroll
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.0.borrow_mut().scroll = offset;
    }

    fn list_top(&self) -> f64 {
        0.0
    }

    fn build_scaffold(&mut self) {}

    fn remove_scaffold(&mut self) {
        self.0.borrow_mut().order.clear();
    }

    fn set_padding(&mut self, top: f64, bottom: f64) {
        self.0.borrow_mut().padding = (top, bottom);
    }

    fn insert_before(&mut self, element: &usize, before: Option<&usize>) {
        let mut dom = self.0.borrow_mut();
        let pos = before
            .and_then(|b| dom.order.iter().position(|e| e == b))
            .unwrap_or(dom.order.len());
        dom.order.insert(pos, *element);
    }

    fn remove(&mut self, element: &usize) {
        self.0.borrow_mut().order.retain(|e| e != element);
    }

    fn measure(&self, element: &usize) -> f64 {
        self.0.borrow().heights[*element]
    }
}

struct Options {
    labels: Vec<String>,
    filtered: Vec<bool>,
}

impl ListAdapter for Options {
    type Element = usize;

    fn item_count(&self) -> usize {
        self.labels.len()
    }

    fn is_visible(&self, index: usize) -> bool {
        !self.filtered[index]
    }

    fn view_holder(&mut self, index: usize) -> usize {
        index
    }

    fn on_view_holder(&mut self, _index: usize, _element: &usize) {}
}

fn main() {
    let count = 500;
    let dom = Rc::new(RefCell::new(Dom {
        heights: (0..count)
            .map(|i| if i % 7 == 0 { 64.0 } else { 36.0 })
            .collect(),
        ..Default::default()
    }));

    let adapter = Options {
        labels: (0..count).map(|i| format!("option {i}")).collect(),
        filtered: vec![false; count],
    };

    let mut engine = Engine::new(RecyclerOptions::new().with_overscan(2));
    engine
        .bind_host(Host(Rc::clone(&dom)), adapter)
        .expect("the sim host always has a scroll container");
    println!("mounted after bind:   {:?}", dom.borrow().order);

    // User scrolls.
    dom.borrow_mut().scroll = 2_000.0;
    engine.on_scroll();
    engine.tick();
    println!("mounted after scroll: {:?}", dom.borrow().order);

    // A filter hides every third option.
    if let Some(options) = engine.adapter_mut() {
        for (i, hidden) in options.filtered.iter_mut().enumerate() {
            *hidden = i % 3 == 0;
        }
    }
    engine.notify_visibility_changed();
    engine.tick();
    println!(
        "mounted after filter: {:?} (padding {:?})",
        dom.borrow().order,
        dom.borrow().padding
    );

    engine.destroy();
}
