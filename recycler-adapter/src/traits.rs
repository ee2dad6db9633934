use recycler::Viewport;

/// The data-source collaborator: owns the items and their views.
///
/// The engine references items by index only. `view_holder` is called once
/// per item lifetime to create its view; `on_view_holder` binds (or rebinds)
/// it every time the item enters the mount window.
pub trait ListAdapter {
    /// Handle to a rendered item element, cheap to clone (in a browser host
    /// this would be a node reference).
    type Element: Clone;

    fn item_count(&self) -> usize;

    /// Per-item visibility flag; defaults to visible.
    fn is_visible(&self, index: usize) -> bool {
        let _ = index;
        true
    }

    /// Returns the element for an item, creating its view on first use.
    fn view_holder(&mut self, index: usize) -> Self::Element;

    /// Binds an existing view to its position.
    fn on_view_holder(&mut self, index: usize, element: &Self::Element);
}

/// The view-layer collaborator: the scroll container and the list scaffold.
///
/// The scaffold is the top-padding / items-host / bottom-padding placeholder
/// triple that simulates the full list height while only the window is
/// mounted.
pub trait ViewHost {
    type Element;

    /// Resolves the scroll container geometry; `None` when no container is
    /// available (a fatal configuration error at bind time).
    fn scroll_viewport(&self) -> Option<Viewport>;

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64);

    /// Offset of the list's first item from the scroll container top.
    fn list_top(&self) -> f64;

    fn build_scaffold(&mut self);

    fn remove_scaffold(&mut self);

    /// Writes the placeholder heights above and below the mounted window.
    fn set_padding(&mut self, top: f64, bottom: f64);

    /// Inserts `element` into the items host before `before`; appends when
    /// `before` is `None`.
    fn insert_before(&mut self, element: &Self::Element, before: Option<&Self::Element>);

    fn remove(&mut self, element: &Self::Element);

    /// Measures an element's outer box: content height plus vertical margins.
    fn measure(&self, element: &Self::Element) -> f64;
}
