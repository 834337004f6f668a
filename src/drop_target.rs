/// Turns the nested enter/leave events of a drop zone into one
/// "external drag is over us" signal.
///
/// Child elements of a drop zone fire their own enter/leave pairs, so only the
/// outermost 0->1 and 1->0 transitions of the counter change the signal.
#[derive(Debug, Default)]
pub struct DropTracker {
    depth: u32,
    active: bool,
}

impl DropTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns true when this event switched the signal on.
    pub fn on_enter(&mut self) -> bool {
        self.depth += 1;
        if self.depth == 1 {
            self.active = true;
            return true;
        }
        false
    }

    /// Returns true when this event switched the signal off.
    /// A leave without a matching enter is ignored.
    pub fn on_leave(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.active = false;
            return true;
        }
        false
    }

    /// Clears the drag state and yields the first dropped item. Anything after
    /// the first item is ignored.
    pub fn on_drop<I: IntoIterator>(&mut self, items: I) -> Option<I::Item> {
        self.depth = 0;
        self.active = false;

        let mut items = items.into_iter();
        let first = items.next();
        let ignored = items.count();
        if ignored > 0 {
            log::debug!("Ignoring {ignored} extra dropped item(s)");
        }
        first
    }
}
