use spinwheel_core::Item;

/// Active and hidden item instances plus the chained multiplier.
#[derive(Debug)]
pub(crate) struct WheelState {
    /// Items presented on the wheel, in sector order.
    pub(crate) active: Vec<Item>,
    /// Items withheld by gating, in the order they were hidden.
    pub(crate) hidden: Vec<Item>,
    /// Product of consecutive multiplier results awaiting consumption.
    pub(crate) pending_multiplier: u64,
}

impl WheelState {
    pub(crate) fn new() -> Self {
        Self {
            active: Vec::new(),
            hidden: Vec::new(),
            pending_multiplier: 1,
        }
    }

    /// Removes one instance equal to `item`, preferring the sector at `index`.
    ///
    /// Falls back to the first equal active instance and then to the hidden
    /// pool, because reconciliation may have shifted indices since selection.
    pub(crate) fn take_instance(&mut self, index: usize, item: &Item) -> bool {
        if self.active.get(index) == Some(item) {
            let _ = self.active.remove(index);
            return true;
        }
        if let Some(position) = self.active.iter().position(|candidate| candidate == item) {
            let _ = self.active.remove(position);
            return true;
        }
        if let Some(position) = self.hidden.iter().position(|candidate| candidate == item) {
            let _ = self.hidden.remove(position);
            return true;
        }
        false
    }

    /// Drops every active and hidden instance of `base_name`.
    ///
    /// Returns the number of instances removed from the active wheel.
    pub(crate) fn purge(&mut self, base_name: &str) -> usize {
        let before = self.active.len();
        self.active.retain(|item| item.base_name != base_name);
        self.hidden.retain(|item| item.base_name != base_name);
        before - self.active.len()
    }
}

/// Index of the sector under the pointer for the given wheel rotation.
///
/// The pointer sits at the top of the wheel; sector `i` starts at
/// `90 - s/2 + i*s + offset` degrees for sector width `s`. Returns `None` when
/// the wheel is empty.
#[must_use]
pub fn pointer_index(angle_offset: f64, count: usize) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let sector = 360.0 / count as f64;
    let wrapped = (sector / 2.0 - angle_offset).rem_euclid(360.0);
    let raw = (wrapped / sector).floor();
    let index = if raw.is_finite() && raw > 0.0 {
        raw as usize
    } else {
        0
    };
    Some(index.min(count - 1))
}
