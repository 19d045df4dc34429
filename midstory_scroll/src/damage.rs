// Copyright 2025 the Midstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coarse damage summaries reported by update passes.

bitflags::bitflags! {
    /// What an update pass changed.
    ///
    /// Hosts use this to decide whether anything needs repainting or
    /// re-layout after pushing a scroll/viewport/data change into an engine.
    /// An empty value means the pass was a no-op.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct UpdateDamage: u8 {
        /// The critical window moved or changed shape.
        const WINDOW_MOVED   = 0b0000_0001;
        /// At least one item handle was newly materialized.
        const ITEMS_ACQUIRED = 0b0000_0010;
        /// At least one item handle was released back to the pool.
        const ITEMS_RELEASED = 0b0000_0100;
        /// The computed content extent grew or shrank.
        const EXTENT_CHANGED = 0b0000_1000;
    }
}

#[cfg(test)]
mod tests {
    use super::UpdateDamage;

    #[test]
    fn damage_accumulates_across_passes() {
        let mut damage = UpdateDamage::empty();
        damage |= UpdateDamage::WINDOW_MOVED;
        damage |= UpdateDamage::ITEMS_ACQUIRED;
        assert!(damage.contains(UpdateDamage::WINDOW_MOVED));
        assert!(!damage.contains(UpdateDamage::ITEMS_RELEASED));
        assert!(!damage.is_empty());
    }
}
