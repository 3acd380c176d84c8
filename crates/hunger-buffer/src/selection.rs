//! Batch-mode selection over the buffer's displayed order.
//!
//! The manager never sees the buffer itself; every operation receives the
//! current order of identifiers. Ids outside that order are ignored, and the
//! owner prunes evicted ids with [`SelectionManager::remove`] in the same
//! step that evicts them.

use std::collections::HashSet;

use hunger_core::ItemId;
use tracing::trace;

/// Outcome of a range computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSelection {
    /// Union the ids into the selection (anchor was selected).
    Union(Vec<ItemId>),
    /// Remove the ids from the selection (anchor was not selected).
    Subtract(Vec<ItemId>),
}

impl RangeSelection {
    pub fn ids(&self) -> &[ItemId] {
        match self {
            RangeSelection::Union(ids) | RangeSelection::Subtract(ids) => ids,
        }
    }
}

/// Keyboard extension direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Contiguous slice of `order` between `anchor` and `target`, inclusive.
///
/// Single pass: the "inside" flag flips on each endpoint, so the result does
/// not depend on which endpoint comes first. Returns `None` when an endpoint
/// is missing from `order`.
pub fn compute_range(
    order: &[ItemId],
    anchor: &ItemId,
    target: &ItemId,
    anchor_selected: bool,
) -> Option<RangeSelection> {
    let mut inside = false;
    let mut closed = false;
    let mut ids = Vec::new();

    for id in order {
        let endpoint = id == anchor || id == target;
        if endpoint {
            ids.push(id.clone());
            if inside || anchor == target {
                closed = true;
                break;
            }
            inside = true;
        } else if inside {
            ids.push(id.clone());
        }
    }

    if !closed {
        return None;
    }
    Some(if anchor_selected {
        RangeSelection::Union(ids)
    } else {
        RangeSelection::Subtract(ids)
    })
}

/// Selected identifiers plus the last-touched anchor.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    selected: HashSet<ItemId>,
    last_touched: Option<ItemId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: &ItemId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn last_touched(&self) -> Option<&ItemId> {
        self.last_touched.as_ref()
    }

    /// Selected ids in `order`.
    pub fn selected_in(&self, order: &[ItemId]) -> Vec<ItemId> {
        order
            .iter()
            .filter(|id| self.selected.contains(*id))
            .cloned()
            .collect()
    }

    /// Plain click: flip membership and move the anchor.
    pub fn toggle(&mut self, order: &[ItemId], id: &ItemId) -> bool {
        if !order.contains(id) {
            return false;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
        self.last_touched = Some(id.clone());
        trace!(item_id = %id, selected = self.selected.contains(id), "Selection toggled");
        true
    }

    /// Click with an optional shift modifier.
    ///
    /// Without shift, or without a usable anchor, this is a plain toggle.
    pub fn extend_range(
        &mut self,
        order: &[ItemId],
        id: &ItemId,
        shift: bool,
    ) -> Option<RangeSelection> {
        if !order.contains(id) {
            return None;
        }
        let range = match (shift, self.last_touched.as_ref()) {
            (true, Some(anchor)) => {
                compute_range(order, anchor, id, self.selected.contains(anchor))
            }
            _ => None,
        };

        let Some(range) = range else {
            self.toggle(order, id);
            return None;
        };

        match &range {
            RangeSelection::Union(ids) => self.selected.extend(ids.iter().cloned()),
            RangeSelection::Subtract(ids) => {
                for removed in ids {
                    self.selected.remove(removed);
                }
            }
        }
        self.last_touched = Some(id.clone());
        trace!(item_id = %id, range_len = range.ids().len(), "Selection range applied");
        Some(range)
    }

    /// Shift+arrow: select the anchor and its neighbor, then move to it.
    ///
    /// No-op at the edges of `order` or without an anchor.
    pub fn extend_by_keyboard(&mut self, order: &[ItemId], direction: Direction) -> bool {
        let Some(anchor) = self.last_touched.as_ref() else {
            return false;
        };
        let Some(position) = order.iter().position(|id| id == anchor) else {
            return false;
        };
        let neighbor = match direction {
            Direction::Previous => position.checked_sub(1),
            Direction::Next => Some(position + 1).filter(|p| *p < order.len()),
        };
        let Some(neighbor) = neighbor.map(|p| order[p].clone()) else {
            return false;
        };

        self.selected.insert(order[position].clone());
        self.selected.insert(neighbor.clone());
        self.last_touched = Some(neighbor);
        true
    }

    pub fn select_all(&mut self, order: &[ItemId]) {
        self.selected = order.iter().cloned().collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drop everything, including the anchor (filter change).
    pub fn reset(&mut self) {
        self.selected.clear();
        self.last_touched = None;
    }

    /// Drop an evicted id.
    pub fn remove(&mut self, id: &ItemId) {
        self.selected.remove(id);
        if self.last_touched.as_ref() == Some(id) {
            self.last_touched = None;
        }
    }
}
