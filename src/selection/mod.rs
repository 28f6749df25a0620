//! Ordered test selection
//!
//! Keeps the backing list of catalog items with a selected flag each. The
//! execution order is a projection of that list filtered to selected items and
//! is recomputed on every read, so it always reflects the latest toggle or move.

use std::collections::HashSet;

use crate::error::{DashboardError, DashboardResult};
use crate::models::{ExecutionConfig, TestDescriptor};

/// One entry of the backing list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionItem {
    pub descriptor: TestDescriptor,
    pub selected: bool,
}

/// Explicit placement for [`OrderedSelection::reorder`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Before(String),
    After(String),
}

/// Transient state of one drag gesture: the item being moved
///
/// Created when the gesture starts and consumed by
/// [`OrderedSelection::drop_onto`], so no drag target outlives its gesture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DragContext {
    moved: String,
}

impl DragContext {
    pub fn begin(name: impl Into<String>) -> Self {
        Self { moved: name.into() }
    }

    pub fn moved(&self) -> &str {
        &self.moved
    }
}

/// Ordered selection of tests for batch execution
#[derive(Clone, Debug, Default)]
pub struct OrderedSelection {
    items: Vec<SelectionItem>,
}

impl OrderedSelection {
    /// Build from the catalog; duplicate names keep their first position
    pub fn new<I, D>(catalog: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<TestDescriptor>,
    {
        let mut seen = HashSet::new();
        let items = catalog
            .into_iter()
            .map(Into::into)
            .filter(|d: &TestDescriptor| seen.insert(d.name.clone()))
            .map(|descriptor| SelectionItem {
                descriptor,
                selected: false,
            })
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|i| i.descriptor.name == name)
    }

    fn require(&self, name: &str) -> DashboardResult<usize> {
        self.position(name)
            .ok_or_else(|| DashboardError::UnknownTest(name.to_string()))
    }

    /// Mark a test selected or unselected; the backing order is untouched
    pub fn toggle(&mut self, name: &str, selected: bool) -> DashboardResult<()> {
        let idx = self.require(name)?;
        self.items[idx].selected = selected;
        Ok(())
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.position(name)
            .map(|idx| self.items[idx].selected)
            .unwrap_or(false)
    }

    pub fn select_all(&mut self) {
        self.items.iter_mut().for_each(|i| i.selected = true);
    }

    pub fn clear_all(&mut self) {
        self.items.iter_mut().for_each(|i| i.selected = false);
    }

    /// Drop every selection, leaving the backing order as it is
    pub fn reset(&mut self) {
        self.clear_all();
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|i| i.selected).count()
    }

    /// Selected names in execution order
    pub fn current_order(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.selected)
            .map(|i| i.descriptor.name.clone())
            .collect()
    }

    /// 1-based position within [`current_order`](Self::current_order); `None` when unranked
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .filter(|i| i.selected)
            .position(|i| i.descriptor.name == name)
            .map(|p| p + 1)
    }

    /// Move `moved` to the explicit `placement`
    ///
    /// Placing an item relative to itself is a no-op.
    pub fn reorder(&mut self, moved: &str, placement: &Placement) -> DashboardResult<()> {
        let from = self.require(moved)?;
        let (target, after) = match placement {
            Placement::Before(t) => (t.as_str(), false),
            Placement::After(t) => (t.as_str(), true),
        };
        self.require(target)?;
        if target == moved {
            return Ok(());
        }

        let item = self.items.remove(from);
        let to = self.require(target)?;
        let insert_at = if after { to + 1 } else { to };
        self.items.insert(insert_at, item);
        Ok(())
    }

    /// Complete a drag gesture by dropping the dragged item onto `target`
    ///
    /// An item dragged downwards lands right after the target, one dragged
    /// upwards lands right before it. Returns whether the order changed.
    pub fn drop_onto(&mut self, drag: DragContext, target: &str) -> DashboardResult<bool> {
        let from = self.require(&drag.moved)?;
        let to = self.require(target)?;
        if from == to {
            return Ok(false);
        }

        let placement = if from < to {
            Placement::After(target.to_string())
        } else {
            Placement::Before(target.to_string())
        };
        self.reorder(&drag.moved, &placement)?;
        Ok(true)
    }

    /// Snapshot the current order into a batch configuration
    ///
    /// The returned config owns its test list; later edits to the selection
    /// cannot reach a request built from it.
    pub fn to_config(&self, concurrency: u32, delay: u64) -> ExecutionConfig {
        ExecutionConfig::new(self.current_order(), concurrency, delay)
    }
}
