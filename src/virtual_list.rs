//! List virtualization.
//!
//! Only the rows that intersect the viewport, plus an overscan margin on each
//! side, are materialized. Paddings describe the space taken by the rows that
//! were skipped so scroll geometry matches the full list.

use std::ops::Range;

/// Contiguous range of rows to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualWindow {
  pub start_index: usize,
  /// Inclusive. `None` when there is nothing to render.
  pub end_index: Option<usize>,
  /// Space above the first materialized row
  pub top_padding: u64,
  /// Space below the last materialized row
  pub bottom_padding: u64,
}

impl VirtualWindow {
  pub const EMPTY: Self = Self {
    start_index: 0,
    end_index: None,
    top_padding: 0,
    bottom_padding: 0,
  };

  /// Number of materialized rows.
  pub fn len(&self) -> usize {
    self
      .end_index
      .map_or(0, |end| end + 1 - self.start_index)
  }

  pub fn is_empty(&self) -> bool {
    self.end_index.is_none()
  }

  /// Index range for slicing the backing list.
  pub fn range(&self) -> Range<usize> {
    self.start_index..self.start_index + self.len()
  }
}

/// Compute which rows to materialize.
///
/// - `start = max(0, floor(offset / item_height) - overscan)`, with the offset
///   clamped to the last full viewport
/// - `end = min(total - 1, start + ceil(viewport / item_height) + 2 * overscan)`
///
/// An empty list or a zero item height yields [`VirtualWindow::EMPTY`].
pub fn compute_window(
  total_items: usize,
  item_height: u32,
  viewport_height: u32,
  scroll_offset: u64,
  overscan: usize,
) -> VirtualWindow {
  if total_items == 0 || item_height == 0 {
    return VirtualWindow::EMPTY;
  }

  let item_height = u64::from(item_height);
  let content_height = total_items as u64 * item_height;
  let max_offset = content_height.saturating_sub(u64::from(viewport_height));
  let offset = scroll_offset.min(max_offset);

  let first_visible = (offset / item_height) as usize;
  let visible_count = u64::from(viewport_height).div_ceil(item_height) as usize;

  let start_index = first_visible.saturating_sub(overscan);
  let end_index = start_index
    .saturating_add(visible_count)
    .saturating_add(overscan.saturating_mul(2))
    .min(total_items - 1);

  VirtualWindow {
    start_index,
    end_index: Some(end_index),
    top_padding: start_index as u64 * item_height,
    bottom_padding: (total_items - 1 - end_index) as u64 * item_height,
  }
}

/// Scroll position and selection for a virtualized list whose rows are one
/// line tall, as in a terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualListState {
  /// Index of the first row in view
  offset: usize,
  selected: Option<usize>,
}

impl VirtualListState {
  pub fn selected(&self) -> Option<usize> {
    self.selected
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  /// Keep selection and offset inside a list of `total` rows.
  pub fn clamp(&mut self, total: usize) {
    if total == 0 {
      self.selected = None;
      self.offset = 0;
      return;
    }
    self.selected = Some(self.selected.unwrap_or(0).min(total - 1));
    self.offset = self.offset.min(total - 1);
  }

  pub fn select_next(&mut self, total: usize) {
    if total == 0 {
      return;
    }
    self.selected = Some(self.selected.map_or(0, |i| (i + 1).min(total - 1)));
  }

  pub fn select_previous(&mut self, total: usize) {
    if total == 0 {
      return;
    }
    self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
  }

  pub fn select_first(&mut self, total: usize) {
    self.selected = (total > 0).then_some(0);
  }

  pub fn select_last(&mut self, total: usize) {
    self.selected = total.checked_sub(1);
  }

  pub fn page_down(&mut self, total: usize, page: usize) {
    if total == 0 {
      return;
    }
    let current = self.selected.unwrap_or(0);
    self.selected = Some(current.saturating_add(page.max(1)).min(total - 1));
  }

  pub fn page_up(&mut self, total: usize, page: usize) {
    if total == 0 {
      return;
    }
    let current = self.selected.unwrap_or(0);
    self.selected = Some(current.saturating_sub(page.max(1)));
  }

  /// Move the offset the least amount needed to bring the selection into a
  /// viewport `rows` tall.
  pub fn scroll_to_selected(&mut self, rows: usize) {
    let Some(selected) = self.selected else {
      return;
    };
    let rows = rows.max(1);
    if selected < self.offset {
      self.offset = selected;
    } else if selected >= self.offset + rows {
      self.offset = selected + 1 - rows;
    }
  }

  /// Window for a viewport `rows` tall at the current offset.
  pub fn window(&self, total: usize, rows: u16, overscan: usize) -> VirtualWindow {
    compute_window(total, 1, u32::from(rows), self.offset as u64, overscan)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn assert_geometry(window: &VirtualWindow, total: usize, item_height: u64) {
    assert_eq!(
      window.top_padding + item_height * window.len() as u64 + window.bottom_padding,
      total as u64 * item_height
    );
  }

  #[test]
  fn test_empty_list() {
    let window = compute_window(0, 50, 600, 0, 3);
    assert_eq!(window, VirtualWindow::EMPTY);
    assert_eq!(window.len(), 0);
    assert_eq!(window.range(), 0..0);
  }

  #[test]
  fn test_zero_item_height_is_empty() {
    assert!(compute_window(10, 0, 600, 0, 3).is_empty());
  }

  #[test]
  fn test_top_of_list() {
    let window = compute_window(1000, 50, 600, 0, 3);
    assert_eq!(window.start_index, 0);
    assert_eq!(window.end_index, Some(18));
    assert_eq!(window.top_padding, 0);
    assert_eq!(window.bottom_padding, (1000 - 19) * 50);
    assert_geometry(&window, 1000, 50);
  }

  #[test]
  fn test_scrolled_middle() {
    // floor(1025 / 50) = 20, minus overscan 3
    let window = compute_window(1000, 50, 600, 1025, 3);
    assert_eq!(window.start_index, 17);
    assert_eq!(window.end_index, Some(17 + 12 + 6));
    assert_eq!(window.top_padding, 17 * 50);
    assert_geometry(&window, 1000, 50);
  }

  #[test]
  fn test_scroll_past_end_is_clamped() {
    let window = compute_window(100, 50, 600, 1_000_000, 2);
    // Last full viewport starts at row 88
    assert_eq!(window.start_index, 86);
    assert_eq!(window.end_index, Some(99));
    assert_eq!(window.bottom_padding, 0);
    assert_geometry(&window, 100, 50);
  }

  #[test]
  fn test_list_shorter_than_viewport() {
    let window = compute_window(5, 50, 600, 300, 3);
    assert_eq!(window.start_index, 0);
    assert_eq!(window.end_index, Some(4));
    assert_eq!(window.range(), 0..5);
    assert_geometry(&window, 5, 50);
  }

  #[test]
  fn test_row_count_is_bounded_for_large_lists() {
    let overscan = 3;
    let bound = 600usize.div_ceil(50) + 2 * overscan + 1;
    for offset in [0u64, 50, 12_345, 2_500_000, 4_999_400, u64::MAX] {
      let window = compute_window(100_000, 50, 600, offset, overscan);
      assert!(window.len() <= bound, "offset {}: {} rows", offset, window.len());
      assert_geometry(&window, 100_000, 50);
    }
  }

  #[test]
  fn test_partial_row_viewport_rounds_up() {
    // 610 / 50 needs 13 rows
    let window = compute_window(1000, 50, 610, 0, 0);
    assert_eq!(window.len(), 14);
  }

  #[test]
  fn test_state_navigation() {
    let mut state = VirtualListState::default();
    state.select_next(3);
    assert_eq!(state.selected(), Some(0));
    state.select_next(3);
    state.select_next(3);
    state.select_next(3);
    assert_eq!(state.selected(), Some(2));
    state.select_previous(3);
    assert_eq!(state.selected(), Some(1));
    state.select_last(3);
    assert_eq!(state.selected(), Some(2));
    state.select_first(0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_scroll_follows_selection() {
    let mut state = VirtualListState::default();
    state.select_first(100);
    state.page_down(100, 25);
    state.scroll_to_selected(10);
    assert_eq!(state.selected(), Some(25));
    assert_eq!(state.offset(), 16);

    state.page_up(100, 20);
    state.scroll_to_selected(10);
    assert_eq!(state.offset(), 5);

    let window = state.window(100, 10, 2);
    assert_eq!(window.start_index, 3);
    assert!(window.range().contains(&5));
  }

  #[test]
  fn test_clamp_after_shrink() {
    let mut state = VirtualListState::default();
    state.select_last(50);
    state.scroll_to_selected(10);
    state.clamp(5);
    assert_eq!(state.selected(), Some(4));
    assert!(state.offset() <= 4);

    state.clamp(0);
    assert_eq!(state.selected(), None);
    assert_eq!(state.offset(), 0);
  }
}
