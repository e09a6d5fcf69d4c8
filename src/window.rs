use std::collections::VecDeque;

use crate::models::BlockSummary;

pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

/// Insertion-ordered window over the most recent blocks.
///
/// Block numbers are unique: a block whose number is already present is
/// dropped, not merged. Ordering is whatever the endpoint delivered.
#[derive(Debug, Clone)]
pub struct BlockWindow {
    blocks: VecDeque<BlockSummary>,
    capacity: usize,
}

impl Default for BlockWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl BlockWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            blocks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` when the block number was already retained.
    pub fn push(&mut self, block: BlockSummary) -> bool {
        if self.contains(block.number) {
            return false;
        }
        self.blocks.push_back(block);
        while self.blocks.len() > self.capacity {
            self.blocks.pop_front();
        }
        true
    }

    pub fn contains(&self, number: u64) -> bool {
        self.blocks.iter().any(|b| b.number == number)
    }

    /// Most recently retained block.
    pub fn newest(&self) -> Option<&BlockSummary> {
        self.blocks.back()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockSummary> {
        self.blocks.iter()
    }

    pub fn to_vec(&self) -> Vec<BlockSummary> {
        self.blocks.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64) -> BlockSummary {
        BlockSummary {
            number,
            timestamp: 1_700_000_000 + number * 12,
            gas_used: "0x0".into(),
            gas_limit: "0x1c9c380".into(),
            transactions: Vec::new(),
            transaction_count: 0,
        }
    }

    #[test]
    fn duplicate_numbers_are_dropped() {
        let mut window = BlockWindow::default();
        assert!(window.push(block(100)));
        assert!(!window.push(block(100)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn oldest_entries_are_evicted_first() {
        let mut window = BlockWindow::default();
        for n in 0..25 {
            window.push(block(n));
        }
        assert_eq!(window.len(), DEFAULT_WINDOW_CAPACITY);
        assert_eq!(window.iter().next().map(|b| b.number), Some(5));
        assert_eq!(window.newest().map(|b| b.number), Some(24));
    }

    #[test]
    fn out_of_order_blocks_are_kept_in_arrival_order() {
        let mut window = BlockWindow::new(3);
        window.push(block(10));
        window.push(block(8));
        window.push(block(9));
        let numbers: Vec<u64> = window.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![10, 8, 9]);
    }

    #[test]
    fn never_exceeds_capacity_or_repeats() {
        let mut window = BlockWindow::new(4);
        for n in [1, 2, 2, 3, 1, 4, 5, 5, 6] {
            window.push(block(n));
            assert!(window.len() <= 4);
            let mut numbers: Vec<u64> = window.iter().map(|b| b.number).collect();
            numbers.sort_unstable();
            numbers.dedup();
            assert_eq!(numbers.len(), window.len());
        }
    }
}
