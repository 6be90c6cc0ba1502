use thiserror::Error;

pub mod segment;

use segment::{SegmentId, SegmentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TapeError {
    #[error("could not allocate memory (segment of {capacity} cells)")]
    OutOfMemory { capacity: usize },
}

/// An unbounded tape of byte cells in both directions, all starting at zero.
///
/// Built out of segments that double in size the further they are from
/// the start, so moving is O(1) amortized and untouched cells cost nothing
/// beyond their reserved capacity.
#[derive(Debug)]
pub struct Tape {
    store: SegmentStore,

    /// Segment the data pointer is in
    segment: SegmentId,
    /// Offset of the data pointer, counted outward from the segment's entry edge
    offset: usize,
}

/// The touched part of a tape, see `Tape::snapshot`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapeSnapshot {
    pub cells: Vec<u8>,
    /// Index of the data pointer within `cells`
    pub pointer: usize,
}

impl Tape {
    pub fn new() -> Result<Tape, TapeError> {
        Ok(Tape {
            store: SegmentStore::new()?,
            segment: SegmentStore::ROOT,
            offset: 0,
        })
    }

    pub fn move_left(&mut self) -> Result<(), TapeError> {
        self.step(Direction::Left)
    }

    pub fn move_right(&mut self) -> Result<(), TapeError> {
        self.step(Direction::Right)
    }

    pub fn step(&mut self, direction: Direction) -> Result<(), TapeError> {
        let segment = self.store.get_mut(self.segment);
        match segment.side() {
            // heading away from the root, may need to push the frontier
            Some(side) if side == direction => {
                let next = self.offset + 1;
                if next < segment.capacity() {
                    if next == segment.touched() {
                        segment.extend_frontier();
                    }
                    self.offset = next;
                    return Ok(());
                }
            }
            // heading back towards the entry edge, everything here is touched
            Some(_) => {
                if self.offset > 0 {
                    self.offset -= 1;
                    return Ok(());
                }
            }
            // the root only has the one cell
            None => {}
        }

        self.cross(direction)
    }

    /// Move onto the neighbouring segment, creating it if needed
    fn cross(&mut self, direction: Direction) -> Result<(), TapeError> {
        let next = self.store.grow(self.segment, direction)?;
        let segment = self.store.get(next);

        self.offset = if segment.side() == Some(direction) {
            // entering from its entry edge
            0
        } else {
            // walking back towards the root, the segment was fully crossed on the way out
            segment.touched() - 1
        };
        self.segment = next;
        Ok(())
    }

    pub fn read(&self) -> u8 {
        self.store.get(self.segment).get(self.offset)
    }

    pub fn write(&mut self, value: u8) {
        self.store.get_mut(self.segment).set(self.offset, value);
    }

    pub fn increment(&mut self) {
        self.write(self.read().wrapping_add(1));
    }

    pub fn decrement(&mut self) {
        self.write(self.read().wrapping_sub(1));
    }

    /// is the value at the data pointer zero?
    pub fn value_is_zero(&self) -> bool {
        self.read() == 0
    }

    pub fn segments(&self) -> usize {
        self.store.count()
    }

    /// Copy out every touched cell from left to right
    pub fn snapshot(&self) -> TapeSnapshot {
        let mut cells = vec![];
        let mut pointer = 0;
        let mut current = Some(self.store.leftmost());

        while let Some(id) = current {
            let segment = self.store.get(id);
            if id == self.segment {
                pointer = cells.len()
                    + match segment.side() {
                        Some(Direction::Left) => segment.touched() - 1 - self.offset,
                        _ => self.offset,
                    };
            }
            cells.extend(segment.cells_left_to_right());
            current = segment.neighbour(Direction::Right);
        }

        TapeSnapshot { cells, pointer }
    }
}
