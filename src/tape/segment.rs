use super::{Direction, TapeError};

/// Index of a segment inside its `SegmentStore`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentId(usize);

/// One fixed-capacity block of cells.
///
/// Cells are stored in outward order: index 0 is the edge the segment was
/// entered from when it was created, and the vec only ever grows by pushing
/// zeroes as the cursor walks further out. So `cells.len()` is the frontier
/// of touched cells and never exceeds `capacity`.
#[derive(Debug)]
pub struct Segment {
    cells: Vec<u8>,
    capacity: usize,
    /// Which side of the root this segment hangs off, `None` for the root
    side: Option<Direction>,
    left: Option<SegmentId>,
    right: Option<SegmentId>,
}

impl Segment {
    /// Reserves room for every cell up front but only initialises the entry cell
    pub fn allocate(capacity: usize, side: Option<Direction>) -> Result<Segment, TapeError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(capacity)
            .map_err(|_| TapeError::OutOfMemory { capacity })?;
        cells.push(0);

        Ok(Segment {
            cells,
            capacity,
            side,
            left: None,
            right: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn side(&self) -> Option<Direction> {
        self.side
    }

    /// Number of cells initialised so far, counted from the entry edge
    pub fn touched(&self) -> usize {
        self.cells.len()
    }

    pub fn neighbour(&self, direction: Direction) -> Option<SegmentId> {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    fn link(&mut self, direction: Direction, id: SegmentId) {
        match direction {
            Direction::Left => self.left = Some(id),
            Direction::Right => self.right = Some(id),
        }
    }

    pub fn get(&self, offset: usize) -> u8 {
        self.cells[offset]
    }

    pub fn set(&mut self, offset: usize, value: u8) {
        self.cells[offset] = value;
    }

    /// Zero the next cell past the frontier, the capacity was reserved when allocating
    pub(super) fn extend_frontier(&mut self) {
        debug_assert!(self.cells.len() < self.capacity);
        self.cells.push(0);
    }

    /// The touched cells in left-to-right order
    pub fn cells_left_to_right(&self) -> impl Iterator<Item = u8> + '_ {
        let reversed = self.side == Some(Direction::Left);
        let len = self.cells.len();
        (0..len).map(move |i| {
            if reversed {
                self.cells[len - 1 - i]
            } else {
                self.cells[i]
            }
        })
    }
}

/// Arena holding every segment of the tape, linked left and right by index.
///
/// Segments are never freed while the store is alive.
#[derive(Debug)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub const ROOT: SegmentId = SegmentId(0);

    pub fn new() -> Result<SegmentStore, TapeError> {
        Ok(SegmentStore {
            segments: vec![Segment::allocate(1, None)?],
        })
    }

    /// Number of segments allocated so far, the root included
    pub fn count(&self) -> usize {
        self.segments.len()
    }

    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    pub fn get_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.0]
    }

    /// The neighbour of `from` in `direction`, allocated with twice the
    /// capacity of `from` if it doesn't exist yet
    pub fn grow(&mut self, from: SegmentId, direction: Direction) -> Result<SegmentId, TapeError> {
        if let Some(existing) = self.get(from).neighbour(direction) {
            return Ok(existing);
        }

        let spawner = self.get(from).capacity();
        let capacity = spawner
            .checked_mul(2)
            .ok_or(TapeError::OutOfMemory { capacity: spawner })?;
        self.segments
            .try_reserve(1)
            .map_err(|_| TapeError::OutOfMemory { capacity })?;

        let mut segment = Segment::allocate(capacity, Some(direction))?;
        segment.link(direction.opposite(), from);

        let id = SegmentId(self.segments.len());
        self.segments.push(segment);
        self.get_mut(from).link(direction, id);

        tracing::debug!(?direction, capacity, segments = self.segments.len(), "allocated tape segment");
        Ok(id)
    }

    /// Leftmost segment of the chain
    pub fn leftmost(&self) -> SegmentId {
        let mut id = Self::ROOT;
        while let Some(next) = self.get(id).neighbour(Direction::Left) {
            id = next;
        }
        id
    }
}
