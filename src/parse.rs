use crate::crossword::{Cell, Direction};

pub type SlotId = usize;

/// Minimal number of cells of a word position.
pub const MIN_SLOT_LENGTH: usize = 2;

#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Slot {
    pub(crate) id: SlotId,
    pub(crate) start_row: usize,
    pub(crate) start_col: usize,
    pub(crate) length: usize,
    pub(crate) direction: Direction,
}

impl Slot {
    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn start(&self) -> (usize, usize) {
        (self.start_row, self.start_col)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Coordinates `(row, column)` of the cell at `index` within the slot.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        match self.direction {
            Direction::Across => (self.start_row, self.start_col + index),
            Direction::Down => (self.start_row + index, self.start_col),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.length).map(move |index| self.cell(index))
    }

    /// Position of `(row, column)` within the slot, if the slot covers that cell.
    pub fn index_of(&self, row: usize, column: usize) -> Option<usize> {
        match self.direction {
            Direction::Across => {
                if row == self.start_row
                    && column >= self.start_col
                    && column < self.start_col + self.length
                {
                    Some(column - self.start_col)
                } else {
                    None
                }
            }
            Direction::Down => {
                if column == self.start_col
                    && row >= self.start_row
                    && row < self.start_row + self.length
                {
                    Some(row - self.start_row)
                } else {
                    None
                }
            }
        }
    }
}

/// Shared cell between a slot and a slot of the other direction.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Crossing {
    /// Index of the shared cell within the slot owning this crossing.
    pub index: usize,
    pub other: SlotId,
    /// Index of the shared cell within `other`.
    pub other_index: usize,
}

pub(crate) fn parse_slots(cells: &[Cell], width: usize, height: usize) -> Vec<Slot> {
    let mut result = vec![];

    let mut push = |result: &mut Vec<Slot>, start: Option<(usize, usize)>, length, direction| {
        if let Some((start_row, start_col)) = start {
            if length >= MIN_SLOT_LENGTH {
                result.push(Slot {
                    id: result.len(),
                    start_row,
                    start_col,
                    length,
                    direction,
                });
            }
        }
    };

    for row in 0..height {
        let mut start = None;
        let mut length = 0;
        for col in 0..width {
            if !cells[row * width + col].is_block() {
                // found a letter cell; is it our first?
                if start.is_none() {
                    start = Some((row, col));
                }
                length += 1;
            } else {
                push(&mut result, start, length, Direction::Across);
                length = 0;
                start = None;
            }
        }
        // have to process end of row
        push(&mut result, start, length, Direction::Across);
    }

    for col in 0..width {
        let mut start = None;
        let mut length = 0;
        for row in 0..height {
            if !cells[row * width + col].is_block() {
                if start.is_none() {
                    start = Some((row, col));
                }
                length += 1;
            } else {
                push(&mut result, start, length, Direction::Down);
                length = 0;
                start = None;
            }
        }
        push(&mut result, start, length, Direction::Down);
    }

    result
}

/// Per-slot crossings, plus the `[across, down]` slots owning each cell.
pub(crate) fn build_crossings(
    slots: &[Slot],
    width: usize,
    height: usize,
) -> (Vec<Vec<Crossing>>, Vec<[Option<SlotId>; 2]>) {
    let mut lookup = vec![[None, None]; width * height];

    for slot in slots {
        let direction_index = match slot.direction {
            Direction::Across => 0,
            Direction::Down => 1,
        };
        for (row, col) in slot.cells() {
            lookup[row * width + col][direction_index] = Some(slot.id);
        }
    }

    let crossings = slots
        .iter()
        .map(|slot| {
            let orthogonal_index = match slot.direction {
                Direction::Across => 1,
                Direction::Down => 0,
            };
            slot.cells()
                .enumerate()
                .filter_map(|(index, (row, col))| {
                    let other = lookup[row * width + col][orthogonal_index]?;
                    let other_index = slots[other].index_of(row, col)?;
                    Some(Crossing {
                        index,
                        other,
                        other_index,
                    })
                })
                .collect()
        })
        .collect();

    (crossings, lookup)
}

#[cfg(test)]
mod tests {
    use super::{Crossing, Slot};
    use crate::{Crossword, Direction};

    #[test]
    fn parse_slots_works() {
        let c = Crossword::square(
            "
ABC
DEF
GHI
",
        )
        .unwrap();
        let result = c.slots();

        assert_eq!(result.len(), 6);
        assert_eq!(
            result[0],
            Slot {
                id: 0,
                start_col: 0,
                start_row: 0,
                length: 3,
                direction: Direction::Across
            }
        );
        assert_eq!(
            result[1],
            Slot {
                id: 1,
                start_col: 0,
                start_row: 1,
                length: 3,
                direction: Direction::Across
            }
        );
        assert_eq!(
            result[3],
            Slot {
                id: 3,
                start_col: 0,
                start_row: 0,
                length: 3,
                direction: Direction::Down,
            }
        )
    }

    #[test]
    fn single_cells_are_not_slots() {
        let c = Crossword::square("A*C\n * \nD*F").unwrap();

        assert_eq!(2, c.slots().len());
        assert!(c
            .slots()
            .iter()
            .all(|slot| slot.direction() == Direction::Down && slot.length() == 3));
        assert!(c.crossings(0).is_empty());
    }

    #[test]
    fn parse_slots_big_grid() {
        let rows = [
            "    *    *     ",
            "    *    *     ",
            "         *     ",
            "   *   *   *   ",
            "**    *        ",
            "      *     ***",
            "     *    *    ",
            "   *       *   ",
            "    *    *     ",
            "***     *      ",
            "        *    **",
            "   *   *   *   ",
            "     *         ",
            "     *    *    ",
            "     *    *    ",
        ];
        let c = Crossword::square(&rows.join("\n")).unwrap();

        let result = c.slots();

        assert_eq!(result.len(), 80);
        assert_eq!(result[0].start(), (0, 0));
        assert_eq!(result[0].length(), 4);
        assert_eq!(result[1].start(), (0, 5));
        assert_eq!(result[1].length(), 4);
        assert_eq!(result[41].start(), (0, 0));
        assert_eq!(result[41].direction(), Direction::Down);
    }

    #[test]
    fn crossings_are_symmetric() {
        let c = Crossword::square(&["  * ", "    ", " *  ", "    "].join("\n")).unwrap();

        for slot in c.slots() {
            for crossing in c.crossings(slot.id()) {
                assert_ne!(slot.direction(), c.slot(crossing.other).direction());
                assert_eq!(
                    slot.cell(crossing.index),
                    c.slot(crossing.other).cell(crossing.other_index)
                );
                assert!(c.crossings(crossing.other).contains(&Crossing {
                    index: crossing.other_index,
                    other: slot.id(),
                    other_index: crossing.index,
                }));
            }
        }
    }

    #[test]
    fn index_of_works() {
        let slot = Slot {
            id: 0,
            start_row: 2,
            start_col: 1,
            length: 3,
            direction: Direction::Down,
        };
        assert_eq!(Some(0), slot.index_of(2, 1));
        assert_eq!(Some(2), slot.index_of(4, 1));
        assert_eq!(None, slot.index_of(5, 1));
        assert_eq!(None, slot.index_of(3, 2));
        assert_eq!(vec![(2, 1), (3, 1), (4, 1)], slot.cells().collect::<Vec<_>>());
    }
}
