use crate::{
    assignment::Assignment,
    dictionary::Pattern,
    error::LayoutError,
    parse::{build_crossings, parse_slots, Crossing, Slot, SlotId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    Block,
    Open,
    Prefilled(char),
}

impl Cell {
    /// Maps the text grid convention: `*`/`#` block, space/`.`/`_` open, anything else a letter.
    pub fn from_char(c: char) -> Cell {
        match c {
            '*' | '#' => Cell::Block,
            ' ' | '.' | '_' => Cell::Open,
            letter => Cell::Prefilled(letter),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Block => '*',
            Cell::Open => ' ',
            Cell::Prefilled(letter) => letter,
        }
    }

    pub fn is_block(self) -> bool {
        self == Cell::Block
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Across,
    Down,
}

/// The letters a puzzle language allows in cells and words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    letters: Vec<char>,
}

impl Alphabet {
    pub fn latin() -> Alphabet {
        Alphabet {
            letters: ('A'..='Z').collect(),
        }
    }

    pub fn new<I: IntoIterator<Item = char>>(letters: I) -> Result<Alphabet, LayoutError> {
        let mut result: Vec<char> = vec![];
        for letter in letters {
            if !letter.is_uppercase() {
                return Err(LayoutError::InvalidAlphabetLetter(letter));
            }
            if !result.contains(&letter) {
                result.push(letter);
            }
        }
        if result.is_empty() {
            return Err(LayoutError::EmptyAlphabet);
        }
        Ok(Alphabet { letters: result })
    }

    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn contains(&self, letter: char) -> bool {
        self.letters.contains(&letter)
    }

    pub fn index_of(&self, letter: char) -> Option<usize> {
        self.letters.iter().position(|c| *c == letter)
    }

    /// Whether every character of `word` belongs to this alphabet.
    pub fn accepts(&self, word: &str) -> bool {
        !word.is_empty() && word.chars().all(|c| self.contains(c))
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Alphabet::latin()
    }
}

/// Raw grid input: rows of cells plus the declared alphabet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub rows: Vec<Vec<Cell>>,
    pub alphabet: Alphabet,
}

impl Layout {
    pub fn new(rows: Vec<Vec<Cell>>, alphabet: Alphabet) -> Layout {
        Layout { rows, alphabet }
    }

    /// One grid row per line. Leading and trailing empty lines are ignored so that
    /// indented raw strings work.
    pub fn parse(text: &str, alphabet: Alphabet) -> Layout {
        let mut lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        while lines.first().map_or(false, |line| line.is_empty()) {
            lines.remove(0);
        }
        while lines.last().map_or(false, |line| line.is_empty()) {
            lines.pop();
        }

        let rows = lines
            .iter()
            .map(|line| line.chars().map(Cell::from_char).collect())
            .collect();
        Layout { rows, alphabet }
    }
}

/// Immutable grid model: cells, slots and the crossings between them.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Crossword {
    pub(crate) cells: Vec<Cell>,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) alphabet: Alphabet,
    pub(crate) slots: Vec<Slot>,
    pub(crate) crossings: Vec<Vec<Crossing>>,
    pub(crate) cell_slots: Vec<[Option<SlotId>; 2]>,
}

impl Crossword {
    pub fn build(layout: Layout) -> Result<Crossword, LayoutError> {
        let height = layout.rows.len();
        let width = layout.rows.first().map_or(0, |row| row.len());
        if height == 0 || width == 0 {
            return Err(LayoutError::Empty);
        }

        let mut cells = Vec::with_capacity(width * height);
        for (row, cells_in_row) in layout.rows.into_iter().enumerate() {
            if cells_in_row.len() != width {
                return Err(LayoutError::Ragged {
                    row,
                    expected: width,
                    found: cells_in_row.len(),
                });
            }
            cells.extend(cells_in_row);
        }

        Crossword::from_cells(cells, width, height, layout.alphabet)
    }

    /// Text grid whose cell count is a perfect square; newlines are ignored.
    pub fn square(contents: &str) -> Result<Crossword, LayoutError> {
        let cells: Vec<Cell> = contents
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .map(Cell::from_char)
            .collect();

        let width = (cells.len() as f64).sqrt() as usize;
        if width * width != cells.len() {
            return Err(LayoutError::NotSquare(cells.len()));
        }
        Crossword::from_cells(cells, width, width, Alphabet::latin())
    }

    /// Text grid of the given dimensions; newlines are ignored.
    pub fn rectangle(contents: &str, width: usize, height: usize) -> Result<Crossword, LayoutError> {
        let cells: Vec<Cell> = contents
            .chars()
            .filter(|c| *c != '\n' && *c != '\r')
            .map(Cell::from_char)
            .collect();

        if cells.len() != width * height {
            return Err(LayoutError::Dimensions {
                width,
                height,
                expected: width * height,
                found: cells.len(),
            });
        }
        Crossword::from_cells(cells, width, height, Alphabet::latin())
    }

    fn from_cells(
        cells: Vec<Cell>,
        width: usize,
        height: usize,
        alphabet: Alphabet,
    ) -> Result<Crossword, LayoutError> {
        if cells.is_empty() {
            return Err(LayoutError::Empty);
        }

        for (index, cell) in cells.iter().enumerate() {
            if let Cell::Prefilled(letter) = cell {
                if !letter.is_uppercase() || !alphabet.contains(*letter) {
                    return Err(LayoutError::InvalidLetter {
                        row: index / width,
                        column: index % width,
                        letter: *letter,
                    });
                }
            }
        }

        let slots = parse_slots(&cells, width, height);
        let (crossings, cell_slots) = build_crossings(&slots, width, height);

        for (index, cell) in cells.iter().enumerate() {
            if *cell == Cell::Open && cell_slots[index] == [None, None] {
                return Err(LayoutError::IsolatedCell {
                    row: index / width,
                    column: index % width,
                });
            }
        }

        Ok(Crossword {
            cells,
            width,
            height,
            alphabet,
            slots,
            crossings,
            cell_slots,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.cells[row * self.width + column]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id]
    }

    pub fn crossings(&self, id: SlotId) -> &[Crossing] {
        &self.crossings[id]
    }

    pub fn slot_at(&self, row: usize, column: usize, direction: Direction) -> Option<SlotId> {
        let index = match direction {
            Direction::Across => 0,
            Direction::Down => 1,
        };
        self.cell_slots[row * self.width + column][index]
    }

    pub fn open_cell_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell == Cell::Open).count()
    }

    /// Current letter of a cell: prefilled letter, else the letter an assigned slot puts there.
    pub fn letter_at(
        &self,
        row: usize,
        column: usize,
        assignment: Option<&Assignment>,
    ) -> Option<char> {
        match self.cell(row, column) {
            Cell::Block => None,
            Cell::Prefilled(letter) => Some(letter),
            Cell::Open => {
                let assignment = assignment?;
                self.cell_slots[row * self.width + column]
                    .iter()
                    .flatten()
                    .find_map(|id| {
                        let slot = &self.slots[*id];
                        let word = assignment.get(*id)?;
                        word.chars().nth(slot.index_of(row, column)?)
                    })
            }
        }
    }

    /// Known letters of a slot under an optional assignment overlay.
    pub fn pattern(&self, id: SlotId, assignment: Option<&Assignment>) -> Pattern {
        Pattern::new(
            self.slots[id]
                .cells()
                .map(|(row, column)| self.letter_at(row, column, assignment))
                .collect(),
        )
    }

    /// Prefilled-only pattern of a slot.
    pub fn initial_pattern(&self, id: SlotId) -> Pattern {
        self.pattern(id, None)
    }

    /// Whether every cell of the slot is prefilled.
    pub fn is_prefilled(&self, id: SlotId) -> bool {
        self.slots[id]
            .cells()
            .all(|(row, column)| matches!(self.cell(row, column), Cell::Prefilled(_)))
    }

    /// Compact text rendering, one line per row, readable by [`Layout::parse`].
    pub fn render(&self, assignment: Option<&Assignment>) -> String {
        let mut result = String::with_capacity((self.width + 1) * self.height);
        for row in 0..self.height {
            for column in 0..self.width {
                let c = match self.cell(row, column) {
                    Cell::Block => '*',
                    _ => self.letter_at(row, column, assignment).unwrap_or(' '),
                };
                result.push(c);
            }
            if row != self.height - 1 {
                result.push('\n');
            }
        }
        result
    }
}

impl fmt::Display for Crossword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height {
            for col in 0..self.width {
                write!(f, "{}", self.cell(row, col).to_char())?;
                if col != self.width - 1 {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;

            if row != self.height - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
