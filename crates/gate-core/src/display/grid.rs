use super::{COLUMNS, CharDisplay, DisplayError, ROWS};

/// In-memory 16x2 character grid.
///
/// Behaves like the visible area of the LCD: writes advance the cursor along
/// the row and anything past column 16 is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextGrid {
    cells: [[u8; COLUMNS as usize]; ROWS as usize],
    col: u8,
    row: u8,
}

impl Default for TextGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TextGrid {
    pub const fn new() -> Self {
        Self {
            cells: [[b' '; COLUMNS as usize]; ROWS as usize],
            col: 0,
            row: 0,
        }
    }

    /// One full row, padded with spaces. Out-of-range rows read as empty.
    pub fn row(&self, row: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|cells| core::str::from_utf8(cells).ok())
            .unwrap_or("")
    }
}

impl CharDisplay for TextGrid {
    fn clear(&mut self) -> Result<(), DisplayError> {
        *self = Self::new();
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DisplayError> {
        if col >= COLUMNS || row >= ROWS {
            return Err(DisplayError::CursorOutOfRange { col, row });
        }
        self.col = col;
        self.row = row;
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> Result<(), DisplayError> {
        let row = &mut self.cells[self.row as usize];
        for ch in text.chars() {
            if self.col >= COLUMNS {
                break;
            }
            row[self.col as usize] = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.col += 1;
        }
        Ok(())
    }
}
