//! Character display model
//!
//! The gate shows one of a handful of fixed [`Screen`]s on a 16x2 character
//! display. Screens know how to draw themselves onto anything implementing
//! [`CharDisplay`]: the HD44780 driver on hardware, or a [`TextGrid`] in the
//! simulator and tests.

mod grid;
mod lcd1602;

use core::fmt::Write;

use thiserror_no_std::Error;

use crate::sensors::SlotOccupancy;

pub use grid::TextGrid;
pub use lcd1602::{DEFAULT_ADDRESS, Lcd1602};

pub const COLUMNS: u8 = 16;
pub const ROWS: u8 = 2;

/// Width of one slot cell on the status screen.
const SLOT_CELL_WIDTH: u8 = 8;

const PROMPT_TOP: &str = "  Welcome!!! ";
const PROMPT_BOTTOM: &str = " Tap Your Card  ";
const ACCEPTED: &str = " Thank You!!! ";
const REJECTED: &str = "Invalid Card";
const SLOT_TAKEN: &str = "NO.P";
const SLOT_FREE: &str = "P.AV";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display bus write failed")]
    Bus,
    #[error("cursor ({col}, {row}) is outside the 16x2 grid")]
    CursorOutOfRange { col: u8, row: u8 },
}

/// Minimal text interface of a character LCD.
pub trait CharDisplay {
    fn clear(&mut self) -> Result<(), DisplayError>;
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DisplayError>;
    /// Writes at the cursor; text past the last column is dropped.
    fn write_str(&mut self, text: &str) -> Result<(), DisplayError>;
}

/// Everything the gate can put on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// A vehicle is close enough to badge.
    Prompt,
    /// The badge matched.
    Accepted,
    /// The badge did not match.
    Rejected,
    /// Parking slot status.
    Slots(SlotOccupancy),
}

impl Screen {
    pub fn render<D: CharDisplay>(&self, display: &mut D) -> Result<(), DisplayError> {
        display.clear()?;
        match self {
            Self::Prompt => {
                display.set_cursor(0, 0)?;
                display.write_str(PROMPT_TOP)?;
                display.set_cursor(0, 1)?;
                display.write_str(PROMPT_BOTTOM)
            }
            Self::Accepted => {
                display.set_cursor(0, 0)?;
                display.write_str(ACCEPTED)
            }
            Self::Rejected => {
                display.set_cursor(0, 1)?;
                display.write_str(REJECTED)
            }
            Self::Slots(occupancy) => {
                for (index, occupied) in occupancy.iter().enumerate() {
                    let col = (index as u8 % 2) * SLOT_CELL_WIDTH;
                    let row = index as u8 / 2;
                    display.set_cursor(col, row)?;
                    display.write_str(&slot_cell(index + 1, occupied))?;
                }
                Ok(())
            }
        }
    }
}

/// `S1:NO.P` for a taken slot, `S1:P.AV` for a free one.
fn slot_cell(number: usize, occupied: bool) -> heapless::String<{ SLOT_CELL_WIDTH as usize }> {
    let mut cell = heapless::String::new();
    let state = if occupied { SLOT_TAKEN } else { SLOT_FREE };
    let _ = write!(cell, "S{number}:{state}");
    cell
}
