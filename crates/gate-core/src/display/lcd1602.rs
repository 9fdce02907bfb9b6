//! HD44780 16x2 LCD behind a PCF8574 I2C backpack
//!
//! The backpack maps the expander's eight outputs onto the LCD pins:
//! P0 = RS, P1 = RW, P2 = EN, P3 = backlight, P4-P7 = D4-D7. Every byte is
//! sent as two 4-bit nibbles, each latched by an enable pulse.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error};

use super::{COLUMNS, CharDisplay, DisplayError, ROWS};

/// Usual address of the PCF8574 backpack with all jumpers open.
pub const DEFAULT_ADDRESS: u8 = 0x27;

const REGISTER_SELECT: u8 = 0x01;
const ENABLE: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE_INCREMENT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_SET_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM_ADDRESS: u8 = 0x80;

const ROW_OFFSETS: [u8; ROWS as usize] = [0x00, 0x40];

pub struct Lcd1602<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    backlight: bool,
    col: u8,
}

impl<I: I2c, D: DelayNs> Lcd1602<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            backlight: true,
            col: 0,
        }
    }

    /// Power-on initialization into 4-bit, two-line mode, display on,
    /// cursor off, cleared.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.delay.delay_ms(50);

        // Three 8-bit function sets resynchronise the controller whatever
        // mode it woke up in, then switch to 4-bit.
        for _ in 0..3 {
            self.write_nibble(0x30, false)?;
            self.delay.delay_us(4500);
        }
        self.write_nibble(0x20, false)?;
        self.delay.delay_us(150);

        self.command(CMD_FUNCTION_SET_4BIT_2LINE)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_ENTRY_MODE_INCREMENT)?;
        self.clear()?;

        debug!("LCD at {:#04x} initialized", self.address);
        Ok(())
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.backlight = on;
        self.expander_write(0)
    }

    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, command: u8) -> Result<(), DisplayError> {
        self.write_byte(command, false)
    }

    fn write_byte(&mut self, byte: u8, data: bool) -> Result<(), DisplayError> {
        self.write_nibble(byte & 0xF0, data)?;
        self.write_nibble((byte << 4) & 0xF0, data)
    }

    fn write_nibble(&mut self, nibble: u8, data: bool) -> Result<(), DisplayError> {
        let bits = if data { nibble | REGISTER_SELECT } else { nibble };
        self.expander_write(bits | ENABLE)?;
        self.delay.delay_us(1);
        self.expander_write(bits & !ENABLE)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn expander_write(&mut self, bits: u8) -> Result<(), DisplayError> {
        let backlight = if self.backlight { BACKLIGHT } else { 0 };
        self.i2c
            .write(self.address, &[bits | backlight])
            .map_err(|e| {
                error!("LCD write to {:#04x} failed: {:?}", self.address, e);
                DisplayError::Bus
            })
    }
}

impl<I: I2c, D: DelayNs> CharDisplay for Lcd1602<I, D> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(CMD_CLEAR)?;
        // clear is the one slow instruction
        self.delay.delay_ms(2);
        self.col = 0;
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), DisplayError> {
        if col >= COLUMNS || row >= ROWS {
            return Err(DisplayError::CursorOutOfRange { col, row });
        }
        self.col = col;
        self.command(CMD_SET_DDRAM_ADDRESS | (ROW_OFFSETS[row as usize] + col))
    }

    fn write_str(&mut self, text: &str) -> Result<(), DisplayError> {
        for ch in text.chars() {
            // DDRAM continues past the visible area; keep writes on screen
            if self.col >= COLUMNS {
                break;
            }
            let byte = if ch.is_ascii() { ch as u8 } else { b'?' };
            self.write_byte(byte, true)?;
            self.col += 1;
        }
        Ok(())
    }
}
