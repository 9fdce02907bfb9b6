//! Hardware initialization for the gate controller board
//!
//! Pin map (ESP32-S3 DevKitC, avoiding strapping and flash pins):
//!
//! | Signal              | GPIO |
//! |---------------------|------|
//! | HC-SR04 trigger     | 4    |
//! | HC-SR04 echo        | 5    |
//! | Presence LED        | 6    |
//! | Gate servo (LEDC)   | 7    |
//! | LCD SDA / SCL       | 8 / 9 |
//! | RC522 CS            | 10   |
//! | RC522 MOSI / SCK    | 11 / 12 |
//! | RC522 MISO          | 13   |
//! | RC522 RST           | 14   |
//! | Slot sensors 1-4    | 15, 16, 17, 18 |

use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use esp_hal::Blocking;
use esp_hal::gpio::{DriveMode, Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use log::info;
use static_cell::StaticCell;
use thiserror_no_std::Error;

/// Hobby servos expect one pulse every 20 ms.
const SERVO_FREQUENCY_HZ: u32 = 50;

/// The RC522 tolerates up to 10 MHz; long jumper wires do not.
const READER_SPI_KHZ: u32 = 1_000;

/// The PCF8574 backpack is a 100 kHz part.
const LCD_I2C_KHZ: u32 = 100;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    #[error("{bus} bus configuration rejected")]
    BusConfig { bus: &'static str },
    #[error("servo PWM {stage} setup failed")]
    ServoPwm { stage: &'static str },
}

pub type ReaderSpi = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;

/// Initialize the I2C bus for the LCD backpack
pub fn create_i2c_bus(
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: esp_hal::peripherals::GPIO8<'static>,
    scl: esp_hal::peripherals::GPIO9<'static>,
) -> Result<I2c<'static, Blocking>, HardwareError> {
    let i2c = I2c::new(
        i2c0,
        I2cConfig::default().with_frequency(Rate::from_khz(LCD_I2C_KHZ)),
    )
    .map_err(|_| HardwareError::BusConfig { bus: "I2C0" })?
    .with_sda(sda)
    .with_scl(scl);

    info!("LCD I2C bus ready at {} kHz", LCD_I2C_KHZ);
    Ok(i2c)
}

/// Initialize the SPI bus and chip select for the RFID reader
///
/// The RC522 sits alone on SPI2, so the bus is wrapped as an exclusive
/// device with a manually driven CS line.
pub fn create_reader_spi(
    spi2: esp_hal::peripherals::SPI2<'static>,
    sck: esp_hal::peripherals::GPIO12<'static>,
    mosi: esp_hal::peripherals::GPIO11<'static>,
    miso: esp_hal::peripherals::GPIO13<'static>,
    cs: esp_hal::peripherals::GPIO10<'static>,
) -> Result<ReaderSpi, HardwareError> {
    let spi_bus = Spi::new(
        spi2,
        SpiConfig::default()
            .with_frequency(Rate::from_khz(READER_SPI_KHZ))
            .with_mode(Mode::_0),
    )
    .map_err(|_| HardwareError::BusConfig { bus: "SPI2" })?
    .with_sck(sck)
    .with_mosi(mosi)
    .with_miso(miso);

    let cs = Output::new(cs, Level::High, OutputConfig::default());

    ExclusiveDevice::new_no_delay(spi_bus, cs).map_err(|_| HardwareError::BusConfig { bus: "SPI2" })
}

/// Configure a 50 Hz LEDC channel for the gate servo
///
/// The channel starts at 0 % duty; the servo holds still until the first
/// angle is written.
pub fn create_servo_channel(
    ledc: esp_hal::peripherals::LEDC<'static>,
    pin: esp_hal::peripherals::GPIO7<'static>,
) -> Result<channel::Channel<'static, LowSpeed>, HardwareError> {
    // The channel keeps a reference to its timer for as long as it lives
    static SERVO_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

    let mut ledc = Ledc::new(ledc);
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let mut servo_timer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
    servo_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty14Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(SERVO_FREQUENCY_HZ),
        })
        .map_err(|_| HardwareError::ServoPwm { stage: "timer" })?;
    let servo_timer = SERVO_TIMER.init(servo_timer);

    let mut servo_channel = ledc.channel(channel::Number::Channel0, pin);
    servo_channel
        .configure(channel::config::Config {
            timer: servo_timer,
            duty_pct: 0,
            drive_mode: DriveMode::PushPull,
        })
        .map_err(|_| HardwareError::ServoPwm { stage: "channel" })?;

    info!("Servo PWM ready at {} Hz", SERVO_FREQUENCY_HZ);
    Ok(servo_channel)
}
