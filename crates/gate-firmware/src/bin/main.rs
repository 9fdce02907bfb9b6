#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_time::{Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use mfrc522::comm::blocking::spi::SpiInterface;

use gate_core::app::{Actuators, GateApp, GatePeripherals};
use gate_core::config::GateConfig;
use gate_core::display::{DEFAULT_ADDRESS, Lcd1602};
use gate_core::gate::Servo;
use gate_core::sensors::{HcSr04, OccupancyBank};
use gate_firmware::badge_secrets::AUTHORIZED_BADGE;
use gate_firmware::hardware;
use gate_firmware::reader::Mfrc522Reader;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let gate_config = GateConfig::DEFAULT.with_authorized_badge(AUTHORIZED_BADGE);

    // Ranging
    let trigger = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());
    let echo = Input::new(
        peripherals.GPIO5,
        InputConfig::default().with_pull(Pull::Down),
    );
    let range = HcSr04::new(trigger, echo, Delay::new());

    // Badge reader; RST is held high for the lifetime of the program
    let _reader_reset = Output::new(peripherals.GPIO14, Level::High, OutputConfig::default());
    let reader_spi = hardware::create_reader_spi(
        peripherals.SPI2,
        peripherals.GPIO12,
        peripherals.GPIO11,
        peripherals.GPIO13,
        peripherals.GPIO10,
    )
    .expect("Failed to configure reader SPI bus");
    let reader = Mfrc522Reader::new(SpiInterface::new(reader_spi));

    // Slot sensors
    let slot_config = InputConfig::default().with_pull(Pull::Down);
    let slots = OccupancyBank::new([
        Input::new(peripherals.GPIO15, slot_config),
        Input::new(peripherals.GPIO16, slot_config),
        Input::new(peripherals.GPIO17, slot_config),
        Input::new(peripherals.GPIO18, slot_config),
    ]);

    // Display
    let i2c = hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9)
        .expect("Failed to configure LCD I2C bus");
    let mut display = Lcd1602::new(i2c, Delay::new(), DEFAULT_ADDRESS);
    match display.init() {
        Ok(()) => info!("Display initialized!"),
        Err(e) => error!("Display init failed: {}", e),
    }

    // Gate servo and presence LED
    let servo_pwm = hardware::create_servo_channel(peripherals.LEDC, peripherals.GPIO7)
        .expect("Failed to configure servo PWM");
    let indicator = Output::new(peripherals.GPIO6, Level::Low, OutputConfig::default());

    let mut app = GateApp::start(
        gate_config,
        Instant::now(),
        GatePeripherals {
            range,
            reader,
            slots,
        },
        Actuators {
            gate: Servo::new(servo_pwm),
            indicator,
            display,
        },
    )
    .expect("Invalid gate configuration");

    loop {
        app.run_once(Instant::now());
        Timer::after(app.loop_period()).await;
    }
}
