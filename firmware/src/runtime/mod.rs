use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Pull};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::mode::Blocking;
use embassy_stm32::time::Hertz;
use embassy_sync::channel::Channel;

use clock_core::config::ClockConfig;
use clock_core::cycle::WeatherClock;
use clock_core::display::BufferedDisplay;

use crate::commands::CommandQueue;
use crate::panel::Ssd1306Panel;

mod button_task;
mod clock_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// OLED bus speed.
const PANEL_I2C_HZ: u32 = 400_000;

pub(super) type BoardPanel = Ssd1306Panel<I2c<'static, Blocking>>;
pub(super) type BoardClock = WeatherClock<BufferedDisplay<BoardPanel>>;

pub(super) static COMMAND_QUEUE: CommandQueue = Channel::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        I2C1, PB8, PB9, PA0, ..
    } = hal::init(config);

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = Hertz(PANEL_I2C_HZ);
    let mut panel = Ssd1306Panel::new(I2c::new_blocking(I2C1, PB8, PB9, i2c_config));
    if let Err(error) = panel.init() {
        defmt::warn!("panel: init failed: {}", defmt::Debug2Format(&error));
    }

    let clock: BoardClock =
        match WeatherClock::new(ClockConfig::default(), BufferedDisplay::new(panel)) {
            Ok(clock) => clock,
            Err(error) => {
                defmt::error!("config rejected: {}", defmt::Display2Format(&error));
                core::future::pending::<()>().await;
                return;
            }
        };

    if let Err(error) = spawner.spawn(clock_task::run(clock)) {
        defmt::error!("failed to spawn clock task: {}", defmt::Debug2Format(&error));
    }
    if let Err(error) = spawner.spawn(button_task::run(Input::new(PA0, Pull::Up))) {
        defmt::error!("failed to spawn button task: {}", defmt::Debug2Format(&error));
    }

    core::future::pending::<()>().await;
}
