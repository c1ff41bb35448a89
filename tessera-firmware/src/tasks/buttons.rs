//! Button polling thread
//!
//! Buttons pull their line low when pressed. Each press edge goes through
//! the shared mapper's debounce and becomes a render command.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use log::{debug, info};

use tessera_core::input::{ButtonEvent, ButtonMapper, POLL_INTERVAL};
use tessera_core::slots::SlotStore;

use super::submit;
use crate::channels::DeviceMutex;

/// One front-panel button
pub struct Button {
    pin: PinDriver<'static, AnyIOPin, Input>,
    event: ButtonEvent,
    held: bool,
}

impl Button {
    pub fn new(pin: AnyIOPin, event: ButtonEvent) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self {
            pin,
            event,
            held: false,
        })
    }

    /// True on the poll where the button goes down
    fn pressed(&mut self) -> bool {
        let down = self.pin.is_low();
        let edge = down && !self.held;
        self.held = down;
        edge
    }
}

/// Button loop, never returns
pub fn button_task(
    mut buttons: Vec<Button>,
    mapper: Arc<Mutex<ButtonMapper>>,
    slots: &'static SlotStore<DeviceMutex>,
) -> ! {
    info!("Button task started ({} buttons)", buttons.len());

    let interval = Duration::from_millis(POLL_INTERVAL.as_millis());
    loop {
        for button in buttons.iter_mut() {
            if !button.pressed() {
                continue;
            }
            let cmd = {
                let mut mapper = mapper.lock().unwrap_or_else(PoisonError::into_inner);
                if !mapper.accept(embassy_time::Instant::now()) {
                    continue;
                }
                mapper.map(button.event, slots)
            };
            debug!("Button {:?} -> {}", button.event, cmd.name());
            submit(cmd);
        }
        thread::sleep(interval);
    }
}
