//! Tessera firmware
//!
//! Boot order:
//! 1. Logging and configuration
//! 2. WiFi, then confirm the running image to the bootloader
//! 3. Slot store seeded with the boot image
//! 4. Render, update and button threads
//! 5. Update intake server
//! 6. Content refresh loop on the main thread

mod assets;
mod channels;
mod config;
mod display;
mod net;
mod tasks;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::IOPin;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::info;
use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

use tessera_core::input::{ButtonEvent, ButtonMapper};
use tessera_core::ota::OtaCoordinator;
use tessera_core::render::RenderCommand;
use tessera_core::slots::{SlotStore, BOOT_SLOT};

use channels::{OTA, SLOTS};
use display::MatrixBus;
use net::{EspFlash, EspHttp};
use tasks::{Button, RefreshContext};

const RENDER_STACK: usize = 16 * 1024;
const OTA_STACK: usize = 12 * 1024;
const BUTTON_STACK: usize = 4 * 1024;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("Tessera v{} starting", env!("CARGO_PKG_VERSION"));

    let config = config::load_config();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let pins = peripherals.pins;
    let _wifi = net::connect_wifi(peripherals.modem, sys_loop, nvs).context("WiFi bring-up failed")?;
    net::mark_running_slot_valid();

    let slots: &'static SlotStore<_> = SLOTS.init(SlotStore::new(assets::BOOT_IMAGE));
    let ota: &'static OtaCoordinator<_> = OTA.init(OtaCoordinator::new(config.ota.max_image_size as usize));

    // LED chain on GPIO27 via RMT channel 0
    let leds = Ws2812Esp32Rmt::new(peripherals.rmt.channel0, pins.gpio27)
        .map_err(|e| anyhow!("LED driver init failed: {:?}", e))?;
    let bus = MatrixBus::new(
        leds,
        config.display.width,
        config.display.height,
        config.display.serpentine,
        config.display.brightness,
    );
    thread::Builder::new()
        .name("render".into())
        .stack_size(RENDER_STACK)
        .spawn(move || tasks::render_task(slots, bus))?;

    let timeout = Duration::from_secs(config.remote.timeout_secs as u64);
    let ota_client = EspHttp::new(timeout)?;
    let flash = EspFlash::new()?;
    thread::Builder::new()
        .name("ota".into())
        .stack_size(OTA_STACK)
        .spawn(move || tasks::ota_task(ota, ota_client, flash))?;

    let mapper = Arc::new(Mutex::new(ButtonMapper::new(config.display.brightness)));
    let buttons = vec![
        Button::new(pins.gpio32.downgrade(), ButtonEvent::NightToggle)?,
        Button::new(pins.gpio33.downgrade(), ButtonEvent::BrightnessUp)?,
        Button::new(pins.gpio25.downgrade(), ButtonEvent::BrightnessDown)?,
        Button::new(pins.gpio26.downgrade(), ButtonEvent::PaletteCycle)?,
    ];
    let button_mapper = mapper.clone();
    thread::Builder::new()
        .name("buttons".into())
        .stack_size(BUTTON_STACK)
        .spawn(move || tasks::button_task(buttons, button_mapper, slots))?;

    let _server = net::create_ota_server(ota, config.ota.http_port)?;

    tasks::submit(RenderCommand::SetBrightness(config.display.brightness));
    tasks::submit(RenderCommand::DrawSlot(BOOT_SLOT));

    let ctx = RefreshContext {
        slots,
        ota,
        mapper,
        client: EspHttp::new(timeout)?,
    };
    tasks::refresh_task(ctx, &config)
}
