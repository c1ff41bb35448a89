//! Networking
//!
//! WiFi bring-up plus ESP-IDF implementations of the core HTTP and
//! firmware traits, and the update intake server.

pub mod http_client;
pub mod ota_flash;
pub mod ota_server;
pub mod wifi;

pub use http_client::EspHttp;
pub use ota_flash::{mark_running_slot_valid, EspFlash};
pub use ota_server::create_ota_server;
pub use wifi::connect_wifi;
