//! Build script for tessera-firmware
//!
//! - Propagates the ESP-IDF build environment
//! - Validates device.toml at compile time
//! - Renders the boot and OTA progress images as WebP into OUT_DIR

use std::env;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image_webp::{ColorType, WebPEncoder};

/// Progress stages with a pre-rendered image
const PROGRESS_STAGES: [u8; 5] = [0, 25, 50, 75, 100];

fn main() {
    embuild::espidf::sysenv::output();

    let config = validate_config();
    let (width, height) = display_size(&config);
    generate_assets(width, height);
}

/// Validate device.toml configuration at compile time
fn validate_config() -> toml::Value {
    // Re-run if device.toml changes
    println!("cargo:rerun-if-changed=device.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a device.toml configuration file.         ║\n\
            ║  Please create one in the tessera-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in device.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_remote(&config, &mut errors);
    validate_display(&config, &mut errors);
    validate_render(&config, &mut errors);
    validate_ota(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in device.toml                     ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = match line.char_indices().nth(61) {
                Some((cut, _)) if line.chars().count() > 64 => format!("{}...", &line[..cut]),
                _ => line.to_string(),
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn integer(section: &toml::Value, key: &str) -> Option<i64> {
    section.get(key).and_then(|v| v.as_integer())
}

fn check_range(
    section: &toml::Value,
    name: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    match section.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if range.contains(v) => {}
        Some(toml::Value::Integer(_)) => errors.push(format!(
            "[{}] {} must be {}-{}",
            name,
            key,
            range.start(),
            range.end()
        )),
        Some(_) => errors.push(format!("[{}] {} must be an integer", name, key)),
    }
}

fn validate_remote(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(remote) = config.get("remote") else {
        return;
    };

    if let Some(url) = remote.get("url") {
        match url.as_str() {
            Some(u) if u.starts_with("http://") || u.starts_with("https://") => {
                if u.len() > 256 {
                    errors.push("[remote] url longer than 256 bytes".to_string());
                }
            }
            _ => errors.push("[remote] url must start with http:// or https://".to_string()),
        }
    }

    check_range(remote, "remote", "timeout_secs", 1..=600, errors);
    check_range(remote, "remote", "initial_buffer", 1..=4 * 1024 * 1024, errors);
    check_range(remote, "remote", "max_image_size", 1..=4 * 1024 * 1024, errors);
    check_range(remote, "remote", "min_refresh_secs", 1..=86_400, errors);
    check_range(remote, "remote", "max_backoff_secs", 1..=86_400, errors);

    if let (Some(initial), Some(max)) = (
        integer(remote, "initial_buffer"),
        integer(remote, "max_image_size"),
    ) {
        if initial > max {
            errors.push("[remote] initial_buffer exceeds max_image_size".to_string());
        }
    }
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(display) = config.get("display") else {
        return;
    };

    check_range(display, "display", "width", 1..=256, errors);
    check_range(display, "display", "height", 1..=256, errors);
    check_range(display, "display", "brightness", 0..=100, errors);

    if let Some(v) = display.get("serpentine") {
        if v.as_bool().is_none() {
            errors.push("[display] serpentine must be true or false".to_string());
        }
    }
}

fn validate_render(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(render) = config.get("render") else {
        return;
    };

    check_range(render, "render", "dwell_secs", 0..=86_400, errors);

    const PALETTES: [&str; 12] = [
        "normal",
        "night",
        "dimmed",
        "cool",
        "warm",
        "pastel",
        "moonlight",
        "dusk",
        "vintage",
        "monochrome",
        "sunrise",
        "cyber",
    ];
    if let Some(palette) = render.get("palette") {
        if !palette.as_str().is_some_and(|p| PALETTES.contains(&p)) {
            errors.push(format!("[render] palette must be one of {}", PALETTES.join(", ")));
        }
    }
}

fn validate_ota(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(ota) = config.get("ota") else {
        return;
    };

    check_range(ota, "ota", "max_image_size", 1..=16 * 1024 * 1024, errors);
    check_range(ota, "ota", "poll_interval_ms", 10..=10_000, errors);
    check_range(ota, "ota", "http_port", 1..=65_535, errors);
}

fn display_size(config: &toml::Value) -> (u32, u32) {
    let display = config.get("display");
    let width = display.and_then(|d| integer(d, "width")).unwrap_or(64);
    let height = display.and_then(|d| integer(d, "height")).unwrap_or(32);
    (width as u32, height as u32)
}

/// Render built-in images into OUT_DIR
fn generate_assets(width: u32, height: u32) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    write_webp(&out_dir.join("boot.webp"), &boot_image(width, height), width, height);
    for percent in PROGRESS_STAGES {
        let path = out_dir.join(format!("progress_{}.webp", percent));
        write_webp(&path, &progress_image(width, height, percent), width, height);
    }
}

fn write_webp(path: &Path, rgba: &[u8], width: u32, height: u32) {
    let file = BufWriter::new(File::create(path).unwrap());
    WebPEncoder::new(file)
        .encode(rgba, width, height, ColorType::Rgba8)
        .unwrap();
}

/// Mosaic of 8x8 tiles in a slow hue sweep
fn boot_image(width: u32, height: u32) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let (tx, ty) = (x / 8, y / 8);
            let edge = x % 8 == 7 || y % 8 == 7;
            let px = if edge {
                [0, 0, 0, 255]
            } else {
                let t = ((tx * 37 + ty * 91) % 256) as u8;
                [t, 255 - t, ((tx + ty) * 40 % 256) as u8, 255]
            };
            rgba.extend_from_slice(&px);
        }
    }
    rgba
}

/// Outlined bar filled to `percent`
fn progress_image(width: u32, height: u32, percent: u8) -> Vec<u8> {
    let margin = (width / 8).max(1);
    let bar_h = (height / 4).max(3);
    let top = (height - bar_h) / 2;
    let (left, right) = (margin, width.saturating_sub(margin + 1));
    let bottom = top + bar_h - 1;
    let fill_end = left + (right - left) * percent as u32 / 100;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let inside = (left..=right).contains(&x) && (top..=bottom).contains(&y);
            let border = inside && (x == left || x == right || y == top || y == bottom);
            let px = if border {
                [200, 200, 200, 255]
            } else if inside && x <= fill_end && percent > 0 {
                [0, 180, 60, 255]
            } else {
                [0, 0, 0, 255]
            };
            rgba.extend_from_slice(&px);
        }
    }
    rgba
}
