//! Build script for kairos-firmware
//!
//! - Copies the selected chip's memory layout to `memory.x` for cortex-m-rt
//! - Validates board.toml and generates the board constants
//! - Reports every board.toml problem at once in a boxed message

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kairos_hal::Pin;

#[path = "build/report.rs"]
mod report;

use report::fail;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    setup_linker(&out_dir);
    let board = validate_board();
    write_board(&out_dir, &board);
}

/// Settings read from board.toml
struct Board {
    led: Pin,
    blink_ms: u32,
    heartbeat: u32,
}

/// Copy the chip's memory layout to OUT_DIR/memory.x
fn setup_linker(out_dir: &Path) {
    let memory_x: &[u8] = if env::var_os("CARGO_FEATURE_STM32F103").is_some() {
        include_bytes!("memory-stm32f103.x")
    } else {
        include_bytes!("memory-stm32g07x.x")
    };
    fs::write(out_dir.join("memory.x"), memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory-stm32g07x.x");
    println!("cargo:rerun-if-changed=memory-stm32f103.x");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=build/report.rs");
}

/// Validate board.toml at compile time
fn validate_board() -> Board {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");
    if !config_path.exists() {
        fail(
            "board.toml not found!",
            &["The firmware needs board.toml next to Cargo.toml.".to_string()],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read board.toml", &[e.to_string()]),
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => fail(
            "Invalid TOML syntax in board.toml",
            &e.to_string().lines().map(str::to_string).collect::<Vec<_>>(),
        ),
    };

    let mut errors = Vec::new();

    let led = match config.get("led") {
        Some(toml::Value::String(name)) => match Pin::from_str(name) {
            Ok(pin) => Some(pin),
            Err(e) => {
                errors.push(format!("led = \"{}\": {}", name, e));
                None
            }
        },
        Some(_) => {
            errors.push("'led' must be a string such as \"PA5\"".to_string());
            None
        }
        None => {
            errors.push("missing 'led'".to_string());
            None
        }
    };

    let blink_ms = integer_in(&config, "blink_ms", 1, 60_000, Some(500), &mut errors);
    let heartbeat = integer_in(&config, "heartbeat", 0, 1_000_000, Some(0), &mut errors);

    match (led, blink_ms, heartbeat) {
        (Some(led), Some(blink_ms), Some(heartbeat)) if errors.is_empty() => {
            println!("cargo:warning=board.toml validated successfully (LED on {})", led);
            Board {
                led,
                blink_ms,
                heartbeat,
            }
        }
        _ => fail("Invalid settings in board.toml", &errors),
    }
}

/// Read an optional integer key and check its range
fn integer_in(
    config: &toml::Value,
    key: &str,
    min: i64,
    max: i64,
    default: Option<u32>,
    errors: &mut Vec<String>,
) -> Option<u32> {
    match config.get(key) {
        Some(toml::Value::Integer(value)) if (min..=max).contains(value) => Some(*value as u32),
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("'{}' must be {}-{}", key, min, max));
            None
        }
        Some(_) => {
            errors.push(format!("'{}' must be an integer", key));
            None
        }
        None => default,
    }
}

/// Generate OUT_DIR/board.rs
fn write_board(out_dir: &Path, board: &Board) {
    let source = format!(
        "// Generated by build.rs from board.toml\n\
         \n\
         /// Status LED ({name})\n\
         pub const LED: kairos_hal::Pin = kairos_hal::Pin::from_raw({raw});\n\
         \n\
         /// Half period of the blink in milliseconds\n\
         pub const BLINK_MS: u32 = {blink_ms};\n\
         \n\
         /// LED toggles between heartbeat log lines (0 = never)\n\
         pub const HEARTBEAT: u32 = {heartbeat};\n",
        name = board.led,
        raw = board.led.raw(),
        blink_ms = board.blink_ms,
        heartbeat = board.heartbeat,
    );
    fs::write(out_dir.join("board.rs"), source).unwrap();
}
