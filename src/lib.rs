//!
//! This library provides communication with an OWON XDM1041/XDM1241 bench multimeter
//! over its USB serial port, using the meter's SCPI command set.
//!
//! <br>
//!
//! # Details
//!
//! - The meter is not reliable: it drops commands, times out and sends
//!   raw bytes for unit glyphs. Queries are retried and fall back to `0`
//!   (numbers) or `"?"` (text) instead of failing. Only transport faults
//!   are returned as errors.
//!
//! - Basic setup and connection
//!
//!   ```no_run
//!   use xdm1041ctrl::{Device, DEFAULT_BAUDRATE};
//!   #[tokio::main]
//!   async fn main() -> xdm1041ctrl::Result<()> {
//!       let mut device = Device::new("/dev/ttyUSB0", DEFAULT_BAUDRATE).await?;
//!       if let Some(id) = device.ident() {
//!           eprintln!("Connected to: {}\n", id);
//!       }
//!       println!("{}", device.get_measurement().await?);
//!       device.close().await;
//!       Ok(())
//!   }
//!   ```
//!
//! # Supported devices
//!
//!  * OWON XDM1041
//!  * OWON XDM1241
//!

pub mod config;
pub mod device;
pub mod discovery;
pub mod measurement;
pub mod proto;

pub use config::MeterConfig;
pub use device::Device;
pub use proto::command::Mode;
pub use proto::{MeterError, Result};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Default Baudrate for XDM1041 and XDM1241.
pub const DEFAULT_BAUDRATE: u32 = 115200;
