use chrono::Utc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::config::MeterConfig;
use crate::measurement::Reading;
use crate::proto::{
    command::{Command, Mode},
    framer::{AsyncChannel, Framer},
    response::{Ident, Reply, ResponseKind},
    Result,
};

enum Link {
    Ready(Framer),
    /// The meter did not answer `*IDN?`.
    Absent,
    Closed,
}

/// OWON XDM1041/XDM1241 bench multimeter.
///
/// The meter is flaky: it drops commands, answers late and mixes raw
/// bytes into its unit strings. Queries are retried a few times and
/// fall back to `0` or `"?"` instead of failing. Only transport faults
/// are reported as errors.
///
/// When the meter does not identify itself on connect, the port is
/// released right away and every later call returns the fallback value
/// without touching the wire.
pub struct Device {
    link: Link,
    ident: Option<Ident>,
}

impl Device {
    pub async fn new(com: impl AsRef<str>, baudrate: u32) -> Result<Self> {
        Self::with_config(com, MeterConfig::default().with_baudrate(baudrate)).await
    }

    pub async fn with_config(com: impl AsRef<str>, config: MeterConfig) -> Result<Self> {
        let port = open_port(com.as_ref(), &config)?;
        Self::with_channel(port, config).await
    }

    /// Identify the meter on an already opened channel.
    pub async fn with_channel(
        channel: impl AsyncChannel + 'static,
        config: MeterConfig,
    ) -> Result<Self> {
        let mut framer = Framer::new(channel, config);
        let line = match framer.send_and_read(Command::Identify).await {
            Ok(line) => line,
            Err(err) => {
                framer.close().await;
                return Err(err);
            }
        };

        match line {
            Some(raw) => {
                info!(ident = %raw, "meter identified");
                Ok(Self {
                    link: Link::Ready(framer),
                    ident: Some(Ident::from(raw)),
                })
            }
            None => {
                warn!("meter does not respond");
                framer.close().await;
                Ok(Self {
                    link: Link::Absent,
                    ident: None,
                })
            }
        }
    }

    /// Identification string, if the meter answered on connect.
    pub fn ident(&self) -> Option<&Ident> {
        self.ident.as_ref()
    }

    pub fn is_present(&self) -> bool {
        matches!(self.link, Link::Ready(_))
    }

    /// Send `command` until a usable line comes back.
    pub async fn get_response(&mut self, command: Command, kind: ResponseKind) -> Result<Reply> {
        let framer = match &mut self.link {
            Link::Ready(framer) => framer,
            Link::Absent | Link::Closed => {
                debug!(%command, "meter not connected");
                return Ok(Reply::Unavailable(kind));
            }
        };
        let attempts = framer.config().max_attempts;
        let delay = framer.config().retry_delay;

        for attempt in 1..=attempts {
            if let Some(line) = framer.send_and_read(command.clone()).await? {
                return Ok(Reply::from_line(&line, kind));
            }
            debug!(%command, attempt, "no reply");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        warn!(%command, attempts, "meter did not reply, giving up");
        Ok(Reply::Unavailable(kind))
    }

    /// Switch the measurement function. Whether the meter followed is not
    /// checked.
    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.get_response(Command::Configure(mode), ResponseKind::Text)
            .await?;
        Ok(())
    }

    /// Active measurement function, `"?"` if unknown.
    pub async fn get_mode(&mut self) -> Result<String> {
        Ok(self
            .get_response(Command::Function, ResponseKind::Text)
            .await?
            .text())
    }

    /// Latest reading, `0` if unknown.
    pub async fn get_measurement(&mut self) -> Result<f64> {
        Ok(self
            .get_response(Command::Measure, ResponseKind::Numeric)
            .await?
            .number())
    }

    pub async fn reading(&mut self) -> Result<Reading> {
        let function = self.get_mode().await?;
        let value = self.get_measurement().await?;
        Ok(Reading::new(value, function, Utc::now()))
    }

    /// Release the port. Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Link::Ready(framer) = std::mem::replace(&mut self.link, Link::Closed) {
            framer.close().await;
            debug!("port closed");
        }
    }
}

/// Open the serial port with the meter's fixed line settings (8N1).
pub fn open_port(com: &str, config: &MeterConfig) -> Result<SerialStream> {
    let mut port = tokio_serial::new(com, config.baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .timeout(config.read_timeout)
        .open_native_async()?;

    #[cfg(unix)]
    port.set_exclusive(false)?;

    Ok(port)
}
