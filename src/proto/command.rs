use std::{fmt, str::FromStr};

/// Measurement functions understood by `CONF:<mnemonic>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Volt,
    VoltAc,
    Curr,
    CurrAc,
    Res,
    Cap,
    Freq,
    Per,
    Temp,
    Diode,
    Cont,
}

impl Mode {
    pub const ALL: [Mode; 11] = [
        Mode::Volt,
        Mode::VoltAc,
        Mode::Curr,
        Mode::CurrAc,
        Mode::Res,
        Mode::Cap,
        Mode::Freq,
        Mode::Per,
        Mode::Temp,
        Mode::Diode,
        Mode::Cont,
    ];

    /// SCPI keyword sent on the wire.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Mode::Volt => "VOLT",
            Mode::VoltAc => "VOLT:AC",
            Mode::Curr => "CURR",
            Mode::CurrAc => "CURR:AC",
            Mode::Res => "RES",
            Mode::Cap => "CAP",
            Mode::Freq => "FREQ",
            Mode::Per => "PER",
            Mode::Temp => "TEMP",
            Mode::Diode => "DIOD",
            Mode::Cont => "CONT",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Volt => "VOLT",
            Mode::VoltAc => "VOLT_AC",
            Mode::Curr => "CURR",
            Mode::CurrAc => "CURR_AC",
            Mode::Res => "RES",
            Mode::Cap => "CAP",
            Mode::Freq => "FREQ",
            Mode::Per => "PER",
            Mode::Temp => "TEMP",
            Mode::Diode => "DIODE",
            Mode::Cont => "CONT",
        }
    }

    /// Map a `FUNC?` reply (`VOLT`, `VOLT AC`, `DIOD`, ...) back to a mode.
    pub fn from_function(reply: &str) -> Option<Self> {
        let normalized = reply
            .trim()
            .trim_matches('"')
            .replace(&[' ', '_'][..], ":")
            .to_ascii_uppercase();
        Self::ALL.into_iter().find(|mode| {
            mode.mnemonic() == normalized || mode.name().replace('_', ":") == normalized
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_function(s).ok_or_else(|| format!("Unknown measurement mode: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Identify,
    Configure(Mode),
    Function,
    Measure,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Identify => f.write_str("*IDN?"),
            Command::Configure(mode) => write!(f, "CONF:{}", mode.mnemonic()),
            Command::Function => f.write_str("FUNC?"),
            Command::Measure => f.write_str("MEAS?"),
        }
    }
}
