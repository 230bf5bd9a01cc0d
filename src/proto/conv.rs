use chrono::{DateTime, Local, Utc};

use super::command::Mode;

pub fn unit_prefix(exponent: i16) -> &'static str {
    match exponent {
        -12 => "p",
        -9 => "n",
        -6 => "u",
        -3 => "m",
        0 => "",
        3 => "k",
        6 => "M",
        9 => "G",
        12 => "T",
        _ => "?",
    }
}

/// Split a value into a mantissa in [1, 1000) and a power-of-1000 exponent.
pub fn engineering(value: f64) -> (f64, i16) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let exponent = ((value.abs().log10() / 3.0).floor() as i16 * 3).clamp(-12, 12);
    (value / 10f64.powi(exponent as i32), exponent)
}

/// Base unit of a reading taken in `mode`.
pub fn mode_unit(mode: Mode) -> &'static str {
    match mode {
        Mode::Volt | Mode::VoltAc | Mode::Diode => "V",
        Mode::Curr | Mode::CurrAc => "A",
        Mode::Res | Mode::Cont => "Ω",
        Mode::Cap => "F",
        Mode::Freq => "Hz",
        Mode::Per => "s",
        Mode::Temp => "°C",
    }
}

pub fn format_value(value: f64, mode: Option<Mode>) -> String {
    match mode {
        // Temperatures are never scaled.
        Some(Mode::Temp) => format!("{} °C", value),
        Some(mode) => {
            let (mantissa, exponent) = engineering(value);
            format!(
                "{} {}{}",
                round_to(mantissa, 6),
                unit_prefix(exponent),
                mode_unit(mode)
            )
        }
        None => format!("{}", value),
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

pub fn pretty_ts(&ts: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = ts.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}
