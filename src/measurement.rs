use std::fmt;

use chrono::{DateTime, Utc};

use crate::proto::{
    command::Mode,
    conv::{format_value, pretty_ts},
};

/// A value read from the meter together with the function it was taken in.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub value: f64,
    /// Function reported by the meter, as text (already repaired).
    pub function: String,
    /// `function` mapped onto the known modes, if it is one.
    pub mode: Option<Mode>,
    pub ts: DateTime<Utc>,
}

impl Reading {
    pub fn new(value: f64, function: impl Into<String>, ts: DateTime<Utc>) -> Self {
        let function = function.into();
        let mode = Mode::from_function(&function);
        Self {
            value,
            function,
            mode,
            ts,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            pretty_ts(&self.ts),
            format_value(self.value, self.mode),
            self.function
        )
    }
}
