use std::fmt;

/// Value reported in place of a reading that could not be obtained.
pub const NUMERIC_SENTINEL: f64 = 0.0;

/// Value reported in place of a text reply that could not be obtained.
pub const TEXT_SENTINEL: &str = "?";

/// How a reply line should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Numeric(f64),
    Text(String),
    /// No usable reply within the retry budget, or the meter is not
    /// connected.
    Unavailable(ResponseKind),
}

impl Reply {
    /// Interpret a decoded line.
    ///
    /// A line that does not parse as a number is reported as the numeric
    /// sentinel. The meter produces those often enough, and asking again
    /// does not help.
    pub fn from_line(line: &str, kind: ResponseKind) -> Self {
        match kind {
            ResponseKind::Numeric => match line.parse::<f64>() {
                Ok(v) => Reply::Numeric(v),
                Err(_) => {
                    tracing::warn!(line, "malformed numeric reply");
                    Reply::Numeric(NUMERIC_SENTINEL)
                }
            },
            ResponseKind::Text => Reply::Text(repair(line)),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Reply::Unavailable(_))
    }

    /// The numeric value, or [`NUMERIC_SENTINEL`].
    pub fn number(&self) -> f64 {
        match self {
            Reply::Numeric(v) => *v,
            _ => NUMERIC_SENTINEL,
        }
    }

    /// The text value, or [`TEXT_SENTINEL`].
    pub fn text(&self) -> String {
        match self {
            Reply::Text(s) => s.clone(),
            Reply::Numeric(v) => v.to_string(),
            Reply::Unavailable(_) => TEXT_SENTINEL.to_string(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Numeric(v) => write!(f, "{}", v),
            Reply::Text(s) => f.write_str(s),
            Reply::Unavailable(ResponseKind::Numeric) => write!(f, "{}", NUMERIC_SENTINEL),
            Reply::Unavailable(ResponseKind::Text) => f.write_str(TEXT_SENTINEL),
        }
    }
}

// Unit glyphs as they come out of the decoder.
const OHM_ESCAPED: &str = "\\xa6\\xb8";
const MICROFARAD_ESCAPED: &str = "\\xa6\\xccF";

/// Rewrite the meter's garbled unit glyphs and strip quotes.
///
/// First matching rule wins.
pub fn repair(line: &str) -> String {
    if let Some(head) = line.strip_suffix(OHM_ESCAPED) {
        format!("{}Ohm", head)
    } else if let Some(head) = line.strip_suffix(MICROFARAD_ESCAPED) {
        format!("{}uF", head)
    } else if line.ends_with('"') {
        line.trim_matches('"').to_string()
    } else {
        line.to_string()
    }
}

/// `*IDN?` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub raw: String,
}

impl Ident {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.raw.split(',').map(str::trim)
    }

    /// First field naming an XDM model, or the first field.
    pub fn model(&self) -> &str {
        self.fields()
            .find(|f| f.starts_with("XDM"))
            .or_else(|| self.fields().next())
            .unwrap_or_default()
    }
}

impl From<String> for Ident {
    fn from(raw: String) -> Self {
        Self { raw }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
