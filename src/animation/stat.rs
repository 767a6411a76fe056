//! Best-effort parsing of free-text stats ("2.5 Billion Views") into an animatable magnitude.

/// A stat string split around its leading numeric magnitude.
#[derive(Clone, Debug, PartialEq)]
pub struct StatValue {
    literal: String,
    magnitude: Option<Magnitude>,
}

/// The numeric part of a stat plus the text surrounding it.
#[derive(Clone, Debug, PartialEq)]
pub struct Magnitude {
    pub target: f64,
    pub prefix: String,
    /// Everything after the number, including the whitespace that separated it.
    pub suffix: String,
    /// The source text wrote a fractional part ("3.0", "2.5"), even if it is zero.
    pub fractional: bool,
}

impl Magnitude {
    /// Small values with a fractional part count up with one decimal ("3.2"); everything else
    /// counts in whole, thousands-grouped steps ("2.500.000").
    pub fn uses_one_decimal(&self) -> bool {
        self.target < 100.0 && self.fractional
    }

    pub fn format(&self, value: f64, thousands_separator: char) -> String {
        let number = if self.uses_one_decimal() {
            format!("{value:.1}")
        } else {
            group_thousands(value.max(0.0).trunc() as u64, thousands_separator)
        };
        format!("{}{}{}", self.prefix, number, self.suffix)
    }
}

impl StatValue {
    /// Parse `stat`. The first run of digits, `.` and `,` is the magnitude (commas are dropped).
    /// Stats without a positive, parseable magnitude stay literal.
    pub fn parse(stat: &str) -> Self {
        Self {
            literal: stat.to_string(),
            magnitude: parse_magnitude(stat),
        }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn magnitude(&self) -> Option<&Magnitude> {
        self.magnitude.as_ref()
    }

    /// Counter target, or `0.0` when the stat is shown statically.
    pub fn target(&self) -> f64 {
        self.magnitude.as_ref().map_or(0.0, |m| m.target)
    }

    /// Text for a frame whose counter currently reads `counter_value`.
    pub fn display(&self, counter_value: f64, thousands_separator: char) -> String {
        match &self.magnitude {
            Some(m) => m.format(counter_value, thousands_separator),
            None => self.literal.clone(),
        }
    }
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ','
}

fn parse_magnitude(stat: &str) -> Option<Magnitude> {
    let start = stat.find(is_numeric_char)?;
    let rest = &stat[start..];
    let len = rest.find(|c: char| !is_numeric_char(c)).unwrap_or(rest.len());
    let token: String = rest[..len].chars().filter(|&c| c != ',').collect();

    let target: f64 = token.parse().ok()?;
    if !target.is_finite() || target <= 0.0 {
        return None;
    }

    let fractional = token
        .split_once('.')
        .is_some_and(|(_, frac)| !frac.is_empty());

    Some(Magnitude {
        target,
        prefix: stat[..start].to_string(),
        suffix: rest[len..].to_string(),
        fractional,
    })
}

/// Format `n` with `sep` between groups of three digits.
pub fn group_thousands(n: u64, sep: char) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/animation/stat.rs"]
mod tests;
