use std::{fmt::Display, ops::Deref, str::FromStr};

use anyhow::anyhow;
use chrono::Duration;

/// Share of tracked time. Used by `stats` to print how much each activity took and to hide the
/// ones below `--min-share`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    pub fn zero() -> Percentage {
        Percentage(0.)
    }
}

impl FromStr for Percentage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_end_matches('%');
        let v = s.parse::<f64>()?;
        Percentage::new_opt(v).ok_or_else(|| anyhow!("Can't parse {s} into percentage"))
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `value` as a share of `whole`. An empty whole yields zero instead of NaN.
pub fn duration_percentage(value: Duration, whole: Duration) -> Percentage {
    if whole.num_seconds() <= 0 {
        return Percentage::zero();
    }
    Percentage::new_opt(value.num_seconds().max(0) as f64 / whole.num_seconds() as f64 * 100.)
        .unwrap_or_else(Percentage::zero)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn parses_with_and_without_sign() {
        assert_eq!(*"12.5%".parse::<Percentage>().unwrap(), 12.5);
        assert_eq!(*"3".parse::<Percentage>().unwrap(), 3.);
        assert!("-1".parse::<Percentage>().is_err());
    }

    #[test]
    fn share_of_empty_whole_is_zero() {
        assert_eq!(
            duration_percentage(Duration::minutes(5), Duration::zero()),
            Percentage::zero()
        );
        assert_eq!(
            *duration_percentage(Duration::minutes(15), Duration::hours(1)),
            25.
        );
    }
}
