//! Clock helpers for the localized ban list

use crate::error::ClockError;

/// Convert a 12-hour clock hour to the 24-hour clock
///
/// `hour` must be within 1..=12 and `period` either `AM` or `PM`.
pub fn twelve_to_24_clock(hour: u32, period: &str) -> Result<u32, ClockError> {
    if !(1..=12).contains(&hour) {
        return Err(ClockError::HourOutOfRange(hour));
    }

    match period {
        "AM" => Ok(hour % 12),
        "PM" => Ok(hour % 12 + 12),
        other => Err(ClockError::UnknownPeriod(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twelve_to_24_clock() {
        for (hour, period, expected) in [
            (12, "AM", 0),
            (1, "AM", 1),
            (11, "AM", 11),
            (12, "PM", 12),
            (1, "PM", 13),
            (11, "PM", 23),
        ] {
            assert_eq!(twelve_to_24_clock(hour, period).unwrap(), expected);
        }
    }

    #[test]
    fn test_invalid_hours() {
        for (hour, period) in [(0, "AM"), (0, "PM"), (13, "AM"), (13, "PM")] {
            assert_eq!(
                twelve_to_24_clock(hour, period).unwrap_err(),
                ClockError::HourOutOfRange(hour)
            );
        }
    }

    #[test]
    fn test_unknown_period() {
        assert_eq!(
            twelve_to_24_clock(10, "AMPM").unwrap_err(),
            ClockError::UnknownPeriod("AMPM".to_string())
        );
    }
}
