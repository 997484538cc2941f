use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteDuration {
    Permanent,
    For(Duration),
}

impl MuteDuration {
    pub fn as_millis(self) -> Option<i64> {
        match self {
            MuteDuration::Permanent => None,
            MuteDuration::For(duration) => Some(duration.num_milliseconds()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("duration is empty")]
    Empty,
    #[error("invalid duration '{0}', use e.g. 30m, 2h, 7d or perm")]
    Invalid(String),
    #[error("duration must be positive")]
    NotPositive,
}

/// `perm`/`permanent`/`forever`/`infinite`, a bare number of minutes, or a
/// number with one of the suffixes `s m h d w`.
pub fn parse_duration(input: &str) -> Result<MuteDuration, DurationError> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }
    if matches!(
        trimmed.as_str(),
        "perm" | "permanent" | "forever" | "infinite"
    ) {
        return Ok(MuteDuration::Permanent);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let amount: i64 = digits
        .parse()
        .map_err(|_| DurationError::Invalid(input.trim().to_string()))?;
    if amount <= 0 {
        return Err(DurationError::NotPositive);
    }

    let duration = match unit {
        "" | "m" => Duration::try_minutes(amount),
        "s" => Duration::try_seconds(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        "w" => Duration::try_weeks(amount),
        _ => None,
    };
    duration
        .map(MuteDuration::For)
        .ok_or_else(|| DurationError::Invalid(input.trim().to_string()))
}

/// Two most significant units, e.g. `2d 3h`, `5m 6s`, `7s`.
pub fn format_remaining(remaining: Option<Duration>) -> String {
    let Some(remaining) = remaining else {
        return "permanent".to_string();
    };
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
