use telemetry_api::{days_from_civil, days_in_month};

use super::error::QueryCliError;

const DAY_MS: i64 = 86_400_000;

/// Calendar years accepted in date form. Keeps the ms arithmetic in range.
const YEARS: std::ops::RangeInclusive<i64> = 0..=9999;

/// Which end of a range a user-supplied time describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

/// Parse a UTC instant into Unix ms.
///
/// Accepts raw epoch milliseconds, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`
/// and the same with a `T` separator and optional trailing `Z`. A bare date
/// used as the [`Edge::End`] of a range covers that whole day.
pub fn parse_time(s: &str, edge: Edge) -> Result<i64, QueryCliError> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }

    let s = s.strip_suffix('Z').unwrap_or(s);
    let (date_part, time_part) = if s.len() >= 11 && (s.as_bytes()[10] == b'T' || s.as_bytes()[10] == b' ')
    {
        (&s[..10], Some(&s[11..]))
    } else {
        (s, None)
    };

    let bad = |what: &str| QueryCliError::Config(format!("bad {what}: {s}"));

    let parts: Vec<&str> = date_part.split('-').collect();
    if parts.len() != 3 {
        return Err(bad("date"));
    }
    let year: i64 = parts[0].parse().map_err(|_| bad("year"))?;
    let month: u32 = parts[1].parse().map_err(|_| bad("month"))?;
    let day: u32 = parts[2].parse().map_err(|_| bad("day"))?;
    if !YEARS.contains(&year) {
        return Err(bad("year"));
    }
    if day == 0 || day > days_in_month(year, month) {
        return Err(bad("date"));
    }

    let days = days_from_civil(year, month, day);

    let Some(t) = time_part else {
        return Ok(match edge {
            Edge::Start => days * DAY_MS,
            Edge::End => days * DAY_MS + DAY_MS - 1,
        });
    };

    let tp: Vec<&str> = t.split(':').collect();
    let field = |i: usize, max: u32| -> Result<u32, QueryCliError> {
        match tp.get(i) {
            None => Ok(0),
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n <= max => Ok(n),
                _ => Err(bad("time")),
            },
        }
    };
    let hour = field(0, 23)?;
    let min = field(1, 59)?;
    let sec = field(2, 59)?;

    Ok(days * DAY_MS + (hour as i64 * 3600 + min as i64 * 60 + sec as i64) * 1000)
}
