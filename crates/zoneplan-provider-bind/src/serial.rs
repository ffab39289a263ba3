//! SOA serial generation
//!
//! Produces a date-based serial (`YYYYMMDDnn`) that is never below
//! the previous one. The current date is a parameter so callers and
//! tests get deterministic output for a fixed clock.

use chrono::NaiveDate;
use zoneplan_core::{Error, Result};

/// Compute the next SOA serial from the previous one and today's
/// (UTC) date.
///
/// The preferred shape is `YYYYMMDD * 100 + 1`. An old serial at or
/// past today's draft is bumped by one instead, as is an old serial
/// already carrying today's date. The result is always at least 1 and
/// never below `old` — a violation of that is a fatal error.
pub fn generate_serial(old: u32, today: NaiveDate) -> Result<u32> {
    let today_str = today.format("%Y%m%d").to_string();
    let today_num: u32 = today_str
        .parse()
        .map_err(|_| Error::fatal(format!("date {today_str} does not fit a serial")))?;
    let draft = today_num
        .checked_mul(100)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| Error::fatal(format!("serial for {today_str} overflows 32 bits")))?;

    let old_str = old.to_string();
    let mut new = if old > draft {
        bump(old)?
    } else if old == draft {
        draft + 1
    } else if old_str.len() != 10 {
        draft
    } else if old_str.starts_with(&today_str) {
        bump(old)?
    } else {
        draft
    };

    if new == 0 {
        new = 1;
    }
    if new < old {
        return Err(Error::fatal(format!(
            "generated serial {new} below previous {old}"
        )));
    }
    Ok(new)
}

/// Compute the next serial against the real clock.
pub fn generate_serial_today(old: u32) -> Result<u32> {
    generate_serial(old, chrono::Utc::now().date_naive())
}

fn bump(old: u32) -> Result<u32> {
    old.checked_add(1)
        .ok_or_else(|| Error::fatal(format!("serial {old} cannot be incremented")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stale_date_jumps_to_draft() {
        let new = generate_serial(2019010101, date(2020, 6, 1)).unwrap();
        assert_eq!(new, 2020060101);
    }

    #[test]
    fn todays_serial_increments() {
        let new = generate_serial(2020060105, date(2020, 6, 1)).unwrap();
        assert_eq!(new, 2020060106);
    }

    #[test]
    fn serial_equal_to_draft_increments() {
        let new = generate_serial(2020060101, date(2020, 6, 1)).unwrap();
        assert_eq!(new, 2020060102);
    }

    #[test]
    fn serial_past_draft_increments() {
        let new = generate_serial(2020060199, date(2020, 6, 1)).unwrap();
        assert_eq!(new, 2020060200);
        // far future serials keep climbing rather than regress
        let new = generate_serial(2030010101, date(2020, 6, 1)).unwrap();
        assert_eq!(new, 2030010102);
    }

    #[test]
    fn short_serials_jump_to_draft() {
        assert_eq!(generate_serial(1, date(2020, 6, 1)).unwrap(), 2020060101);
        assert_eq!(generate_serial(42, date(2020, 6, 1)).unwrap(), 2020060101);
    }

    #[test]
    fn zero_old_serial_yields_draft() {
        assert_eq!(generate_serial(0, date(2020, 6, 1)).unwrap(), 2020060101);
    }

    #[test]
    fn monotonic_over_a_sweep() {
        let today = date(2020, 6, 1);
        for old in [0u32, 1, 99, 2019123199, 2020060101, 2020060150, 3000000000] {
            let new = generate_serial(old, today).unwrap();
            assert!(new >= old, "old {old} -> new {new}");
            assert!(new >= 1);
        }
    }
}
