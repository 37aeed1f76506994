use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use cosmwasm_std::{Decimal256, Timestamp};

use crate::calculator::validate_contributors;
use crate::error::ContractError;
use crate::helpers::{hundred, to_fixed};
use crate::msg::{Contributor, VestingEntry, VestingResponse};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Milestones of a schedule, in unix milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VestingSchedule {
    pub start: i64,
    pub cliff: i64,
    pub end: i64,
}

impl VestingSchedule {
    pub fn new(start: i64, cliff_days: u64, duration_days: u64) -> Result<Self, ContractError> {
        if cliff_days > duration_days {
            return Err(ContractError::CliffExceedsDuration {
                cliff: cliff_days,
                duration: duration_days,
            });
        }
        Ok(VestingSchedule {
            start,
            cliff: offset(start, cliff_days, "cliff")?,
            end: offset(start, duration_days, "vesting_duration")?,
        })
    }

    /// Vested share of an allocation at `now`, between 0 and 1.
    ///
    /// Nothing vests before the cliff, everything from the end on, and the
    /// rest linearly in between. A cliff that coincides with the end vests
    /// everything at once.
    pub fn vested_fraction(&self, now: i64) -> Decimal256 {
        if now < self.cliff {
            Decimal256::zero()
        } else if now >= self.end {
            Decimal256::one()
        } else {
            // cliff <= now < end, so the span is positive
            Decimal256::from_ratio((now - self.cliff) as u128, (self.end - self.cliff) as u128)
        }
    }

    /// Elapsed share of the whole schedule in percent, within [0, 100].
    pub fn progress(&self, now: i64) -> Decimal256 {
        if now <= self.start {
            return Decimal256::zero();
        }
        if now >= self.end {
            return hundred();
        }
        Decimal256::from_ratio((now - self.start) as u128 * 100, (self.end - self.start) as u128)
    }
}

fn offset(start: i64, days: u64, field: &str) -> Result<i64, ContractError> {
    let out_of_range = || ContractError::InvalidDuration {
        field: field.to_string(),
        days,
    };
    let days = i64::try_from(days).map_err(|_| out_of_range())?;
    days.checked_mul(MILLIS_PER_DAY)
        .and_then(|ms| start.checked_add(ms))
        .filter(|ms| Utc.timestamp_millis_opt(*ms).single().is_some())
        .ok_or_else(out_of_range)
}

/// Accepts RFC 3339, a zone-less date-time read as UTC, or a bare date at
/// midnight UTC.
pub fn parse_start_date(value: &str) -> Result<DateTime<Utc>, ContractError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"].iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ContractError::InvalidDate {
            field: "start_date".to_string(),
            value: value.to_string(),
        })
}

fn iso_millis(ms: i64, field: &str) -> Result<String, ContractError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| ContractError::InvalidDate {
            field: field.to_string(),
            value: ms.to_string(),
        })
}

pub fn timestamp_millis(time: Timestamp) -> i64 {
    (time.nanos() / 1_000_000) as i64
}

/// Evaluates a cliff + linear schedule for every contributor at `now`.
/// Contributor percentages are taken as given.
pub fn simulate(
    total_amount: Decimal256,
    vesting_duration: u64,
    cliff: u64,
    start_date: String,
    contributors: Vec<Contributor>,
    now: Timestamp,
) -> Result<VestingResponse, ContractError> {
    validate_contributors(&contributors)?;
    let start = parse_start_date(&start_date)?;
    let schedule = VestingSchedule::new(start.timestamp_millis(), cliff, vesting_duration)?;

    let now = timestamp_millis(now);
    let fraction = schedule.vested_fraction(now);

    let schedules = contributors
        .into_iter()
        .map(|contributor| {
            let allocation = total_amount
                .checked_mul(Decimal256::from(contributor.percentage))
                .map_err(|_| ContractError::MathCalc {})?
                .checked_div(hundred())
                .map_err(|_| ContractError::MathCalc {})?;
            let vested = allocation
                .checked_mul(fraction)
                .map_err(|_| ContractError::MathCalc {})?;
            let vested_percentage = if allocation.is_zero() {
                Decimal256::zero()
            } else {
                fraction * hundred()
            };

            Ok(VestingEntry {
                name: contributor.name,
                address: contributor.address,
                percentage: contributor.percentage,
                allocation: to_fixed(allocation, 2)?,
                vested_amount: to_fixed(vested, 2)?,
                vested_percentage: to_fixed(vested_percentage, 2)?,
            })
        })
        .collect::<Result<Vec<_>, ContractError>>()?;

    Ok(VestingResponse {
        total_amount,
        vesting_duration,
        cliff,
        start_date,
        end_date: iso_millis(schedule.end, "end_date")?,
        cliff_end_date: iso_millis(schedule.cliff, "cliff_end_date")?,
        current_progress: to_fixed(schedule.progress(now), 2)?,
        schedules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::Decimal;
    use std::str::FromStr;

    // 2024-01-01T00:00:00Z
    const T0: u64 = 1_704_067_200;
    const DAY: u64 = 86_400;

    fn everyone() -> Vec<Contributor> {
        vec![Contributor {
            name: "team".to_string(),
            address: None,
            percentage: Decimal::percent(10_000),
        }]
    }

    fn run(now: u64) -> VestingResponse {
        simulate(
            Decimal256::from_str("1200").unwrap(),
            120,
            30,
            "2024-01-01T00:00:00Z".to_string(),
            everyone(),
            Timestamp::from_seconds(now),
        )
        .unwrap()
    }

    #[test]
    fn nothing_vests_before_cliff() {
        let res = run(T0);
        assert_eq!("1200.00", res.schedules[0].allocation);
        assert_eq!("0.00", res.schedules[0].vested_amount);
        assert_eq!("0.00", res.schedules[0].vested_percentage);
        assert_eq!("0.00", res.current_progress);

        let res = run(T0 + 30 * DAY - 1);
        assert_eq!("0.00", res.schedules[0].vested_amount);
    }

    #[test]
    fn vests_linearly_after_cliff() {
        let res = run(T0 + 31 * DAY);
        // one day into a 90 day linear phase
        assert_eq!("13.33", res.schedules[0].vested_amount);
        assert_eq!("1.11", res.schedules[0].vested_percentage);
        assert_eq!("25.83", res.current_progress);

        let res = run(T0 + 75 * DAY);
        assert_eq!("600.00", res.schedules[0].vested_amount);
        assert_eq!("50.00", res.schedules[0].vested_percentage);
    }

    #[test]
    fn fully_vested_after_end() {
        let res = run(T0 + 200 * DAY);
        assert_eq!("1200.00", res.schedules[0].vested_amount);
        assert_eq!("100.00", res.schedules[0].vested_percentage);
        assert_eq!("100.00", res.current_progress);

        let res = run(T0 + 120 * DAY);
        assert_eq!("1200.00", res.schedules[0].vested_amount);
    }

    #[test]
    fn reports_dates() {
        let res = run(T0);
        assert_eq!("2024-01-01T00:00:00Z", res.start_date);
        assert_eq!("2024-01-31T00:00:00.000Z", res.cliff_end_date);
        assert_eq!("2024-04-30T00:00:00.000Z", res.end_date);
    }

    #[test]
    fn splits_allocation_by_percentage() {
        let contributors = vec![
            Contributor {
                name: "alice".to_string(),
                address: Some("0x1111111111111111111111111111111111111111".to_string()),
                percentage: Decimal::percent(7_500),
            },
            Contributor {
                name: "bob".to_string(),
                address: None,
                percentage: Decimal::percent(2_500),
            },
        ];
        let res = simulate(
            Decimal256::from_str("1000").unwrap(),
            100,
            0,
            "2024-01-01".to_string(),
            contributors,
            Timestamp::from_seconds(T0 + 10 * DAY),
        )
        .unwrap();
        assert_eq!("750.00", res.schedules[0].allocation);
        assert_eq!("75.00", res.schedules[0].vested_amount);
        assert_eq!("250.00", res.schedules[1].allocation);
        assert_eq!("25.00", res.schedules[1].vested_amount);
        assert_eq!("10.00", res.schedules[1].vested_percentage);
    }

    #[test]
    fn cliff_at_end_vests_at_once() {
        let schedule = VestingSchedule::new(0, 30, 30).unwrap();
        let cliff = 30 * MILLIS_PER_DAY;
        assert_eq!(Decimal256::zero(), schedule.vested_fraction(cliff - 1));
        assert_eq!(Decimal256::one(), schedule.vested_fraction(cliff));
        assert_eq!(Decimal256::one(), schedule.vested_fraction(cliff + 1));
    }

    #[test]
    fn zero_length_schedule_is_complete_from_start() {
        let schedule = VestingSchedule::new(1_000, 0, 0).unwrap();
        assert_eq!(Decimal256::zero(), schedule.progress(999));
        assert_eq!(Decimal256::zero(), schedule.progress(1_000));
        assert_eq!(hundred(), schedule.progress(1_001));
        assert_eq!(Decimal256::one(), schedule.vested_fraction(1_000));
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let schedule = VestingSchedule::new(10 * MILLIS_PER_DAY, 30, 120).unwrap();
        let mut last = Decimal256::zero();
        for day in 0..200 {
            let progress = schedule.progress(day * MILLIS_PER_DAY);
            assert!(progress >= last);
            assert!(progress <= hundred());
            last = progress;
        }
        assert_eq!(hundred(), last);
    }

    #[test]
    fn rejects_cliff_longer_than_duration() {
        match VestingSchedule::new(0, 31, 30) {
            Err(ContractError::CliffExceedsDuration { cliff, duration }) => {
                assert_eq!(31, cliff);
                assert_eq!(30, duration);
            }
            _ => panic!("Must return CliffExceedsDuration error"),
        }
    }

    #[test]
    fn rejects_out_of_range_duration() {
        match VestingSchedule::new(0, 0, u64::MAX) {
            Err(ContractError::InvalidDuration { field, .. }) => assert_eq!("vesting_duration", field),
            _ => panic!("Must return InvalidDuration error"),
        }
    }

    #[test]
    fn parses_start_dates() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(midnight, parse_start_date("2024-01-01").unwrap());
        assert_eq!(midnight, parse_start_date("2024-01-01T00:00:00").unwrap());
        assert_eq!(midnight, parse_start_date("2024-01-01T00:00:00.000Z").unwrap());
        assert_eq!(midnight, parse_start_date("2024-01-01T02:00:00+02:00").unwrap());

        for bad in ["", "yesterday", "2024-13-01", "01/01/2024"].iter() {
            match parse_start_date(bad) {
                Err(ContractError::InvalidDate { field, value }) => {
                    assert_eq!("start_date", field);
                    assert_eq!(*bad, value);
                }
                _ => panic!("Must return InvalidDate error for {}", bad),
            }
        }
    }

    #[test]
    fn rejects_empty_contributors() {
        let res = simulate(
            Decimal256::from_str("1").unwrap(),
            10,
            1,
            "2024-01-01".to_string(),
            vec![],
            Timestamp::from_seconds(T0),
        );
        match res {
            Err(ContractError::EmptyList { field }) => assert_eq!("contributor", field),
            _ => panic!("Must return EmptyList error"),
        }
    }
}
