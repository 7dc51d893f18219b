use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, RngCore};
use serde_json::{Map, Value};

use mockstory_core::MockValue;

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::params::{ParamKind, ParamSpec, ordered, validate_params};

const WINDOW_PARAMS: &[ParamSpec] = &[ParamSpec::new("days", ParamKind::Int, false)];
const DATE_BETWEEN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Date, false),
    ParamSpec::new("max", ParamKind::Date, false),
    ParamSpec::new("year", ParamKind::Int, false),
];

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Clone, Copy)]
enum Direction {
    Past,
    Future,
}

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "date.past",
        direction: Direction::Past,
    }));
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "date.future",
        direction: Direction::Future,
    }));
    registry.register_generator(Box::new(TodayGenerator));
    registry.register_generator(Box::new(DateBetweenGenerator));
    registry.register_generator(Box::new(RelativeTimestampGenerator {
        id: "timestamp.past",
        direction: Direction::Past,
    }));
    registry.register_generator(Box::new(RelativeTimestampGenerator {
        id: "timestamp.future",
        direction: Direction::Future,
    }));
}

/// Window size in days: the `days` param, else the configured default.
fn window(
    ctx: &GeneratorContext<'_>,
    params: &Map<String, Value>,
    id: &'static str,
    direction: Direction,
) -> Result<i64, GenerationError> {
    let params = validate_params(params, WINDOW_PARAMS, id)?;
    let days = match params.get_count("days", id)? {
        Some(days) => days,
        None => match direction {
            Direction::Past => ctx.past_days,
            Direction::Future => ctx.future_days,
        },
    };
    if days == 0 {
        return Err(GenerationError::InvalidParams(format!(
            "{id}: days must be > 0"
        )));
    }
    Ok(i64::from(days))
}

/// `date` moved `days` in `direction`; fails outside chrono's calendar.
fn shift_date(
    date: NaiveDate,
    days: i64,
    direction: Direction,
    id: &str,
) -> Result<NaiveDate, GenerationError> {
    Duration::try_days(days)
        .and_then(|delta| match direction {
            Direction::Past => date.checked_sub_signed(delta),
            Direction::Future => date.checked_add_signed(delta),
        })
        .ok_or_else(|| {
            GenerationError::InvalidParams(format!("{id}: {days} days from {date} is out of range"))
        })
}

fn shift_timestamp(
    timestamp: NaiveDateTime,
    seconds: i64,
    direction: Direction,
    id: &str,
) -> Result<NaiveDateTime, GenerationError> {
    Duration::try_seconds(seconds)
        .and_then(|delta| match direction {
            Direction::Past => timestamp.checked_sub_signed(delta),
            Direction::Future => timestamp.checked_add_signed(delta),
        })
        .ok_or_else(|| {
            GenerationError::InvalidParams(format!(
                "{id}: {seconds} seconds from {timestamp} is out of range"
            ))
        })
}

/// Dates strictly before (past) or after (future) today.
struct RelativeDateGenerator {
    id: &'static str,
    direction: Direction,
}

impl Generator for RelativeDateGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let days = window(ctx, params, self.id, self.direction)?;
        // The far end of the window must exist whatever the draw.
        shift_date(ctx.today, days, self.direction, self.id)?;
        let offset = rng.random_range(1..=days);
        let date = shift_date(ctx.today, offset, self.direction, self.id)?;
        Ok(MockValue::Date(date))
    }
}

struct TodayGenerator;

impl Generator for TodayGenerator {
    fn id(&self) -> &'static str {
        "date.today"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        _rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        validate_params(params, &[], self.id())?;
        Ok(MockValue::Date(ctx.today))
    }
}

/// Date within `min..=max`, optionally narrowed to one calendar year.
struct DateBetweenGenerator;

impl Generator for DateBetweenGenerator {
    fn id(&self) -> &'static str {
        "date.between"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let params = validate_params(params, DATE_BETWEEN_PARAMS, self.id())?;
        let year = match params.get_i64("year") {
            Some(year) => Some(year_bounds(year)?),
            None => None,
        };

        let mut min = match (params.get_date("min"), year) {
            (Some(min), _) => min,
            (None, Some((first, _))) => first,
            (None, None) => shift_date(
                ctx.today,
                i64::from(ctx.past_days),
                Direction::Past,
                self.id(),
            )?,
        };
        let mut max = match (params.get_date("max"), year) {
            (Some(max), _) => max,
            (None, Some((_, last))) => last,
            (None, None) => shift_date(
                ctx.today,
                i64::from(ctx.future_days),
                Direction::Future,
                self.id(),
            )?,
        };
        if let Some((first, last)) = year {
            min = min.max(first);
            max = max.min(last);
        }

        let (min, max) = ordered(min, max, self.id())?;
        let span = (max - min).num_days();
        let offset = rng.random_range(0..=span);
        let date = shift_date(min, offset, Direction::Future, self.id())?;
        Ok(MockValue::Date(date))
    }
}

fn year_bounds(year: i64) -> Result<(NaiveDate, NaiveDate), GenerationError> {
    let invalid =
        || GenerationError::InvalidParams(format!("date.between: year {year} is out of range"));
    let year = i32::try_from(year).map_err(|_| invalid())?;
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
    Ok((first, last))
}

/// Timestamps strictly before or after now, to the second.
struct RelativeTimestampGenerator {
    id: &'static str,
    direction: Direction,
}

impl Generator for RelativeTimestampGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: &Map<String, Value>,
        rng: &mut dyn RngCore,
    ) -> Result<MockValue, GenerationError> {
        let seconds = window(ctx, params, self.id, self.direction)? * SECONDS_PER_DAY;
        shift_timestamp(ctx.now, seconds, self.direction, self.id)?;
        let offset = rng.random_range(1..=seconds);
        let timestamp = shift_timestamp(ctx.now, offset, self.direction, self.id)?;
        Ok(MockValue::Timestamp(timestamp))
    }
}
