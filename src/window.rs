use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday};

/// Half-open `[start, end)` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        (self.end - self.start).max(Duration::zero())
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Local midnight today to local midnight tomorrow, in UTC.
pub fn day_window<Tz: TimeZone>(now: &DateTime<Tz>) -> Window {
    local_days_window(&now.timezone(), now.date_naive(), 1)
}

/// Local midnight of the most recent `week_start` day, spanning seven local days.
pub fn week_window<Tz: TimeZone>(now: &DateTime<Tz>, week_start: Weekday) -> Window {
    let today = now.date_naive();
    let back = (7 + today.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    let first_day = today - Duration::days(back.into());
    local_days_window(&now.timezone(), first_day, 7)
}

fn local_days_window<Tz: TimeZone>(tz: &Tz, first_day: NaiveDate, days: i64) -> Window {
    let last_day = first_day + Duration::days(days);
    Window::new(local_midnight_utc(tz, first_day), local_midnight_utc(tz, last_day))
}

/// Resolves local midnight of `day` with the offset in effect on that date.
///
/// Ambiguous wall times take the earlier instant; a midnight skipped by a
/// forward transition resolves to the first valid minute after it.
pub fn local_midnight_utc<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(chrono::NaiveTime::MIN);
    local_naive_to_utc_resolved(tz, midnight)
}

/// Converts a wall-clock time in `tz` to UTC, resolving gaps and overlaps
/// the same way as [`local_midnight_utc`].
pub fn local_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    local_naive_to_utc_resolved(tz, naive)
}

fn local_naive_to_utc<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Some(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => {
            Some(first.with_timezone(&Utc).min(second.with_timezone(&Utc)))
        }
        LocalResult::None => None,
    }
}

fn local_naive_to_utc_resolved<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let mut cursor = naive;
    for _ in 0..=180 {
        if let Some(instant) = local_naive_to_utc(tz, cursor) {
            return instant;
        }
        cursor += Duration::minutes(1);
    }

    let offset = tz.offset_from_utc_datetime(&naive).fix();
    let shifted = naive - Duration::seconds(offset.local_minus_utc().into());
    Utc.from_utc_datetime(&shifted)
}
