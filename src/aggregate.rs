use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::config::{EntryOrder, GroupBy};
use crate::domain::Interval;
use crate::window::Window;

/// A bucket of time in a ranked list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    pub key: String,
    pub duration: Duration,
}

/// One interval's slice of a window, in the viewer's zone.
#[derive(Debug, Clone)]
pub struct EntryRow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub duration: Duration,
    pub label: String,
    pub running: bool,
}

/// Overlap of `[start, end or now)` with the window; zero when disjoint.
pub fn clip(interval: &Interval, window: &Window, now: DateTime<Utc>) -> Duration {
    let overlap = Window::new(
        interval.start.max(window.start),
        interval.end_or(now).min(window.end),
    );
    overlap.duration()
}

pub fn total(intervals: &[Interval], window: &Window, now: DateTime<Utc>) -> Duration {
    intervals
        .iter()
        .map(|interval| clip(interval, window, now))
        .fold(Duration::zero(), |sum, duration| sum + duration)
}

/// Time per tag. An interval with several tags counts in full toward each.
pub fn by_tag(intervals: &[Interval], window: &Window, now: DateTime<Utc>, limit: usize) -> Vec<Ranked> {
    let mut totals: BTreeMap<&str, Duration> = BTreeMap::new();
    for interval in intervals {
        let clipped = clip(interval, window, now);
        if clipped <= Duration::zero() {
            continue;
        }
        for tag in interval.tags_or_untagged() {
            *totals.entry(tag).or_insert_with(Duration::zero) += clipped;
        }
    }
    rank(totals, limit)
}

/// Time per exact label text.
pub fn by_label(intervals: &[Interval], window: &Window, now: DateTime<Utc>, limit: usize) -> Vec<Ranked> {
    let mut totals: BTreeMap<&str, Duration> = BTreeMap::new();
    for interval in intervals {
        let clipped = clip(interval, window, now);
        if clipped <= Duration::zero() {
            continue;
        }
        *totals
            .entry(interval.label.as_str())
            .or_insert_with(Duration::zero) += clipped;
    }
    rank(totals, limit)
}

pub fn top(
    intervals: &[Interval],
    window: &Window,
    now: DateTime<Utc>,
    group_by: GroupBy,
    limit: usize,
) -> Vec<Ranked> {
    match group_by {
        GroupBy::Tag => by_tag(intervals, window, now, limit),
        GroupBy::Label => by_label(intervals, window, now, limit),
    }
}

// Descending by duration; equal durations keep the map's ascending key order.
fn rank(totals: BTreeMap<&str, Duration>, limit: usize) -> Vec<Ranked> {
    let mut rows = totals
        .into_iter()
        .map(|(key, duration)| Ranked {
            key: key.to_string(),
            duration,
        })
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| right.duration.cmp(&left.duration));
    rows.truncate(limit);
    rows
}

/// Window slices of every interval with positive overlap, running one included.
pub fn rows_for_range<Tz: TimeZone>(
    intervals: &[Interval],
    window: &Window,
    now: DateTime<Utc>,
    tz: &Tz,
    order: EntryOrder,
) -> Vec<EntryRow<Tz>> {
    let mut rows = intervals
        .iter()
        .filter_map(|interval| {
            let duration = clip(interval, window, now);
            if duration <= Duration::zero() {
                return None;
            }
            let start = interval.start.max(window.start);
            let end = interval.end_or(now).min(window.end);
            Some(EntryRow {
                start: start.with_timezone(tz),
                end: end.with_timezone(tz),
                duration,
                label: interval.label.clone(),
                running: interval.is_open(),
            })
        })
        .collect::<Vec<_>>();

    match order {
        EntryOrder::OldestFirst => rows.sort_by(|left, right| left.start.cmp(&right.start)),
        EntryOrder::NewestFirst => rows.sort_by(|left, right| right.start.cmp(&left.start)),
    }
    rows
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use super::{Ranked, by_label, by_tag, clip, rows_for_range, top, total};
    use crate::config::{EntryOrder, GroupBy};
    use crate::domain::{Interval, UNTAGGED, format_duration};
    use crate::window::{Window, day_window, week_window};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, hour, minute, 0).unwrap()
    }

    fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Window {
        Window::new(start, end)
    }

    fn ranked(key: &str, minutes: i64) -> Ranked {
        Ranked {
            key: key.to_string(),
            duration: Duration::minutes(minutes),
        }
    }

    #[test]
    fn clip_is_bounded_by_window_and_never_negative() {
        let win = window(at(9, 0), at(12, 0));
        let cases = [
            Interval::closed(at(7, 0), at(8, 0), "before"),
            Interval::closed(at(8, 0), at(9, 30), "straddles start"),
            Interval::closed(at(10, 0), at(11, 0), "inside"),
            Interval::closed(at(11, 30), at(14, 0), "straddles end"),
            Interval::closed(at(6, 0), at(18, 0), "covers"),
            Interval::closed(at(12, 0), at(13, 0), "starts at end"),
            Interval::open(at(10, 0), "running"),
        ];
        let expected = [0, 30, 60, 30, 180, 0, 45];
        for (interval, minutes) in cases.iter().zip(expected) {
            let clipped = clip(interval, &win, at(10, 45));
            assert_eq!(clipped, Duration::minutes(minutes), "{}", interval.label);
            assert!(clipped >= Duration::zero());
            assert!(clipped <= win.duration());
        }
    }

    #[test]
    fn open_interval_stops_at_now_or_window_end() {
        let win = window(at(9, 0), at(12, 0));
        let running = Interval::open(at(8, 0), "running");
        assert_eq!(clip(&running, &win, at(10, 0)), Duration::hours(1));
        assert_eq!(clip(&running, &win, at(15, 0)), Duration::hours(3));
        assert_eq!(clip(&running, &win, at(8, 30)), Duration::zero());
    }

    #[test]
    fn total_is_sum_of_individual_clips() {
        let win = window(at(9, 0), at(12, 0));
        let now = at(11, 0);
        let intervals = vec![
            Interval::closed(at(8, 0), at(9, 30), "a"),
            Interval::closed(at(9, 45), at(10, 0), "b"),
            Interval::open(at(10, 30), "c"),
        ];
        let individually = intervals
            .iter()
            .map(|interval| clip(interval, &win, now))
            .fold(Duration::zero(), |sum, duration| sum + duration);
        assert_eq!(total(&intervals, &win, now), individually);
        assert_eq!(total(&intervals, &win, now), Duration::minutes(75));
        assert_eq!(total(&[], &win, now), Duration::zero());
    }

    #[test]
    fn running_task_scenario_reports_day_total_and_tag() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let started = zone.with_ymd_and_hms(2026, 6, 10, 9, 0, 0).unwrap();
        let now = zone.with_ymd_and_hms(2026, 6, 10, 9, 45, 0).unwrap();
        let intervals = vec![Interval::open(started.with_timezone(&Utc), "Write docs #project")];

        let day = day_window(&now);
        let now_utc = now.with_timezone(&Utc);
        assert_eq!(format_duration(total(&intervals, &day, now_utc)), "00:45");
        assert_eq!(by_tag(&intervals, &day, now_utc, 6), vec![ranked("project", 45)]);
    }

    #[test]
    fn multi_tag_intervals_count_fully_toward_each_tag() {
        let now = at(18, 0);
        let week = week_window(&now, chrono::Weekday::Mon);
        let intervals = vec![
            Interval::closed(at(9, 0), at(10, 0), "Pairing #a #b"),
            Interval::closed(at(10, 0), at(11, 30), "Review #a #b"),
        ];
        assert_eq!(format_duration(total(&intervals, &week, now)), "02:30");
        assert_eq!(
            by_tag(&intervals, &week, now, 6),
            vec![ranked("a", 150), ranked("b", 150)]
        );
        let tag_sum = by_tag(&intervals, &week, now, 6)
            .iter()
            .fold(Duration::zero(), |sum, row| sum + row.duration);
        assert!(tag_sum >= total(&intervals, &week, now));
    }

    #[test]
    fn ranking_breaks_ties_by_key_and_truncates() {
        let win = window(at(0, 0), at(23, 0));
        let now = at(22, 0);
        let intervals = vec![
            Interval::closed(at(9, 0), at(10, 0), "#zeta"),
            Interval::closed(at(10, 0), at(11, 0), "#alpha"),
            Interval::closed(at(11, 0), at(13, 0), "#mid"),
            Interval::closed(at(13, 0), at(13, 30), "no tags"),
        ];
        assert_eq!(
            by_tag(&intervals, &win, now, 10),
            vec![
                ranked("mid", 120),
                ranked("alpha", 60),
                ranked("zeta", 60),
                ranked(UNTAGGED, 30),
            ]
        );
        assert_eq!(by_tag(&intervals, &win, now, 2).len(), 2);
        assert!(by_tag(&intervals, &win, now, 0).is_empty());
    }

    #[test]
    fn label_grouping_buckets_by_exact_text() {
        let win = window(at(0, 0), at(23, 0));
        let now = at(22, 0);
        let intervals = vec![
            Interval::closed(at(9, 0), at(10, 0), "Standup #team"),
            Interval::closed(at(10, 0), at(10, 30), "Standup #team"),
            Interval::closed(at(11, 0), at(13, 0), "Deep work #team"),
            Interval::closed(at(1, 0), at(1, 0), "Empty"),
        ];
        assert_eq!(
            by_label(&intervals, &win, now, 6),
            vec![ranked("Deep work #team", 120), ranked("Standup #team", 90)]
        );
        assert_eq!(
            top(&intervals, &win, now, GroupBy::Tag, 6),
            vec![ranked("team", 210)]
        );
    }

    #[test]
    fn rows_for_range_clips_and_orders() {
        let win = window(at(9, 0), at(12, 0));
        let now = at(11, 0);
        let intervals = vec![
            Interval::closed(at(8, 0), at(9, 30), "early"),
            Interval::closed(at(6, 0), at(7, 0), "outside"),
            Interval::open(at(10, 15), "running"),
            Interval::closed(at(9, 45), at(10, 0), "short"),
        ];

        let oldest = rows_for_range(&intervals, &win, now, &Utc, EntryOrder::OldestFirst);
        let labels = oldest.iter().map(|row| row.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["early", "short", "running"]);
        assert_eq!(oldest[0].start, at(9, 0));
        assert_eq!(oldest[0].duration, Duration::minutes(30));
        assert_eq!(oldest[2].end, now);
        assert!(oldest[2].running);

        let newest = rows_for_range(&intervals, &win, now, &Utc, EntryOrder::NewestFirst);
        let labels = newest.iter().map(|row| row.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, vec!["running", "short", "early"]);
    }

    #[test]
    fn rows_are_reported_in_viewer_zone() {
        let zone = FixedOffset::west_opt(5 * 3600).unwrap();
        let win = window(at(0, 0), at(23, 0));
        let intervals = vec![Interval::closed(at(14, 0), at(15, 0), "call")];
        let rows = rows_for_range(&intervals, &win, at(20, 0), &zone, EntryOrder::OldestFirst);
        assert_eq!(rows[0].start.format("%H:%M").to_string(), "09:00");
    }
}
