// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-side statistics over the ticket set.
//!
//! Everything here is a pure derivation: computed per call, never persisted.
//! Counts reflect current state; averages are scoped to a date range anchored
//! at local midnights.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Local, Timelike, Utc};
use fila_core::numbering::{local_midnight, start_of_local_day};
use fila_core::types::{Ticket, TicketStatus};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Oldest-waiting age beyond which a service queue needs attention.
const ATTENTION_WAIT_SECS: i64 = 15 * 60;
/// Oldest-waiting age beyond which a service queue is critical.
const CRITICAL_WAIT_SECS: i64 = 30 * 60;

/// Date range for scoped statistics, anchored at local midnights.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    /// Since local midnight today.
    Today,
    /// Since local midnight last Sunday.
    Week,
    /// Since local midnight on the 1st of the current month.
    Month,
}

impl DateRange {
    /// The UTC instant the range starts at.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = now.with_timezone(&Local).date_naive();
        match self {
            DateRange::Today => start_of_local_day(now),
            DateRange::Week => {
                let days_back = local_date.weekday().num_days_from_sunday() as i64;
                local_midnight(local_date - Duration::days(days_back))
            }
            DateRange::Month => local_midnight(local_date.with_day(1).unwrap_or(local_date)),
        }
    }
}

/// Headline counters and averages.
#[derive(Debug, Clone, Serialize)]
pub struct QueueTotals {
    /// Tickets currently waiting (any day).
    pub waiting: usize,
    /// Tickets currently being announced or served.
    pub in_progress: usize,
    /// Finished tickets created today.
    pub finished_today: usize,
    /// Tickets created today, any status.
    pub today_total: usize,
    /// Mean `called_at - created_at` over called tickets in range, seconds.
    pub avg_wait_secs: Option<i64>,
    /// Mean `finished_at - called_at` over finished tickets in range, seconds.
    pub avg_service_secs: Option<i64>,
    /// Share of today's tickets in the priority class that progressed past
    /// Waiting, in percent.
    pub priority_served_pct: f64,
}

/// Congestion classification of one service queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum HealthLevel {
    Normal,
    Attention,
    Critical,
}

/// Live queue health for one service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub service: String,
    pub waiting: usize,
    pub active: usize,
    /// Age of the oldest waiting ticket, seconds. Zero when nobody waits.
    pub max_wait_secs: i64,
    pub level: HealthLevel,
}

/// Arrivals per local hour of day.
#[derive(Debug, Clone, Serialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub count: usize,
}

/// Average service time per attendant, slowest first.
#[derive(Debug, Clone, Serialize)]
pub struct AttendantAverage {
    pub attendant: String,
    pub served: usize,
    pub avg_service_secs: i64,
}

/// The full statistics report the dashboard renders.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub range: DateRange,
    pub totals: QueueTotals,
    pub services: Vec<ServiceHealth>,
    pub hourly: Vec<HourlyBucket>,
    pub attendants: Vec<AttendantAverage>,
}

/// Assemble the full report in one pass over the ticket set.
pub fn stats_report(tickets: &[Ticket], range: DateRange, now: DateTime<Utc>) -> StatsReport {
    StatsReport {
        range,
        totals: queue_totals(tickets, range, now),
        services: service_health(tickets, now),
        hourly: hourly_arrivals(tickets, range, now),
        attendants: attendant_averages(tickets, range, now),
    }
}

/// Headline counters and range-scoped averages.
pub fn queue_totals(tickets: &[Ticket], range: DateRange, now: DateTime<Utc>) -> QueueTotals {
    let today = start_of_local_day(now);
    let range_start = range.start(now);

    let waiting = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting)
        .count();
    let in_progress = tickets.iter().filter(|t| t.status.is_active()).count();
    let finished_today = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Finished && t.created_at >= today)
        .count();
    let today_total = tickets.iter().filter(|t| t.created_at >= today).count();

    let waits: Vec<i64> = tickets
        .iter()
        .filter(|t| t.created_at >= range_start)
        .filter_map(|t| t.called_at.map(|called| (called - t.created_at).num_seconds()))
        .collect();

    let services: Vec<i64> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Finished && t.created_at >= range_start)
        .filter_map(|t| match (t.called_at, t.finished_at) {
            (Some(called), Some(finished)) => Some((finished - called).num_seconds()),
            _ => None,
        })
        .collect();

    let priority_served = tickets
        .iter()
        .filter(|t| {
            t.created_at >= today
                && t.priority.is_preferential()
                && t.status != TicketStatus::Waiting
        })
        .count();
    let priority_served_pct = if today_total > 0 {
        priority_served as f64 / today_total as f64 * 100.0
    } else {
        0.0
    };

    QueueTotals {
        waiting,
        in_progress,
        finished_today,
        today_total,
        avg_wait_secs: mean(&waits),
        avg_service_secs: mean(&services),
        priority_served_pct,
    }
}

/// Live per-service queue health, keyed by the oldest waiting ticket's age.
pub fn service_health(tickets: &[Ticket], now: DateTime<Utc>) -> Vec<ServiceHealth> {
    struct Acc {
        waiting: usize,
        active: usize,
        oldest_waiting: Option<DateTime<Utc>>,
    }

    let mut by_service: BTreeMap<&str, Acc> = BTreeMap::new();
    for ticket in tickets {
        if ticket.status != TicketStatus::Waiting && !ticket.status.is_active() {
            continue;
        }
        let acc = by_service.entry(ticket.service.as_str()).or_insert(Acc {
            waiting: 0,
            active: 0,
            oldest_waiting: None,
        });
        if ticket.status == TicketStatus::Waiting {
            acc.waiting += 1;
            let oldest = acc.oldest_waiting.get_or_insert(ticket.created_at);
            if ticket.created_at < *oldest {
                *oldest = ticket.created_at;
            }
        } else {
            acc.active += 1;
        }
    }

    by_service
        .into_iter()
        .map(|(service, acc)| {
            let max_wait_secs = acc
                .oldest_waiting
                .map(|oldest| (now - oldest).num_seconds().max(0))
                .unwrap_or(0);
            ServiceHealth {
                service: service.to_string(),
                waiting: acc.waiting,
                active: acc.active,
                max_wait_secs,
                level: classify(max_wait_secs),
            }
        })
        .collect()
}

/// Arrivals per local hour over the range. Always 24 buckets.
pub fn hourly_arrivals(tickets: &[Ticket], range: DateRange, now: DateTime<Utc>) -> Vec<HourlyBucket> {
    let range_start = range.start(now);
    let mut counts = [0usize; 24];
    for ticket in tickets.iter().filter(|t| t.created_at >= range_start) {
        let hour = ticket.created_at.with_timezone(&Local).hour() as usize;
        counts[hour % 24] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, &count)| HourlyBucket {
            hour: hour as u32,
            count,
        })
        .collect()
}

/// Average service time per attendant over finished tickets in range,
/// slowest first.
pub fn attendant_averages(
    tickets: &[Ticket],
    range: DateRange,
    now: DateTime<Utc>,
) -> Vec<AttendantAverage> {
    let range_start = range.start(now);
    let mut by_attendant: BTreeMap<&str, Vec<i64>> = BTreeMap::new();

    for ticket in tickets {
        if ticket.status != TicketStatus::Finished || ticket.created_at < range_start {
            continue;
        }
        let (Some(attendant), Some(started), Some(finished)) = (
            ticket.attendant_name.as_deref(),
            ticket.started_at,
            ticket.finished_at,
        ) else {
            continue;
        };
        by_attendant
            .entry(attendant)
            .or_default()
            .push((finished - started).num_seconds());
    }

    let mut averages: Vec<AttendantAverage> = by_attendant
        .into_iter()
        .filter_map(|(attendant, durations)| {
            mean(&durations).map(|avg| AttendantAverage {
                attendant: attendant.to_string(),
                served: durations.len(),
                avg_service_secs: avg,
            })
        })
        .collect();
    averages.sort_by(|a, b| b.avg_service_secs.cmp(&a.avg_service_secs));
    averages
}

fn classify(max_wait_secs: i64) -> HealthLevel {
    // Normal below 15 minutes, Critical past 30; the boundary instants
    // themselves belong to Attention.
    if max_wait_secs > CRITICAL_WAIT_SECS {
        HealthLevel::Critical
    } else if max_wait_secs >= ATTENTION_WAIT_SECS {
        HealthLevel::Attention
    } else {
        HealthLevel::Normal
    }
}

fn mean(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<i64>() / values.len() as i64)
}
