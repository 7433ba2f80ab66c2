// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket-number formatting and local-day boundaries.
//!
//! Numbers look like `P-007`: the uppercase first letter of the service name
//! plus a zero-padded daily sequence. The sequence is global across services
//! and resets implicitly at each local midnight -- the storage layer computes
//! it as `1 + count(tickets created since start_of_local_day)` inside the
//! insert transaction.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Format a ticket number from a service name and a daily sequence.
///
/// The prefix is the uppercase first letter of the trimmed service name
/// (`X` for a blank service, which registration rejects anyway). Sequences
/// are padded to three digits and keep growing past 999 (`P-1000`).
pub fn ticket_number(service: &str, sequence: i64) -> String {
    let prefix = service
        .trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "X".to_string());
    format!("{prefix}-{sequence:03}")
}

/// The UTC instant of the most recent local midnight before `now`.
///
/// Day boundary for numbering and "today" statistics. No reset job exists;
/// callers filter on `created_at >= start_of_local_day(now)`.
pub fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    local_midnight(now.with_timezone(&Local).date_naive())
}

/// The UTC instant of local midnight on the given date.
///
/// When a DST transition makes midnight ambiguous the earlier instant wins;
/// when midnight does not exist the naive time is read as UTC, which keeps
/// the boundary within the transition hour.
pub fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn number_uses_uppercase_service_initial() {
        assert_eq!(ticket_number("Primeira vez", 1), "P-001");
        assert_eq!(ticket_number("alteração", 12), "A-012");
        assert_eq!(ticket_number("  inclusão ", 7), "I-007");
    }

    #[test]
    fn number_pads_to_three_digits() {
        assert_eq!(ticket_number("Cadastro", 1), "C-001");
        assert_eq!(ticket_number("Cadastro", 42), "C-042");
        assert_eq!(ticket_number("Cadastro", 999), "C-999");
    }

    #[test]
    fn number_grows_past_three_digits() {
        assert_eq!(ticket_number("Cadastro", 1000), "C-1000");
    }

    #[test]
    fn blank_service_falls_back_to_x() {
        assert_eq!(ticket_number("   ", 3), "X-003");
    }

    #[test]
    fn start_of_local_day_is_not_after_now() {
        let now = Utc::now();
        let start = start_of_local_day(now);
        assert!(start <= now);
        // Midnight is at most 24h (plus a DST hour) in the past.
        assert!(now - start <= chrono::Duration::hours(25));
    }

    #[test]
    fn start_of_local_day_is_a_local_midnight() {
        let now = Utc::now();
        let local = start_of_local_day(now).with_timezone(&Local);
        assert_eq!(local.time(), NaiveTime::MIN);
    }

    proptest! {
        #[test]
        fn number_always_has_prefix_and_dash(seq in 1i64..100_000) {
            let number = ticket_number("Primeira vez", seq);
            prop_assert!(number.starts_with("P-"));
            let suffix = &number[2..];
            prop_assert!(suffix.len() >= 3);
            prop_assert_eq!(suffix.parse::<i64>().expect("numeric suffix"), seq);
        }
    }
}
