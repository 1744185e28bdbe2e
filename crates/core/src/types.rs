//! Shared scalar types and the timestamp wire encoding.

use chrono::{NaiveDateTime, Timelike};

/// Lease timestamps are naive local time, matching what browsers send back.
pub type Timestamp = NaiveDateTime;

/// Fixed-width encoding used for every timestamp the server writes.
///
/// Fixed width keeps lexicographic order equal to chronological order, which
/// the lease store relies on in its conditional SQL.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Current local wall-clock time without a timezone.
pub fn local_now() -> Timestamp {
    chrono::Local::now().naive_local()
}

/// Encode a timestamp with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode a stored timestamp.
///
/// Accepted shape: `YYYY-MM-DDTHH:MM:SS`, optionally followed by `.` and one
/// or more digits. The date and time must be real calendar values (no
/// leap seconds, no surrounding whitespace). Anything else returns `None`,
/// which callers treat as an expired lease. `mdedit-db` expresses the same
/// rule in SQL, so both layers agree on which rows are corrupt.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    const SHAPE: &[u8; 19] = b"0000-00-00T00:00:00";

    if raw.len() < SHAPE.len() || !raw.is_char_boundary(SHAPE.len()) {
        return None;
    }
    let (head, tail) = raw.split_at(SHAPE.len());
    let shape_ok = head.bytes().zip(SHAPE.iter()).all(|(b, &expected)| match expected {
        b'0' => b.is_ascii_digit(),
        sep => b == sep,
    });
    if !shape_ok {
        return None;
    }

    let base = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()?;
    if base.nanosecond() >= 1_000_000_000 {
        return None;
    }
    if tail.is_empty() {
        return Some(base);
    }

    let digits = tail.strip_prefix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos = digits
        .bytes()
        .chain(std::iter::repeat(b'0'))
        .take(9)
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
    base.with_nanosecond(nanos)
}

/// `true` when a stored timestamp is malformed or older than `expired_before`.
///
/// Comparison is on the raw string against the fixed-width encoding of the
/// cutoff, the same comparison SQLite performs on the column.
pub fn is_stale_stamp(raw: &str, expired_before: Timestamp) -> bool {
    parse_timestamp(raw).is_none() || raw < format_timestamp(expired_before).as_str()
}
