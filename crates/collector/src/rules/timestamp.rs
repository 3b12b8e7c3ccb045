//! 타임스탬프 해석 — 형식별 파싱 체인과 수집 시각 폴백
//!
//! 해석 순서:
//! 1. syslog 형식 (`Nov 16 14:30:25`) — 연도가 없으므로 현재 연도를 가정
//! 2. ISO-8601 오프셋 포함 (`2025-11-16T14:30:25+0000`, journald short-iso)
//! 3. 날짜-시각 형식 (`2025-11-16 14:30:25`, dpkg/zypper)
//!
//! 전부 실패하면 수집 시각(now)을 반환합니다. 파싱 불가능한
//! 타임스탬프가 이벤트 방출을 막지 않도록 하는 의도적 선택입니다.

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};

/// 라인에서 타임스탬프를 해석합니다. 실패 시 현재 시각을 반환합니다.
pub fn resolve(line: &str) -> DateTime<Utc> {
    try_resolve(line).unwrap_or_else(Utc::now)
}

/// 선택적 타임스탬프 문자열을 해석합니다. None이거나 실패 시 현재 시각.
pub fn resolve_opt(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(try_resolve).unwrap_or_else(Utc::now)
}

/// 파싱 체인을 순서대로 시도합니다.
fn try_resolve(line: &str) -> Option<DateTime<Utc>> {
    parse_syslog(line)
        .or_else(|| parse_iso8601(line))
        .or_else(|| parse_date_time(line))
}

/// syslog 형식 (`MMM dd HH:MM:SS`)을 파싱합니다.
///
/// 연도 정보가 없으므로 현재 연도를 가정합니다.
fn parse_syslog(line: &str) -> Option<DateTime<Utc>> {
    let head = line.get(..15)?;
    let year = Utc::now().year();
    let with_year = format!("{year} {head}");
    let naive = NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

/// ISO-8601 오프셋 포함 형식을 파싱합니다.
///
/// journald short-iso(`+0000`), RFC 3339(`+00:00`, `Z`), 소수점 초를
/// 모두 허용합니다. pacman처럼 대괄호로 감싼 타임스탬프도 처리합니다.
fn parse_iso8601(line: &str) -> Option<DateTime<Utc>> {
    let token = line.split_whitespace().next()?;
    let token = token.trim_matches(|c| c == '[' || c == ']');

    // ISO 형태의 최소 검증: YYYY-MM-DDT...
    if token.len() < 19 || token.as_bytes().get(4) != Some(&b'-') || token.as_bytes().get(10) != Some(&b'T') {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(token, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // 오프셋 없는 naive ISO (예: PowerShell 출력 일부)
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(token, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// `YYYY-mm-dd HH:MM:SS` 형식 (dpkg.log, zypper history)을 파싱합니다.
fn parse_date_time(line: &str) -> Option<DateTime<Utc>> {
    let head = line.get(..19)?;
    let naive = NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn syslog_timestamp_uses_current_year() {
        let ts = resolve("Nov 16 14:30:25 host sshd[1]: Accepted publickey");
        assert_eq!(ts.year(), Utc::now().year());
        assert_eq!(ts.month(), 11);
        assert_eq!(ts.day(), 16);
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.minute(), 30);
        assert_eq!(ts.second(), 25);
    }

    #[test]
    fn syslog_single_digit_day() {
        let ts = try_resolve("Nov  6 04:05:06 host kernel: message").unwrap();
        assert_eq!(ts.day(), 6);
    }

    #[test]
    fn journald_short_iso_offset() {
        let ts = try_resolve("2025-11-16T14:30:25+0000 host sshd[1]: Accepted").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 11, 16, 14, 30, 25).unwrap()
        );
    }

    #[test]
    fn rfc3339_with_colon_offset() {
        let ts = try_resolve("2025-11-16T23:30:25+09:00 host app: message").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 11, 16, 14, 30, 25).unwrap()
        );
    }

    #[test]
    fn iso_with_fractional_seconds() {
        let ts = try_resolve("2025-11-16T14:30:25.123456+0000 host app: message").unwrap();
        assert_eq!(ts.second(), 25);
    }

    #[test]
    fn pacman_bracketed_timestamp() {
        let ts = try_resolve("[2025-11-16T10:30:00+0000] [ALPM] installed nginx (1.18.0-1)").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 11, 16, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn dpkg_date_time() {
        let ts = try_resolve("2025-11-16 10:30:00 install nginx:amd64 <none> 1.18.0-1").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 11, 16, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn unparsable_line_falls_back_to_now() {
        let before = Utc::now();
        let ts = resolve("Install: nginx:amd64 (1.18.0-1ubuntu1)");
        let after = Utc::now();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn resolve_opt_none_falls_back_to_now() {
        let before = Utc::now();
        let ts = resolve_opt(None);
        assert!(ts >= before);
    }

    #[test]
    fn resolve_opt_parses_iso_string() {
        let ts = resolve_opt(Some("2025-11-16T14:30:25Z"));
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2025, 11, 16, 14, 30, 25).unwrap()
        );
    }

    #[test]
    fn garbage_short_input_does_not_panic() {
        let _ = resolve("x");
        let _ = resolve("");
        let _ = resolve("1234-99-99T99:99:99+0000 nonsense");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn resolve_never_panics(line in ".*") {
                let _ = resolve(&line);
            }

            #[test]
            fn resolve_opt_never_panics(raw in proptest::option::of(".*")) {
                let _ = resolve_opt(raw.as_deref());
            }
        }
    }
}
