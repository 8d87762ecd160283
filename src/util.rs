use chrono::{DateTime, Local, TimeZone};

pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes().zip(b.bytes()).fold(0, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// `yyyy-MM-dd HH:mm:ss` in server local time
pub fn format_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use regex::Regex;

    #[test]
    fn compares_strings() {
        assert!(constant_time_compare("secret", "secret"));
        assert!(!constant_time_compare("secret", "secreT"));
        assert!(!constant_time_compare("secret", "secret1"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn formats_absolute_timestamps() {
        let formatted = format_datetime(&Utc::now());
        let pattern = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
        assert!(pattern.is_match(&formatted), "{formatted}");
    }
}
