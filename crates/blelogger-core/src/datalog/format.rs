//! On-card text formats
//!
//! Log records, dated log file names and the single-line info file.

use super::LogRecord;
use crate::time::CalendarTime;

/// Reserved file holding the provisioning date
pub const INFO_FILE_NAME: &str = "info.txt";

const INFO_KEY: &str = "startDate";

/// Log file name for the date of `time`: `MMDDYYYY.txt`
pub fn log_file_name(time: &CalendarTime) -> String {
    format!("{:02}{:02}{:04}.txt", time.month, time.day, time.year)
}

impl LogRecord {
    /// Text appended to the log file for this record
    pub fn to_text(&self) -> String {
        format!(
            "Sharp Sensor Value: {}\nDate: {}  {}\n",
            self.sensor_value,
            self.timestamp.date_string(),
            self.timestamp.time_string()
        )
    }
}

/// Info file content for a first boot on `date`
pub(super) fn info_line(date: &CalendarTime) -> String {
    format!("{}={}\n", INFO_KEY, date.date_string())
}

/// Value after the first `=` of an info line, without the line ending
pub fn parse_info_line(line: &str) -> Option<&str> {
    let (_, value) = line.split_once('=')?;
    Some(value.trim_end_matches(['\r', '\n']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_log_file_name_is_zero_padded() {
        let t = CalendarTime::new(2024, 3, 7, 0, 0, 0);
        assert_eq!(log_file_name(&t), "03072024.txt");
        let t = CalendarTime::new(2023, 12, 25, 0, 0, 0);
        assert_eq!(log_file_name(&t), "12252023.txt");
    }

    #[test]
    fn test_record_text() {
        let record = LogRecord::new(412, CalendarTime::new(2024, 3, 7, 14, 5, 9));
        assert_eq!(
            record.to_text(),
            "Sharp Sensor Value: 412\nDate: 3/7/2024  14:5:9\n"
        );
    }

    #[test]
    fn test_info_line_round_trip() {
        let line = info_line(&CalendarTime::new(2024, 1, 2, 8, 0, 0));
        assert_eq!(line, "startDate=1/2/2024\n");
        assert_eq!(parse_info_line(&line), Some("1/2/2024"));
    }

    #[test]
    fn test_parse_info_line_without_separator() {
        assert_eq!(parse_info_line("garbage"), None);
        assert_eq!(parse_info_line("startDate=\r\n"), Some(""));
    }
}
