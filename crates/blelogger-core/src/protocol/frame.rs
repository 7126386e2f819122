//! Response frames
//!
//! Every response is `%TAG%`, then `&`-prefixed fields, then `&%END%`.
//! File downloads are streamed, so their frame is written in three parts
//! instead of being built in memory.

/// File list response
pub const TAG_FILES: &str = "%FILES%";
/// Info response
pub const TAG_INFO: &str = "%INFO%";
/// Streamed file download
pub const TAG_FILE_DOWNLOAD: &str = "%FILEDL%";
/// Requested file could not be served
pub const TAG_FILE_ERROR: &str = "%FILEERR%";
/// Unrecognised command echo
pub const TAG_BAD_COMMAND: &str = "%BADCMD%";
/// Frame terminator
pub const TAG_END: &str = "%END%";

/// A response that fits in memory
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Names of every file on the card except the info file
    Files(Vec<String>),
    /// Provisioning date, battery voltage and storage figures
    Info {
        /// `M/D/YYYY` from the info file, empty if unreadable
        start_date: String,
        /// Battery volts, sent with two decimals
        voltage: f32,
        /// Free space in KB
        storage_kb: u64,
        /// Capacity in KB
        total_kb: u64,
    },
    /// A requested file could not be served
    FileError(String),
    /// Echo of an unrecognised command
    BadCommand(String),
}

impl Response {
    /// Encode the complete frame
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::Files(names) => frame(TAG_FILES, names.iter().map(String::as_str)),
            Response::Info {
                start_date,
                voltage,
                storage_kb,
                total_kb,
            } => {
                let voltage = format!("{:.2}", voltage);
                let storage_kb = storage_kb.to_string();
                let total_kb = total_kb.to_string();
                frame(
                    TAG_INFO,
                    [
                        start_date.as_str(),
                        voltage.as_str(),
                        storage_kb.as_str(),
                        total_kb.as_str(),
                    ],
                )
            }
            Response::FileError(name) => frame(TAG_FILE_ERROR, [name.as_str()]),
            Response::BadCommand(text) => frame(TAG_BAD_COMMAND, [text.as_str()]),
        }
    }
}

fn frame<'a>(tag: &str, fields: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let mut out = String::from(tag);
    for field in fields {
        out.push('&');
        out.push_str(field);
    }
    out.push('&');
    out.push_str(TAG_END);
    out.into_bytes()
}

/// Opening of a streamed download: `%FILEDL%&<name>&`
pub fn file_download_header(name: &str) -> Vec<u8> {
    format!("{}&{}&", TAG_FILE_DOWNLOAD, name).into_bytes()
}

/// Closing of a streamed download
pub fn file_download_trailer() -> Vec<u8> {
    format!("&{}", TAG_END).into_bytes()
}

/// Fields between the tag and the terminator of an in-memory frame
///
/// Returns `None` if `frame` is not `%TAG%&...&%END%`.
pub fn split_fields<'a>(frame: &'a str, tag: &str) -> Option<Vec<&'a str>> {
    let body = frame.strip_prefix(tag)?.strip_suffix(TAG_END)?;
    let body = body.strip_prefix('&')?;
    if body.is_empty() {
        return Some(Vec::new());
    }
    let body = body.strip_suffix('&')?;
    Some(body.split('&').collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(r: &Response) -> String {
        String::from_utf8(r.encode()).unwrap()
    }

    #[test]
    fn test_files_frame() {
        let r = Response::Files(vec!["01012024.txt".into(), "01022024.txt".into()]);
        assert_eq!(text(&r), "%FILES%&01012024.txt&01022024.txt&%END%");
    }

    #[test]
    fn test_empty_files_frame() {
        assert_eq!(text(&Response::Files(Vec::new())), "%FILES%&%END%");
        assert_eq!(split_fields("%FILES%&%END%", TAG_FILES), Some(vec![]));
    }

    #[test]
    fn test_info_frame() {
        let r = Response::Info {
            start_date: "1/2/2024".into(),
            voltage: 3.7,
            storage_kb: 1000,
            total_kb: 2048,
        };
        let s = text(&r);
        assert_eq!(s, "%INFO%&1/2/2024&3.70&1000&2048&%END%");
        assert_eq!(split_fields(&s, TAG_INFO).unwrap().len(), 4);
    }

    #[test]
    fn test_bad_command_frame() {
        assert_eq!(
            text(&Response::BadCommand("HELLO".into())),
            "%BADCMD%&HELLO&%END%"
        );
    }

    #[test]
    fn test_file_error_frame() {
        assert_eq!(
            text(&Response::FileError("nope.txt".into())),
            "%FILEERR%&nope.txt&%END%"
        );
    }

    #[test]
    fn test_download_parts() {
        let mut out = file_download_header("a.txt");
        out.extend_from_slice(b"data");
        out.extend(file_download_trailer());
        assert_eq!(out, b"%FILEDL%&a.txt&data&%END%".to_vec());
    }
}
