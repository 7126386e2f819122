//! Protocol commands
//!
//! Requests the paired app sends over the link, and the parser that turns a
//! received line into one.

use serde::{Deserialize, Serialize};

/// List the files on the card
pub const DOWNLOAD_REQUEST: &str = "REQ+DOWNLOAD";
/// Start date, battery and storage figures
pub const INFO_REQUEST: &str = "REQ+DATA";
/// Prefix of a single-file download; the name follows the first `&`
pub const FILE_REQUEST_PREFIX: &str = "REQ+FILE";
/// Field separator
pub const FIELD_SEPARATOR: char = '&';

/// A request received from the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `REQ+DOWNLOAD`
    DownloadRequest,
    /// `REQ+DATA`
    InfoRequest,
    /// `REQ+FILE&<name>`
    FileRequest(String),
    /// Anything else, kept verbatim for the error echo
    Unknown(String),
}

impl Command {
    /// Classify one received command line
    ///
    /// Download and info requests must match exactly. A file request only
    /// needs the `REQ+FILE` prefix and a separator; everything after the
    /// first `&` is the file name. A file request without a separator is
    /// unknown.
    pub fn parse(text: &str) -> Self {
        match text {
            DOWNLOAD_REQUEST => Command::DownloadRequest,
            INFO_REQUEST => Command::InfoRequest,
            _ if text.starts_with(FILE_REQUEST_PREFIX) => match text.split_once(FIELD_SEPARATOR) {
                Some((_, name)) => Command::FileRequest(name.to_string()),
                None => Command::Unknown(text.to_string()),
            },
            _ => Command::Unknown(text.to_string()),
        }
    }

    /// Wire form of the command, as the app would send it
    pub fn to_wire(&self) -> String {
        match self {
            Command::DownloadRequest => DOWNLOAD_REQUEST.to_string(),
            Command::InfoRequest => INFO_REQUEST.to_string(),
            Command::FileRequest(name) => {
                format!("{}{}{}", FILE_REQUEST_PREFIX, FIELD_SEPARATOR, name)
            }
            Command::Unknown(raw) => raw.clone(),
        }
    }

    /// Wire form with a trailing newline
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_wire().into_bytes();
        bytes.push(b'\n');
        bytes
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::DownloadRequest => "download",
            Command::InfoRequest => "info",
            Command::FileRequest(_) => "file",
            Command::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matches() {
        assert_eq!(Command::parse("REQ+DOWNLOAD"), Command::DownloadRequest);
        assert_eq!(Command::parse("REQ+DATA"), Command::InfoRequest);
        assert_eq!(
            Command::parse("REQ+DOWNLOADS"),
            Command::Unknown("REQ+DOWNLOADS".into())
        );
        assert_eq!(Command::parse("req+data"), Command::Unknown("req+data".into()));
    }

    #[test]
    fn test_file_request_name_after_first_separator() {
        assert_eq!(
            Command::parse("REQ+FILE&03072024.txt"),
            Command::FileRequest("03072024.txt".into())
        );
        assert_eq!(
            Command::parse("REQ+FILE&a&b"),
            Command::FileRequest("a&b".into())
        );
        assert_eq!(Command::parse("REQ+FILE&"), Command::FileRequest(String::new()));
    }

    #[test]
    fn test_file_request_without_separator() {
        assert_eq!(Command::parse("REQ+FILE"), Command::Unknown("REQ+FILE".into()));
    }

    #[test]
    fn test_to_bytes() {
        let cmd = Command::FileRequest("x.txt".into());
        assert_eq!(cmd.to_bytes(), b"REQ+FILE&x.txt\n".to_vec());
        assert_eq!(Command::parse(&cmd.to_wire()), cmd);
    }
}
