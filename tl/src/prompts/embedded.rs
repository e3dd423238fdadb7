//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Field extraction prompt
pub const EXTRACT: &str = include_str!("../../prompts/extract.pmt");

/// Assistant reply prompt
pub const RESPOND: &str = include_str!("../../prompts/respond.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "extract" => Some(EXTRACT),
        "respond" => Some(RESPOND),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_extract() {
        let extract = get_embedded("extract").unwrap();
        assert!(extract.contains("\"draft\""));
        assert!(extract.contains("{{{draft_json}}}"));
    }

    #[test]
    fn test_get_embedded_respond() {
        let respond = get_embedded("respond").unwrap();
        assert!(respond.contains("{{{status_json}}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("plan").is_none());
    }
}
