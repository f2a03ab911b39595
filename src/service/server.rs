use std::io::{BufRead, Write};

use crate::core::errors::Result;
use crate::service::facade::Facade;
use crate::service::{Request, Response};

/// Serve newline delimited JSON requests until the reader closes.
///
/// One request per line, one response per line, answered in order. A
/// line that fails to parse gets an error response with id 0 and the
/// loop continues.
pub fn serve<R: BufRead, W: Write>(facade: &Facade, reader: R, mut writer: W) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        tracing::debug!(request = %trimmed, "received");

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => facade.dispatch(req),
            Err(e) => Response::err(0, format!("malformed request: {e}")),
        };

        let encoded = serde_json::to_string(&response)?;
        tracing::debug!(response = %encoded, "answered");
        writer.write_all(encoded.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tracing::info!("input closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::keyring::directory::KeyDirectory;
    use crate::config::AgentPaths;
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn facade_in(dir: &std::path::Path) -> Facade {
        let paths = AgentPaths::resolve(Some(dir)).unwrap();
        paths.ensure().unwrap();
        let directory = Arc::new(KeyDirectory::new(&paths));
        directory.load().unwrap();
        Facade::new(directory)
    }

    #[test]
    fn version_round_trip() {
        let dir = tempdir().unwrap();
        let facade = facade_in(dir.path());
        let input = Cursor::new(b"{\"id\":1,\"method\":\"Version\"}\n".to_vec());
        let mut output = Vec::new();
        serve(&facade, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"id\":1"));
        assert!(text.contains("\"version\":1"));
    }

    #[test]
    fn malformed_line_gets_error_and_loop_continues() {
        let dir = tempdir().unwrap();
        let facade = facade_in(dir.path());
        let input = Cursor::new(b"not json\n{\"id\":2,\"method\":\"Version\"}\n".to_vec());
        let mut output = Vec::new();
        serve(&facade, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("malformed request"));
        assert!(lines[1].contains("\"version\":1"));
    }

    #[test]
    fn unknown_method_is_an_error_response() {
        let dir = tempdir().unwrap();
        let facade = facade_in(dir.path());
        let input = Cursor::new(b"{\"id\":7,\"method\":\"Nope\"}\n".to_vec());
        let mut output = Vec::new();
        serve(&facade, input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("\"id\":7"));
        assert!(text.contains("unknown method"));
    }
}
