use super::handler::Dispatcher;
use super::types::{Cmd, Reply};
use crate::utils::error_handling::{ProtoError, ProtoResult};
use log::{debug, error};
use std::io::{BufRead, Write};

/// Newline-delimited JSON codec for Cmd and Reply.
///
/// Works over any reader/writer pair; how the bytes get there is up to the
/// caller.
#[derive(Debug, Default)]
pub struct JsonProtocol {
    handled: u64,
    malformed: u64,
}

impl JsonProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a command from raw bytes
    pub fn decode_cmd(&self, bytes: &[u8]) -> ProtoResult<Cmd> {
        debug!("Decoding command: {}", String::from_utf8_lossy(bytes));
        serde_json::from_slice(bytes).map_err(|e| ProtoError::format(&e.to_string()))
    }

    /// Encode a reply to raw bytes
    pub fn encode_reply(&self, reply: &Reply) -> ProtoResult<Vec<u8>> {
        let bytes = serde_json::to_vec(reply)?;
        debug!("Encoded reply: {}", String::from_utf8_lossy(&bytes));
        Ok(bytes)
    }

    /// Answer every command line read from `reader` with one reply line.
    ///
    /// Lines that do not decode get a reply carrying the decode error, plus
    /// whatever `Cmd` and `RelayId` could be salvaged from the line. Returns
    /// when the reader is exhausted.
    pub fn serve<R, W, F>(&mut self, mut reader: R, mut writer: W, mut respond: F) -> ProtoResult<()>
    where
        R: BufRead,
        W: Write,
        F: FnMut(&Cmd) -> Reply,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let line = buf.as_slice();

            let reply = match self.decode_cmd(line) {
                Ok(cmd) => {
                    self.handled += 1;
                    respond(&cmd)
                }
                Err(e) => {
                    error!("Failed to decode command: {}", e);
                    self.malformed += 1;
                    malformed_reply(line, &e)
                }
            };

            let bytes = self.encode_reply(&reply)?;
            writer.write_all(&bytes)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        Ok(())
    }

    /// `serve` with routing through `dispatcher`
    pub fn serve_dispatcher<R, W>(&mut self, reader: R, writer: W, dispatcher: &Dispatcher) -> ProtoResult<()>
    where
        R: BufRead,
        W: Write,
    {
        self.serve(reader, writer, |cmd| dispatcher.dispatch(cmd))
    }

    /// Commands decoded so far
    pub fn handled_count(&self) -> u64 {
        self.handled
    }

    /// Lines that failed to decode so far
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }
}

/// Error reply for a line that is not a valid `Cmd`, keeping `Cmd` and
/// `RelayId` when the line is at least a JSON object so a relay can route it.
fn malformed_reply(line: &[u8], err: &ProtoError) -> Reply {
    let fields: Option<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(line).ok();
    let field = |name: &str| {
        fields
            .as_ref()
            .and_then(|f| f.get(name))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Reply {
        cmd: field("Cmd"),
        error: err.to_string(),
        data: None,
        relay_id: field("RelayId"),
    }
}
