// Streamed completion handle and server-sent event parsing
// Author: kelexine (https://github.com/kelexine)

use crate::error::Result;
use crate::models::ChatChunk;
use reqwest::blocking::Response;
use reqwest::StatusCode;
use std::io::{BufRead, BufReader, Read};
use tracing::debug;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A piece of assistant text.
    Delta(String),
    /// The provider sent `data: [DONE]`.
    Done,
}

/// Live response body of a successful request.
///
/// Read it raw through [`Read`], or decoded through [`StreamingResponse::events`].
pub struct StreamingResponse {
    status: StatusCode,
    reader: BufReader<Response>,
    finished: bool,
}

impl StreamingResponse {
    pub(crate) fn new(response: Response) -> Self {
        Self {
            status: response.status(),
            reader: BufReader::new(response),
            finished: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Iterate over the text deltas until `[DONE]` or end of body.
    pub fn events(&mut self) -> StreamEvents<'_> {
        StreamEvents { response: self }
    }

    /// Drain the stream and return the concatenated assistant text.
    pub fn collect_text(&mut self) -> Result<String> {
        let mut text = String::new();
        for event in self.events() {
            if let StreamEvent::Delta(delta) = event? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }
}

impl Read for StreamingResponse {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("finished", &self.finished)
            .finish()
    }
}

pub struct StreamEvents<'a> {
    response: &'a mut StreamingResponse,
}

impl Iterator for StreamEvents<'_> {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.response.finished {
            return None;
        }

        let mut line = String::new();
        loop {
            line.clear();
            match self.response.reader.read_line(&mut line) {
                Ok(0) => {
                    debug!("Completion stream ended without [DONE]");
                    self.response.finished = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.response.finished = true;
                    return Some(Err(e.into()));
                }
            }

            if let Some(event) = parse_sse_line(line.trim_end()) {
                if event == StreamEvent::Done {
                    self.response.finished = true;
                }
                return Some(Ok(event));
            }
        }
    }
}

/// Decode one SSE line. Comments, other fields, empty deltas and
/// undecodable chunks yield `None`.
pub fn parse_sse_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix("data:")?.trim();

    if data == "[DONE]" {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => chunk
            .delta_text()
            .filter(|text| !text.is_empty())
            .map(|text| StreamEvent::Delta(text.to_string())),
        Err(e) => {
            debug!("Skipping undecodable stream chunk: {}", e);
            None
        }
    }
}
