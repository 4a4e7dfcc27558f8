use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::TransportError;
use crate::http::HttpBodyStream;

/// Splits a newline-delimited JSON body into one string per non-blank line.
///
/// Chunk boundaries from the transport are arbitrary, so bytes are buffered until a
/// newline arrives. A trailing line without a newline is flushed when the body ends.
pub struct LineDecoder {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, TransportError>>,
    stream_closed: bool,
}

impl LineDecoder {
    /// Wraps a raw HTTP body stream.
    pub fn new(body: HttpBodyStream) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            stream_closed: false,
        }
    }

    fn push_line(&mut self, line: Vec<u8>) {
        let decoded = String::from_utf8(line)
            .map_err(|err| TransportError::decode(format!("invalid UTF-8 in stream chunk: {err}")));
        match decoded {
            Ok(text) if text.trim().is_empty() => {}
            other => self.pending.push_back(other),
        }
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for LineDecoder {
    type Item = Result<String, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(line) = this.pending.pop_front() {
                return Poll::Ready(Some(line));
            }

            if this.stream_closed {
                if this.buffer.is_empty() {
                    return Poll::Ready(None);
                }
                let rest = std::mem::take(&mut this.buffer);
                this.push_line(rest);
                continue;
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while let Some(line) = Self::drain_line(&mut this.buffer) {
                        this.push_line(line);
                    }
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => this.stream_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
