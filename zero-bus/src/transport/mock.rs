//! Recording transport for tests.

use nix::errno::Errno;
use std::collections::VecDeque;

use super::Transport;
use crate::address::DeviceAddress;
use crate::message::{Message, MessageFlags};

/// A message as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub addr: DeviceAddress,
    pub flags: MessageFlags,
    /// Bytes written, or bytes handed back for a read
    pub data: Vec<u8>,
}

/// Transport that records every submission and answers reads from a queue.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// One entry per `transfer` call, in submission order
    pub submissions: Vec<Vec<Recorded>>,
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
    /// Data returned by successive read messages; reads past the end get zeros
    pub responses: VecDeque<Vec<u8>>,
    pub fail_timeout: Option<Errno>,
    pub fail_retries: Option<Errno>,
    pub fail_transfer: Option<Errno>,
}

impl MockTransport {
    pub fn with_responses<I: IntoIterator<Item = Vec<u8>>>(responses: I) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn failing_transfer(errno: Errno) -> Self {
        Self {
            fail_transfer: Some(errno),
            ..Default::default()
        }
    }
}

impl Transport for MockTransport {
    fn set_timeout(&mut self, ticks: u32) -> nix::Result<()> {
        if let Some(errno) = self.fail_timeout {
            return Err(errno);
        }
        self.timeout = Some(ticks);
        Ok(())
    }

    fn set_retries(&mut self, retries: u32) -> nix::Result<()> {
        if let Some(errno) = self.fail_retries {
            return Err(errno);
        }
        self.retries = Some(retries);
        Ok(())
    }

    fn transfer(&mut self, msgs: &mut [Message<'_>]) -> nix::Result<()> {
        if let Some(errno) = self.fail_transfer {
            return Err(errno);
        }

        let mut recorded = Vec::with_capacity(msgs.len());
        for msg in msgs.iter_mut() {
            let addr = msg.addr();
            let flags = msg.flags();
            let data = match msg {
                Message::Write { data, .. } => data.to_vec(),
                Message::Read { buffer, .. } => {
                    let response = self.responses.pop_front().unwrap_or_default();
                    buffer.fill(0);
                    let n = response.len().min(buffer.len());
                    buffer[..n].copy_from_slice(&response[..n]);
                    buffer.to_vec()
                }
            };
            recorded.push(Recorded { addr, flags, data });
        }
        self.submissions.push(recorded);
        Ok(())
    }
}
