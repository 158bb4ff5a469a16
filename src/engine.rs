//! Transmit Engine (spec §4.4): Le-presence negotiation, transport retry,
//! escape fallback, and multi-frame reassembly on top of the APDU codec
//! and a [`ReaderTransport`].

use std::thread;
use std::time::Duration;

use crate::apdu::{self, StatusKind, StatusWord};
use crate::error::{classify_status, DesfireError, Result};
use crate::transport::{self, ReaderTransport};

/// Conservative per-frame payload budget for chunked writes (spec §4.4).
pub const WRITE_CHUNK_SIZE: usize = 40;

#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Delay before the one-shot retry after a transport failure.
    pub retry_delay: Duration,
    /// Per-frame payload budget for chunked writes.
    pub write_chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            retry_delay: Duration::from_millis(80),
            write_chunk_size: WRITE_CHUNK_SIZE,
        }
    }
}

/// Wraps a [`ReaderTransport`] with the Le-negotiation, retry, escape
/// fallback, and reassembly policy of spec §4.4.
///
/// `prefer_no_le` is sticky reader-quirk state (spec §9): once a reader's
/// accepted form is learned, it stays in effect for the rest of the
/// session.
pub struct Engine<T: ReaderTransport> {
    transport: T,
    prefer_no_le: bool,
    config: EngineConfig,
}

impl<T: ReaderTransport> Engine<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Engine {
            transport,
            prefer_no_le: true,
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn prefer_no_le(&self) -> bool {
        self.prefer_no_le
    }

    /// Explicit teardown hook (spec §3 "Lifecycles"): forget the learned
    /// Le-preference, so the next command re-negotiates it from scratch.
    /// Session key material is a separate concern, cleared by
    /// [`crate::session::SessionState::clear_auth`].
    pub fn reset(&mut self) {
        self.prefer_no_le = true;
    }

    /// Issue a no-data command (case 1/2), transparently reassembling any
    /// `91 AF` continuation into a single payload.
    pub fn transceive(&mut self, ins: u8) -> Result<(StatusWord, Vec<u8>)> {
        let (sw, data) = self.transceive_frames(|prefer_no_le| apdu::build_command(ins, prefer_no_le))?;
        self.reassemble(sw, data)
    }

    /// Issue a command carrying `data` (case 3/4), transparently
    /// reassembling any `91 AF` continuation into a single payload.
    pub fn transceive_with_data(&mut self, ins: u8, data: &[u8]) -> Result<(StatusWord, Vec<u8>)> {
        let (sw, resp) =
            self.transceive_frames(|prefer_no_le| apdu::build_command_with_data(ins, data, prefer_no_le))?;
        self.reassemble(sw, resp)
    }

    /// Chunked write: emit `header ‖ payload[..chunk]` under `ins`, then
    /// continue with `ADDITIONAL_FRAME` frames carrying the remaining
    /// payload until it is exhausted or the card stops requesting more.
    pub fn write_chunked(&mut self, ins: u8, header: &[u8], payload: &[u8]) -> Result<(StatusWord, Vec<u8>)> {
        let chunk = self.config.write_chunk_size;
        let first_room = chunk.min(payload.len());
        let mut first_frame = header.to_vec();
        first_frame.extend_from_slice(&payload[..first_room]);

        let (mut sw, mut data) = self.transceive_frames(|prefer_no_le| {
            apdu::build_command_with_data(ins, &first_frame, prefer_no_le)
        })?;

        let mut offset = first_room;
        while sw.is_continuation() && offset < payload.len() {
            let end = (offset + chunk).min(payload.len());
            let slice = &payload[offset..end];
            let (next_sw, next_data) = self.transceive_frames(|prefer_no_le| {
                apdu::build_command_with_data(apdu::ADDITIONAL_FRAME, slice, prefer_no_le)
            })?;
            sw = next_sw;
            data = next_data;
            offset = end;
        }

        Ok((sw, data))
    }

    /// Single logical exchange through the Le-negotiation/retry/escape
    /// policy with no data, *without* continuation reassembly. Used by the
    /// authentication handshakes, which treat `91 AF` as "send the next
    /// handshake step", not "fetch more read data".
    pub fn raw_exchange(&mut self, ins: u8) -> Result<(StatusWord, Vec<u8>)> {
        self.transceive_frames(|prefer_no_le| apdu::build_command(ins, prefer_no_le))
    }

    /// As [`Self::raw_exchange`], carrying `data`.
    pub fn raw_exchange_with_data(&mut self, ins: u8, data: &[u8]) -> Result<(StatusWord, Vec<u8>)> {
        self.transceive_frames(|prefer_no_le| apdu::build_command_with_data(ins, data, prefer_no_le))
    }

    /// Reassemble a `91 AF` continuation chain following an initial
    /// `(sw, data)` pair into one accumulated payload.
    fn reassemble(&mut self, mut sw: StatusWord, mut data: Vec<u8>) -> Result<(StatusWord, Vec<u8>)> {
        while sw.is_continuation() {
            let (next_sw, next_data) =
                self.transceive_frames(|prefer_no_le| apdu::build_command(apdu::ADDITIONAL_FRAME, prefer_no_le))?;
            data.extend_from_slice(&next_data);
            sw = next_sw;
        }
        Ok((sw, data))
    }

    /// Send one logical command through the Le-negotiation / retry /
    /// escape-fallback policy of spec §4.4. Does not expand continuation
    /// chains — callers that want reassembly go through
    /// [`Self::transceive`]/[`Self::transceive_with_data`]/
    /// [`Self::write_chunked`].
    fn transceive_frames(&mut self, build: impl Fn(bool) -> Vec<u8>) -> Result<(StatusWord, Vec<u8>)> {
        let pref1 = self.prefer_no_le;
        let frame1 = build(pref1);
        let raw1 = self.send_with_retry(&frame1)?;

        if let Some((sw1, data1)) = apdu::parse_response(&raw1) {
            match sw1.kind() {
                StatusKind::Success | StatusKind::Continuation => {
                    self.prefer_no_le = pref1;
                    return Ok((sw1, data1.to_vec()));
                }
                StatusKind::LengthError => {
                    log::debug!(
                        "length error {:02X}{:02X} with prefer_no_le={pref1}; flipping Le",
                        sw1.sw1,
                        sw1.sw2
                    );
                }
                StatusKind::Other => return Ok((sw1, data1.to_vec())),
            }
        }

        let pref2 = !pref1;
        let frame2 = build(pref2);
        let raw2 = self.send_with_retry(&frame2)?;

        if let Some((sw2, data2)) = apdu::parse_response(&raw2) {
            match sw2.kind() {
                StatusKind::Success | StatusKind::Continuation => {
                    self.prefer_no_le = pref2;
                    return Ok((sw2, data2.to_vec()));
                }
                _ => return Ok((sw2, data2.to_vec())),
            }
        }

        // Both forms produced an empty or sub-2-byte response.
        if self.transport.supports_escape() {
            if let Some(result) = self.try_escape_fallback(&frame1)? {
                self.prefer_no_le = pref1;
                return Ok(result);
            }
        }

        log::warn!("escape fallback unavailable or exhausted; retrying Le toggle as a last resort");
        let frame3 = build(pref1);
        let raw3 = self.send_with_retry(&frame3)?;
        apdu::parse_response(&raw3)
            .map(|(sw, d)| (sw, d.to_vec()))
            .ok_or_else(|| DesfireError::Protocol("response shorter than 2 bytes".into()))
    }

    fn try_escape_fallback(&mut self, apdu_frame: &[u8]) -> Result<Option<(StatusWord, Vec<u8>)>> {
        let candidates = [
            transport::escape_raw(apdu_frame),
            transport::escape_in_data_exchange(apdu_frame),
            transport::escape_in_communicate_thru(apdu_frame),
        ];
        for candidate in candidates {
            let resp = self.transport.escape(&candidate)?;
            if let Some(payload) = transport::parse_pn532_response(&resp) {
                if let Some((sw, data)) = apdu::parse_response(payload) {
                    return Ok(Some((sw, data.to_vec())));
                }
            }
        }
        Ok(None)
    }

    fn send_with_retry(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        log::trace!("-> {}", hex::encode_upper(frame));
        let result = match self.transport.transmit(frame) {
            Ok(resp) => Ok(resp),
            Err(e) => {
                log::warn!("transport error, retrying once after backoff: {e}");
                thread::sleep(self.config.retry_delay);
                self.transport.transmit(frame)
            }
        };
        if let Ok(resp) = &result {
            log::trace!("<- {}", hex::encode_upper(resp));
        }
        result
    }
}

/// Translate a final (non-success, non-continuation) status word into a
/// typed [`DesfireError`] (spec §7).
pub fn status_to_error(sw: StatusWord) -> DesfireError {
    classify_status(sw.sw1, sw.sw2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted transport for engine unit tests: a queue of responses
    /// keyed off nothing but call order, optionally simulating one
    /// transport failure.
    struct ScriptedTransport {
        responses: RefCell<VecDeque<Result<Vec<u8>>>>,
        sent: RefCell<Vec<Vec<u8>>>,
        escape_responses: RefCell<VecDeque<Vec<u8>>>,
        escape_supported: bool,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<Vec<u8>>>) -> Self {
            ScriptedTransport {
                responses: RefCell::new(responses.into()),
                sent: RefCell::new(Vec::new()),
                escape_responses: RefCell::new(VecDeque::new()),
                escape_supported: false,
            }
        }

        fn with_escape(mut self, responses: Vec<Vec<u8>>) -> Self {
            self.escape_supported = true;
            self.escape_responses = RefCell::new(responses.into());
            self
        }
    }

    impl ReaderTransport for ScriptedTransport {
        fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
            self.sent.borrow_mut().push(command.to_vec());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(DesfireError::Transport("script exhausted".into())))
        }

        fn escape(&mut self, _command: &[u8]) -> Result<Vec<u8>> {
            Ok(self.escape_responses.borrow_mut().pop_front().unwrap_or_default())
        }

        fn supports_escape(&self) -> bool {
            self.escape_supported
        }
    }

    #[test]
    fn success_on_first_le_form() {
        let transport = ScriptedTransport::new(vec![Ok(vec![0x01, 0x02, 0x91, 0x00])]);
        let mut engine = Engine::new(transport);
        let (sw, data) = engine.transceive(0x60).unwrap();
        assert!(sw.is_success());
        assert_eq!(data, vec![0x01, 0x02]);
        assert!(engine.prefer_no_le());
    }

    #[test]
    fn length_error_flips_le_preference() {
        let transport = ScriptedTransport::new(vec![
            Ok(vec![0x91, 0x7E]),
            Ok(vec![0x01, 0x91, 0x00]),
        ]);
        let mut engine = Engine::new(transport);
        let (sw, data) = engine.transceive(0x60).unwrap();
        assert!(sw.is_success());
        assert_eq!(data, vec![0x01]);
        assert!(!engine.prefer_no_le());
    }

    #[test]
    fn continuation_is_reassembled_transparently() {
        let transport = ScriptedTransport::new(vec![
            Ok(vec![0xAA, 0xBB, 0x91, 0xAF]),
            Ok(vec![0xCC, 0xDD, 0x91, 0xAF]),
            Ok(vec![0xEE, 0x91, 0x00]),
        ]);
        let mut engine = Engine::new(transport);
        let (sw, data) = engine.transceive(0x60).unwrap();
        assert!(sw.is_success());
        assert_eq!(data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);
    }

    #[test]
    fn transport_error_is_retried_once() {
        let transport = ScriptedTransport::new(vec![
            Err(DesfireError::Transport("usb hiccup".into())),
            Ok(vec![0x91, 0x00]),
        ]);
        let mut engine = Engine::with_config(
            transport,
            EngineConfig {
                retry_delay: Duration::from_millis(1),
                ..EngineConfig::default()
            },
        );
        let (sw, data) = engine.transceive(0x60).unwrap();
        assert!(sw.is_success());
        assert!(data.is_empty());
    }

    #[test]
    fn escape_fallback_used_on_short_response_both_forms() {
        let transport = ScriptedTransport::new(vec![Ok(vec![]), Ok(vec![])])
            .with_escape(vec![vec![0xD5, 0x41, 0x00, 0x12, 0x91, 0x00]]);
        let mut engine = Engine::new(transport);
        let (sw, data) = engine.transceive(0x60).unwrap();
        assert!(sw.is_success());
        assert_eq!(data, vec![0x12]);
    }

    #[test]
    fn chunked_write_splits_at_conservative_budget() {
        // 130-byte payload: 40 + 40 + 40 + 10, matching spec §8 scenario 6.
        let transport = ScriptedTransport::new(vec![
            Ok(vec![0x91, 0xAF]),
            Ok(vec![0x91, 0xAF]),
            Ok(vec![0x91, 0xAF]),
            Ok(vec![0x91, 0x00]),
        ]);
        let mut engine = Engine::new(transport);
        let payload = vec![0u8; 130];
        let header = [0x01, 0x00, 0x00, 0x00, 130u8, 0, 0];
        let (sw, _) = engine.write_chunked(0x3D, &header, &payload).unwrap();
        assert!(sw.is_success());

        let sent = &engine.transport().sent.borrow();
        assert_eq!(sent.len(), 4);
        // header (7) + 40 bytes of payload on the lead frame.
        assert_eq!(sent[0][4] as usize, 7 + 40);
        assert_eq!(sent[1][4], 40);
        assert_eq!(sent[2][4], 40);
        assert_eq!(sent[3][4], 10);
    }
}
