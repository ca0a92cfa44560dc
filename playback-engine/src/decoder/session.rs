/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! A decode session: one codec instance with an explicit single in-flight slot.

use super::{Decodable, DecoderOutput};
use crate::error::{PlayerError, Result};
use crate::frame::CodedUnit;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Wraps a codec so that at most one submitted unit is awaiting its output.
///
/// The codec reports through a callback; the callback feeds an unbounded
/// channel that the session drains one output per submission. Because the
/// slot is checked on every `submit`, "the unit I just submitted" and "the
/// output I just received" always correspond.
pub struct DecodeSession<D: Decodable> {
    codec: D,
    sender: mpsc::UnboundedSender<DecoderOutput<D::Output>>,
    outputs: mpsc::UnboundedReceiver<DecoderOutput<D::Output>>,
    configured: bool,
    /// Timestamp of the unit whose output has not arrived yet.
    in_flight: Option<i64>,
    /// Submissions given up on whose outputs may still arrive.
    abandoned: usize,
    submitted: u64,
}

impl<D: Decodable> DecodeSession<D> {
    pub fn new(codec: D) -> Self {
        let (sender, outputs) = mpsc::unbounded_channel();
        Self {
            codec,
            sender,
            outputs,
            configured: false,
            in_flight: None,
            abandoned: 0,
            submitted: 0,
        }
    }

    pub fn configure(&mut self, config: &D::Config) -> Result<()> {
        let sender = self.sender.clone();
        self.codec.configure(
            config,
            Box::new(move |output| {
                // The session owns the receiver for its whole lifetime.
                let _ = sender.send(output);
            }),
        )?;
        self.configured = true;
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// `true` when nothing is awaiting an output.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Hands one unit to the codec. Fails if the slot is occupied.
    pub fn submit(&mut self, unit: Arc<CodedUnit>) -> Result<()> {
        if !self.configured {
            return Err(PlayerError::NotConfigured);
        }
        if self.in_flight.is_some() {
            return Err(PlayerError::DecodeSlotBusy);
        }
        self.in_flight = Some(unit.timestamp);
        self.submitted += 1;
        self.codec.decode(unit);
        Ok(())
    }

    /// Waits for the output of the in-flight unit. Late outputs of abandoned
    /// submissions are dropped on the way, which releases them.
    pub async fn output(&mut self) -> Result<D::Output> {
        let Some(timestamp) = self.in_flight else {
            return Err(PlayerError::NoDecodeInFlight);
        };

        loop {
            let received = match self.outputs.recv().await {
                Some(received) => received,
                None => {
                    return Err(PlayerError::DecodeFatal(
                        "decoder output channel closed".to_string(),
                    ))
                }
            };

            if self.abandoned > 0 {
                self.abandoned -= 1;
                match received {
                    Ok(_late) => {
                        log::debug!("[DECODE_SESSION] Discarding late output");
                        continue;
                    }
                    Err(e) => {
                        self.in_flight = None;
                        return Err(PlayerError::DecodeFatal(e));
                    }
                }
            }

            self.in_flight = None;
            return received.map_err(|e| {
                log::error!("[DECODE_SESSION] Decode of unit at {timestamp}us failed: {e}");
                PlayerError::DecodeFatal(e)
            });
        }
    }

    /// Submits a unit and waits for its output.
    pub async fn decode(&mut self, unit: Arc<CodedUnit>) -> Result<D::Output> {
        self.submit(unit)?;
        self.output().await
    }

    /// Like `decode`, but gives up after `timeout`. A timed-out submission is
    /// abandoned and `Ok(None)` is returned; its output is discarded whenever
    /// it shows up.
    pub async fn decode_within(
        &mut self,
        unit: Arc<CodedUnit>,
        timeout: Duration,
    ) -> Result<Option<D::Output>> {
        self.submit(unit)?;
        match tokio::time::timeout(timeout, self.output()).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                self.abandon();
                Ok(None)
            }
        }
    }

    /// Frees the slot without waiting for the in-flight output.
    pub fn abandon(&mut self) {
        if let Some(timestamp) = self.in_flight.take() {
            log::warn!("[DECODE_SESSION] Abandoning decode of unit at {timestamp}us");
            self.abandoned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::OutputCallback;
    use crate::frame::UnitKind;
    use std::sync::Mutex;

    /// Echoes the unit timestamp back. Outputs are held until `flush` is
    /// called so tests control when they arrive.
    #[derive(Default)]
    struct EchoDecoder {
        on_output: Option<OutputCallback<i64>>,
        pending: Arc<Mutex<Vec<i64>>>,
        fail_on: Option<i64>,
        immediate: bool,
    }

    impl EchoDecoder {
        fn flush(&self) {
            let pending: Vec<i64> = self.pending.lock().unwrap().drain(..).collect();
            if let Some(cb) = &self.on_output {
                for ts in pending {
                    cb(Ok(ts));
                }
            }
        }
    }

    impl Decodable for EchoDecoder {
        type Config = ();
        type Output = i64;

        fn configure(&mut self, _config: &(), on_output: OutputCallback<i64>) -> Result<()> {
            self.on_output = Some(on_output);
            Ok(())
        }

        fn decode(&mut self, unit: Arc<CodedUnit>) {
            if Some(unit.timestamp) == self.fail_on {
                if let Some(cb) = &self.on_output {
                    cb(Err("corrupt unit".to_string()));
                }
                return;
            }
            self.pending.lock().unwrap().push(unit.timestamp);
            if self.immediate {
                self.flush();
            }
        }
    }

    fn unit(ts: i64) -> Arc<CodedUnit> {
        Arc::new(CodedUnit::new(UnitKind::Sync, ts, 1, vec![]))
    }

    fn session(immediate: bool) -> DecodeSession<EchoDecoder> {
        let mut session = DecodeSession::new(EchoDecoder {
            immediate,
            ..Default::default()
        });
        session.configure(&()).unwrap();
        session
    }

    #[tokio::test]
    async fn submit_requires_configuration() {
        let mut session = DecodeSession::new(EchoDecoder::default());
        assert_eq!(session.submit(unit(0)), Err(PlayerError::NotConfigured));
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let mut session = session(false);
        session.submit(unit(1)).unwrap();
        assert_eq!(session.submit(unit(2)), Err(PlayerError::DecodeSlotBusy));
        session.codec.flush();
        assert_eq!(session.output().await, Ok(1));
        assert!(session.is_idle());
    }

    #[tokio::test]
    async fn decode_round_trips_in_order() {
        let mut session = session(true);
        for ts in 0..5 {
            assert_eq!(session.decode(unit(ts)).await, Ok(ts));
        }
        assert_eq!(session.submitted(), 5);
    }

    #[tokio::test]
    async fn output_without_submission_is_an_error() {
        let mut session = session(true);
        assert_eq!(session.output().await, Err(PlayerError::NoDecodeInFlight));
    }

    #[tokio::test]
    async fn codec_rejection_is_fatal() {
        let mut session = DecodeSession::new(EchoDecoder {
            immediate: true,
            fail_on: Some(3),
            ..Default::default()
        });
        session.configure(&()).unwrap();
        let err = session.decode(unit(3)).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(session.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_output_is_discarded_when_it_arrives_late() {
        let mut session = session(false);
        let first = session
            .decode_within(unit(10), Duration::from_millis(5))
            .await
            .unwrap();
        assert!(first.is_none());
        assert!(session.is_idle());

        session.submit(unit(11)).unwrap();
        session.codec.flush();
        assert_eq!(session.output().await, Ok(11));
    }
}
