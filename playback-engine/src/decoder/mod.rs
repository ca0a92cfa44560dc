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

//! The common interface for platform-specific decoders.

use crate::audio::AudioSegment;
use crate::error::Result;
use crate::frame::{AudioDecoderConfig, CodedUnit, DecodedPicture, VideoDecoderConfig};
use std::sync::Arc;

mod session;
pub mod test_pattern;

pub use session::DecodeSession;

/// What a codec hands back for one accepted unit: the decoded output or the
/// reason it rejected the unit.
pub type DecoderOutput<T> = std::result::Result<T, String>;

/// Invoked by the codec, possibly from another thread, once per accepted unit.
pub type OutputCallback<T> = Box<dyn Fn(DecoderOutput<T>) + Send + Sync>;

/// A trait that abstracts over the platform codec (WebCodecs in the browser,
/// a native library elsewhere, or the synthetic test pattern).
///
/// Implementations must emit exactly one output per `decode` call, in
/// submission order.
pub trait Decodable: Send {
    type Config;
    type Output: Send + 'static;

    /// (Re)configures the codec. `on_output` replaces any previous callback.
    fn configure(&mut self, config: &Self::Config, on_output: OutputCallback<Self::Output>)
        -> Result<()>;

    /// Submits one coded unit. Fire-and-forget; the result arrives through
    /// the output callback.
    fn decode(&mut self, unit: Arc<CodedUnit>);
}

/// A boxed video codec as owned by the player.
pub type VideoDecoder = Box<dyn Decodable<Config = VideoDecoderConfig, Output = DecodedPicture>>;

/// A boxed audio codec as owned by the player.
pub type AudioDecoder = Box<dyn Decodable<Config = AudioDecoderConfig, Output = AudioSegment>>;

impl<D: Decodable + ?Sized> Decodable for Box<D> {
    type Config = D::Config;
    type Output = D::Output;

    fn configure(
        &mut self,
        config: &Self::Config,
        on_output: OutputCallback<Self::Output>,
    ) -> Result<()> {
        (**self).configure(config, on_output)
    }

    fn decode(&mut self, unit: Arc<CodedUnit>) {
        (**self).decode(unit)
    }
}
