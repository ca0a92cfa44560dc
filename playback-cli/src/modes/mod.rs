pub mod play;
pub mod step;

use std::time::Duration;

use playback_engine::decoder::test_pattern::{
    TestPatternDecoder, TestPatternSource, TestToneDecoder, ToneTrack,
};
use playback_engine::decoder::AudioDecoder;
use playback_engine::render::RecordingSink;
use playback_engine::{spawn_player, PlayerConfig, PlayerEvent, PlayerHandle};
use playback_cli::cli_args::Clip;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct Session {
    pub handle: PlayerHandle,
    pub events: UnboundedReceiver<PlayerEvent>,
    pub sink: RecordingSink,
}

fn source_for(clip: &Clip) -> TestPatternSource {
    let mut source = TestPatternSource::new(clip.frames, clip.fps)
        .with_gop(clip.gop)
        .with_size(clip.width, clip.height);
    if let Some(sample_rate) = clip.audio_rate {
        // 20ms units.
        let samples_per_unit = (sample_rate / 50) as usize;
        let seconds = clip.frames as f64 / clip.fps;
        source = source.with_audio(ToneTrack {
            sample_rate,
            channel_count: 1,
            units: (seconds * 50.0).ceil() as usize,
            samples_per_unit,
        });
    }
    source
}

/// Spawns a player on the synthetic clip and feeds it every container event.
pub fn start(clip: &Clip, config: PlayerConfig) -> anyhow::Result<Session> {
    let source = source_for(clip);
    let decoder =
        TestPatternDecoder::new().with_latency(Duration::from_millis(clip.decode_latency_ms));
    let audio: Option<AudioDecoder> = clip
        .audio_rate
        .map(|_| Box::new(TestToneDecoder::new()) as AudioDecoder);
    let sink = RecordingSink::new();

    let (handle, events) = spawn_player(config, Box::new(decoder), audio, Box::new(sink.clone()));
    handle.push_all(source.events())?;
    Ok(Session {
        handle,
        events,
        sink,
    })
}
