use anyhow::Context;
use log::info;
use playback_cli::cli_args::Play;
use playback_engine::{PlayerConfig, PlayerEvent, SeekTarget, Status};

use super::start;

fn describe(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::Status { status } => format!("status {status:?}"),
        PlayerEvent::Config { config } => format!(
            "decoder {} {}x{}",
            config.codec, config.coded_width, config.coded_height
        ),
        PlayerEvent::Metadata { metadata } => format!(
            "video {} frames at {} fps",
            metadata.total_frames, metadata.frame_rate
        ),
        PlayerEvent::AudioMetadata { metadata } => format!(
            "audio {} Hz x{} ({} samples)",
            metadata.sample_rate, metadata.channel_count, metadata.total_samples
        ),
        PlayerEvent::FrameUpdated { frame } => format!("frame {frame}"),
        PlayerEvent::TimeUpdated { time } => format!("time {time:.3}s"),
        PlayerEvent::Ended => "ended".to_string(),
        PlayerEvent::AudioReady { buffer } => {
            format!("audio ready ({:.2}s)", buffer.duration_secs())
        }
        PlayerEvent::Ack { request, error } => match error {
            Some(error) => format!("{request:?} failed: {error}"),
            None => format!("{request:?} ok"),
        },
        PlayerEvent::Error { error } => format!("error: {error}"),
    }
}

fn print(event: &PlayerEvent, json: bool) -> anyhow::Result<()> {
    if json {
        // Audio buffers are too large for a log line.
        if let PlayerEvent::AudioReady { buffer } = event {
            println!(
                "{}",
                serde_json::json!({"type": "audioReady", "samples": buffer.len()})
            );
        } else {
            println!("{}", serde_json::to_string(event)?);
        }
    } else {
        println!("{}", describe(event));
    }
    Ok(())
}

pub async fn play(opt: Play) -> anyhow::Result<()> {
    let mut config = PlayerConfig::default();
    config.frame_cache_budget_bytes = opt.cache_budget;

    let mut session = start(&opt.clip, config)?;
    let state = session.handle.state().await?;
    if state.status != Status::Ready {
        anyhow::bail!("clip did not load (status {:?})", state.status);
    }

    session
        .handle
        .speed(opt.speed)
        .await
        .context("invalid speed")?;

    let seek = match (opt.seek_frame, opt.seek_time) {
        (Some(frame), _) => Some(SeekTarget::Frame(frame)),
        (None, Some(time)) => Some(SeekTarget::Time(time)),
        (None, None) => None,
    };
    if let Some(target) = seek {
        let ack = session.handle.seek(target).await.context("seek failed")?;
        info!("Seeked to frame {}", ack.frame_index);
    }

    if opt.reverse {
        session.handle.reverse().await.context("reverse failed")?;
    } else {
        session.handle.play().await.context("play failed")?;
    }

    while let Some(event) = session.events.recv().await {
        print(&event, opt.json)?;
        match event {
            PlayerEvent::Ended => break,
            PlayerEvent::Error { error } => anyhow::bail!("playback failed: {error}"),
            _ => {}
        }
    }

    let stats = session.handle.cache_stats().await?;
    info!(
        "Presented {} frames; cache hits {} misses {} evictions {}",
        session.sink.presented().len(),
        stats.hits,
        stats.misses,
        stats.evictions
    );
    Ok(())
}
