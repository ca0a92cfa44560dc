use anyhow::{anyhow, Context};
use image::RgbaImage;
use log::info;
use playback_cli::cli_args::Step;
use playback_engine::crop::CropRect;
use playback_engine::{PlayerConfig, PlayerError, SeekTarget};

use super::start;

pub async fn step(opt: Step) -> anyhow::Result<()> {
    let session = start(&opt.clip, PlayerConfig::default())?;
    std::fs::create_dir_all(&opt.out_dir)
        .with_context(|| format!("creating {}", opt.out_dir.display()))?;

    if opt.start > 0 {
        session
            .handle
            .seek(SeekTarget::Frame(opt.start))
            .await
            .context("seek failed")?;
    }

    let insets = opt.crop.map(|c| c.0).unwrap_or_default();
    let rect = CropRect::from_insets(opt.clip.width, opt.clip.height, insets);
    if rect.is_empty() {
        anyhow::bail!("crop leaves nothing of a {}x{} frame", opt.clip.width, opt.clip.height);
    }

    for _ in 0..opt.count {
        let ack = match session.handle.next().await {
            Ok(ack) => ack,
            Err(PlayerError::EndOfStream) => {
                info!("Reached the last frame");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        let frame = ack.frame_index - 1;
        let snapshot = ack
            .snapshot
            .ok_or_else(|| anyhow!("frame {frame} came back without pixels"))?;
        let cropped = rect.apply(&snapshot);

        let image = RgbaImage::from_raw(cropped.width, cropped.height, cropped.rgba.to_vec())
            .ok_or_else(|| anyhow!("frame {frame} has an inconsistent size"))?;
        let path = opt.out_dir.join(format!("frame_{frame:05}.png"));
        image
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote {} ({}x{})", path.display(), cropped.width, cropped.height);
    }
    Ok(())
}
