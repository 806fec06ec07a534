// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

// Plays back only the key frames of the H.264 stream in a container file.
//
// Key frames of a file can be listed with
//
//   ffprobe -select_streams v -show_frames -show_entries frame=pict_type -of csv video.mp4
//
// and a file with a key frame every 10 frames can be made with
//
//   ffmpeg -i video.mp4 -vcodec libx264 -g 10 -acodec aac gop10.mp4

use anyhow::Error;
use clap::Parser;
use gst::prelude::*;
use tracing::info;
use tracing_subscriber::prelude::*;

use std::path::PathBuf;

use gstkeyframefilter::player::{self, Settings};

#[derive(Parser, Debug)]
#[clap(about, version)]
/// Play back only the key frames of an H.264 video
struct Args {
    /// Container file with an H.264 video stream in it
    path: PathBuf,
    /// Demuxer for the container format
    #[clap(long, default_value = player::DEFAULT_DEMUXER)]
    demuxer: String,
    /// H.264 decoder
    #[clap(long, default_value = player::DEFAULT_DECODER)]
    decoder: String,
    /// Video sink
    #[clap(long, default_value = player::DEFAULT_SINK)]
    sink: String,
}

fn initialize_logging(envvar_name: &str) -> Result<(), Error> {
    tracing_log::LogTracer::init()?;
    let env_filter = tracing_subscriber::EnvFilter::try_from_env(envvar_name)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true);
    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    initialize_logging("GST_KEYFRAME_PLAY_LOG")?;

    gst::init()?;
    gstkeyframefilter::plugin_register_static()?;

    let settings = Settings {
        demuxer: args.demuxer,
        decoder: args.decoder,
        sink: args.sink,
        ..Settings::new(args.path)
    };

    info!(location = %settings.location.display(), "Starting playback");

    let pipeline = player::build(&settings)?;
    player::run(&pipeline)?;

    if let Some(filter) = pipeline.by_name(player::FILTER_NAME) {
        info!(
            frames_seen = filter.property::<u64>("frames-seen"),
            keyframes = filter.property::<u64>("keyframes"),
            "Playback finished"
        );
    }

    Ok(())
}
