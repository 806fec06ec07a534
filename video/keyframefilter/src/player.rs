// Copyright (C) 2022 Bohdan Shubenok <bohdan.shubenok@sigma.software>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at
// <https://mozilla.org/MPL/2.0/>.
//
// SPDX-License-Identifier: MPL-2.0

//! Key frame playback of H.264 video files.
//!
//! Builds and runs a pipeline of the form
//!
//! ```text
//! filesrc ! <demuxer> ! h264parse ! keyframefilter ! <decoder> ! videoconvert ! <sink>
//! ```
//!
//! The demuxer's source pads show up at runtime, only the one whose caps match the configured
//! media type is linked to the parser.

use gst::glib;
use gst::prelude::*;

use std::path::PathBuf;

use tracing::{debug, info, warn};

pub const H264_MEDIA_TYPE: &str = "video/x-h264";

pub const DEFAULT_DEMUXER: &str = "qtdemux";
pub const DEFAULT_PARSER: &str = "h264parse";
pub const DEFAULT_DECODER: &str = "avdec_h264";
pub const DEFAULT_CONVERTER: &str = "videoconvert";
pub const DEFAULT_SINK: &str = "autovideosink";

/// Name of the `keyframefilter` instance inside the pipeline built by [`build`].
pub const FILTER_NAME: &str = "keyframefilter";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Missing element {0}")]
    MissingElement(String),
    #[error("Input file {} does not exist", .0.display())]
    MissingFile(PathBuf),
    #[error("Input path {} is not valid UTF-8", .0.display())]
    InvalidPath(PathBuf),
    #[error("Failed to assemble pipeline: {0}")]
    Link(#[from] glib::BoolError),
    #[error("Failed to change pipeline state: {0}")]
    StateChange(#[from] gst::StateChangeError),
    #[error("Received error from {src}: {error} (debug: {debug:?})")]
    Bus {
        src: String,
        #[source]
        error: glib::Error,
        debug: Option<String>,
    },
}

impl Error {
    fn from_error_message(msg: &gst::Message, err: &gst::message::Error) -> Self {
        Error::Bus {
            src: msg
                .src()
                .map(|s| String::from(s.path_string()))
                .unwrap_or_else(|| String::from("None")),
            error: err.error(),
            debug: err.debug().map(String::from),
        }
    }
}

/// Element factories and media type used for the playback pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub location: PathBuf,
    pub demuxer: String,
    pub parser: String,
    pub decoder: String,
    pub converter: String,
    pub sink: String,
    /// Caps name of the demuxer pad that is linked to the parser.
    pub media_type: String,
}

impl Settings {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Settings {
            location: location.into(),
            demuxer: DEFAULT_DEMUXER.into(),
            parser: DEFAULT_PARSER.into(),
            decoder: DEFAULT_DECODER.into(),
            converter: DEFAULT_CONVERTER.into(),
            sink: DEFAULT_SINK.into(),
            media_type: H264_MEDIA_TYPE.into(),
        }
    }
}

fn make_element(factory: &str, name: &str) -> Result<gst::Element, Error> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|_| Error::MissingElement(factory.to_owned()))
}

/// Whether the first structure of `caps` is named `media_type`.
pub fn caps_have_media_type(caps: &gst::CapsRef, media_type: &str) -> bool {
    caps.structure(0).is_some_and(|s| s.has_name(media_type))
}

/// Builds the playback pipeline. The `keyframefilter` element must be registered already.
pub fn build(settings: &Settings) -> Result<gst::Pipeline, Error> {
    if !settings.location.is_file() {
        return Err(Error::MissingFile(settings.location.clone()));
    }

    let location = settings
        .location
        .to_str()
        .ok_or_else(|| Error::InvalidPath(settings.location.clone()))?;

    let pipeline = gst::Pipeline::builder().name("keyframe-play").build();

    let src = gst::ElementFactory::make("filesrc")
        .name("source")
        .property("location", location)
        .build()
        .map_err(|_| Error::MissingElement("filesrc".into()))?;
    let demux = make_element(&settings.demuxer, "demux")?;
    let parser = make_element(&settings.parser, "parser")?;
    let filter = make_element("keyframefilter", FILTER_NAME)?;
    let decoder = make_element(&settings.decoder, "decoder")?;
    let converter = make_element(&settings.converter, "converter")?;
    let sink = make_element(&settings.sink, "sink")?;

    pipeline.add_many([&src, &demux, &parser, &filter, &decoder, &converter, &sink])?;
    src.link(&demux)?;
    gst::Element::link_many([&parser, &filter, &decoder, &converter, &sink])?;

    let parser_weak = parser.downgrade();
    let media_type = settings.media_type.clone();
    demux.connect_pad_added(move |demux, src_pad| {
        if let Some(parser) = parser_weak.upgrade() {
            link_demuxer_pad(demux, src_pad, &parser, &media_type);
        }
    });

    Ok(pipeline)
}

/// Links a newly added demuxer source pad to the parser if its caps are `media_type`.
///
/// Pads of other media types and additional streams once the parser is linked are ignored. A
/// failed link is posted as an error on `demux`.
pub fn link_demuxer_pad(
    demux: &gst::Element,
    src_pad: &gst::Pad,
    parser: &gst::Element,
    media_type: &str,
) {
    let matches = src_pad
        .current_caps()
        .is_some_and(|caps| caps_have_media_type(&caps, media_type));
    if !matches {
        debug!(pad = %src_pad.name(), "Ignoring stream that is not {media_type}");
        return;
    }

    let sink_pad = parser.static_pad("sink").expect("parser without sink pad");
    if sink_pad.is_linked() {
        warn!(pad = %src_pad.name(), "Ignoring additional {media_type} stream");
        return;
    }

    match src_pad.link(&sink_pad) {
        Ok(_) => info!(pad = %src_pad.name(), "Linked {media_type} stream"),
        Err(err) => {
            gst::element_error!(
                demux,
                gst::CoreError::Negotiation,
                ["Failed to link {} to parser: {err:?}", src_pad.name()]
            );
        }
    }
}

/// Plays `pipeline` until end-of-stream or the first error.
///
/// The pipeline is set back to `Null` before returning, also on errors.
pub fn run(pipeline: &gst::Pipeline) -> Result<(), Error> {
    let bus = pipeline
        .bus()
        .expect("Pipeline without bus. Shouldn't happen!");

    let res = match pipeline.set_state(gst::State::Playing) {
        Ok(_) => wait_for_eos(pipeline, &bus),
        Err(err) => Err(bus_error(&bus).unwrap_or(Error::StateChange(err))),
    };

    with_teardown(res, pipeline.set_state(gst::State::Null))
}

// A teardown failure must not hide the error that ended playback.
fn with_teardown(
    res: Result<(), Error>,
    teardown: Result<gst::StateChangeSuccess, gst::StateChangeError>,
) -> Result<(), Error> {
    match teardown {
        Ok(_) => res,
        Err(err) if res.is_err() => {
            warn!("Failed to shut down pipeline: {err}");
            res
        }
        Err(err) => Err(err.into()),
    }
}

fn wait_for_eos(pipeline: &gst::Pipeline, bus: &gst::Bus) -> Result<(), Error> {
    for msg in bus.iter_timed(gst::ClockTime::NONE) {
        use gst::MessageView;

        match msg.view() {
            MessageView::Eos(..) => {
                info!("End of stream");
                return Ok(());
            }
            MessageView::Error(err) => return Err(Error::from_error_message(&msg, err)),
            MessageView::StateChanged(s) => {
                if s.src() == Some(pipeline.upcast_ref()) {
                    info!(
                        old = ?s.old(),
                        current = ?s.current(),
                        pending = ?s.pending(),
                        "Pipeline state changed"
                    );
                } else {
                    debug!(
                        src = ?s.src().map(|s| s.path_string()),
                        old = ?s.old(),
                        current = ?s.current(),
                        "State changed"
                    );
                }
            }
            _ => (),
        }
    }

    Ok(())
}

// A failed state change usually comes with an error message on the bus that describes the
// actual problem.
fn bus_error(bus: &gst::Bus) -> Option<Error> {
    let msg = bus.pop_filtered(&[gst::MessageType::Error])?;

    match msg.view() {
        gst::MessageView::Error(err) => Some(Error::from_error_message(&msg, err)),
        _ => None,
    }
}
