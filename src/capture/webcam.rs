use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;

use crate::capture::source::{CameraFrame, CaptureSource, snapshot_from};
use crate::types::error::{BoothError, BoothResult};
use crate::types::frame::Frame;

/// Requested camera mode; the scaler in the pipeline makes this an "ideal",
/// not a hard requirement.
pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

/// The default webcam, decoded to RGBA and mirrored like the on-screen
/// preview. The device is exclusively owned while this value lives and is
/// released on drop.
pub struct WebcamSource {
    pipeline: gst::Pipeline,
    sink: gst_app::AppSink,
    latest: Option<CameraFrame>,
}

impl WebcamSource {
    /// Build and start the capture pipeline. Failure here means the camera
    /// could not be opened at all; runtime errors (e.g. permission denied by
    /// the desktop portal) surface later through [`WebcamSource::take_error`].
    pub fn open() -> BoothResult<Self> {
        let pipeline_str = format!(
            "autovideosrc ! videoflip method=horizontal-flip ! videoconvert ! videoscale \
             ! video/x-raw,format=RGBA,width={IDEAL_WIDTH},height={IDEAL_HEIGHT} \
             ! appsink name=sink sync=false"
        );
        let pipeline = gst::parse::launch(&pipeline_str)
            .map_err(|e| BoothError::camera(format!("failed to build camera pipeline: {e}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| BoothError::camera("camera pipeline has an unexpected type"))?;

        let sink = pipeline
            .by_name("sink")
            .ok_or_else(|| BoothError::camera("camera pipeline is missing its appsink"))?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| BoothError::camera("camera sink has an unexpected type"))?;
        sink.set_property("emit-signals", false);
        sink.set_property("max-buffers", 2u32);
        sink.set_property("drop", true);

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| BoothError::camera(format!("camera refused to start: {e}")))?;
        tracing::info!("camera pipeline started");

        Ok(Self {
            pipeline,
            sink,
            latest: None,
        })
    }

    /// Non-blocking poll of the pipeline bus for fatal errors (no device,
    /// access denied, device unplugged).
    pub fn take_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        while let Some(msg) = bus.pop() {
            if let gst::MessageView::Error(err) = msg.view() {
                return Some(err.error().to_string());
            }
        }
        None
    }

    fn sample_to_frame(sample: &gst::Sample) -> Option<CameraFrame> {
        let caps = sample.caps()?;
        let info = gst_video::VideoInfo::from_caps(caps).ok()?;
        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;
        let data = map.as_slice();
        let expected = (info.width() as usize) * (info.height() as usize) * 4;
        if data.len() < expected {
            tracing::warn!(
                got = data.len(),
                expected,
                "camera buffer smaller than caps imply, dropping frame"
            );
            return None;
        }
        Some(CameraFrame {
            // Tight rows for RGBA at these sizes; ignore any trailing pad.
            data: data[..expected].to_vec(),
            width: info.width(),
            height: info.height(),
        })
    }
}

impl CaptureSource for WebcamSource {
    fn resolution(&self) -> Option<(u32, u32)> {
        self.latest.as_ref().map(|f| (f.width, f.height))
    }

    fn poll_frame(&mut self) -> Option<&CameraFrame> {
        while let Some(sample) = self.sink.try_pull_sample(gst::ClockTime::ZERO) {
            if let Some(frame) = Self::sample_to_frame(&sample) {
                self.latest = Some(frame);
            }
        }
        self.latest.as_ref()
    }

    fn snapshot(&mut self, container: (u32, u32)) -> BoothResult<Frame> {
        self.poll_frame();
        let frame = self
            .latest
            .as_ref()
            .ok_or_else(|| BoothError::capture("no frame available from the camera"))?;
        snapshot_from(frame, container)
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        // Release the device for other applications.
        self.pipeline.set_state(gst::State::Null).ok();
        tracing::info!("camera pipeline stopped");
    }
}
