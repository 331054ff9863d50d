// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::node::Producer;
use crate::core::error::{GraphError, Result};
use crate::core::types::ColumnType;

/// Codecs accepted by [`OutputHandle::compress`].
pub const COMPRESSION_CODECS: [&str; 3] = ["video", "default", "raw"];

/// Lossy video encoder settings; `-1` leaves a setting to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEncodeParams {
    pub quality: i32,
    pub bitrate: i32,
    pub keyframe_distance: i32,
}

impl Default for VideoEncodeParams {
    fn default() -> Self {
        Self {
            quality: -1,
            bitrate: -1,
            keyframe_distance: -1,
        }
    }
}

/// How a video column is stored when it leaves the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "codec")]
pub enum EncodeOptions {
    #[default]
    Default,
    Raw,
    #[serde(rename = "h264")]
    Video(VideoEncodeParams),
}

/// A column produced by a node. Immutable; shared freely between consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHandle {
    graph_id: Arc<str>,
    producer: Producer,
    column: String,
    column_type: ColumnType,
    encode_options: Option<EncodeOptions>,
}

impl OutputHandle {
    pub(crate) fn new(
        graph_id: Arc<str>,
        producer: Producer,
        column: impl Into<String>,
        column_type: ColumnType,
    ) -> Self {
        let encode_options = (column_type == ColumnType::Video).then_some(EncodeOptions::Default);
        Self {
            graph_id,
            producer,
            column: column.into(),
            column_type,
            encode_options,
        }
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub fn producer(&self) -> Producer {
        self.producer
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// `None` for non-video columns.
    pub fn encode_options(&self) -> Option<&EncodeOptions> {
        self.encode_options.as_ref()
    }

    /// Copy of this handle with the named codec. `params` only applies to `video`.
    pub fn compress(&self, codec: &str, params: VideoEncodeParams) -> Result<OutputHandle> {
        self.assert_is_video()?;
        match codec {
            "video" => self.compress_video(params),
            "default" => self.compress_default(),
            "raw" => self.lossless(),
            other => Err(GraphError::ContractViolation(format!(
                "Compression codec '{}' is not supported. Available codecs are: {}",
                other,
                COMPRESSION_CODECS.join(", ")
            ))),
        }
    }

    pub fn compress_video(&self, params: VideoEncodeParams) -> Result<OutputHandle> {
        self.with_encode_options(EncodeOptions::Video(params))
    }

    pub fn compress_default(&self) -> Result<OutputHandle> {
        self.with_encode_options(EncodeOptions::Default)
    }

    pub fn lossless(&self) -> Result<OutputHandle> {
        self.with_encode_options(EncodeOptions::Raw)
    }

    fn with_encode_options(&self, options: EncodeOptions) -> Result<OutputHandle> {
        self.assert_is_video()?;
        Ok(OutputHandle {
            encode_options: Some(options),
            ..self.clone()
        })
    }

    fn assert_is_video(&self) -> Result<()> {
        if self.column_type != ColumnType::Video {
            return Err(GraphError::ContractViolation(format!(
                "Compression is only supported for video columns. Column '{}' is {}",
                self.column, self.column_type
            )));
        }
        Ok(())
    }
}
