//! Stream keys
//!
//! A sensor exposes one primary stream and, for server-side cameras, any
//! number of auxiliary GBuffer streams addressed by numeric id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one data stream of a sensor.
///
/// GBuffer ids are an open set: the core never validates them, only the
/// transport may reject an id it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKey {
    /// The sensor's main data channel
    Primary,
    /// An auxiliary graphics buffer
    #[serde(rename = "gbuffer")]
    GBuffer(u32),
}

impl StreamKey {
    /// GBuffer id, if this is an auxiliary stream
    #[inline]
    pub fn gbuffer_id(self) -> Option<u32> {
        match self {
            Self::Primary => None,
            Self::GBuffer(id) => Some(id),
        }
    }

    #[inline]
    pub fn is_primary(self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::GBuffer(id) => write!(f, "gbuffer[{id}]"),
        }
    }
}

/// GBuffer textures a simulator camera can stream.
///
/// The discriminant is the wire id used with [`StreamKey::GBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum GBufferTexture {
    SceneColor = 0,
    SceneDepth = 1,
    SceneStencil = 2,
    GBufferA = 3,
    GBufferB = 4,
    GBufferC = 5,
    GBufferD = 6,
    GBufferE = 7,
    GBufferF = 8,
    Velocity = 9,
    Ssao = 10,
    CustomDepth = 11,
    CustomStencil = 12,
}

impl GBufferTexture {
    /// All known textures, ordered by id
    pub const ALL: [Self; 13] = [
        Self::SceneColor,
        Self::SceneDepth,
        Self::SceneStencil,
        Self::GBufferA,
        Self::GBufferB,
        Self::GBufferC,
        Self::GBufferD,
        Self::GBufferE,
        Self::GBufferF,
        Self::Velocity,
        Self::Ssao,
        Self::CustomDepth,
        Self::CustomStencil,
    ];

    /// Resolve a wire id
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Stream key for this texture
    #[inline]
    pub fn stream_key(self) -> StreamKey {
        StreamKey::GBuffer(self.id())
    }

    /// Textures carrying a single depth/stencil channel
    pub fn is_single_channel(self) -> bool {
        matches!(
            self,
            Self::SceneDepth | Self::SceneStencil | Self::CustomDepth | Self::CustomStencil
        )
    }
}
