//! Map rendering engine sink.

use courier_core::{GeoBounds, GeoPoint};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Pickup,
    Delivery,
    Courier,
}

/// A draw or camera command pushed to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MapCommand {
    PlaceMarker { kind: MarkerKind, point: GeoPoint },
    DrawRoute { points: Vec<GeoPoint> },
    ClearRoute,
    FitBounds { bounds: GeoBounds, padding_px: f64 },
    FlyTo { center: GeoPoint, zoom: f64 },
}

/// External map renderer.
///
/// Consumes commands; nothing flows back into the core.
pub trait MapEngine: Send + Sync {
    fn push(&self, command: MapCommand);
}

/// Engine that only logs what it would draw
#[derive(Debug, Default)]
pub struct LogMapEngine;

impl MapEngine for LogMapEngine {
    fn push(&self, command: MapCommand) {
        match &command {
            MapCommand::PlaceMarker { kind, point } => {
                info!(marker = ?kind, %point, "Place marker")
            }
            MapCommand::DrawRoute { points } => info!(points = points.len(), "Draw route"),
            MapCommand::ClearRoute => info!("Clear route"),
            MapCommand::FitBounds { bounds, padding_px } => info!(
                south_west = %bounds.south_west,
                north_east = %bounds.north_east,
                padding_px,
                "Fit bounds"
            ),
            MapCommand::FlyTo { center, zoom } => info!(%center, zoom, "Fly to"),
        }
    }
}

/// Engine that keeps every command it receives
#[derive(Debug, Default)]
pub struct RecordingMapEngine {
    commands: Mutex<Vec<MapCommand>>,
}

impl RecordingMapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<MapCommand> {
        self.commands.lock().clone()
    }

    /// Drain recorded commands
    pub fn take(&self) -> Vec<MapCommand> {
        std::mem::take(&mut *self.commands.lock())
    }

    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }
}

impl MapEngine for RecordingMapEngine {
    fn push(&self, command: MapCommand) {
        self.commands.lock().push(command);
    }
}
