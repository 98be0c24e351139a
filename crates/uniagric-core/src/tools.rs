//! Farm-planning capabilities fulfilled by external collaborators.
//!
//! Each capability is a typed call: validated request in, JSON document or
//! generated image out. How a capability is fulfilled (a subprocess, a remote
//! service, a stub) is up to the [`FarmTools`] implementation.

use std::{future::Future, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Error, Result};

// ─── Capabilities ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  CompanionCrops,
  PlantingMethod,
  FarmLayout,
  MixedLayout,
}

impl Capability {
  /// Client-facing message for an upstream failure.
  pub fn failure_message(self) -> &'static str {
    match self {
      Self::CompanionCrops => "Error retrieving companion crops",
      Self::PlantingMethod => "Error retrieving planting method",
      Self::FarmLayout => "Error generating farm layout",
      Self::MixedLayout => "Error generating mixed farm layout",
    }
  }

  /// Client-facing message when a promised image was not produced.
  pub fn missing_output_message(self) -> &'static str {
    match self {
      Self::FarmLayout => "Failed to generate farm layout image",
      Self::MixedLayout => "Failed to generate mixed farm layout image",
      other => other.failure_message(),
    }
  }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ToolError {
  #[error("failed to start {program} at {}: {source}", .script.display())]
  Spawn {
    program: String,
    script:  PathBuf,
    #[source]
    source:  std::io::Error,
  },

  #[error("{script} exited with status {status}")]
  Failed { script: String, status: String, stderr: String },

  #[error("script did not finish within {0:?}")]
  TimedOut(Duration),

  #[error("invalid script output format")]
  InvalidOutput {
    raw:    String,
    #[source]
    source: serde_json::Error,
  },

  #[error("expected output file {} was not produced", .0.display())]
  MissingOutput(PathBuf),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

// ─── Lookup requests ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionCropQuery {
  pub crop:      String,
  pub state:     String,
  pub soil_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantingMethodQuery {
  pub crop_type:    String,
  pub soil_type:    String,
  pub area_acres:   f64,
  pub primary_crop: String,
}

// ─── Layout parameters ────────────────────────────────────────────────────────

macro_rules! layout_enum {
  ($(#[$meta:meta])* $name:ident { $default:ident $(, $variant:ident)* $(,)? }) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, Default, PartialEq, Eq,
      Serialize, Deserialize, strum::Display, strum::EnumString,
    )]
    #[serde(rename_all = "lowercase")]
    #[strum(serialize_all = "lowercase")]
    pub enum $name {
      #[default]
      $default,
      $($variant,)*
    }
  };
}

layout_enum!(LandShape { Rectangle, Irregular });
layout_enum!(Slope { Flat, Gentle, Moderate, Steep });
layout_enum!(PlantingDensity { Medium, Low, High });
layout_enum!(RoadAccess { North, South, East, West });
layout_enum!(EquipmentSize { Medium, Small, Large });

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
  Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IrrigationType {
  #[default]
  Drip,
  Sprinkler,
  Flood,
  Furrow,
  /// Rain-fed plot; passed to the renderer as `none`.
  #[serde(rename = "none")]
  #[strum(serialize = "none")]
  Rainfed,
}

fn default_land_ratio() -> f64 { 1.5 }

/// `[kind, x, y, size]`
pub type WaterSource = (String, f64, f64, f64);

/// `[kind, x, y, width, height]`
pub type Structure = (String, f64, f64, f64, f64);

/// Body of the farm-layout generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutRequest {
  pub crop_name:           String,
  pub crop_type:           String,
  pub area_acres:          f64,
  pub soil_type:           String,
  pub state:               String,
  #[serde(default)]
  pub land_shape:          LandShape,
  /// Length-to-width ratio of the plot.
  #[serde(default = "default_land_ratio")]
  pub land_ratio:          f64,
  #[serde(default)]
  pub slope:               Slope,
  #[serde(default)]
  pub irrigation_type:     IrrigationType,
  #[serde(default)]
  pub planting_density:    PlantingDensity,
  #[serde(default)]
  pub road_access:         RoadAccess,
  #[serde(default)]
  pub equipment_size:      EquipmentSize,
  #[serde(default)]
  pub include_windbreaks:  bool,
  /// Accepted from the layout form; the renderer does not take them.
  #[serde(default)]
  pub water_sources:       Vec<WaterSource>,
  #[serde(default)]
  pub existing_structures: Vec<Structure>,
}

impl LayoutRequest {
  pub fn validate(&self) -> Result<()> {
    require_fields(&[
      ("crop_name", &self.crop_name),
      ("crop_type", &self.crop_type),
      ("soil_type", &self.soil_type),
      ("state", &self.state),
    ])?;
    require_positive("area_acres", self.area_acres)?;
    require_positive("land_ratio", self.land_ratio)
  }
}

/// Body of the mixed-layout generation request.
///
/// Clients send the full layout form here as well; fields other than these
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedLayoutRequest {
  pub crop_name:       String,
  pub crop_type:       String,
  pub area_acres:      f64,
  pub soil_type:       String,
  pub state:           String,
  /// As returned by the companion-crop lookup.
  pub companion_crops: Map<String, Value>,
  /// As returned by the planting-method lookup.
  pub planting_method: Map<String, Value>,
  #[serde(default)]
  pub irrigation_type: IrrigationType,
}

impl MixedLayoutRequest {
  pub fn validate(&self) -> Result<()> {
    require_fields(&[
      ("crop_name", &self.crop_name),
      ("crop_type", &self.crop_type),
      ("soil_type", &self.soil_type),
      ("state", &self.state),
    ])?;
    require_positive("area_acres", self.area_acres)
  }
}

fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
  let missing: Vec<&str> = fields
    .iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(k, _)| *k)
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(Error::Invalid(format!(
      "Missing required parameters: {}",
      missing.join(", ")
    )))
  }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
  if value.is_finite() && value > 0.0 {
    Ok(())
  } else {
    Err(Error::Invalid(format!("{name} must be a positive number")))
  }
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// A generated image, stored under the public images directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
  pub file_name: String,
  #[serde(skip)]
  pub path:      PathBuf,
  /// Public URL path, e.g. `/generated-images/farm_layout_<id>.png`.
  pub image_url: String,
}

/// The farm-planning capabilities.
pub trait FarmTools: Send + Sync {
  fn companion_crops<'a>(
    &'a self,
    query: &'a CompanionCropQuery,
  ) -> impl Future<Output = Result<Value, ToolError>> + Send + 'a;

  fn planting_method<'a>(
    &'a self,
    query: &'a PlantingMethodQuery,
  ) -> impl Future<Output = Result<Value, ToolError>> + Send + 'a;

  fn render_layout<'a>(
    &'a self,
    request: &'a LayoutRequest,
  ) -> impl Future<Output = Result<GeneratedImage, ToolError>> + Send + 'a;

  fn render_mixed_layout<'a>(
    &'a self,
    request: &'a MixedLayoutRequest,
  ) -> impl Future<Output = Result<GeneratedImage, ToolError>> + Send + 'a;
}
