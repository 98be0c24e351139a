//! [`FarmTools`] backed by the farm-planning scripts.
//!
//! Every call spawns one child process: `<interpreter> <dir>/<script> args…`.
//! Arguments are passed as an argv vector, never through a shell. Lookups
//! print a JSON document on stdout; renderers write a PNG to the path given as
//! their last argument.

use std::{
  path::PathBuf,
  process::{Output, Stdio},
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use uniagric_core::tools::{
  CompanionCropQuery, FarmTools, GeneratedImage, LayoutRequest,
  MixedLayoutRequest, PlantingMethodQuery, ToolError,
};
use uuid::Uuid;

const COMPANION_CROPS_SCRIPT: &str = "get_companion_crops.py";
const PLANTING_METHOD_SCRIPT: &str = "suggest_planting_method.py";
const FARM_LAYOUT_SCRIPT: &str = "generate_farm_layout.py";
const MIXED_LAYOUT_SCRIPT: &str = "generate_mixed_farming_layout.py";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Where the scripts live and where their images go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
  /// Program used to run each script.
  pub interpreter:       String,
  /// Directory containing the four scripts.
  pub dir:               PathBuf,
  /// Directory the renderers write into. Served publicly.
  pub images_dir:        PathBuf,
  /// URL path under which `images_dir` is served.
  pub images_url_prefix: String,
  /// Upper bound on a single script run.
  pub timeout_secs:      u64,
}

impl Default for ScriptConfig {
  fn default() -> Self {
    Self {
      interpreter:       "python3".into(),
      dir:               PathBuf::from("backend/scripts"),
      images_dir:        PathBuf::from("public/generated-images"),
      images_url_prefix: "/generated-images".into(),
      timeout_secs:      120,
    }
  }
}

// ─── Runner ───────────────────────────────────────────────────────────────────

pub struct ScriptRunner {
  config: ScriptConfig,
  /// Mixed into mixed-layout file names alongside the clock.
  seq:    AtomicU64,
}

impl ScriptRunner {
  pub fn new(config: ScriptConfig) -> Self { Self { config, seq: AtomicU64::new(0) } }

  pub fn config(&self) -> &ScriptConfig { &self.config }

  fn timeout(&self) -> Duration { Duration::from_secs(self.config.timeout_secs) }

  /// Run `script` to completion and return its output. A non-zero exit is an
  /// error; stderr on a successful run is only logged.
  async fn run(
    &self,
    script: &str,
    args: Vec<String>,
  ) -> Result<Output, ToolError> {
    let script_path = self.config.dir.join(script);
    tracing::debug!(script = %script_path.display(), ?args, "running script");

    let child = Command::new(&self.config.interpreter)
      .arg(&script_path)
      .args(&args)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()
      .map_err(|source| ToolError::Spawn {
        program: self.config.interpreter.clone(),
        script: script_path.clone(),
        source,
      })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output =
      match tokio::time::timeout(self.timeout(), child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
          tracing::error!(script, timeout = ?self.timeout(), "script timed out");
          return Err(ToolError::TimedOut(self.timeout()));
        }
      };

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if !output.status.success() {
      let status = match output.status.code() {
        Some(code) => code.to_string(),
        None => output.status.to_string(),
      };
      tracing::error!(script, %status, %stderr, "script failed");
      return Err(ToolError::Failed { script: script.to_owned(), status, stderr });
    }
    if !stderr.is_empty() {
      tracing::warn!(script, %stderr, "script wrote to stderr");
    }
    Ok(output)
  }

  async fn lookup(
    &self,
    script: &str,
    args: Vec<String>,
  ) -> Result<Value, ToolError> {
    let output = self.run(script, args).await?;
    serde_json::from_slice(&output.stdout).map_err(|source| {
      let raw = String::from_utf8_lossy(&output.stdout).into_owned();
      tracing::error!(script, %raw, error = %source, "unparsable script output");
      ToolError::InvalidOutput { raw, source }
    })
  }

  /// Run a renderer that writes `file_name` into the images directory.
  async fn render(
    &self,
    script: &str,
    mut args: Vec<String>,
    file_name: String,
  ) -> Result<GeneratedImage, ToolError> {
    tokio::fs::create_dir_all(&self.config.images_dir).await?;
    let path = self.config.images_dir.join(&file_name);
    args.push(path.to_string_lossy().into_owned());

    self.run(script, args).await?;

    if !tokio::fs::try_exists(&path).await? {
      tracing::error!(script, path = %path.display(), "renderer produced no image");
      return Err(ToolError::MissingOutput(path));
    }

    let image_url = format!(
      "{}/{}",
      self.config.images_url_prefix.trim_end_matches('/'),
      file_name
    );
    tracing::info!(%image_url, "image generated");
    Ok(GeneratedImage { file_name, path, image_url })
  }

  /// `mixed_farm_layout_<hash>.png`, where the hash covers the request
  /// payload, the clock and a process-wide counter.
  fn mixed_layout_file_name(&self, payload: &[String]) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = self.seq.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    for part in payload {
      hasher.update(part.as_bytes());
      hasher.update([0u8]);
    }
    hasher.update(nanos.to_le_bytes());
    hasher.update(seq.to_le_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("mixed_farm_layout_{}.png", &digest[..32])
  }
}

fn layout_args(req: &LayoutRequest) -> Vec<String> {
  vec![
    req.crop_name.clone(),
    req.crop_type.clone(),
    req.area_acres.to_string(),
    req.soil_type.clone(),
    req.state.clone(),
    req.land_shape.to_string(),
    req.land_ratio.to_string(),
    req.slope.to_string(),
    req.irrigation_type.to_string(),
    req.planting_density.to_string(),
    req.road_access.to_string(),
    req.equipment_size.to_string(),
    req.include_windbreaks.to_string(),
  ]
}

fn mixed_layout_args(req: &MixedLayoutRequest) -> Vec<String> {
  vec![
    req.crop_name.clone(),
    req.crop_type.clone(),
    req.area_acres.to_string(),
    req.soil_type.clone(),
    req.state.clone(),
    Value::Object(req.companion_crops.clone()).to_string(),
    Value::Object(req.planting_method.clone()).to_string(),
    req.irrigation_type.to_string(),
  ]
}

impl FarmTools for ScriptRunner {
  async fn companion_crops(
    &self,
    query: &CompanionCropQuery,
  ) -> Result<Value, ToolError> {
    self
      .lookup(COMPANION_CROPS_SCRIPT, vec![
        query.crop.clone(),
        query.state.clone(),
        query.soil_type.clone(),
      ])
      .await
  }

  async fn planting_method(
    &self,
    query: &PlantingMethodQuery,
  ) -> Result<Value, ToolError> {
    self
      .lookup(PLANTING_METHOD_SCRIPT, vec![
        query.crop_type.clone(),
        query.soil_type.clone(),
        query.area_acres.to_string(),
        query.primary_crop.clone(),
      ])
      .await
  }

  async fn render_layout(
    &self,
    request: &LayoutRequest,
  ) -> Result<GeneratedImage, ToolError> {
    let file_name = format!("farm_layout_{}.png", Uuid::new_v4());
    self.render(FARM_LAYOUT_SCRIPT, layout_args(request), file_name).await
  }

  async fn render_mixed_layout(
    &self,
    request: &MixedLayoutRequest,
  ) -> Result<GeneratedImage, ToolError> {
    let args = mixed_layout_args(request);
    let file_name = self.mixed_layout_file_name(&args);
    self.render(MIXED_LAYOUT_SCRIPT, args, file_name).await
  }
}
