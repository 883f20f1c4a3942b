//! The `aperture import` command: push an existing photo through the pipeline.
//!
//! The photo is copied into the media directory exactly as a camera capture
//! would be, with a snapshot assembled from the flags below, and the command
//! waits for the background metadata write before exiting.

use aperture_core::{CameraContext, CapturePipeline, Config, LensFacing, LocationFix};
use chrono::Utc;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Arguments for the `import` command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Photo to import (JPEG or PNG)
    pub file: PathBuf,

    /// File name in the media directory (default: generated from the current time)
    #[arg(long)]
    pub name: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Altitude in meters
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub alt: Option<f64>,

    /// Zoom ratio
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f32,

    /// Flash mode label
    #[arg(long, default_value = "off")]
    pub flash: String,

    /// Camera identifier
    #[arg(long, default_value = "0")]
    pub camera_id: String,

    /// Lens direction
    #[arg(long, value_enum, default_value_t = Facing::Back)]
    pub facing: Facing,

    /// Clockwise rotation in degrees
    #[arg(long)]
    pub rotation: Option<u16>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Back,
    Front,
    External,
}

impl From<Facing> for LensFacing {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::Back => LensFacing::Back,
            Facing::Front => LensFacing::Front,
            Facing::External => LensFacing::External,
        }
    }
}

impl ImportArgs {
    fn location(&self) -> anyhow::Result<Option<LocationFix>> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Ok(None);
        };
        let fix = LocationFix {
            altitude: self.alt,
            ..LocationFix::new(lat, lon)
        };
        if !fix.is_valid() {
            anyhow::bail!("Invalid coordinates: {lat}, {lon}");
        }
        Ok(Some(fix))
    }

    fn camera(&self) -> CameraContext {
        CameraContext {
            camera_id: self.camera_id.clone(),
            lens_facing: self.facing.into(),
            zoom_ratio: self.zoom,
            flash_mode: self.flash.clone(),
            rotation_degrees: self.rotation,
        }
    }
}

/// Execute the import command.
pub async fn execute(config: Config, args: ImportArgs) -> anyhow::Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("File not found: {}", args.file.display());
    }
    let location = args.location()?;

    let capture_start = Utc::now();
    let pipeline = CapturePipeline::from_config(config);
    if let Some(fix) = location {
        pipeline.sensors().record_location(fix);
    }

    let saved = pipeline
        .capture_photo_file(&args.file, args.name.as_deref(), capture_start, args.camera())
        .await?;

    let drained = pipeline.shutdown().await;

    let Some(path) = saved else {
        anyhow::bail!("Could not copy {} into the media directory", args.file.display());
    };
    if !drained {
        tracing::warn!("Metadata for {} may not have been written", path.display());
    }

    println!("{}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ImportArgs,
    }

    #[test]
    fn negative_coordinates_parse() {
        let harness =
            Harness::parse_from(["import", "shot.jpg", "--lat", "-33.8688", "--lon", "151.2093"]);
        let fix = harness.args.location().unwrap().unwrap();
        assert_eq!(fix.latitude, -33.8688);
        assert_eq!(fix.longitude, 151.2093);
    }

    #[test]
    fn latitude_requires_longitude() {
        assert!(Harness::try_parse_from(["import", "shot.jpg", "--lat", "10"]).is_err());
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        let harness = Harness::parse_from(["import", "shot.jpg", "--lat", "91", "--lon", "0"]);
        assert!(harness.args.location().is_err());
    }

    #[test]
    fn camera_context_from_flags() {
        let harness = Harness::parse_from([
            "import", "shot.jpg", "--zoom", "3", "--facing", "front", "--rotation", "270",
        ]);
        let camera = harness.args.camera();
        assert_eq!(camera.zoom_ratio, 3.0);
        assert_eq!(camera.lens_facing, LensFacing::Front);
        assert_eq!(camera.rotation_degrees, Some(270));
        assert!(harness.args.location().unwrap().is_none());
    }

    #[tokio::test]
    async fn import_copies_into_media_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.jpg");
        std::fs::write(&source, b"not really a jpeg").unwrap();

        let mut config = Config::default();
        config.storage.custom_dir = Some(dir.path().join("media"));
        let harness = Harness::parse_from(["import", source.to_str().unwrap(), "--name", "kept.jpg"]);

        execute(config, harness.args).await.unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("media").join("kept.jpg")).unwrap(),
            b"not really a jpeg"
        );
    }
}
