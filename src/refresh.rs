//! One display refresh cycle.
//!
//! Gathers the map and a photo, runs the sidebar pipeline, composes the
//! panel frame and pushes it to the sink. A failed step aborts the cycle
//! before anything reaches the panel. The dashboard has its own driver so
//! it runs without a map or photo catalog.

use crate::config::{Config, ConfigError};
use crate::display::{DisplayError, FrameSink};
use crate::image_proc::{PipelineError, SidebarOptions, einkify_photo};
use crate::render::{ComposedFrame, DashboardOptions, FrameOptions, compose_frame, render_dashboard};
use crate::sources::{
    CatalogSource, MapError, MapFetcher, Photo, PhotoError, PhotoSource, ReminderFile, ReminderSource,
    WeatherProvider,
};
use image::GrayImage;
use thiserror::Error;

/// Refresh cycle errors
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Image pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Map unavailable: {0}")]
    Map(#[from] MapError),

    #[error("Photo unavailable: {0}")]
    Photo(#[from] PhotoError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
}

/// Show a frame and put the panel to sleep
fn push(sink: &mut FrameSink, frame: &GrayImage) -> Result<(), RefreshError> {
    sink.show(frame)?;
    sink.sleep()?;
    tracing::info!("Refresh complete");
    Ok(())
}

/// Drives map + photo refresh cycles against a frame sink
pub struct Refresher<P> {
    map: MapFetcher,
    photos: P,
    sidebar: SidebarOptions,
    frame: FrameOptions,
    sink: FrameSink,
}

impl Refresher<CatalogSource> {
    /// Wire up collaborators from configuration
    pub fn from_config(config: &Config, sink: FrameSink) -> Result<Self, RefreshError> {
        let cities = match (&config.map.cities_file, config.map.random_city) {
            (Some(path), true) => MapFetcher::load_cities(path).unwrap_or_else(|e| {
                tracing::warn!("{}, using configured map center", e);
                Vec::new()
            }),
            _ => Vec::new(),
        };

        let map = MapFetcher::new(config.map_options(), cities);
        let photos = CatalogSource::load(&config.photos.catalog, config.photos.max_attempts)?;
        Self::new(config, map, photos, sink)
    }
}

impl<P: PhotoSource> Refresher<P> {
    pub fn new(config: &Config, map: MapFetcher, photos: P, sink: FrameSink) -> Result<Self, RefreshError> {
        Ok(Self {
            map,
            photos,
            sidebar: config.sidebar_options()?,
            frame: config.frame_options()?,
            sink,
        })
    }

    /// Map + photo frame without touching the sink
    pub async fn build_frame(&self, force_map: bool) -> Result<ComposedFrame, RefreshError> {
        let map = self.map.fetch_map(force_map).await?;
        tracing::info!("Map ready: {}x{}", map.width(), map.height());

        let photo = self.photos.fetch().await?;
        self.compose(&map, photo)
    }

    fn compose(&self, map: &GrayImage, photo: Photo) -> Result<ComposedFrame, RefreshError> {
        tracing::info!(
            "Photo ready: {} ({}x{})",
            photo.metadata.name,
            photo.image.width(),
            photo.image.height()
        );

        let sidebar = einkify_photo(photo.image, &photo.metadata, &self.sidebar)?;
        let frame = compose_frame(map, &sidebar, &self.frame)?;
        if frame.sidebar_cropped {
            tracing::warn!("Sidebar did not fit the panel and was cropped");
        }
        Ok(frame)
    }

    /// Full cycle; `force_map` bypasses the map cache
    pub async fn refresh(&mut self, force_map: bool) -> Result<(), RefreshError> {
        tracing::info!("Starting display refresh (force_map={})", force_map);
        let frame = self.build_frame(force_map).await?;
        push(&mut self.sink, &frame.image)
    }

    /// New photo next to the cached map, whatever the map's age
    ///
    /// The photo is fetched first; the map is only downloaded when no
    /// cached copy exists.
    pub async fn rotate_photo(&mut self) -> Result<(), RefreshError> {
        tracing::info!("Rotating photo");
        let photo = self.photos.fetch().await?;
        let map = self.map.cached_or_fetch().await?;
        let frame = self.compose(&map, photo)?;
        push(&mut self.sink, &frame.image)
    }
}

/// Drives dashboard refreshes; needs no map or photo catalog
pub struct DashboardRefresher<R> {
    weather: WeatherProvider,
    reminders: R,
    options: DashboardOptions,
    sink: FrameSink,
}

impl DashboardRefresher<ReminderFile> {
    pub fn from_config(config: &Config, sink: FrameSink) -> Self {
        let weather = WeatherProvider::new(
            config.weather.latitude,
            config.weather.longitude,
            &config.weather.timezone,
            config.weather_timeout(),
        );
        let reminders = ReminderFile::new(
            config.reminders.file.clone(),
            config.reminders.max_items,
            config.reminders.show_completed,
        );
        Self::new(config, weather, reminders, sink)
    }
}

impl<R: ReminderSource> DashboardRefresher<R> {
    pub fn new(config: &Config, weather: WeatherProvider, reminders: R, sink: FrameSink) -> Self {
        Self {
            weather,
            reminders,
            options: config.dashboard_options(),
            sink,
        }
    }

    /// Clock, reminders and weather; a failed source only degrades its section
    pub async fn refresh(&mut self) -> Result<(), RefreshError> {
        tracing::info!("Starting dashboard refresh");
        let reminders = match self.reminders.fetch().await {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!("Reminders unavailable: {}", e);
                None
            }
        };

        let weather = match self.weather.fetch_weather().await {
            Ok(weather) => Some(weather),
            Err(e) => {
                tracing::warn!("Weather unavailable: {}", e);
                None
            }
        };

        let now = chrono::Local::now().naive_local();
        let frame = render_dashboard(now, reminders.as_deref(), weather.as_ref(), &self.options)?;
        push(&mut self.sink, &frame)
    }
}
