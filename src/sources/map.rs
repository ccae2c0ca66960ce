//! Monochrome map tiles from the Stadia Maps static API (Stamen Toner).
//!
//! A processed map is cached as a PNG and reused until it is older than
//! the configured refresh interval. If fetching a fresh map fails, a stale
//! cached map is used instead.

use super::download::{DownloadConfig, DownloadError, download_image};
use crate::image_proc::{crop_attribution_strip, resize_exact, threshold};
use image::GrayImage;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

const STATIC_MAP_URL: &str = "https://tiles.stadiamaps.com/static/stamen_toner.png";

const CACHE_FILE: &str = "current_map.png";

/// Map errors
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Map download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Map cache error: {0}")]
    Cache(#[from] image::ImageError),

    #[error("Failed to read cities file: {0}")]
    Cities(String),

    #[error("Invalid map URL: {0}")]
    Url(String),
}

/// A map center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub zoom: Option<u8>,
}

/// Map fetch settings
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub api_key: String,
    pub width: u32,
    pub height: u32,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub refresh_interval: Duration,
    /// Pick a random center from `cities` on every fresh fetch
    pub random_city: bool,
    /// Luminance above which map pixels turn white
    pub threshold: u8,
    pub cache_dir: PathBuf,
}

/// Fetches, processes and caches map tiles
pub struct MapFetcher {
    options: MapOptions,
    cities: Vec<City>,
}

impl MapFetcher {
    pub fn new(options: MapOptions, cities: Vec<City>) -> Self {
        Self { options, cities }
    }

    /// Load a cities JSON file (`[{"name", "lat", "lon", "zoom"?}]`)
    pub fn load_cities(path: &Path) -> Result<Vec<City>, MapError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MapError::Cities(format!("{}: {}", path.display(), e)))?;
        let cities: Vec<City> = serde_json::from_str(&content)
            .map_err(|e| MapError::Cities(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded {} cities from {}", cities.len(), path.display());
        Ok(cities)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.options.cache_dir.join(CACHE_FILE)
    }

    /// Map image, from cache when still fresh
    pub async fn fetch_map(&self, force_refresh: bool) -> Result<GrayImage, MapError> {
        let cache_path = self.cache_path();

        if !force_refresh && is_cache_fresh(&cache_path, self.options.refresh_interval, SystemTime::now()) {
            match load_cached(&cache_path) {
                Ok(map) => return Ok(map),
                Err(e) => tracing::error!("Failed to load cached map: {}", e),
            }
        }

        let raw = match self.fetch_from_api().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to fetch map from API: {}", e);
                if cache_path.exists() {
                    tracing::warn!("Using old cached map as fallback");
                    return load_cached(&cache_path);
                }
                return Err(e);
            }
        };

        let map = process_map(raw, &self.options);
        self.store(&map);
        Ok(map)
    }

    /// Cached map whatever its age; only fetches when nothing usable is cached
    pub async fn cached_or_fetch(&self) -> Result<GrayImage, MapError> {
        let cache_path = self.cache_path();
        if cache_path.exists() {
            match load_cached(&cache_path) {
                Ok(map) => {
                    tracing::info!("Reusing cached map regardless of age");
                    return Ok(map);
                }
                Err(e) => tracing::error!("Failed to load cached map: {}", e),
            }
        }
        self.fetch_map(false).await
    }

    /// Center to request: random city or the configured coordinates
    fn pick_center(&self) -> (f64, f64, u8) {
        if self.options.random_city {
            if let Some(city) = self.cities.choose(&mut rand::thread_rng()) {
                tracing::info!("Selected random city: {}", city.name);
                return (city.lat, city.lon, city.zoom.unwrap_or(self.options.zoom));
            }
            tracing::warn!("No cities loaded, using default coordinates");
        }
        (self.options.center_lat, self.options.center_lon, self.options.zoom)
    }

    fn request_url(&self, lat: f64, lon: f64, zoom: u8) -> Result<reqwest::Url, MapError> {
        // center is lat,lon
        reqwest::Url::parse_with_params(
            STATIC_MAP_URL,
            &[
                ("center", format!("{},{}", lat, lon)),
                ("zoom", zoom.to_string()),
                ("size", format!("{}x{}@2x", self.options.width, self.options.height)),
                ("api_key", self.options.api_key.clone()),
            ],
        )
        .map_err(|e| MapError::Url(e.to_string()))
    }

    async fn fetch_from_api(&self) -> Result<GrayImage, MapError> {
        let (lat, lon, zoom) = self.pick_center();
        let url = self.request_url(lat, lon, zoom)?;

        tracing::info!("Fetching map from Stadia Maps API...");
        let img = download_image(url.as_str(), &DownloadConfig::default()).await?;
        tracing::info!("Successfully fetched map ({}x{})", img.width(), img.height());
        Ok(img.into_luma8())
    }

    fn store(&self, map: &GrayImage) {
        let path = self.cache_path();
        if let Err(e) = std::fs::create_dir_all(&self.options.cache_dir) {
            tracing::error!("Failed to create cache dir {}: {}", self.options.cache_dir.display(), e);
            return;
        }
        match map.save(&path) {
            Ok(()) => tracing::info!("Saved map to cache: {}", path.display()),
            Err(e) => tracing::error!("Failed to save map to cache: {}", e),
        }
    }
}

/// Crop attribution, downscale to the map area and threshold to black/white
pub fn process_map(raw: GrayImage, options: &MapOptions) -> GrayImage {
    let cropped = crop_attribution_strip(raw);
    let resized = resize_exact(cropped, options.width, options.height);
    let map = threshold(resized, options.threshold);
    tracing::info!("Processed map for e-ink display");
    map
}

/// Whether the cache file exists and is younger than `max_age` at `now`
fn is_cache_fresh(path: &Path, max_age: Duration, now: SystemTime) -> bool {
    let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(_) => {
            tracing::info!("No cached map found");
            return false;
        }
    };

    let age = now.duration_since(modified).unwrap_or_default();
    let hours = age.as_secs_f64() / 3600.0;
    if age > max_age {
        tracing::info!("Cached map is {:.1} hours old, needs refresh", hours);
        return false;
    }

    tracing::info!("Using cached map ({:.1} hours old)", hours);
    true
}

fn load_cached(path: &Path) -> Result<GrayImage, MapError> {
    Ok(image::open(path)?.into_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn options(dir: PathBuf) -> MapOptions {
        MapOptions {
            api_key: "key".to_string(),
            width: 40,
            height: 30,
            center_lat: 41.0082,
            center_lon: 28.9784,
            zoom: 12,
            refresh_interval: Duration::from_secs(3600),
            random_city: false,
            threshold: 200,
            cache_dir: dir,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("manul-frame-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_process_map_is_binary_and_sized() {
        let raw = GrayImage::from_fn(80, 70, |x, _| Luma([(x * 3) as u8]));
        let map = process_map(raw, &options(PathBuf::from("unused")));
        assert_eq!(map.dimensions(), (40, 30));
        assert!(map.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_cache_freshness() {
        let dir = scratch_dir("fresh");
        let path = dir.join(CACHE_FILE);
        GrayImage::new(2, 2).save(&path).unwrap();

        let hour = Duration::from_secs(3600);
        let now = SystemTime::now();
        assert!(is_cache_fresh(&path, hour, now));
        assert!(!is_cache_fresh(&path, hour, now + Duration::from_secs(7200)));
        assert!(!is_cache_fresh(&dir.join("missing.png"), hour, now));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_fresh_cache_is_used() {
        let dir = scratch_dir("cached");
        let fetcher = MapFetcher::new(options(dir.clone()), Vec::new());
        let cached = GrayImage::from_pixel(40, 30, Luma([255]));
        fetcher.store(&cached);

        let map = fetcher.fetch_map(false).await.unwrap();
        assert_eq!(map, cached);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_stale_cache_reused_without_fetching() {
        let dir = scratch_dir("stale");
        let mut opts = options(dir.clone());
        opts.refresh_interval = Duration::ZERO;
        opts.api_key = String::new();
        let fetcher = MapFetcher::new(opts, Vec::new());

        // Differs from the 40x30 a fresh fetch would produce
        let cached = GrayImage::from_pixel(12, 8, Luma([0]));
        fetcher.store(&cached);
        let modified = std::fs::metadata(fetcher.cache_path()).and_then(|m| m.modified()).unwrap();

        let map = fetcher.cached_or_fetch().await.unwrap();
        assert_eq!(map, cached);
        let after = std::fs::metadata(fetcher.cache_path()).and_then(|m| m.modified()).unwrap();
        assert_eq!(modified, after);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_request_url() {
        let fetcher = MapFetcher::new(options(PathBuf::from("unused")), Vec::new());
        let url = fetcher.request_url(41.5, 29.25, 11).unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.contains("center=41.5%2C29.25"));
        assert!(query.contains("size=40x30%402x"));
        assert!(query.contains("zoom=11"));
    }

    #[test]
    fn test_random_city_falls_back_to_center() {
        let mut opts = options(PathBuf::from("unused"));
        opts.random_city = true;
        let fetcher = MapFetcher::new(opts.clone(), Vec::new());
        assert_eq!(fetcher.pick_center(), (41.0082, 28.9784, 12));

        let city = City {
            name: "Ulaanbaatar".to_string(),
            lat: 47.92,
            lon: 106.92,
            zoom: None,
        };
        let fetcher = MapFetcher::new(opts, vec![city]);
        assert_eq!(fetcher.pick_center(), (47.92, 106.92, 12));
    }
}
