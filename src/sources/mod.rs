//! Data sources feeding the frame: map tiles, photos, reminders and weather.
//!
//! All network access lives here; the image pipeline itself never does I/O.

pub mod download;
pub mod map;
pub mod photo;
pub mod reminders;
pub mod weather;

pub use download::{DownloadConfig, DownloadError, download_image};
pub use map::{City, MapError, MapFetcher, MapOptions};
pub use photo::{CatalogEntry, CatalogSource, Photo, PhotoError, PhotoSource};
pub use reminders::{ReminderError, ReminderFile, ReminderItem, ReminderSource, prepare_reminders};
pub use weather::{WeatherError, WeatherProvider, WeatherSnapshot, describe_code};
