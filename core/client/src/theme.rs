//! Theme endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use nexushub_common::Result;

use crate::client::ApiClient;

/// Theme preferences stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub theme_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub background_image: String,
    pub background_opacity: f64,
    pub background_music: String,
    pub music_volume: f64,
}

impl ThemeSettings {
    pub fn is_dark(&self) -> bool {
        self.theme_name == "dark"
    }

    /// Flip between the dark and light themes.
    pub fn toggled(&self) -> Self {
        let theme_name = if self.is_dark() { "light" } else { "dark" };
        Self {
            theme_name: theme_name.to_string(),
            ..self.clone()
        }
    }
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            theme_name: "dark".to_string(),
            primary_color: "#000000".to_string(),
            secondary_color: "#ffffff".to_string(),
            background_image: String::new(),
            background_opacity: 1.0,
            background_music: String::new(),
            music_volume: 0.5,
        }
    }
}

impl ApiClient {
    /// Fetch the stored theme.
    pub async fn get_theme(&self) -> Result<ThemeSettings> {
        self.get("/theme", &[]).await
    }

    /// Fetch the stored theme, or the default theme if none was saved yet.
    pub async fn get_theme_or_default(&self) -> Result<ThemeSettings> {
        match self.get_theme().await {
            Err(e) if e.status() == Some(404) => {
                debug!("No stored theme, using the default");
                Ok(ThemeSettings::default())
            }
            other => other,
        }
    }

    /// Store a theme and return what the server saved.
    pub async fn save_theme(&self, theme: &ThemeSettings) -> Result<ThemeSettings> {
        self.put("/theme", theme).await
    }
}
