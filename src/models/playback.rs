use serde::{Deserialize, Serialize};

/// `GET /me/player/currently-playing` body. Only the fields we project are modeled.
#[derive(Deserialize, Debug, Clone)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub item: Option<Track>,
}

impl CurrentlyPlaying {
    /// The playing item unless it is an episode or an ad. Spotify reports
    /// `"unknown"` for some tracks, so anything else with an item counts.
    pub fn track(&self) -> Option<&Track> {
        match self.currently_playing_type.as_deref() {
            Some("episode") | Some("ad") => None,
            _ => self.item.as_ref(),
        }
    }
}

/// `GET /me/player/recently-played` body.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecentlyPlayed {
    #[serde(default)]
    pub items: Vec<PlayHistory>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlayHistory {
    pub track: Track,
    pub played_at: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub external_urls: Option<ExternalUrls>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Artist {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Image {
    pub url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// The normalized now-playing payload served to the widget.
///
/// `timestamp` is when the aggregator ran, so callers can spot stale data.
/// `played_at` is only set for recently-played fallbacks and `message` only
/// when there was nothing to show.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spotify_url: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub const NO_TRACK_MESSAGE: &str = "No track data available";

impl PlaybackState {
    /// Projects a live currently-playing response, keeping the provider's own flag.
    pub fn live(current: &CurrentlyPlaying, track: &Track, timestamp: &str) -> Self {
        Self::from_track(track, current.is_playing, None, timestamp)
    }

    /// Projects the most recent history entry. Never reported as playing.
    pub fn recent(entry: &PlayHistory, timestamp: &str) -> Self {
        Self::from_track(&entry.track, false, Some(entry.played_at.clone()), timestamp)
    }

    /// Payload for when neither endpoint had anything to report.
    pub fn empty(timestamp: &str) -> Self {
        PlaybackState {
            is_playing: false,
            timestamp: timestamp.to_string(),
            message: Some(NO_TRACK_MESSAGE.to_string()),
            ..Default::default()
        }
    }

    fn from_track(
        track: &Track,
        is_playing: bool,
        played_at: Option<String>,
        timestamp: &str,
    ) -> Self {
        let album = track.album.as_ref();
        PlaybackState {
            is_playing,
            title: Some(track.name.clone()),
            artist: Some(join_artists(&track.artists)),
            album: album.map(|a| a.name.clone()),
            album_image_url: album
                .and_then(|a| a.images.as_ref())
                .and_then(|images| images.first())
                .map(|image| image.url.clone()),
            played_at,
            spotify_url: track
                .external_urls
                .as_ref()
                .and_then(|urls| urls.spotify.clone()),
            timestamp: timestamp.to_string(),
            message: None,
        }
    }
}

/// Joins artist names with `", "`.
pub fn join_artists(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|artist| artist.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
