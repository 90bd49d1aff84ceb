//! Subset of the Spotify Web API response shapes we read, and their
//! conversion into the gallery's view types.

use serde::Deserialize;

use gallery_types::spotify::{NowPlaying, Playlist, PlaylistTrack, RecentTrack, Track};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Image {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Artist {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Album {
    pub name: String,
    /// Largest first.
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTrack {
    /// Null for local files.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl WireTrack {
    pub fn into_track(self, progress: u64) -> Option<Track> {
        let id = self.id?;
        let artists = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let (album, album_art, album_art_small) = match self.album {
            Some(album) => {
                let large = album.images.first().map(|i| i.url.clone());
                let small = album.images.last().map(|i| i.url.clone());
                (album.name, large, small)
            }
            None => (String::new(), None, None),
        };

        Some(Track {
            id,
            name: self.name,
            artists,
            album,
            album_art,
            album_art_small,
            duration: self.duration_ms,
            progress,
            uri: self.uri,
            external_url: self.external_urls.spotify,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    /// Null between tracks; episodes lack the track fields we need.
    #[serde(default)]
    pub item: Option<serde_json::Value>,
}

impl CurrentlyPlaying {
    pub fn into_now_playing(self) -> NowPlaying {
        let progress = self.progress_ms.unwrap_or(0);
        let track = self
            .item
            .and_then(|item| serde_json::from_value::<WireTrack>(item).ok())
            .and_then(|t| t.into_track(progress));

        NowPlaying {
            is_playing: self.is_playing && track.is_some(),
            track,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayHistory {
    pub track: WireTrack,
    pub played_at: String,
}

impl PlayHistory {
    pub fn into_recent(self) -> Option<RecentTrack> {
        Some(RecentTrack {
            track: self.track.into_track(0)?,
            played_at: self.played_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub track: Option<WireTrack>,
}

impl PlaylistItem {
    pub fn into_playlist_track(self) -> Option<PlaylistTrack> {
        Some(PlaylistTrack {
            track: self.track?.into_track(0)?,
            added_at: self.added_at,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrackTotal {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Owner {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
    #[serde(default)]
    pub tracks: TrackTotal,
    #[serde(default)]
    pub owner: Owner,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl From<SimplifiedPlaylist> for Playlist {
    fn from(p: SimplifiedPlaylist) -> Self {
        Playlist {
            id: p.id,
            name: p.name,
            description: p.description.unwrap_or_default(),
            image: p.images.and_then(|images| images.into_iter().next()).map(|i| i.url),
            track_count: p.tracks.total,
            owner: p.owner.display_name.unwrap_or(p.owner.id),
            uri: p.uri,
            external_url: p.external_urls.spotify,
        }
    }
}
