use serde::{Deserialize, Serialize};

use crate::common::Severity;

/// A single audio track with encoded data and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
  /// Base64-encoded track data, the reference every player command uses.
  pub encoded: String,
  #[serde(default)]
  pub info: TrackInfo,
  #[serde(default)]
  pub plugin_info: serde_json::Value,
  #[serde(default)]
  pub user_data: serde_json::Value,
}

/// Metadata for an audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackInfo {
  pub identifier: String,
  pub is_seekable: bool,
  pub author: String,
  pub length: u64,
  pub is_stream: bool,
  pub position: u64,
  pub title: String,
  pub uri: Option<String>,
  pub artwork_url: Option<String>,
  pub isrc: Option<String>,
  pub source_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
  pub name: String,
  #[serde(default)]
  pub selected_track: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistData {
  pub info: PlaylistInfo,
  #[serde(default)]
  pub plugin_info: serde_json::Value,
  pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadException {
  pub message: Option<String>,
  pub severity: Severity,
  #[serde(default)]
  pub cause: String,
}

/// Result of `GET /loadtracks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "loadType", content = "data", rename_all = "camelCase")]
pub enum LoadResult {
  Track(Track),
  Playlist(PlaylistData),
  Search(Vec<Track>),
  Empty {},
  Error(LoadException),
}

impl LoadResult {
  /// Every track carried by the result, in node order.
  pub fn tracks(&self) -> Vec<&Track> {
    match self {
      Self::Track(track) => vec![track],
      Self::Playlist(playlist) => playlist.tracks.iter().collect(),
      Self::Search(tracks) => tracks.iter().collect(),
      Self::Empty {} | Self::Error(_) => Vec::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_load_result_search() {
    let raw = r#"{"loadType":"search","data":[
      {"encoded":"QAAA1","info":{"identifier":"a","title":"A","author":"x","length":1000,"isStream":false,"isSeekable":true,"position":0,"sourceName":"youtube"}},
      {"encoded":"QAAA2","info":{"identifier":"b","title":"B","author":"y","length":2000,"isStream":false,"isSeekable":true,"position":0,"sourceName":"youtube"}}
    ]}"#;
    let result: LoadResult = serde_json::from_str(raw).unwrap();
    let tracks = result.tracks();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].encoded, "QAAA1");
    assert_eq!(tracks[1].info.title, "B");
  }

  #[test]
  fn test_load_result_empty_and_error() {
    let empty: LoadResult = serde_json::from_str(r#"{"loadType":"empty","data":{}}"#).unwrap();
    assert!(matches!(empty, LoadResult::Empty {}));

    let err: LoadResult = serde_json::from_str(
      r#"{"loadType":"error","data":{"message":"boom","severity":"fault","cause":"x"}}"#,
    )
    .unwrap();
    match err {
      LoadResult::Error(e) => {
        assert_eq!(e.message.as_deref(), Some("boom"));
        assert_eq!(e.severity, Severity::Fault);
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn test_track_with_partial_info() {
    let track: Track = serde_json::from_str(r#"{"encoded":"abc","info":{"title":"t"}}"#).unwrap();
    assert_eq!(track.encoded, "abc");
    assert_eq!(track.info.title, "t");
    assert_eq!(track.info.length, 0);
  }
}
