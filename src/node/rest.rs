use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::{
    common::{
        errors::{Error, Result},
        types::{GuildId, SessionId},
    },
    configs::NodeConfig,
    protocol::{
        FreeAddressRequest, Info, LoadResult, PlayerUpdate, RemotePlayer, RoutePlannerStatus,
        SessionInfo, SessionUpdate, Stats, Track,
    },
};

/// The REST surface of a node.
///
/// Implemented over HTTP by [`RestClient`]; the command worker and the
/// player proxies only ever see this trait.
#[async_trait]
pub trait NodeRest: Send + Sync {
    async fn load_tracks(&self, identifier: &str) -> Result<LoadResult>;

    async fn load_captions(
        &self,
        encoded_track: &str,
        language: Option<&str>,
    ) -> Result<serde_json::Value>;

    async fn decode_track(&self, encoded_track: &str) -> Result<Track>;

    async fn decode_tracks(&self, encoded_tracks: &[String]) -> Result<Vec<Track>>;

    async fn get_players(&self, session_id: &SessionId) -> Result<Vec<RemotePlayer>>;

    async fn get_player(&self, session_id: &SessionId, guild_id: &GuildId) -> Result<RemotePlayer>;

    async fn update_player(
        &self,
        session_id: &SessionId,
        guild_id: &GuildId,
        update: &PlayerUpdate,
        no_replace: bool,
    ) -> Result<()>;

    async fn destroy_player(&self, session_id: &SessionId, guild_id: &GuildId) -> Result<()>;

    async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<SessionInfo>;

    async fn info(&self) -> Result<Info>;

    async fn stats(&self) -> Result<Stats>;

    async fn version(&self) -> Result<String>;

    async fn routeplanner_status(&self) -> Result<Option<RoutePlannerStatus>>;

    async fn free_address(&self, address: &str) -> Result<()>;

    async fn free_all_addresses(&self) -> Result<()>;
}

/// HTTP implementation of [`NodeRest`].
pub struct RestClient {
    http: Client,
    base_url: String,
    root_url: String,
    password: String,
}

impl RestClient {
    pub fn new(http: Client, config: &NodeConfig) -> Self {
        Self {
            http,
            base_url: config.rest_url(),
            root_url: config.http_root(),
            password: config.password.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header(AUTHORIZATION, &self.password).send().await?;
        let status = response.status();
        trace!("{} <- {}", status, response.url());

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::remote(status.as_u16(), &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        Ok(self.send(request).await?.json::<T>().await?)
    }
}

#[async_trait]
impl NodeRest for RestClient {
    async fn load_tracks(&self, identifier: &str) -> Result<LoadResult> {
        self.get_json("/loadtracks", &[("identifier", identifier)])
            .await
    }

    async fn load_captions(
        &self,
        encoded_track: &str,
        language: Option<&str>,
    ) -> Result<serde_json::Value> {
        let mut query = vec![("encodedTrack", encoded_track)];
        if let Some(language) = language {
            query.push(("language", language));
        }
        self.get_json("/loadcaptions", &query).await
    }

    async fn decode_track(&self, encoded_track: &str) -> Result<Track> {
        self.get_json("/decodetrack", &[("encodedTrack", encoded_track)])
            .await
    }

    async fn decode_tracks(&self, encoded_tracks: &[String]) -> Result<Vec<Track>> {
        let request = self.http.post(self.url("/decodetracks")).json(encoded_tracks);
        Ok(self.send(request).await?.json().await?)
    }

    async fn get_players(&self, session_id: &SessionId) -> Result<Vec<RemotePlayer>> {
        self.get_json(&format!("/sessions/{}/players", session_id), &[])
            .await
    }

    async fn get_player(&self, session_id: &SessionId, guild_id: &GuildId) -> Result<RemotePlayer> {
        self.get_json(&format!("/sessions/{}/players/{}", session_id, guild_id), &[])
            .await
    }

    async fn update_player(
        &self,
        session_id: &SessionId,
        guild_id: &GuildId,
        update: &PlayerUpdate,
        no_replace: bool,
    ) -> Result<()> {
        let request = self
            .http
            .patch(self.url(&format!("/sessions/{}/players/{}", session_id, guild_id)))
            .query(&[("noReplace", no_replace)])
            .json(update);
        self.send(request).await?;
        Ok(())
    }

    async fn destroy_player(&self, session_id: &SessionId, guild_id: &GuildId) -> Result<()> {
        let request = self
            .http
            .delete(self.url(&format!("/sessions/{}/players/{}", session_id, guild_id)));
        self.send(request).await?;
        Ok(())
    }

    async fn update_session(
        &self,
        session_id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<SessionInfo> {
        let request = self
            .http
            .patch(self.url(&format!("/sessions/{}", session_id)))
            .json(update);
        Ok(self.send(request).await?.json().await?)
    }

    async fn info(&self) -> Result<Info> {
        self.get_json("/info", &[]).await
    }

    async fn stats(&self) -> Result<Stats> {
        self.get_json("/stats", &[]).await
    }

    async fn version(&self) -> Result<String> {
        let request = self.http.get(format!("{}/version", self.root_url));
        Ok(self.send(request).await?.text().await?)
    }

    async fn routeplanner_status(&self) -> Result<Option<RoutePlannerStatus>> {
        let request = self.http.get(self.url("/routeplanner/status"));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    async fn free_address(&self, address: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/routeplanner/free/address"))
            .json(&FreeAddressRequest { address });
        self.send(request).await?;
        Ok(())
    }

    async fn free_all_addresses(&self) -> Result<()> {
        let request = self.http.post(self.url("/routeplanner/free/all"));
        self.send(request).await?;
        Ok(())
    }
}
