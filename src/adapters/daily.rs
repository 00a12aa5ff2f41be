use {
    crate::domain::{
        error::MarketError,
        id::RoomName,
        provider::{Room, VideoProvider},
    },
    chrono::{DateTime, Utc},
    serde::Deserialize,
    std::{future::Future, pin::Pin, time::Duration},
    uuid::Uuid,
};

/// Daily-style REST client for room and token management. The call UI itself
/// is the provider's embeddable widget; we only create/delete rooms and mint
/// join tokens.
pub struct DailyClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct RoomResponse {
    name: String,
    url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

impl DailyClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, MarketError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MarketError::Provider(format!("building http client: {e}")))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn create_room_inner(
        &self,
        name: &RoomName,
        expires_at: DateTime<Utc>,
    ) -> Result<Room, MarketError> {
        let body = serde_json::json!({
            "name": name.as_str(),
            "privacy": "private",
            "properties": {
                "exp": expires_at.timestamp(),
                "eject_at_room_exp": true,
            },
        });
        let resp = self
            .http
            .post(format!("{}/rooms", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MarketError::Provider(format!("creating room: {e}")))?;

        if resp.status().is_success() {
            let room: RoomResponse = resp
                .json()
                .await
                .map_err(|e| MarketError::Provider(format!("parsing room response: {e}")))?;
            return Ok(Room {
                name: RoomName::parse(room.name)?,
                url: room.url,
            });
        }

        // Deterministic names mean a concurrent creator may have beaten us;
        // the provider reports that as a client error. Fetch instead.
        if resp.status().is_client_error() {
            return self.get_room_inner(name).await;
        }

        Err(MarketError::Provider(format!(
            "creating room: http {}",
            resp.status()
        )))
    }

    async fn get_room_inner(&self, name: &RoomName) -> Result<Room, MarketError> {
        let resp = self
            .http
            .get(format!("{}/rooms/{}", self.api_url, name.as_str()))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| MarketError::Provider(format!("fetching room: {e}")))?;

        if !resp.status().is_success() {
            return Err(MarketError::Provider(format!(
                "fetching room {name}: http {}",
                resp.status()
            )));
        }

        let room: RoomResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Provider(format!("parsing room response: {e}")))?;
        Ok(Room {
            name: RoomName::parse(room.name)?,
            url: room.url,
        })
    }

    async fn delete_room_inner(&self, name: &RoomName) -> Result<(), MarketError> {
        let resp = self
            .http
            .delete(format!("{}/rooms/{}", self.api_url, name.as_str()))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| MarketError::Provider(format!("deleting room: {e}")))?;

        // A room that is already gone is a fine outcome for delete.
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(MarketError::Provider(format!(
                "deleting room {name}: http {}",
                resp.status()
            )))
        }
    }

    async fn meeting_token_inner(
        &self,
        name: &RoomName,
        user_id: Uuid,
        is_owner: bool,
    ) -> Result<String, MarketError> {
        let body = serde_json::json!({
            "properties": {
                "room_name": name.as_str(),
                "user_id": user_id.to_string(),
                "is_owner": is_owner,
            },
        });
        let resp = self
            .http
            .post(format!("{}/meeting-tokens", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MarketError::Provider(format!("minting token: {e}")))?;

        if !resp.status().is_success() {
            return Err(MarketError::Provider(format!(
                "minting token for {name}: http {}",
                resp.status()
            )));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| MarketError::Provider(format!("parsing token response: {e}")))?;
        Ok(token.token)
    }
}

impl VideoProvider for DailyClient {
    fn create_room(
        &self,
        name: &RoomName,
        expires_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Room, MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move { self.create_room_inner(&name, expires_at).await })
    }

    fn delete_room(
        &self,
        name: &RoomName,
    ) -> Pin<Box<dyn Future<Output = Result<(), MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move { self.delete_room_inner(&name).await })
    }

    fn meeting_token(
        &self,
        name: &RoomName,
        user_id: Uuid,
        is_owner: bool,
    ) -> Pin<Box<dyn Future<Output = Result<String, MarketError>> + Send + '_>> {
        let name = name.clone();
        Box::pin(async move { self.meeting_token_inner(&name, user_id, is_owner).await })
    }
}
