use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use gallery_types::api::{
    AuthResponse, CreateCommentRequest, DuplicatesResponse, ErrorResponse, FollowResponse,
    LikeRequest, LoginRequest, ReactionGroup, RegisterRequest, ReorderRequest, SuccessResponse,
    ToggleReactionRequest, ToggleReactionResponse,
};
use gallery_types::models::{Comment, Media, User};
use gallery_types::spotify::{NowPlaying, SpotifyStatus};
use uuid::Uuid;

use crate::error::ClientError;

/// A file to send with `GalleryClient::upload`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Typed calls against one gallery server.
#[derive(Debug, Clone)]
pub struct GalleryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl GalleryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Auth --

    /// Register and keep the returned token for later calls.
    pub async fn register(&mut self, req: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let auth: AuthResponse = self.send_json(self.post("/api/auth/register").json(req)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    /// Log in and keep the returned token for later calls.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.send_json(self.post("/api/auth/login").json(&req)).await?;
        self.token = Some(auth.token.clone());
        Ok(auth)
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.send_json(self.get("/api/auth/user")).await
    }

    // -- Media --

    pub async fn list_media(&self) -> Result<Vec<Media>, ClientError> {
        self.send_json(self.get("/api/media")).await
    }

    pub async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<Media>, ClientError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.data)
                .file_name(file.filename)
                .mime_str(&file.mime)?;
            form = form.part("files", part);
        }
        self.send_json(self.post("/api/media/upload").multipart(form)).await
    }

    pub async fn set_liked(&self, id: i64, liked: bool) -> Result<Media, ClientError> {
        let path = format!("/api/media/{}/like", id);
        self.send_json(self.post(&path).json(&LikeRequest { liked })).await
    }

    pub async fn delete_media(&self, id: i64) -> Result<(), ClientError> {
        let path = format!("/api/media/{}", id);
        let _: SuccessResponse = self.send_json(self.request(reqwest::Method::DELETE, &path)).await?;
        Ok(())
    }

    pub async fn reorder(&self, ordered_ids: &[i64]) -> Result<(), ClientError> {
        let req = ReorderRequest {
            ordered_ids: ordered_ids.to_vec(),
        };
        let _: SuccessResponse = self.send_json(self.post("/api/media/reorder").json(&req)).await?;
        Ok(())
    }

    pub async fn duplicates(&self, id: i64) -> Result<Vec<Media>, ClientError> {
        let path = format!("/api/media/{}/duplicates", id);
        let res: DuplicatesResponse = self.send_json(self.get(&path)).await?;
        Ok(res.duplicates)
    }

    // -- Social --

    pub async fn comments(&self, media_id: i64) -> Result<Vec<Comment>, ClientError> {
        let path = format!("/api/media/{}/comments", media_id);
        self.send_json(self.get(&path)).await
    }

    pub async fn add_comment(&self, media_id: i64, text: &str) -> Result<Comment, ClientError> {
        let path = format!("/api/media/{}/comments", media_id);
        let req = CreateCommentRequest {
            text: text.to_string(),
        };
        self.send_json(self.post(&path).json(&req)).await
    }

    pub async fn reactions(&self, media_id: i64) -> Result<Vec<ReactionGroup>, ClientError> {
        let path = format!("/api/media/{}/reactions", media_id);
        self.send_json(self.get(&path)).await
    }

    /// Returns whether the reaction is now present.
    pub async fn toggle_reaction(&self, media_id: i64, emoji: &str) -> Result<bool, ClientError> {
        let path = format!("/api/media/{}/reactions", media_id);
        let req = ToggleReactionRequest {
            emoji: emoji.to_string(),
        };
        let res: ToggleReactionResponse = self.send_json(self.post(&path).json(&req)).await?;
        Ok(res.added)
    }

    pub async fn follow(&self, user_id: Uuid) -> Result<bool, ClientError> {
        let path = format!("/api/users/{}/follow", user_id);
        let res: FollowResponse = self.send_json(self.post(&path)).await?;
        Ok(res.following)
    }

    // -- Spotify --

    pub async fn spotify_status(&self) -> Result<SpotifyStatus, ClientError> {
        self.send_json(self.get("/api/spotify/status")).await
    }

    pub async fn now_playing(&self) -> Result<NowPlaying, ClientError> {
        self.send_json(self.get("/api/spotify/now-playing")).await
    }

    // -- internals --

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        Ok(check(response).await?.json::<T>().await?)
    }
}

/// Turn a non-2xx response into `ClientError::Api`, keeping the server's
/// message when the body is the usual `{ "error": .. }`.
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error)
        .unwrap_or(body);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
