use super::{FileRecord, RemoteFs, IO_TIMEOUT_SECS, OP_TIMEOUT_SECS};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// 服务端统一的响应包装
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ListData {
    content: Option<Vec<FileRecord>>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ListRequest<'a> {
    path: &'a str,
    password: &'a str,
    page: u32,
    per_page: u32,
    refresh: bool,
}

#[derive(Serialize)]
struct MkdirRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
struct CopyRequest<'a> {
    src_dir: &'a str,
    dst_dir: &'a str,
    names: &'a [String],
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    dir: &'a str,
    names: &'a [String],
}

/// Alist v3 HTTP 客户端
pub struct AlistClient {
    http: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
    name: String,
}

impl AlistClient {
    pub fn new(endpoint: &str, username: &str, password: &str) -> RemoteResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(OP_TIMEOUT_SECS))
            .build()?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let name = format!("alist:{}", endpoint);

        Ok(Self {
            http,
            endpoint,
            username: username.to_string(),
            password: password.to_string(),
            token: RwLock::new(None),
            name,
        })
    }

    fn url(&self, api: &str) -> String {
        format!("{}{}", self.endpoint, api)
    }

    /// 发送一个 POST 请求并拆开响应包装
    async fn post<B, T>(
        &self,
        api: &str,
        body: &B,
        authorized: bool,
        timeout: Duration,
    ) -> RemoteResult<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(self.url(api)).json(body).timeout(timeout);

        if authorized {
            let token = self
                .token
                .read()
                .await
                .clone()
                .ok_or(RemoteError::NotLoggedIn)?;
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let envelope: Envelope<T> = request.send().await?.error_for_status()?.json().await?;

        if envelope.code != 200 {
            return Err(RemoteError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl RemoteFs for AlistClient {
    async fn authenticate(&self) -> RemoteResult<()> {
        let body = LoginRequest {
            username: &self.username,
            password: &self.password,
        };
        let data: Option<LoginData> = self
            .post("/api/auth/login", &body, false, Duration::from_secs(OP_TIMEOUT_SECS))
            .await?;
        let token = data
            .map(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RemoteError::Rejected("登录响应中没有 token".to_string()))?;

        *self.token.write().await = Some(token);
        debug!("已登录 {} (用户 {})", self.endpoint, self.username);
        Ok(())
    }

    async fn list(&self, path: &str) -> RemoteResult<Vec<FileRecord>> {
        let body = ListRequest {
            path,
            password: "",
            page: 1,
            per_page: 0,
            refresh: false,
        };
        let data: Option<ListData> = self
            .post("/api/fs/list", &body, true, Duration::from_secs(OP_TIMEOUT_SECS))
            .await?;

        // 空目录的 content 为 null
        Ok(data.and_then(|d| d.content).unwrap_or_default())
    }

    async fn make_dir(&self, path: &str) -> RemoteResult<()> {
        let _: Option<serde_json::Value> = self
            .post(
                "/api/fs/mkdir",
                &MkdirRequest { path },
                true,
                Duration::from_secs(OP_TIMEOUT_SECS),
            )
            .await?;
        Ok(())
    }

    async fn copy(&self, src_dir: &str, dst_dir: &str, names: &[String]) -> RemoteResult<()> {
        let body = CopyRequest {
            src_dir,
            dst_dir,
            names,
        };
        let _: Option<serde_json::Value> = self
            .post("/api/fs/copy", &body, true, Duration::from_secs(IO_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    async fn remove(&self, dir: &str, names: &[String]) -> RemoteResult<()> {
        let body = RemoveRequest { dir, names };
        let _: Option<serde_json::Value> = self
            .post("/api/fs/remove", &body, true, Duration::from_secs(OP_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
