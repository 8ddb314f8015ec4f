//! HTTP implementation of [`RemoteDataService`] over the hosted REST and auth APIs.
//!
//! Every request carries the project's public API key in the `apikey` header
//! and the user's access token (or the API key when signed out) as bearer.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use souq_core::{CartItem, CartItemId, Comment, CommentId, Identity, ProductId, UserId};
use tracing::{debug, instrument};
use url::Url;

use super::rows::{CartItemRow, CommentRow, NewComment};
use super::{RemoteDataService, RemoteError};
use crate::config::RemoteConfig;

const CART_ITEMS_SELECT: &str = "id,product_id,added_at,products(id,name,price,image_url,description,owner_id,profiles:products_owner_id_fkey(id,full_name,avatar_url))";
const COMMENTS_SELECT: &str = "id,content,created_at,user_id,profiles(id,full_name,avatar_url)";

/// Max characters of an error body kept in logs and errors.
const ERROR_BODY_LIMIT: usize = 200;

/// Client for the remote data service.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_base: Url,
    auth_base: Url,
    anon_key: SecretString,
    access_token: Option<SecretString>,
}

/// Subset of the auth API's user object.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: UserId,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Http` if the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_http_client(config, client)
    }

    fn with_http_client(config: &RemoteConfig, client: reqwest::Client) -> Result<Self, RemoteError> {
        let base = with_trailing_slash(&config.base_url);

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_base: join(&base, "rest/v1/")?,
                auth_base: join(&base, "auth/v1/")?,
                anon_key: config.anon_key.clone(),
                access_token: config.access_token.clone(),
            }),
        })
    }

    fn table_url(&self, table: &str, filters: &[(&str, String)]) -> Result<Url, RemoteError> {
        let mut url = join(&self.inner.rest_base, table)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let anon_key = self.inner.anon_key.expose_secret();
        let bearer = self
            .inner
            .access_token
            .as_ref()
            .map_or(anon_key, |token| token.expose_secret());

        self.inner
            .client
            .request(method, url)
            .header("apikey", anon_key)
            .bearer_auth(bearer)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(RemoteError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Unauthorized);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            tracing::error!(status = %status, body = %body, "Remote service returned non-success status");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let body = self.send(self.request(Method::GET, url)).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(ERROR_BODY_LIMIT).collect::<String>(),
                "Failed to parse remote response"
            );
            RemoteError::Parse(e)
        })
    }

    /// Delete rows matching `id` and fail with `NotFound` if none matched.
    async fn delete_by_id(&self, table: &str, id: String) -> Result<(), RemoteError> {
        let url = self.table_url(table, &[("id", format!("eq.{id}"))])?;
        let request = self
            .request(Method::DELETE, url)
            .header("Prefer", "return=representation");
        let body = self.send(request).await?;

        let deleted: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        if deleted.is_empty() {
            return Err(RemoteError::NotFound(format!("{table} {id}")));
        }
        debug!(table, id = %id, "Deleted row");
        Ok(())
    }
}

#[async_trait]
impl RemoteDataService for SupabaseClient {
    #[instrument(skip(self))]
    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RemoteError> {
        let url = self.table_url(
            "cart_items",
            &[
                ("select", CART_ITEMS_SELECT.to_string()),
                ("user_id", format!("eq.{user_id}")),
                ("order", "added_at.desc".to_string()),
            ],
        )?;
        let rows: Vec<CartItemRow> = self.fetch(url).await?;
        debug!(rows = rows.len(), "Fetched cart items");
        Ok(rows
            .into_iter()
            .filter_map(CartItemRow::into_cart_item)
            .collect())
    }

    #[instrument(skip(self))]
    async fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), RemoteError> {
        self.delete_by_id("cart_items", item_id.to_string()).await
    }

    #[instrument(skip(self))]
    async fn list_comments(&self, product_id: ProductId) -> Result<Vec<Comment>, RemoteError> {
        let url = self.table_url(
            "comments",
            &[
                ("select", COMMENTS_SELECT.to_string()),
                ("product_id", format!("eq.{product_id}")),
                ("order", "created_at.desc".to_string()),
            ],
        )?;
        let rows: Vec<CommentRow> = self.fetch(url).await?;
        debug!(rows = rows.len(), "Fetched comments");
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn insert_comment(
        &self,
        product_id: ProductId,
        user_id: UserId,
        text: &str,
    ) -> Result<(), RemoteError> {
        let url = self.table_url("comments", &[])?;
        let request = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(&NewComment {
                content: text,
                product_id,
                user_id,
            });
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), RemoteError> {
        self.delete_by_id("comments", comment_id.to_string()).await
    }

    #[instrument(skip(self))]
    async fn current_session(&self) -> Result<Option<Identity>, RemoteError> {
        if self.inner.access_token.is_none() {
            debug!("No access token configured");
            return Ok(None);
        }

        let url = join(&self.inner.auth_base, "user")?;
        match self.fetch::<AuthUser>(url).await {
            Ok(user) => Ok(Some(Identity::new(user.id))),
            Err(RemoteError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn join(base: &Url, path: &str) -> Result<Url, RemoteError> {
    Ok(base.join(path)?)
}

/// `Url::join` replaces the last segment unless the base ends with `/`.
fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    fn client(base: &str) -> SupabaseClient {
        client_with_token(base, None)
    }

    fn client_with_token(base: &str, token: Option<&str>) -> SupabaseClient {
        let config = RemoteConfig {
            base_url: Url::parse(base).unwrap(),
            anon_key: SecretString::from("anon-key"),
            access_token: token.map(SecretString::from),
            request_timeout: Duration::from_secs(5),
        };
        // Canned servers listen on loopback; keep proxy settings out of it.
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .no_proxy()
            .build()
            .unwrap();
        SupabaseClient::with_http_client(&config, http).unwrap()
    }

    /// Answer one request with a canned response. The handle yields the raw
    /// request head.
    async fn serve_once(
        status: &'static str,
        headers: &'static [&'static str],
        body: String,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }

            let mut response = format!("HTTP/1.1 {status}\r\n");
            for header in headers {
                response.push_str(header);
                response.push_str("\r\n");
            }
            response.push_str(&format!(
                "Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ));
            // The client may hang up as soon as it has seen the status.
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    #[test]
    fn test_endpoints_from_bare_host() {
        let client = client("https://abc.supabase.co");
        assert_eq!(client.inner.rest_base.as_str(), "https://abc.supabase.co/rest/v1/");
        assert_eq!(client.inner.auth_base.as_str(), "https://abc.supabase.co/auth/v1/");
    }

    #[test]
    fn test_endpoints_keep_path_prefix() {
        let client = client("http://localhost:54321/proxy");
        assert_eq!(
            client.inner.rest_base.as_str(),
            "http://localhost:54321/proxy/rest/v1/"
        );
    }

    #[test]
    fn test_table_url_encodes_filters() {
        let client = client("https://abc.supabase.co");
        let product_id = ProductId::random();
        let url = client
            .table_url(
                "comments",
                &[
                    ("product_id", format!("eq.{product_id}")),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/comments");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("product_id".to_string(), format!("eq.{product_id}")),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_current_session_without_token_is_none() {
        let client = client("https://abc.supabase.co");
        assert!(client.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_uses_retry_after() {
        let (base, server) = serve_once("429 Too Many Requests", &["Retry-After: 7"], String::new()).await;

        let err = client(&base)
            .delete_cart_item(CartItemId::random())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::RateLimited(7)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_defaults_to_one_second() {
        let (base, server) = serve_once("429 Too Many Requests", &[], String::new()).await;

        let err = client(&base)
            .list_comments(ProductId::random())
            .await
            .unwrap_err();

        assert!(matches!(err, RemoteError::RateLimited(1)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_and_forbidden_map_to_unauthorized() {
        for status in ["401 Unauthorized", "403 Forbidden"] {
            let (base, server) = serve_once(status, &[], "{}".to_string()).await;

            let err = client(&base)
                .delete_comment(CommentId::random())
                .await
                .unwrap_err();

            assert!(matches!(err, RemoteError::Unauthorized), "{status}");
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_expired_session_is_none() {
        let (base, server) = serve_once("401 Unauthorized", &[], "{}".to_string()).await;

        let session = client_with_token(&base, Some("expired-token"))
            .current_session()
            .await
            .unwrap();

        assert!(session.is_none());
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /auth/v1/user "));
        assert!(request.to_lowercase().contains("authorization: bearer expired-token"));
    }

    #[tokio::test]
    async fn test_current_session_reads_user_id() {
        let user_id = UserId::random();
        let (base, server) =
            serve_once("200 OK", &[], format!(r#"{{"id":"{user_id}","aud":"authenticated"}}"#)).await;

        let session = client_with_token(&base, Some("live-token"))
            .current_session()
            .await
            .unwrap();

        assert_eq!(session, Some(Identity::new(user_id)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_matching_nothing_is_not_found() {
        let (base, server) = serve_once("200 OK", &[], "[]".to_string()).await;
        let comment_id = CommentId::random();

        let err = client(&base).delete_comment(comment_id).await.unwrap_err();

        assert!(matches!(err, RemoteError::NotFound(what) if what == format!("comments {comment_id}")));
        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("delete /rest/v1/comments?id=eq."));
        assert!(request.contains("prefer: return=representation"));
        assert!(request.contains("apikey: anon-key"));
    }

    #[tokio::test]
    async fn test_delete_returning_row_succeeds() {
        let item_id = CartItemId::random();
        let (base, server) = serve_once("200 OK", &[], format!(r#"[{{"id":"{item_id}"}}]"#)).await;

        client(&base).delete_cart_item(item_id).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_body_is_truncated() {
        let (base, server) = serve_once("500 Internal Server Error", &[], "x".repeat(300)).await;

        let err = client(&base)
            .list_comments(ProductId::random())
            .await
            .unwrap_err();

        match err {
            RemoteError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }
}
