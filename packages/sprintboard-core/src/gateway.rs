/// Persistence boundary used by the drag controller.
///
/// The core only distinguishes success from failure: any transport problem
/// or non-success response is a `GatewayError`.
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Request rejected with status {0}")]
    Rejected(u16),
}

pub trait PersistenceGateway: Send + Sync {
    /// Persist `{ status }` for one task.
    fn update_task_status(
        &self,
        task_id: &str,
        status: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

#[cfg(feature = "http-gateway")]
pub use http::HttpGateway;

#[cfg(feature = "http-gateway")]
mod http {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

    use super::{GatewayError, PersistenceGateway};

    /// Unreserved characters stay as-is in a path segment.
    const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'~');

    /// Talks to the server's `PATCH /api/tasks/{id}` route.
    #[derive(Debug, Clone)]
    pub struct HttpGateway {
        base_url: String,
        user_id: Option<String>,
        client: reqwest::Client,
    }

    impl HttpGateway {
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                user_id: None,
                client: reqwest::Client::new(),
            }
        }

        /// Send requests on behalf of `user_id` (the `X-User-Id` header).
        pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
            self.user_id = Some(user_id.into());
            self
        }

        pub fn task_url(&self, task_id: &str) -> String {
            format!(
                "{}/api/tasks/{}",
                self.base_url,
                utf8_percent_encode(task_id, PATH_SEGMENT)
            )
        }
    }

    impl PersistenceGateway for HttpGateway {
        async fn update_task_status(&self, task_id: &str, status: &str) -> Result<(), GatewayError> {
            let mut request = self
                .client
                .patch(self.task_url(task_id))
                .json(&serde_json::json!({ "status": status }));
            if let Some(user_id) = &self.user_id {
                request = request.header("x-user-id", user_id);
            }

            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;

            if !response.status().is_success() {
                return Err(GatewayError::Rejected(response.status().as_u16()));
            }
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_task_url_strips_trailing_slash() {
            let gateway = HttpGateway::new("http://localhost:8080/");
            assert_eq!(gateway.task_url("t1"), "http://localhost:8080/api/tasks/t1");
        }

        #[test]
        fn test_task_url_encodes_id() {
            let gateway = HttpGateway::new("http://localhost:8080");
            assert_eq!(
                gateway.task_url("a/b c?d"),
                "http://localhost:8080/api/tasks/a%2Fb%20c%3Fd"
            );
            assert_eq!(gateway.task_url("t-1_x.y"), "http://localhost:8080/api/tasks/t-1_x.y");
        }

        #[tokio::test]
        async fn test_unreachable_server_is_transport_error() {
            let gateway = HttpGateway::new("http://127.0.0.1:1");
            let result = gateway.update_task_status("t1", "done").await;
            assert!(matches!(result, Err(GatewayError::Transport(_))));
        }
    }
}
