use std::{sync::Arc, time::Duration};

use hyper::{
    body::Bytes,
    client::HttpConnector,
    header::{HeaderValue, ACCEPT, USER_AGENT},
    Body, Client, Request, Response, Uri,
};
use hyper_tls::HttpsConnector;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::{
    error::{MirrorError, Result},
    listing::{parse_listing, Listing},
};

const AGENT: &str = concat!("repo-mirror/", env!("CARGO_PKG_VERSION"));

/// The HTTP side of a mirror run. One instance is shared by every task of a
/// run; the connection pool is released once the last handle is dropped.
pub struct Fetcher {
    client: Client<HttpsConnector<HttpConnector>>,
    timeout: Option<Duration>,
    permits: Option<Arc<Semaphore>>,
}

impl Fetcher {
    /// `max_requests` bounds the number of requests in flight at once, `None`
    /// leaves it unbounded. `timeout` applies to each request including reading
    /// its body.
    pub fn new(timeout: Option<Duration>, max_requests: Option<usize>) -> Self {
        let client = Client::builder().build::<_, Body>(HttpsConnector::new());
        Self {
            client,
            timeout,
            permits: max_requests.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Issues a GET and returns the response if it has a success status.
    pub async fn get(&self, url: &str) -> Result<Response<Body>> {
        let uri: Uri = url.parse().map_err(|source| MirrorError::InvalidUrl {
            url: url.into(),
            source,
        })?;

        let mut request = Request::new(Body::empty());
        *request.uri_mut() = uri;
        request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static(AGENT));
        request
            .headers_mut()
            .insert(ACCEPT, HeaderValue::from_static("application/json, */*"));

        info!("GET {url} HTTP/1.1");
        let resp = self
            .client
            .request(request)
            .await
            .map_err(|source| MirrorError::Network {
                url: url.into(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(MirrorError::Status {
                url: url.into(),
                status: resp.status(),
            });
        }

        Ok(resp)
    }

    /// Downloads the full body at `url` into memory.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| MirrorError::Closed { url: url.into() })?,
            ),
            None => None,
        };

        let download = async {
            let resp = self.get(url).await?;
            hyper::body::to_bytes(resp.into_body())
                .await
                .map_err(|source| MirrorError::Network {
                    url: url.into(),
                    source,
                })
        };

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, download)
                .await
                .map_err(|_| MirrorError::Timeout {
                    url: url.into(),
                    timeout,
                })?,
            None => download.await,
        }
    }

    /// Fetches and parses the directory listing at `url`.
    pub async fn get_listing(&self, url: &str) -> Result<Listing> {
        let body = self.get_bytes(url).await?;
        parse_listing(url, &body)
    }

    /// Stops admitting new requests. Requests waiting for a permit fail with
    /// [`MirrorError::Closed`]; the pool itself goes away with the last handle.
    pub fn close(&self) {
        if let Some(permits) = &self.permits {
            permits.close();
        }
        debug!("http client closed");
    }
}
