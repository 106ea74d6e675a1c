//! Message host for the browser extension shell.
//!
//! The shell sends JSON requests tagged by `action`; every request gets
//! exactly one JSON response. Over stdio, messages use the browser
//! native-messaging framing: a `u32` length in native byte order, then that
//! many bytes of UTF-8 JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::download::{DownloadReport, ImageDownloader};
use crate::images::ImageRef;
use crate::output::save_markdown;
use crate::settings::Settings;
use crate::{EzyCopyError, Result};

/// Largest frame accepted from the shell.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetSettings,
    DownloadImages { images: Vec<ImageRef>, subfolder: String },
    DownloadMarkdown { content: String, filename: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Settings(Settings),
    Images {
        success: bool,
        #[serde(flatten)]
        report: DownloadReport,
    },
    Saved {
        success: bool,
        path: String,
    },
    Failed {
        success: bool,
        error: String,
    },
}

impl Response {
    pub fn failed(error: impl Into<String>) -> Self {
        Response::Failed { success: false, error: error.into() }
    }
}

/// A single path component, or `None` for anything that could leave the
/// target folder.
fn plain_name(name: &str) -> Option<&str> {
    let file_name = Path::new(name).file_name()?.to_str()?;
    (file_name == name).then_some(file_name)
}

/// Answers shell requests.
#[derive(Debug, Clone)]
pub struct Host {
    settings_path: Option<PathBuf>,
    downloader: ImageDownloader,
}

impl Host {
    /// `settings_path` of `None` always answers with default settings.
    pub fn new(settings_path: Option<PathBuf>, downloader: ImageDownloader) -> Self {
        Self { settings_path, downloader }
    }

    fn markdown_root(&self) -> &Path {
        &self.downloader.config().root
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::GetSettings => {
                let settings = match &self.settings_path {
                    Some(path) => Settings::load(path).unwrap_or_else(|err| {
                        warn!(error = %err, "falling back to default settings");
                        Settings::default()
                    }),
                    None => Settings::default(),
                };
                Response::Settings(settings)
            }
            Request::DownloadImages { images, subfolder } => {
                let Some(subfolder) = plain_name(&subfolder) else {
                    return Response::failed(format!("invalid subfolder '{subfolder}'"));
                };
                match self.downloader.download_all(&images, subfolder).await {
                    Ok(report) => Response::Images { success: true, report },
                    Err(err) => Response::failed(err.to_string()),
                }
            }
            Request::DownloadMarkdown { content, filename } => {
                let Some(filename) = plain_name(&filename) else {
                    return Response::failed(format!("invalid filename '{filename}'"));
                };
                match save_markdown(self.markdown_root(), filename, &content) {
                    Ok(path) => Response::Saved { success: true, path: path.display().to_string() },
                    Err(err) => Response::failed(err.to_string()),
                }
            }
        }
    }

    /// Parses and answers one raw request. Malformed input yields an error
    /// response rather than an error.
    pub async fn handle_bytes(&self, payload: &[u8]) -> Response {
        match serde_json::from_slice::<Request>(payload) {
            Ok(request) => {
                debug!(?request, "handling request");
                self.handle(request).await
            }
            Err(err) => {
                warn!(error = %err, "malformed request");
                Response::failed(EzyCopyError::Protocol(err.to_string()).to_string())
            }
        }
    }

    /// Serves framed requests until the shell closes `reader`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while let Some(payload) = read_frame(&mut reader).await? {
            let response = self.handle_bytes(&payload).await;
            let json = serde_json::to_vec(&response).map_err(|e| EzyCopyError::Protocol(e.to_string()))?;
            write_frame(&mut writer, &json).await?;
        }
        debug!("shell closed the channel");
        Ok(())
    }
}

/// Reads one frame; `None` on a clean end of stream.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(EzyCopyError::Protocol(err.to_string())),
    }

    let len = u32::from_ne_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(EzyCopyError::Protocol(format!("frame of {len} bytes exceeds {MAX_FRAME_LEN}")));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(|e| EzyCopyError::Protocol(format!("truncated frame: {e}")))?;
    Ok(Some(payload))
}

/// Writes one frame and flushes.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| EzyCopyError::Protocol(format!("frame of {} bytes is too large", payload.len())))?;

    let io = |e: std::io::Error| EzyCopyError::Protocol(e.to_string());
    writer.write_all(&len.to_ne_bytes()).await.map_err(io)?;
    writer.write_all(payload).await.map_err(io)?;
    writer.flush().await.map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::DownloadConfig;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn host(root: &Path, settings_path: Option<PathBuf>) -> Host {
        let config = DownloadConfig { root: root.to_path_buf(), ..Default::default() };
        Host::new(settings_path, ImageDownloader::with_client(reqwest::Client::new(), config))
    }

    fn to_json(response: &Response) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[test]
    fn test_request_wire_shape() {
        let request: Request = serde_json::from_value(json!({
            "action": "downloadImages",
            "images": [{"src": "https://a.co/x.png", "alt": "x"}],
            "subfolder": "Post-2024-01-01"
        }))
        .unwrap();

        assert_eq!(
            request,
            Request::DownloadImages {
                images: vec![ImageRef { src: "https://a.co/x.png".into(), alt: "x".into() }],
                subfolder: "Post-2024-01-01".into(),
            }
        );
        assert_eq!(serde_json::to_value(Request::GetSettings).unwrap(), json!({"action": "getSettings"}));
    }

    #[tokio::test]
    async fn test_get_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"experimental": {"selectiveCopy": true}}"#).unwrap();

        let response = host(dir.path(), Some(path)).handle(Request::GetSettings).await;
        let value = to_json(&response);

        assert_eq!(value["selectiveCopy"], true);
        assert_eq!(value["copyToClipboard"], true);
    }

    #[tokio::test]
    async fn test_download_markdown() {
        let dir = TempDir::new().unwrap();
        let host = host(dir.path(), None);
        let request = Request::DownloadMarkdown { content: "# T".into(), filename: "T-2024-01-01.md".into() };

        let first = to_json(&host.handle(request.clone()).await);
        let second = to_json(&host.handle(request).await);

        assert_eq!(first["success"], true);
        assert!(first["path"].as_str().unwrap().ends_with("T-2024-01-01.md"));
        assert!(second["path"].as_str().unwrap().ends_with("T-2024-01-01 (1).md"));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let host = host(dir.path(), None);

        let saved = host.handle(Request::DownloadMarkdown { content: "x".into(), filename: "../evil.md".into() }).await;
        assert_eq!(to_json(&saved)["success"], false);

        let images = host.handle(Request::DownloadImages { images: vec![], subfolder: "a/b".into() }).await;
        assert_eq!(to_json(&images)["success"], false);
    }

    #[tokio::test]
    async fn test_empty_image_batch_response() {
        let dir = TempDir::new().unwrap();
        let response = host(dir.path(), None)
            .handle(Request::DownloadImages { images: vec![], subfolder: "p".into() })
            .await;

        assert_eq!(
            to_json(&response),
            json!({"success": true, "urlToPathMap": {}, "totalImages": 0, "downloadedCount": 0})
        );
    }

    #[tokio::test]
    async fn test_serve_survives_malformed_request() {
        let dir = TempDir::new().unwrap();
        let host = host(dir.path(), None);

        let mut input = Vec::new();
        write_frame(&mut input, b"{\"action\": \"explode\"}").await.unwrap();
        write_frame(&mut input, br#"{"action": "getSettings"}"#).await.unwrap();

        let mut output = Vec::new();
        host.serve(input.as_slice(), &mut output).await.unwrap();

        let mut reader = output.as_slice();
        let first: Value = serde_json::from_slice(&read_frame(&mut reader).await.unwrap().unwrap()).unwrap();
        let second: Value = serde_json::from_slice(&read_frame(&mut reader).await.unwrap().unwrap()).unwrap();

        assert_eq!(first["success"], false);
        assert!(first["error"].as_str().unwrap().contains("Protocol error"));
        assert_eq!(second["includeImages"], true);
        assert!(read_frame(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let mut input = Vec::new();
        input.extend_from_slice(&u32::MAX.to_ne_bytes());
        let err = read_frame(&mut input.as_slice()).await.unwrap_err();
        assert!(matches!(err, EzyCopyError::Protocol(_)));
    }
}
