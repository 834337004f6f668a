use std::future::Future;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::ServiceError;
use crate::frequency::FrequencyMode;
use crate::intake::CandidateFile;

const DETECT_PATH: &str = "/api/detect-hum";
const PROCESS_PATH: &str = "/api/process-audio";

/// Body of a successful `/api/detect-hum` call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub detected_frequency: Option<f64>,
}

/// Body of a successful `/api/process-audio` call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReply {
    /// Standard base64 of the cleaned WAV file.
    pub processed_audio: String,
    pub detected_frequency: Option<f64>,
    pub hum_frequency: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// The two remote calls the session depends on.
///
/// Returned futures own everything they need so they can run on a spawned
/// task and be aborted there.
pub trait HumService {
    fn detect_hum(
        &self,
        file: CandidateFile,
    ) -> impl Future<Output = Result<Detection, ServiceError>> + Send + 'static;

    fn process_audio(
        &self,
        file: CandidateFile,
        mode: FrequencyMode,
    ) -> impl Future<Output = Result<TransformReply, ServiceError>> + Send + 'static;
}

/// `HumService` over HTTP multipart uploads.
#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl HumService for HttpService {
    fn detect_hum(
        &self,
        file: CandidateFile,
    ) -> impl Future<Output = Result<Detection, ServiceError>> + Send + 'static {
        let client = self.client.clone();
        let url = self.url(DETECT_PATH);

        async move {
            let form = Form::new().part("file", file_part(&file));
            let resp = client.post(&url).multipart(form).send().await?;

            if !resp.status().is_success() {
                return Err(ServiceError::Status {
                    status: resp.status().as_u16(),
                    error: None,
                });
            }

            Ok(resp.json::<Detection>().await?)
        }
    }

    fn process_audio(
        &self,
        file: CandidateFile,
        mode: FrequencyMode,
    ) -> impl Future<Output = Result<TransformReply, ServiceError>> + Send + 'static {
        let client = self.client.clone();
        let url = self.url(PROCESS_PATH);

        async move {
            log::info!("Uploading {} ({} bytes, mode {mode})", file.name(), file.size());
            let form = Form::new()
                .part("file", file_part(&file))
                .text("humFrequency", mode.form_value());
            let resp = client.post(&url).multipart(form).send().await?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body: ErrorBody = resp.json().await.unwrap_or_default();
                return Err(ServiceError::Status {
                    status,
                    error: body.error,
                });
            }

            Ok(resp.json::<TransformReply>().await?)
        }
    }
}

/// Multipart part carrying the file, typed when the declared type parses.
fn file_part(file: &CandidateFile) -> Part {
    let part = || {
        Part::stream_with_length(file.data().clone(), file.size()).file_name(file.name().to_string())
    };
    if file.media_type().is_empty() {
        return part();
    }
    part().mime_str(file.media_type()).unwrap_or_else(|e| {
        log::debug!("Dropping unusable media type {:?}: {e}", file.media_type());
        part()
    })
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::error::describe_failure;
    use crate::intake::{validate, RawFile};

    /// Answers one request with `status`, `content_type` and `body`, and hands
    /// back the raw request it received.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: &'static str,
    ) -> (HttpService, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (HttpService::new(&format!("http://{addr}")), server)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..head_end].lines().find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            });
            let complete = match length {
                Some(length) => buf.len() >= head_end + 4 + length,
                None => text.ends_with("0\r\n\r\n"),
            };
            if complete {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn take(name: &str) -> CandidateFile {
        validate(RawFile::new(name, "audio/wav", b"RIFF-take".to_vec())).unwrap()
    }

    #[tokio::test]
    async fn process_uploads_file_and_mode() {
        let (svc, server) = serve_once(
            "200 OK",
            "application/json",
            r#"{"success":true,"processedAudio":"YWI=","detectedFrequency":60,"message":"done"}"#,
        )
        .await;

        let reply = svc.process_audio(take("a.wav"), FrequencyMode::Hz60).await.unwrap();
        assert_eq!(reply.processed_audio, "YWI=");
        assert_eq!(reply.detected_frequency, Some(60.0));
        assert_eq!(reply.message.as_deref(), Some("done"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/process-audio "));
        assert!(request.contains(r#"name="file"; filename="a.wav""#));
        assert!(request.contains("RIFF-take"));
        assert!(request.contains(r#"name="humFrequency""#));
        assert!(request.contains("\r\n\r\n60\r\n"));
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_the_status() {
        let (svc, server) = serve_once("500 Internal Server Error", "text/html", "<html/>xx").await;

        let err = svc
            .process_audio(take("a.wav"), FrequencyMode::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Status { status: 500, error: None }));
        assert_eq!(
            describe_failure(&err),
            "Server error: Server error (500). You can retry processing."
        );
        assert!(server.await.unwrap().contains("\r\n\r\nauto\r\n"));
    }

    #[tokio::test]
    async fn client_error_text_is_passed_through() {
        let (svc, _server) = serve_once(
            "400 Bad Request",
            "application/json",
            r#"{"error":"Unsupported sample rate"}"#,
        )
        .await;

        let err = svc
            .process_audio(take("a.wav"), FrequencyMode::Hz50)
            .await
            .unwrap_err();
        assert_eq!(describe_failure(&err), "Unsupported sample rate");
    }

    #[tokio::test]
    async fn detect_without_frequency_finds_nothing() {
        let (svc, server) =
            serve_once("200 OK", "application/json", r#"{"success":true}"#).await;

        let detection = svc.detect_hum(take("b.wav")).await.unwrap();
        assert_eq!(detection, Detection::default());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/detect-hum "));
        assert!(request.contains(r#"filename="b.wav""#));
        assert!(!request.contains("humFrequency"));
    }

    #[test]
    fn transform_reply_tolerates_missing_fields() {
        let reply: TransformReply =
            serde_json::from_str(r#"{"processedAudio":"YWI=","success":true}"#).unwrap();
        assert_eq!(reply.processed_audio, "YWI=");
        assert_eq!(reply.detected_frequency, None);
        assert_eq!(reply.message, None);

        let reply: TransformReply = serde_json::from_str(
            r#"{"processedAudio":"","humFrequency":50,"sampleRate":44100,"message":"done"}"#,
        )
        .unwrap();
        assert_eq!(reply.hum_frequency, Some(50.0));
        assert_eq!(reply.message.as_deref(), Some("done"));
    }

    #[test]
    fn detection_body_may_be_empty() {
        let d: Detection = serde_json::from_str("{}").unwrap();
        assert_eq!(d, Detection::default());
        let d: Detection = serde_json::from_str(r#"{"detectedFrequency":60}"#).unwrap();
        assert_eq!(d.detected_frequency, Some(60.0));
    }

    #[test]
    fn base_url_is_joined_without_double_slash() {
        let svc = HttpService::new("http://localhost:5000/");
        assert_eq!(svc.url(PROCESS_PATH), "http://localhost:5000/api/process-audio");
    }
}
