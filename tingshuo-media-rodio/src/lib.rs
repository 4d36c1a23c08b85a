//! Media backend that fetches audio over HTTP and plays it through rodio.
//!
//! Loading fetches the clip bytes with a retrying client and probes them
//! through the decoder, so an unreachable URL and an undecodable payload both
//! surface as load-level failures the engine's candidate fallback can move
//! past. Playback happens on a dedicated thread owning the audio output
//! stream; handles talk to it over a command channel.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tingshuo_core::{AudioHandle, CoreError, MediaBackend, PlaybackDone, Result, SharedHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

const LOG_TARGET: &str = "tingshuo::media::rodio";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// How often the output thread checks whether the current sink drained
const DRAIN_POLL_MS: u64 = 50;

enum Command {
    Play {
        clip_id: u64,
        url: String,
        bytes: Arc<[u8]>,
        started: oneshot::Sender<std::result::Result<(), String>>,
        done: oneshot::Sender<()>,
    },
    Pause {
        clip_id: u64,
    },
}

/// HTTP + rodio media backend.
pub struct RodioBackend {
    client: ClientWithMiddleware,
    commands: mpsc::Sender<Command>,
    next_clip_id: AtomicU64,
}

impl RodioBackend {
    /// Create the backend and spawn its output thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the output
    /// thread cannot be spawned.
    pub fn new() -> Result<Self> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let (commands, command_rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("tingshuo-audio-output".to_string())
            .spawn(move || output_thread(&command_rx))?;

        Ok(Self {
            client,
            commands,
            next_clip_id: AtomicU64::new(0),
        })
    }

    fn load_error(url: &str, reason: impl std::fmt::Display) -> CoreError {
        CoreError::MediaLoad {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl MediaBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    async fn load(&self, url: &str) -> Result<SharedHandle> {
        debug!(target: LOG_TARGET, "Fetching audio from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::load_error(url, e))?;

        if !response.status().is_success() {
            return Err(Self::load_error(
                url,
                format!("server returned {}", response.status()),
            ));
        }

        let bytes: Arc<[u8]> = response
            .bytes()
            .await
            .map_err(|e| Self::load_error(url, e))?
            .to_vec()
            .into();

        // An undecodable payload is a load failure so the caller can fall
        // back to the next candidate instead of failing at play time.
        probe(&bytes).map_err(|reason| Self::load_error(url, reason))?;

        debug!(target: LOG_TARGET, "Loaded {} ({} bytes)", url, bytes.len());
        Ok(Arc::new(RodioHandle {
            clip_id: self.next_clip_id.fetch_add(1, Ordering::Relaxed),
            url: url.to_string(),
            bytes,
            commands: self.commands.clone(),
        }))
    }
}

/// Check that the decoder accepts the payload.
fn probe(bytes: &Arc<[u8]>) -> std::result::Result<(), String> {
    Decoder::new(Cursor::new(Arc::clone(bytes)))
        .map(|_| ())
        .map_err(|e| e.to_string())
}

struct RodioHandle {
    clip_id: u64,
    url: String,
    bytes: Arc<[u8]>,
    commands: mpsc::Sender<Command>,
}

#[async_trait]
impl AudioHandle for RodioHandle {
    fn url(&self) -> &str {
        &self.url
    }

    async fn play(&self) -> Result<PlaybackDone> {
        let (started_tx, started_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        self.commands
            .send(Command::Play {
                clip_id: self.clip_id,
                url: self.url.clone(),
                bytes: Arc::clone(&self.bytes),
                started: started_tx,
                done: done_tx,
            })
            .map_err(|_| CoreError::PlaybackFailed {
                filename: self.url.clone(),
                reason: "audio output thread is gone".to_string(),
            })?;

        match started_rx.await {
            Ok(Ok(())) => Ok(PlaybackDone::new(done_rx)),
            Ok(Err(reason)) => Err(CoreError::PlaybackFailed {
                filename: self.url.clone(),
                reason,
            }),
            Err(_) => Err(CoreError::PlaybackFailed {
                filename: self.url.clone(),
                reason: "audio output thread is gone".to_string(),
            }),
        }
    }

    fn pause(&self) {
        if self
            .commands
            .send(Command::Pause {
                clip_id: self.clip_id,
            })
            .is_err()
        {
            warn!(target: LOG_TARGET, "Pause ignored: audio output thread is gone");
        }
    }
}

struct CurrentClip {
    clip_id: u64,
    sink: Sink,
    done: oneshot::Sender<()>,
}

fn output_thread(commands: &mpsc::Receiver<Command>) {
    let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
        error!(target: LOG_TARGET, "No audio output device; playback disabled");
        // Keep answering commands so play() fails cleanly instead of hanging.
        while let Ok(command) = commands.recv() {
            if let Command::Play { started, .. } = command {
                let _ = started.send(Err("no audio output device".to_string()));
            }
        }
        return;
    };

    let mut current: Option<CurrentClip> = None;
    loop {
        match commands.recv_timeout(Duration::from_millis(DRAIN_POLL_MS)) {
            Ok(Command::Play {
                clip_id,
                url,
                bytes,
                started,
                done,
            }) => {
                // One clip at a time: a new play supersedes the current sink.
                // Dropping its done sender resolves any stale waiter.
                if let Some(previous) = current.take() {
                    previous.sink.stop();
                }
                match start_clip(&stream_handle, &bytes) {
                    Ok(sink) => {
                        debug!(target: LOG_TARGET, "Playing {}", url);
                        let _ = started.send(Ok(()));
                        current = Some(CurrentClip {
                            clip_id,
                            sink,
                            done,
                        });
                    }
                    Err(reason) => {
                        let _ = started.send(Err(reason));
                    }
                }
            }
            Ok(Command::Pause { clip_id }) => {
                if let Some(clip) = current.as_ref() {
                    if clip.clip_id == clip_id {
                        clip.sink.pause();
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // A paused sink never drains, so a stopped clip keeps its
                // done sender until the next play supersedes it.
                if current.as_ref().is_some_and(|c| c.sink.empty()) {
                    if let Some(clip) = current.take() {
                        let _ = clip.done.send(());
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn start_clip(
    stream_handle: &OutputStreamHandle,
    bytes: &Arc<[u8]>,
) -> std::result::Result<Sink, String> {
    let source = Decoder::new(Cursor::new(Arc::clone(bytes))).map_err(|e| e.to_string())?;
    let sink = Sink::try_new(stream_handle).map_err(|e| e.to_string())?;
    sink.append(source);
    sink.play();
    Ok(sink)
}
