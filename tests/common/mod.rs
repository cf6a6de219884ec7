//! Shared fixtures for integration tests: a scripted analyzer, generated
//! images and a context rooted in a temporary directory.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use loss_report::{AnalyzerError, AppContext, DamageAnalyzer, ServiceConfig};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const CAPTION: &str = "a water-stained ceiling with peeling paint";
pub const DESCRIPTION: &str = "The ceiling shows extensive water staining consistent with a roof leak.";

/// How a scripted call should behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Succeed,
    Fail,
    Hang,
}

/// [`DamageAnalyzer`] with canned answers and call counters.
pub struct FakeAnalyzer {
    caption: Script,
    enhance: Script,
    pub caption_calls: AtomicUsize,
    pub enhance_calls: AtomicUsize,
    /// `(caption, damage_label)` of every enhance call.
    pub enhance_args: Mutex<Vec<(String, String)>>,
}

impl FakeAnalyzer {
    pub fn new() -> Arc<Self> {
        Self::scripted(Script::Succeed, Script::Succeed)
    }

    pub fn scripted(caption: Script, enhance: Script) -> Arc<Self> {
        Arc::new(Self {
            caption,
            enhance,
            caption_calls: AtomicUsize::new(0),
            enhance_calls: AtomicUsize::new(0),
            enhance_args: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.caption_calls.load(Ordering::SeqCst),
            self.enhance_calls.load(Ordering::SeqCst),
        )
    }

    async fn play(script: Script, answer: &str) -> Result<String, AnalyzerError> {
        match script {
            Script::Succeed => Ok(answer.to_string()),
            Script::Fail => Err(AnalyzerError::Api {
                message: "scripted failure".into(),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(answer.to_string())
            }
        }
    }
}

#[async_trait]
impl DamageAnalyzer for FakeAnalyzer {
    async fn caption(&self, _image: &DynamicImage) -> Result<String, AnalyzerError> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        Self::play(self.caption, CAPTION).await
    }

    async fn enhance(&self, caption: &str, damage_label: &str) -> Result<String, AnalyzerError> {
        self.enhance_calls.fetch_add(1, Ordering::SeqCst);
        self.enhance_args
            .lock()
            .unwrap()
            .push((caption.to_string(), damage_label.to_string()));
        Self::play(self.enhance, DESCRIPTION).await
    }
}

/// A gradient image so encoders have something non-trivial to compress.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn encoded(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(&gradient(width, height), ImageFormat::Png)
}

/// Everything a test needs, owned by one temp directory.
pub struct Harness {
    pub dir: TempDir,
    pub ctx: AppContext,
}

impl Harness {
    pub async fn new(analyzer: Arc<FakeAnalyzer>) -> Self {
        Self::with_config(analyzer, |b| b).await
    }

    pub async fn with_config(
        analyzer: Arc<FakeAnalyzer>,
        tweak: impl FnOnce(loss_report::ServiceConfigBuilder) -> loss_report::ServiceConfigBuilder,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = tweak(
            ServiceConfig::builder()
                .history_path(dir.path().join("data/detection_history.json"))
                .upload_dir(dir.path().join("uploads")),
        )
        .build()
        .unwrap();
        let ctx = AppContext::with_analyzer(config, analyzer).await.unwrap();
        Self { dir, ctx }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.path().join("data/detection_history.json")
    }

    /// Files left behind in the staging directory.
    pub fn staged_files(&self) -> usize {
        count_files(&self.upload_dir())
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
