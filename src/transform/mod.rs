mod params;

pub use params::{
    BlurParams, CropParams, OutputParams, ResizeAlign, ResizeFit,
    ResizeParams, RotateParams, RoundedCornersParams, SepiaParams,
    SharpenParams, VideoConvertParams, VignetteParams, WatermarkParams,
    WatermarkPosition,
};

use url::Url;

use crate::config::Session;
use crate::Result;

/// One processing operation, serialized as `name=key:value,...` or as the
/// bare task name when no parameters were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    name: &'static str,
    args: Vec<(&'static str, String)>,
}

impl Task {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    pub(crate) fn arg(&mut self, key: &'static str, value: String) {
        self.args.push((key, value));
    }

    pub(crate) fn serialize(&self) -> String {
        if self.args.is_empty() {
            return self.name.to_owned();
        }
        let args = self
            .args
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}={}", self.name, args)
    }
}

/// What the processing chain is applied to.
#[derive(Debug, Clone)]
pub enum TransformSource {
    /// A file already stored with the service.
    Handle(String),
    /// An arbitrary external URL, fetched by the service on demand.
    External(Url),
}

impl TransformSource {
    pub fn handle<S: Into<String>>(handle: S) -> Self {
        Self::Handle(handle.into())
    }

    pub fn external(url: Url) -> Self {
        Self::External(url)
    }

    fn segment(&self) -> String {
        match self {
            TransformSource::Handle(handle) => handle.clone(),
            TransformSource::External(url) => url.to_string(),
        }
    }
}

/// An ordered chain of processing operations.
///
/// Operations serialize in insertion order; an empty chain yields the plain
/// delivery URL for the source.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    tasks: Vec<Task>,
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize(mut self, params: ResizeParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn crop(mut self, params: CropParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn rotate(mut self, params: RotateParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn flip(mut self) -> Self {
        self.tasks.push(Task::new("flip"));
        self
    }

    pub fn flop(mut self) -> Self {
        self.tasks.push(Task::new("flop"));
        self
    }

    pub fn monochrome(mut self) -> Self {
        self.tasks.push(Task::new("monochrome"));
        self
    }

    pub fn blur(mut self, params: BlurParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn sharpen(mut self, params: SharpenParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn sepia(mut self, params: SepiaParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn rounded_corners(mut self, params: RoundedCornersParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn vignette(mut self, params: VignetteParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn watermark(mut self, params: WatermarkParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn quality(mut self, value: u8) -> Self {
        let mut task = Task::new("quality");
        task.arg("value", value.to_string());
        self.tasks.push(task);
        self
    }

    pub fn output(mut self, params: OutputParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn video_convert(mut self, params: VideoConvertParams) -> Self {
        self.tasks.push(params.to_task());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Build the processing URL for `source` under `session`.
    ///
    /// External sources carry the apikey as the first path segment; stored
    /// handles are already bound to an application. A security pair, when
    /// present, becomes a leading `security=...` task.
    pub fn build_url(
        &self,
        session: &Session,
        source: &TransformSource,
    ) -> Result<Url> {
        let mut segments: Vec<String> = Vec::new();
        if matches!(source, TransformSource::External(_)) {
            segments.push(session.apikey.clone());
        }
        if let Some(security) = &session.security {
            segments.push(format!(
                "security=policy:{},signature:{}",
                security.policy, security.signature
            ));
        }
        segments.extend(self.tasks.iter().map(Task::serialize));
        segments.push(source.segment());

        let base = session.cdn_host.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{}/{}", base, segments.join("/")))?;
        Ok(url)
    }
}
