use super::Task;

/// How `resize` fits the image into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFit {
    Clip,
    Crop,
    Scale,
    Max,
}

impl ResizeFit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeFit::Clip => "clip",
            ResizeFit::Crop => "crop",
            ResizeFit::Scale => "scale",
            ResizeFit::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAlign {
    Left,
    Right,
    Top,
    Bottom,
    Center,
    Faces,
}

impl ResizeAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeAlign::Left => "left",
            ResizeAlign::Right => "right",
            ResizeAlign::Top => "top",
            ResizeAlign::Bottom => "bottom",
            ResizeAlign::Center => "center",
            ResizeAlign::Faces => "faces",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Option<ResizeFit>,
    pub align: Option<ResizeAlign>,
}

impl ResizeParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("resize");
        if let Some(width) = self.width {
            task.arg("width", width.to_string());
        }
        if let Some(height) = self.height {
            task.arg("height", height.to_string());
        }
        if let Some(fit) = self.fit {
            task.arg("fit", fit.as_str().to_owned());
        }
        if let Some(align) = self.align {
            task.arg("align", align.as_str().to_owned());
        }
        task
    }
}

/// Rectangular crop. `dim` is `[x, y, width, height]` in pixels.
#[derive(Debug, Clone)]
pub struct CropParams {
    pub dim: [u32; 4],
}

impl CropParams {
    pub(crate) fn to_task(&self) -> Task {
        let [x, y, w, h] = self.dim;
        let mut task = Task::new("crop");
        task.arg("dim", format!("[{},{},{},{}]", x, y, w, h));
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct RotateParams {
    /// Degrees clockwise. Absent means the service honors EXIF orientation.
    pub deg: Option<u32>,
    pub exif: Option<bool>,
    /// Fill color for the exposed corners, e.g. `"white"` or `"FF0000"`.
    pub background: Option<String>,
}

impl RotateParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("rotate");
        if let Some(deg) = self.deg {
            task.arg("deg", deg.to_string());
        }
        if let Some(exif) = self.exif {
            task.arg("exif", exif.to_string());
        }
        if let Some(background) = &self.background {
            task.arg("background", background.clone());
        }
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlurParams {
    pub amount: Option<u32>,
}

impl BlurParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("blur");
        if let Some(amount) = self.amount {
            task.arg("amount", amount.to_string());
        }
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct SharpenParams {
    pub amount: Option<u32>,
}

impl SharpenParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("sharpen");
        if let Some(amount) = self.amount {
            task.arg("amount", amount.to_string());
        }
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct SepiaParams {
    pub tone: Option<u32>,
}

impl SepiaParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("sepia");
        if let Some(tone) = self.tone {
            task.arg("tone", tone.to_string());
        }
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoundedCornersParams {
    pub radius: Option<u32>,
    pub blur: Option<f32>,
    pub background: Option<String>,
}

impl RoundedCornersParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("rounded_corners");
        if let Some(radius) = self.radius {
            task.arg("radius", radius.to_string());
        }
        if let Some(blur) = self.blur {
            task.arg("blur", blur.to_string());
        }
        if let Some(background) = &self.background {
            task.arg("background", background.clone());
        }
        task
    }
}

#[derive(Debug, Clone, Default)]
pub struct VignetteParams {
    pub amount: Option<u32>,
    pub background: Option<String>,
}

impl VignetteParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("vignette");
        if let Some(amount) = self.amount {
            task.arg("amount", amount.to_string());
        }
        if let Some(background) = &self.background {
            task.arg("background", background.clone());
        }
        task
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkPosition {
    Top,
    Middle,
    Bottom,
    Left,
    Center,
    Right,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatermarkPosition::Top => "top",
            WatermarkPosition::Middle => "middle",
            WatermarkPosition::Bottom => "bottom",
            WatermarkPosition::Left => "left",
            WatermarkPosition::Center => "center",
            WatermarkPosition::Right => "right",
        }
    }
}

/// Overlay another stored file on top of the source.
#[derive(Debug, Clone)]
pub struct WatermarkParams {
    /// Handle of the overlay file.
    pub file: String,
    /// Overlay size as a percentage of the source, 1-500.
    pub size: Option<u32>,
    pub position: Option<WatermarkPosition>,
}

impl WatermarkParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("watermark");
        task.arg("file", self.file.clone());
        if let Some(size) = self.size {
            task.arg("size", size.to_string());
        }
        if let Some(position) = self.position {
            task.arg("position", position.as_str().to_owned());
        }
        task
    }
}

/// Re-encode to another format.
#[derive(Debug, Clone, Default)]
pub struct OutputParams {
    /// Target format, e.g. `"png"`, `"jpg"`, `"webp"`.
    pub format: Option<String>,
    pub quality: Option<u8>,
    pub density: Option<u32>,
    pub compress: Option<bool>,
}

impl OutputParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("output");
        if let Some(format) = &self.format {
            task.arg("format", format.clone());
        }
        if let Some(quality) = self.quality {
            task.arg("quality", quality.to_string());
        }
        if let Some(density) = self.density {
            task.arg("density", density.to_string());
        }
        if let Some(compress) = self.compress {
            task.arg("compress", compress.to_string());
        }
        task
    }
}

/// Transcode a video source.
#[derive(Debug, Clone, Default)]
pub struct VideoConvertParams {
    /// Named encoding preset, e.g. `"h264"`, `"webm"`.
    pub preset: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub video_bitrate: Option<u32>,
    pub audio_bitrate: Option<u32>,
    /// Re-run the conversion even when a cached result exists.
    pub force: Option<bool>,
}

impl VideoConvertParams {
    pub(crate) fn to_task(&self) -> Task {
        let mut task = Task::new("video_convert");
        if let Some(preset) = &self.preset {
            task.arg("preset", preset.clone());
        }
        if let Some(width) = self.width {
            task.arg("width", width.to_string());
        }
        if let Some(height) = self.height {
            task.arg("height", height.to_string());
        }
        if let Some(fps) = self.fps {
            task.arg("fps", fps.to_string());
        }
        if let Some(video_bitrate) = self.video_bitrate {
            task.arg("video_bitrate", video_bitrate.to_string());
        }
        if let Some(audio_bitrate) = self.audio_bitrate {
            task.arg("audio_bitrate", audio_bitrate.to_string());
        }
        if let Some(force) = self.force {
            task.arg("force", force.to_string());
        }
        task
    }
}
