use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// How the absolute-difference image is binarised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `diff > value` is foreground.
    Fixed { value: u8 },
    /// Otsu level of the difference histogram, never below `floor`.
    ///
    /// Suppresses low-contrast noise; thin defects with weak contrast may be
    /// lost.
    OtsuWithFloor { floor: u8 },
}

impl ThresholdMode {
    /// The configured constant (fixed value or Otsu floor).
    pub fn base_value(&self) -> u8 {
        match *self {
            ThresholdMode::Fixed { value } => value,
            ThresholdMode::OtsuWithFloor { floor } => floor,
        }
    }

    /// Same mode with a different constant.
    pub fn with_value(self, v: u8) -> Self {
        match self {
            ThresholdMode::Fixed { .. } => ThresholdMode::Fixed { value: v },
            ThresholdMode::OtsuWithFloor { .. } => ThresholdMode::OtsuWithFloor { floor: v },
        }
    }
}

/// Mask cleaning settings. Kernels are `k × k` squares with odd `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphologyParams {
    /// Opening kernel; `None` skips the opening step.
    pub open_kernel: Option<u32>,
    pub dilate_kernel: u32,
    pub dilate_iterations: u32,
}

/// Encoding used for emitted crops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CropFormat {
    Jpeg { quality: u8 },
    Png,
}

impl Default for CropFormat {
    fn default() -> Self {
        CropFormat::Jpeg { quality: 95 }
    }
}

impl CropFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            CropFormat::Jpeg { .. } => "jpg",
            CropFormat::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            CropFormat::Jpeg { .. } => ImageFormat::Jpeg,
            CropFormat::Png => ImageFormat::Png,
        }
    }
}

/// Named parameter sets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Otsu with floor 70, 3×3 opening, 3×3 dilation ×2, area > 450, 20 px padding.
    #[default]
    Standard,
    /// Fixed 30, no opening, 3×3 dilation ×2, area > 100, 45 px padding.
    ///
    /// Keeps thin defects such as spurs at the cost of more false candidates.
    Sensitive,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::Standard, Preset::Sensitive];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Standard => "standard",
            Preset::Sensitive => "sensitive",
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Preset::Standard),
            "sensitive" => Ok(Preset::Sensitive),
            _ => Err(ParamsError::UnknownPreset(s.to_owned())),
        }
    }
}

/// Configuration errors. These are fatal for a batch: they indicate a broken
/// configuration, not bad input data.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("{name} kernel size must be odd and >= 1 (got {size})")]
    InvalidKernel { name: &'static str, size: u32 },
    #[error("{name} kernel size {size} exceeds the supported maximum of 511")]
    KernelTooLarge { name: &'static str, size: u32 },
    #[error("padding must be >= 0 (got {0})")]
    NegativePadding(i32),
    #[error("min_area must be a finite value > 0 (got {0})")]
    InvalidMinArea(f64),
    #[error("jpeg quality must be in 1..=100 (got {0})")]
    InvalidJpegQuality(u8),
    #[error("unknown preset {0:?} (expected \"standard\" or \"sensitive\")")]
    UnknownPreset(String),
}

/// Full parameter set of the template-difference pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffParams {
    pub threshold: ThresholdMode,
    pub morphology: MorphologyParams,
    /// A contour survives when its polygon area is strictly greater than this.
    pub min_area: f64,
    /// Pixels added on every side of a surviving bounding box.
    pub padding: i32,
    #[serde(default)]
    pub crop_format: CropFormat,
}

impl Default for DiffParams {
    fn default() -> Self {
        Self::standard()
    }
}

impl DiffParams {
    pub fn standard() -> Self {
        Self {
            threshold: ThresholdMode::OtsuWithFloor { floor: 70 },
            morphology: MorphologyParams {
                open_kernel: Some(3),
                dilate_kernel: 3,
                dilate_iterations: 2,
            },
            min_area: 450.0,
            padding: 20,
            crop_format: CropFormat::default(),
        }
    }

    pub fn sensitive() -> Self {
        Self {
            threshold: ThresholdMode::Fixed { value: 30 },
            morphology: MorphologyParams {
                open_kernel: None,
                dilate_kernel: 3,
                dilate_iterations: 2,
            },
            min_area: 100.0,
            padding: 45,
            crop_format: CropFormat::default(),
        }
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Standard => Self::standard(),
            Preset::Sensitive => Self::sensitive(),
        }
    }

    /// Padding in pixels. Only meaningful after [`DiffParams::validate`].
    #[inline]
    pub fn padding_px(&self) -> u32 {
        self.padding.max(0) as u32
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if let Some(size) = self.morphology.open_kernel {
            check_kernel("open", size)?;
        }
        check_kernel("dilate", self.morphology.dilate_kernel)?;
        if self.padding < 0 {
            return Err(ParamsError::NegativePadding(self.padding));
        }
        if !self.min_area.is_finite() || self.min_area <= 0.0 {
            return Err(ParamsError::InvalidMinArea(self.min_area));
        }
        if let CropFormat::Jpeg { quality } = self.crop_format {
            if !(1..=100).contains(&quality) {
                return Err(ParamsError::InvalidJpegQuality(quality));
            }
        }
        Ok(())
    }
}

fn check_kernel(name: &'static str, size: u32) -> Result<(), ParamsError> {
    if size == 0 || size % 2 == 0 {
        return Err(ParamsError::InvalidKernel { name, size });
    }
    // Radius has to fit the u8 used by the morphology primitives.
    if size > 511 {
        return Err(ParamsError::KernelTooLarge { name, size });
    }
    Ok(())
}

/// Optional per-field overrides layered on top of a preset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffParamsOverrides {
    pub threshold: Option<ThresholdMode>,
    /// Replaces the fixed value / Otsu floor while keeping the preset's mode.
    pub threshold_value: Option<u8>,
    pub open_kernel: Option<u32>,
    /// Skip the opening step regardless of the preset.
    pub no_open: bool,
    pub dilate_kernel: Option<u32>,
    pub dilate_iterations: Option<u32>,
    pub min_area: Option<f64>,
    pub padding: Option<i32>,
    pub crop_format: Option<CropFormat>,
}

impl DiffParamsOverrides {
    pub fn apply(&self, params: &mut DiffParams) {
        if let Some(threshold) = self.threshold {
            params.threshold = threshold;
        }
        if let Some(v) = self.threshold_value {
            params.threshold = params.threshold.with_value(v);
        }
        if let Some(k) = self.open_kernel {
            params.morphology.open_kernel = Some(k);
        }
        if self.no_open {
            params.morphology.open_kernel = None;
        }
        if let Some(k) = self.dilate_kernel {
            params.morphology.dilate_kernel = k;
        }
        if let Some(n) = self.dilate_iterations {
            params.morphology.dilate_iterations = n;
        }
        if let Some(a) = self.min_area {
            params.min_area = a;
        }
        if let Some(p) = self.padding {
            params.padding = p;
        }
        if let Some(f) = self.crop_format {
            params.crop_format = f;
        }
    }

    /// Preset parameters with these overrides applied.
    pub fn resolve(&self, preset: Preset) -> DiffParams {
        let mut params = DiffParams::preset(preset);
        self.apply(&mut params);
        params
    }
}
