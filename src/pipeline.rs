use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::core::{HeapTracker, LabelImage, PoseSlot, ResourceTracker};
use crate::error::{Aborted, LabelError, Stage};
use crate::models::{LabelReport, RotatedRect};

/// Working set of one label run.
///
/// Acquired in the order image, aligned, pose; fields are declared in the
/// reverse order so they are released last-acquired first.
#[derive(Debug)]
pub struct LabelData {
    /// Label pose found by localisation
    pub pose: PoseSlot,

    /// Upright copy of `image`, produced by alignment
    pub aligned: LabelImage,

    /// The photograph; reduced to its green channel after localisation
    pub image: LabelImage,

    /// Decoded barcode, set only once decoding succeeded
    pub barcode: Option<String>,

    /// OCR'd price, set only once recognition succeeded
    pub price: Option<String>,

    /// Currency printed next to the price
    pub currency: String,
}

impl LabelData {
    /// Acquire the working set. A failure part-way releases what was taken.
    pub fn acquire(tracker: &Arc<dyn ResourceTracker>) -> Result<Self, LabelError> {
        let image = LabelImage::acquire(tracker)?;
        let aligned = LabelImage::acquire(tracker)?;
        let pose = PoseSlot::acquire_pose(tracker)?;
        Ok(Self {
            pose,
            aligned,
            image,
            barcode: None,
            price: None,
            currency: String::new(),
        })
    }

    pub fn pose(&self) -> Result<RotatedRect, LabelError> {
        self.pose
            .get()
            .copied()
            .ok_or(LabelError::MissingArtifact("label pose"))
    }

    pub fn barcode(&self) -> Result<&str, LabelError> {
        self.barcode
            .as_deref()
            .ok_or(LabelError::MissingArtifact("barcode"))
    }

    pub fn price(&self) -> Result<&str, LabelError> {
        self.price
            .as_deref()
            .ok_or(LabelError::MissingArtifact("price"))
    }

    /// Final report; needs both the barcode and the price.
    pub fn report(&self) -> Result<LabelReport, LabelError> {
        Ok(LabelReport {
            barcode: self.barcode()?.to_string(),
            price: self.price()?.to_string(),
            currency: self.currency.clone(),
        })
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone)]
pub struct PipelineContext {
    pub tracker: Arc<dyn ResourceTracker>,
    pub debug: Option<DebugConfig>,
}

/// One stage of the label state machine.
pub trait PipelineStep: Send + Sync {
    /// Run the stage against the working set. Any error aborts the run.
    fn process(&self, data: &mut LabelData, context: &PipelineContext) -> Result<(), LabelError>;

    /// Which stage this step implements
    fn stage(&self) -> Stage;
}

/// Linear label pipeline: runs its steps in order and stops at the first
/// failure.
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
    currency: String,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext {
                tracker: Arc::new(HeapTracker),
                debug: None,
            },
            currency: "EUR".to_string(),
        }
    }

    /// Use a different resource tracker
    pub fn with_tracker(mut self, tracker: Arc<dyn ResourceTracker>) -> Self {
        self.context.tracker = tracker;
        self
    }

    /// Currency shown in the report
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Stages in execution order
    pub fn stages(&self) -> Vec<Stage> {
        self.steps.iter().map(|step| step.stage()).collect()
    }

    fn save_debug_output(&self, index: usize, stage: Stage, data: &LabelData) -> Result<(), LabelError> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let step_dir_name = format!("{:02}_{}", index, stage.name());
        let step_dir = debug_config.output_dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        data.image.save(&step_dir.join("source.png"))?;
        if self.align_index().is_some_and(|align| index >= align) {
            data.aligned.save(&step_dir.join("aligned.png"))?;
        }
        log::debug!("Debug: saved {}/", step_dir_name);
        Ok(())
    }

    /// 1-based position of the alignment step, if present.
    fn align_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.stage() == Stage::Align)
            .map(|i| i + 1)
    }

    /// Acquire a working set and load `path` into it
    fn prepare(&self, path: &Path) -> Result<LabelData, Aborted> {
        let mut data = LabelData::acquire(&self.context.tracker)
            .map_err(|e| Aborted::new(Stage::Setup, e))?;
        data.currency = self.currency.clone();

        data.image
            .load(path)
            .map_err(|e| Aborted::new(Stage::Load, e))?;
        log::info!(
            "Loaded {} ({}x{})",
            path.display(),
            data.image.width(),
            data.image.height()
        );
        self.save_debug_output(0, Stage::Load, &data)
            .map_err(|e| Aborted::new(Stage::Load, e))?;
        Ok(data)
    }

    fn run_steps(&self, data: &mut LabelData, count: usize) -> Result<(), Aborted> {
        for (idx, step) in self.steps.iter().take(count).enumerate() {
            let stage = step.stage();
            let started = Instant::now();
            log::info!("Running step: {}", stage);

            step.process(data, &self.context).map_err(|e| {
                log::warn!("{} failed: {}", stage, e);
                Aborted::new(stage, e)
            })?;

            self.save_debug_output(idx + 1, stage, data)
                .map_err(|e| Aborted::new(stage, e))?;
            log::info!("  {} done in {:?}", stage, started.elapsed());
        }
        Ok(())
    }

    /// Run every step on the image at `path` and build the report
    pub fn run(&self, path: &Path) -> Result<LabelReport, Aborted> {
        let mut data = self.prepare(path)?;
        self.run_steps(&mut data, self.steps.len())?;
        data.report().map_err(|e| Aborted::new(Stage::Report, e))
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, path: &Path, num_steps: usize) -> Result<LabelData, Aborted> {
        let mut data = self.prepare(path)?;
        self.run_steps(&mut data, num_steps)?;
        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
