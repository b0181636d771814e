use std::time::Instant;
use crate::data::{ConfigOrt, Xs};
use crate::utils;

pub trait InferenceProcess: Sized {
    type Input; // RgbImage
    /// What preprocessing learned about the input that postprocessing needs back.
    type Meta;
    type Thresholds;
    type Output;

    /// Creates a new instance of the model with the given options.
    fn new(options: ConfigOrt) -> anyhow::Result<Self>;

    /// Pre-process the input data.
    fn preprocess(&self, x: Self::Input) -> anyhow::Result<(Xs, Self::Meta)>;

    /// Executes the model on the preprocessed data.
    fn inference(&self, xs: Xs) -> anyhow::Result<Xs>;

    /// Post-process the model's output.
    fn postprocess(&self, xs: Xs, meta: &Self::Meta, thresh: &Self::Thresholds) -> anyhow::Result<Self::Output>;

    /// Executes the full pipeline.
    fn run(&self, x: Self::Input, thresh: &Self::Thresholds) -> anyhow::Result<Self::Output> {
        let (ys, meta) = self.preprocess(x)?;
        let ys = self.inference(ys)?;
        self.postprocess(ys, &meta, thresh)
    }

    /// Executes the full pipeline, tracing the time spent in each phase.
    fn forward(&self, x: Self::Input, thresh: &Self::Thresholds) -> anyhow::Result<Self::Output> {
        let detect_time = Instant::now();

        let (ys, meta) = self.preprocess(x)?;
        let mut _detect_elapsed = detect_time.elapsed();
        _detect_elapsed = utils::trace("TIME", "Preprocessing input", detect_time, _detect_elapsed);

        let ys = self.inference(ys)?;
        _detect_elapsed = utils::trace("TIME", "Detection run", detect_time, _detect_elapsed);

        let ys = self.postprocess(ys, &meta, thresh)?;
        utils::trace("TIME", "Postprocessing", detect_time, _detect_elapsed);

        Ok(ys)
    }
}
