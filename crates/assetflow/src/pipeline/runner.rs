use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::config::Config;
use crate::disposition::{DispositionManager, TransferTarget};
use crate::error::AssetflowError;
use crate::input::{InputResolver, LocalInputSet};
use crate::processor::{ProcessingStep, WordCountProcessor};
use crate::provenance::{software_versions, ProvenanceBuilder};
use crate::remote::{ObjectStoreRemote, RemoteStore, S3Settings};
use crate::sanitize;
use crate::storage::OutputType;

use super::config::PipelineConfig;
use super::context::{PipelineContext, RunState};
use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, ProgressReporter};
use super::result::PipelineResult;

const PIPELINE_DESCRIPTION: &str = "Apply model to a single asset";

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    resolver: InputResolver,
    step: Box<dyn ProcessingStep>,
    disposition: DispositionManager,
}

impl Pipeline {
    /// `input_store` serves downloads, `output_store` takes uploads; they
    /// may be the same store.
    pub fn new(
        config: Arc<PipelineConfig>,
        input_store: Arc<dyn RemoteStore>,
        output_store: Arc<dyn RemoteStore>,
        step: Box<dyn ProcessingStep>,
    ) -> Self {
        let resolver = InputResolver::new(config.layout.clone(), input_store);
        let disposition =
            DispositionManager::new(config.layout.clone(), &config.output, output_store);
        Self {
            config,
            resolver,
            step,
            disposition,
        }
    }

    /// Production constructor: S3 stores for input and output, and the
    /// word-count processing step.
    pub fn from_config(config: &Config) -> Result<Self, AssetflowError> {
        let input_store = ObjectStoreRemote::s3(S3Settings::from_config(
            config.input.s3_endpoint_url.as_deref(),
            &config.input.credentials,
        )?)?;
        let output_store = ObjectStoreRemote::s3(S3Settings::from_config(
            config.output.s3_endpoint_url.as_deref(),
            &config.output.credentials,
        )?)?;

        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let step = Box::new(WordCountProcessor::new(pipeline_config.layout.clone()));
        Ok(Self::new(
            pipeline_config,
            Arc::new(input_store),
            Arc::new(output_store),
            step,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one job to a terminal state. Never panics on stage failures;
    /// every failure ends up in the returned [`PipelineResult`].
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (PipelineResult, PipelineContext) {
        let reference = sanitize::redact_reference(&ctx.job.input_reference);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            input = %reference,
        )
        .entered();

        let outcome = self.run_stages(&mut ctx, progress);
        let result = match outcome {
            Ok(()) => {
                advance(&mut ctx, RunState::Done, progress, "Successfully applied model");
                match ctx.provenance.as_ref() {
                    Some(sealed) => {
                        progress.report(ProgressEvent::Completed {
                            provenance_path: sealed.path().display().to_string(),
                        });
                        PipelineResult::success(sealed)
                    }
                    // run_stages only returns Ok after sealing
                    None => PipelineResult::new(
                        crate::status::STATE_ERROR,
                        "Provenance missing after a completed run",
                        None,
                    ),
                }
            }
            Err(e) => {
                ctx.state = RunState::Error;
                if e.after_processing() {
                    warn!("{}", e);
                } else {
                    error!("{}", e);
                }
                progress.report(ProgressEvent::Failed {
                    state: e.state(),
                    error: e.to_string(),
                });
                PipelineResult::new(e.state(), e.to_string(), ctx.provenance.as_ref())
            }
        };

        info!(state = result.state, "Results after applying desired I/O: {}", result.message);
        (result, ctx)
    }

    fn run_stages(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        if ctx.job.input_reference.trim().is_empty() {
            return Err(PipelineError::MissingInput);
        }
        self.config
            .layout
            .validate_data_dirs()
            .map_err(PipelineError::DataDirs)?;

        let mut chain = ProvenanceBuilder::open(
            &self.config.worker_id,
            PIPELINE_DESCRIPTION,
            BTreeMap::from([(
                "input_file_path".to_string(),
                ctx.job.input_reference.clone(),
            )]),
            self.config.worker_settings.clone(),
            software_versions(&self.config.worker_id),
        );

        // INIT -> INPUT_RESOLVED
        let input = {
            let _step = info_span!("resolve_input").entered();
            let input = self.resolver.resolve(&ctx.job.input_reference)?;
            if let Some(download) = &input.download_provenance {
                chain.append(download.clone());
            }
            ctx.input = Some(input.clone());
            advance(ctx, RunState::InputResolved, progress, &input.status.message);
            input
        };
        debug!("Provenance entries before processing: {}", chain.entry_count());

        // -> OUTPUT_STAGED
        {
            let _step = info_span!("stage_output", source_id = %input.source_id).entered();
            ctx.output_dirs = self
                .config
                .layout
                .ensure_output_dirs(&input.source_id)
                .map_err(PipelineError::Staging)?;
            advance(ctx, RunState::OutputStaged, progress, "Output directories ready");
        }

        // -> PROCESSED
        {
            let _step = info_span!("process", step = self.step.name()).entered();
            let result = self.step.apply(&input);
            if !result.status.is_success() {
                let err = PipelineError::Processing {
                    state: result.status.state,
                    message: result.status.message.clone(),
                };
                ctx.processing = Some(result);
                return Err(err);
            }
            if let Some(step_provenance) = &result.step_provenance {
                chain.append(step_provenance.clone());
            }
            let message = result.status.message.clone();
            ctx.processing = Some(result);
            advance(ctx, RunState::Processed, progress, &message);
        }

        // -> PROVENANCE_SEALED
        {
            let _step = info_span!("seal_provenance").entered();
            let output_data = self.top_level_output(&input);
            let path = self
                .config
                .layout
                .output_file_path(&input.source_id, OutputType::Provenance);
            let sealed = chain.seal(output_data, &path)?;
            ctx.provenance = Some(sealed);
            advance(ctx, RunState::ProvenanceSealed, progress, "Provenance persisted");
        }

        // -> DISPOSED
        {
            let _step = info_span!("dispose").entered();
            let report = self.disposition.dispose(
                &input.source_id,
                &self.config.policy,
                &input.input_file_path,
            )?;
            for warning in &report.warnings {
                ctx.warnings.push(PipelineWarning::from(warning));
            }
            ctx.disposition = Some(report);
            advance(ctx, RunState::Disposed, progress, "Disposition complete");
        }

        Ok(())
    }

    fn top_level_output(&self, input: &LocalInputSet) -> BTreeMap<String, String> {
        let mut output_data = BTreeMap::from([(
            "output_path".to_string(),
            self.config
                .layout
                .base_output_dir(Some(&input.source_id))
                .display()
                .to_string(),
        )]);
        if self.config.policy.transfer_output_on_completion {
            if let Ok(target) = TransferTarget::from_config(&self.config.output) {
                output_data.insert("output_uri".to_string(), target.output_uri(&input.source_id));
            }
        }
        output_data
    }
}

fn advance(
    ctx: &mut PipelineContext,
    state: RunState,
    progress: &dyn ProgressReporter,
    message: &str,
) {
    debug!("{} -> {}", ctx.state, state);
    ctx.state = state;
    progress.report(ProgressEvent::Transition {
        state,
        message: message.to_string(),
    });
}
