use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::ProcessError;
use crate::input::LocalInputSet;
use crate::processor::{ProcessingResult, ProcessingStep};
use crate::provenance::StepTimer;
use crate::status::Status;
use crate::storage::archive;
use crate::storage::layout::ensure_directory;
use crate::storage::{OutputLayout, OutputType};

const TOKEN: &str = "Hello world";
const INPUT_EXTENSION: &str = "input";

/// Reference model: counts the words on the first line of
/// `<source_id>.input` and writes [`TOKEN`] that many times to the foobar
/// output.
pub struct WordCountProcessor {
    layout: OutputLayout,
}

impl WordCountProcessor {
    pub fn new(layout: OutputLayout) -> Self {
        Self { layout }
    }

    fn count_words(&self, input: &LocalInputSet) -> Result<(usize, PathBuf, PathBuf), ProcessError> {
        if !input.input_file_path.exists() {
            return Err(ProcessError::MissingInput(input.input_file_path.clone()));
        }
        let staging_dir = self.layout.input_staging_dir(&input.source_id);
        let root = archive::extract(&input.input_file_path, &staging_dir)?;

        let input_file = root.join(format!("{}.{}", input.source_id, INPUT_EXTENSION));
        if !input_file.is_file() {
            return Err(ProcessError::MissingInput(input_file));
        }
        let count = first_line_word_count(&input_file)?;

        let destination = self.layout.output_file_path(&input.source_id, OutputType::Foobar);
        if let Some(parent) = destination.parent() {
            ensure_directory(parent)?;
        }
        std::fs::write(&destination, TOKEN.repeat(count)).map_err(|e| {
            ProcessError::WriteOutput {
                path: destination.clone(),
                source: e,
            }
        })?;

        Ok((count, input_file, destination))
    }
}

fn first_line_word_count(path: &Path) -> Result<usize, ProcessError> {
    let read_error = |source| ProcessError::ReadInput {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(read_error)?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(read_error)?;
    Ok(line.split_whitespace().count())
}

impl ProcessingStep for WordCountProcessor {
    fn name(&self) -> &str {
        "word_count"
    }

    fn apply(&self, input: &LocalInputSet) -> ProcessingResult {
        info!("Starting model application");
        let timer = StepTimer::start();
        let output_root_path = self.layout.base_output_dir(Some(&input.source_id));

        match self.count_words(input) {
            Ok((count, input_file, destination)) => {
                info!("Wrote {} token(s) to {}", count, destination.display());
                let provenance = timer
                    .finish(self.name(), "Count the words on the first input line")
                    .with_parameters(BTreeMap::from([(
                        "token".to_string(),
                        serde_json::Value::from(TOKEN),
                    )]))
                    .with_software_version(BTreeMap::from([(
                        self.name().to_string(),
                        env!("CARGO_PKG_VERSION").to_string(),
                    )]))
                    .with_input("input_file", input_file.display().to_string())
                    .with_output("word_count", count.to_string())
                    .with_output(
                        OutputType::Foobar.dir_name(),
                        destination.display().to_string(),
                    );
                ProcessingResult {
                    status: Status::ok("Successfully applied model"),
                    output_root_path,
                    step_provenance: Some(provenance),
                }
            }
            Err(e) => {
                error!("Could not process the input properly: {}", e);
                ProcessingResult::failed(format!("Failed to apply model: {}", e), output_root_path)
            }
        }
    }
}
