//! Test harness for end-to-end runs.
//!
//! Every harness owns a temporary base mount and a local object-store root
//! that stands in for S3: bucket `b` with key `k` lives at
//! `<remote_root>/b/k`.

#![allow(dead_code)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use assetflow::pipeline::{NoopProgress, PipelineConfig, PipelineContext, PipelineResult};
use assetflow::provenance::ProvenanceRecord;
use assetflow::{Config, Job, ObjectStoreRemote, OutputLayout, Pipeline, WordCountProcessor};

pub const BUCKET: &str = "bucket1";
pub const FOLDER: &str = "assets";
pub const SOURCE_ID: &str = "res__carrier";
pub const INPUT_ARCHIVE: &str = "prep__res__carrier.tar.gz";

pub struct TestHarness {
    temp_dir: TempDir,
    pub base_mount: PathBuf,
    pub remote_root: PathBuf,
    pub fixtures_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_mount = temp_dir.path().join("mnt");
        let remote_root = temp_dir.path().join("remote");
        let fixtures_dir = temp_dir.path().join("fixtures");
        for dir in [&base_mount, &remote_root, &fixtures_dir] {
            std::fs::create_dir_all(dir).expect("Failed to create harness directory");
        }

        Self {
            temp_dir,
            base_mount,
            remote_root,
            fixtures_dir,
        }
    }

    /// Config rooted at the harness base mount; nothing transferred or deleted.
    pub fn config(&self) -> Config {
        Config::new(self.base_mount.display().to_string())
    }

    /// Same as [`TestHarness::config`] with S3 output settings filled in.
    pub fn transfer_config(&self) -> Config {
        let mut config = self.config();
        config.output.transfer_on_completion = true;
        config.output.s3_endpoint_url = Some("http://localhost:9000".to_string());
        config.output.s3_bucket = Some(BUCKET.to_string());
        config.output.s3_folder_in_bucket = Some(FOLDER.to_string());
        config
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.base_mount, "input-files", "output-files")
    }

    /// Builds `<fixtures>/prep__res__carrier.tar.gz` holding
    /// `res__carrier.input` with `first_line` as its first line.
    pub fn input_archive(&self, first_line: &str) -> PathBuf {
        let path = self.fixtures_dir.join(INPUT_ARCHIVE);
        write_archive(
            &path,
            &[(
                format!("{}.input", SOURCE_ID),
                format!("{}\nthis line is not counted\n", first_line),
            )],
        );
        path
    }

    /// Places a file into the local object store under `bucket/key`.
    pub fn put_remote(&self, bucket: &str, key: &str, source: &Path) {
        let target = self.remote_root.join(bucket).join(key);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::copy(source, target).expect("Failed to seed remote object");
    }

    pub fn remote_object(&self, bucket: &str, key: &str) -> PathBuf {
        self.remote_root.join(bucket).join(key)
    }

    pub fn pipeline(&self, config: &Config) -> Pipeline {
        let store = Arc::new(
            ObjectStoreRemote::local(&self.remote_root).expect("Failed to create local store"),
        );
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let step = Box::new(WordCountProcessor::new(pipeline_config.layout.clone()));
        Pipeline::new(pipeline_config, store.clone(), store, step)
    }

    pub fn run(&self, config: &Config, reference: &str) -> (PipelineResult, PipelineContext) {
        let pipeline = self.pipeline(config);
        pipeline.run(PipelineContext::new(Job::new(reference)), &NoopProgress)
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

pub fn write_archive(path: &Path, entries: &[(String, String)]) {
    let file = File::create(path).expect("Failed to create archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .expect("Failed to append archive entry");
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("Failed to finish archive");
}

/// Entry paths inside a tar.gz, directories included.
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("Failed to open archive");
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive
        .entries()
        .expect("Failed to read archive")
        .map(|entry| {
            entry
                .expect("Failed to read archive entry")
                .path()
                .expect("Entry without path")
                .display()
                .to_string()
        })
        .collect()
}

pub fn read_provenance(path: &Path) -> Vec<ProvenanceRecord> {
    let content = std::fs::read_to_string(path).expect("Failed to read provenance");
    serde_json::from_str(&content).expect("Provenance is not a JSON array of records")
}
