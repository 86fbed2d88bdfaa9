//! End-to-end runs through the real word-count step and the local object
//! store.

mod common;

use common::{archive_entries, read_provenance, TestHarness, BUCKET, FOLDER, INPUT_ARCHIVE, SOURCE_ID};

use assetflow::pipeline::RunState;
use assetflow::OutputType;

#[test]
fn test_local_archive_produces_foobar_and_two_record_chain() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("three little words");
    let config = harness.config();

    let (result, ctx) = harness.run(&config, archive.to_str().unwrap());

    assert_eq!(result.state, 200, "{}", result.message);
    assert_eq!(result.message, "Successfully applied model");
    assert_eq!(ctx.state, RunState::Done);

    let output = harness.base_mount.join("output-files").join(SOURCE_ID);
    let foobar = output.join("foobar/res__carrier_foobar.txt");
    assert_eq!(
        std::fs::read_to_string(&foobar).unwrap(),
        "Hello world".repeat(3)
    );

    let provenance_path = output.join("provenance/provenance.json");
    assert_eq!(result.provenance_path.as_deref(), Some(provenance_path.as_path()));
    let records = read_provenance(&provenance_path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].activity_name, "word_count");
    assert_eq!(records[1].activity_name, "assetflow-worker");
    assert_eq!(
        records[1].input_data["input_file_path"],
        archive.display().to_string()
    );
    assert_eq!(result.provenance.unwrap().records(), records.as_slice());

    // Local input stays where it was
    assert!(archive.exists());
}

#[test]
fn test_local_archive_is_extracted_into_staging_and_cleaned_up() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("three little words");
    let mut config = harness.config();
    config.input.delete_on_completion = true;

    let (result, ctx) = harness.run(&config, archive.to_str().unwrap());

    assert_eq!(result.state, 200, "{}", result.message);
    assert!(ctx.warnings.is_empty(), "{:?}", ctx.warnings);
    assert!(!archive.exists());
    assert!(!harness.fixtures_dir.join("prep__res__carrier").exists());
    assert!(!harness.layout().input_staging_dir(SOURCE_ID).exists());
}

#[test]
fn test_directory_input_outside_download_dir_is_kept() {
    let harness = TestHarness::new();
    let user_dir = harness.fixtures_dir.join("res__carrier/userdata");
    std::fs::create_dir_all(&user_dir).unwrap();
    std::fs::write(user_dir.join("res__carrier.input"), "one two\n").unwrap();
    std::fs::write(user_dir.join("precious.txt"), "keep").unwrap();
    let mut config = harness.config();
    config.input.delete_on_completion = true;

    let (result, ctx) = harness.run(&config, user_dir.to_str().unwrap());

    assert_eq!(result.state, 500);
    assert!(
        result
            .message
            .starts_with("Applied model, but could not delete the input file"),
        "{}",
        result.message
    );
    assert_eq!(ctx.state, RunState::Error);
    assert!(user_dir.join("precious.txt").exists());
    assert!(result.provenance.is_some());
}

#[test]
fn test_remote_input_is_transferred_and_cleaned_up() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("three little words");
    harness.put_remote(BUCKET, &format!("{}/{}", FOLDER, INPUT_ARCHIVE), &archive);

    let mut config = harness.transfer_config();
    config.output.delete_on_completion = true;
    config.input.delete_on_completion = true;

    let uri = format!("s3://{}/{}/{}", BUCKET, FOLDER, INPUT_ARCHIVE);
    let (result, ctx) = harness.run(&config, &uri);

    assert_eq!(result.state, 200, "{}", result.message);

    let uploaded = harness.remote_object(
        BUCKET,
        "assets/res__carrier/base_name__res__carrier.tar.gz",
    );
    assert!(uploaded.is_file());
    let entries = archive_entries(&uploaded);
    assert!(
        entries.iter().any(|e| e == "provenance/provenance.json"),
        "{:?}",
        entries
    );

    let layout = harness.layout();
    assert!(!layout.base_output_dir(Some(SOURCE_ID)).exists());
    assert!(!layout.input_staging_dir(SOURCE_ID).exists());
    assert!(ctx.warnings.is_empty(), "{:?}", ctx.warnings);

    let chain = result.provenance.unwrap();
    let names: Vec<&str> = chain
        .records()
        .iter()
        .map(|r| r.activity_name.as_str())
        .collect();
    assert_eq!(names, vec!["download", "word_count", "assetflow-worker"]);
    assert_eq!(
        chain.last().unwrap().output_data["output_uri"],
        "s3://bucket1/assets/res__carrier/base_name__res__carrier.tar.gz"
    );
}

#[test]
fn test_transfer_types_choose_archived_subdirectories() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("a b");
    let mut config = harness.transfer_config();
    config.output.transfer_types = vec![OutputType::Provenance, OutputType::Foobar];

    let (result, _ctx) = harness.run(&config, archive.to_str().unwrap());

    assert!(result.is_success(), "{}", result.message);
    let entries = archive_entries(&harness.remote_object(
        BUCKET,
        "assets/res__carrier/base_name__res__carrier.tar.gz",
    ));
    assert!(entries.iter().any(|e| e == "foobar/res__carrier_foobar.txt"));
    assert!(entries.iter().any(|e| e == "provenance/provenance.json"));
    // Output is kept when deletion is not requested
    assert!(harness.layout().base_output_dir(Some(SOURCE_ID)).is_dir());
}

#[test]
fn test_malformed_uri_fails_without_download() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("three little words");
    harness.put_remote(BUCKET, &format!("{}/{}", FOLDER, INPUT_ARCHIVE), &archive);

    for uri in [
        "gs://bucket1/assets/prep__res__carrier.tar.gz",
        "s3:/bucket1/assets/prep__res__carrier.tar.gz",
        "s3://bucket1/",
    ] {
        let (result, ctx) = harness.run(&harness.config(), uri);

        assert_eq!(result.state, 500, "{}", uri);
        assert!(result.provenance.is_none());
        assert_eq!(ctx.state, RunState::Error);
        assert!(!harness.layout().input_staging_dir(SOURCE_ID).exists());
    }
}

#[test]
fn test_missing_bucket_fails_disposition_without_upload() {
    let harness = TestHarness::new();
    let archive = harness.input_archive("three little words");
    let mut config = harness.transfer_config();
    config.output.s3_bucket = None;
    config.output.delete_on_completion = true;

    let (result, ctx) = harness.run(&config, archive.to_str().unwrap());

    assert_eq!(result.state, 500);
    assert!(result.message.contains("s3_bucket"), "{}", result.message);
    assert!(result.message.starts_with("Applied model, but"));
    assert_eq!(ctx.state, RunState::Error);
    assert!(std::fs::read_dir(&harness.remote_root).unwrap().next().is_none());
    // Transfer failed first, so nothing was deleted
    assert!(harness.layout().base_output_dir(Some(SOURCE_ID)).is_dir());
}

#[test]
fn test_missing_remote_object_is_a_transfer_failure() {
    let harness = TestHarness::new();

    let (result, _ctx) = harness.run(
        &harness.config(),
        "s3://bucket1/assets/prep__res__carrier.tar.gz",
    );

    assert_eq!(result.state, 500);
    assert!(result.message.starts_with("Failed to download input"), "{}", result.message);
}
