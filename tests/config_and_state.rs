//! Configuration loading and the files the pipeline keeps across restarts.

use std::path::Path;

use tempfile::TempDir;
use vf_encode_pipeline::config::loader::{load_and_validate, load_from_path};
use vf_encode_pipeline::presets::PresetTable;
use vf_encode_pipeline::queue::{EncodeJob, ManualReviewList, QueueState, StateFile, WorkQueue};
use vf_encode_pipeline::validation::{validate_config, SystemCapabilities};

fn write_config(root: &Path, preset: &str) -> std::path::PathBuf {
    let films = root.join("films");
    std::fs::create_dir_all(&films).unwrap();

    let path = root.join("config.yaml");
    std::fs::write(
        &path,
        format!(
            r#"
global:
  log_level: debug
  output_dir: {out}
  state_dir: {state}
  mediainfo_path: null
watch_folders:
  - path: {films}
    preset: "{preset}"
"#,
            out = root.join("out").display(),
            state = root.join("state").display(),
            films = films.display(),
            preset = preset,
        ),
    )
    .unwrap();
    path
}

#[test]
fn minimal_config_loads_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "Mangas VO 1000kbps");

    let config = load_and_validate(&path, &SystemCapabilities::assume_available()).unwrap();
    assert_eq!(config.global.log_level, "debug");
    assert_eq!(config.global.mediainfo_path, None);
    assert_eq!(config.watch_folders.len(), 1);
    assert!(config.presets.is_empty());

    let presets = PresetTable::from_config_or_builtin(&config.presets).unwrap();
    assert!(presets.resolve(&config.watch_folders[0].preset).is_ok());
}

#[test]
fn misspelled_preset_is_reported_with_a_suggestion() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "Mangas VO 1000kbp");

    let config = load_from_path(&path).unwrap();
    let result = validate_config(&config, &SystemCapabilities::assume_available());
    assert!(!result.is_valid());

    let issue = result
        .errors()
        .find(|issue| issue.path == "watch_folders[0].preset")
        .unwrap();
    assert_eq!(issue.suggestion.as_deref(), Some("Did you mean 'Mangas VO 1000kbps'?"));
}

#[tokio::test]
async fn interrupted_queue_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let state_file = StateFile::new(dir.path().join("queue_state.json"));

    let queue = WorkQueue::new();
    for name in ["A.mkv", "B.mkv"] {
        let job = EncodeJob::for_file(
            dir.path().join(name),
            dir.path(),
            "1080p HD-Light 1500kbps".to_string(),
        );
        assert!(queue.enqueue(job).await);
    }

    let mut current = queue.dequeue().await.unwrap();
    current.interrupt();
    let state = QueueState::new(Some(current), queue.drain().await);
    state_file.save(&state).unwrap();

    let restored = state_file.load().unwrap().unwrap().into_resumable_jobs();
    let names: Vec<_> = restored
        .iter()
        .map(|job| job.input_path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A.mkv", "B.mkv"]);

    state_file.clear().unwrap();
    assert!(state_file.load().unwrap().is_none());
}

#[test]
fn manual_review_list_round_trips_through_the_file() {
    let dir = TempDir::new().unwrap();
    let list = ManualReviewList::new(dir.path().join("manual_review.txt"));

    assert!(list.add(Path::new("/in/Film.mkv"), "Mangas VO 1000kbps").unwrap());
    assert!(!list.add(Path::new("/in/Film.mkv"), "Mangas VO 1000kbps").unwrap());
    list.add(Path::new("/in/Other.mkv"), "1080p HD-Light 1500kbps").unwrap();

    let entries = list.list().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].preset.as_deref(), Some("Mangas VO 1000kbps"));

    assert_eq!(list.remove(Path::new("/in/Film.mkv")).unwrap(), 1);
    assert_eq!(list.list().unwrap().len(), 1);
}
