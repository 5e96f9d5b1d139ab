use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use subweave::config::Config;
use subweave::error::{Result, SubweaveError};
use subweave::media::{Tool, ToolCommand, ToolOutput, ToolRunner};
use subweave::report::Step;
use subweave::translate::TranslationService;
use subweave::workflow::Workflow;

const IDENTIFY: &str = r#"{"tracks": [
    {"id": 0, "type": "video", "codec": "AVC/H.264/MPEG-4p10", "properties": {}},
    {"id": 1, "type": "audio", "codec": "AAC", "properties": {"language": "eng"}},
    {"id": 2, "type": "subtitles", "codec": "SubRip/SRT",
     "properties": {"codec_id": "S_TEXT/UTF8", "language": "eng", "language_ietf": "en"}}
]}"#;

const IDENTIFY_AFTER_MUX: &str = r#"{"tracks": [
    {"id": 0, "type": "video", "codec": "AVC/H.264/MPEG-4p10", "properties": {}},
    {"id": 1, "type": "audio", "codec": "AAC", "properties": {"language": "eng"}},
    {"id": 2, "type": "subtitles", "codec": "SubRip/SRT",
     "properties": {"codec_id": "S_TEXT/UTF8", "language": "eng", "language_ietf": "en"}},
    {"id": 3, "type": "subtitles", "codec": "SubRip/SRT",
     "properties": {"codec_id": "S_TEXT/UTF8", "language": "fre", "track_name": "French"}}
]}"#;

const EXTRACTED_FRENCH: &str = "1\n00:00:01,000 --> 00:00:03,000\nBonjour.\n\n";

const EXTRACTED: &str = "1\r\n00:00:01,000 --> 00:00:03,000\r\n[DOOR OPENS]\r\nJOHN: Good morning.\r\n\r\n2\r\n00:00:04,000 --> 00:00:05,500\r\n<i>See you later.</i>\r\n\r\n";

/// Stands in for FileBot and MKVToolNix, touching the filesystem the way they would
#[derive(Default)]
struct FakeToolchain {
    missing: Vec<Tool>,
    log: Mutex<Vec<ToolCommand>>,
    muxed: AtomicBool,
}

impl FakeToolchain {
    fn commands(&self, tool: Tool) -> Vec<ToolCommand> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tool == tool)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ToolRunner for FakeToolchain {
    fn locate(&self, tool: Tool, configured: &str) -> Result<PathBuf> {
        if self.missing.contains(&tool) {
            Err(SubweaveError::ToolNotFound {
                tool: tool.name().to_string(),
                path: configured.to_string(),
            })
        } else {
            Ok(PathBuf::from(configured))
        }
    }

    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        self.log.lock().unwrap().push(command.clone());
        let stdout = match command.tool {
            Tool::FileBot => "Processed 0 files".to_string(),
            Tool::MkvMerge if command.args[0] == "-J" => {
                // Once muxed, the container also carries the French track
                if self.muxed.load(Ordering::SeqCst) {
                    IDENTIFY_AFTER_MUX.to_string()
                } else {
                    IDENTIFY.to_string()
                }
            }
            Tool::MkvMerge => {
                std::fs::write(&command.args[1], b"muxed container").unwrap();
                self.muxed.store(true, Ordering::SeqCst);
                String::new()
            }
            Tool::MkvExtract => {
                let (id, target) = command.args[2].split_once(':').unwrap();
                let content = if id == "3" { EXTRACTED_FRENCH } else { EXTRACTED };
                std::fs::write(target, content).unwrap();
                String::new()
            }
        };
        Ok(ToolOutput {
            code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

#[derive(Default)]
struct EnglishToFrench {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl TranslationService for EnglishToFrench {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String> {
        assert_eq!(target, "fr");
        self.calls.lock().unwrap().push(text.to_string());
        match text.trim() {
            "Good morning." => Ok("Bonjour.".to_string()),
            "See you later." => Ok("À plus tard.".to_string()),
            other => Err(SubweaveError::Translation(format!("no fixture for {other}"))),
        }
    }
}

fn french_config() -> Config {
    let mut config = Config::default();
    config.languages.target = "French".to_string();
    config.translate.cache_enabled = false;
    config
}

#[tokio::test]
async fn run_all_embeds_translated_track_into_source() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mkv");
    std::fs::write(&movie, b"original container").unwrap();

    let tools = Arc::new(FakeToolchain::default());
    let workflow = Workflow::with_parts(french_config(), tools.clone(), Arc::new(EnglishToFrench::default())).unwrap();
    let run = workflow.run_all(dir.path()).await.unwrap();

    assert_eq!(run.steps.len(), 5);
    assert_eq!(run.failure_count(), 0);

    let cleaned = std::fs::read_to_string(dir.path().join("movie.eng.cleaned.srt")).unwrap();
    assert_eq!(
        cleaned,
        "1\n00:00:01,000 --> 00:00:03,000\nGood morning.\n\n2\n00:00:04,000 --> 00:00:05,500\nSee you later.\n\n"
    );

    let translated_path = dir.path().join("movie.eng.fr.translated.srt");
    let translated = std::fs::read_to_string(&translated_path).unwrap();
    assert!(translated.contains("00:00:04,000 --> 00:00:05,500\nÀ plus tard."));

    let mux = tools
        .commands(Tool::MkvMerge)
        .into_iter()
        .find(|c| c.args[0] == "-o")
        .expect("mux command");
    assert_eq!(mux.args[2], movie.display().to_string());
    assert_eq!(
        &mux.args[3..],
        &[
            "--language".to_string(),
            "0:fre".to_string(),
            "--track-name".to_string(),
            "0:French".to_string(),
            translated_path.display().to_string(),
        ]
    );

    assert_eq!(std::fs::read(&movie).unwrap(), b"muxed container");
    assert_eq!(run.step(Step::Embed).unwrap().succeeded, vec![movie]);
}

#[tokio::test]
async fn second_run_all_leaves_finished_media_alone() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mkv");
    std::fs::write(&movie, b"original container").unwrap();

    let tools = Arc::new(FakeToolchain::default());
    let service = Arc::new(EnglishToFrench::default());
    let workflow = Workflow::with_parts(french_config(), tools.clone(), service.clone()).unwrap();

    let first = workflow.run_all(dir.path()).await.unwrap();
    assert_eq!(first.failure_count(), 0);
    let calls_after_first = service.calls.lock().unwrap().len();

    let second = workflow.run_all(dir.path()).await.unwrap();
    assert_eq!(second.failure_count(), 0);

    // The embedded French track is extracted and cleaned, but never sent for translation
    let translate = second.step(Step::Translate).unwrap();
    assert!(translate.succeeded.is_empty());
    assert!(translate
        .skipped
        .iter()
        .any(|o| o.path == dir.path().join("movie.fre.cleaned.srt") && o.detail == "already in French"));
    assert_eq!(service.calls.lock().unwrap().len(), calls_after_first);
    assert!(!dir.path().join("movie.fre.fr.translated.srt").exists());

    let embed = second.step(Step::Embed).unwrap();
    assert!(embed.succeeded.is_empty());
    assert_eq!(embed.skipped.len(), 1);
    let muxes = tools
        .commands(Tool::MkvMerge)
        .into_iter()
        .filter(|c| c.args[0] == "-o")
        .count();
    assert_eq!(muxes, 1);
}

#[tokio::test]
async fn translating_twice_gives_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("movie.eng.srt"), EXTRACTED).unwrap();

    let mut config = french_config();
    config.pipeline.on_existing = subweave::config::ExistingPolicy::Overwrite;
    let workflow = Workflow::with_parts(config, Arc::new(FakeToolchain::default()), Arc::new(EnglishToFrench::default())).unwrap();

    workflow.run_step(Step::Clean, dir.path()).await.unwrap();
    workflow.run_step(Step::Translate, dir.path()).await.unwrap();
    let first = std::fs::read(dir.path().join("movie.eng.fr.translated.srt")).unwrap();

    workflow.run_step(Step::Clean, dir.path()).await.unwrap();
    workflow.run_step(Step::Translate, dir.path()).await.unwrap();
    let second = std::fs::read(dir.path().join("movie.eng.fr.translated.srt")).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_folder_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = Workflow::with_parts(french_config(), Arc::new(FakeToolchain::default()), Arc::new(EnglishToFrench::default())).unwrap();

    let run = workflow.run_all(dir.path()).await.unwrap();
    assert_eq!(run.failure_count(), 0);
    assert!(run.steps.iter().all(|s| s.succeeded.is_empty()));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_tool_stops_run_before_changes() {
    let dir = tempfile::tempdir().unwrap();
    let movie = dir.path().join("movie.mkv");
    std::fs::write(&movie, b"original container").unwrap();

    let tools = Arc::new(FakeToolchain {
        missing: vec![Tool::FileBot],
        ..FakeToolchain::default()
    });
    let mut config = french_config();
    config.tools.filebot_path = "C:/Program Files/FileBot/filebot.exe".to_string();
    let workflow = Workflow::with_parts(config, tools.clone(), Arc::new(EnglishToFrench::default())).unwrap();

    let err = workflow.run_all(dir.path()).await.unwrap_err();
    assert!(matches!(err, SubweaveError::ToolNotFound { .. }));
    assert!(err.to_string().contains("C:/Program Files/FileBot/filebot.exe"));
    assert!(tools.log.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    // A single step that does not need FileBot still runs
    let report = workflow.run_step(Step::Extract, dir.path()).await.unwrap();
    assert_eq!(report.succeeded, vec![dir.path().join("movie.eng.srt")]);
}
