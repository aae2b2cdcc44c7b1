use crate::config::Config;
use crate::console::{self, Command};
use crate::error::AppError;
use crate::messages::{AppEvent, CaptureRequest, PermissionState, ScreenState};
use crate::permission;
use crate::probe;
use crate::services::compressor;
use crate::services::{Capture, CaptureHandle};
use crate::settings::{RecordingSettings, SettingsSnapshot};
use crate::view::{self, CompressedPanel, ResultPanel, ViewModel};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Pure screen state: settings, the two result panels, the notice line and
/// the two state machines. No IO happens here; `App` drives it from the
/// event loop.
struct Screen {
    state: ScreenState,
    permission: PermissionState,
    settings: RecordingSettings,
    recording: Option<ResultPanel>,
    compression: Option<CompressedPanel>,
    notice: Option<String>,
}

impl Screen {
    fn new(settings: RecordingSettings, permission: PermissionState) -> Self {
        Self {
            state: ScreenState::Idle,
            permission,
            settings,
            recording: None,
            compression: None,
            notice: None,
        }
    }

    /// A new recording clears any prior result, including a leftover
    /// compression panel. Refused while a capture or compression is running.
    fn begin_capture(&mut self) -> bool {
        if matches!(
            self.state,
            ScreenState::AwaitingCapture | ScreenState::Compressing
        ) {
            return false;
        }

        self.recording = None;
        self.compression = None;
        self.notice = None;
        self.state = ScreenState::AwaitingCapture;
        true
    }

    /// The facility returned no data: back to Idle, both panels stay hidden.
    fn capture_cancelled(&mut self) {
        self.state = ScreenState::Idle;
        self.notice = Some(AppError::CaptureCancelled.to_string());
    }

    /// Store the new recording result. Returns whether the user asked for
    /// compression afterwards; the caller still has to clear permission.
    fn capture_succeeded(&mut self, panel: ResultPanel) -> bool {
        self.recording = Some(panel);
        self.state = ScreenState::ShowingResult;
        self.settings.compress_after_recording
    }

    fn compression_started(&mut self) {
        self.state = ScreenState::Compressing;
    }

    fn set_max_length(&mut self, secs: u32) {
        if secs == 0 {
            self.notice = Some("max length must be greater than 0".into());
        } else {
            self.settings.max_length_seconds = secs;
        }
    }

    fn set_max_size(&mut self, mb: u64) {
        if mb == 0 {
            self.notice = Some("max size must be greater than 0".into());
        } else if mb > RecordingSettings::MAX_SIZE_MB {
            self.notice = Some(format!(
                "max size must be at most {} MB",
                RecordingSettings::MAX_SIZE_MB
            ));
        } else {
            self.settings.max_size_mb = mb;
        }
    }

    /// The toggle itself is never blocked. Returns whether a permission
    /// request is needed (enabling compression without the grant).
    fn toggle_compress(&mut self, enabled: bool) -> bool {
        let needs_request = enabled && self.permission == PermissionState::NotGranted;
        self.settings.compress_after_recording = enabled;
        needs_request
    }

    /// Permission-result callback: denial leaves a persistent notice naming
    /// the retry command.
    fn permission_result(&mut self, result: PermissionState, output_dir: &Path) {
        self.permission = result;

        match result {
            PermissionState::Granted => self.notice = None,
            PermissionState::NotGranted => {
                self.notice = Some(format!(
                    "{}: {:?} is not writable. Compression needs it; type `allow` to try again.",
                    AppError::PermissionDenied,
                    output_dir
                ));
            }
        }
    }

    /// `None` means the worker failed: the compression panel is hidden while
    /// the recording result stays on screen.
    fn compression_finished(&mut self, result: Option<CompressedPanel>) {
        match result {
            Some(panel) => {
                self.compression = Some(panel);
                self.state = ScreenState::ShowingCompressedResult;
            }
            None => {
                self.compression = None;
                self.state = ScreenState::ShowingResult;
                self.notice =
                    Some("Compression failed. Record again to retry, or turn compress off.".into());
            }
        }
    }

    fn view_model(&self) -> ViewModel {
        ViewModel {
            settings: self.settings,
            state: self.state,
            recording: self.recording.clone(),
            compression: self.compression.clone(),
            notice: self.notice.clone(),
        }
    }
}

/// Screen controller: owns the screen state and wires console commands to
/// the capture service and the compression worker.
pub struct App {
    screen: Screen,
    config: Config,
    capture: CaptureHandle,
    commands_rx: mpsc::Receiver<Command>,
    events_rx: mpsc::Receiver<AppEvent>,
    events_tx: mpsc::Sender<AppEvent>,
    last_recording: Option<PathBuf>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let permission = permission::check(&config.output_dir);

        let (events_tx, events_rx) = mpsc::channel(16);

        // Capture service behind a command channel
        let (capture_tx, capture_rx) = mpsc::channel(8);
        let service = Capture::new(
            config.capture_binary.clone(),
            config.capture_source_args.clone(),
            capture_rx,
            events_tx.clone(),
        );
        tokio::spawn(service.run());
        let capture = CaptureHandle::new(capture_tx);

        // Console reader feeding the command channel
        let (command_tx, commands_rx) = mpsc::channel(16);
        tokio::spawn(console::read_commands(command_tx));

        Self {
            screen: Screen::new(config.defaults, permission),
            config,
            capture,
            commands_rx,
            events_rx,
            events_tx,
            last_recording: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("{}", console::HELP);
        self.render();

        loop {
            tokio::select! {
                Some(command) = self.commands_rx.recv() => {
                    tracing::debug!("Command: {:?}", command);
                    if !self.handle_command(command).await {
                        break;
                    }
                }

                Some(event) = self.events_rx.recv() => {
                    tracing::debug!("Event: {:?}", event);
                    self.handle_event(event).await;
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Returns false when the app should exit.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Record => self.start_recording().await,
            Command::Stop => self.capture.stop().await,
            Command::Length(secs) => self.screen.set_max_length(secs),
            Command::Size(mb) => self.screen.set_max_size(mb),
            Command::Quality(quality) => self.screen.settings.quality = quality,
            Command::Compress(enabled) => {
                if self.screen.toggle_compress(enabled) {
                    self.request_permission();
                }
            }
            Command::Allow => self.request_permission(),
            Command::Show => {}
            Command::Save => self.save_snapshot(),
            Command::Load => self.load_snapshot(),
            Command::Quit => return false,
        }

        self.render();
        true
    }

    async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CaptureFinished(Some(path)) => self.on_recording_complete(path).await,
            AppEvent::CaptureFinished(None) => self.screen.capture_cancelled(),
            AppEvent::CompressionFinished { output, elapsed_ms } => {
                self.on_compression_complete(output, elapsed_ms).await
            }
        }

        self.render();
    }

    async fn start_recording(&mut self) {
        if !self.screen.begin_capture() {
            self.screen.notice = Some("A recording or compression is already running".into());
            return;
        }

        self.last_recording = None;

        // Creates the output directory as a side effect; a failure here is a
        // storage problem, not a cancelled capture.
        let storage = permission::request(&self.config.output_dir);
        self.screen
            .permission_result(storage, &self.config.output_dir);
        if storage == PermissionState::NotGranted {
            self.screen.state = ScreenState::Idle;
            return;
        }

        let settings = &self.screen.settings;
        let request = CaptureRequest {
            output: self.output_path(),
            duration_limit_secs: settings.max_length_seconds,
            size_limit_bytes: settings.size_limit_bytes(),
            quality: settings.quality,
        };

        if let Err(e) = self.capture.start(request).await {
            self.screen.state = ScreenState::Idle;
            self.screen.notice = Some(e.to_string());
        }
    }

    async fn on_recording_complete(&mut self, path: PathBuf) {
        let panel = self.panel_for(&path).await;
        self.last_recording = Some(path.clone());

        if self.screen.capture_succeeded(panel) {
            match self.screen.permission {
                PermissionState::Granted => {
                    self.screen.notice = Some("Compressing...".into());
                    compressor::spawn(
                        self.config.capture_binary.clone(),
                        path,
                        self.events_tx.clone(),
                    );
                    self.screen.compression_started();
                }
                PermissionState::NotGranted => self.request_permission(),
            }
        }
    }

    async fn on_compression_complete(&mut self, output: Option<PathBuf>, elapsed_ms: u64) {
        let result = match output {
            Some(path) => Some(CompressedPanel {
                panel: self.panel_for(&path).await,
                elapsed_ms,
            }),
            None => None,
        };

        self.screen.compression_finished(result);
    }

    fn request_permission(&mut self) {
        let result = permission::request(&self.config.output_dir);
        if result == PermissionState::Granted {
            tracing::info!("Storage permission granted");
        }
        self.screen.permission_result(result, &self.config.output_dir);
    }

    fn save_snapshot(&mut self) {
        match SettingsSnapshot::from(&self.screen.settings).save(&self.config.snapshot_path) {
            Ok(()) => self.screen.notice = Some("settings saved".into()),
            Err(e) => {
                tracing::warn!("Failed to save settings: {:#}", e);
                self.screen.notice = Some("failed to save settings".into());
            }
        }
    }

    fn load_snapshot(&mut self) {
        match SettingsSnapshot::load(&self.config.snapshot_path) {
            Ok(snapshot) => {
                self.screen.settings = snapshot.restore();
                self.screen.notice = Some("settings restored".into());
            }
            Err(e) => {
                tracing::warn!("Failed to load settings: {:#}", e);
                self.screen.notice = Some("no saved settings found".into());
            }
        }
    }

    async fn panel_for(&self, path: &Path) -> ResultPanel {
        let info = match probe::media_info(&self.config.probe_binary, path).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Media probe failed: {:#}", e);
                probe::basic_info(path)
            }
        };

        ResultPanel {
            name: info.display_name,
            path: path.display().to_string(),
            size_kb: info.size_kb,
            duration_ms: info.duration_ms,
            resolution: info.resolution,
        }
    }

    fn output_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        self.config.output_dir.join(format!("recording-{}.mp4", stamp))
    }

    fn render(&self) {
        view::render(&self.screen.view_model());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Quality;

    fn panel(name: &str) -> ResultPanel {
        ResultPanel {
            name: name.to_string(),
            path: format!("/videos/{}", name),
            size_kb: 128,
            duration_ms: "5000".to_string(),
            resolution: "1920x1080".to_string(),
        }
    }

    fn screen() -> Screen {
        Screen::new(RecordingSettings::default(), PermissionState::Granted)
    }

    #[test]
    fn test_cancelled_capture_keeps_panels_hidden() {
        let mut screen = screen();

        assert!(screen.begin_capture());
        assert_eq!(screen.state, ScreenState::AwaitingCapture);

        screen.capture_cancelled();
        assert_eq!(screen.state, ScreenState::Idle);
        assert!(screen.recording.is_none());
        assert!(screen.compression.is_none());
    }

    #[test]
    fn test_successful_capture_shows_result() {
        let mut screen = screen();

        screen.begin_capture();
        let wants_compression = screen.capture_succeeded(panel("clip.mp4"));

        assert!(!wants_compression); // compress off by default
        assert_eq!(screen.state, ScreenState::ShowingResult);
        assert!(screen.recording.is_some());
    }

    #[test]
    fn test_compress_flag_requested_after_capture() {
        let mut screen = screen();
        screen.settings.compress_after_recording = true;

        screen.begin_capture();
        assert!(screen.capture_succeeded(panel("clip.mp4")));
    }

    #[test]
    fn test_full_flow_to_compressed_result() {
        let mut screen = screen();
        screen.settings.compress_after_recording = true;

        screen.begin_capture();
        screen.capture_succeeded(panel("clip.mp4"));
        screen.compression_started();
        assert_eq!(screen.state, ScreenState::Compressing);

        screen.compression_finished(Some(CompressedPanel {
            panel: panel("clip.compressed.mp4"),
            elapsed_ms: 900,
        }));

        assert_eq!(screen.state, ScreenState::ShowingCompressedResult);
        assert!(screen.recording.is_some());
        assert!(screen.compression.is_some());
    }

    #[test]
    fn test_failed_compression_hides_panel_keeps_recording() {
        let mut screen = screen();
        screen.settings.compress_after_recording = true;

        screen.begin_capture();
        screen.capture_succeeded(panel("clip.mp4"));
        screen.compression_started();

        screen.compression_finished(None);

        assert_eq!(screen.state, ScreenState::ShowingResult);
        assert!(screen.recording.is_some());
        assert!(screen.compression.is_none());
        assert!(screen.notice.is_some());
    }

    #[test]
    fn test_new_recording_clears_prior_compression_result() {
        let mut screen = screen();

        screen.begin_capture();
        screen.capture_succeeded(panel("a.mp4"));
        screen.compression_started();
        screen.compression_finished(Some(CompressedPanel {
            panel: panel("a.compressed.mp4"),
            elapsed_ms: 300,
        }));

        assert!(screen.begin_capture());
        assert!(screen.recording.is_none());
        assert!(screen.compression.is_none());
    }

    #[test]
    fn test_begin_capture_refused_while_busy() {
        let mut screen = screen();

        assert!(screen.begin_capture());
        assert!(!screen.begin_capture()); // awaiting capture

        screen.capture_succeeded(panel("clip.mp4"));
        screen.compression_started();
        assert!(!screen.begin_capture()); // compressing
    }

    #[test]
    fn test_compress_toggle_never_blocked_without_permission() {
        let mut screen = Screen::new(RecordingSettings::default(), PermissionState::NotGranted);

        let needs_request = screen.toggle_compress(true);

        // The toggle takes effect even though the grant is missing; it only
        // asks the caller to run a permission request.
        assert!(needs_request);
        assert!(screen.settings.compress_after_recording);
        assert_eq!(screen.permission, PermissionState::NotGranted);

        // Denial produces the persistent notice naming the retry command
        screen.permission_result(PermissionState::NotGranted, Path::new("/videos/out"));
        assert_eq!(screen.permission, PermissionState::NotGranted);
        let notice = screen.notice.as_deref().unwrap();
        assert!(notice.contains("allow"));
    }

    #[test]
    fn test_compress_toggle_with_permission_needs_no_request() {
        let mut screen = screen();

        assert!(!screen.toggle_compress(true));
        assert!(screen.settings.compress_after_recording);

        assert!(!screen.toggle_compress(false));
        assert!(!screen.settings.compress_after_recording);
    }

    #[test]
    fn test_permission_grant_clears_notice() {
        let mut screen = Screen::new(RecordingSettings::default(), PermissionState::NotGranted);

        screen.permission_result(PermissionState::NotGranted, Path::new("/videos/out"));
        assert!(screen.notice.is_some());

        screen.permission_result(PermissionState::Granted, Path::new("/videos/out"));
        assert_eq!(screen.permission, PermissionState::Granted);
        assert!(screen.notice.is_none());
    }

    #[test]
    fn test_set_max_size_rejects_out_of_range() {
        let mut screen = screen();
        let before = screen.settings.max_size_mb;

        screen.set_max_size(0);
        assert_eq!(screen.settings.max_size_mb, before);
        assert!(screen.notice.is_some());

        screen.set_max_size(18_000_000_000_000_000_000);
        assert_eq!(screen.settings.max_size_mb, before);

        screen.set_max_size(RecordingSettings::MAX_SIZE_MB);
        assert_eq!(screen.settings.max_size_mb, RecordingSettings::MAX_SIZE_MB);
    }

    #[test]
    fn test_set_max_length_rejects_zero() {
        let mut screen = screen();

        screen.set_max_length(0);
        assert_eq!(screen.settings.max_length_seconds, 60);
        assert!(screen.notice.is_some());

        screen.set_max_length(90);
        assert_eq!(screen.settings.max_length_seconds, 90);
    }

    #[test]
    fn test_view_model_mirrors_screen() {
        let mut screen = screen();
        screen.settings.quality = Quality::High;
        screen.begin_capture();
        screen.capture_succeeded(panel("clip.mp4"));

        let vm = screen.view_model();
        assert_eq!(vm.state, ScreenState::ShowingResult);
        assert_eq!(vm.settings.quality, Quality::High);
        assert!(vm.recording.is_some());
        assert!(vm.compression.is_none());
    }
}
