use crate::messages::ScreenState;
use crate::settings::{Quality, RecordingSettings};

/// One rendered result block: either the raw recording or the compressed
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPanel {
    pub name: String,
    pub path: String,
    pub size_kb: u64,
    pub duration_ms: String,
    pub resolution: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPanel {
    pub panel: ResultPanel,
    pub elapsed_ms: u64,
}

/// Everything the screen shows, as plain data. Built by the controller,
/// handed to `render`. A hidden panel is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub settings: RecordingSettings,
    pub state: ScreenState,
    pub recording: Option<ResultPanel>,
    pub compression: Option<CompressedPanel>,
    pub notice: Option<String>,
}

pub fn render(vm: &ViewModel) {
    println!();
    println!(
        "settings: max length {}s | max size {} MB | quality {} | compress {}",
        vm.settings.max_length_seconds,
        vm.settings.max_size_mb,
        quality_label(vm.settings.quality),
        if vm.settings.compress_after_recording {
            "on"
        } else {
            "off"
        },
    );
    println!("state: {}", state_label(vm.state));

    if let Some(panel) = &vm.recording {
        println!("recording:");
        render_panel(panel);
    }

    if let Some(compressed) = &vm.compression {
        println!("compressed ({} ms):", compressed.elapsed_ms);
        render_panel(&compressed.panel);
    }

    if let Some(notice) = &vm.notice {
        println!("! {}", notice);
    }
}

fn render_panel(panel: &ResultPanel) {
    println!("  name:       {}", panel.name);
    println!("  path:       {}", panel.path);
    println!("  size:       {} KB", panel.size_kb);
    println!("  length:     {} ms", panel.duration_ms);
    println!("  resolution: {}", panel.resolution);
}

fn quality_label(quality: Quality) -> &'static str {
    match quality {
        Quality::Low => "low",
        Quality::High => "high",
    }
}

fn state_label(state: ScreenState) -> &'static str {
    match state {
        ScreenState::Idle => "idle",
        ScreenState::AwaitingCapture => "recording...",
        ScreenState::ShowingResult => "recorded",
        ScreenState::Compressing => "compressing...",
        ScreenState::ShowingCompressedResult => "compressed",
    }
}
