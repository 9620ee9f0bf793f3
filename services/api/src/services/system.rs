//! Simulated system status and application control.
//!
//! Nothing here touches the host; the replies only look the part.

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

static APP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:open|launch|start)\s+(\w+)").expect("valid regex")
});

/// Builds a status report from randomized plausible readings.
pub fn status_report<R: Rng + ?Sized>(rng: &mut R) -> String {
    let cpu = rng.random_range(10..40);
    let memory = rng.random_range(6.0..10.0);
    let disk = rng.random_range(40..80);
    let hours = rng.random_range(0..24);
    let minutes = rng.random_range(0..60);
    format!(
        "System Status Report: CPU usage is at {}%, memory usage is {:.1}GB, disk usage is at {}%, and system uptime is {}h {}m. All systems are operating within normal parameters.",
        cpu, memory, disk, hours, minutes
    )
}

/// Picks the canned reply for an "open X" style command.
pub fn control_reply(command: &str) -> String {
    let app = APP_NAME
        .captures(command)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "application".to_string());

    match app.as_str() {
        "calculator" => "Opening Calculator application.".to_string(),
        "notepad" => "Launching Notepad for you.".to_string(),
        "chrome" => "Starting Google Chrome browser.".to_string(),
        "photoshop" => "Launching Adobe Photoshop.".to_string(),
        other => format!(
            "Attempting to open {}. Please note that system control is limited in this browser environment.",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_known_applications() {
        assert_eq!(control_reply("Open Calculator"), "Opening Calculator application.");
        assert_eq!(control_reply("jarvis launch notepad"), "Launching Notepad for you.");
        assert_eq!(control_reply("start chrome please"), "Starting Google Chrome browser.");
    }

    #[test]
    fn test_unknown_application() {
        assert_eq!(
            control_reply("open spotify"),
            "Attempting to open spotify. Please note that system control is limited in this browser environment."
        );
        assert!(control_reply("open").starts_with("Attempting to open application."));
    }

    #[test]
    fn test_status_report_readings_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let pattern = Regex::new(
            r"CPU usage is at (\d+)%, memory usage is (\d+\.\d)GB, disk usage is at (\d+)%, and system uptime is (\d+)h (\d+)m",
        )
        .unwrap();

        for _ in 0..50 {
            let report = status_report(&mut rng);
            let caps = pattern.captures(&report).unwrap();
            let cpu: u32 = caps[1].parse().unwrap();
            let memory: f64 = caps[2].parse().unwrap();
            let disk: u32 = caps[3].parse().unwrap();
            let hours: u32 = caps[4].parse().unwrap();
            assert!((10..40).contains(&cpu));
            assert!((6.0..=10.0).contains(&memory));
            assert!((40..80).contains(&disk));
            assert!(hours < 24);
            assert!(report.ends_with("All systems are operating within normal parameters."));
        }
    }
}
