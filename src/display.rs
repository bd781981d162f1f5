use chrono::Local;

/// Tag applied to a system line in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn tag(self) -> &'static str {
        match self {
            Severity::Info => "System",
            Severity::Success => "OK",
            Severity::Warning => "Warn",
            Severity::Error => "Error",
        }
    }
}

/// Where pipeline events end up. The pipeline never renders anything itself;
/// it only emits these events. The default implementation writes the same
/// log lines the UI pane would show.
pub trait DisplaySink: Send + Sync {
    fn normal_message(&self, author: &str, text: &str);
    fn spam_message(&self, author: &str, text: &str);
    fn system_message(&self, text: &str, severity: Severity);
    /// Voice indicator transition: true while a clip is playing.
    fn voice_active(&self, active: bool);
}

pub struct ConsoleDisplay;

impl DisplaySink for ConsoleDisplay {
    fn normal_message(&self, author: &str, text: &str) {
        println!("[{}] {}: {}", Local::now().format("%H:%M:%S"), author, text);
    }

    fn spam_message(&self, author: &str, text: &str) {
        println!(
            "[{}] {}: {} [SPAM]",
            Local::now().format("%H:%M:%S"),
            author,
            text
        );
    }

    fn system_message(&self, text: &str, severity: Severity) {
        let line = format!(
            "[{}] [{}] {}",
            Local::now().format("%H:%M:%S"),
            severity.tag(),
            text
        );
        if severity == Severity::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    fn voice_active(&self, active: bool) {
        if active {
            println!("[{}] [Voice] speaking", Local::now().format("%H:%M:%S"));
        } else {
            println!("[{}] [Voice] idle", Local::now().format("%H:%M:%S"));
        }
    }
}
