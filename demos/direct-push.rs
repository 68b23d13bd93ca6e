//! Push a few lines directly, without going through the `log` facade.
fn main() {
    use loki_push::{Credentials, LabelSet, LogEntry, LokiClient, PushRequest};

    let client = LokiClient::new("http://localhost:3100").unwrap();
    // for Grafana Cloud the password is an API key
    let credentials = Credentials::new("", "");

    for (level, message) in [
        ("info", "This is an informational message posted from Rust"),
        ("warn", "This is a warning message posted from Rust"),
        ("error", "This is an error message posted from Rust"),
        ("debug", "This is a debug message posted from Rust"),
    ] {
        let labels = LabelSet::standard("rust", "dev", "my-computer").with("level", level);
        let mut request = PushRequest::new(labels);
        request.push(LogEntry::now(format!(
            "[{}] {}",
            level.to_ascii_uppercase(),
            message
        )));

        match client.push(&request, Some("tenant1"), Some(&credentials)) {
            Ok(()) => println!("sent: {}", message),
            Err(error) => {
                println!("Failed to send log to Loki: {}", error);
                println!("Response status code: {}", error.status_text());
                if let Some(body) = error.response_body() {
                    println!("Response text: {}", body);
                }
            }
        }
    }
}
