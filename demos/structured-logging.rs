fn main() {
    use log::{debug, error, info, set_boxed_logger, set_max_level, trace, warn, LevelFilter};
    use loki_push::{LokiClient, LokiLogger};
    use std::sync::Arc;

    let client = LokiClient::new("http://localhost:3100").unwrap();
    let my_loki = LokiLogger::builder(Arc::new(client))
        .label("service", "structured-logging")
        .include_level()
        .build();

    // set the actual logger for the facade
    set_boxed_logger(Box::new(my_loki)).unwrap();
    set_max_level(LevelFilter::Trace);

    // the key/values of each record end up as labels of its stream
    trace!(app = "structured-logging"; "This is a TRACE message");
    debug!(app = "structured-logging"; "This is a DEBUG message");
    info!(app = "structured-logging"; "This is a INFO message");
    warn!(app = "structured-logging", critical = true; "This is a WARN message");
    error!(app = "structured-logging", fatal = false; "This is a ERROR message");
}
