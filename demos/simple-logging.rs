fn main() {
    use log::{debug, error, info, set_boxed_logger, set_max_level, trace, warn, LevelFilter};
    use loki_push::{LabelSet, LokiClient, LokiLogger};
    use std::sync::Arc;

    let client = LokiClient::new("http://localhost:3100").unwrap();
    let my_loki = LokiLogger::builder(Arc::new(client))
        .labels(LabelSet::standard("rust", "dev", "my-computer"))
        .tenant("tenant1")
        .include_level()
        .build();

    // set the actual logger for the facade
    set_boxed_logger(Box::new(my_loki)).unwrap();
    set_max_level(LevelFilter::Trace);

    // use the regular log macros for actual logging in the app
    trace!("This is a TRACE message");
    debug!("This is a DEBUG message");
    info!("This is a INFO message");
    warn!("This is a WARN message");
    error!("This is a ERROR message");
}
