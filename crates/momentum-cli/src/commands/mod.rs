pub mod chain;
pub mod config;
pub mod history;
pub mod rule;
pub mod schedule;
pub mod session;

use std::error::Error;

use momentum_core::{
    App, Config, Database, Event, LogNotifier, NoopNotifier, Notifier, SystemClock,
};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn Error>>;

pub type CliApp = App<Database, SystemClock, Box<dyn Notifier>>;

/// Open the database and load application state, honoring the config.
pub fn open_app(config: &Config) -> Result<CliApp, Box<dyn Error>> {
    let notifier: Box<dyn Notifier> = if config.notifications.enabled {
        Box::new(LogNotifier)
    } else {
        Box::new(NoopNotifier)
    };
    let app = App::load(Database::open()?, SystemClock, notifier)?
        .with_failure_reason(config.session.default_failure_reason.clone());
    Ok(app)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the event, or the current state when the command changed nothing.
pub fn print_outcome(app: &CliApp, event: Option<Event>) -> CliResult {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&app.snapshot()),
    }
}
