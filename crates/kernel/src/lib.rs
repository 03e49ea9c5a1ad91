pub mod settings;

pub use settings::{
    DatabaseSettings, Environment, LogFormat, RunMode, SessionSource, Settings, TelemetrySettings,
};
