// Copyright 2024-2025 Golem Cloud
//
// Licensed under the Golem Source License v1.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://license.golem.cloud/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::SafeDisplay;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::fs::File;
use std::io::stdout;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Filter, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

pub enum Output {
    Stdout,
    File,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    pub enabled: bool,
    pub json: bool,
    pub json_flatten: bool,
    pub ansi: bool,
    pub without_time: bool,
    pub span_events_active: bool,
    pub span_events_full: bool,
}

impl OutputConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::text_ansi()
        }
    }

    pub fn text_ansi() -> Self {
        Self {
            enabled: true,
            json: false,
            json_flatten: false,
            ansi: true,
            without_time: false,
            span_events_active: false,
            span_events_full: false,
        }
    }

    pub fn json_flatten() -> Self {
        Self {
            enabled: true,
            json: true,
            json_flatten: true,
            ansi: false,
            without_time: false,
            span_events_active: false,
            span_events_full: false,
        }
    }
}

impl SafeDisplay for OutputConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "enabled: {}", self.enabled);
        let _ = writeln!(&mut result, "json: {}", self.json);
        let _ = writeln!(&mut result, "json flatten: {}", self.json_flatten);
        let _ = writeln!(&mut result, "ansi: {}", self.ansi);
        let _ = writeln!(&mut result, "without time: {}", self.without_time);
        let _ = writeln!(&mut result, "span events active: {}", self.span_events_active);
        let _ = writeln!(&mut result, "span events full: {}", self.span_events_full);
        result
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TracingConfig {
    pub service_name: String,
    pub stdout: OutputConfig,
    pub file: OutputConfig,
    pub file_path: Option<String>,
}

impl TracingConfig {
    pub fn local_dev(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            stdout: OutputConfig::text_ansi(),
            file: OutputConfig::disabled(),
            file_path: None,
        }
    }

    pub fn production(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            stdout: OutputConfig::json_flatten(),
            file: OutputConfig::disabled(),
            file_path: None,
        }
    }

    pub fn test(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            stdout: OutputConfig {
                without_time: true,
                ..OutputConfig::text_ansi()
            },
            file: OutputConfig::disabled(),
            file_path: None,
        }
    }
}

impl SafeDisplay for TracingConfig {
    fn to_safe_string(&self) -> String {
        let mut result = String::new();
        let _ = writeln!(&mut result, "service name: {}", self.service_name);
        let _ = writeln!(&mut result, "stdout:");
        let _ = writeln!(&mut result, "{}", self.stdout.to_safe_string_indented());
        let _ = writeln!(&mut result, "file:");
        let _ = writeln!(&mut result, "{}", self.file.to_safe_string_indented());
        if let Some(file_path) = &self.file_path {
            let _ = writeln!(&mut result, "file path: {file_path}");
        }
        result
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::local_dev("auction")
    }
}

type BoxedFilter = Box<dyn Filter<Registry> + 'static + Send + Sync>;

pub fn init_tracing<F>(config: &TracingConfig, make_filter: F)
where
    F: Fn(Output) -> BoxedFilter,
{
    let mut layers = Vec::new();

    if config.stdout.enabled {
        layers.push(make_layer(&config.stdout, make_filter(Output::Stdout), stdout))
    }

    match config.file_path {
        Some(ref file_path) if config.file.enabled => match File::create(file_path) {
            Ok(file) => layers.push(make_layer(
                &config.file,
                make_filter(Output::File),
                Arc::new(file),
            )),
            Err(err) => eprintln!("cannot create log file: {file_path}, error: {err}"),
        },
        _ => {}
    }

    // Tests may initialize tracing from several dependencies; the first one wins
    if tracing_subscriber::registry().with(layers).try_init().is_ok() {
        debug!(
            // NOTE: intentionally logged as string and not as structured
            tracing_config = serde_json::to_string(&config).unwrap_or_default(),
            "Tracing initialized"
        );
    }
}

pub fn init_tracing_with_default_env_filter(config: &TracingConfig) {
    init_tracing(config, |_| Box::new(default_env_filter("info")))
}

pub fn init_tracing_with_default_debug_env_filter(config: &TracingConfig) {
    init_tracing(config, |_| Box::new(default_env_filter("debug")))
}

fn default_env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn make_layer<W>(
    config: &OutputConfig,
    filter: BoxedFilter,
    writer: W,
) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + 'static + Send + Sync,
{
    let span_events = {
        if config.span_events_full {
            FmtSpan::FULL
        } else if config.span_events_active {
            FmtSpan::ACTIVE
        } else {
            FmtSpan::NONE
        }
    };

    match (config.json, config.without_time) {
        (true, _) => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(config.json_flatten)
            .with_span_events(span_events)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        (false, true) => tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi)
            .without_time()
            .with_span_events(span_events)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        (false, false) => tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi)
            .with_span_events(span_events)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}
