use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::{DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE};
use crate::net::{
    Endpoints, RequestHeaders, DEFAULT_DETAILS_BASE, DEFAULT_SEARCH_BASE, DEFAULT_SEARCH_TAIL,
    DEFAULT_USER_AGENT,
};
use crate::poll::{LoopOptions, DEFAULT_MIN_SUMMARY_FIELDS, DEFAULT_RECONNECT_ATTEMPTS};
use crate::render::{Geometry, Timing, DEFAULT_ROW_HEIGHT, DEFAULT_SCROLL_PADDING};

pub const DEFAULT_BOUNDS_BOX: &str = "51.6,51.4,-0.3,-0.1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_QUERY_DELAY_SECS: u64 = 25;
pub const DEFAULT_PAUSE_SECS: u64 = 3;
pub const DEFAULT_SCROLL_FRAME_MS: u64 = 10;
pub const DEFAULT_DISPLAY_WIDTH: u32 = crate::display::PANEL_WIDTH;
pub const DEFAULT_GLYPH_WIDTH: u32 = crate::display::GLYPH_WIDTH;
pub const DEFAULT_LOG_ENABLED: bool = true;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FILE: &str = "flightwatch.log";
pub const DEFAULT_CONFIG_FILE: &str = "flightwatch.toml";
pub const SETTLE_SECS: u64 = 5;
const MIN_BUFFER_CAPACITY: usize = 256;
const MAX_DISPLAY_WIDTH: u32 = 1024;
const MAX_ROW_HEIGHT: u32 = 64;
const MAX_GLYPH_WIDTH: u32 = 32;
const MAX_SCROLL_PADDING: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub bounds_box: String,
    pub ssid: String,
    pub password: String,
    pub search_base: String,
    pub search_tail: String,
    pub details_base: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub query_delay_secs: u64,
    pub pause_secs: u64,
    pub scroll_frame_ms: u64,
    pub buffer_capacity: usize,
    pub chunk_size: usize,
    pub min_summary_fields: usize,
    pub reconnect_attempts: u32,
    pub display_width: u32,
    pub row_height: u32,
    pub glyph_width: u32,
    pub scroll_padding: u32,
    pub log_enabled: bool,
    pub log_level: String,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            bounds_box: DEFAULT_BOUNDS_BOX.to_string(),
            ssid: String::new(),
            password: String::new(),
            search_base: DEFAULT_SEARCH_BASE.to_string(),
            search_tail: DEFAULT_SEARCH_TAIL.to_string(),
            details_base: DEFAULT_DETAILS_BASE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            query_delay_secs: DEFAULT_QUERY_DELAY_SECS,
            pause_secs: DEFAULT_PAUSE_SECS,
            scroll_frame_ms: DEFAULT_SCROLL_FRAME_MS,
            buffer_capacity: DEFAULT_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_summary_fields: DEFAULT_MIN_SUMMARY_FIELDS,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            display_width: DEFAULT_DISPLAY_WIDTH,
            row_height: DEFAULT_ROW_HEIGHT,
            glyph_width: DEFAULT_GLYPH_WIDTH,
            scroll_padding: DEFAULT_SCROLL_PADDING,
            log_enabled: DEFAULT_LOG_ENABLED,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(SETTLE_SECS + self.query_delay_secs)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            &self.search_base,
            &self.bounds_box,
            &self.search_tail,
            &self.details_base,
        )
    }

    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions {
            endpoints: self.endpoints(),
            headers: RequestHeaders::new(&self.user_agent),
            geometry: Geometry {
                width: self.display_width,
                row_height: self.row_height,
                glyph_width: self.glyph_width,
                scroll_padding: self.scroll_padding,
                text_x: 0,
            },
            timing: Timing {
                pause: Duration::from_secs(self.pause_secs),
                frame: Duration::from_millis(self.scroll_frame_ms),
            },
            min_summary_fields: self.min_summary_fields,
            reconnect_attempts: self.reconnect_attempts,
            poll_interval: self.poll_interval(),
            buffer_capacity: self.buffer_capacity,
            chunk_size: self.chunk_size,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bounds_box: Option<String>,
    ssid: Option<String>,
    password: Option<String>,
    search_base: Option<String>,
    search_tail: Option<String>,
    details_base: Option<String>,
    user_agent: Option<String>,
    request_timeout_secs: Option<u64>,
    query_delay_secs: Option<u64>,
    pause_secs: Option<u64>,
    scroll_frame_ms: Option<u64>,
    buffer_capacity: Option<usize>,
    chunk_size: Option<usize>,
    min_summary_fields: Option<usize>,
    reconnect_attempts: Option<u32>,
    display_width: Option<u32>,
    row_height: Option<u32>,
    glyph_width: Option<u32>,
    scroll_padding: Option<u32>,
    log_enabled: Option<bool>,
    log_level: Option<String>,
    log_file: Option<String>,
}

pub fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut explicit_config: Option<PathBuf> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--config needs a value"))?;
            explicit_config = Some(PathBuf::from(value));
        }
    }

    let env_config = env::var("FLIGHTWATCH_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit_config
        .clone()
        .or(env_config)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut config = Config::default();

    if config_path.exists() {
        if let Some(file_config) = load_file_config(&config_path)? {
            apply_file_config(&mut config, file_config);
        }
    } else if explicit_config.is_some() {
        return Err(anyhow!("Config file not found: {}", config_path.display()));
    }

    config.config_path = config_path;

    apply_env(&mut config, |key| env::var(key).ok());
    apply_cli(&mut config, &args)?;

    validate_bounds(&config.bounds_box)?;
    Ok(config)
}

fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("FLIGHTWATCH_BOUNDS") {
        config.bounds_box = value;
    }
    if let Some(value) = lookup("FLIGHTWATCH_SSID") {
        config.ssid = value;
    }
    if let Some(value) = lookup("FLIGHTWATCH_PASSWORD") {
        config.password = value;
    }
    if let Some(value) = lookup("FLIGHTWATCH_USER_AGENT") {
        config.user_agent = value;
    }
    if let Some(value) = lookup("FLIGHTWATCH_QUERY_DELAY") {
        if let Ok(secs) = value.parse::<u64>() {
            config.query_delay_secs = secs;
        }
    }
    if let Some(value) = lookup("FLIGHTWATCH_PAUSE") {
        if let Ok(secs) = value.parse::<u64>() {
            config.pause_secs = secs;
        }
    }
    if let Some(value) = lookup("FLIGHTWATCH_TIMEOUT") {
        if let Ok(secs) = value.parse::<u64>() {
            config.request_timeout_secs = secs.max(1);
        }
    }
    if let Some(value) = lookup("FLIGHTWATCH_LOG_ENABLED") {
        config.log_enabled = matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(value) = lookup("FLIGHTWATCH_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = lookup("FLIGHTWATCH_LOG_FILE") {
        config.log_file = value;
    }
}

fn apply_cli(config: &mut Config, args: &[String]) -> Result<()> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                iter.next();
            }
            "--bounds" => {
                config.bounds_box = iter
                    .next()
                    .ok_or_else(|| anyhow!("--bounds needs a value"))?
                    .to_string();
            }
            "--ssid" => {
                config.ssid = iter
                    .next()
                    .ok_or_else(|| anyhow!("--ssid needs a value"))?
                    .to_string();
            }
            "--password" => {
                config.password = iter
                    .next()
                    .ok_or_else(|| anyhow!("--password needs a value"))?
                    .to_string();
            }
            "--query-delay" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--query-delay needs a value"))?;
                config.query_delay_secs = value.parse::<u64>()?;
            }
            "--pause" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--pause needs a value"))?;
                config.pause_secs = value.parse::<u64>()?;
            }
            "--log" => {
                config.log_enabled = true;
            }
            "--no-log" => {
                config.log_enabled = false;
            }
            "--log-level" => {
                config.log_level = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-level needs a value"))?
                    .to_string();
            }
            "--log-file" => {
                config.log_file = iter
                    .next()
                    .ok_or_else(|| anyhow!("--log-file needs a value"))?
                    .to_string();
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                return Err(anyhow!("Unknown argument: {other}"));
            }
        }
    }
    Ok(())
}

fn load_file_config(path: &Path) -> Result<Option<FileConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let cfg: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(cfg))
}

fn apply_file_config(target: &mut Config, file: FileConfig) {
    if let Some(bounds_box) = file.bounds_box {
        target.bounds_box = bounds_box;
    }
    if let Some(ssid) = file.ssid {
        target.ssid = ssid;
    }
    if let Some(password) = file.password {
        target.password = password;
    }
    if let Some(search_base) = file.search_base {
        target.search_base = search_base;
    }
    if let Some(search_tail) = file.search_tail {
        target.search_tail = search_tail;
    }
    if let Some(details_base) = file.details_base {
        target.details_base = details_base;
    }
    if let Some(user_agent) = file.user_agent {
        target.user_agent = user_agent;
    }
    if let Some(secs) = file.request_timeout_secs {
        target.request_timeout_secs = secs.max(1);
    }
    if let Some(secs) = file.query_delay_secs {
        target.query_delay_secs = secs;
    }
    if let Some(secs) = file.pause_secs {
        target.pause_secs = secs;
    }
    if let Some(ms) = file.scroll_frame_ms {
        target.scroll_frame_ms = ms.max(1);
    }
    if let Some(capacity) = file.buffer_capacity {
        target.buffer_capacity = capacity.max(MIN_BUFFER_CAPACITY);
    }
    if let Some(chunk_size) = file.chunk_size {
        target.chunk_size = chunk_size.max(1);
    }
    if let Some(min_fields) = file.min_summary_fields {
        target.min_summary_fields = min_fields;
    }
    if let Some(attempts) = file.reconnect_attempts {
        target.reconnect_attempts = attempts.max(1);
    }
    if let Some(width) = file.display_width {
        target.display_width = width.clamp(1, MAX_DISPLAY_WIDTH);
    }
    if let Some(row_height) = file.row_height {
        target.row_height = row_height.clamp(1, MAX_ROW_HEIGHT);
    }
    if let Some(glyph_width) = file.glyph_width {
        target.glyph_width = glyph_width.clamp(1, MAX_GLYPH_WIDTH);
    }
    if let Some(padding) = file.scroll_padding {
        target.scroll_padding = padding.min(MAX_SCROLL_PADDING);
    }
    if let Some(log_enabled) = file.log_enabled {
        target.log_enabled = log_enabled;
    }
    if let Some(log_level) = file.log_level {
        target.log_level = log_level;
    }
    if let Some(log_file) = file.log_file {
        target.log_file = log_file;
    }
}

fn validate_bounds(bounds_box: &str) -> Result<()> {
    let parts: Vec<&str> = bounds_box.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(anyhow!(
            "bounds_box needs four comma-separated numbers, got {bounds_box:?}"
        ));
    }
    for part in parts {
        part.parse::<f64>()
            .with_context(|| format!("bounds_box has a non-numeric value: {part:?}"))?;
    }
    Ok(())
}

fn print_help() {
    println!("flightwatch");
    println!("Usage: flightwatch [--config PATH] [--bounds N,S,W,E]");
    println!("       [--ssid NAME] [--password SECRET]");
    println!("       [--query-delay SECONDS] [--pause SECONDS]");
    println!("       [--log] [--no-log] [--log-level LEVEL] [--log-file PATH]");
    println!("Environment: FLIGHTWATCH_CONFIG overrides config path");
    println!("Environment: FLIGHTWATCH_BOUNDS sets the search box");
    println!("Environment: FLIGHTWATCH_SSID/PASSWORD set network credentials");
    println!("Environment: FLIGHTWATCH_USER_AGENT overrides the request agent");
    println!("Environment: FLIGHTWATCH_QUERY_DELAY FLIGHTWATCH_PAUSE control timing");
    println!("Environment: FLIGHTWATCH_TIMEOUT sets the request timeout in seconds");
    println!("Environment: FLIGHTWATCH_LOG_ENABLED/LEVEL/FILE configure logging");
    println!("Keys: q | Esc | Ctrl-C quit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        dir.push(format!("flightwatch-config-test-{suffix}"));
        let _ = fs::create_dir_all(&dir);
        dir.push(name);
        dir
    }

    fn base_config() -> Config {
        Config::default()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_device() {
        let cfg = base_config();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert!(cfg.log_enabled);
        let options = cfg.loop_options();
        assert_eq!(options.geometry, Geometry::default());
        assert_eq!(options.timing, Timing::default());
        assert_eq!(options.min_summary_fields, 13);
        assert_eq!(options.reconnect_attempts, 10);
        assert!(options
            .endpoints
            .search_url()
            .contains("feed.js?bounds=51.6,51.4,-0.3,-0.1&faa=1"));
        assert!(validate_bounds(&cfg.bounds_box).is_ok());
    }

    #[test]
    fn bounds_must_be_four_numbers() {
        assert!(validate_bounds("1, 2.5,-3,4").is_ok());
        let err = validate_bounds("1,2,3").unwrap_err();
        assert!(err.to_string().contains("four comma-separated"));
        let err = validate_bounds("1,2,x,4").unwrap_err();
        assert!(err.to_string().contains("non-numeric"));
        assert!(validate_bounds("").is_err());
    }

    #[test]
    fn load_file_config_parses_values() {
        let path = temp_file("config.toml");
        let content = r#"
bounds_box = "40.0,39.0,-75.0,-74.0"
ssid = "hangar"
password = "secret"
user_agent = "flightwatch-test"
query_delay_secs = 55
pause_secs = 1
scroll_frame_ms = 20
buffer_capacity = 8192
min_summary_fields = 10
log_enabled = false
log_level = "debug"
log_file = "custom.log"
"#;
        fs::write(&path, content).unwrap();
        let cfg = load_file_config(&path).unwrap().unwrap();
        assert_eq!(cfg.bounds_box.as_deref(), Some("40.0,39.0,-75.0,-74.0"));
        assert_eq!(cfg.ssid.as_deref(), Some("hangar"));
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert_eq!(cfg.user_agent.as_deref(), Some("flightwatch-test"));
        assert_eq!(cfg.query_delay_secs, Some(55));
        assert_eq!(cfg.pause_secs, Some(1));
        assert_eq!(cfg.scroll_frame_ms, Some(20));
        assert_eq!(cfg.buffer_capacity, Some(8192));
        assert_eq!(cfg.min_summary_fields, Some(10));
        assert_eq!(cfg.log_enabled, Some(false));
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.log_file.as_deref(), Some("custom.log"));
        assert!(cfg.details_base.is_none());
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(path.parent().unwrap());
    }

    #[test]
    fn unknown_file_keys_are_ignored() {
        let cfg: FileConfig = toml::from_str("wifi_country = \"GB\"\npause_secs = 2\n").unwrap();
        assert_eq!(cfg.pause_secs, Some(2));
    }

    #[test]
    fn apply_file_config_overrides_and_clamps() {
        let mut cfg = base_config();
        let file = FileConfig {
            request_timeout_secs: Some(0),
            scroll_frame_ms: Some(0),
            buffer_capacity: Some(16),
            chunk_size: Some(0),
            reconnect_attempts: Some(0),
            row_height: Some(0),
            query_delay_secs: Some(0),
            details_base: Some("http://feed.test/details?flight=".to_string()),
            log_enabled: Some(false),
            log_level: Some("trace".to_string()),
            log_file: Some("trace.log".to_string()),
            ..Default::default()
        };
        apply_file_config(&mut cfg, file);
        assert_eq!(cfg.request_timeout_secs, 1);
        assert_eq!(cfg.scroll_frame_ms, 1);
        assert_eq!(cfg.buffer_capacity, 256);
        assert_eq!(cfg.chunk_size, 1);
        assert_eq!(cfg.reconnect_attempts, 1);
        assert_eq!(cfg.row_height, 1);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert!(!cfg.log_enabled);
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.log_file, "trace.log");
        assert_eq!(
            cfg.endpoints().details_url("abc"),
            "http://feed.test/details?flight=abc"
        );
    }

    #[test]
    fn geometry_keys_are_bounded() {
        let mut cfg = base_config();
        let file = FileConfig {
            display_width: Some(u32::MAX),
            row_height: Some(u32::MAX),
            glyph_width: Some(u32::MAX),
            scroll_padding: Some(u32::MAX),
            ..Default::default()
        };
        apply_file_config(&mut cfg, file);
        assert_eq!(cfg.display_width, 1024);
        assert_eq!(cfg.row_height, 64);
        assert_eq!(cfg.glyph_width, 32);
        assert_eq!(cfg.scroll_padding, 4096);
        let geometry = cfg.loop_options().geometry;
        assert_eq!(geometry.row_y(2), 192);
        let canvas = geometry.canvas();
        assert_eq!(canvas.cols(), 32);
        assert_eq!(canvas.rows(), 32);
    }

    #[test]
    fn wide_display_builds_wide_canvas() {
        let cfg = Config {
            display_width: 256,
            ..base_config()
        };
        let canvas = cfg.loop_options().geometry.canvas();
        assert_eq!(canvas.cols(), 32);
        assert_eq!(canvas.rows(), 8);
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("FLIGHTWATCH_BOUNDS", "1,2,3,4"),
            ("FLIGHTWATCH_QUERY_DELAY", "40"),
            ("FLIGHTWATCH_PAUSE", "not-a-number"),
            ("FLIGHTWATCH_TIMEOUT", "0"),
            ("FLIGHTWATCH_LOG_ENABLED", "off"),
        ]);
        let mut cfg = base_config();
        apply_env(&mut cfg, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.bounds_box, "1,2,3,4");
        assert_eq!(cfg.query_delay_secs, 40);
        assert_eq!(cfg.pause_secs, DEFAULT_PAUSE_SECS);
        assert_eq!(cfg.request_timeout_secs, 1);
        assert!(!cfg.log_enabled);
    }

    #[test]
    fn cli_flags_apply_last() {
        let mut cfg = base_config();
        apply_cli(
            &mut cfg,
            &args(&[
                "--config",
                "ignored.toml",
                "--bounds",
                "5,6,7,8",
                "--ssid",
                "hangar",
                "--query-delay",
                "10",
                "--no-log",
                "--log-level",
                "warn",
            ]),
        )
        .unwrap();
        assert_eq!(cfg.bounds_box, "5,6,7,8");
        assert_eq!(cfg.ssid, "hangar");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(15));
        assert!(!cfg.log_enabled);
        assert_eq!(cfg.log_level, "warn");
    }

    #[test]
    fn cli_rejects_bad_input() {
        let mut cfg = base_config();
        let err = apply_cli(&mut cfg, &args(&["--bounds"])).unwrap_err();
        assert!(err.to_string().contains("--bounds needs a value"));
        let err = apply_cli(&mut cfg, &args(&["--radar"])).unwrap_err();
        assert!(err.to_string().contains("Unknown argument"));
        assert!(apply_cli(&mut cfg, &args(&["--pause", "soon"])).is_err());
    }
}
