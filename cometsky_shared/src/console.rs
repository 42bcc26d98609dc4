//! Console system.
//!
//! Provides:
//! - Console variables (cvars) mirroring the tunable parts of `SkyConfig`
//! - Built-in commands (`echo`, `help`, `cvarlist`, `set`)
//! - Command history
//! - Quote-aware line parsing
//!
//! Sky commands (`add`, `melt`, ...) live in the runner, which owns the sky;
//! anything it does not recognise is handed to `Console::exec`.

use std::collections::BTreeMap;

use anyhow::{bail, Context};

use crate::{config::SkyConfig, motion::PinPolicy};

/// Console variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl CvarValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CvarValue::Int(v) => Some(*v),
            CvarValue::Float(v) => Some(*v as i64),
            CvarValue::Bool(v) => Some(i64::from(*v)),
            CvarValue::String(s) => s.parse().ok(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            CvarValue::Float(v) => Some(*v),
            CvarValue::Int(v) => Some(*v as f64),
            CvarValue::String(s) => s.parse().ok(),
            CvarValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            CvarValue::Bool(v) => *v,
            CvarValue::Int(v) => *v != 0,
            CvarValue::Float(v) => *v != 0.0,
            CvarValue::String(s) => {
                matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
            }
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            CvarValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Parses user input: int, then float, then bool/on/off, then string.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Ok(v) = input.parse::<i64>() {
            CvarValue::Int(v)
        } else if let Ok(v) = input.parse::<f64>() {
            CvarValue::Float(v)
        } else {
            match input.to_ascii_lowercase().as_str() {
                "true" | "on" => CvarValue::Bool(true),
                "false" | "off" => CvarValue::Bool(false),
                _ => CvarValue::String(input.trim_matches('"').to_string()),
            }
        }
    }
}

impl std::fmt::Display for CvarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvarValue::Int(v) => write!(f, "{}", v),
            CvarValue::Float(v) => write!(f, "{}", v),
            CvarValue::String(v) => write!(f, "\"{}\"", v),
            CvarValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Console variable metadata.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub value: CvarValue,
    pub default: CvarValue,
    pub description: String,
    pub flags: CvarFlags,
}

bitflags::bitflags! {
    /// Cvar flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvarFlags: u32 {
        const NONE = 0;
        const ARCHIVE = 1 << 0;     // Written back into SkyConfig
        const READ_ONLY = 1 << 1;   // Shown, never assigned from the console
    }
}

/// Command handler function type.
pub type CommandHandler = fn(&[&str], &mut ConsoleContext<'_>) -> anyhow::Result<()>;

/// Context passed to command handlers.
pub struct ConsoleContext<'a> {
    /// Output lines for the caller to print.
    pub output: Vec<String>,
    pub cvars: &'a mut BTreeMap<String, Cvar>,
}

impl ConsoleContext<'_> {
    pub fn print(&mut self, msg: impl Into<String>) {
        self.output.push(msg.into());
    }

    pub fn set_cvar(&mut self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        set_cvar_in(self.cvars, name, value)
    }
}

/// The console.
pub struct Console {
    cvars: BTreeMap<String, Cvar>,
    commands: BTreeMap<String, CommandHandler>,
    history: Vec<String>,
    max_history: usize,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let mut console = Self {
            cvars: BTreeMap::new(),
            commands: BTreeMap::new(),
            history: Vec::new(),
            max_history: 100,
        };
        console.register_builtin_commands();
        console
    }

    /// A console with one cvar per tunable in `cfg`, preset to its values.
    pub fn for_sky(cfg: &SkyConfig) -> Self {
        let mut c = Self::new();
        let archive = CvarFlags::ARCHIVE;
        c.register_cvar(
            "sky_threshold",
            CvarValue::Float(cfg.threshold.into()),
            "Constellation join distance (px)",
            archive,
        );
        c.register_cvar(
            "sky_drift",
            CvarValue::Bool(cfg.start_drifting),
            "Drift on startup",
            archive,
        );
        c.register_cvar(
            "sky_drift_speed",
            CvarValue::Float(cfg.drift_speed.into()),
            "Max per-axis speed on scatter",
            archive,
        );
        c.register_cvar(
            "sky_spawn_speed",
            CvarValue::Float(cfg.spawn_speed.into()),
            "Max per-axis speed of new comets",
            archive,
        );
        c.register_cvar(
            "sky_gesture_scale",
            CvarValue::Float(cfg.gesture_scale.into()),
            "Release speed to drift multiplier",
            archive,
        );
        c.register_cvar(
            "sky_pin_clears",
            CvarValue::Bool(cfg.pin_policy == PinPolicy::Clear),
            "Pinning zeroes velocities",
            archive,
        );
        c.register_cvar(
            "sky_store",
            CvarValue::String(cfg.store_path.clone()),
            "Save file",
            archive,
        );
        c.register_cvar(
            "sky_tick_hz",
            CvarValue::Int(cfg.tick_hz.into()),
            "Frame rate",
            CvarFlags::READ_ONLY,
        );
        c
    }

    /// Resets the sky cvars' current values to `cfg`, keeping their defaults.
    /// Used to roll back an assignment the config refused.
    pub fn sync_from(&mut self, cfg: &SkyConfig) {
        let fresh = Self::for_sky(cfg);
        for (name, cvar) in fresh.cvars {
            if let Some(existing) = self.cvars.get_mut(&name) {
                existing.value = cvar.value;
            }
        }
    }

    fn register_builtin_commands(&mut self) {
        self.register_command("echo", |args, ctx| {
            ctx.print(args.join(" "));
            Ok(())
        });

        self.register_command("help", |args, ctx| {
            if let Some(name) = args.first() {
                match ctx.cvars.get(*name) {
                    Some(cvar) => {
                        let line = format!("{}: {}", cvar.name, cvar.description);
                        ctx.print(line);
                    }
                    None => ctx.print(format!("No help for '{}'", name)),
                }
            } else {
                ctx.print("Sky: add [color] <text>, edit <id> <text>, melt <id>, fling <id> <vx> <vy>");
                ctx.print("     drift on|off, clear, list, lines, stars, save, status, quit");
                ctx.print("Console: echo, help [cvar], cvarlist, set <cvar> <value>");
            }
            Ok(())
        });

        self.register_command("cvarlist", |_args, ctx| {
            let lines: Vec<String> = ctx
                .cvars
                .values()
                .map(|cvar| format!("  {} = {} (default: {})", cvar.name, cvar.value, cvar.default))
                .collect();
            for line in lines {
                ctx.print(line);
            }
            Ok(())
        });

        self.register_command("set", |args, ctx| {
            if args.len() < 2 {
                bail!("usage: set <cvar> <value>");
            }
            let name = args[0];
            let value = CvarValue::parse(&args[1..].join(" "));
            let shown = value.to_string();
            ctx.set_cvar(name, value)?;
            ctx.print(format!("{} = {}", name, shown));
            Ok(())
        });
    }

    /// Registers a console variable.
    pub fn register_cvar(&mut self, name: &str, default: CvarValue, description: &str, flags: CvarFlags) {
        self.cvars.insert(
            name.to_string(),
            Cvar {
                name: name.to_string(),
                value: default.clone(),
                default,
                description: description.to_string(),
                flags,
            },
        );
    }

    /// Registers a command.
    pub fn register_command(&mut self, name: &str, handler: CommandHandler) {
        self.commands.insert(name.to_string(), handler);
    }

    /// Executes a console command line.
    pub fn exec(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return Ok(Vec::new());
        }

        self.history.push(line.to_string());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        let tokens = parse_command_line(line);
        let Some((cmd_name, rest)) = tokens.split_first() else {
            return Ok(Vec::new());
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        // Bare cvar name: query, or assign with trailing value.
        if !self.commands.contains_key(cmd_name.as_str()) {
            if let Some(cvar) = self.cvars.get(cmd_name.as_str()) {
                if args.is_empty() {
                    return Ok(vec![format!(
                        "{} = {} (default: {})",
                        cvar.name, cvar.value, cvar.default
                    )]);
                }
                let value = CvarValue::parse(&args.join(" "));
                let shown = format!("{} = {}", cmd_name, value);
                self.set_cvar(cmd_name, value)?;
                return Ok(vec![shown]);
            }
        }

        let mut ctx = ConsoleContext {
            output: Vec::new(),
            cvars: &mut self.cvars,
        };

        match self.commands.get(cmd_name.as_str()) {
            Some(handler) => {
                handler(&args, &mut ctx).with_context(|| format!("command '{}'", cmd_name))?
            }
            None => ctx.print(format!("Unknown command: {}", cmd_name)),
        }

        Ok(ctx.output)
    }

    /// Gets a cvar value.
    pub fn get_cvar(&self, name: &str) -> Option<CvarValue> {
        self.cvars.get(name).map(|c| c.value.clone())
    }

    /// Sets a cvar value. Read-only cvars refuse.
    pub fn set_cvar(&mut self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        set_cvar_in(&mut self.cvars, name, value)
    }

    /// Gets command history.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Copies every `ARCHIVE` cvar back into `cfg`.
    pub fn apply_to(&self, cfg: &mut SkyConfig) {
        let archived = self
            .cvars
            .values()
            .filter(|c| c.flags.contains(CvarFlags::ARCHIVE));
        for cvar in archived {
            let v = &cvar.value;
            match cvar.name.as_str() {
                "sky_threshold" => cfg.threshold = v.as_float().unwrap_or(cfg.threshold.into()) as f32,
                "sky_drift" => cfg.start_drifting = v.as_bool(),
                "sky_drift_speed" => cfg.drift_speed = v.as_float().unwrap_or(cfg.drift_speed.into()) as f32,
                "sky_spawn_speed" => cfg.spawn_speed = v.as_float().unwrap_or(cfg.spawn_speed.into()) as f32,
                "sky_gesture_scale" => {
                    cfg.gesture_scale = v.as_float().unwrap_or(cfg.gesture_scale.into()) as f32
                }
                "sky_pin_clears" => {
                    cfg.pin_policy = if v.as_bool() { PinPolicy::Clear } else { PinPolicy::Freeze }
                }
                "sky_store" => cfg.store_path = v.as_string(),
                _ => {}
            }
        }
    }
}

fn set_cvar_in(cvars: &mut BTreeMap<String, Cvar>, name: &str, value: CvarValue) -> anyhow::Result<()> {
    let Some(cvar) = cvars.get_mut(name) else {
        bail!("unknown cvar: {}", name);
    };
    if cvar.flags.contains(CvarFlags::READ_ONLY) {
        bail!("cvar {} is read-only", name);
    }
    cvar.value = value;
    Ok(())
}

/// Parses a command line into tokens, respecting quotes.
pub fn parse_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_cvars_roundtrip_into_config() {
        let mut cfg = SkyConfig::default();
        let mut console = Console::for_sky(&cfg);

        console.exec("set sky_threshold 120").unwrap();
        console.exec("sky_drift off").unwrap();
        console.exec("sky_pin_clears 1").unwrap();
        console.apply_to(&mut cfg);

        assert_eq!(cfg.threshold, 120.0);
        assert!(!cfg.start_drifting);
        assert_eq!(cfg.pin_policy, PinPolicy::Clear);
    }

    #[test]
    fn sync_from_restores_values_but_not_defaults() {
        let cfg = SkyConfig::default();
        let mut console = Console::for_sky(&cfg);
        console.exec("set sky_drift_speed nan").unwrap();
        assert!(console.get_cvar("sky_drift_speed").unwrap().as_float().unwrap().is_nan());

        console.sync_from(&cfg);
        assert_eq!(console.get_cvar("sky_drift_speed"), Some(CvarValue::Float(0.25)));
        assert_eq!(console.history(), ["set sky_drift_speed nan"]);
    }

    #[test]
    fn read_only_cvar_refuses_assignment() {
        let mut console = Console::for_sky(&SkyConfig::default());
        assert!(console.exec("set sky_tick_hz 30").is_err());
        assert_eq!(console.get_cvar("sky_tick_hz"), Some(CvarValue::Int(60)));
    }

    #[test]
    fn bare_cvar_name_queries() {
        let mut console = Console::for_sky(&SkyConfig::default());
        let out = console.exec("sky_drift").unwrap();
        assert_eq!(out, vec!["sky_drift = true (default: true)"]);
    }

    #[test]
    fn unknown_command_is_reported_not_failed() {
        let mut console = Console::new();
        let out = console.exec("warp 9").unwrap();
        assert_eq!(out, vec!["Unknown command: warp"]);
        assert_eq!(console.history(), ["warp 9"]);
    }

    #[test]
    fn value_parsing_prefers_numbers() {
        assert_eq!(CvarValue::parse("3"), CvarValue::Int(3));
        assert_eq!(CvarValue::parse("0.5"), CvarValue::Float(0.5));
        assert_eq!(CvarValue::parse("on"), CvarValue::Bool(true));
        assert_eq!(CvarValue::parse("\"x y\""), CvarValue::String("x y".into()));
    }

    #[test]
    fn parse_quoted_args() {
        let tokens = parse_command_line(r#"add pink "call mom" later"#);
        assert_eq!(tokens, vec!["add", "pink", "call mom", "later"]);
    }
}
