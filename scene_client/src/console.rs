//! Console commands accepted by the `greeting` binary.

use anyhow::{bail, Context};
use scene_shared::{
    event::{HostEvent, PointerButton},
    viewport::ViewportState,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    /// Drag from the viewport center by `(dx, dy)` pixels.
    Drag { dx: f32, dy: f32 },
    Resize { width: f32, height: f32 },
    Zoom { delta: f32 },
    AutoRotate(bool),
    Pause,
    Resume,
    Status,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&name) = tokens.first() else {
            return Ok(None);
        };
        let cmd = match name {
            "drag" => {
                let (dx, dy) = two_floats(&tokens, "drag <dx> <dy>")?;
                ConsoleCommand::Drag { dx, dy }
            }
            "resize" => {
                let (width, height) = two_floats(&tokens, "resize <width> <height>")?;
                ConsoleCommand::Resize { width, height }
            }
            "zoom" => {
                let delta = finite(tokens.get(1).context("Usage: zoom <delta>")?)?;
                ConsoleCommand::Zoom { delta }
            }
            "autorotate" => match tokens.get(1).copied() {
                Some("on") => ConsoleCommand::AutoRotate(true),
                Some("off") => ConsoleCommand::AutoRotate(false),
                _ => bail!("Usage: autorotate on|off"),
            },
            "pause" => ConsoleCommand::Pause,
            "resume" => ConsoleCommand::Resume,
            "status" => ConsoleCommand::Status,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => bail!("Unknown command: {other}"),
        };
        Ok(Some(cmd))
    }

    /// Host events this command stands for, if any.
    pub fn host_events(&self, viewport: ViewportState) -> Vec<HostEvent> {
        match *self {
            ConsoleCommand::Drag { dx, dy } => {
                let (x, y) = (viewport.width / 2.0, viewport.height / 2.0);
                vec![
                    HostEvent::PointerDown {
                        x,
                        y,
                        button: PointerButton::Primary,
                    },
                    HostEvent::PointerMove { x: x + dx, y: y + dy },
                    HostEvent::PointerUp,
                ]
            }
            ConsoleCommand::Resize { width, height } => vec![HostEvent::Resize { width, height }],
            ConsoleCommand::Zoom { delta } => vec![HostEvent::Wheel { delta_y: delta }],
            _ => Vec::new(),
        }
    }
}

fn two_floats(tokens: &[&str], usage: &str) -> anyhow::Result<(f32, f32)> {
    if tokens.len() < 3 {
        bail!("Usage: {usage}");
    }
    Ok((finite(tokens[1])?, finite(tokens[2])?))
}

fn finite(token: &str) -> anyhow::Result<f32> {
    let value: f32 = token.parse().with_context(|| format!("bad number '{token}'"))?;
    if !value.is_finite() {
        bail!("number must be finite, got '{token}'");
    }
    Ok(value)
}
