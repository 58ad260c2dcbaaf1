use std::io::Write;

use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::core::{
    error::{Error, Result},
    id::{ContainerId, ControlId, FocusToken},
    model::{ContainerKind, ItemKind, Model},
};

/// Render the control tree, strips, dropdowns, overflows and tray as an
/// indented listing, marking the focused node. This is a debug function.
pub fn dump(model: &Model, focus: FocusToken, color: bool) -> Result<String> {
    let mut buffer = if color {
        Buffer::ansi()
    } else {
        Buffer::no_color()
    };
    if let Some(root) = model.root() {
        dump_control(&mut buffer, model, focus, root, 0)?;
    }
    if !model.tray().is_empty() {
        label(&mut buffer, "tray", Color::Magenta)?;
        writeln!(buffer).map_err(io)?;
        for id in model.tray() {
            dump_control(&mut buffer, model, focus, *id, 1)?;
        }
    }
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

/// Map a write failure.
fn io(e: std::io::Error) -> Error {
    Error::Internal(e.to_string())
}

/// Write `text` in a bold colour.
fn label(buffer: &mut Buffer, text: &str, color: Color) -> Result<()> {
    buffer
        .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))
        .map_err(io)?;
    write!(buffer, "{text}").map_err(io)?;
    buffer.reset().map_err(io)
}

/// Write a dim annotation.
fn note(buffer: &mut Buffer, text: &str) -> Result<()> {
    buffer
        .set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))
        .map_err(io)?;
    write!(buffer, " {text}").map_err(io)?;
    buffer.reset().map_err(io)
}

/// Mark the focused node.
fn focus_marker(buffer: &mut Buffer, focused: bool) -> Result<()> {
    if focused {
        buffer
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))
            .map_err(io)?;
        write!(buffer, " <").map_err(io)?;
        buffer.reset().map_err(io)?;
    }
    Ok(())
}

/// Write a control line, then its strip and child controls one level deeper.
fn dump_control(
    buffer: &mut Buffer,
    model: &Model,
    focus: FocusToken,
    id: ControlId,
    level: usize,
) -> Result<()> {
    let control = model.control(id)?;
    write!(buffer, "{}", "    ".repeat(level)).map_err(io)?;
    label(buffer, control.name(), Color::Cyan)?;
    note(buffer, &format!("tab {}", control.tab_index()))?;
    if !control.sited() {
        note(buffer, "(unsited)")?;
    }
    focus_marker(buffer, focus == FocusToken::Control(id))?;
    writeln!(buffer).map_err(io)?;

    if let Some(strip) = control.strip() {
        dump_container(buffer, model, focus, strip, level + 1)?;
    }
    for child in control.children() {
        dump_control(buffer, model, focus, *child, level + 1)?;
    }
    Ok(())
}

/// Write a container and its items, descending into owned containers.
fn dump_container(
    buffer: &mut Buffer,
    model: &Model,
    focus: FocusToken,
    id: ContainerId,
    level: usize,
) -> Result<()> {
    let container = model.container(id)?;
    let indent = "    ".repeat(level);
    let kind = match container.kind() {
        ContainerKind::Strip => "strip",
        ContainerKind::Dropdown => "dropdown",
        ContainerKind::Overflow => "overflow",
    };
    write!(buffer, "{indent}").map_err(io)?;
    label(buffer, &format!("[{kind}]"), Color::Green)?;
    if container.right_to_left() {
        note(buffer, "rtl")?;
    }
    if container.is_drop_down() && !container.is_open() {
        note(buffer, "(closed)")?;
    }
    writeln!(buffer).map_err(io)?;

    for item_id in container.items() {
        let item = model.item(*item_id)?;
        write!(buffer, "{indent}    {}", item.name()).map_err(io)?;
        match item.kind() {
            ItemKind::Item => {}
            ItemKind::OverflowButton => note(buffer, "(overflow button)")?,
            ItemKind::TemplateNode => note(buffer, "(template)")?,
        }
        if item.hidden() {
            note(buffer, "(hidden)")?;
        }
        focus_marker(buffer, focus == FocusToken::Item(*item_id))?;
        writeln!(buffer).map_err(io)?;
        if let Some(dropdown) = item.dropdown() {
            dump_container(buffer, model, focus, dropdown, level + 2)?;
        }
    }
    Ok(())
}
