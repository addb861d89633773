//! Parser for the control listing printed by `v4l2-ctl --list-ctrls-menus`.
//!
//! The listing is line oriented:
//!
//! ```text
//!                      brightness 0x00980900 (int)    : min=-64 max=64 step=1 default=0 value=0
//!                   exposure_auto 0x009a0901 (menu)   : min=0 max=3 default=3 value=3
//!                                 1: Manual Mode
//!                                 3: Aperture Priority Mode
//! ```
//!
//! Control lines carry a name, an optional hex control id, a parenthesized
//! kind, and `key=value` parameters. Menu option lines are indented and
//! belong to the menu control above them. Anything else (section headers,
//! kinds we do not model) is logged and skipped so newer tool versions keep
//! working.

use std::collections::BTreeMap;

use lightbox_common::error::{LightboxError, LightboxResult};
use serde::Serialize;

/// One control reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlDescriptor {
    /// Control identifier, e.g. `focus_absolute`.
    pub name: String,

    /// Typed value contract.
    pub kind: ControlKind,

    /// Raw parameters as printed by the tool (includes `default`, `flags`).
    pub params: BTreeMap<String, String>,
}

/// Typed value contract of a control, built at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Integer {
        min: i64,
        max: i64,
        step: i64,
        value: i64,
    },
    Boolean {
        value: bool,
    },
    Menu {
        value: i64,
        options: Vec<MenuOption>,
    },
}

/// One entry of a menu control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    pub value: i64,
    pub label: String,
}

impl ControlKind {
    /// Kind token as printed by `v4l2-ctl`.
    pub fn token(&self) -> &'static str {
        match self {
            ControlKind::Integer { .. } => "int",
            ControlKind::Boolean { .. } => "bool",
            ControlKind::Menu { .. } => "menu",
        }
    }

    /// Current value as the integer the device stores.
    pub fn value(&self) -> i64 {
        match self {
            ControlKind::Integer { value, .. } => *value,
            ControlKind::Boolean { value } => i64::from(*value),
            ControlKind::Menu { value, .. } => *value,
        }
    }
}

impl ControlDescriptor {
    pub fn is_menu(&self) -> bool {
        matches!(self.kind, ControlKind::Menu { .. })
    }

    /// Menu options, empty for non-menu controls.
    pub fn menu_options(&self) -> &[MenuOption] {
        match &self.kind {
            ControlKind::Menu { options, .. } => options,
            _ => &[],
        }
    }

    /// Raw parameter lookup.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// A control line split into its parts, before typing.
#[derive(Debug)]
struct ControlLine<'a> {
    name: &'a str,
    kind: &'a str,
    params: BTreeMap<String, String>,
}

/// Which descriptor menu option lines currently attach to.
enum Current {
    Nothing,
    Control(usize),
    /// A control of a kind we do not model; its option lines are dropped.
    Skipped,
}

/// Parse a full control listing into descriptors, in encounter order.
///
/// Fails with [`LightboxError::MalformedInput`] when a menu option line has
/// no menu control to attach to, or when a modelled control lacks a
/// required parameter.
pub fn parse_controls(text: &str) -> LightboxResult<Vec<ControlDescriptor>> {
    let mut descriptors: Vec<ControlDescriptor> = Vec::new();
    let mut current = Current::Nothing;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        if let Some(control) = parse_control_line(line) {
            match build_kind(&control, line_no, line)? {
                Some(kind) => {
                    descriptors.push(ControlDescriptor {
                        name: control.name.to_string(),
                        kind,
                        params: control.params,
                    });
                    current = Current::Control(descriptors.len() - 1);
                }
                None => {
                    tracing::debug!(
                        line = line_no,
                        name = control.name,
                        kind = control.kind,
                        "Skipping control of unsupported kind"
                    );
                    current = Current::Skipped;
                }
            }
            continue;
        }

        if let Some((value, label)) = parse_menu_option(line) {
            match current {
                Current::Nothing => {
                    return Err(LightboxError::malformed(
                        line_no,
                        line,
                        "menu option without a preceding control",
                    ));
                }
                Current::Skipped => {
                    tracing::debug!(line = line_no, "Skipping option of unsupported control");
                }
                Current::Control(index) => {
                    let descriptor = &mut descriptors[index];
                    match &mut descriptor.kind {
                        ControlKind::Menu { options, .. } => options.push(MenuOption {
                            value,
                            label: label.to_string(),
                        }),
                        other => {
                            return Err(LightboxError::malformed(
                                line_no,
                                line,
                                format!(
                                    "menu option follows {} control {}",
                                    other.token(),
                                    descriptor.name
                                ),
                            ));
                        }
                    }
                }
            }
            continue;
        }

        tracing::debug!(line = line_no, content = line.trim(), "Unrecognized control description line");
    }

    Ok(descriptors)
}

/// Match `name [0xID] (kind) : key=value ...`.
fn parse_control_line(line: &str) -> Option<ControlLine<'_>> {
    let (head, tail) = line.trim_start().split_once(':')?;
    let head = head.trim_end();

    let open = head.rfind('(')?;
    let kind = head.strip_suffix(')')?.get(open + 1..)?.trim();
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }

    let mut words = head[..open].split_whitespace();
    let name = words.next()?;
    if !is_identifier(name) {
        return None;
    }
    match (words.next(), words.next()) {
        (None, _) => {}
        (Some(id), None) if is_hex_id(id) => {}
        _ => return None,
    }

    Some(ControlLine {
        name,
        kind,
        params: parse_params(tail),
    })
}

/// Match an indented `value: label` line.
fn parse_menu_option(line: &str) -> Option<(i64, &str)> {
    if !line.starts_with(char::is_whitespace) {
        return None;
    }
    let (value, label) = line.trim_start().split_once(':')?;
    let value = value.trim().parse().ok()?;
    Some((value, label.trim()))
}

fn parse_params(text: &str) -> BTreeMap<String, String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter_map(|token| token.split_once('='))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn build_kind(control: &ControlLine<'_>, line_no: usize, line: &str) -> LightboxResult<Option<ControlKind>> {
    let int = |key: &str| -> LightboxResult<i64> {
        let raw = control.params.get(key).ok_or_else(|| {
            LightboxError::malformed(line_no, line, format!("{} control lacks `{key}`", control.kind))
        })?;
        raw.parse().map_err(|_| {
            LightboxError::malformed(line_no, line, format!("`{key}={raw}` is not an integer"))
        })
    };

    let kind = match control.kind {
        "int" => {
            let (min, max, step, value) = (int("min")?, int("max")?, int("step")?, int("value")?);
            if step <= 0 {
                return Err(LightboxError::malformed(line_no, line, "step must be positive"));
            }
            if min > max {
                return Err(LightboxError::malformed(line_no, line, "min exceeds max"));
            }
            ControlKind::Integer {
                min,
                max,
                step,
                value,
            }
        }
        "bool" => ControlKind::Boolean {
            value: int("value")? != 0,
        },
        "menu" => ControlKind::Menu {
            value: int("value")?,
            options: Vec::new(),
        },
        _ => return Ok(None),
    };
    Ok(Some(kind))
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_hex_id(word: &str) -> bool {
    word.strip_prefix("0x")
        .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_bool_and_menu_controls() {
        let text = "focus_auto (bool): value=1\nexposure_auto (menu): value=0\n\t0: Manual\n\t1: Auto\n";
        let controls = parse_controls(text).unwrap();

        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].name, "focus_auto");
        assert_eq!(controls[0].kind, ControlKind::Boolean { value: true });
        assert_eq!(controls[1].name, "exposure_auto");
        assert_eq!(
            controls[1].menu_options(),
            &[
                MenuOption {
                    value: 0,
                    label: "Manual".to_string()
                },
                MenuOption {
                    value: 1,
                    label: "Auto".to_string()
                },
            ]
        );
    }

    #[test]
    fn integer_control_keeps_range_and_raw_params() {
        let text = "focus_absolute 0x009a090a (int) : min=0 max=250 step=5 default=0 value=125 flags=inactive";
        let controls = parse_controls(text).unwrap();

        assert_eq!(
            controls[0].kind,
            ControlKind::Integer {
                min: 0,
                max: 250,
                step: 5,
                value: 125
            }
        );
        assert_eq!(controls[0].param("flags"), Some("inactive"));
        assert_eq!(controls[0].param("default"), Some("0"));
    }

    #[test]
    fn comma_separated_params_are_accepted() {
        let controls = parse_controls("zoom_absolute (int): min=1, max=10, step=1, value=1,").unwrap();
        assert_eq!(controls[0].kind.value(), 1);
    }

    #[test]
    fn menu_option_without_control_is_malformed() {
        let err = parse_controls("\t0: Manual\n").unwrap_err();
        match err {
            LightboxError::MalformedInput { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn menu_option_after_bool_control_is_malformed() {
        let err = parse_controls("focus_auto (bool): value=1\n\t0: Manual\n").unwrap_err();
        match err {
            LightboxError::MalformedInput { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("bool"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unrecognized_lines_do_not_fail_the_parse() {
        let text = "User Controls\n\nfocus_auto (bool): value=0\nsomething odd here\n";
        let controls = parse_controls(text).unwrap();
        assert_eq!(controls.len(), 1);
    }

    #[test]
    fn unsupported_kinds_are_skipped_with_their_options() {
        let text = "\
link_freq 0x009f0901 (intmenu): min=0 max=1 default=0 value=0
\t0: 456000000 (0x1b2e0200)
\t1: 297000000
focus_auto (bool): value=1
";
        let controls = parse_controls(text).unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].name, "focus_auto");
    }

    #[test]
    fn missing_required_param_is_malformed() {
        let err = parse_controls("focus_absolute (int): min=0 max=10 value=3").unwrap_err();
        assert!(err.to_string().contains("step"));
    }

    #[test]
    fn menu_label_with_parentheses_is_an_option_not_a_control() {
        let text = "power_line_frequency (menu): value=1\n\t1: 50 Hz (Europe)\n";
        let controls = parse_controls(text).unwrap();
        assert_eq!(controls.len(), 1);
        assert_eq!(controls[0].menu_options()[0].label, "50 Hz (Europe)");
    }

    fn control_line() -> impl Strategy<Value = String> {
        prop_oneof![
            ("[a-z][a-z_]{0,12}", 0i64..100).prop_map(|(name, v)| format!("{name} (bool): value={}", v % 2)),
            ("[a-z][a-z_]{0,12}", 0i64..100, 1i64..5)
                .prop_map(|(name, v, step)| format!("{name} (int): min=0 max=100 step={step} value={v}")),
            ("[a-z][a-z_]{0,12}", proptest::collection::vec("[A-Za-z ]{1,10}", 0..4)).prop_map(
                |(name, labels)| {
                    let mut out = format!("{name} (menu): value=0");
                    for (i, label) in labels.iter().enumerate() {
                        out.push_str(&format!("\n\t{i}: {label}"));
                    }
                    out
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn parse_is_idempotent_and_order_preserving(lines in proptest::collection::vec(control_line(), 0..8)) {
            let text = lines.join("\n");
            let first = parse_controls(&text).unwrap();
            let second = parse_controls(&text).unwrap();
            prop_assert_eq!(&first, &second);

            let names: Vec<String> = lines
                .iter()
                .map(|l| l.split_whitespace().next().unwrap().to_string())
                .collect();
            let parsed: Vec<String> = first.iter().map(|d| d.name.clone()).collect();
            prop_assert_eq!(parsed, names);
        }
    }
}
