use std::fmt;

/// A single option the engine advertised during setup.
///
/// The descriptor is immutable once parsed; whatever value is currently in
/// effect lives with the engine itself, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: String,
    pub kind: OptionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// `type string default <text>`; the default may be empty.
    Text { default: String },
    /// `type spin default <n> min <n> max <n>`.
    Spin { default: i64, min: i64, max: i64 },
    /// `type check default <true|false>`.
    Check { default: bool },
    /// `type button`: no value, sending the option *is* the action.
    Button,
    /// `type combo default <v> (var <v>)+`.
    Combo {
        default: String,
        alternatives: Vec<String>,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("value {value:?} is not valid for option {name}")]
pub struct OptionValueError {
    pub name: String,
    pub value: String,
}

impl EngineOption {
    /// Parse an `option name <NAME> type <TYPE> ...` advertisement.
    ///
    /// Names may contain spaces; the span up to the first ` type ` is the
    /// name. Returns `None` for anything malformed; callers must tolerate
    /// lines they cannot classify.
    pub fn parse(line: &str) -> Option<EngineOption> {
        let rest = line.strip_prefix("option name ")?;
        let split = rest.find(" type ")?;
        let name = &rest[..split];
        if name.is_empty() {
            return None;
        }
        let rest = &rest[split + " type ".len()..];
        let (type_kw, remainder) = match rest.split_once(' ') {
            Some((kw, remainder)) => (kw, remainder),
            None => (rest, ""),
        };

        let kind = match type_kw {
            "string" => OptionKind::Text {
                default: remainder.strip_prefix("default ")?.to_string(),
            },
            "spin" => {
                let mut tokens = remainder.split_whitespace();
                match (
                    tokens.next(),
                    tokens.next(),
                    tokens.next(),
                    tokens.next(),
                    tokens.next(),
                    tokens.next(),
                    tokens.next(),
                ) {
                    (
                        Some("default"),
                        Some(default),
                        Some("min"),
                        Some(min),
                        Some("max"),
                        Some(max),
                        None,
                    ) => OptionKind::Spin {
                        default: default.parse().ok()?,
                        min: min.parse().ok()?,
                        max: max.parse().ok()?,
                    },
                    _ => return None,
                }
            }
            "check" => match remainder {
                "default true" => OptionKind::Check { default: true },
                "default false" => OptionKind::Check { default: false },
                _ => return None,
            },
            "button" => OptionKind::Button,
            "combo" => {
                let mut values = remainder.strip_prefix("default ")?.split(" var ");
                let default = values.next()?;
                let alternatives: Vec<String> = values.map(str::to_string).collect();
                if alternatives.is_empty() {
                    return None;
                }
                OptionKind::Combo {
                    default: default.to_string(),
                    alternatives,
                }
            }
            _ => return None,
        };

        Some(EngineOption {
            name: name.to_string(),
            kind,
        })
    }

    /// Render the `setoption` command that assigns `value` to this option.
    ///
    /// Buttons take no value; combos only accept advertised values.
    pub fn set_command(&self, value: &str) -> Result<String, OptionValueError> {
        match &self.kind {
            OptionKind::Button => Ok(format!("setoption name {}", self.name)),
            OptionKind::Combo {
                default,
                alternatives,
            } => {
                if value != default && !alternatives.iter().any(|alt| alt == value) {
                    return Err(OptionValueError {
                        name: self.name.clone(),
                        value: value.to_string(),
                    });
                }
                Ok(format!("setoption name {} value {}", self.name, value))
            }
            _ => Ok(format!("setoption name {} value {}", self.name, value)),
        }
    }
}

impl fmt::Display for EngineOption {
    /// Reproduces the advertisement line the descriptor was parsed from.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type ", self.name)?;
        match &self.kind {
            OptionKind::Text { default } => write!(f, "string default {default}"),
            OptionKind::Spin { default, min, max } => {
                write!(f, "spin default {default} min {min} max {max}")
            }
            OptionKind::Check { default } => write!(f, "check default {default}"),
            OptionKind::Button => write!(f, "button"),
            OptionKind::Combo {
                default,
                alternatives,
            } => {
                write!(f, "combo default {default}")?;
                for alt in alternatives {
                    write!(f, " var {alt}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(name: &str, kind: OptionKind) -> EngineOption {
        EngineOption {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn parses_the_five_grammars() {
        let cases = [
            (
                "option name Debug Log File type string default ",
                opt(
                    "Debug Log File",
                    OptionKind::Text {
                        default: String::new(),
                    },
                ),
            ),
            (
                "option name Threads type spin default 1 min 1 max 512",
                opt(
                    "Threads",
                    OptionKind::Spin {
                        default: 1,
                        min: 1,
                        max: 512,
                    },
                ),
            ),
            (
                "option name Hash type spin default 16 min 1 max 2048",
                opt(
                    "Hash",
                    OptionKind::Spin {
                        default: 16,
                        min: 1,
                        max: 2048,
                    },
                ),
            ),
            (
                "option name Skill Level type spin default 20 min -20 max 20",
                opt(
                    "Skill Level",
                    OptionKind::Spin {
                        default: 20,
                        min: -20,
                        max: 20,
                    },
                ),
            ),
            (
                "option name Clear Hash type button",
                opt("Clear Hash", OptionKind::Button),
            ),
            (
                "option name Use NNUE type check default false",
                opt("Use NNUE", OptionKind::Check { default: false }),
            ),
            (
                "option name UCI_Variant type combo default chess var 3check var atomic var chess var crazyhouse",
                opt(
                    "UCI_Variant",
                    OptionKind::Combo {
                        default: "chess".to_string(),
                        alternatives: vec![
                            "3check".to_string(),
                            "atomic".to_string(),
                            "chess".to_string(),
                            "crazyhouse".to_string(),
                        ],
                    },
                ),
            ),
        ];

        for (line, expected) in cases {
            assert_eq!(EngineOption::parse(line).as_ref(), Some(&expected), "line: {line}");
        }
    }

    #[test]
    fn malformed_lines_yield_nothing() {
        let lines = [
            // Missing fields.
            "option name Threads type spin default 1 min 1",
            "option name Threads type spin default 1 min 1 max 512 extra",
            "option name Debug Log File type string default",
            "option name Use NNUE type check default maybe",
            "option name X type unknown default 1",
            "option Threads type spin default 1 min 1 max 512",
            "option name  type button",
            // Non-numeric bounds.
            "option name Threads type spin default one min 1 max 512",
            // A combo needs a default plus at least one alternative.
            "option name UCI_Variant type combo default chess",
            "option name UCI_Variant type combo chess var atomic",
        ];
        for line in lines {
            assert_eq!(EngineOption::parse(line), None, "line: {line}");
        }
    }

    #[test]
    fn advertisements_round_trip_through_display() {
        let lines = [
            "option name Debug Log File type string default ",
            "option name EvalFile type string default <empty>",
            "option name Threads type spin default 1 min 1 max 512",
            "option name Skill Level type spin default 20 min -20 max 20",
            "option name Clear Hash type button",
            "option name Use NNUE type check default false",
            "option name Syzygy50MoveRule type check default true",
            "option name UCI_Variant type combo default chess var 3check var atomic",
        ];
        for line in lines {
            let parsed = EngineOption::parse(line).unwrap();
            let reparsed = EngineOption::parse(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "line: {line}");
        }
    }

    #[test]
    fn set_commands_take_the_documented_shapes() {
        let spin = EngineOption::parse("option name Threads type spin default 1 min 1 max 512").unwrap();
        assert_eq!(
            spin.set_command("12").unwrap(),
            "setoption name Threads value 12"
        );

        let check = EngineOption::parse("option name Use NNUE type check default false").unwrap();
        assert_eq!(
            check.set_command("true").unwrap(),
            "setoption name Use NNUE value true"
        );

        let button = EngineOption::parse("option name Clear Hash type button").unwrap();
        assert_eq!(button.set_command("").unwrap(), "setoption name Clear Hash");
    }

    #[test]
    fn combo_rejects_unadvertised_values() {
        let combo = EngineOption::parse(
            "option name UCI_Variant type combo default chess var 3check var atomic",
        )
        .unwrap();
        assert!(combo.set_command("atomic").is_ok());
        assert!(combo.set_command("chess").is_ok());
        assert!(combo.set_command("shogi").is_err());
    }
}
