//! Command line grammar
//!
//! ```text
//! line      := directive ("|" directive)*
//! directive := token (" " token)*
//! ```
//!
//! Splitting is purely lexical, there is no escaping.

/// Terminates the session
pub const EXIT: &str = "exit";
/// Turns the line's button action into a hold-down
pub const HOLD_DOWN: &str = "_d";
/// Turns the line's button action into a release
pub const RELEASE: &str = "_u";
/// Prints the available buttons and commands
pub const HELP: &str = "help";
/// Prefix reserved for control tokens
pub const CONTROL_PREFIX: char = '_';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    pub name: &'a str,
    pub args: Vec<&'a str>,
}

/// Splits a received payload into directives
///
/// Empty or whitespace-only segments produce no directive.
pub fn parse_line(line: &str) -> Vec<Directive<'_>> {
    line.split('|')
        .filter_map(|segment| {
            let mut tokens = segment.split_whitespace();
            let name = tokens.next()?;
            Some(Directive {
                name,
                args: tokens.collect(),
            })
        })
        .collect()
}

/// How a directive takes part in a command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Exit,
    HoldDown,
    Release,
    Button,
    Help,
    SubCommand,
    /// `_`-prefixed token without a meaning yet
    Reserved,
    Unknown,
}

/// Classifies a directive name
///
/// Precedence: reserved tokens, then button names, then sub-commands.
pub fn classify(
    name: &str,
    available_buttons: &[&str],
    is_sub_command: impl Fn(&str) -> bool,
) -> DirectiveKind {
    match name {
        EXIT => DirectiveKind::Exit,
        HOLD_DOWN => DirectiveKind::HoldDown,
        RELEASE => DirectiveKind::Release,
        _ if available_buttons.contains(&name) => DirectiveKind::Button,
        HELP => DirectiveKind::Help,
        _ if is_sub_command(name) => DirectiveKind::SubCommand,
        _ if name.starts_with(CONTROL_PREFIX) => DirectiveKind::Reserved,
        _ => DirectiveKind::Unknown,
    }
}
