//! Launch-command recognition for pending-launch correlation.
//!
//! A pane's raw command line is tokenized, split on shell separators, and
//! unwrapped through common wrapper programs until the real invoked
//! executable is visible. Only interactive codex launches matter here:
//! `resume <id>` binds a session directly, a bare launch records a
//! pending launch to be matched against the next discovered session.

use logmux_types::is_uuid_like;

/// Wrapper unwrapping gives up after this many layers.
const MAX_UNWRAP_STEPS: usize = 12;

const COMMAND_SEPARATORS: [&str; 5] = ["||", "&&", "|", ";", "&"];

/// Codex flags that consume the next token as their value.
const CODEX_FLAGS_WITH_VALUE: [&str; 12] = [
    "-m",
    "--model",
    "-p",
    "--profile",
    "-c",
    "--config",
    "-s",
    "--sandbox",
    "-a",
    "--ask-for-approval",
    "-i",
    "--image",
];

/// Subcommands that never open the interactive TUI.
const CODEX_NON_TUI_SUBCOMMANDS: [&str; 10] = [
    "exec", "e", "login", "logout", "mcp", "proto", "completion", "debug", "apply", "a",
];

const HELP_FLAGS: [&str; 4] = ["-h", "--help", "-V", "--version"];

/// What a command line means to the status engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchAction {
    /// `codex resume <id>`: bind the session immediately.
    BindSession { session_id: String },
    /// Interactive launch with no extractable id.
    PendingLaunch,
    /// Not a recognized launch.
    None,
}

/// Classify one raw command line.
pub fn analyze_command(command: &str) -> LaunchAction {
    for segment in split_segments(&tokenize(command)) {
        let action = analyze_segment(&segment);
        if action != LaunchAction::None {
            return action;
        }
    }
    LaunchAction::None
}

fn analyze_segment(tokens: &[String]) -> LaunchAction {
    let tokens = unwrap_wrappers(tokens);
    let Some(program) = tokens.first() else {
        return LaunchAction::None;
    };
    if !is_codex_executable(program) {
        return LaunchAction::None;
    }

    let mut rest = tokens[1..].iter();
    let mut subcommand: Option<&str> = None;
    while let Some(token) = rest.next() {
        if HELP_FLAGS.contains(&token.as_str()) {
            return LaunchAction::None;
        }
        if CODEX_FLAGS_WITH_VALUE.contains(&token.as_str()) {
            rest.next();
            continue;
        }
        if token.starts_with('-') {
            continue;
        }
        subcommand = Some(token.as_str());
        break;
    }

    match subcommand {
        Some("resume") => {
            for token in rest {
                if CODEX_FLAGS_WITH_VALUE.contains(&token.as_str()) {
                    break;
                }
                if token.starts_with('-') {
                    continue;
                }
                if is_uuid_like(token) {
                    return LaunchAction::BindSession {
                        session_id: token.clone(),
                    };
                }
                break;
            }
            // `resume --last` or a bare resume picker.
            LaunchAction::PendingLaunch
        }
        Some(sub) if CODEX_NON_TUI_SUBCOMMANDS.contains(&sub) => LaunchAction::None,
        // An unknown positional is treated as the initial prompt.
        Some(_) | None => LaunchAction::PendingLaunch,
    }
}

fn is_codex_executable(token: &str) -> bool {
    let basename = token
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(token)
        .to_ascii_lowercase();
    matches!(
        basename.as_str(),
        "codex" | "codex.exe" | "codex.cmd" | "codex.bat"
    )
}

fn is_env_assignment(token: &str) -> bool {
    let Some(eq) = token.find('=') else {
        return false;
    };
    let name = &token[..eq];
    !name.is_empty()
        && name
            .chars()
            .enumerate()
            .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()))
}

/// Strip wrapper programs and env assignments until the real executable
/// is at the front.
fn unwrap_wrappers(tokens: &[String]) -> Vec<String> {
    let mut tokens: Vec<String> = tokens.to_vec();
    for _ in 0..MAX_UNWRAP_STEPS {
        while tokens.first().is_some_and(|t| is_env_assignment(t)) {
            tokens.remove(0);
        }
        let Some(first) = tokens.first() else {
            return tokens;
        };
        let basename = first
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(first)
            .to_ascii_lowercase();
        match basename.as_str() {
            "env" => {
                tokens.remove(0);
                while tokens
                    .first()
                    .is_some_and(|t| is_env_assignment(t) || t.starts_with('-'))
                {
                    tokens.remove(0);
                }
            }
            "command" | "nohup" => {
                tokens.remove(0);
            }
            "sudo" => {
                tokens.remove(0);
                if tokens.first().is_some_and(|t| t == "-u") {
                    tokens.remove(0);
                    if !tokens.is_empty() {
                        tokens.remove(0);
                    }
                }
            }
            "nice" => {
                tokens.remove(0);
                if tokens.first().is_some_and(|t| t == "-n") {
                    tokens.remove(0);
                    if !tokens.is_empty() {
                        tokens.remove(0);
                    }
                } else if tokens
                    .first()
                    .is_some_and(|t| t.starts_with('-') && t[1..].chars().all(|c| c.is_ascii_digit()))
                {
                    tokens.remove(0);
                }
            }
            "npx" | "pnpx" | "bunx" => {
                tokens.remove(0);
                while tokens.first().is_some_and(|t| t.starts_with('-')) {
                    tokens.remove(0);
                }
            }
            "npm" | "pnpm" | "yarn" => {
                let shim = tokens.get(1).map(String::as_str);
                if matches!(shim, Some("exec") | Some("dlx")) {
                    tokens.drain(0..2);
                    while tokens
                        .first()
                        .is_some_and(|t| t.starts_with('-') && t != "--")
                    {
                        tokens.remove(0);
                    }
                    if tokens.first().is_some_and(|t| t == "--") {
                        tokens.remove(0);
                    }
                } else {
                    return tokens;
                }
            }
            _ => return tokens,
        }
    }
    tokens
}

/// Split a token stream on shell command separators, dropping redirection
/// operators and their targets along the way.
fn split_segments(tokens: &[String]) -> Vec<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut skip_next = false;
    for token in tokens {
        if skip_next {
            skip_next = false;
            continue;
        }
        if COMMAND_SEPARATORS.contains(&token.as_str()) {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            continue;
        }
        if is_redirection(token) {
            if !token.contains('&') {
                skip_next = true;
            }
            continue;
        }
        current.push(token.clone());
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn is_redirection(token: &str) -> bool {
    let stripped = token.trim_start_matches(|c: char| c.is_ascii_digit());
    matches!(stripped, ">" | ">>" | "<" | "&>" | ">&") || stripped.starts_with(">&")
}

/// Whitespace tokenizer honoring single quotes, double quotes, and
/// backslash escapes, with unquoted separators emitted as standalone
/// tokens.
fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for inner in chars.by_ref() {
                    if inner == '\'' {
                        break;
                    }
                    current.push(inner);
                }
            }
            '"' => {
                while let Some(inner) = chars.next() {
                    match inner {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(inner),
                    }
                }
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            '>' | '<' => {
                // A pure-digit prefix is a file descriptor, part of the
                // operator token.
                if !current.is_empty() && !current.chars().all(|ch| ch.is_ascii_digit()) {
                    tokens.push(std::mem::take(&mut current));
                }
                current.push(c);
                if c == '>' && chars.peek() == Some(&'>') {
                    chars.next();
                    current.push('>');
                }
                if chars.peek() == Some(&'&') {
                    chars.next();
                    current.push('&');
                    while let Some(d) = chars.peek().copied() {
                        if d.is_ascii_digit() {
                            current.push(d);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(std::mem::take(&mut current));
            }
            '|' | '&' | ';' => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                let mut sep = c.to_string();
                if (c == '|' || c == '&') && chars.peek() == Some(&c) {
                    chars.next();
                    sep.push(c);
                }
                tokens.push(sep);
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
    fn bare_codex_is_a_pending_launch() {
        assert_eq!(analyze_command("codex"), LaunchAction::PendingLaunch);
        assert_eq!(
            analyze_command("codex --model o3"),
            LaunchAction::PendingLaunch
        );
    }

    #[test]
    fn resume_with_id_binds_directly() {
        let id = "0198c4a9-7f2e-7bb0-9d63-5a0f8c3d2e11";
        assert_eq!(
            analyze_command(&format!("codex resume {id}")),
            LaunchAction::BindSession {
                session_id: id.to_string()
            }
        );
    }

    #[test]
    fn resume_without_id_is_pending() {
        assert_eq!(analyze_command("codex resume"), LaunchAction::PendingLaunch);
        assert_eq!(
            analyze_command("codex resume --last"),
            LaunchAction::PendingLaunch
        );
    }

    #[test]
    fn non_tui_subcommands_are_ignored() {
        assert_eq!(analyze_command("codex exec 'fix tests'"), LaunchAction::None);
        assert_eq!(analyze_command("codex login"), LaunchAction::None);
        assert_eq!(analyze_command("codex --help"), LaunchAction::None);
    }

    #[test]
    fn wrappers_are_unwrapped() {
        assert_eq!(
            analyze_command("RUST_LOG=debug sudo -u dev env FOO=1 codex"),
            LaunchAction::PendingLaunch
        );
        assert_eq!(analyze_command("npx -y codex"), LaunchAction::PendingLaunch);
        assert_eq!(
            analyze_command("pnpm exec codex resume"),
            LaunchAction::PendingLaunch
        );
        assert_eq!(analyze_command("nice -n 10 codex"), LaunchAction::PendingLaunch);
    }

    #[test]
    fn later_pipeline_segments_are_inspected() {
        assert_eq!(
            analyze_command("git pull && codex"),
            LaunchAction::PendingLaunch
        );
        assert_eq!(analyze_command("echo hi | cat"), LaunchAction::None);
    }

    #[test]
    fn redirections_do_not_confuse_detection() {
        assert_eq!(
            analyze_command("codex > /tmp/out.log 2>&1"),
            LaunchAction::PendingLaunch
        );
    }

    #[test]
    fn value_flags_consume_their_argument() {
        // "resume" here is the value of -m, not a subcommand.
        assert_eq!(analyze_command("codex -m resume"), LaunchAction::PendingLaunch);
    }

    #[test]
    fn quoted_arguments_stay_single_tokens() {
        let tokens = tokenize("codex \"do the thing\" 'and this'");
        assert_eq!(tokens, vec!["codex", "do the thing", "and this"]);
    }

    #[test]
    fn windows_style_paths_count_as_codex() {
        assert_eq!(
            analyze_command(r"C:\tools\codex.exe resume"),
            LaunchAction::PendingLaunch
        );
    }
}
