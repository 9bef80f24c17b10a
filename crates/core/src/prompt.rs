//! Parsing of interactive answers
//!
//! The shell reads lines from the terminal; these functions decide what they mean.

/// Parse a 1-indexed menu answer into a 0-indexed position, `None` when out of range
pub fn parse_menu_choice(input: &str, options: usize) -> Option<usize> {
    let choice = input.trim().parse::<usize>().ok()?;
    (1..=options).contains(&choice).then(|| choice - 1)
}

/// `y`/`yes` (any case) is yes, anything else is no
pub fn parse_yes_no(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
