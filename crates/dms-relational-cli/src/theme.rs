use console::{style, StyledObject};

/// Underlined section heading.
pub(crate) fn heading(text: &str) -> StyledObject<&str> {
    style(text).cyan().bold().underlined()
}

pub(crate) fn success_mark() -> StyledObject<&'static str> {
    style("✓").green().bold()
}

pub(crate) fn dim(text: impl Into<String>) -> StyledObject<String> {
    style(text.into()).dim()
}
