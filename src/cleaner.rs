/// Normalizes the text content read out of a matched node.
pub trait TextCleaner: Send + Sync {
    fn clean(&self, text: &str) -> String;

    /// Cleans the text nodes of a subtree, in document order.
    ///
    /// Fragments are kept on separate lines so that cleaners working line by
    /// line see adjacent text nodes as distinct words.
    fn clean_fragments<'a>(&self, fragments: &mut dyn Iterator<Item = &'a str>) -> String {
        let joined = fragments.collect::<Vec<&str>>().join("\n");
        self.clean(&joined)
    }
}

/// Trims each text node, drops blank ones and joins the rest with single spaces.
///
/// Line breaks inside a text node are part of its content and are kept.
pub struct DefaultCleaner;

impl TextCleaner for DefaultCleaner {
    fn clean(&self, text: &str) -> String {
        text.trim().to_string()
    }

    fn clean_fragments<'a>(&self, fragments: &mut dyn Iterator<Item = &'a str>) -> String {
        fragments
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

// Trims every line, drops blank ones and joins the rest with single spaces
pub struct LineFoldingCleaner;

impl TextCleaner for LineFoldingCleaner {
    fn clean(&self, text: &str) -> String {
        text.lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

// Keeps text exactly as it appears in the document
pub struct RawCleaner;

impl TextCleaner for RawCleaner {
    fn clean(&self, text: &str) -> String {
        text.to_string()
    }

    fn clean_fragments<'a>(&self, fragments: &mut dyn Iterator<Item = &'a str>) -> String {
        fragments.collect()
    }
}
